//! MySQL query executor.
//!
//! Runs parameterized statements through an SQLx pool and decodes every row
//! into a [`Record`] keyed by column label.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::RelationalConfig;
use crate::core::{FieldValue, Record, RelationalExecutor, SqlParam};
use crate::error::{ReconcileError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// [`RelationalExecutor`] backed by an SQLx MySQL pool.
pub struct MysqlExecutor {
    pool: MySqlPool,
}

impl MysqlExecutor {
    /// Connect to the catalog database and verify the connection.
    pub async fn new(config: &RelationalConfig, max_conns: usize) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns.max(1) as u32)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                ReconcileError::store_unavailable(
                    "relational",
                    format!("connecting to {}:{}: {}", config.host, config.port, e),
                )
            })?;

        let executor = Self { pool };
        executor.ping().await?;

        info!(
            "Connected to MySQL: {}:{}/{} (max {} connections)",
            config.host, config.port, config.database, max_conns
        );

        Ok(executor)
    }

}

#[async_trait]
impl RelationalExecutor for MysqlExecutor {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Text(s) => query.bind(s.as_str()),
            };
        }

        let rows: Vec<MySqlRow> = query.fetch_all(&self.pool).await?;
        debug!("MySQL returned {} rows for {} params", rows.len(), params.len());

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Convert a MySQL row to a record keyed by column label.
fn row_to_record(row: &MySqlRow) -> Record {
    row.columns()
        .iter()
        .map(|column| {
            let i = column.ordinal();
            (column.name().to_string(), decode_column(row, i, column.type_info().name()))
        })
        .collect()
}

/// Decode one column, falling back to text and then lossy bytes when the
/// declared type does not decode.
fn decode_column(row: &MySqlRow, i: usize, type_name: &str) -> FieldValue {
    let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return FieldValue::Null;
    }

    let type_name = type_name.to_lowercase();
    let unsigned = type_name.ends_with(" unsigned");
    let base = type_name.trim_end_matches(" unsigned");

    let decoded = match base {
        "boolean" | "bool" => row.try_get::<bool, _>(i).ok().map(FieldValue::Bool),

        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year"
            if unsigned =>
        {
            row.try_get::<u64, _>(i).ok().map(|v| match i64::try_from(v) {
                Ok(v) => FieldValue::Int(v),
                Err(_) => FieldValue::Float(v as f64),
            })
        }
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
            row.try_get::<i64, _>(i).ok().map(FieldValue::Int)
        }

        "float" => row
            .try_get::<f32, _>(i)
            .ok()
            .map(|v| FieldValue::Float(v as f64)),
        "double" | "real" => row.try_get::<f64, _>(i).ok().map(FieldValue::Float),

        "decimal" | "numeric" => row
            .try_get::<rust_decimal::Decimal, _>(i)
            .ok()
            .and_then(|d| {
                if d.fract().is_zero() {
                    d.to_i64().map(FieldValue::Int)
                } else {
                    d.to_f64().map(FieldValue::Float)
                }
            }),

        "datetime" | "timestamp" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .ok()
            .map(FieldValue::DateTime),
        "date" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .ok()
            .map(|v| FieldValue::Text(v.to_string())),

        _ => None,
    };

    decoded
        .or_else(|| row.try_get::<String, _>(i).ok().map(FieldValue::Text))
        .or_else(|| {
            row.try_get::<Vec<u8>, _>(i)
                .ok()
                .map(|b| FieldValue::Text(String::from_utf8_lossy(&b).into_owned()))
        })
        .unwrap_or(FieldValue::Null)
}
