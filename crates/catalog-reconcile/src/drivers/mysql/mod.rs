//! MySQL driver for the catalog database.
//!
//! # Feature Flag
//!
//! This module is only available when the `mysql` feature is enabled
//! (on by default).
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+
//!
//! Uses SQLx connection pooling; statements use positional `?` placeholders.

mod executor;

pub use executor::MysqlExecutor;
