//! SQL statement builders for the catalog database.
//!
//! All statements use positional `?` placeholders. Identifiers come from the
//! [`CatalogEntityKind`] dispatch table and are never user supplied.

use crate::core::{CatalogEntityKind, EntityId, SqlParam};

/// Keyset page over live IDs.
///
/// Parameters: `[cutoff, limit]` for the first page, `[after_id, cutoff, limit]`
/// for every following page (see [`live_id_page_params`]).
pub fn live_id_page_query(kind: CatalogEntityKind, has_after: bool) -> String {
    let table = kind.table();
    let id = kind.id_column();
    let after = if has_after {
        format!("{} > ? AND ", id)
    } else {
        String::new()
    };

    format!(
        "SELECT {id} FROM {table} \
         WHERE {after}is_deleted = 0 AND schedule_end_time > ? \
         ORDER BY {id} ASC LIMIT ?"
    )
}

/// Parameters matching [`live_id_page_query`].
pub fn live_id_page_params(after: Option<EntityId>, cutoff: i64, limit: usize) -> Vec<SqlParam> {
    let mut params = Vec::with_capacity(3);
    if let Some(after) = after {
        params.push(SqlParam::Int(after));
    }
    params.push(SqlParam::Int(cutoff));
    params.push(SqlParam::Int(limit as i64));
    params
}

/// Minimal `{id, last_modified_time}` projection for one entity.
pub fn audit_projection_query(kind: CatalogEntityKind) -> String {
    format!(
        "SELECT {id}, last_modified_time FROM {table} WHERE {id} = ?",
        id = kind.id_column(),
        table = kind.table()
    )
}

/// Number of `IN (...)` lists in the ETL statement for a kind. The ID
/// parameters are bound once per list.
pub fn etl_id_list_count(kind: CatalogEntityKind) -> usize {
    match kind {
        CatalogEntityKind::Series => 4,
        CatalogEntityKind::Product => 4,
    }
}

/// Denormalizing ETL statement for `id_count` entity IDs.
pub fn etl_query(kind: CatalogEntityKind, id_count: usize) -> String {
    let placeholders = vec!["?"; id_count.max(1)].join(", ");
    let template = match kind {
        CatalogEntityKind::Series => SERIES_ETL_SQL,
        CatalogEntityKind::Product => PRODUCT_ETL_SQL,
    };
    template.replace("{ids}", &placeholders)
}

/// Parameters matching [`etl_query`]: the ID list repeated once per `IN` list.
pub fn etl_params(kind: CatalogEntityKind, ids: &[EntityId]) -> Vec<SqlParam> {
    let lists = etl_id_list_count(kind);
    let mut params = Vec::with_capacity(ids.len() * lists);
    for _ in 0..lists {
        params.extend(ids.iter().map(|id| SqlParam::Int(*id)));
    }
    params
}

const SERIES_ETL_SQL: &str = r#"
WITH series_base AS (
    SELECT *
    FROM series
    WHERE is_deleted = 0
      AND schedule_end_time > UNIX_TIMESTAMP(NOW())
      AND series_id IN ({ids})
),
ccs_relation AS (
    SELECT DISTINCT ccs_series_id, series_id
    FROM ccs_ott_series_relation
    WHERE series_id IN ({ids})
),
actor_relation AS (
    SELECT series_id, tag_actor_id
    FROM series_actor_relation
    WHERE series_id IN ({ids})
),
live_actor AS (
    SELECT tag_actor_id, name
    FROM tag_actor
    WHERE is_deleted = 0
),
ccs_actor_names AS (
    SELECT ccs_relation.ccs_series_id,
           GROUP_CONCAT(DISTINCT LOWER(live_actor.name)) AS actor_names
    FROM actor_relation
    INNER JOIN live_actor ON live_actor.tag_actor_id = actor_relation.tag_actor_id
    INNER JOIN ccs_relation ON ccs_relation.series_id = actor_relation.series_id
    GROUP BY ccs_relation.ccs_series_id
),
ccs_keyword AS (
    SELECT ccs_relation.ccs_series_id,
           GROUP_CONCAT(DISTINCT LOWER(series_base.keyword)) AS keyword
    FROM series_base
    INNER JOIN ccs_relation ON ccs_relation.series_id = series_base.series_id
    GROUP BY ccs_relation.ccs_series_id
),
ccs_alternative_names AS (
    SELECT ccs_relation.ccs_series_id,
           GROUP_CONCAT(DISTINCT LOWER(series_base.name)) AS alternative_names
    FROM series_base
    INNER JOIN ccs_relation ON ccs_relation.series_id = series_base.series_id
    GROUP BY ccs_relation.ccs_series_id
),
tag_relation AS (
    SELECT series_id, tag_id
    FROM series_tag_relation
    WHERE series_id IN ({ids})
),
live_tag AS (
    SELECT tag_id, LOWER(name) AS tag_name
    FROM tag
    WHERE is_deleted = 0
      AND name != 'undefined'
),
series_tags AS (
    SELECT tag_relation.series_id,
           GROUP_CONCAT(DISTINCT live_tag.tag_name) AS tag_names
    FROM tag_relation
    INNER JOIN live_tag ON live_tag.tag_id = tag_relation.tag_id
    GROUP BY tag_relation.series_id
)
SELECT
    series_base.series_id AS _id,
    series_base.series_id,
    series_base.name,
    series_base.cover_image_uri,
    series_base.landscape_image,
    series_base.portrait_image,
    series_base.product_total,
    series_base.released_product_total,
    series_base.is_movie,
    series_base.source_flag,
    series_base.allow_tv,
    series_base.allow_telstb,
    series_base.description,
    series_base.release_time,
    series_base.schedule_start_time,
    series_base.schedule_end_time,
    series_base.is_deleted,
    series_base.country_ids,
    series_base.area_id,
    series_base.language_flag_id,
    series_base.last_modified_time,
    series_base.poster_logo,
    LOWER(series_base.name) AS series_name_lower,
    ccs_keyword.keyword,
    ccs_relation.ccs_series_id,
    ccs_actor_names.actor_names,
    ccs_alternative_names.alternative_names,
    series_tags.tag_names
FROM series_base
LEFT JOIN ccs_relation ON ccs_relation.series_id = series_base.series_id
LEFT JOIN ccs_keyword ON ccs_keyword.ccs_series_id = ccs_relation.ccs_series_id
LEFT JOIN ccs_actor_names ON ccs_actor_names.ccs_series_id = ccs_relation.ccs_series_id
LEFT JOIN ccs_alternative_names ON ccs_alternative_names.ccs_series_id = ccs_relation.ccs_series_id
LEFT JOIN series_tags ON series_tags.series_id = series_base.series_id
"#;

const PRODUCT_ETL_SQL: &str = r#"
WITH product_base AS (
    SELECT *
    FROM product
    WHERE is_deleted = 0
      AND schedule_end_time > UNIX_TIMESTAMP(NOW())
      AND product_id IN ({ids})
),
tag_relation AS (
    SELECT product_id, tag_id
    FROM product_tag_relation
    WHERE product_id IN ({ids})
),
guest_tag AS (
    SELECT tag_guest_id AS tag_id, LOWER(name) AS guest_tag_name
    FROM tag_guest
),
product_guest_tags AS (
    SELECT tag_relation.product_id,
           GROUP_CONCAT(guest_tag.guest_tag_name) AS guest_tag_names
    FROM tag_relation
    INNER JOIN guest_tag ON guest_tag.tag_id = tag_relation.tag_id
    WHERE tag_relation.product_id IN ({ids})
    GROUP BY tag_relation.product_id
)
SELECT
    pb.product_id AS _id,
    pb.product_id,
    pb.series_id,
    pb.number,
    pb.synopsis,
    pb.description,
    pb.cover_image_uri,
    pb.time_duration,
    pb.schedule_start_time,
    pb.schedule_end_time,
    pb.free_time,
    pb.premium_time,
    pb.is_free_premium_time,
    pb.allow_download,
    LOWER(pb.keyword) AS keyword,
    pb.is_produced,
    pb.is_deleted,
    pb.is_parental_lock_limited,
    pb.is_parental_lock_compulsory,
    pb.last_modified_time,
    pb.area_id,
    pb.language_flag_id,
    pb.censorship_ads_id,
    pb.allow_play_big_screen,
    pb.play_big_screen_start_time,
    pb.play_big_screen_end_time,
    pb.duration_start,
    pb.source_flag,
    pb.third_product_id,
    pb.seo_title,
    pb.seo_description,
    pb.chargingcp_id,
    pb.classification,
    pb.encryption_string,
    pb.multiple_image,
    pb.landscape_image,
    pb.portrait_image,
    pb.skip_intro_start_time,
    pb.skip_intro_end_time,
    pb.content_advisory,
    pb.drm,
    pb.dpr,
    pgt.guest_tag_names
FROM product_base pb
LEFT JOIN product_guest_tags pgt ON pgt.product_id = pb.product_id
WHERE pb.product_id IN ({ids})
"#;
