use crate::domain::listing::{ListingRecord, ListingSummary, MediaItem};
use crate::domain::saved_search::SearchCriteria;
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, ToSql};

// Column order here is the bind order used by `upsert_listings`.
const UPSERT_COLUMNS: &[&str] = &[
    "listing_key",
    "listing_id",
    "originating_system",
    "mlg_can_view",
    "modification_timestamp",
    "photos_change_timestamp",
    "status_change_timestamp",
    "listing_contract_date",
    "close_date",
    "standard_status",
    "mls_status",
    "property_type",
    "property_sub_type",
    "list_price",
    "original_list_price",
    "close_price",
    "association_fee",
    "tax_annual_amount",
    "street_number",
    "street_name",
    "unit_number",
    "unparsed_address",
    "city",
    "state_or_province",
    "postal_code",
    "county_or_parish",
    "subdivision_name",
    "latitude",
    "longitude",
    "bedrooms_total",
    "bathrooms_total_integer",
    "bathrooms_full",
    "bathrooms_half",
    "living_area",
    "lot_size_square_feet",
    "lot_size_acres",
    "year_built",
    "stories",
    "garage_spaces",
    "parking_total",
    "days_on_market",
    "photos_count",
    "pool_private_yn",
    "waterfront_yn",
    "new_construction_yn",
    "public_remarks",
    "list_agent_full_name",
    "list_office_name",
    "appliances",
    "flooring",
    "interior_features",
    "exterior_features",
    "heating",
    "cooling",
    "pool_features",
    "parking_features",
    "media",
    "first_synced_at",
    "last_synced_at",
    "seen_generation",
];

// Never overwritten on conflict.
const INSERT_ONLY_COLUMNS: &[&str] = &["listing_key", "first_synced_at"];

fn upsert_sql() -> String {
    let placeholders: Vec<String> = (1..=UPSERT_COLUMNS.len()).map(|i| format!("?{i}")).collect();
    let updates: Vec<String> = UPSERT_COLUMNS
        .iter()
        .filter(|col| !INSERT_ONLY_COLUMNS.contains(col))
        .map(|col| format!("{col} = excluded.{col}"))
        .collect();

    format!(
        "INSERT INTO listings ({}) VALUES ({}) ON CONFLICT(listing_key) DO UPDATE SET {}",
        UPSERT_COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ServerError> {
    serde_json::to_string(value).map_err(|e| ServerError::DbError(format!("encode JSON column: {e}")))
}

/// Insert-or-overwrite every record by `listing_key`, all inside one transaction.
/// Either the whole slice lands or none of it does.
pub fn upsert_listings(
    conn: &mut Connection,
    records: &[ListingRecord],
    generation: i64,
    now: DateTime<Utc>,
) -> Result<usize, ServerError> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&upsert_sql())?;

        for r in records {
            let appliances = to_json(&r.appliances)?;
            let flooring = to_json(&r.flooring)?;
            let interior_features = to_json(&r.interior_features)?;
            let exterior_features = to_json(&r.exterior_features)?;
            let heating = to_json(&r.heating)?;
            let cooling = to_json(&r.cooling)?;
            let pool_features = to_json(&r.pool_features)?;
            let parking_features = to_json(&r.parking_features)?;
            let media = to_json(&r.media)?;

            stmt.execute(params![
                // identity
                r.listing_key,
                r.listing_id,
                r.originating_system,
                r.mlg_can_view,
                // timestamps
                r.modification_timestamp,
                r.photos_change_timestamp,
                r.status_change_timestamp,
                r.listing_contract_date,
                r.close_date,
                // classification
                r.standard_status,
                r.mls_status,
                r.property_type,
                r.property_sub_type,
                // pricing
                r.list_price,
                r.original_list_price,
                r.close_price,
                r.association_fee,
                r.tax_annual_amount,
                // address
                r.street_number,
                r.street_name,
                r.unit_number,
                r.unparsed_address,
                r.city,
                r.state_or_province,
                r.postal_code,
                r.county_or_parish,
                r.subdivision_name,
                r.latitude,
                r.longitude,
                // facts
                r.bedrooms_total,
                r.bathrooms_total_integer,
                r.bathrooms_full,
                r.bathrooms_half,
                r.living_area,
                r.lot_size_square_feet,
                r.lot_size_acres,
                r.year_built,
                r.stories,
                r.garage_spaces,
                r.parking_total,
                r.days_on_market,
                r.photos_count,
                // flags
                r.pool_private_yn,
                r.waterfront_yn,
                r.new_construction_yn,
                // text
                r.public_remarks,
                r.list_agent_full_name,
                r.list_office_name,
                // features
                appliances,
                flooring,
                interior_features,
                exterior_features,
                heating,
                cooling,
                pool_features,
                parking_features,
                media,
                // bookkeeping
                now,
                now,
                generation,
            ])
            .map_err(|e| ServerError::DbError(format!("upsert {} failed: {e}", r.listing_key)))?;
        }
    }
    tx.commit()?;

    Ok(records.len())
}

/// Remove all listings whose key is in `keys`, in one statement.
pub fn delete_by_keys(conn: &Connection, keys: &[String]) -> Result<usize, ServerError> {
    if keys.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!("DELETE FROM listings WHERE listing_key IN ({placeholders})");

    conn.execute(&sql, params_from_iter(keys.iter()))
        .map_err(|e| ServerError::DbError(format!("bulk delete failed: {e}")))
}

/// Remove listings a completed full resync never saw.
pub fn delete_unseen(conn: &Connection, generation: i64) -> Result<usize, ServerError> {
    conn.execute(
        "DELETE FROM listings WHERE seen_generation < ?1",
        params![generation],
    )
    .map_err(|e| ServerError::DbError(format!("stale listing sweep failed: {e}")))
}

/// Mark rows modified exactly at `modified_at` as seen by `generation`.
///
/// A full sync that paused inside a run of equal timestamps resumes with a
/// strict `gt` filter and never refetches the rest of that run.
pub fn mark_seen_at(
    conn: &Connection,
    generation: i64,
    modified_at: DateTime<Utc>,
) -> Result<usize, ServerError> {
    conn.execute(
        "UPDATE listings SET seen_generation = ?1 WHERE modification_timestamp = ?2 AND seen_generation < ?1",
        params![generation, modified_at],
    )
    .map_err(|e| ServerError::DbError(format!("mark listings seen failed: {e}")))
}

pub fn count_listings(conn: &Connection) -> Result<i64, ServerError> {
    conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))
        .map_err(|e| ServerError::DbError(format!("count listings failed: {e}")))
}

fn push_in_clause(
    sql: &mut String,
    values: &mut Vec<Box<dyn ToSql>>,
    column: &str,
    items: &[String],
) {
    let items: Vec<String> = items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return;
    }
    let placeholders = vec!["?"; items.len()].join(", ");
    sql.push_str(&format!(" AND lower({column}) IN ({placeholders})"));
    for item in items {
        values.push(Box::new(item));
    }
}

/// Visible listings first synced after `since` that match `criteria`, newest first.
pub fn find_new_matching(
    conn: &Connection,
    criteria: &SearchCriteria,
    since: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ListingSummary>, ServerError> {
    let mut sql = String::from(
        r#"
        SELECT
            listing_key,              -- 0
            street_number,            -- 1
            street_name,              -- 2
            unit_number,              -- 3
            unparsed_address,         -- 4
            city,                     -- 5
            list_price,               -- 6
            bedrooms_total,           -- 7
            bathrooms_total_integer,  -- 8
            living_area,              -- 9
            media                     -- 10
        FROM listings
        WHERE mlg_can_view = 1 AND first_synced_at > ?
        "#,
    );
    let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(since)];

    push_in_clause(&mut sql, &mut values, "city", &criteria.cities);
    push_in_clause(&mut sql, &mut values, "postal_code", &criteria.postal_codes);
    push_in_clause(&mut sql, &mut values, "property_type", &criteria.property_types);
    push_in_clause(&mut sql, &mut values, "standard_status", &criteria.effective_statuses());

    if let Some(min) = criteria.min_price {
        sql.push_str(" AND list_price >= ?");
        values.push(Box::new(min));
    }
    if let Some(max) = criteria.max_price {
        sql.push_str(" AND list_price <= ?");
        values.push(Box::new(max));
    }
    if let Some(beds) = criteria.min_beds {
        sql.push_str(" AND bedrooms_total >= ?");
        values.push(Box::new(beds));
    }
    if let Some(baths) = criteria.min_baths {
        sql.push_str(" AND bathrooms_total_integer >= ?");
        values.push(Box::new(baths));
    }
    if let Some(area) = criteria.min_living_area {
        sql.push_str(" AND living_area >= ?");
        values.push(Box::new(area));
    }

    sql.push_str(" ORDER BY first_synced_at DESC, listing_key LIMIT ?");
    values.push(Box::new(limit as i64));

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            let parts = ListingRecord {
                street_number: row.get(1)?,
                street_name: row.get(2)?,
                unit_number: row.get(3)?,
                unparsed_address: row.get(4)?,
                ..Default::default()
            };
            let media_json: String = row.get(10)?;

            Ok(ListingSummary {
                listing_key: row.get(0)?,
                address: parts.display_address(),
                city: row.get(5)?,
                list_price: row.get(6)?,
                bedrooms_total: row.get(7)?,
                bathrooms_total_integer: row.get(8)?,
                living_area: row.get(9)?,
                photo_url: first_photo(&media_json),
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}

fn first_photo(media_json: &str) -> Option<String> {
    serde_json::from_str::<Vec<MediaItem>>(media_json)
        .ok()?
        .into_iter()
        .next()
        .map(|m| m.url)
}
