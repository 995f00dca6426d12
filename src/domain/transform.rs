// src/domain/transform.rs

//! Maps raw feed records onto the local listing shape.
//!
//! Every mapping here is total. Unparseable dates and out-of-range integers
//! become `None` and missing feature lists become empty.

use crate::domain::listing::{ListingRecord, MediaItem};
use crate::mls::models::{MlsMedia, MlsProperty};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Transform one feed record. Returns `None` only when the record has no
/// `ListingKey`, since it could never be matched again.
pub fn transform_property(prop: &MlsProperty) -> Option<ListingRecord> {
    let listing_key = prop
        .listing_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())?
        .to_string();

    let media = transform_media(prop.media.as_deref());

    Some(ListingRecord {
        listing_key,
        listing_id: prop.listing_id.clone(),
        originating_system: prop.originating_system_name.clone(),
        mlg_can_view: prop.mlg_can_view.unwrap_or(true),

        modification_timestamp: parse_timestamp(prop.modification_timestamp.as_deref()),
        photos_change_timestamp: parse_timestamp(prop.photos_change_timestamp.as_deref()),
        status_change_timestamp: parse_timestamp(prop.status_change_timestamp.as_deref()),
        listing_contract_date: parse_timestamp(prop.listing_contract_date.as_deref()),
        close_date: parse_timestamp(prop.close_date.as_deref()),

        standard_status: prop.standard_status.clone(),
        mls_status: prop.mls_status.clone(),
        property_type: prop.property_type.clone(),
        property_sub_type: prop.property_sub_type.clone(),

        list_price: finite(prop.list_price),
        original_list_price: finite(prop.original_list_price),
        close_price: finite(prop.close_price),
        association_fee: finite(prop.association_fee),
        tax_annual_amount: finite(prop.tax_annual_amount),

        street_number: prop.street_number.clone(),
        street_name: prop.street_name.clone(),
        unit_number: prop.unit_number.clone(),
        unparsed_address: prop.unparsed_address.clone(),
        city: prop.city.clone(),
        state_or_province: prop.state_or_province.clone(),
        postal_code: prop.postal_code.clone(),
        county_or_parish: prop.county_or_parish.clone(),
        subdivision_name: prop.subdivision_name.clone(),
        latitude: finite(prop.latitude),
        longitude: finite(prop.longitude),

        bedrooms_total: bounded_int(prop.bedrooms_total),
        bathrooms_total_integer: bounded_int(prop.bathrooms_total_integer),
        bathrooms_full: bounded_int(prop.bathrooms_full),
        bathrooms_half: bounded_int(prop.bathrooms_half),
        living_area: bounded_int(prop.living_area),
        lot_size_square_feet: bounded_int(prop.lot_size_square_feet),
        lot_size_acres: finite(prop.lot_size_acres),
        year_built: bounded_int(prop.year_built),
        stories: bounded_int(prop.stories),
        garage_spaces: bounded_int(prop.garage_spaces),
        parking_total: bounded_int(prop.parking_total),
        days_on_market: bounded_int(prop.days_on_market),
        photos_count: i32::try_from(media.len()).unwrap_or(i32::MAX),

        pool_private_yn: prop.pool_private_yn,
        waterfront_yn: prop.waterfront_yn,
        new_construction_yn: prop.new_construction_yn,

        public_remarks: prop.public_remarks.clone(),
        list_agent_full_name: prop.list_agent_full_name.clone(),
        list_office_name: prop.list_office_name.clone(),

        appliances: list_or_empty(&prop.appliances),
        flooring: list_or_empty(&prop.flooring),
        interior_features: list_or_empty(&prop.interior_features),
        exterior_features: list_or_empty(&prop.exterior_features),
        heating: list_or_empty(&prop.heating),
        cooling: list_or_empty(&prop.cooling),
        pool_features: list_or_empty(&prop.pool_features),
        parking_features: list_or_empty(&prop.parking_features),

        media,
    })
}

/// Normalize the expanded media array: drop entries without a URL and sort by
/// provider order, unordered entries last.
pub fn transform_media(media: Option<&[MlsMedia]>) -> Vec<MediaItem> {
    let mut items: Vec<MediaItem> = media
        .unwrap_or_default()
        .iter()
        .filter_map(|m| {
            let url = m.media_url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            Some(MediaItem {
                url: url.to_string(),
                order: bounded_int(m.order),
                mime_type: m.mime_type.clone(),
                description: m
                    .short_description
                    .clone()
                    .or_else(|| m.long_description.clone()),
            })
        })
        .collect();

    // sort_by_key is stable, so equal orders keep feed order.
    items.sort_by_key(|item| (item.order.is_none(), item.order));
    items
}

/// Parse the date formats the feed uses. Anything unparseable is `None`.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Round to the nearest integer and keep it only if it fits a signed 32-bit column.
pub fn bounded_int(value: Option<f64>) -> Option<i32> {
    let v = value?;
    if !v.is_finite() {
        return None;
    }
    let rounded = v.round();
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return None;
    }
    Some(rounded as i32)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn list_or_empty(list: &Option<Vec<String>>) -> Vec<String> {
    list.clone().unwrap_or_default()
}
