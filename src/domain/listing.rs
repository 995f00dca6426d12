use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One photo/document attached to a listing, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub url: String,
    pub order: Option<i32>,
    pub mime_type: Option<String>,
    pub description: Option<String>,
}

/// A listing in the shape of the local `listings` table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingRecord {
    pub listing_key: String,
    pub listing_id: Option<String>,
    pub originating_system: Option<String>,
    pub mlg_can_view: bool,

    pub modification_timestamp: Option<DateTime<Utc>>,
    pub photos_change_timestamp: Option<DateTime<Utc>>,
    pub status_change_timestamp: Option<DateTime<Utc>>,
    pub listing_contract_date: Option<DateTime<Utc>>,
    pub close_date: Option<DateTime<Utc>>,

    pub standard_status: Option<String>,
    pub mls_status: Option<String>,
    pub property_type: Option<String>,
    pub property_sub_type: Option<String>,

    pub list_price: Option<f64>,
    pub original_list_price: Option<f64>,
    pub close_price: Option<f64>,
    pub association_fee: Option<f64>,
    pub tax_annual_amount: Option<f64>,

    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub unit_number: Option<String>,
    pub unparsed_address: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    pub county_or_parish: Option<String>,
    pub subdivision_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    // Stored as 32-bit integers; out-of-range upstream values become None.
    pub bedrooms_total: Option<i32>,
    pub bathrooms_total_integer: Option<i32>,
    pub bathrooms_full: Option<i32>,
    pub bathrooms_half: Option<i32>,
    pub living_area: Option<i32>,
    pub lot_size_square_feet: Option<i32>,
    pub lot_size_acres: Option<f64>,
    pub year_built: Option<i32>,
    pub stories: Option<i32>,
    pub garage_spaces: Option<i32>,
    pub parking_total: Option<i32>,
    pub days_on_market: Option<i32>,
    pub photos_count: i32,

    pub pool_private_yn: Option<bool>,
    pub waterfront_yn: Option<bool>,
    pub new_construction_yn: Option<bool>,

    pub public_remarks: Option<String>,
    pub list_agent_full_name: Option<String>,
    pub list_office_name: Option<String>,

    pub appliances: Vec<String>,
    pub flooring: Vec<String>,
    pub interior_features: Vec<String>,
    pub exterior_features: Vec<String>,
    pub heating: Vec<String>,
    pub cooling: Vec<String>,
    pub pool_features: Vec<String>,
    pub parking_features: Vec<String>,

    pub media: Vec<MediaItem>,
}

impl ListingRecord {
    /// Street address for display, falling back to the unparsed form.
    pub fn display_address(&self) -> String {
        let parts: Vec<&str> = [
            self.street_number.as_deref(),
            self.street_name.as_deref(),
            self.unit_number.as_deref().filter(|u| !u.is_empty()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            self.unparsed_address.clone().unwrap_or_default()
        } else {
            parts.join(" ")
        }
    }
}

/// The subset of a stored listing an alert e-mail needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSummary {
    pub listing_key: String,
    pub address: String,
    pub city: Option<String>,
    pub list_price: Option<f64>,
    pub bedrooms_total: Option<i32>,
    pub bathrooms_total_integer: Option<i32>,
    pub living_area: Option<i32>,
    pub photo_url: Option<String>,
}
