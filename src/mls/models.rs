use serde::Deserialize;

// RESO-style property record as served by the MLS Grid / Bridge OData feed.
//
// Property
//  ├── identity:    ListingKey, ListingId, OriginatingSystemName, MlgCanView
//  ├── timestamps:  ModificationTimestamp, PhotosChangeTimestamp, ...
//  ├── pricing:     ListPrice, OriginalListPrice, ClosePrice
//  ├── address:     StreetNumber, StreetName, City, PostalCode, ...
//  ├── facts:       BedroomsTotal, LivingArea, YearBuilt, ...
//  ├── features:    Appliances[], Flooring[], Heating[], ...
//  └── Media[]:     MediaURL, Order, MimeType, ShortDescription
//
// Upstream data is messy: numbers arrive as strings, lookups arrive either as
// arrays or comma-joined strings. Every field decodes leniently so that one bad
// value never fails a whole page.

/// One page of the feed: `{"value": [...], "@odata.nextLink": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    #[serde(rename = "value", default)]
    pub records: Vec<MlsProperty>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MlsProperty {
    #[serde(default, deserialize_with = "lenient::text")]
    pub listing_key: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub listing_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub originating_system_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub mlg_can_view: Option<bool>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub modification_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub photos_change_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub status_change_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub listing_contract_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub close_date: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub standard_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mls_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub property_sub_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub list_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub original_list_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub close_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub association_fee: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub tax_annual_amount: Option<f64>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub street_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub street_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub unit_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub unparsed_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub state_or_province: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub county_or_parish: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub subdivision_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub longitude: Option<f64>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub bedrooms_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub bathrooms_total_integer: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub bathrooms_full: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub bathrooms_half: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub living_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lot_size_square_feet: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lot_size_acres: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub year_built: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub stories: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub garage_spaces: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub parking_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub days_on_market: Option<f64>,

    #[serde(rename = "PoolPrivateYN", default, deserialize_with = "lenient::flag")]
    pub pool_private_yn: Option<bool>,
    #[serde(rename = "WaterfrontYN", default, deserialize_with = "lenient::flag")]
    pub waterfront_yn: Option<bool>,
    #[serde(rename = "NewConstructionYN", default, deserialize_with = "lenient::flag")]
    pub new_construction_yn: Option<bool>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub public_remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub list_agent_full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub list_office_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::string_list")]
    pub appliances: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub flooring: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub interior_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub exterior_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub heating: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub cooling: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub pool_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub parking_features: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient::media")]
    pub media: Option<Vec<MlsMedia>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MlsMedia {
    #[serde(default, deserialize_with = "lenient::text")]
    pub media_key: Option<String>,
    #[serde(rename = "MediaURL", default, deserialize_with = "lenient::text")]
    pub media_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub order: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub media_category: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub long_description: Option<String>,
}

mod lenient {
    use super::MlsMedia;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn flag<'de, D>(d: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "y" | "yes" | "1" => Some(true),
                "false" | "n" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn string_list<'de, D>(d: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Some(Value::String(s)) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        })
    }

    pub fn media<'de, D>(d: D) -> Result<Option<Vec<MlsMedia>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<MlsMedia>(item).ok())
                    .collect(),
            ),
            _ => None,
        })
    }
}
