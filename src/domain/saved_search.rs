use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Filters a user saved on the search page, stored as JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    pub cities: Vec<String>,
    pub postal_codes: Vec<String>,
    pub property_types: Vec<String>,
    /// Empty means "Active" only.
    pub statuses: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_beds: Option<i32>,
    pub min_baths: Option<i32>,
    pub min_living_area: Option<i32>,
}

impl SearchCriteria {
    pub fn effective_statuses(&self) -> Vec<String> {
        if self.statuses.is_empty() {
            vec!["Active".to_string()]
        } else {
            self.statuses.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFrequency {
    Instant,
    Daily,
    Weekly,
    Never,
}

impl AlertFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::Instant => "instant",
            AlertFrequency::Daily => "daily",
            AlertFrequency::Weekly => "weekly",
            AlertFrequency::Never => "never",
        }
    }

    /// Unknown values are treated as `Never` so a typo can't spam anyone.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "instant" => AlertFrequency::Instant,
            "daily" => AlertFrequency::Daily,
            "weekly" => AlertFrequency::Weekly,
            _ => AlertFrequency::Never,
        }
    }

    /// Whether a search last alerted at `last` should be checked again at `now`.
    pub fn is_due(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let min_gap = match self {
            AlertFrequency::Never => return false,
            AlertFrequency::Instant => return true,
            AlertFrequency::Daily => Duration::hours(24),
            AlertFrequency::Weekly => Duration::days(7),
        };
        match last {
            Some(last) => now - last >= min_gap,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedSearch {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    pub user_name: Option<String>,
    pub name: String,
    pub criteria: SearchCriteria,
    pub frequency: AlertFrequency,
    pub last_alerted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SavedSearch {
    /// Listings first synced after this instant count as new for the search.
    pub fn new_since(&self) -> DateTime<Utc> {
        self.last_alerted_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn frequency_due_windows() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let yesterday_noon = now - Duration::hours(24);
        let this_morning = now - Duration::hours(3);

        assert!(AlertFrequency::Instant.is_due(Some(this_morning), now));
        assert!(AlertFrequency::Daily.is_due(Some(yesterday_noon), now));
        assert!(!AlertFrequency::Daily.is_due(Some(this_morning), now));
        assert!(!AlertFrequency::Weekly.is_due(Some(now - Duration::days(6)), now));
        assert!(AlertFrequency::Weekly.is_due(None, now));
        assert!(!AlertFrequency::Never.is_due(None, now));
    }

    #[test]
    fn unknown_frequency_never_sends() {
        assert_eq!(AlertFrequency::parse("Daily"), AlertFrequency::Daily);
        assert_eq!(AlertFrequency::parse("hourly"), AlertFrequency::Never);
    }

    #[test]
    fn criteria_decode_with_missing_fields() {
        let criteria: SearchCriteria =
            serde_json::from_str(r#"{"cities":["Austin"],"minPrice":300000}"#).unwrap();
        assert_eq!(criteria.cities, vec!["Austin".to_string()]);
        assert_eq!(criteria.min_price, Some(300000.0));
        assert_eq!(criteria.effective_statuses(), vec!["Active".to_string()]);
    }
}
