// client.rs
use crate::config::Config;
use crate::mls::models::FeedPage;
use crate::mls::MlsError;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("mls_sync/", env!("CARGO_PKG_VERSION"));

/// What to ask the feed for. Rendered into an OData `$filter` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub originating_system: Option<String>,
    /// Only records with `MlgCanView eq true`.
    pub visible_only: bool,
    /// Exclusive lower bound on `ModificationTimestamp`.
    pub modified_after: Option<DateTime<Utc>>,
    pub page_size: usize,
}

impl FeedQuery {
    pub fn to_filter(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(system) = &self.originating_system {
            clauses.push(format!(
                "OriginatingSystemName eq '{}'",
                system.replace('\'', "''")
            ));
        }
        if self.visible_only {
            clauses.push("MlgCanView eq true".to_string());
        }
        if let Some(after) = self.modified_after {
            clauses.push(format!(
                "ModificationTimestamp gt {}",
                after.to_rfc3339_opts(SecondsFormat::Millis, true)
            ));
        }

        clauses.join(" and ")
    }
}

/// Source of listing pages. The sync loop only talks to this trait.
pub trait ListingFeed: Send + Sync {
    /// Fail fast on missing credentials, before anything touches the network.
    fn ensure_configured(&self) -> Result<(), MlsError> {
        Ok(())
    }

    fn first_page(&self, query: &FeedQuery) -> Result<FeedPage, MlsError>;

    /// Follow a server-supplied continuation link.
    fn next_page(&self, next_link: &str) -> Result<FeedPage, MlsError>;
}

pub struct MlsClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl MlsClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Result<Self, MlsError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| MlsError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, MlsError> {
        Self::new(config.mls_api_url.clone(), config.mls_access_token.clone())
    }

    fn token(&self) -> Result<&str, MlsError> {
        self.access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(MlsError::MissingToken)
    }

    /// Full request URL for the first page of `query`.
    pub fn page_url(&self, query: &FeedQuery) -> Result<Url, MlsError> {
        let mut params = vec![
            ("$expand", "Media".to_string()),
            ("$top", query.page_size.to_string()),
            ("$orderby", "ModificationTimestamp asc".to_string()),
        ];
        let filter = query.to_filter();
        if !filter.is_empty() {
            params.insert(0, ("$filter", filter));
        }

        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| MlsError::InvalidUrl(format!("{}: {e}", self.base_url)))
    }

    fn get_page(&self, url: &str) -> Result<FeedPage, MlsError> {
        let token = self.token()?;

        log::debug!("📄 GET {url}");

        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| MlsError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| MlsError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(MlsError::Http {
                status: status.as_u16(),
                body: truncate(&text, 500),
            });
        }

        serde_json::from_str::<FeedPage>(&text).map_err(|e| MlsError::Decode(e.to_string()))
    }
}

impl ListingFeed for MlsClient {
    fn ensure_configured(&self) -> Result<(), MlsError> {
        self.token().map(|_| ())
    }

    fn first_page(&self, query: &FeedQuery) -> Result<FeedPage, MlsError> {
        let url = self.page_url(query)?;
        self.get_page(url.as_str())
    }

    fn next_page(&self, next_link: &str) -> Result<FeedPage, MlsError> {
        self.get_page(next_link)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query() -> FeedQuery {
        FeedQuery {
            originating_system: Some("actris".into()),
            visible_only: false,
            modified_after: None,
            page_size: 500,
        }
    }

    #[test]
    fn filter_joins_clauses_in_order() {
        let mut q = query();
        q.visible_only = true;
        q.modified_after = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());

        assert_eq!(
            q.to_filter(),
            "OriginatingSystemName eq 'actris' and MlgCanView eq true \
             and ModificationTimestamp gt 2024-03-01T12:30:00.000Z"
        );
    }

    #[test]
    fn filter_without_lower_bound_has_no_timestamp_clause() {
        let q = query();
        assert!(!q.to_filter().contains("ModificationTimestamp"));
    }

    #[test]
    fn page_url_carries_odata_parameters() {
        let client = MlsClient::new("https://api.mlsgrid.com/v2/Property", Some("t".into())).unwrap();
        let url = client.page_url(&query()).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("$expand".into(), "Media".into())));
        assert!(pairs.contains(&("$top".into(), "500".into())));
        assert!(pairs.contains(&("$filter".into(), "OriginatingSystemName eq 'actris'".into())));
    }

    #[test]
    fn missing_token_is_reported_before_any_request() {
        let client = MlsClient::new("http://127.0.0.1:9/Property", None).unwrap();
        assert!(matches!(client.ensure_configured(), Err(MlsError::MissingToken)));
        assert!(matches!(client.first_page(&query()), Err(MlsError::MissingToken)));
    }
}
