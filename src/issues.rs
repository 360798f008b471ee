//! Counting and fetching unresolved issues.
//!
//! Both operations go through the issue-search endpoint. Counting requests a
//! single-entry page and reads only the reported grand total; fetching pulls
//! one page of issues plus the components they reference. Issue records stay
//! opaque JSON because the report renders them whole; components are typed
//! because their fields drive file lookup.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::http::{Client, ClientError, DEFAULT_EXPECTED_STATUS};
use crate::log::{BLOCK_END, Logger};

/// Server-side cap on the requested page size.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Page-size sentinel for "as many as the server will give".
pub const UNLIMITED: i64 = -1;

/// Errors while counting or fetching issues.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("'limit' argument cannot be greater than {MAX_PAGE_SIZE}")]
    LimitTooLarge,

    #[error("finding issues failed")]
    Client(#[from] ClientError),

    #[error("finding issues failed: invalid search response")]
    Parse(#[from] serde_json::Error),
}

/// A file or module the server attaches issues to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Component {
    pub key: String,
    pub name: String,
    pub long_name: String,
}

/// The page of issues actually fetched, plus the server's grand total. The
/// total can exceed the page when the server capped it.
#[derive(Debug, Clone)]
pub struct IssueSet {
    pub total: u64,
    pub items: Vec<Value>,
}

/// Read-only lookup table from component key to component, built once per
/// fetch.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    by_key: HashMap<String, Component>,
}

impl ComponentSet {
    pub fn get(&self, key: &str) -> Option<&Component> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl FromIterator<Component> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self {
            by_key: iter.into_iter().map(|c| (c.key.clone(), c)).collect(),
        }
    }
}

/// Envelope for the count probe; only the grand total matters.
#[derive(Debug, Deserialize)]
struct CountEnvelope {
    total: u64,
}

/// Envelope for a full search page.
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    total: u64,
    issues: Vec<Value>,
    components: Vec<Component>,
}

/// Counts and fetches unresolved issues via the search endpoint.
pub struct IssueFetcher<'a> {
    client: &'a Client<'a>,
    logger: &'a dyn Logger,
}

impl<'a> IssueFetcher<'a> {
    pub fn new(client: &'a Client<'a>, logger: &'a dyn Logger) -> Self {
        Self { client, logger }
    }

    /// Returns the server's total count of unresolved issues.
    pub fn count_unresolved(&self, base_url: &str) -> Result<u64, FetchError> {
        self.logger.info("Finding issues count");

        let url = format!("{base_url}/api/issues/search?pageSize=1&resolved=false");
        let body = self.fetch_body(&url)?;

        let envelope: CountEnvelope = serde_json::from_str(&body)?;
        self.logger
            .info(&format!("Issues count is {}", envelope.total));
        self.logger.info(BLOCK_END);
        Ok(envelope.total)
    }

    /// Fetches up to `limit` unresolved issues together with the components
    /// they reference. A negative limit means unlimited; limits above
    /// [`MAX_PAGE_SIZE`] are rejected before any network call.
    pub fn fetch_issues(
        &self,
        base_url: &str,
        limit: i64,
    ) -> Result<(IssueSet, ComponentSet), FetchError> {
        let limit = if limit < 0 { UNLIMITED } else { limit };
        if limit > MAX_PAGE_SIZE {
            return Err(FetchError::LimitTooLarge);
        }

        self.logger.info("Finding issues");

        let url = format!("{base_url}/api/issues/search?pageSize={limit}&resolved=false");
        let body = self.fetch_body(&url)?;

        let envelope: SearchEnvelope = serde_json::from_str(&body)?;
        let issues = IssueSet {
            total: envelope.total,
            items: envelope.issues,
        };
        let components: ComponentSet = envelope.components.into_iter().collect();

        self.logger
            .info(&format!("Found {} issues", issues.items.len()));
        self.logger.info(BLOCK_END);
        Ok((issues, components))
    }

    /// One unauthenticated, retried GET returning the response body.
    fn fetch_body(&self, url: &str) -> Result<String, ClientError> {
        let mut body = String::new();
        let mut capture = |text: &str| {
            body = text.to_string();
            Ok(())
        };
        self.client
            .execute(url, DEFAULT_EXPECTED_STATUS, false, Some(&mut capture))?;
        Ok(body)
    }
}
