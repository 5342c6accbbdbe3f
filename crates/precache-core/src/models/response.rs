use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestKey;

/// A fetched response: status line, headers and body, exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub fetched_at: DateTime<Utc>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx, the only statuses accepted into a generation at install.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Clock skew lands here too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub(crate) fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            status: self.status,
            headers: self.headers.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

/// Everything about a response except its body; what the disk store persists as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ResponseMeta {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub fetched_at: DateTime<Utc>,
}

impl ResponseMeta {
    pub fn with_body(self, body: Bytes) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body,
            fetched_at: self.fetched_at,
        }
    }
}

/// One cached (key, response) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub key: RequestKey,
    pub response: Response,
}

impl ResourceEntry {
    pub fn new(key: RequestKey, response: Response) -> Self {
        Self { key, response }
    }
}
