use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Key of a cacheable resource: an absolute URL or an origin-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ModelError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ModelError::EmptyKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RequestKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RequestKey> for String {
    fn from(value: RequestKey) -> Self {
        value.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free list of resources preloaded at install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Manifest {
    keys: Vec<RequestKey>,
}

impl Manifest {
    /// Build a manifest, rejecting blank and repeated keys.
    pub fn new<I, K>(keys: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for key in keys {
            let key = RequestKey::new(key)?;
            if !seen.insert(key.clone()) {
                return Err(ModelError::DuplicateKey(key.0));
            }
            out.push(key);
        }
        Ok(Self { keys: out })
    }

    pub fn keys(&self) -> &[RequestKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl TryFrom<Vec<String>> for Manifest {
    type Error = ModelError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Manifest> for Vec<String> {
    fn from(value: Manifest) -> Self {
        value.keys.into_iter().map(String::from).collect()
    }
}
