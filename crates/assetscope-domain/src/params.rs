//! Typed view of the recognized request parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Recognized query parameters. Unrecognized keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Free-text query.
    pub q: Option<String>,
    /// An empty value restricts to parentless objects; other values are
    /// ignored.
    pub parent: Option<String>,
    /// Attachment mimetype prefix (`type`).
    pub type_filter: Option<String>,
    pub group_by: Option<String>,
    pub order_by: Option<String>,
    pub sort: Option<String>,
    /// Raw `all` flag for attachment grouping.
    pub all: Option<String>,
    /// Include every discoverable object in lists instead of subscribed ones.
    pub all_public: bool,
}

impl QueryParams {
    /// Builds the typed view from raw key/value pairs.
    ///
    /// Fails only when `all_public` carries an unrecognized boolean.
    pub fn from_pairs<I, K, V>(pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "q" => params.q = Some(value),
                "parent" => params.parent = Some(value),
                "type" => params.type_filter = Some(value),
                "group_by" => params.group_by = Some(value),
                "order_by" => params.order_by = Some(value),
                "sort" => params.sort = Some(value),
                "all" => params.all = Some(value),
                "all_public" => params.all_public = strtobool("all_public", &value)?,
                _ => {}
            }
        }
        Ok(params)
    }

    pub fn from_map(map: &HashMap<String, String>) -> DomainResult<Self> {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    pub fn with_query(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// True when `parent` is present and empty.
    pub fn parentless_only(&self) -> bool {
        self.parent.as_deref() == Some("")
    }
}

/// Parses a boolean the permissive way: `y yes t true on 1` and
/// `n no f false off 0`, case-insensitive.
pub fn strtobool(name: &str, value: &str) -> DomainResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        _ => Err(DomainError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
