//! Input safety gate
//!
//! Rejects unsafe or malformed input before it reaches the database driver.
//! Every check here is a pure function over its input and reports through a
//! [`Verdict`] instead of an error, so request handlers can compose
//! validation with the rest of their flow uniformly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Verdict;

/// URI schemes accepted for MongoDB connection strings
pub const CONNECTION_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// Substrings that mark a connection string as an injection attempt
/// (matched case-insensitively)
pub const INJECTION_PATTERNS: [&str; 4] = ["javascript:", "<script", "eval(", "function("];

/// Query operators that enable server-side code execution
pub const DENIED_OPERATORS: [&str; 5] = ["$where", "$function", "mapReduce", "$accumulator", "eval"];

pub const DEFAULT_MAX_QUERY_DEPTH: usize = 5;
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;
pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_PAGE_LIMIT: u64 = 100;
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// What kind of object a name identifies; only used to word messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Database,
    Collection,
    Index,
}

impl NameKind {
    fn label(&self) -> &'static str {
        match self {
            NameKind::Database => "Database",
            NameKind::Collection => "Collection",
            NameKind::Index => "Index",
        }
    }
}

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Number of documents to skip for this page
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Ceilings enforced on query and document payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGate {
    max_query_depth: usize,
    max_document_bytes: usize,
}

impl InputGate {
    pub fn new(max_query_depth: usize, max_document_bytes: usize) -> Self {
        Self {
            max_query_depth,
            max_document_bytes,
        }
    }

    pub fn max_query_depth(&self) -> usize {
        self.max_query_depth
    }

    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }

    /// Validate the shape of a MongoDB connection string.
    ///
    /// The raw string is never logged; it only ever appears in the
    /// caller-facing rejection text.
    pub fn validate_connection_string(connection_string: &str) -> Verdict {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Verdict::reject("Connection string is required");
        }

        if !CONNECTION_SCHEMES
            .iter()
            .any(|scheme| trimmed.starts_with(scheme))
        {
            return Verdict::reject(
                "Connection string must start with mongodb:// or mongodb+srv://",
            );
        }

        let lowered = trimmed.to_ascii_lowercase();
        if INJECTION_PATTERNS
            .iter()
            .any(|pattern| lowered.contains(pattern))
        {
            return Verdict::reject("Connection string contains potentially dangerous content");
        }

        Verdict::ok()
    }

    /// Reject queries using denied operators or nested deeper than the
    /// configured ceiling. The depth boundary is inclusive.
    pub fn validate_query_shape(&self, query: &Value) -> Verdict {
        if let Some(operator) = find_denied_operator(query) {
            tracing::debug!(operator, "query rejected for denied operator");
            return Verdict::reject(format!("Operator '{}' is not allowed", operator));
        }

        let depth = query_depth(query);
        if depth > self.max_query_depth {
            return Verdict::reject(format!(
                "Query nesting depth {} exceeds the maximum of {}",
                depth, self.max_query_depth
            ));
        }

        Verdict::ok()
    }

    /// Reject documents whose serialized size exceeds the ceiling
    pub fn validate_document_size(&self, document: &Value) -> Verdict {
        let size = match serde_json::to_vec(document) {
            Ok(bytes) => bytes.len(),
            Err(e) => return Verdict::reject(format!("Document cannot be serialized: {}", e)),
        };

        if size > self.max_document_bytes {
            return Verdict::reject(format!(
                "Document size {} bytes exceeds the maximum of {} bytes",
                size, self.max_document_bytes
            ));
        }

        Verdict::ok()
    }

    /// Validate a database, collection, or index name
    pub fn validate_name(name: &str, kind: NameKind) -> Verdict {
        let label = kind.label();
        if name.is_empty() {
            return Verdict::reject(format!("{} name is required", label));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Verdict::reject(format!(
                "{} name may only contain letters, numbers, underscores, and hyphens",
                label
            ));
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Verdict::reject(format!(
                "{} name cannot exceed {} characters",
                label, MAX_NAME_LENGTH
            ));
        }

        Verdict::ok()
    }

    /// Parse and validate raw page/limit parameters. Missing values fall
    /// back to page 1 and a limit of 20.
    pub fn validate_pagination(
        page: Option<&str>,
        limit: Option<&str>,
    ) -> std::result::Result<Pagination, Verdict> {
        let page = parse_positive(page, DEFAULT_PAGE)
            .ok_or_else(|| Verdict::reject("Page must be a positive integer"))?;
        let limit = parse_positive(limit, DEFAULT_PAGE_LIMIT)
            .ok_or_else(|| Verdict::reject("Limit must be a positive integer"))?;

        if limit > MAX_PAGE_LIMIT {
            return Err(Verdict::reject(format!(
                "Limit cannot exceed {}",
                MAX_PAGE_LIMIT
            )));
        }

        Ok(Pagination { page, limit })
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUERY_DEPTH, DEFAULT_MAX_DOCUMENT_BYTES)
    }
}

/// Remove every denied operator key, at any depth, leaving the rest of the
/// structure untouched.
pub fn sanitize_query(query: &Value) -> Value {
    match query {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !is_denied_key(key))
                .map(|(key, value)| (key.clone(), sanitize_query(value)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_query).collect()),
        other => other.clone(),
    }
}

/// Nesting depth of a query value: scalars are 0, each object or array level
/// adds one.
pub fn query_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(query_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(query_depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn is_denied_key(key: &str) -> bool {
    DENIED_OPERATORS.contains(&key)
}

fn find_denied_operator(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, nested)| {
            DENIED_OPERATORS
                .iter()
                .find(|op| **op == key.as_str())
                .copied()
                .or_else(|| find_denied_operator(nested))
        }),
        Value::Array(items) => items.iter().find_map(find_denied_operator),
        Value::String(s) => DENIED_OPERATORS.iter().find(|op| s.contains(**op)).copied(),
        _ => None,
    }
}

fn parse_positive(raw: Option<&str>, default: u64) -> Option<u64> {
    match raw.map(str::trim) {
        None | Some("") => Some(default),
        Some(value) => match value.parse::<i64>() {
            Ok(n) if n > 0 => Some(n as u64),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests;
