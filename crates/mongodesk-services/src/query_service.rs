//! Query guarding for request handlers
//!
//! Every query, pipeline, document and name a handler receives passes
//! through [`QueryGuard`] before it reaches a driver call.

use std::time::Duration;

use mongodesk_core::{InputGate, NameKind, query_depth, sanitize_query};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};

/// How a call site treats denied operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Reject the whole query
    #[default]
    Strict,
    /// Strip denied keys and forward the rest
    Sanitize,
}

/// A find request as received from a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
    pub database: String,
    pub collection: String,
    #[serde(default)]
    pub filter: Value,
    /// Raw page parameter, as it arrived
    #[serde(default)]
    pub page: Option<String>,
    /// Raw limit parameter, as it arrived
    #[serde(default)]
    pub limit: Option<String>,
    /// Caller-supplied server-side time limit
    #[serde(default)]
    pub max_time_ms: Option<u64>,
}

/// A find request that is safe to hand to the driver
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub database: String,
    pub collection: String,
    pub filter: Value,
    pub skip: u64,
    pub limit: u64,
    /// Only set when the caller asked for one; no default is imposed
    pub max_time: Option<Duration>,
}

/// Applies the input gate to handler inputs
#[derive(Debug, Clone, Default)]
pub struct QueryGuard {
    gate: InputGate,
}

impl QueryGuard {
    pub fn new(gate: InputGate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    /// Check names, filter and pagination of a find request
    pub fn prepare_find(&self, request: FindRequest, mode: QueryMode) -> ServiceResult<PreparedQuery> {
        self.check_namespace(&request.database, &request.collection)?;

        let pagination =
            InputGate::validate_pagination(request.page.as_deref(), request.limit.as_deref())
                .map_err(verdict_error)?;

        let filter = match request.filter {
            Value::Null => Value::Object(Default::default()),
            filter => self.guard_query(&filter, mode)?,
        };

        Ok(PreparedQuery {
            database: request.database,
            collection: request.collection,
            filter,
            skip: pagination.skip(),
            limit: pagination.limit,
            max_time: request.max_time_ms.map(Duration::from_millis),
        })
    }

    /// Check an aggregation pipeline, which must be an array of stages
    pub fn prepare_pipeline(&self, pipeline: &Value, mode: QueryMode) -> ServiceResult<Value> {
        if !pipeline.is_array() {
            return Err(ServiceError::Validation(
                "Pipeline must be an array of stages".to_string(),
            ));
        }
        self.guard_query(pipeline, mode)
    }

    /// Check a query document in the given mode and return what may be
    /// forwarded
    pub fn guard_query(&self, query: &Value, mode: QueryMode) -> ServiceResult<Value> {
        match mode {
            QueryMode::Strict => {
                self.gate
                    .validate_query_shape(query)
                    .into_result()
                    .map_err(ServiceError::from)?;
                Ok(query.clone())
            }
            QueryMode::Sanitize => {
                let sanitized = sanitize_query(query);
                let depth = query_depth(&sanitized);
                if depth > self.gate.max_query_depth() {
                    return Err(ServiceError::Validation(format!(
                        "Query nesting depth {} exceeds the maximum of {}",
                        depth,
                        self.gate.max_query_depth()
                    )));
                }
                if &sanitized != query {
                    tracing::debug!("removed denied operators from query");
                }
                Ok(sanitized)
            }
        }
    }

    /// Check a document payload for insert or replace.
    ///
    /// Only shape and size are checked. Operator names inside values and
    /// deep nesting are allowed in stored data.
    pub fn check_document(&self, document: &Value) -> ServiceResult<()> {
        if !document.is_object() {
            return Err(ServiceError::Validation(
                "Document must be an object".to_string(),
            ));
        }
        self.gate.validate_document_size(document).into_result()?;
        Ok(())
    }

    /// Check a database and collection name pair
    pub fn check_namespace(&self, database: &str, collection: &str) -> ServiceResult<()> {
        InputGate::validate_name(database, NameKind::Database).into_result()?;
        InputGate::validate_name(collection, NameKind::Collection).into_result()?;
        Ok(())
    }
}

fn verdict_error(verdict: mongodesk_core::Verdict) -> ServiceError {
    ServiceError::Validation(
        verdict
            .error
            .unwrap_or_else(|| "Invalid pagination".to_string()),
    )
}
