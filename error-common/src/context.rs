use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error context information attached to a report.
///
/// Holds identifiers only. Never put document bytes or key material in here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub owner_id: Option<u64>,
    pub document_type: Option<String>,
    pub path: Option<String>,
    pub additional: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_owner(mut self, owner_id: u64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn add_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }
}
