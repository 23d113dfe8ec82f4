use crate::classification::{DocumentType, SensitivityTier};
use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MB: u64 = 1024 * 1024;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";

/// Storage and validation rules for one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub allowed_mime_types: Vec<String>,
    pub max_size_bytes: u64,
    pub sensitivity: SensitivityTier,
    pub encryption_required: bool,
    pub auto_delete_after_approval: bool,
    pub retention_days: u32,
}

impl PolicyRule {
    pub fn new(sensitivity: SensitivityTier, max_size_bytes: u64, allowed_mime_types: &[&str]) -> Self {
        Self {
            allowed_mime_types: allowed_mime_types.iter().map(|m| (*m).to_string()).collect(),
            max_size_bytes,
            sensitivity,
            encryption_required: sensitivity != SensitivityTier::Public,
            auto_delete_after_approval: false,
            retention_days: 365,
        }
    }

    pub fn with_encryption(mut self, required: bool) -> Self {
        self.encryption_required = required;
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn delete_after_approval(mut self) -> Self {
        self.auto_delete_after_approval = true;
        self
    }

    pub fn allows_mime(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

/// Immutable `DocumentType -> PolicyRule` map, built once at startup.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: HashMap<DocumentType, PolicyRule>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PolicyTable {
    /// Platform policy set.
    pub fn standard() -> Self {
        Self::from_rules([
            (
                DocumentType::IdentityCard,
                PolicyRule::new(SensitivityTier::Critical, 5 * MB, &[MIME_JPEG, MIME_PNG, MIME_PDF])
                    .with_retention_days(365)
                    .delete_after_approval(),
            ),
            (
                DocumentType::OwnershipCertificate,
                PolicyRule::new(SensitivityTier::Critical, 10 * MB, &[MIME_PDF, MIME_JPEG, MIME_PNG])
                    .with_retention_days(2555),
            ),
            (
                DocumentType::CommitteeApproval,
                PolicyRule::new(SensitivityTier::Confidential, 10 * MB, &[MIME_PDF]).with_retention_days(1825),
            ),
            (
                DocumentType::RentalContract,
                PolicyRule::new(SensitivityTier::Confidential, 10 * MB, &[MIME_PDF]).with_retention_days(1825),
            ),
            (
                DocumentType::ParkingPhoto,
                PolicyRule::new(SensitivityTier::Public, 5 * MB, &[MIME_JPEG, MIME_PNG]).with_retention_days(730),
            ),
            (
                DocumentType::ProfilePhoto,
                PolicyRule::new(SensitivityTier::Public, 2 * MB, &[MIME_JPEG, MIME_PNG]).with_retention_days(730),
            ),
        ])
    }

    pub fn from_rules(rules: impl IntoIterator<Item = (DocumentType, PolicyRule)>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Look up the rule for a document type identifier.
    ///
    /// # Errors
    /// [`StorageError::UnknownDocumentType`] for unregistered types. Callers must
    /// then fall back to [`PolicyTable::restrictive_default`].
    pub fn policy_for(&self, document_type: &str) -> StorageResult<(DocumentType, &PolicyRule)> {
        let parsed: DocumentType = document_type.parse()?;
        self.rules
            .get(&parsed)
            .map(|rule| (parsed, rule))
            .ok_or_else(|| StorageError::UnknownDocumentType(document_type.to_string()))
    }

    /// Most restrictive rule: critical, encrypted, PDF only, 1 MB.
    pub fn restrictive_default() -> PolicyRule {
        PolicyRule::new(SensitivityTier::Critical, MB, &[MIME_PDF]).with_retention_days(365)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentType, &PolicyRule)> {
        self.rules.iter()
    }
}
