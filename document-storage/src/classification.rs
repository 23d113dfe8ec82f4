use crate::error::StorageError;
use crypto::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensitivity tiers for uploaded documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityTier {
    /// Shown to other users (listing photos)
    Public,
    /// Contracts and committee paperwork
    Confidential,
    /// Identity and ownership proofs
    Critical,
}

impl SensitivityTier {
    /// Cipher used when a policy in this tier encrypts.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            SensitivityTier::Critical => Algorithm::Aead256,
            SensitivityTier::Confidential => Algorithm::Cbc256,
            SensitivityTier::Public => Algorithm::Cbc128,
        }
    }

    /// Whether encrypted documents of this tier are also watermarked.
    pub fn watermarks(&self) -> bool {
        matches!(self, SensitivityTier::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityTier::Public => "public",
            SensitivityTier::Confidential => "confidential",
            SensitivityTier::Critical => "critical",
        }
    }
}

impl fmt::Display for SensitivityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document categories accepted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdentityCard,
    OwnershipCertificate,
    CommitteeApproval,
    RentalContract,
    ParkingPhoto,
    ProfilePhoto,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::IdentityCard,
        DocumentType::OwnershipCertificate,
        DocumentType::CommitteeApproval,
        DocumentType::RentalContract,
        DocumentType::ParkingPhoto,
        DocumentType::ProfilePhoto,
    ];

    /// Identifier used in paths, key derivation and the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdentityCard => "identity_card",
            DocumentType::OwnershipCertificate => "ownership_certificate",
            DocumentType::CommitteeApproval => "committee_approval",
            DocumentType::RentalContract => "rental_contract",
            DocumentType::ParkingPhoto => "parking_photo",
            DocumentType::ProfilePhoto => "profile_photo",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|document_type| document_type.as_str() == s)
            .ok_or_else(|| StorageError::UnknownDocumentType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_algorithms() {
        assert_eq!(SensitivityTier::Critical.algorithm(), Algorithm::Aead256);
        assert_eq!(SensitivityTier::Confidential.algorithm(), Algorithm::Cbc256);
        assert_eq!(SensitivityTier::Public.algorithm(), Algorithm::Cbc128);
        assert!(SensitivityTier::Critical.algorithm().is_authenticated());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(SensitivityTier::Critical > SensitivityTier::Confidential);
        assert!(SensitivityTier::Confidential > SensitivityTier::Public);
    }

    #[test]
    fn test_document_type_parsing() {
        for document_type in DocumentType::ALL {
            assert_eq!(document_type.as_str().parse::<DocumentType>().unwrap(), document_type);
        }
        assert!(matches!(
            "passport_scan".parse::<DocumentType>(),
            Err(StorageError::UnknownDocumentType(_))
        ));
    }

    #[test]
    fn test_serde_matches_identifier() {
        let json = serde_json::to_string(&DocumentType::OwnershipCertificate).unwrap();
        assert_eq!(json, "\"ownership_certificate\"");
    }
}
