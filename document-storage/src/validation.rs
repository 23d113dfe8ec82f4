//! Upload validation against the policy table.
//!
//! Every check runs so the caller gets the full list of violations in one
//! pass. Extension/MIME disagreement is only a warning; everything else is an
//! error.

use crate::policies::{PolicyRule, PolicyTable, MIME_JPEG, MIME_PDF, MIME_PNG};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const PDF_MAGIC: &[u8] = b"%PDF";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Bytes inspected by the script-marker scan.
const SCAN_WINDOW: usize = 1024;

const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "msi", "dll", "js", "vbs", "jar", "sh", "ps1", "php", "html",
    "htm", "svg",
];

const SCRIPT_MARKERS: &[&str] = &[
    "<script",
    "javascript:",
    "vbscript:",
    "onload=",
    "onerror=",
    "eval(",
    "<?php",
    "<iframe",
];

/// Upload as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(original_file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_file_name: original_file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased final extension of the original file name.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Outcome of validating one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Rule the upload was checked against. For unknown types this is the
    /// restrictive fallback.
    pub rule: PolicyRule,
}

/// Checks uploads against the policy table. Pure; touches no files.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    policies: Arc<PolicyTable>,
}

impl ContentValidator {
    pub fn new(policies: Arc<PolicyTable>) -> Self {
        Self { policies }
    }

    pub fn validate(&self, upload: &UploadedFile, document_type: &str) -> ValidationResult {
        let rule = match self.policies.policy_for(document_type) {
            Ok((_, rule)) => rule.clone(),
            Err(_) => {
                return ValidationResult {
                    valid: false,
                    errors: vec![format!("Unknown document type: {document_type}")],
                    warnings: Vec::new(),
                    rule: PolicyTable::restrictive_default(),
                };
            }
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mime_type = upload.mime_type.to_ascii_lowercase();

        if !rule.allows_mime(&mime_type) {
            errors.push(format!(
                "File type {} is not allowed for {document_type}; allowed: {}",
                upload.mime_type,
                rule.allowed_mime_types.join(", ")
            ));
        }

        if upload.size() > rule.max_size_bytes {
            errors.push(format!(
                "File size {} bytes exceeds the {} byte limit for {document_type}",
                upload.size(),
                rule.max_size_bytes
            ));
        }

        if let Some(warning) = extension_mismatch(upload, &mime_type) {
            warnings.push(warning);
        }

        if let Some(error) = magic_number_mismatch(&upload.bytes, &mime_type) {
            errors.push(error);
        }

        errors.extend(safety_violations(upload));

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
            rule,
        }
    }
}

fn expected_extensions(mime_type: &str) -> Option<&'static [&'static str]> {
    match mime_type {
        MIME_PDF => Some(&["pdf"]),
        MIME_JPEG => Some(&["jpg", "jpeg"]),
        MIME_PNG => Some(&["png"]),
        _ => None,
    }
}

fn extension_mismatch(upload: &UploadedFile, mime_type: &str) -> Option<String> {
    let expected = expected_extensions(mime_type)?;
    match upload.extension() {
        Some(ext) if expected.contains(&ext.as_str()) => None,
        Some(ext) => Some(format!(
            "File extension .{ext} does not match declared type {mime_type}"
        )),
        None => Some(format!("File name has no extension; declared type {mime_type}")),
    }
}

fn magic_number_mismatch(bytes: &[u8], mime_type: &str) -> Option<String> {
    let (magic, label) = match mime_type {
        MIME_PDF => (PDF_MAGIC, "PDF"),
        MIME_JPEG => (JPEG_MAGIC, "JPEG"),
        MIME_PNG => (PNG_MAGIC, "PNG"),
        _ => return None,
    };

    if bytes.starts_with(magic) {
        None
    } else {
        Some(format!("File content is not a valid {label} (signature mismatch)"))
    }
}

fn safety_violations(upload: &UploadedFile) -> Vec<String> {
    let mut violations = Vec::new();

    let lowered_name = upload.original_file_name.to_ascii_lowercase();
    // Every dotted segment counts, so "scan.exe.pdf" is caught too.
    let blocked: Vec<&str> = lowered_name
        .split('.')
        .skip(1)
        .filter(|segment| BLOCKED_EXTENSIONS.contains(segment))
        .collect();
    if !blocked.is_empty() {
        violations.push(format!(
            "File name contains a blocked extension: .{}",
            blocked.join(", .")
        ));
    }

    let window = upload.bytes.get(..SCAN_WINDOW).unwrap_or(&upload.bytes);
    let head = String::from_utf8_lossy(window).to_ascii_lowercase();
    for marker in SCRIPT_MARKERS {
        if head.contains(marker) {
            violations.push(format!("File content contains a suspicious pattern: {marker}"));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ContentValidator {
        ContentValidator::new(Arc::new(PolicyTable::standard()))
    }

    fn jpeg(size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        bytes[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
        bytes
    }

    fn png(size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        bytes[..8].copy_from_slice(PNG_MAGIC);
        bytes
    }

    #[test]
    fn test_accepts_valid_jpeg() {
        let upload = UploadedFile::new("front.jpg", "image/jpeg", jpeg(2 * 1024 * 1024));
        let result = validator().validate(&upload, "identity_card");

        assert!(result.valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_accepts_valid_pdf() {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend(vec![b' '; 4096]);
        let upload = UploadedFile::new("minutes.pdf", "application/pdf", bytes);

        assert!(validator().validate(&upload, "committee_approval").valid);
    }

    #[test]
    fn test_unknown_type_single_error_with_fallback_rule() {
        let upload = UploadedFile::new("x.exe", "text/html", b"<script>".to_vec());
        let result = validator().validate(&upload, "spaceship_manual");

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.rule, PolicyTable::restrictive_default());
    }

    #[test]
    fn test_disallowed_mime_rejected() {
        let upload = UploadedFile::new("photo.png", "image/png", png(1024));
        let result = validator().validate(&upload, "rental_contract");

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("not allowed")));
    }

    #[test]
    fn test_oversized_is_error_not_warning() {
        let upload = UploadedFile::new("front.jpg", "image/jpeg", jpeg(6 * 1024 * 1024));
        let result = validator().validate(&upload, "identity_card");

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("exceeds")));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_extension_mismatch_is_only_a_warning() {
        let upload = UploadedFile::new("front.png", "image/jpeg", jpeg(1024));
        let result = validator().validate(&upload, "identity_card");

        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_magic_number_mismatch_is_error() {
        let upload = UploadedFile::new("photo.png", "image/png", jpeg(1024));
        let result = validator().validate(&upload, "parking_photo");

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("signature")));
    }

    #[test]
    fn test_blocked_double_extension() {
        let mut bytes = b"%PDF-1.4".to_vec();
        bytes.extend(vec![0u8; 100]);
        let upload = UploadedFile::new("invoice.exe.pdf", "application/pdf", bytes);
        let result = validator().validate(&upload, "rental_contract");

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains(".exe")));
    }

    #[test]
    fn test_script_marker_detected_case_insensitively() {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(b"<ScRiPt>alert(1)</script>");
        let upload = UploadedFile::new("contract.pdf", "application/pdf", bytes);
        let result = validator().validate(&upload, "rental_contract");

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("<script")));
    }

    #[test]
    fn test_script_marker_beyond_scan_window_ignored() {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend(vec![b' '; 2048]);
        bytes.extend_from_slice(b"<script>");
        let upload = UploadedFile::new("contract.pdf", "application/pdf", bytes);

        assert!(validator().validate(&upload, "rental_contract").valid);
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut bytes = vec![0u8; 6 * 1024 * 1024];
        bytes[..11].copy_from_slice(b"javascript:");
        let upload = UploadedFile::new("payload.sh", "text/plain", bytes);
        let result = validator().validate(&upload, "parking_photo");

        // mime, size, blocked extension, script marker
        assert_eq!(result.errors.len(), 4, "{:?}", result.errors);
    }
}
