// Stable error codes returned to API layers alongside the error category.

pub mod validation {
    pub const REJECTED_UPLOAD: &str = "VALIDATION_1001";
    pub const UNKNOWN_DOCUMENT_TYPE: &str = "VALIDATION_1002";
}

pub mod configuration {
    pub const MASTER_SECRET_MISSING: &str = "CONFIG_2001";
    pub const INVALID_SETTING: &str = "CONFIG_2002";
}

pub mod envelope {
    pub const UNSUPPORTED_VERSION: &str = "ENVELOPE_3001";
    pub const UNSUPPORTED_ALGORITHM: &str = "ENVELOPE_3002";
    pub const KEY_UNWRAP_FAILED: &str = "ENVELOPE_3003";
    pub const AUTHENTICATION_FAILED: &str = "ENVELOPE_3004";
    pub const DECRYPTION_FAILED: &str = "ENVELOPE_3005";
    pub const MALFORMED: &str = "ENVELOPE_3006";
    pub const MISSING_CONTEXT: &str = "ENVELOPE_3007";
    pub const CRYPTO_FAILURE: &str = "ENVELOPE_3008";
}

pub mod io {
    pub const NOT_FOUND: &str = "IO_4001";
    pub const PATH_OUTSIDE_ROOT: &str = "IO_4002";
    pub const WRITE_FAILED: &str = "IO_4003";
    pub const TASK_FAILED: &str = "IO_4004";
}
