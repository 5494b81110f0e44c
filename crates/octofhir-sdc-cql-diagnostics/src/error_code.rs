//! Error codes following a structured numbering system
//!
//! Error code ranges:
//! - SDC0001-SDC0099: Discovery errors (questionnaire shape, references)
//! - SDC0100-SDC0199: Resolution errors (library declarations, content)
//! - SDC0200-SDC0299: Translation errors (CQL-to-ELM service)
//! - SDC0300-SDC0399: Execution errors (ELM compilation and evaluation)
//! - SDC0400-SDC0499: System errors (network, configuration, I/O)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_discovery_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_resolution_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_translation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_execution_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDC{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Discovery errors (0001-0099)
    map.insert(1, ErrorInfo::new("Invalid questionnaire document"));
    map.insert(
        2,
        ErrorInfo::new("Invalid library reference")
            .with_help("References must look like \"Library\".\"Member\""),
    );

    // Resolution errors (0100-0199)
    map.insert(
        100,
        ErrorInfo::new("Library declaration not found")
            .with_help("Declare the library with a cqf-library extension on the questionnaire"),
    );
    map.insert(101, ErrorInfo::new("Ambiguous library declaration"));
    map.insert(102, ErrorInfo::new("Library has no usable content"));
    map.insert(103, ErrorInfo::new("Invalid inline attachment data"));
    map.insert(104, ErrorInfo::new("Invalid library resource"));

    // Translation errors (0200-0299)
    map.insert(200, ErrorInfo::new("CQL translation rejected"));
    map.insert(201, ErrorInfo::new("Translator service error"));
    map.insert(202, ErrorInfo::new("Invalid ELM document"));

    // Execution errors (0300-0399)
    map.insert(300, ErrorInfo::new("ELM compilation failed"));
    map.insert(301, ErrorInfo::new("Execution failed"));
    map.insert(302, ErrorInfo::new("Missing definition result"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("Network error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Timeout"));
    map.insert(404, ErrorInfo::new("Remote resource returned an error status"));
    map.insert(405, ErrorInfo::new("Invalid format"));

    map
});

// Discovery errors
pub const SDC0001: ErrorCode = ErrorCode::new(1);
pub const SDC0002: ErrorCode = ErrorCode::new(2);

// Resolution errors
pub const SDC0100: ErrorCode = ErrorCode::new(100);
pub const SDC0101: ErrorCode = ErrorCode::new(101);
pub const SDC0102: ErrorCode = ErrorCode::new(102);
pub const SDC0103: ErrorCode = ErrorCode::new(103);
pub const SDC0104: ErrorCode = ErrorCode::new(104);

// Translation errors
pub const SDC0200: ErrorCode = ErrorCode::new(200);
pub const SDC0201: ErrorCode = ErrorCode::new(201);
pub const SDC0202: ErrorCode = ErrorCode::new(202);

// Execution errors
pub const SDC0300: ErrorCode = ErrorCode::new(300);
pub const SDC0301: ErrorCode = ErrorCode::new(301);
pub const SDC0302: ErrorCode = ErrorCode::new(302);

// System errors
pub const SDC0400: ErrorCode = ErrorCode::new(400);
pub const SDC0401: ErrorCode = ErrorCode::new(401);
pub const SDC0402: ErrorCode = ErrorCode::new(402);
pub const SDC0403: ErrorCode = ErrorCode::new(403);
pub const SDC0404: ErrorCode = ErrorCode::new(404);
pub const SDC0405: ErrorCode = ErrorCode::new(405);
