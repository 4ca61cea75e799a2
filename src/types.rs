//! Common types used throughout toc-ingest
//!
//! Shared value types that cross module boundaries: the scalar carried by a
//! parse event and the TOC/MRF file classification.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Scalars
// ============================================================================

/// A JSON scalar as produced by the event reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Number, kept as its literal text so ids like `0123` or `1e3` survive
    Number(String),
    /// Decoded string
    String(String),
}

impl Scalar {
    /// Render the scalar as an output field value
    pub fn to_field(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.clone(),
            Scalar::String(s) => s.clone(),
        }
    }

    /// Consume the scalar into an output field value
    pub fn into_field(self) -> String {
        match self {
            Scalar::String(s) | Scalar::Number(s) => s,
            other => other.to_field(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => f.write_str(n),
            Scalar::String(s) => write!(f, "{s:?}"),
        }
    }
}

// ============================================================================
// File Classification
// ============================================================================

/// Whether a referenced file is another table of contents or a machine-readable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileClass {
    /// A nested table-of-contents index
    Toc,
    /// An in-network machine-readable file
    Mrf,
}

impl FileClass {
    /// Column value for this class
    pub fn as_str(self) -> &'static str {
        match self {
            FileClass::Toc => "TOC",
            FileClass::Mrf => "MRF",
        }
    }
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
