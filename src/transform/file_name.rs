//! File-name derivation
//!
//! The same rule names files in every table and drives TOC/MRF
//! classification.

use crate::types::FileClass;
use url::{form_urlencoded, Url};

/// Name used when a location yields neither an `fn` parameter nor a basename
pub const UNKNOWN_FILE_NAME: &str = "Unknown";

/// Derive a file name from a file location
///
/// A non-empty `fn` query parameter wins; otherwise the last path segment;
/// otherwise `Unknown`.
pub fn derive_file_name(location: &str) -> String {
    let (path, query) = match Url::parse(location) {
        Ok(url) => (url.path().to_string(), url.query().map(str::to_string)),
        Err(_) => {
            let without_fragment = location.split('#').next().unwrap_or_default();
            match without_fragment.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (without_fragment.to_string(), None),
            }
        }
    };

    if let Some(query) = query {
        let named = form_urlencoded::parse(query.as_bytes())
            .find(|(key, value)| key == "fn" && !value.is_empty());
        if let Some((_, value)) = named {
            return value.into_owned();
        }
    }

    match path.rsplit('/').next() {
        Some(basename) if !basename.is_empty() => basename.to_string(),
        _ => UNKNOWN_FILE_NAME.to_string(),
    }
}

/// Classify a derived file name
pub fn classify_file(file_name: &str) -> FileClass {
    if file_name.to_lowercase().contains("table_of_contents") {
        FileClass::Toc
    } else {
        FileClass::Mrf
    }
}
