//! Document opener
//!
//! Opens a local index file for the event reader, gunzipping `.gz` input.

use crate::error::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

/// Byte stream over an opened document
pub type DocumentReader = Box<dyn Read + Send>;

/// Open a document, decompressing it when the name ends in `.gz`
pub fn open_document(path: impl AsRef<Path>) -> Result<DocumentReader> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.display().to_string(),
        },
        _ => Error::Io(e),
    })?;

    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    info!(
        path = %path.display(),
        gzipped,
        "Opening document"
    );

    let reader = BufReader::new(file);
    if gzipped {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
