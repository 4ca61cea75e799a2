//! HTTP client module
//!
//! Metadata lookups and streaming downloads over reqwest, with optional
//! throttling through governor.

mod client;
mod throttle;

pub use client::{content_length, download_file_name, HttpClient, HttpClientConfig};
pub use throttle::Throttle;

#[cfg(test)]
mod tests;
