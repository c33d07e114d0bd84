//! HTTP client module with retry logic and error handling.

mod client;
mod retry;

pub use client::HttpClient;
