//! HTTP client adapter

mod client;
mod request;

pub use client::{check_response, HttpClient, HttpClientBuilder};
pub use request::{HttpMethod, RequestSpec};
