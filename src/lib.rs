pub mod api;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod reporter;
pub mod store;
pub mod suggestion;
pub mod types;

#[cfg(test)]
mod testing;

/// Trendyol seller integration API base URL.
pub const DEFAULT_API_BASE: &str = "https://apigw.trendyol.com/integration";

/// Largest page the product listing endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Zone used for `capturedAt` when `TIMEZONE` is not set.
pub const DEFAULT_TIMEZONE: &str = "Europe/Istanbul";
