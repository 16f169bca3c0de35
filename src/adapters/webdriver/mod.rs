//! W3C WebDriver adapter: HTTP client and driver process management.

pub mod client;
pub mod service;

pub use client::{SessionOptions, WebDriverClient};
pub use service::DriverService;
