//! Adapters layer: concrete implementations for external systems (browser, spreadsheet files).

pub mod storage;
pub mod webdriver;
pub mod xlsx;
