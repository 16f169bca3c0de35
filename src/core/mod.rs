pub mod classify;
pub mod engine;

pub use crate::domain::model::{ProcessRecord, ProcessTable, RunSummary};
pub use crate::domain::ports::{Browser, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
