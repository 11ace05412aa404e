//! Persistence of schema versions for the transaction-log collaborator

pub mod export;
pub mod log;

pub use export::HistoryExport;
pub use log::SchemaLog;
