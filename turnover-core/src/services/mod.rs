//! Service layer - run orchestration

mod export;

pub use export::{AccountExport, ExportService, ExportSummary, ExportWindow};
