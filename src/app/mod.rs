pub mod export_use_case;
pub mod ingest_use_case;
pub mod ports;
pub mod query_use_case;

pub use export_use_case::{ExportSummary, ExportUseCase, SignedSink};
pub use ingest_use_case::{IngestSummary, IngestUseCase};
pub use query_use_case::{DateRange, QueryUseCase};
