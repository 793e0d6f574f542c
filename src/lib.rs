pub mod config;
pub mod epoch;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod source;

// Domain data shapes shared across layers
pub mod domain;

pub use config::IngestConfig;
pub use domain::{DataSource, IngestionResult, RawRecord, RejectReason, TreeRecord};
pub use error::{IngestError, Result};
pub use pipeline::IngestionPipeline;
