//! Services: vision client, label parsing, ingest pipeline, document
//! extraction and CSV export

pub mod document;
pub mod export;
pub mod ingest;
pub mod label_reading;
pub mod vision_client;

pub use ingest::{IngestError, IngestOutcome, Ingestor};
pub use label_reading::{Confidence, LabelReading};
pub use vision_client::{VisionClient, VisionError};
