mod ingestor;
mod source;
mod throttle;

pub use ingestor::{IngestStatus, Ingestor};
pub use source::SourceEvent;
pub use throttle::WRITE_WINDOW;
