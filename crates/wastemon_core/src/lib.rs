//! Core of Wastemon: an image upload queue whose entries are classified as organic or
//! recyclable waste by a remote HTTP service.
//!
//! [`QueueManager`] owns the [`ImageQueue`] and is the only thing that mutates it. Decoding
//! and classification run on a tokio runtime and report back through a channel that the
//! owner drains, so a UI can render plain snapshots of the queue.

pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod intake;
pub mod manager;
pub mod queue;

pub use classifier::{Classifier, HttpClassifier, parse_response};
pub use config::{API_URL_ENV, ClientConfig};
pub use error::{ClassifyError, ConfigError, QueueError};
pub use export::export_csv;
pub use intake::{
    ACCEPTED_EXTENSIONS, ACCEPTED_MIME_TYPES, DecodedImage, FileContent, ImageFile, ScanOptions,
    SourceHandle, decode, decode_batch, format_size, scan_folder,
};
pub use manager::{QueueEvent, QueueManager, RoundId, RoundSummary};
pub use queue::{Category, ImageId, ImageQueue, ImageStatus, QueuedImage, StatusCounts, Upload};
