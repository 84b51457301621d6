//! Build cache persisted between builds of the same application.
//!
//! [`BlobCache`] copies files and directories between the build workspace and
//! a durable cache root. [`MetadataStore`] keeps small facts (one file per key)
//! under a reserved workspace folder and persists them through the blob cache.
//! [`StaleFileCleaner`] trims a cached directory back under a size limit.

pub mod blob;
pub mod metadata;
pub mod stale;

pub use blob::BlobCache;
pub use metadata::{MetadataStore, METADATA_FOLDER};
pub use stale::{CleanSummary, StaleFileCleaner};
