//! I/O layer: LAL frame caches, LIGO_LW XML documents, ASCII strain and PSD
//! files, the JSON inference container, and Pegasus transformation catalog
//! entries.
pub mod cache;
pub use cache::{CacheEntry, CacheError};

pub mod ligolw;
pub use ligolw::Document;

pub mod output;
pub use output::{InferenceFile, RunAttributes};

pub mod pegasus;
pub mod strain;
