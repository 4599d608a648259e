//! Deterministic disk images built from corpus fragments, for benchmarking file carvers.

pub mod context;
pub mod corpus;
pub mod draw;
pub mod error;
pub mod file;
pub mod fragment;
pub mod image;
pub mod log;
pub mod metadata;
pub mod random;
pub mod scenario;

pub use context::Context;
pub use draw::{draw_files, draw_fragmented_files, intertwine_randomly, DrawConfig};
pub use error::{Error, FragmentationError, Result};
pub use file::CorpusFile;
pub use fragment::{FileSlice, Fragment, RandomFiller, ZeroesFiller};
pub use image::Image;
pub use log::{FragmentPlacement, LogReconstructor};
pub use metadata::ImageMetadata;
pub use random::Randomness;
pub use scenario::Scenario;
