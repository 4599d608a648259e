use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the core can report. Callers can match on the variant or
/// just propagate it; nothing in the core retries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no corpus specified")]
    NoCorpus,
    #[error("corpus not found: {0:?}")]
    CorpusNotFound(PathBuf),
    #[error("file not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("not a regular file: {0:?}")]
    NotAFile(PathBuf),
    #[error("file contains no data: {0:?}")]
    EmptyFile(PathBuf),
    #[error("path escapes corpus root: {0:?}")]
    PathEscapesCorpus(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fragmentation: {0}")]
    Fragmentation(#[from] FragmentationError),
    #[error("block size has to be at least 1")]
    InvalidBlockSize,
    #[error("fragments must not be empty")]
    EmptyFragment,
    #[error("slice [{start}, {end}) lies outside a file of {size} bytes")]
    SliceOutOfBounds { start: u64, end: u64, size: u64 },
    #[error("min_fragments ({min}) has to be <= max_fragments ({max})")]
    FragmentRange { min: usize, max: usize },
    #[error("number of files has to be at least {min} (got {requested})")]
    TooFewFiles { requested: usize, min: usize },
    #[error("only {available} files with a minimal size of {min_size} bytes, {requested} requested")]
    NotEnoughFiles { requested: usize, available: usize, min_size: u64 },
    #[error("not enough unique files to choose from: {available} available, {requested} requested")]
    NotEnoughUniqueFiles { requested: usize, available: usize },
    #[error("cannot sample from empty range [{low}, {high}]")]
    EmptyRange { low: usize, high: usize },
    #[error("padding generator returned {got} bytes, {expected} expected")]
    PaddingLength { expected: u64, got: u64 },
    #[error("fragment {number} of {id} has no image offsets")]
    MissingImageOffsets { id: String, number: u64 },

    #[error("invalid corpus filter: {0}")]
    Glob(#[from] globset::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("metadata json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a cut-point set or fragment count is rejected for a given file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FragmentationError {
    #[error("file of {size} bytes is too small to be fragmented with a block size of {block_size}")]
    FileTooSmall { size: u64, block_size: u64 },
    #[error("0 is not a valid fragmentation point")]
    ZeroPoint,
    #[error("fragmentation point {point} is too large (has to be < {limit})")]
    PointTooLarge { point: u64, limit: u64 },
    #[error("duplicate fragmentation point {0}")]
    DuplicatePoint(u64),
    #[error("number of fragments has to be at least 1")]
    TooFewFragments,
    #[error("number of fragments is too large: {requested} requested, at most {max} possible")]
    TooManyFragments { requested: usize, max: usize },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io { context: context.into(), source }
    }
}
