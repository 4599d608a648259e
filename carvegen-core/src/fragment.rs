use crate::error::{Error, Result};
use crate::file::CorpusFile;
use crate::metadata::{FragmentMetadata, FragmentRecord, Offsets, SourceKind, SourceMetadata};
use crate::random::{fresh_id, Randomness};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::sync::OnceLock;

pub const DEFAULT_CHUNK_SIZE: usize = 8192;

pub const ZEROES_TAG: &str = "zeroes";
pub const RANDOM_TAG: &str = "random";

/// A filler of zero bytes, e.g. a wiped area.
#[derive(Debug)]
pub struct ZeroesFiller {
    id: String,
    size: u64,
    chunk_size: usize,
    hash: OnceLock<String>,
}

/// A filler of pseudo-random bytes. The generator seed is drawn once from
/// the run's [`Randomness`] at construction, so every traversal replays the
/// same bytes.
#[derive(Debug)]
pub struct RandomFiller {
    id: String,
    size: u64,
    seed: u64,
    chunk_size: usize,
    hash: OnceLock<String>,
}

/// A contiguous byte range `[start, end)` of a corpus file.
#[derive(Debug)]
pub struct FileSlice {
    file: CorpusFile,
    number: u64,
    start: u64,
    end: u64,
    chunk_size: usize,
    hash: OnceLock<String>,
}

impl ZeroesFiller {
    pub fn new(size: u64) -> Result<Self> {
        if size == 0 {
            return Err(Error::EmptyFragment);
        }
        Ok(Self { id: fresh_id(), size, chunk_size: DEFAULT_CHUNK_SIZE, hash: OnceLock::new() })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl RandomFiller {
    pub fn new(rng: &mut Randomness, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(Error::EmptyFragment);
        }
        Ok(Self {
            id: fresh_id(),
            size,
            seed: rng.sub_seed(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            hash: OnceLock::new(),
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl FileSlice {
    /// Slice `[start, end)` of `file` as fragment `number`.
    pub fn new(file: CorpusFile, number: u64, start: u64, end: u64) -> Result<Self> {
        if end <= start {
            return Err(Error::EmptyFragment);
        }
        if end > file.size() {
            return Err(Error::SliceOutOfBounds { start, end, size: file.size() });
        }
        Ok(Self::from_parts(file, number, start, end))
    }

    pub(crate) fn from_parts(file: CorpusFile, number: u64, start: u64, end: u64) -> Self {
        Self { file, number, start, end, chunk_size: DEFAULT_CHUNK_SIZE, hash: OnceLock::new() }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn file(&self) -> &CorpusFile {
        &self.file
    }
}

/// The atomic unit placed into a scenario.
#[derive(Debug)]
pub enum Fragment {
    Zeroes(ZeroesFiller),
    Random(RandomFiller),
    Slice(FileSlice),
}

impl From<ZeroesFiller> for Fragment {
    fn from(f: ZeroesFiller) -> Self {
        Fragment::Zeroes(f)
    }
}

impl From<RandomFiller> for Fragment {
    fn from(f: RandomFiller) -> Self {
        Fragment::Random(f)
    }
}

impl From<FileSlice> for Fragment {
    fn from(f: FileSlice) -> Self {
        Fragment::Slice(f)
    }
}

impl Fragment {
    pub fn zeroes(size: u64) -> Result<Self> {
        Ok(ZeroesFiller::new(size)?.into())
    }

    pub fn random(rng: &mut Randomness, size: u64) -> Result<Self> {
        Ok(RandomFiller::new(rng, size)?.into())
    }

    pub fn size(&self) -> u64 {
        match self {
            Fragment::Zeroes(f) => f.size,
            Fragment::Random(f) => f.size,
            Fragment::Slice(s) => s.end - s.start,
        }
    }

    /// Id of the originating source; shared by all slices of one file.
    pub fn id(&self) -> &str {
        match self {
            Fragment::Zeroes(f) => &f.id,
            Fragment::Random(f) => &f.id,
            Fragment::Slice(s) => s.file.id(),
        }
    }

    pub fn number(&self) -> u64 {
        match self {
            Fragment::Slice(s) => s.number,
            _ => 1,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Fragment::Slice(_) => SourceKind::File,
            _ => SourceKind::Filler,
        }
    }

    /// Byte range within the originating source.
    pub fn file_offsets(&self) -> Offsets {
        match self {
            Fragment::Slice(s) => Offsets { start: s.start, end: s.end },
            _ => Offsets { start: 0, end: self.size() },
        }
    }

    pub fn source_size(&self) -> u64 {
        match self {
            Fragment::Slice(s) => s.file.size(),
            _ => self.size(),
        }
    }

    /// True for the fragment that ends its source; fillers always do.
    pub fn is_source_tail(&self) -> bool {
        self.file_offsets().end == self.source_size()
    }

    pub fn chunk_size(&self) -> usize {
        match self {
            Fragment::Zeroes(f) => f.chunk_size,
            Fragment::Random(f) => f.chunk_size,
            Fragment::Slice(s) => s.chunk_size,
        }
    }

    fn hash_cell(&self) -> &OnceLock<String> {
        match self {
            Fragment::Zeroes(f) => &f.hash,
            Fragment::Random(f) => &f.hash,
            Fragment::Slice(s) => &s.hash,
        }
    }

    /// SHA-256 of the fragment bytes. Computed by the first complete
    /// traversal and frozen afterwards.
    pub fn hash(&self) -> Result<String> {
        if let Some(h) = self.hash_cell().get() {
            return Ok(h.clone());
        }
        for chunk in self.stream()? {
            chunk?;
        }
        self.hash_cell().get().cloned().ok_or_else(|| {
            Error::io("fragment hash", std::io::Error::other("traversal ended early"))
        })
    }

    pub fn metadata(&self) -> Result<FragmentMetadata> {
        let sha256 = self.hash()?;
        let file = match self {
            Fragment::Zeroes(f) => filler_source(&f.id, ZEROES_TAG, f.size, &sha256),
            Fragment::Random(f) => filler_source(&f.id, RANDOM_TAG, f.size, &sha256),
            Fragment::Slice(s) => SourceMetadata {
                kind: SourceKind::File,
                path: s.file.display_path(),
                size: s.file.size(),
                id: s.file.id().to_string(),
                sha256: s.file.hash()?,
            },
        };
        let fragment = FragmentRecord {
            number: self.number(),
            size: self.size(),
            sha256,
            file_offsets: self.file_offsets(),
            image_offsets: None,
        };
        Ok(FragmentMetadata { file, fragment })
    }

    /// Begin a fresh traversal of the fragment bytes.
    ///
    /// Every call restarts from the first byte: random fillers reseed their
    /// generator and file slices reopen the backing file at their start
    /// offset. The file handle lives inside the returned stream and is
    /// closed when the stream is dropped, finished or not.
    pub fn stream(&self) -> Result<FragmentStream<'_>> {
        let source = match self {
            Fragment::Zeroes(_) => Producer::Zeroes,
            Fragment::Random(f) => Producer::Random(Box::new(ChaCha8Rng::seed_from_u64(f.seed))),
            Fragment::Slice(s) => {
                let path = s.file.path();
                let mut fh = File::open(path)
                    .map_err(|e| Error::io(format!("open {:?}", path), e))?;
                fh.seek(SeekFrom::Start(s.start))
                    .map_err(|e| Error::io(format!("seek {:?}", path), e))?;
                Producer::File(BufReader::new(fh))
            }
        };
        let hasher = if self.hash_cell().get().is_none() { Some(Sha256::new()) } else { None };
        Ok(FragmentStream {
            fragment: self,
            state: StreamState::Streaming { cursor: 0, source, hasher },
        })
    }

    /// Copy every byte to `w`, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<u64> {
        let mut written = 0u64;
        for chunk in self.stream()? {
            let chunk = chunk?;
            w.write_all(&chunk).map_err(|e| Error::io("write fragment", e))?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size() as usize);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn filler_source(id: &str, tag: &str, size: u64, sha256: &str) -> SourceMetadata {
    SourceMetadata {
        kind: SourceKind::Filler,
        path: tag.to_string(),
        size,
        id: id.to_string(),
        sha256: sha256.to_string(),
    }
}

enum Producer {
    Zeroes,
    Random(Box<ChaCha8Rng>),
    File(BufReader<File>),
}

enum StreamState {
    Streaming { cursor: u64, source: Producer, hasher: Option<Sha256> },
    Done,
}

/// One traversal of a fragment, yielding chunks of at most the fragment's
/// chunk size.
pub struct FragmentStream<'a> {
    fragment: &'a Fragment,
    state: StreamState,
}

impl FragmentStream<'_> {
    fn next_chunk(&mut self) -> Option<Result<Vec<u8>>> {
        let size = self.fragment.size();
        let chunk_size = self.fragment.chunk_size() as u64;
        let StreamState::Streaming { cursor, source, hasher } = &mut self.state else {
            return None;
        };
        let n = chunk_size.min(size - *cursor) as usize;
        let mut buf = vec![0u8; n];
        match source {
            Producer::Zeroes => {}
            Producer::Random(rng) => rng.fill_bytes(&mut buf),
            Producer::File(r) => {
                if let Err(e) = r.read_exact(&mut buf) {
                    self.state = StreamState::Done;
                    return Some(Err(Error::io("read fragment", e)));
                }
            }
        }
        if let Some(h) = hasher.as_mut() {
            h.update(&buf);
        }
        *cursor += n as u64;
        if *cursor >= size {
            if let Some(h) = hasher.take() {
                let _ = self.fragment.hash_cell().set(hex::encode(h.finalize()));
            }
            self.state = StreamState::Done;
        }
        Some(Ok(buf))
    }
}

impl Iterator for FragmentStream<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk()
    }
}
