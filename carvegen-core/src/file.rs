use crate::context::Context;
use crate::corpus;
use crate::error::{Error, FragmentationError, Result};
use crate::fragment::{FileSlice, Fragment};
use crate::random::{fresh_id, Randomness};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

const HASH_BUF: usize = 1 << 20;

/// A file of the corpus. Cheap to clone; clones share id, size and the
/// cached content hash.
#[derive(Clone, Debug)]
pub struct CorpusFile {
    inner: Arc<FileInner>,
}

#[derive(Debug)]
struct FileInner {
    id: String,
    path: PathBuf,
    rel_path: PathBuf,
    size: u64,
    hash: OnceLock<String>,
}

impl CorpusFile {
    /// Look up `path` (corpus-relative, or absolute under the corpus root).
    /// Only stats the file; content is read lazily.
    pub fn open(ctx: &Context, path: impl AsRef<Path>) -> Result<Self> {
        let (path, rel_path) = corpus::resolve(ctx.corpus()?, path.as_ref())?;
        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(rel_path))
            }
            Err(e) => return Err(Error::io(format!("stat {:?}", path), e)),
        };
        if !meta.is_file() {
            return Err(Error::NotAFile(rel_path));
        }
        if meta.len() == 0 {
            return Err(Error::EmptyFile(rel_path));
        }
        Ok(Self {
            inner: Arc::new(FileInner {
                id: fresh_id(),
                path,
                rel_path,
                size: meta.len(),
                hash: OnceLock::new(),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// On-disk path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Path relative to the corpus root.
    pub fn rel_path(&self) -> &Path {
        &self.inner.rel_path
    }

    pub(crate) fn display_path(&self) -> String {
        self.inner.rel_path.to_string_lossy().replace('\\', "/")
    }

    pub fn size(&self) -> u64 {
        self.inner.size
    }

    /// SHA-256 of the whole file, computed once.
    pub fn hash(&self) -> Result<String> {
        if let Some(h) = self.inner.hash.get() {
            return Ok(h.clone());
        }
        let path = self.path();
        let f = File::open(path).map_err(|e| Error::io(format!("open {:?}", path), e))?;
        let mut reader = BufReader::new(f);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_BUF];
        loop {
            let n = reader.read(&mut buf).map_err(|e| Error::io(format!("read {:?}", path), e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let h = hex::encode(hasher.finalize());
        Ok(self.inner.hash.get_or_init(|| h).clone())
    }

    /// The whole file as fragment 1.
    pub fn as_fragment(&self) -> Fragment {
        Fragment::Slice(self.slice(1, 0, self.size()))
    }

    // Callers only pass validated, non-empty, in-bounds ranges.
    fn slice(&self, number: u64, start: u64, end: u64) -> FileSlice {
        FileSlice::from_parts(self.clone(), number, start, end)
    }

    /// Upper bound on fragments for `block_size`: `ceil(size / block_size)`.
    pub fn max_fragments(&self, block_size: u64) -> Result<usize> {
        if block_size < 1 {
            return Err(Error::InvalidBlockSize);
        }
        Ok(self.size().div_ceil(block_size) as usize)
    }

    /// Cut the file at the given block indices.
    ///
    /// Point `p` cuts at byte `p * block_size`. No points yields the whole
    /// file as a single fragment.
    pub fn fragment(&self, points: &[u64], block_size: u64) -> Result<Vec<Fragment>> {
        if points.is_empty() {
            return Ok(vec![self.as_fragment()]);
        }
        self.validate_points(points, block_size)?;
        let mut sorted = points.to_vec();
        sorted.sort_unstable();

        let mut bounds = Vec::with_capacity(sorted.len() + 2);
        bounds.push(0);
        bounds.extend(sorted.iter().map(|p| p * block_size));
        bounds.push(self.size());
        let frags = bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| Fragment::Slice(self.slice(i as u64 + 1, w[0], w[1])))
            .collect::<Vec<_>>();
        debug!(path = %self.display_path(), fragments = frags.len(), block_size, "fragmented file");
        Ok(frags)
    }

    /// Cut into `n` fragments at random block boundaries. With `n` unset the
    /// count is drawn from `[1, size / block_size]`.
    pub fn fragment_randomly(
        &self,
        rng: &mut Randomness,
        n: Option<usize>,
        block_size: u64,
    ) -> Result<Vec<Fragment>> {
        let blocks = self.check_fragmentable(block_size)?;
        let n = match n {
            Some(n) => n,
            None => rng.range_inclusive(1, blocks as usize)?,
        };
        let max = self.check_count(n, block_size)?;
        if n == 1 {
            return Ok(vec![self.as_fragment()]);
        }
        let points: Vec<u64> =
            rng.sample_distinct(1, max, n - 1)?.into_iter().map(|p| p as u64).collect();
        debug!(path = %self.display_path(), n, ?points, "random cut points");
        self.fragment(&points, block_size)
    }

    /// Cut into `n` fragments of near-equal block counts. Leading fragments
    /// take the extra blocks; the last one also takes the unaligned tail.
    pub fn fragment_evenly(&self, n: usize, block_size: u64) -> Result<Vec<Fragment>> {
        let blocks = self.check_fragmentable(block_size)?;
        self.check_count(n, block_size)?;
        if n == 1 {
            return Ok(vec![self.as_fragment()]);
        }
        self.fragment(&even_cut_points(blocks, n as u64), block_size)
    }

    fn check_fragmentable(&self, block_size: u64) -> Result<u64> {
        if block_size < 1 {
            return Err(Error::InvalidBlockSize);
        }
        if self.size() < block_size {
            return Err(FragmentationError::FileTooSmall { size: self.size(), block_size }.into());
        }
        Ok(self.size() / block_size)
    }

    /// Returns the largest valid count for `block_size`.
    fn check_count(&self, n: usize, block_size: u64) -> Result<usize> {
        if n < 1 {
            return Err(FragmentationError::TooFewFragments.into());
        }
        let max = self.max_fragments(block_size)?;
        if n > max {
            return Err(FragmentationError::TooManyFragments { requested: n, max }.into());
        }
        Ok(max)
    }

    fn validate_points(&self, points: &[u64], block_size: u64) -> Result<()> {
        let limit = self.check_fragmentable(block_size).map(|_| self.size().div_ceil(block_size))?;
        let mut seen = HashSet::with_capacity(points.len());
        for &p in points {
            if p == 0 {
                return Err(FragmentationError::ZeroPoint.into());
            }
            if p >= limit {
                return Err(FragmentationError::PointTooLarge { point: p, limit }.into());
            }
            if !seen.insert(p) {
                return Err(FragmentationError::DuplicatePoint(p).into());
            }
        }
        Ok(())
    }
}

/// Cut points splitting `blocks` whole blocks into `n` groups whose sizes
/// differ by at most one. When `n == blocks + 1` every block boundary is cut
/// and the unaligned tail becomes the last fragment.
fn even_cut_points(blocks: u64, n: u64) -> Vec<u64> {
    if n > blocks {
        return (1..=blocks).collect();
    }
    let (q, r) = (blocks / n, blocks % n);
    let mut acc = 0;
    (0..n - 1)
        .map(|i| {
            acc += q + u64::from(i < r);
            acc
        })
        .collect()
}
