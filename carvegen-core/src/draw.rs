use crate::context::Context;
use crate::corpus;
use crate::error::{Error, Result};
use crate::file::CorpusFile;
use crate::fragment::Fragment;
use crate::image::DEFAULT_BLOCK_SIZE;
use crate::random::Randomness;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parameters shared by the fragmenting draw helpers.
#[derive(Clone, Debug)]
pub struct DrawConfig {
    /// Directory below the corpus root to draw from; `None` for the root.
    pub path: Option<PathBuf>,
    pub files: usize,
    pub block_size: u64,
    pub min_fragments: usize,
    pub max_fragments: usize,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            path: None,
            files: 1,
            block_size: DEFAULT_BLOCK_SIZE,
            min_fragments: 1,
            max_fragments: 4,
        }
    }
}

impl DrawConfig {
    fn check_range(&self) -> Result<()> {
        if self.min_fragments > self.max_fragments {
            return Err(Error::FragmentRange { min: self.min_fragments, max: self.max_fragments });
        }
        Ok(())
    }

    fn min_frags(&self) -> usize {
        self.min_fragments.max(1)
    }

    fn min_size(&self) -> u64 {
        self.block_size * self.min_frags() as u64
    }
}

/// Draw `n` files of at least `min_size` bytes from `path` (relative to the
/// corpus root), with replacement unless `unique`.
pub fn draw_files(
    ctx: &mut Context,
    path: Option<&Path>,
    n: usize,
    unique: bool,
    min_size: u64,
) -> Result<Vec<CorpusFile>> {
    if n < 1 {
        return Err(Error::TooFewFiles { requested: n, min: 1 });
    }
    let root = ctx.corpus()?.to_path_buf();
    let (start, sub) = match path {
        Some(p) => corpus::resolve(&root, p)?,
        None => (root.clone(), PathBuf::new()),
    };
    let candidates = corpus::list_files(&start, min_size)?;
    if candidates.is_empty() || (!unique && candidates.len() < n) {
        return Err(Error::NotEnoughFiles { requested: n, available: candidates.len(), min_size });
    }
    if unique && candidates.len() < n {
        return Err(Error::NotEnoughUniqueFiles { requested: n, available: candidates.len() });
    }
    let picks = if unique {
        ctx.random().sample_distinct(0, candidates.len(), n)?
    } else {
        ctx.random().choices(candidates.len(), n)?
    };
    debug!(candidates = candidates.len(), ?picks, unique, "drew files");
    let ctx = &*ctx;
    picks.into_iter().map(|i| CorpusFile::open(ctx, sub.join(&candidates[i]))).collect()
}

/// Draw `cfg.files` files and fragment each at random into a count drawn
/// from `[min_fragments, min(max_fragments, file max)]`.
///
/// The same file may be drawn more than once.
pub fn draw_fragmented_files(ctx: &mut Context, cfg: &DrawConfig) -> Result<Vec<Vec<Fragment>>> {
    cfg.check_range()?;
    let files = draw_files(ctx, cfg.path.as_deref(), cfg.files, false, cfg.min_size())?;
    let rng = ctx.random();
    files
        .iter()
        .map(|f| {
            let hi = cfg.max_fragments.min(f.max_fragments(cfg.block_size)?);
            let k = rng.range_inclusive(cfg.min_frags(), hi)?;
            f.fragment_randomly(rng, Some(k), cfg.block_size)
        })
        .collect()
}

/// Draw `cfg.files` distinct files and interleave their fragments.
///
/// The result never holds two adjacent fragments of the same file, each
/// file's fragments appear in ascending number order, and every file
/// contributes between `min_fragments` and `max_fragments` pieces (capped by
/// what its size allows).
pub fn intertwine_randomly(ctx: &mut Context, cfg: &DrawConfig) -> Result<Vec<Fragment>> {
    cfg.check_range()?;
    if cfg.files < 2 {
        return Err(Error::TooFewFiles { requested: cfg.files, min: 2 });
    }
    let mut files = draw_files(ctx, cfg.path.as_deref(), cfg.files, true, cfg.min_size())?;
    let bs = cfg.block_size;
    let rng = ctx.random();

    if cfg.min_fragments == cfg.max_fragments {
        let k = cfg.min_frags();
        let a = files[0].fragment_randomly(rng, Some(k), bs)?;
        let b = files[1].fragment_randomly(rng, Some(k), bs)?;
        let mut frags: Vec<Fragment> =
            a.into_iter().zip(b).flat_map(|(x, y)| [x, y]).collect();
        for f in &files[2..] {
            let pieces = f.fragment_randomly(rng, Some(k), bs)?;
            insert_spread(rng, &mut frags, pieces)?;
        }
        debug!(files = files.len(), fragments = frags.len(), k, "intertwined at fixed count");
        return Ok(frags);
    }

    files.sort_by_key(|f| f.size());
    let lo = cfg.min_frags();
    let k1 = rng.range_inclusive(lo, cfg.max_fragments.min(files[0].max_fragments(bs)?))?;
    let first = files[0].fragment_randomly(rng, Some(k1), bs)?;
    let k2 = rng.range_inclusive(
        lo.max(k1 - 1),
        cfg.max_fragments.min(k1 + 1).min(files[1].max_fragments(bs)?),
    )?;
    let second = files[1].fragment_randomly(rng, Some(k2), bs)?;
    let mut frags = merge_alternating(rng, first, second);

    for f in &files[2..] {
        let free = frags.len() + 1;
        let hi = cfg.max_fragments.min(f.max_fragments(bs)?).min(free);
        let k = rng.range_inclusive(lo, hi)?;
        let pieces = f.fragment_randomly(rng, Some(k), bs)?;
        insert_spread(rng, &mut frags, pieces)?;
    }
    debug!(files = files.len(), fragments = frags.len(), k1, k2, "intertwined");
    Ok(frags)
}

/// Interleave `b` into `a` at stride two. Counts differ by at most one; the
/// longer list takes the outer positions, equal lengths pick a side at
/// random.
fn merge_alternating(rng: &mut Randomness, a: Vec<Fragment>, b: Vec<Fragment>) -> Vec<Fragment> {
    let start = if b.len() + 1 == a.len() {
        1
    } else if b.len() == a.len() + 1 {
        0
    } else {
        usize::from(rng.coin())
    };
    let mut out = a;
    for (i, frag) in b.into_iter().enumerate() {
        out.insert(start + 2 * i, frag);
    }
    out
}

/// Insert `pieces` at distinct gaps of `seq` (gap `g` sits before element
/// `g`), keeping their order. Distinct gaps keep the pieces apart from each
/// other.
fn insert_spread(rng: &mut Randomness, seq: &mut Vec<Fragment>, pieces: Vec<Fragment>) -> Result<()> {
    let mut slots = rng.sample_distinct(0, seq.len() + 1, pieces.len())?;
    slots.sort_unstable();
    // Each insertion shifts later gaps right by one.
    for (i, (slot, frag)) in slots.into_iter().zip(pieces).enumerate() {
        seq.insert(slot + i, frag);
    }
    Ok(())
}
