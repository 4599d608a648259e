use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// File names never drawn from a corpus (matched case-insensitively).
pub const DEFAULT_EXCLUDES: &[&str] = &["readme*"];

/// Resolve `path` against the corpus `root`, returning the on-disk path and
/// the corpus-relative path.
///
/// Relative paths are taken relative to the root. Absolute paths must lie
/// under the root. Parent traversal is never allowed.
pub fn resolve(root: &Path, path: &Path) -> Result<(PathBuf, PathBuf)> {
    if !root.is_dir() {
        return Err(Error::CorpusNotFound(root.to_path_buf()));
    }
    let rel = if path.is_absolute() {
        let root_abs = absolute(root)?;
        pathdiff::diff_paths(path, &root_abs)
            .ok_or_else(|| Error::PathEscapesCorpus(path.to_path_buf()))?
    } else {
        path.to_path_buf()
    };
    for comp in rel.components() {
        if !matches!(comp, Component::Normal(_) | Component::CurDir) {
            return Err(Error::PathEscapesCorpus(path.to_path_buf()));
        }
    }
    Ok((root.join(&rel), rel))
}

fn absolute(p: &Path) -> Result<PathBuf> {
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| Error::io("current dir", e))?;
    Ok(cwd.join(p))
}

/// All regular files below `dir` with at least `min_size` bytes, relative to
/// `dir` and sorted so identical trees always list identically. README-like
/// files are skipped.
pub fn list_files(dir: &Path, min_size: u64) -> Result<Vec<PathBuf>> {
    list_files_filtered(dir, min_size, DEFAULT_EXCLUDES)
}

/// Like [`list_files`] with explicit file-name exclude globs.
pub fn list_files_filtered(dir: &Path, min_size: u64, excludes: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::CorpusNotFound(dir.to_path_buf()));
    }
    let exc = build_excludes(excludes)?;
    let mut out = Vec::new();
    for ent in WalkDir::new(dir).min_depth(1) {
        let ent = ent.map_err(|e| Error::io(format!("walk {:?}", dir), e.into()))?;
        if !ent.file_type().is_file() {
            continue;
        }
        if exc.is_match(Path::new(ent.file_name())) {
            continue;
        }
        let size = ent
            .metadata()
            .map_err(|e| Error::io(format!("stat {:?}", ent.path()), e.into()))?
            .len();
        if size < min_size {
            continue;
        }
        if let Ok(rel) = ent.path().strip_prefix(dir) {
            out.push(rel.to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

fn build_excludes(patterns: &[&str]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        b.add(GlobBuilder::new(p).case_insensitive(true).literal_separator(true).build()?);
    }
    Ok(b.build()?)
}
