use crate::context::Context;
use crate::error::{Error, Result};
use crate::metadata::{ImageMetadata, Offsets, ScenarioMetadata};
use crate::scenario::{group_by_source, Scenario};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_BLOCK_SIZE: u64 = 512;

/// Maps a residual byte count to exactly that many padding bytes.
pub type PaddingGenerator = Box<dyn FnMut(usize) -> Vec<u8>>;

/// An ordered set of scenarios that serializes to one raw image plus a
/// JSON sidecar.
pub struct Image {
    block_size: u64,
    seed: u64,
    corpus: String,
    padding: PaddingGenerator,
    scenarios: Vec<Scenario>,
}

/// Where one fragment lands and how much padding follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub offsets: Offsets,
    pub padding: u64,
}

impl Image {
    /// Empty image recording the context's seed and corpus root.
    pub fn new(ctx: &Context) -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            seed: ctx.get_seed(),
            corpus: ctx.corpus().map(|p| p.to_string_lossy().to_string()).unwrap_or_default(),
            padding: Box::new(|n| vec![0u8; n]),
            scenarios: Vec::new(),
        }
    }

    pub fn with_block_size(mut self, block_size: u64) -> Result<Self> {
        if block_size < 1 {
            return Err(Error::InvalidBlockSize);
        }
        self.block_size = block_size;
        Ok(self)
    }

    pub fn with_padding<F>(mut self, padding: F) -> Self
    where
        F: FnMut(usize) -> Vec<u8> + 'static,
    {
        self.padding = Box::new(padding);
        self
    }

    pub fn add(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Image offsets of every fragment, per scenario, in write order.
    ///
    /// After the tail fragment of a source, the running offset is rounded
    /// up to the next block boundary.
    pub fn layout(&self) -> Vec<Vec<Placement>> {
        let bs = self.block_size;
        let mut offset = 0u64;
        self.scenarios
            .iter()
            .map(|s| {
                s.fragments()
                    .iter()
                    .map(|f| {
                        let start = offset;
                        let end = start + f.size();
                        let padding =
                            if f.is_source_tail() { (bs - end % bs) % bs } else { 0 };
                        offset = end + padding;
                        Placement { offsets: Offsets { start, end }, padding }
                    })
                    .collect()
            })
            .collect()
    }

    /// Total image length in bytes.
    pub fn len(&self) -> u64 {
        self.layout()
            .iter()
            .flatten()
            .last()
            .map(|p| p.offsets.end + p.padding)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full provenance document. Reads fragment bytes only for hashes not
    /// computed yet; writes nothing.
    pub fn metadata(&self) -> Result<ImageMetadata> {
        let layout = self.layout();
        let scenarios = self
            .scenarios
            .iter()
            .zip(&layout)
            .map(|(s, places)| {
                let items = s.fragments().iter().zip(places.iter().map(|p| Some(p.offsets)));
                Ok(ScenarioMetadata { name: s.name().to_string(), files: group_by_source(items)? })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ImageMetadata {
            block_size: self.block_size,
            seed: self.seed,
            corpus: self.corpus.clone(),
            scenarios,
        })
    }

    /// Stream the image bytes to `w` and return its metadata. The sidecar is
    /// not persisted; see [`Image::write`].
    pub fn write_to<W: Write>(&mut self, w: &mut W) -> Result<ImageMetadata> {
        let layout = self.layout();
        let mut total = 0u64;
        for (s, places) in self.scenarios.iter().zip(&layout) {
            debug!(scenario = s.name(), fragments = s.len(), "writing scenario");
            for (frag, place) in s.fragments().iter().zip(places) {
                let n = frag.write_to(w)?;
                if n != frag.size() {
                    return Err(Error::io(
                        format!("fragment {} of {}", frag.number(), frag.id()),
                        std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!("wrote {n} of {} bytes", frag.size()),
                        ),
                    ));
                }
                total += n;
                if place.padding > 0 {
                    let pad = (self.padding)(place.padding as usize);
                    if pad.len() as u64 != place.padding {
                        return Err(Error::PaddingLength {
                            expected: place.padding,
                            got: pad.len() as u64,
                        });
                    }
                    w.write_all(&pad).map_err(|e| Error::io("write padding", e))?;
                    total += place.padding;
                }
            }
        }
        w.flush().map_err(|e| Error::io("flush image", e))?;
        debug!(bytes = total, "image streamed");
        self.metadata()
    }

    /// Write the image to `path` and its metadata to `<path>.json`.
    pub fn write(&mut self, path: &Path) -> Result<ImageMetadata> {
        let f = File::create(path).map_err(|e| Error::io(format!("create {:?}", path), e))?;
        let mut out = BufWriter::new(f);
        let meta = self.write_to(&mut out)?;
        drop(out);

        let mpath = sidecar_path(path);
        let mut mf =
            File::create(&mpath).map_err(|e| Error::io(format!("create {:?}", mpath), e))?;
        mf.write_all(meta.to_json_pretty()?.as_bytes())
            .map_err(|e| Error::io(format!("write {:?}", mpath), e))?;
        info!(image = ?path, metadata = ?mpath, scenarios = meta.scenarios.len(), "image written");
        Ok(meta)
    }
}

/// `<image path>.json`
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut s = OsString::from(image.as_os_str());
    s.push(".json");
    PathBuf::from(s)
}
