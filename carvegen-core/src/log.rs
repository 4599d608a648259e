use crate::error::{Error, Result};
use crate::metadata::{ImageMetadata, Offsets};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Where one fragment physically sits in an image.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FragmentPlacement {
    pub scenario: String,
    pub file_id: String,
    pub path: String,
    pub number: u64,
    pub file_start: u64,
    pub file_end: u64,
    pub image_start: u64,
    pub image_end: u64,
}

// Only the keys needed to rebuild the layout; everything else is ignored.
#[derive(Deserialize)]
struct LogDoc {
    scenarios: Vec<LogScenario>,
}

#[derive(Deserialize)]
struct LogScenario {
    name: String,
    files: Vec<LogFile>,
}

#[derive(Deserialize)]
struct LogFile {
    original: LogOriginal,
    fragments: Vec<LogFragment>,
}

#[derive(Deserialize)]
struct LogOriginal {
    id: String,
    path: String,
}

#[derive(Deserialize)]
struct LogFragment {
    number: u64,
    file_offsets: Offsets,
    image_offsets: Option<Offsets>,
}

/// Rebuilds the physical fragment order from an image sidecar.
#[derive(Clone, Debug)]
pub struct LogReconstructor {
    placements: Vec<FragmentPlacement>,
}

impl LogReconstructor {
    pub fn from_metadata(meta: &ImageMetadata) -> Result<Self> {
        Self::from_doc(serde_json::from_value(serde_json::to_value(meta)?)?)
    }

    pub fn from_reader<R: Read>(r: R) -> Result<Self> {
        Self::from_doc(serde_json::from_reader(r)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| Error::io(format!("open {:?}", path), e))?;
        Self::from_reader(BufReader::new(f))
    }

    fn from_doc(doc: LogDoc) -> Result<Self> {
        let mut placements = Vec::new();
        for sc in doc.scenarios {
            for file in sc.files {
                for frag in file.fragments {
                    let img = frag.image_offsets.ok_or_else(|| Error::MissingImageOffsets {
                        id: file.original.id.clone(),
                        number: frag.number,
                    })?;
                    placements.push(FragmentPlacement {
                        scenario: sc.name.clone(),
                        file_id: file.original.id.clone(),
                        path: file.original.path.clone(),
                        number: frag.number,
                        file_start: frag.file_offsets.start,
                        file_end: frag.file_offsets.end,
                        image_start: img.start,
                        image_end: img.end,
                    });
                }
            }
        }
        placements.sort_by_key(|p| p.image_start);
        Ok(Self { placements })
    }

    /// Every fragment once, ascending by image start offset.
    pub fn fragment_order(&self) -> &[FragmentPlacement] {
        &self.placements
    }

    pub fn into_placements(self) -> Vec<FragmentPlacement> {
        self.placements
    }
}
