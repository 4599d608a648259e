use serde::{Deserialize, Serialize};
use std::io::Read;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Filler,
}

/// Describes the source a fragment was cut from: a corpus file or a filler.
/// For fillers `path` is the generator tag (`"zeroes"` / `"random"`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceMetadata {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub path: String,
    pub size: u64,
    pub id: String,
    pub sha256: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Offsets {
    pub start: u64,
    pub end: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FragmentRecord {
    pub number: u64,
    pub size: u64,
    pub sha256: String,
    pub file_offsets: Offsets,
    /// Set once the fragment has a place in an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_offsets: Option<Offsets>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FragmentMetadata {
    pub file: SourceMetadata,
    pub fragment: FragmentRecord,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub original: SourceMetadata,
    pub fragments: Vec<FragmentRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScenarioMetadata {
    pub name: String,
    pub files: Vec<FileRecord>,
}

/// The sidecar document written next to every image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageMetadata {
    pub block_size: u64,
    pub seed: u64,
    pub corpus: String,
    pub scenarios: Vec<ScenarioMetadata>,
}

impl ImageMetadata {
    pub fn from_reader<R: Read>(r: R) -> crate::Result<Self> {
        Ok(serde_json::from_reader(r)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
