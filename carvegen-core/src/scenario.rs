use crate::error::Result;
use crate::fragment::Fragment;
use crate::metadata::{FileRecord, Offsets, ScenarioMetadata};
use std::collections::HashMap;

/// One simulated layout: fragments in physical order.
#[derive(Debug, Default)]
pub struct Scenario {
    name: String,
    fragments: Vec<Fragment>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fragments: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, fragment: impl Into<Fragment>) {
        self.fragments.push(fragment.into());
    }

    pub fn add_all<I>(&mut self, fragments: I)
    where
        I: IntoIterator,
        I::Item: Into<Fragment>,
    {
        self.fragments.extend(fragments.into_iter().map(Into::into));
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Per-source provenance. Sources appear in first-encounter order, their
    /// fragments sorted by number whatever the physical order.
    pub fn metadata(&self) -> Result<ScenarioMetadata> {
        let files = group_by_source(self.fragments.iter().map(|f| (f, None)))?;
        Ok(ScenarioMetadata { name: self.name.clone(), files })
    }
}

pub(crate) fn group_by_source<'a, I>(items: I) -> Result<Vec<FileRecord>>
where
    I: IntoIterator<Item = (&'a Fragment, Option<Offsets>)>,
{
    let mut files: Vec<FileRecord> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for (frag, image_offsets) in items {
        let mut meta = frag.metadata()?;
        meta.fragment.image_offsets = image_offsets;
        match by_id.get(frag.id()) {
            Some(&i) => files[i].fragments.push(meta.fragment),
            None => {
                by_id.insert(frag.id().to_string(), files.len());
                files.push(FileRecord { original: meta.file, fragments: vec![meta.fragment] });
            }
        }
    }
    for f in &mut files {
        f.fragments.sort_by_key(|r| r.number);
    }
    Ok(files)
}
