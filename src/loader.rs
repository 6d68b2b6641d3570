//! Accumulates class entries across feeds and seals them into a [`ClassMap`].

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

use crate::archive;
use crate::classfile::{ClassFormatError, ClassInfo, split_classes};
use crate::config::{DuplicatePolicy, ResourceConfig};
use crate::error::{LoadCause, LoadFailure, LoadStage};

#[derive(Debug, Clone, Serialize)]
pub struct ClassEntry {
    pub internal_name: String,
    /// Feed label the entry came from, `outer.jar!/inner.class` for nested entries.
    pub label: String,
    pub content_hash: String,
    pub info: ClassInfo,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// A registration that replaced an entry with different content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub internal_name: String,
    pub previous_label: String,
    pub label: String,
}

/// Sealed, keys-unique mapping from internal name to class bytes.
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
    entries: BTreeMap<String, ClassEntry>,
    replaced: Vec<Replacement>,
}

impl ClassMap {
    pub fn get(&self, internal_name: &str) -> Option<&ClassEntry> {
        self.entries.get(internal_name)
    }

    pub fn bytes(&self, internal_name: &str) -> Option<&[u8]> {
        self.entries.get(internal_name).map(|e| e.bytes.as_slice())
    }

    pub fn contains(&self, internal_name: &str) -> bool {
        self.entries.contains_key(internal_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replaced
    }

    /// Plain `name -> bytes` copy of the mapping.
    pub fn to_bytes_map(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.bytes.clone()))
            .collect()
    }
}

/// Accumulating half of the two-phase class loader.
///
/// Feeds are atomic: a failing `on_class` registers nothing. The builder is
/// consumed by [`EntryLoader::finish_classes`], so nothing can be fed after
/// sealing.
#[derive(Debug)]
pub struct EntryLoader {
    policy: DuplicatePolicy,
    expand_archives: bool,
    entries: BTreeMap<String, ClassEntry>,
    replaced: Vec<Replacement>,
}

impl EntryLoader {
    pub fn new(config: &ResourceConfig) -> Self {
        Self {
            policy: config.duplicate_policy,
            expand_archives: config.expand_archives,
            entries: BTreeMap::new(),
            replaced: Vec::new(),
        }
    }

    /// Registers every class defined by `bytes`, returning their internal names.
    pub fn on_class(&mut self, label: &str, bytes: &[u8]) -> Result<Vec<String>, LoadFailure> {
        let staged = self.stage(label, bytes)?;
        if self.policy == DuplicatePolicy::Reject {
            self.check_duplicates(&staged)?;
        }

        let names: Vec<String> = staged.iter().map(|e| e.internal_name.clone()).collect();
        for entry in staged {
            self.register(entry);
        }
        Ok(names)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish_classes(self) -> ClassMap {
        tracing::debug!("sealed {} class entries", self.entries.len());
        ClassMap {
            entries: self.entries,
            replaced: self.replaced,
        }
    }

    fn stage(&self, label: &str, bytes: &[u8]) -> Result<Vec<ClassEntry>, LoadFailure> {
        if self.expand_archives && archive::is_zip(bytes) {
            let inner = archive::class_entries(bytes)
                .map_err(|e| LoadFailure::new(LoadStage::NestedArchive, label, e))?;

            let mut staged = Vec::new();
            for (name, data) in inner {
                let entry_label = format!("{label}!/{name}");
                staged.extend(stage_stream(&entry_label, &data)?);
            }
            return Ok(staged);
        }

        stage_stream(label, bytes)
    }

    fn check_duplicates(&self, staged: &[ClassEntry]) -> Result<(), LoadFailure> {
        let mut seen: HashMap<&str, &ClassEntry> = HashMap::new();
        for entry in staged {
            let previous = seen
                .get(entry.internal_name.as_str())
                .copied()
                .or_else(|| self.entries.get(&entry.internal_name));
            if let Some(previous) = previous {
                if previous.content_hash != entry.content_hash {
                    return Err(LoadFailure::new(
                        LoadStage::DuplicateClass,
                        entry.label.clone(),
                        LoadCause::Duplicate {
                            name: entry.internal_name.clone(),
                            previous: previous.label.clone(),
                        },
                    ));
                }
            }
            seen.insert(entry.internal_name.as_str(), entry);
        }
        Ok(())
    }

    fn register(&mut self, entry: ClassEntry) {
        if let Some(previous) = self.entries.get(&entry.internal_name) {
            if previous.content_hash != entry.content_hash {
                tracing::warn!(
                    "class {} from {} replaces the one loaded from {}",
                    entry.internal_name,
                    entry.label,
                    previous.label
                );
                self.replaced.push(Replacement {
                    internal_name: entry.internal_name.clone(),
                    previous_label: previous.label.clone(),
                    label: entry.label.clone(),
                });
            }
        }

        tracing::debug!("registered {} from {}", entry.internal_name, entry.label);
        self.entries.insert(entry.internal_name.clone(), entry);
    }
}

fn stage_stream(label: &str, bytes: &[u8]) -> Result<Vec<ClassEntry>, LoadFailure> {
    if bytes.is_empty() {
        return Err(LoadFailure::new(
            LoadStage::ClassStructure,
            label,
            ClassFormatError::Empty,
        ));
    }

    let segments =
        split_classes(bytes).map_err(|e| LoadFailure::new(LoadStage::ClassStructure, label, e))?;

    Ok(segments
        .into_iter()
        .map(|segment| ClassEntry {
            internal_name: segment.info.internal_name.clone(),
            label: label.to_string(),
            content_hash: content_hash(segment.bytes),
            info: segment.info,
            bytes: segment.bytes.to_vec(),
        })
        .collect())
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
