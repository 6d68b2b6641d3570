//! Resources: the workspace's unit of loaded truth.
//!
//! A [`Resource`] is bound to one backing store and exposes three independent
//! load channels (classes, auxiliary files, sources). Each channel moves
//! through [`ChannelState`] on its own and can be reloaded explicitly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::AnalyzedSource;
use crate::config::ResourceConfig;
use crate::error::{LoadFailure, LoadStage};
use crate::loader::{ClassMap, EntryLoader, Replacement};
use crate::scan::{SourcePredicate, scan_sources};
use crate::source::{ByteSource, FileSource};

pub type FileMap = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
struct Channel<T> {
    state: ChannelState,
    value: Option<T>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            state: ChannelState::Unloaded,
            value: None,
        }
    }
}

impl<T> Channel<T> {
    /// Returns the cached value when `is_current` accepts it, loading otherwise.
    fn load_with<F>(&mut self, is_current: impl Fn(&T) -> bool, load: F) -> Result<&T, LoadFailure>
    where
        F: FnOnce() -> Result<T, LoadFailure>,
    {
        let current = self.value.as_ref().is_some_and(is_current);
        if !current {
            return self.reload_with(load);
        }
        match self.value {
            Some(ref value) => Ok(value),
            None => self.reload_with(load),
        }
    }

    fn reload_with<F>(&mut self, load: F) -> Result<&T, LoadFailure>
    where
        F: FnOnce() -> Result<T, LoadFailure>,
    {
        self.state = ChannelState::Loading;
        self.value = None;
        match load() {
            Ok(value) => {
                self.state = ChannelState::Loaded;
                Ok(&*self.value.insert(value))
            }
            Err(err) => {
                self.state = ChannelState::Failed(err.to_string());
                Err(err)
            }
        }
    }
}

/// Sources found under one root, with the candidates that failed.
#[derive(Debug)]
pub struct SourceReport {
    pub root: PathBuf,
    pub sources: BTreeMap<String, AnalyzedSource>,
    pub failures: Vec<LoadFailure>,
    /// Files whose internal name was taken over by a later path.
    pub replaced: Vec<Replacement>,
}

impl SourceReport {
    pub fn get(&self, internal_name: &str) -> Option<&AnalyzedSource> {
        self.sources.get(internal_name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// A single class file on disk or in memory.
#[derive(Debug)]
pub struct ClassFileStore {
    source: Box<dyn ByteSource>,
}

impl ClassFileStore {
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    pub fn label(&self) -> &str {
        self.source.label()
    }

    fn load_classes(&self, config: &ResourceConfig) -> Result<ClassMap, LoadFailure> {
        let label = self.source.label();
        let bytes = self
            .source
            .read()
            .map_err(|e| LoadFailure::new(LoadStage::ClassRead, label, e))?;

        let mut loader = EntryLoader::new(config);
        loader.on_class(label, &bytes)?;
        Ok(loader.finish_classes())
    }

    fn load_files(&self) -> FileMap {
        FileMap::new()
    }
}

/// The kinds of backing store a resource can be bound to.
#[derive(Debug)]
pub enum BackingStore {
    ClassFile(ClassFileStore),
}

impl BackingStore {
    pub fn kind(&self) -> &'static str {
        match self {
            BackingStore::ClassFile(_) => "class",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BackingStore::ClassFile(store) => store.label(),
        }
    }

    fn load_classes(&self, config: &ResourceConfig) -> Result<ClassMap, LoadFailure> {
        match self {
            BackingStore::ClassFile(store) => store.load_classes(config),
        }
    }

    fn load_files(&self) -> Result<FileMap, LoadFailure> {
        match self {
            BackingStore::ClassFile(store) => Ok(store.load_files()),
        }
    }
}

#[derive(Debug)]
pub struct Resource {
    store: BackingStore,
    config: ResourceConfig,
    predicate: SourcePredicate,
    classes: Channel<ClassMap>,
    files: Channel<FileMap>,
    sources: Channel<SourceReport>,
}

impl Resource {
    /// Binds a resource to a class file that must exist now.
    pub fn class_file(path: impl AsRef<Path>, config: ResourceConfig) -> Result<Self, LoadFailure> {
        let path = path.as_ref();
        let source = FileSource::open(path)
            .map_err(|e| LoadFailure::new(LoadStage::Open, path.display().to_string(), e))?;
        Ok(Self::new(BackingStore::ClassFile(ClassFileStore::new(source)), config))
    }

    /// Binds a resource to an already opened byte source.
    pub fn from_source(source: impl ByteSource + 'static, config: ResourceConfig) -> Self {
        Self::new(BackingStore::ClassFile(ClassFileStore::new(source)), config)
    }

    pub fn new(store: BackingStore, config: ResourceConfig) -> Self {
        Self {
            predicate: SourcePredicate::from_config(&config),
            store,
            config,
            classes: Channel::default(),
            files: Channel::default(),
            sources: Channel::default(),
        }
    }

    /// Replaces how source candidates are recognized.
    pub fn with_source_predicate(mut self, predicate: SourcePredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn load_classes(&mut self) -> Result<&ClassMap, LoadFailure> {
        let Self {
            store,
            config,
            classes,
            ..
        } = self;
        classes.load_with(|_| true, || load_classes_from(store, config))
    }

    pub fn reload_classes(&mut self) -> Result<&ClassMap, LoadFailure> {
        let Self {
            store,
            config,
            classes,
            ..
        } = self;
        classes.reload_with(|| load_classes_from(store, config))
    }

    pub fn load_files(&mut self) -> Result<&FileMap, LoadFailure> {
        let Self { store, files, .. } = self;
        files.load_with(|_| true, || store.load_files())
    }

    pub fn reload_files(&mut self) -> Result<&FileMap, LoadFailure> {
        let Self { store, files, .. } = self;
        files.reload_with(|| store.load_files())
    }

    /// Loads every source under `root`, or returns the report already loaded
    /// for that same root.
    pub fn load_sources(&mut self, root: impl AsRef<Path>) -> Result<&SourceReport, LoadFailure> {
        let root = root.as_ref();
        let Self {
            store,
            config,
            predicate,
            sources,
            ..
        } = self;
        sources.load_with(
            |report| report.root == root,
            || load_sources_from(store.label(), root, predicate, config),
        )
    }

    pub fn reload_sources(&mut self, root: impl AsRef<Path>) -> Result<&SourceReport, LoadFailure> {
        let root = root.as_ref();
        let Self {
            store,
            config,
            predicate,
            sources,
            ..
        } = self;
        sources.reload_with(|| load_sources_from(store.label(), root, predicate, config))
    }

    pub fn classes(&self) -> Option<&ClassMap> {
        self.classes.value.as_ref()
    }

    pub fn files(&self) -> Option<&FileMap> {
        self.files.value.as_ref()
    }

    pub fn sources(&self) -> Option<&SourceReport> {
        self.sources.value.as_ref()
    }

    pub fn class_state(&self) -> &ChannelState {
        &self.classes.state
    }

    pub fn file_state(&self) -> &ChannelState {
        &self.files.state
    }

    pub fn source_state(&self) -> &ChannelState {
        &self.sources.state
    }

    /// The loaded source that defines `internal_name`. Nested classes without
    /// their own source fall back to the outermost type's source.
    pub fn source_for_class(&self, internal_name: &str) -> Option<&AnalyzedSource> {
        let report = self.sources.value.as_ref()?;
        if let Some(source) = report.get(internal_name) {
            return Some(source);
        }

        let outer = internal_name.split('$').next()?;
        report
            .get(outer)
            .or_else(|| report.sources.values().find(|s| s.defines(internal_name)))
    }
}

fn load_classes_from(store: &BackingStore, config: &ResourceConfig) -> Result<ClassMap, LoadFailure> {
    let classes = store.load_classes(config)?;
    tracing::debug!(
        "loaded {} classes from {} resource {}",
        classes.len(),
        store.kind(),
        store.label()
    );
    Ok(classes)
}

fn load_sources_from(
    owner: &str,
    root: &Path,
    predicate: &SourcePredicate,
    config: &ResourceConfig,
) -> Result<SourceReport, LoadFailure> {
    let candidates = scan_sources(root, predicate, config.include_hidden)
        .map_err(|e| LoadFailure::new(LoadStage::SourceScan, root.display().to_string(), e))?;

    let mut report = SourceReport {
        root: root.to_path_buf(),
        sources: BTreeMap::new(),
        failures: Vec::new(),
        replaced: Vec::new(),
    };

    // candidates are sorted, so the later path wins a shared name
    let mut paths: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in candidates {
        match load_source(owner, &path) {
            Ok((name, source)) => {
                if let Some(previous) = paths.insert(name.clone(), path.clone()) {
                    tracing::warn!(
                        "source {} replaces {} for {}",
                        path.display(),
                        previous.display(),
                        name
                    );
                    report.replaced.push(Replacement {
                        internal_name: name.clone(),
                        previous_label: previous.display().to_string(),
                        label: path.display().to_string(),
                    });
                }
                report.sources.insert(name, source);
            }
            Err(err) => {
                tracing::warn!("{err}");
                report.failures.push(err);
            }
        }
    }

    tracing::debug!(
        "loaded {} sources from {} ({} failed)",
        report.sources.len(),
        root.display(),
        report.failures.len()
    );
    Ok(report)
}

fn load_source(owner: &str, path: &Path) -> Result<(String, AnalyzedSource), LoadFailure> {
    let artifact = || path.display().to_string();
    let text = std::fs::read_to_string(path)
        .map_err(|e| LoadFailure::new(LoadStage::SourceRead, artifact(), e))?;

    let mut source = AnalyzedSource::new(owner, text);
    let name = source
        .analyze()
        .map_err(|e| LoadFailure::new(LoadStage::SourceAnalysis, artifact(), e))?
        .to_string();
    Ok((name, source))
}
