//! # class-workspace
//!
//! Loads compiled Java classes and their sources into a workspace keyed by
//! internal class name (`com/example/Foo`).
//!
//! ## Architecture
//!
//! - **source**: Raw byte access to a single artifact (file or memory)
//! - **classfile**: Class header facts (via `ristretto_classfile`) and class stream splitting
//! - **archive**: Expansion of class blobs that are really zip/jar containers
//! - **loader**: Two-phase entry loader that accumulates classes and seals them into a `ClassMap`
//! - **structure**: Java source structure extraction using tree-sitter AST parsing
//! - **analysis**: Two-phase construct/analyze source objects keyed by internal name
//! - **scan**: Source candidate discovery under a root
//! - **resource**: Backing stores and the three load channels (classes, files, sources)
//! - **config**: Loader configuration with file and environment overrides
//! - **error**: `LoadFailure`, the single error every load operation returns

pub mod analysis;
pub mod archive;
pub mod classfile;
pub mod config;
pub mod error;
pub mod loader;
pub mod resource;
pub mod scan;
pub mod source;
pub mod structure;

pub use analysis::{AnalyzedSource, SourceAnalysisError};
pub use classfile::{ClassFormatError, ClassInfo};
pub use config::{DuplicatePolicy, ResourceConfig};
pub use error::{LoadCause, LoadFailure, LoadStage};
pub use loader::{ClassEntry, ClassMap, EntryLoader, Replacement};
pub use resource::{BackingStore, ChannelState, ClassFileStore, FileMap, Resource, SourceReport};
pub use scan::SourcePredicate;
pub use source::{ByteSource, FileSource, MemorySource};
