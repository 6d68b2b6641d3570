//! Java source files, analyzed on demand.
//!
//! Construction only stores the text; [`AnalyzedSource::analyze`] parses it
//! with tree-sitter and derives the internal name of the type it defines.

use thiserror::Error;
use tree_sitter::{Node, Parser, Point, Tree};

use crate::loader::content_hash;
use crate::structure::{SourceStructure, TypeDeclaration, extract_structure};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceAnalysisError {
    #[error("source has not been analyzed")]
    NotAnalyzed,
    #[error("source text is empty")]
    Empty,
    #[error("failed to load Java grammar: {0}")]
    Language(String),
    #[error("parser produced no syntax tree")]
    NoTree,
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
    #[error("no type declaration found")]
    NoTypeDeclared,
    #[error("cannot pick the defining type among: {}", .candidates.join(", "))]
    AmbiguousType { candidates: Vec<String> },
}

#[derive(Debug, Clone)]
struct Analysis {
    internal_name: String,
    structure: SourceStructure,
    /// Index of the defining type in `structure.types`.
    primary: usize,
    tree: Tree,
}

#[derive(Debug, Clone)]
pub struct AnalyzedSource {
    owner: String,
    text: String,
    content_hash: String,
    analysis: Option<Analysis>,
}

impl AnalyzedSource {
    /// Cheap: nothing is parsed until [`AnalyzedSource::analyze`].
    pub fn new(owner: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            owner: owner.into(),
            content_hash: content_hash(text.as_bytes()),
            text,
            analysis: None,
        }
    }

    /// Parses the text and derives the defining type's internal name.
    ///
    /// Once successful, further calls return the same name without reparsing.
    /// A failed call leaves the source unanalyzed.
    pub fn analyze(&mut self) -> Result<&str, SourceAnalysisError> {
        if self.analysis.is_none() {
            let analysis = analyze_text(&self.text)?;
            self.analysis = Some(analysis);
        }
        self.internal_name()
    }

    pub fn internal_name(&self) -> Result<&str, SourceAnalysisError> {
        self.analysis
            .as_ref()
            .map(|a| a.internal_name.as_str())
            .ok_or(SourceAnalysisError::NotAnalyzed)
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn package(&self) -> Option<&str> {
        self.analysis.as_ref()?.structure.package.as_deref()
    }

    pub fn imports(&self) -> &[String] {
        match &self.analysis {
            Some(a) => &a.structure.imports,
            None => &[],
        }
    }

    pub fn structure(&self) -> Option<&SourceStructure> {
        self.analysis.as_ref().map(|a| &a.structure)
    }

    /// The type whose internal name keys this source.
    pub fn primary_type(&self) -> Option<&TypeDeclaration> {
        let analysis = self.analysis.as_ref()?;
        analysis.structure.types.get(analysis.primary)
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.analysis.as_ref().map(|a| &a.tree)
    }

    /// Internal names of every declared type, nested ones included.
    pub fn declared_types(&self) -> Vec<&str> {
        match &self.analysis {
            Some(a) => a
                .structure
                .all_types()
                .into_iter()
                .map(|t| t.internal_name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn defines(&self, internal_name: &str) -> bool {
        self.declared_types().contains(&internal_name)
    }
}

fn analyze_text(text: &str) -> Result<Analysis, SourceAnalysisError> {
    if text.trim().is_empty() {
        return Err(SourceAnalysisError::Empty);
    }

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| SourceAnalysisError::Language(e.to_string()))?;
    let tree = parser
        .parse(text, None)
        .ok_or(SourceAnalysisError::NoTree)?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or_else(|| root.start_position());
        return Err(SourceAnalysisError::Syntax {
            line: at.row + 1,
            column: at.column + 1,
        });
    }

    let structure = extract_structure(&root, text.as_bytes());
    let primary = select_primary(&structure.types)?;

    Ok(Analysis {
        internal_name: structure.types[primary].internal_name.clone(),
        structure,
        primary,
        tree,
    })
}

/// A file may declare several top-level types, but only one may be public;
/// that one names the file. Returns its index in `types`.
fn select_primary(types: &[TypeDeclaration]) -> Result<usize, SourceAnalysisError> {
    let top_level: Vec<usize> = (0..types.len())
        .filter(|&i| types[i].is_top_level())
        .collect();
    match top_level.as_slice() {
        [] => Err(SourceAnalysisError::NoTypeDeclared),
        [only] => Ok(*only),
        many => {
            let public: Vec<usize> = many.iter().copied().filter(|&i| types[i].is_public).collect();
            match public.as_slice() {
                [one] => Ok(*one),
                _ => Err(SourceAnalysisError::AmbiguousType {
                    candidates: many.iter().map(|&i| types[i].internal_name.clone()).collect(),
                }),
            }
        }
    }
}

/// Position of the first error or missing node in document order.
///
/// Walks with a cursor instead of recursing; error-free subtrees are skipped.
fn first_error(root: Node) -> Option<Point> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node.start_position());
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}
