use serde::Serialize;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(TypeKind::Class),
            "interface_declaration" => Some(TypeKind::Interface),
            "enum_declaration" => Some(TypeKind::Enum),
            "record_declaration" => Some(TypeKind::Record),
            "annotation_type_declaration" => Some(TypeKind::Annotation),
            _ => None,
        }
    }
}

/// One type declared in a source file, with its members summarized as text.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDeclaration {
    pub name: String,
    pub internal_name: String,
    pub kind: TypeKind,
    pub is_public: bool,
    pub declaration: String,
    pub fields: Vec<String>,
    pub methods: Vec<String>,
    /// Internal name of the enclosing type; `None` for top-level types.
    pub outer: Option<String>,
}

impl TypeDeclaration {
    pub fn is_top_level(&self) -> bool {
        self.outer.is_none()
    }
}

/// Package, imports and every declared type of one compilation unit.
///
/// `types` is flat: each type is followed by the types nested in it, so
/// outer always comes before inner.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStructure {
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub types: Vec<TypeDeclaration>,
}

impl SourceStructure {
    /// Every declared type, outer before inner.
    pub fn all_types(&self) -> Vec<&TypeDeclaration> {
        self.types.iter().collect()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.types.iter().filter(|t| t.is_top_level())
    }

    /// Types declared directly inside `internal_name`.
    pub fn nested_in<'a>(
        &'a self,
        internal_name: &'a str,
    ) -> impl Iterator<Item = &'a TypeDeclaration> + 'a {
        self.types
            .iter()
            .filter(move |t| t.outer.as_deref() == Some(internal_name))
    }
}

/// Summarizes a parsed compilation unit.
pub fn extract_structure(root: &Node, source: &[u8]) -> SourceStructure {
    let mut structure = SourceStructure::default();
    let mut top_level = Vec::new();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                let package = extract_package(&child, source);
                if !package.is_empty() {
                    structure.package = Some(package);
                }
            }
            "import_declaration" => {
                if let Some(imp) = extract_import(&child, source) {
                    structure.imports.push(imp);
                }
            }
            kind => {
                if let Some(type_kind) = TypeKind::from_node_kind(kind) {
                    top_level.push((child, type_kind));
                }
            }
        }
    }

    let prefix = structure
        .package
        .as_ref()
        .map(|p| format!("{}/", p.replace('.', "/")))
        .unwrap_or_default();
    structure.types = extract_types(top_level, source, &prefix);
    structure
}

/// Walks type declarations depth-first with an explicit stack, so nesting
/// depth is bounded by the heap rather than the call stack.
fn extract_types<'t>(
    top_level: Vec<(Node<'t>, TypeKind)>,
    source: &[u8],
    prefix: &str,
) -> Vec<TypeDeclaration> {
    let mut stack: Vec<(Node<'t>, TypeKind, Option<String>)> = top_level
        .into_iter()
        .rev()
        .map(|(node, kind)| (node, kind, None))
        .collect();

    let mut types = Vec::new();
    while let Some((node, kind, outer)) = stack.pop() {
        let Some(name) = node.child_by_field_name("name").map(|n| node_text(&n, source)) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let internal_name = match &outer {
            Some(outer) => format!("{outer}${name}"),
            None => format!("{prefix}{name}"),
        };

        let mut decl = TypeDeclaration {
            name: name.to_string(),
            is_public: is_public(&node),
            declaration: extract_declaration(&node, source),
            internal_name,
            kind,
            fields: Vec::new(),
            methods: Vec::new(),
            outer,
        };

        let mut nested = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for member in member_nodes(&body) {
                match member.kind() {
                    "field_declaration" | "constant_declaration" | "enum_constant" => {
                        decl.fields.push(normalize_whitespace(node_text(&member, source)));
                    }
                    "method_declaration"
                    | "constructor_declaration"
                    | "compact_constructor_declaration" => {
                        if let Some(sig) = extract_method_signature(&member, source) {
                            decl.methods.push(sig);
                        }
                    }
                    "annotation_type_element_declaration" => {
                        decl.methods
                            .push(normalize_whitespace(node_text(&member, source)));
                    }
                    kind => {
                        if let Some(type_kind) = TypeKind::from_node_kind(kind) {
                            nested.push((member, type_kind));
                        }
                    }
                }
            }
        }

        for (member, type_kind) in nested.into_iter().rev() {
            stack.push((member, type_kind, Some(decl.internal_name.clone())));
        }
        types.push(decl);
    }
    types
}

/// Direct members of a type body. Enum constants are followed by ordinary
/// members wrapped in `enum_body_declarations`, which is flattened here.
fn member_nodes<'t>(body: &Node<'t>) -> Vec<Node<'t>> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.children(&mut inner));
        } else {
            members.push(child);
        }
    }
    members
}

fn extract_package(node: &Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "scoped_identifier" || child.kind() == "identifier" {
            return node_text(&child, source).to_string();
        }
    }
    String::new()
}

fn extract_import(node: &Node, source: &[u8]) -> Option<String> {
    let mut path = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "scoped_identifier" | "identifier" => {
                path = node_text(&child, source).to_string();
            }
            "asterisk" => path.push_str(".*"),
            _ => {}
        }
    }

    if path.is_empty() { None } else { Some(path) }
}

fn is_public(node: &Node) -> bool {
    let mut cursor = node.walk();
    let modifiers = node.children(&mut cursor).find(|c| c.kind() == "modifiers");
    let Some(modifiers) = modifiers else {
        return false;
    };

    let mut inner = modifiers.walk();
    let public = modifiers.children(&mut inner).any(|c| c.kind() == "public");
    public
}

fn extract_declaration(node: &Node, source: &[u8]) -> String {
    let mut result = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_body" | "interface_body" | "enum_body" | "annotation_type_body" => break,
            _ => {
                let text = normalize_whitespace(node_text(&child, source));
                if !result.is_empty() && !needs_no_leading_space(child.kind()) {
                    result.push(' ');
                }
                result.push_str(&text);
            }
        }
    }

    result.trim().to_string()
}

fn extract_method_signature(node: &Node, source: &[u8]) -> Option<String> {
    let mut result = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "block" | "constructor_body" => break,
            ";" => continue,
            _ => {
                let text = normalize_whitespace(node_text(&child, source));
                if !result.is_empty() && !needs_no_leading_space(child.kind()) {
                    result.push(' ');
                }
                result.push_str(&text);
            }
        }
    }

    let sig = result.trim().to_string();
    if sig.is_empty() { None } else { Some(sig) }
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn needs_no_leading_space(kind: &str) -> bool {
    matches!(
        kind,
        "type_parameters" | "formal_parameters" | "type_arguments"
    )
}
