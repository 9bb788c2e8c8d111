//! Per-language node classification for the tree-sitter extractor.

use crate::Language;
use crate::SymbolKind;
use tree_sitter::Node;

pub(crate) fn grammar(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
        _ => None,
    }
}

/// Returns the symbol kind and the name node when `node` declares a symbol.
pub(crate) fn classify<'tree>(
    language: Language,
    node: Node<'tree>,
    source: &str,
) -> Option<(SymbolKind, Node<'tree>)> {
    let (kind, name) = match language {
        Language::Rust => classify_rust(node)?,
        Language::Python => classify_python(node, source)?,
        Language::JavaScript | Language::TypeScript | Language::Tsx => classify_script(node)?,
        Language::Go => classify_go(node)?,
        _ => return None,
    };
    name.kind().ends_with("identifier").then_some((kind, name))
}

/// Whether an identifier-like node is a use site worth resolving.
pub(crate) fn is_use(language: Language, node: Node<'_>) -> bool {
    let parent_kind = node.parent().map(|parent| parent.kind()).unwrap_or_default();
    match (language, node.kind()) {
        (_, "identifier") => true,
        (Language::Python, _) => false,
        (_, "type_identifier") => true,
        (Language::Rust, "field_identifier") => parent_kind == "field_expression",
        (Language::Go, "field_identifier") => parent_kind == "selector_expression",
        (
            Language::JavaScript | Language::TypeScript | Language::Tsx,
            "property_identifier",
        ) => parent_kind == "member_expression",
        _ => false,
    }
}

/// Name of the closest enclosing declaration, or the receiver/impl type.
pub(crate) fn container_name(language: Language, node: Node<'_>, source: &str) -> Option<String> {
    if language == Language::Go && node.kind() == "method_declaration" {
        return node
            .child_by_field_name("receiver")
            .and_then(|receiver| first_descendant(receiver, "type_identifier"))
            .and_then(|ident| text(ident, source));
    }

    let mut current = node.parent();
    while let Some(ancestor) = current {
        if language == Language::Rust && ancestor.kind() == "impl_item" {
            return ancestor
                .child_by_field_name("type")
                .and_then(|ty| text(ty, source))
                .map(|ty| strip_generics(&ty));
        }
        if let Some((_, name)) = classify(language, ancestor, source) {
            return text(name, source);
        }
        current = ancestor.parent();
    }
    None
}

pub(crate) fn text(node: Node<'_>, source: &str) -> Option<String> {
    node.utf8_text(source.as_bytes())
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn classify_rust(node: Node<'_>) -> Option<(SymbolKind, Node<'_>)> {
    let kind = match node.kind() {
        "function_item" | "function_signature_item" => {
            let owner = nearest_ancestor(node, &["function_item", "impl_item", "trait_item"]);
            match owner.map(|n| n.kind()) {
                Some("impl_item") | Some("trait_item") => SymbolKind::Method,
                _ => SymbolKind::Function,
            }
        }
        "struct_item" | "union_item" => SymbolKind::Struct,
        "enum_item" => SymbolKind::Enum,
        "trait_item" => SymbolKind::Interface,
        "type_item" => SymbolKind::TypeAlias,
        "const_item" => SymbolKind::Constant,
        "static_item" => SymbolKind::Variable,
        "mod_item" => SymbolKind::Module,
        _ => return None,
    };
    Some((kind, node.child_by_field_name("name")?))
}

fn classify_python<'tree>(node: Node<'tree>, source: &str) -> Option<(SymbolKind, Node<'tree>)> {
    match node.kind() {
        "function_definition" => {
            let owner = nearest_ancestor(node, &["function_definition", "class_definition"]);
            let kind = match owner.map(|n| n.kind()) {
                Some("class_definition") => SymbolKind::Method,
                _ => SymbolKind::Function,
            };
            Some((kind, node.child_by_field_name("name")?))
        }
        "class_definition" => Some((SymbolKind::Class, node.child_by_field_name("name")?)),
        "assignment" => {
            let statement = node.parent().filter(|p| p.kind() == "expression_statement")?;
            statement.parent().filter(|p| p.kind() == "module")?;
            let name = node.child_by_field_name("left")?;
            let is_constant = text(name, source)
                .map(|s| s.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()))
                .unwrap_or(false);
            let kind = if is_constant {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            Some((kind, name))
        }
        _ => None,
    }
}

fn classify_script(node: Node<'_>) -> Option<(SymbolKind, Node<'_>)> {
    let kind = match node.kind() {
        "function_declaration" | "generator_function_declaration" => SymbolKind::Function,
        "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
        "method_definition" | "method_signature" | "abstract_method_signature" => {
            SymbolKind::Method
        }
        "interface_declaration" => SymbolKind::Interface,
        "type_alias_declaration" => SymbolKind::TypeAlias,
        "enum_declaration" => SymbolKind::Enum,
        "internal_module" => SymbolKind::Module,
        "variable_declarator" => {
            let declaration = node.parent()?;
            if !matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
                return None;
            }
            let scope = declaration.parent()?;
            if !matches!(scope.kind(), "program" | "export_statement") {
                return None;
            }
            let value_kind = node.child_by_field_name("value").map(|v| v.kind());
            match value_kind {
                Some("arrow_function") | Some("function_expression") | Some("function") => {
                    SymbolKind::Function
                }
                _ => SymbolKind::Variable,
            }
        }
        _ => return None,
    };
    Some((kind, node.child_by_field_name("name")?))
}

fn classify_go(node: Node<'_>) -> Option<(SymbolKind, Node<'_>)> {
    let kind = match node.kind() {
        "function_declaration" => SymbolKind::Function,
        "method_declaration" => SymbolKind::Method,
        "type_spec" => match node.child_by_field_name("type").map(|t| t.kind()) {
            Some("struct_type") => SymbolKind::Struct,
            Some("interface_type") => SymbolKind::Interface,
            _ => SymbolKind::TypeAlias,
        },
        "type_alias" => SymbolKind::TypeAlias,
        "const_spec" => SymbolKind::Constant,
        "var_spec" => {
            let in_function = nearest_ancestor(
                node,
                &["function_declaration", "method_declaration", "func_literal"],
            );
            if in_function.is_some() {
                return None;
            }
            SymbolKind::Variable
        }
        _ => return None,
    };
    Some((kind, node.child_by_field_name("name")?))
}

fn nearest_ancestor<'tree>(node: Node<'tree>, kinds: &[&str]) -> Option<Node<'tree>> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if kinds.contains(&ancestor.kind()) {
            return Some(ancestor);
        }
        current = ancestor.parent();
    }
    None
}

fn first_descendant<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == kind {
            return Some(current);
        }
        let mut cursor = current.walk();
        let children: Vec<Node<'tree>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn strip_generics(raw: &str) -> String {
    let end = raw.find('<').unwrap_or(raw.len());
    raw[..end].replace(' ', "")
}
