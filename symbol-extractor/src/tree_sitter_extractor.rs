use crate::Declaration;
use crate::Extraction;
use crate::Language;
use crate::ParseError;
use crate::SourceFile;
use crate::SymbolExtractor;
use crate::Use;
use crate::UseTarget;
use crate::position::LineIndex;
use crate::position::Range;
use crate::rules;
use log::debug;
use std::collections::HashSet;
use tree_sitter::Node;
use tree_sitter::Parser;

/// Symbol extractor backed by tree-sitter grammars.
///
/// A fresh parser is created per call, so one instance can serve any number
/// of concurrent extractions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterExtractor;

impl TreeSitterExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolExtractor for TreeSitterExtractor {
    fn supports(&self, language: Language) -> bool {
        language.has_tree_sitter_support()
    }

    fn extract(&self, file: &SourceFile) -> Result<Extraction, ParseError> {
        let language = file.language;
        let grammar = rules::grammar(language).ok_or_else(|| {
            ParseError::new(format!("no grammar registered for {language:?}"))
        })?;

        let mut parser = Parser::new();
        parser.set_language(&grammar).map_err(|err| {
            ParseError::new(format!("failed to load {} grammar: {err}", language.name()))
        })?;
        let tree = parser
            .parse(&file.content, None)
            .ok_or_else(|| ParseError::new(format!("failed to parse {}", file.path.display())))?;

        let source = file.content.as_str();
        let lines = LineIndex::new(source);
        let root = tree.root_node();

        if root.has_error() {
            let position = first_error(root).map(|node| {
                let point = node.start_position();
                lines.position(point.row, point.column)
            });
            let message = match position {
                Some(position) => format!("syntax error at {position}"),
                None => "syntax error".to_string(),
            };
            return Err(ParseError { message, position });
        }

        let mut extraction = Extraction::default();
        let mut declared_names: HashSet<usize> = HashSet::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if let Some((kind, name_node)) = rules::classify(language, node, source) {
                if let Some(name) = rules::text(name_node, source) {
                    declared_names.insert(name_node.id());
                    extraction.symbols.push(Declaration {
                        name,
                        kind,
                        range: node_range(&lines, node),
                        selection_range: node_range(&lines, name_node),
                        byte_range: node.byte_range(),
                        container: rules::container_name(language, node, source),
                    });
                }
            } else if rules::is_use(language, node) && !declared_names.contains(&node.id()) {
                if let Some(name) = rules::text(node, source) {
                    extraction.uses.push(Use {
                        file: file.path.clone(),
                        range: node_range(&lines, node),
                        target: UseTarget::Name(name),
                    });
                }
            }

            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        debug!(
            "Extracted {} symbols and {} uses from {}",
            extraction.symbols.len(),
            extraction.uses.len(),
            file.path.display()
        );

        Ok(extraction)
    }
}

fn node_range(lines: &LineIndex<'_>, node: Node<'_>) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(
        lines.position(start.row, start.column),
        lines.position(end.row, end.column),
    )
}

/// First error or missing node in source order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| child.has_error() || child.is_missing())
            .collect();
        stack.extend(children.into_iter().rev());
    }
    None
}
