//! Import statement management
//!
//! Imports are grouped by module source and by whether they are type-only.
//! New names join an existing value import of the same source, otherwise a
//! new statement is appended after the last import.

use crate::edit::{line_span, remove_list_item, TextEdit};
use crate::format::FormatOptions;
use crate::syntax::{all_children, named_children, string_content, SourceFile};
use tree_sitter::Node;

/// One `import ... from "<source>"` statement
#[derive(Debug)]
struct ImportGroup<'a> {
    statement: Node<'a>,
    clause: Option<Node<'a>>,
    source: &'a str,
    type_only: bool,
    named: Option<Node<'a>>,
    specifiers: Vec<(Node<'a>, &'a str)>,
    /// Default or namespace binding next to the named imports
    other_binding: Option<Node<'a>>,
}

fn import_groups(file: &SourceFile) -> Vec<ImportGroup<'_>> {
    file.statements()
        .into_iter()
        .filter(|statement| statement.kind() == "import_statement")
        .filter_map(|statement| {
            let source = statement
                .child_by_field_name("source")
                .and_then(|s| string_content(file, s))?;
            let type_only = all_children(statement)
                .into_iter()
                .any(|c| !c.is_named() && c.kind() == "type");
            let clause = named_children(statement)
                .into_iter()
                .find(|n| n.kind() == "import_clause");
            let clause_children = clause.map(named_children).unwrap_or_default();
            let named = clause_children
                .iter()
                .copied()
                .find(|n| n.kind() == "named_imports");
            let other_binding = clause_children
                .iter()
                .copied()
                .find(|n| matches!(n.kind(), "identifier" | "namespace_import"));
            let specifiers = named
                .map(named_children)
                .unwrap_or_default()
                .into_iter()
                .filter(|n| n.kind() == "import_specifier")
                .filter_map(|spec| {
                    let name = spec.child_by_field_name("name")?;
                    Some((spec, file.node_text(name)))
                })
                .collect();

            Some(ImportGroup {
                statement,
                clause,
                source,
                type_only,
                named,
                specifiers,
                other_binding,
            })
        })
        .collect()
}

/// Whether `name` is imported from `source`
#[must_use]
pub fn has_import(file: &SourceFile, source: &str, name: &str) -> bool {
    import_groups(file)
        .iter()
        .any(|group| group.source == source && group.specifiers.iter().any(|(_, n)| *n == name))
}

/// Edits that import `name` from `source` if it is not imported yet
pub(crate) fn ensure_import(
    file: &SourceFile,
    options: &FormatOptions,
    source: &str,
    name: &str,
) -> Vec<TextEdit> {
    let groups = import_groups(file);
    if groups
        .iter()
        .any(|g| g.source == source && g.specifiers.iter().any(|(_, n)| *n == name))
    {
        return Vec::new();
    }

    let existing = groups
        .iter()
        .find(|g| g.source == source && !g.type_only && g.named.is_some());
    if let Some(group) = existing {
        return match (group.specifiers.last(), group.named) {
            (Some((last, _)), _) => vec![TextEdit::insert(last.end_byte(), format!(", {name}"))],
            (None, Some(named)) => vec![TextEdit::replace(named.byte_range(), format!("{{ {name} }}"))],
            (None, None) => Vec::new(),
        };
    }

    let statement = format!(
        "import {{ {name} }} from {q}{source}{q}{semi}",
        q = options.quote(),
        semi = options.terminator()
    );
    match groups.last() {
        Some(last) => vec![TextEdit::insert(last.statement.end_byte(), format!("\n{statement}"))],
        None if file.text().trim().is_empty() => {
            vec![TextEdit::replace(0..file.text().len(), format!("{statement}\n"))]
        }
        None => vec![TextEdit::insert(0, format!("{statement}\n\n"))],
    }
}

/// Edits that remove `name` from the imports of `source`
///
/// The whole statement goes when `name` was its only binding.
pub(crate) fn remove_import(file: &SourceFile, source: &str, name: &str) -> Vec<TextEdit> {
    let groups = import_groups(file);
    let Some(group) = groups
        .iter()
        .find(|g| g.source == source && g.specifiers.iter().any(|(_, n)| *n == name))
    else {
        return Vec::new();
    };
    let Some(index) = group.specifiers.iter().position(|(_, n)| *n == name) else {
        return Vec::new();
    };

    if group.specifiers.len() > 1 {
        let nodes: Vec<_> = group.specifiers.iter().map(|(node, _)| *node).collect();
        return remove_list_item(&nodes, index).into_iter().collect();
    }

    match (group.other_binding, group.clause) {
        (Some(binding), Some(clause)) => vec![TextEdit::replace(
            clause.byte_range(),
            file.node_text(binding).to_string(),
        )],
        _ => vec![TextEdit::delete(line_span(
            file.text(),
            group.statement.byte_range(),
        ))],
    }
}

/// Whether `name` is referenced anywhere outside import statements
#[must_use]
pub fn is_used(file: &SourceFile, name: &str) -> bool {
    let mut stack = vec![file.root()];
    while let Some(node) = stack.pop() {
        if node.kind() == "import_statement" {
            continue;
        }
        if matches!(
            node.kind(),
            "identifier" | "type_identifier" | "shorthand_property_identifier"
        ) && file.node_text(node) == name
        {
            return true;
        }
        stack.extend(named_children(node));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Rewrite;
    use pretty_assertions::assert_eq;

    fn rewrite(text: &str, f: impl FnOnce(&SourceFile) -> Vec<TextEdit>) -> String {
        Rewrite::new(SourceFile::parse(text).unwrap())
            .pass(|file| Ok(f(file)))
            .unwrap()
            .finish()
            .into_text()
    }

    #[test]
    fn joins_existing_value_import() {
        let options = FormatOptions::default();
        let text = "import { observable } from \"reactive-app\";\n\nclass A {}\n";
        let out = rewrite(text, |f| ensure_import(f, &options, "reactive-app", "inject"));
        assert_eq!(
            out,
            "import { observable, inject } from \"reactive-app\";\n\nclass A {}\n"
        );
    }

    #[test]
    fn type_only_group_is_not_reused() {
        let options = FormatOptions::default();
        let text = "import type { A } from \"./A\";\nclass B {}\n";
        let out = rewrite(text, |f| ensure_import(f, &options, "./A", "Other"));
        assert_eq!(
            out,
            "import type { A } from \"./A\";\nimport { Other } from \"./A\";\nclass B {}\n"
        );
    }

    #[test]
    fn creates_first_import_at_top() {
        let options = FormatOptions::default();
        let out = rewrite("class B {}\n", |f| ensure_import(f, &options, "./A", "A"));
        assert_eq!(out, "import { A } from \"./A\";\n\nclass B {}\n");
    }

    #[test]
    fn already_imported_name_is_left_alone() {
        let options = FormatOptions::default();
        let file = SourceFile::parse("import { A } from \"./A\";\n").unwrap();
        assert!(ensure_import(&file, &options, "./A", "A").is_empty());
        assert!(has_import(&file, "./A", "A"));
    }

    #[test]
    fn removing_last_specifier_drops_statement() {
        let text = "import { A } from \"./A\";\nimport { b, c } from \"x\";\nclass B {}\n";
        let out = rewrite(text, |f| remove_import(f, "./A", "A"));
        assert_eq!(out, "import { b, c } from \"x\";\nclass B {}\n");

        let out = rewrite(&out, |f| remove_import(f, "x", "c"));
        assert_eq!(out, "import { b } from \"x\";\nclass B {}\n");
    }

    #[test]
    fn usage_ignores_import_bindings() {
        let file = SourceFile::parse(
            "import { A, IFactory } from \"x\";\nclass B {\n  a!: A;\n}\n",
        )
        .unwrap();
        assert!(is_used(&file, "A"));
        assert!(!is_used(&file, "IFactory"));
    }
}
