//! Parsed TypeScript source and structural lookups
//!
//! [`SourceFile`] pairs the source text with its tree-sitter tree. The
//! lookups here are shared by extraction and rewriting so both agree on
//! what counts as a class, a member and a decorator.

use crate::error::{SourceError, SourceResult};
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// Source text with its syntax tree
#[derive(Debug, Clone)]
pub struct SourceFile {
    text: String,
    tree: Tree,
}

impl SourceFile {
    /// Parse TypeScript source
    ///
    /// # Errors
    /// Returns error if the grammar cannot be loaded or parsing yields no tree
    pub fn parse(text: impl Into<String>) -> SourceResult<Self> {
        let text = text.into();
        let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SourceError::ParserInit(e.to_string()))?;

        let tree = parser.parse(&text, None).ok_or(SourceError::ParseFailed)?;
        Ok(Self { text, tree })
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Take the source text
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Whether the tree contains syntax errors
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Root `program` node
    #[inline]
    pub(crate) fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Text covered by a node
    pub(crate) fn node_text(&self, node: Node<'_>) -> &str {
        self.text.get(node.byte_range()).unwrap_or("")
    }

    /// Top-level statements
    pub(crate) fn statements(&self) -> Vec<Node<'_>> {
        named_children(self.root())
    }

    /// Locate a class declaration by exact name
    ///
    /// # Errors
    /// Returns [`SourceError::ClassNotFound`] if no top-level class has that name
    pub(crate) fn find_class(&self, class_id: &str) -> SourceResult<ClassDecl<'_>> {
        self.statements()
            .into_iter()
            .filter_map(|statement| {
                let node = class_in_statement(statement)?;
                let name = node.child_by_field_name("name")?;
                let body = node.child_by_field_name("body")?;
                Some(ClassDecl {
                    node,
                    statement,
                    name,
                    body,
                })
            })
            .find(|class| self.node_text(class.name) == class_id)
            .ok_or_else(|| SourceError::class_not_found(class_id))
    }

    /// Top-level `type <name> = ...` statement, exported or not
    pub(crate) fn find_type_alias(&self, name: &str) -> Option<Node<'_>> {
        self.statements().into_iter().find(|statement| {
            let alias = match statement.kind() {
                "type_alias_declaration" => Some(*statement),
                "export_statement" => statement
                    .child_by_field_name("declaration")
                    .filter(|d| d.kind() == "type_alias_declaration"),
                _ => None,
            };
            alias
                .and_then(|a| a.child_by_field_name("name"))
                .is_some_and(|n| self.node_text(n) == name)
        })
    }

    /// `applyMixins(<class>, [...])` statement
    pub(crate) fn find_mixin_call(&self, class_id: &str) -> Option<MixinCall<'_>> {
        self.statements().into_iter().find_map(|statement| {
            if statement.kind() != "expression_statement" {
                return None;
            }
            let call = named_children(statement)
                .into_iter()
                .find(|n| n.kind() == "call_expression")?;
            let function = call.child_by_field_name("function")?;
            if self.node_text(function) != "applyMixins" {
                return None;
            }
            let args = call
                .child_by_field_name("arguments")
                .map(named_children_without_comments)
                .unwrap_or_default();
            match args.as_slice() {
                [target, array]
                    if self.node_text(*target) == class_id && array.kind() == "array" =>
                {
                    Some(MixinCall {
                        statement,
                        target: *target,
                        array: *array,
                    })
                }
                _ => None,
            }
        })
    }
}

/// A located `applyMixins(<class>, [...])` call
#[derive(Debug, Clone, Copy)]
pub(crate) struct MixinCall<'a> {
    /// Enclosing expression statement
    pub(crate) statement: Node<'a>,
    /// Class argument
    pub(crate) target: Node<'a>,
    /// Mixin array argument
    pub(crate) array: Node<'a>,
}

/// A located class declaration
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClassDecl<'a> {
    /// `class_declaration` node
    pub(crate) node: Node<'a>,
    /// Enclosing top-level statement (the `export` wrapper if any)
    pub(crate) statement: Node<'a>,
    /// Name node
    pub(crate) name: Node<'a>,
    /// `class_body` node
    pub(crate) body: Node<'a>,
}

impl<'a> ClassDecl<'a> {
    /// `extends`/`implements` heritage
    pub(crate) fn heritage(&self) -> Option<Node<'a>> {
        named_children(self.node)
            .into_iter()
            .find(|n| n.kind() == "class_heritage")
    }

    /// `implements` clause
    pub(crate) fn implements_clause(&self) -> Option<Node<'a>> {
        self.heritage().and_then(|heritage| {
            named_children(heritage)
                .into_iter()
                .find(|n| n.kind() == "implements_clause")
        })
    }

    /// Implemented types with their base names (`StateMachine<T>` → `StateMachine`)
    pub(crate) fn implemented(&self, file: &'a SourceFile) -> Vec<(Node<'a>, &'a str)> {
        self.implements_clause()
            .map(named_children_without_comments)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|ty| {
                let base = match ty.kind() {
                    "generic_type" => ty.child_by_field_name("name")?,
                    _ => ty,
                };
                Some((ty, file.node_text(base)))
            })
            .collect()
    }

    /// Members in declaration order with their decorators
    pub(crate) fn members(&self) -> Vec<Member<'a>> {
        let children = all_children(self.body);
        let mut members = Vec::new();
        let mut pending = Vec::new();

        for (index, child) in children.iter().enumerate() {
            if !child.is_named() || child.kind() == "comment" {
                continue;
            }
            if child.kind() == "decorator" {
                pending.push(*child);
                continue;
            }

            let mut decorators = std::mem::take(&mut pending);
            decorators.extend(
                named_children(*child)
                    .into_iter()
                    .filter(|n| n.kind() == "decorator"),
            );

            let start = decorators
                .first()
                .map_or(child.start_byte(), |d| d.start_byte().min(child.start_byte()));
            let end = match children.get(index + 1) {
                Some(next) if !next.is_named() && next.kind() == ";" => next.end_byte(),
                _ => child.end_byte(),
            };

            members.push(Member {
                node: *child,
                decorators,
                span: start..end,
            });
        }

        members
    }

    /// Byte offset just after the opening brace
    pub(crate) fn body_open(&self) -> usize {
        self.body.start_byte() + 1
    }
}

/// Kind of class member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    Property,
    Getter,
    Setter,
    Method,
    Other,
}

/// A class member together with the decorators attached to it
#[derive(Debug, Clone)]
pub(crate) struct Member<'a> {
    pub(crate) node: Node<'a>,
    pub(crate) decorators: Vec<Node<'a>>,
    /// From the first decorator to the terminating `;`
    pub(crate) span: Range<usize>,
}

impl<'a> Member<'a> {
    pub(crate) fn kind(&self) -> MemberKind {
        match self.node.kind() {
            "public_field_definition" | "field_definition" => MemberKind::Property,
            "method_definition" => {
                let accessor = all_children(self.node)
                    .into_iter()
                    .filter(|c| !c.is_named())
                    .find_map(|c| match c.kind() {
                        "get" => Some(MemberKind::Getter),
                        "set" => Some(MemberKind::Setter),
                        _ => None,
                    });
                accessor.unwrap_or(MemberKind::Method)
            }
            _ => MemberKind::Other,
        }
    }

    pub(crate) fn name(&self, file: &'a SourceFile) -> Option<&'a str> {
        self.node
            .child_by_field_name("name")
            .map(|name| file.node_text(name))
    }

    /// Shape of the first decorator, the only one that decides the category
    pub(crate) fn first_decorator(&self, file: &'a SourceFile) -> Option<Decorator<'a>> {
        self.decorators
            .first()
            .map(|decorator| Decorator::parse(file, *decorator))
    }
}

/// Decorator expression shape
#[derive(Debug, Clone)]
pub(crate) enum Decorator<'a> {
    /// `@name`
    Marker(&'a str),
    /// `@name(args)`
    Call { name: &'a str, args: Vec<Node<'a>> },
    /// Member expressions and anything else
    Other,
}

impl<'a> Decorator<'a> {
    fn parse(file: &'a SourceFile, decorator: Node<'a>) -> Self {
        let Some(expression) = named_children_without_comments(decorator).into_iter().next() else {
            return Decorator::Other;
        };
        match expression.kind() {
            "identifier" => Decorator::Marker(file.node_text(expression)),
            "call_expression" => {
                let Some(function) = expression.child_by_field_name("function") else {
                    return Decorator::Other;
                };
                if function.kind() != "identifier" {
                    return Decorator::Other;
                }
                let args = expression
                    .child_by_field_name("arguments")
                    .map(named_children_without_comments)
                    .unwrap_or_default();
                Decorator::Call {
                    name: file.node_text(function),
                    args,
                }
            }
            _ => Decorator::Other,
        }
    }
}

/// Content of a string literal node without its quotes
pub(crate) fn string_content<'a>(file: &'a SourceFile, node: Node<'a>) -> Option<&'a str> {
    if node.kind() != "string" {
        return None;
    }
    let text = file.node_text(node);
    text.get(1..text.len().saturating_sub(1))
}

pub(crate) fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn named_children_without_comments(node: Node<'_>) -> Vec<Node<'_>> {
    named_children(node)
        .into_iter()
        .filter(|n| n.kind() != "comment")
        .collect()
}

fn class_in_statement(statement: Node<'_>) -> Option<Node<'_>> {
    match statement.kind() {
        "class_declaration" | "abstract_class_declaration" => Some(statement),
        "export_statement" => named_children(statement)
            .into_iter()
            .find(|n| matches!(n.kind(), "class_declaration" | "abstract_class_declaration")),
        _ => None,
    }
}
