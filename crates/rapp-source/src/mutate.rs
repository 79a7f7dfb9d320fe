//! Structural rewrites of class and entry sources
//!
//! Every operation takes a parsed [`SourceFile`] and returns a new one built
//! through a sequence of [`Rewrite`] passes. Nothing is written here; the
//! [`crate::SourceMutator`] persists the result only once every pass has
//! succeeded.

use crate::edit::{line_span, line_start_if_leading, remove_list_item, rest_of_line_blank, Rewrite, TextEdit};
use crate::error::{SourceError, SourceResult};
use crate::extract::{scan_members, MemberCategory};
use crate::format::FormatOptions;
use crate::imports::{ensure_import, is_used, remove_import};
use crate::syntax::{named_children, named_children_without_comments, string_content, ClassDecl, Member, MemberKind, SourceFile};
use rapp_protocol::{InjectorKind, Mixin};
use tree_sitter::Node;

/// Decorator and helper names the library exports for injection
const INJECTION_IMPORTS: [&str; 3] = ["inject", "injectFactory", "IFactory"];

/// Module sources and style used when generating code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOptions {
    /// Module exporting `Container`, `inject`, `observable`, ...
    pub library_import: String,
    /// Module exporting the mixin interfaces and `applyMixins`
    pub mixins_import: String,
    /// Address written into a fresh entry file for the devtool channel
    pub devtool_address: String,
    /// Project formatting rules
    pub format: FormatOptions,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            library_import: "reactive-app".to_string(),
            mixins_import: "reactive-app/mixins".to_string(),
            devtool_address: "localhost:5051".to_string(),
            format: FormatOptions::default(),
        }
    }
}

impl MutationOptions {
    fn quoted(&self, text: &str) -> String {
        let q = self.format.quote();
        format!("{q}{text}{q}")
    }
}

/// Relative module path of a class file
#[must_use]
pub fn class_module(class_id: &str) -> String {
    format!("./{class_id}")
}

/// Source of a freshly created class
#[must_use]
pub fn class_template(class_id: &str) -> String {
    format!("export class {class_id} {{}}\n")
}

/// Source of a fresh entry file with an empty registration literal
#[must_use]
pub fn entry_template(options: &MutationOptions) -> String {
    let semi = options.format.terminator();
    format!(
        "import {{ Container }} from {library}{semi}\n\n\
         export const container = new Container({{}}, {{\n\
         {indent}devtool: process.env.NODE_ENV === {dev} ? {address} : undefined,\n\
         }}){semi}\n",
        library = options.quoted(&options.library_import),
        indent = options.format.indent(),
        dev = options.quoted("development"),
        address = options.quoted(&options.devtool_address),
    )
}

fn injector_member(options: &MutationOptions, source: &str, kind: InjectorKind) -> String {
    let property = kind.property_name(source);
    let decorator = kind.decorator();
    let ty = match kind {
        InjectorKind::Inject => source.to_string(),
        InjectorKind::InjectFactory => format!("IFactory<typeof {source}>"),
    };
    format!(
        "@{decorator}({}) {property}!: {ty}{}",
        options.quoted(source),
        options.format.terminator()
    )
}

fn injection_imports(kind: InjectorKind) -> &'static [&'static str] {
    match kind {
        InjectorKind::Inject => &["inject"],
        InjectorKind::InjectFactory => &["injectFactory", "IFactory"],
    }
}

/// Edit inserting a member after `anchor`, or first in the body
fn insert_member(
    file: &SourceFile,
    class: &ClassDecl<'_>,
    anchor: Option<&Member<'_>>,
    options: &MutationOptions,
    text: &str,
) -> TextEdit {
    let indent = options.format.indent();
    if let Some(anchor) = anchor {
        let end = anchor.span.end;
        let tail = if rest_of_line_blank(file.text(), end) {
            String::new()
        } else {
            format!("\n{indent}")
        };
        return TextEdit::insert(end, format!("\n{indent}{text}{tail}"));
    }

    match class.members().first() {
        Some(first) => match line_start_if_leading(file.text(), first.span.start) {
            Some(line_start) => TextEdit::insert(line_start, format!("{indent}{text}\n")),
            None => TextEdit::insert(class.body_open(), format!("\n{indent}{text}\n{indent}")),
        },
        None if named_children(class.body).is_empty() => {
            TextEdit::replace(class.body.byte_range(), format!("{{\n{indent}{text}\n}}"))
        }
        None => TextEdit::insert(class.body_open(), format!("\n{indent}{text}")),
    }
}

fn find_member<'a>(file: &'a SourceFile, class: &ClassDecl<'a>, name: &str) -> Option<Member<'a>> {
    class
        .members()
        .into_iter()
        .find(|member| member.name(file) == Some(name))
}

fn injector_sources(file: &SourceFile, class_id: &str) -> SourceResult<Vec<(String, String)>> {
    Ok(scan_members(file, class_id)?
        .into_iter()
        .filter_map(|member| match member.category {
            MemberCategory::Injector { class_id, .. } => Some((member.name, class_id)),
            _ => None,
        })
        .collect())
}

fn ensure_imports(mut rewrite: Rewrite, options: &MutationOptions, module: &str, names: &[&str]) -> SourceResult<Rewrite> {
    for name in names {
        rewrite = rewrite.pass(|file| Ok(ensure_import(file, &options.format, module, name)))?;
    }
    Ok(rewrite)
}

/// Drop imports of `names` from `module` that nothing references any more
fn prune_imports(mut rewrite: Rewrite, module: &str, names: &[&str]) -> SourceResult<Rewrite> {
    for name in names {
        rewrite = rewrite.pass(|file| {
            Ok(if is_used(file, name) {
                Vec::new()
            } else {
                remove_import(file, module, name)
            })
        })?;
    }
    Ok(rewrite)
}

/// Add an injector of `source` to class `owner`
///
/// A property with the same name is rewritten in place; otherwise the new
/// property follows the last existing injector.
///
/// # Errors
/// Returns [`SourceError::ClassNotFound`] or [`SourceError::MemberConflict`]
pub fn add_injector(
    file: SourceFile,
    options: &MutationOptions,
    owner: &str,
    source: &str,
    kind: InjectorKind,
) -> SourceResult<SourceFile> {
    let property = kind.property_name(source);
    let text = injector_member(options, source, kind);
    let previous = injector_sources(&file, owner)?;

    let rewrite = Rewrite::new(file).pass(|file| {
        let class = file.find_class(owner)?;
        if let Some(existing) = find_member(file, &class, &property) {
            if existing.kind() != MemberKind::Property {
                return Err(SourceError::MemberConflict {
                    class_id: owner.to_string(),
                    property_name: property.clone(),
                });
            }
            return Ok(vec![TextEdit::replace(existing.span.clone(), text.clone())]);
        }

        let anchor_name = previous.last().map(|(name, _)| name.as_str());
        let members = class.members();
        let anchor = anchor_name.and_then(|name| members.iter().find(|m| m.name(file) == Some(name)));
        Ok(vec![insert_member(file, &class, anchor, options, &text)])
    })?;

    let rewrite = ensure_imports(rewrite, options, &options.library_import, injection_imports(kind))?;
    let rewrite = if source == owner {
        rewrite
    } else {
        ensure_imports(rewrite, options, &class_module(source), &[source])?
    };

    let mut rewrite = prune_imports(rewrite, &options.library_import, &INJECTION_IMPORTS)?;
    if let Some((_, replaced)) = previous.iter().find(|(name, _)| *name == property) {
        if replaced != source {
            rewrite = prune_imports(rewrite, &class_module(replaced), &[replaced.as_str()])?;
        }
    }
    Ok(rewrite.finish())
}

/// Rewrite the property `property_name` of `owner` into an injector of `source`
///
/// The property keeps its slot; its name, decorator and type follow `kind`.
///
/// # Errors
/// Returns [`SourceError::PropertyNotFound`] if the property is absent, or
/// [`SourceError::MemberConflict`] if the new name is taken by another member
pub fn replace_injector(
    file: SourceFile,
    options: &MutationOptions,
    owner: &str,
    property_name: &str,
    source: &str,
    kind: InjectorKind,
) -> SourceResult<SourceFile> {
    let new_property = kind.property_name(source);
    let text = injector_member(options, source, kind);
    let replaced = injector_sources(&file, owner)?
        .into_iter()
        .find(|(name, _)| name == property_name)
        .map(|(_, class_id)| class_id);

    let rewrite = Rewrite::new(file).pass(|file| {
        let class = file.find_class(owner)?;
        let member = find_member(file, &class, property_name)
            .filter(|m| m.kind() == MemberKind::Property)
            .ok_or_else(|| SourceError::PropertyNotFound {
                class_id: owner.to_string(),
                property_name: property_name.to_string(),
            })?;
        if new_property != property_name && find_member(file, &class, &new_property).is_some() {
            return Err(SourceError::MemberConflict {
                class_id: owner.to_string(),
                property_name: new_property.clone(),
            });
        }
        Ok(vec![TextEdit::replace(member.span.clone(), text.clone())])
    })?;

    let rewrite = ensure_imports(rewrite, options, &options.library_import, injection_imports(kind))?;
    let rewrite = if source == owner {
        rewrite
    } else {
        ensure_imports(rewrite, options, &class_module(source), &[source])?
    };

    let mut rewrite = prune_imports(rewrite, &options.library_import, &INJECTION_IMPORTS)?;
    if let Some(replaced) = replaced.filter(|r| r != source) {
        rewrite = prune_imports(rewrite, &class_module(&replaced), &[replaced.as_str()])?;
    }
    Ok(rewrite.finish())
}

/// Remove every injector of `source` from class `owner`
///
/// Imports only used by the removed properties go with them.
///
/// # Errors
/// Returns [`SourceError::ClassNotFound`] if `owner` is absent
pub fn remove_injector(
    file: SourceFile,
    options: &MutationOptions,
    owner: &str,
    source: &str,
) -> SourceResult<SourceFile> {
    let removed: Vec<String> = injector_sources(&file, owner)?
        .into_iter()
        .filter(|(_, class_id)| class_id == source)
        .map(|(name, _)| name)
        .collect();
    if removed.is_empty() {
        return Ok(file);
    }

    let rewrite = Rewrite::new(file).pass(|file| {
        let class = file.find_class(owner)?;
        Ok(class
            .members()
            .iter()
            .filter(|m| m.name(file).is_some_and(|n| removed.iter().any(|r| r == n)))
            .map(|m| TextEdit::delete(line_span(file.text(), m.span.clone())))
            .collect())
    })?;

    let rewrite = prune_imports(rewrite, &options.library_import, &INJECTION_IMPORTS)?;
    let rewrite = prune_imports(rewrite, &class_module(source), &[source])?;
    Ok(rewrite.finish())
}

/// Toggle a mixin on class `owner`
///
/// `StateMachine` additionally adds or removes the `TState` alias and the
/// `transitions` and `state` members as one set.
///
/// # Errors
/// Returns [`SourceError::ClassNotFound`] if `owner` is absent
pub fn toggle_mixin(
    file: SourceFile,
    options: &MutationOptions,
    owner: &str,
    mixin: Mixin,
) -> SourceResult<SourceFile> {
    let class = file.find_class(owner)?;
    let implemented = class
        .implemented(&file)
        .iter()
        .any(|(_, name)| *name == mixin.name());

    let rewrite = Rewrite::new(file.clone());
    let rewrite = match mixin {
        Mixin::StateMachine => {
            let enabled = implemented || file.find_type_alias(STATE_TYPE).is_some();
            if enabled {
                state_machine_off(rewrite, options, owner)?
            } else {
                state_machine_on(rewrite, options, owner)?
            }
        }
        _ if implemented => mixin_off(rewrite, options, owner, mixin)?,
        _ => mixin_on(rewrite, options, owner, mixin, mixin.name())?,
    };
    Ok(rewrite.finish())
}

const STATE_TYPE: &str = "TState";
const STATE_MEMBER: &str = "state";
const TRANSITIONS_MEMBER: &str = "transitions";

fn mixin_on(rewrite: Rewrite, options: &MutationOptions, owner: &str, mixin: Mixin, interface: &str) -> SourceResult<Rewrite> {
    let rewrite = rewrite
        .pass(|file| {
            let class = file.find_class(owner)?;
            Ok(vec![implements_add(&class, interface)])
        })?
        .pass(|file| Ok(mixin_call_add(file, options, owner, mixin.name())))?;
    ensure_imports(rewrite, options, &options.mixins_import, &[mixin.name(), "applyMixins"])
}

fn mixin_off(rewrite: Rewrite, options: &MutationOptions, owner: &str, mixin: Mixin) -> SourceResult<Rewrite> {
    let rewrite = rewrite
        .pass(|file| {
            let class = file.find_class(owner)?;
            Ok(implements_remove(file, &class, mixin.name()))
        })?
        .pass(|file| Ok(mixin_call_remove(file, owner, mixin.name())))?;
    prune_imports(rewrite, &options.mixins_import, &[mixin.name(), "applyMixins"])
}

fn state_machine_on(rewrite: Rewrite, options: &MutationOptions, owner: &str) -> SourceResult<Rewrite> {
    let q = |s: &str| options.quoted(s);
    let semi = options.format.terminator();
    let alias = format!(
        "export type {STATE_TYPE} = {{ current: {foo} }} | {{ current: {bar} }}{semi}\n\n",
        foo = q("FOO"),
        bar = q("BAR"),
    );
    let transitions = format!(
        "readonly {TRANSITIONS_MEMBER}: StateMachineTransitions<{STATE_TYPE}> = {{ FOO: {{ BAR: true }}, BAR: {{ FOO: true }} }}{semi}"
    );
    let state = format!(
        "@observable {STATE_MEMBER}: {STATE_TYPE} = {{ current: {foo} }}{semi}",
        foo = q("FOO")
    );

    let rewrite = rewrite.pass(|file| {
        if file.find_type_alias(STATE_TYPE).is_some() {
            return Ok(Vec::new());
        }
        let class = file.find_class(owner)?;
        Ok(vec![TextEdit::insert(class.statement.start_byte(), alias.clone())])
    })?;

    let rewrite = rewrite.pass(|file| {
        let class = file.find_class(owner)?;
        let missing: Vec<&str> = [(TRANSITIONS_MEMBER, &transitions), (STATE_MEMBER, &state)]
            .into_iter()
            .filter(|(name, _)| find_member(file, &class, name).is_none())
            .map(|(_, text)| text.as_str())
            .collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }
        let separator = format!("\n{}", options.format.indent());
        let text = missing.join(separator.as_str());
        let injectors = injector_sources(file, owner)?;
        let members = class.members();
        let anchor = injectors
            .last()
            .and_then(|(name, _)| members.iter().find(|m| m.name(file) == Some(name.as_str())));
        Ok(vec![insert_member(file, &class, anchor, options, &text)])
    })?;

    let rewrite = mixin_on(rewrite, options, owner, Mixin::StateMachine, &format!("StateMachine<{STATE_TYPE}>"))?;
    let rewrite = ensure_imports(rewrite, options, &options.mixins_import, &["StateMachineTransitions"])?;
    ensure_imports(rewrite, options, &options.library_import, &["observable"])
}

fn state_machine_off(rewrite: Rewrite, options: &MutationOptions, owner: &str) -> SourceResult<Rewrite> {
    let rewrite = rewrite
        .pass(|file| {
            let class = file.find_class(owner)?;
            Ok(class
                .members()
                .iter()
                .filter(|m| m.kind() == MemberKind::Property)
                .filter(|m| matches!(m.name(file), Some(STATE_MEMBER | TRANSITIONS_MEMBER)))
                .map(|m| TextEdit::delete(line_span(file.text(), m.span.clone())))
                .collect())
        })?
        .pass(|file| {
            Ok(file
                .find_type_alias(STATE_TYPE)
                .map(|alias| TextEdit::delete(line_span(file.text(), alias.byte_range())))
                .into_iter()
                .collect())
        })?;

    let rewrite = mixin_off(rewrite, options, owner, Mixin::StateMachine)?;
    let rewrite = prune_imports(rewrite, &options.mixins_import, &["StateMachineTransitions"])?;
    prune_imports(rewrite, &options.library_import, &["observable"])
}

fn implements_add(class: &ClassDecl<'_>, interface: &str) -> TextEdit {
    if let Some(clause) = class.implements_clause() {
        return TextEdit::insert(clause.end_byte(), format!(", {interface}"));
    }
    if let Some(heritage) = class.heritage() {
        return TextEdit::insert(heritage.end_byte(), format!(" implements {interface}"));
    }
    let after = class
        .node
        .child_by_field_name("type_parameters")
        .unwrap_or(class.name);
    TextEdit::insert(after.end_byte(), format!(" implements {interface}"))
}

fn implements_remove(file: &SourceFile, class: &ClassDecl<'_>, name: &str) -> Vec<TextEdit> {
    let implemented = class.implemented(file);
    let Some(index) = implemented.iter().position(|(_, n)| *n == name) else {
        return Vec::new();
    };
    if implemented.len() > 1 {
        let nodes: Vec<Node<'_>> = implemented.iter().map(|(node, _)| *node).collect();
        return remove_list_item(&nodes, index).into_iter().collect();
    }
    let Some(clause) = class.implements_clause() else {
        return Vec::new();
    };
    let bytes = file.text().as_bytes();
    let mut start = clause.start_byte();
    while start > 0 && bytes[start - 1].is_ascii_whitespace() {
        start -= 1;
    }
    vec![TextEdit::delete(start..clause.end_byte())]
}

fn mixin_call_add(file: &SourceFile, options: &MutationOptions, owner: &str, mixin: &str) -> Vec<TextEdit> {
    if let Some(call) = file.find_mixin_call(owner) {
        let items = named_children_without_comments(call.array);
        if items.iter().any(|item| file.node_text(*item) == mixin) {
            return Vec::new();
        }
        return match items.last() {
            Some(last) => vec![TextEdit::insert(last.end_byte(), format!(", {mixin}"))],
            None => vec![TextEdit::replace(call.array.byte_range(), format!("[{mixin}]"))],
        };
    }
    match file.find_class(owner) {
        Ok(class) => vec![TextEdit::insert(
            class.statement.end_byte(),
            format!("\n\napplyMixins({owner}, [{mixin}]){}", options.format.terminator()),
        )],
        Err(_) => Vec::new(),
    }
}

fn mixin_call_remove(file: &SourceFile, owner: &str, mixin: &str) -> Vec<TextEdit> {
    let Some(call) = file.find_mixin_call(owner) else {
        return Vec::new();
    };
    let items = named_children_without_comments(call.array);
    let Some(index) = items.iter().position(|item| file.node_text(*item) == mixin) else {
        return Vec::new();
    };
    if items.len() > 1 {
        return remove_list_item(&items, index).into_iter().collect();
    }
    vec![TextEdit::delete(line_span(file.text(), call.statement.byte_range()))]
}

/// Object literal passed first to `new Container(...)`
fn find_registration(file: &SourceFile) -> Option<Node<'_>> {
    let mut stack = vec![file.root()];
    while let Some(node) = stack.pop() {
        if node.kind() == "new_expression" {
            let constructor = node.child_by_field_name("constructor");
            let first_arg = node
                .child_by_field_name("arguments")
                .and_then(|args| named_children_without_comments(args).into_iter().next());
            if let (Some(constructor), Some(arg)) = (constructor, first_arg) {
                if file.node_text(constructor) == "Container" && arg.kind() == "object" {
                    return Some(arg);
                }
            }
        }
        let mut children = named_children(node);
        children.reverse();
        stack.extend(children);
    }
    None
}

fn registration_key<'a>(file: &'a SourceFile, entry: Node<'a>) -> Option<&'a str> {
    match entry.kind() {
        "shorthand_property_identifier" => Some(file.node_text(entry)),
        "pair" => {
            let key = entry.child_by_field_name("key")?;
            string_content(file, key).or(Some(file.node_text(key)))
        }
        _ => None,
    }
}

/// Class ids registered in the entry file, in literal order
///
/// # Errors
/// Returns [`SourceError::RegistrationNotFound`] if the literal is absent
pub fn registered_classes(entry: &SourceFile) -> SourceResult<Vec<String>> {
    let object = find_registration(entry).ok_or(SourceError::RegistrationNotFound)?;
    Ok(named_children_without_comments(object)
        .into_iter()
        .filter_map(|e| registration_key(entry, e).map(str::to_string))
        .collect())
}

/// Register `class_id` in the entry file's registration literal
///
/// # Errors
/// Returns [`SourceError::RegistrationNotFound`] if the literal is absent
pub fn register_class(entry: SourceFile, options: &MutationOptions, class_id: &str) -> SourceResult<SourceFile> {
    let rewrite = Rewrite::new(entry).pass(|file| {
        let object = find_registration(file).ok_or(SourceError::RegistrationNotFound)?;
        let entries = named_children_without_comments(object);
        if entries.iter().any(|e| registration_key(file, *e) == Some(class_id)) {
            return Ok(Vec::new());
        }
        let Some(last) = entries.last() else {
            return Ok(vec![TextEdit::replace(object.byte_range(), format!("{{ {class_id} }}"))]);
        };
        if file.node_text(object).contains('\n') {
            let line_start = file.text()[..last.start_byte()].rfind('\n').map_or(0, |i| i + 1);
            let indent = &file.text()[line_start..last.start_byte()];
            let indent = if indent.trim().is_empty() { indent.to_string() } else { options.format.indent() };
            Ok(vec![TextEdit::insert(last.end_byte(), format!(",\n{indent}{class_id}"))])
        } else {
            Ok(vec![TextEdit::insert(last.end_byte(), format!(", {class_id}"))])
        }
    })?;
    let rewrite = ensure_imports(rewrite, options, &class_module(class_id), &[class_id])?;
    Ok(rewrite.finish())
}

/// Remove `class_id` from the entry file's registration literal and imports
///
/// # Errors
/// Returns [`SourceError::RegistrationNotFound`] if the literal is absent
pub fn unregister_class(entry: SourceFile, class_id: &str) -> SourceResult<SourceFile> {
    let rewrite = Rewrite::new(entry).pass(|file| {
        let object = find_registration(file).ok_or(SourceError::RegistrationNotFound)?;
        let entries = named_children_without_comments(object);
        let Some(index) = entries.iter().position(|e| registration_key(file, *e) == Some(class_id)) else {
            return Ok(Vec::new());
        };
        if entries.len() == 1 {
            return Ok(vec![TextEdit::replace(object.byte_range(), "{}")]);
        }
        Ok(remove_list_item(&entries, index).into_iter().collect())
    })?;
    let rewrite = prune_imports(rewrite, &class_module(class_id), &[class_id])?;
    Ok(rewrite.finish())
}

/// Rename the declaration of `from` and its `applyMixins` call to `to`
///
/// # Errors
/// Returns [`SourceError::ClassNotFound`] if `from` is absent
pub fn rename_class(file: SourceFile, from: &str, to: &str) -> SourceResult<SourceFile> {
    let rewrite = Rewrite::new(file).pass(|file| {
        let class = file.find_class(from)?;
        let mut edits = vec![TextEdit::replace(class.name.byte_range(), to)];
        if let Some(call) = file.find_mixin_call(from) {
            edits.push(TextEdit::replace(call.target.byte_range(), to));
        }
        Ok(edits)
    })?;
    Ok(rewrite.finish())
}
