//! Source model extraction
//!
//! One scan over a class declaration tags every member with the category
//! decided by its first decorator. [`ExtractedClass`] is assembled from the
//! tagged list.

use crate::error::SourceResult;
use crate::syntax::{string_content, ClassDecl, Decorator, MemberKind, SourceFile};
use rapp_protocol::{Action, Computed, ExtractedClass, Injector, InjectorKind, Mixin, Observable};

/// Category of a class member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberCategory {
    /// `@inject("Id")` or `@injectFactory("Id")` property
    Injector {
        /// Dependency source class
        class_id: String,
        /// Resolution kind
        kind: InjectorKind,
    },
    /// `@observable` property
    Observable,
    /// `@computed` getter
    Computed,
    /// `@action` method
    Action,
}

/// A member name with its category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedMember {
    /// Member name
    pub name: String,
    /// Decided category
    pub category: MemberCategory,
}

/// Extract the structural model of `class_id` from source text
///
/// # Errors
/// Returns [`crate::SourceError::ClassNotFound`] if the class is absent
pub fn extract(text: &str, class_id: &str) -> SourceResult<ExtractedClass> {
    let file = SourceFile::parse(text)?;
    extract_file(&file, class_id)
}

/// Extract the structural model of `class_id` from a parsed file
///
/// # Errors
/// Returns [`crate::SourceError::ClassNotFound`] if the class is absent
pub fn extract_file(file: &SourceFile, class_id: &str) -> SourceResult<ExtractedClass> {
    let class = file.find_class(class_id)?;
    let mut extracted = ExtractedClass::new(class_id);

    for (_, name) in class.implemented(file) {
        if let Some(mixin) = Mixin::from_name(name) {
            extracted.mixins.insert(mixin);
        }
    }

    for member in tag_members(file, &class) {
        match member.category {
            MemberCategory::Injector { class_id, kind } => extracted
                .injectors
                .push(Injector::new(class_id, member.name, kind)),
            MemberCategory::Observable => extracted.observables.push(Observable { name: member.name }),
            MemberCategory::Computed => extracted.computed.push(Computed { name: member.name }),
            MemberCategory::Action => extracted.actions.push(Action { name: member.name }),
        }
    }

    Ok(extracted)
}

/// Tag the members of `class_id` in declaration order
///
/// # Errors
/// Returns [`crate::SourceError::ClassNotFound`] if the class is absent
pub fn scan_members(file: &SourceFile, class_id: &str) -> SourceResult<Vec<TaggedMember>> {
    let class = file.find_class(class_id)?;
    Ok(tag_members(file, &class))
}

fn tag_members(file: &SourceFile, class: &ClassDecl<'_>) -> Vec<TaggedMember> {
    class
        .members()
        .into_iter()
        .filter_map(|member| {
            let name = member.name(file)?;
            let decorator = member.first_decorator(file)?;
            let category = categorize(file, member.kind(), &decorator)?;
            Some(TaggedMember {
                name: name.to_string(),
                category,
            })
        })
        .collect()
}

fn categorize(file: &SourceFile, kind: MemberKind, decorator: &Decorator<'_>) -> Option<MemberCategory> {
    match (kind, decorator) {
        (MemberKind::Property, Decorator::Call { name, args }) => {
            let kind = InjectorKind::from_decorator(name)?;
            match args.as_slice() {
                [arg] => string_content(file, *arg).map(|class_id| MemberCategory::Injector {
                    class_id: class_id.to_string(),
                    kind,
                }),
                _ => None,
            }
        }
        (MemberKind::Property, Decorator::Marker("observable")) => Some(MemberCategory::Observable),
        (MemberKind::Getter, Decorator::Marker("computed")) => Some(MemberCategory::Computed),
        (MemberKind::Method, Decorator::Marker("action")) => Some(MemberCategory::Action),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceError;
    use pretty_assertions::assert_eq;

    const COUNTER: &str = r#"import { inject, injectFactory, observable, computed, action, IFactory } from "reactive-app";
import { Api } from "./Api";
import { Item } from "./Item";

export class Counter implements Disposable, StateMachine<TState>, Serializable {
  @inject("Api") api!: Api;
  @injectFactory("Item") createItem!: IFactory<typeof Item>;
  @observable count = 0;
  @observable @action mixed = 1;
  @computed get double() {
    return this.count * 2;
  }
  @action increment() {
    this.count++;
  }
  @inject(Api) notAString!: Api;
  @inject("A", "B") twoArgs!: Api;
  plain = 2;
  helper() {}
}
"#;

    #[test]
    fn extracts_every_category_in_order() {
        let extracted = extract(COUNTER, "Counter").unwrap();

        assert_eq!(
            extracted.injectors,
            vec![
                Injector::new("Api", "api", InjectorKind::Inject),
                Injector::new("Item", "createItem", InjectorKind::InjectFactory),
            ]
        );
        assert_eq!(
            extracted.observables,
            vec![
                Observable { name: "count".into() },
                Observable { name: "mixed".into() }
            ]
        );
        assert_eq!(extracted.computed, vec![Computed { name: "double".into() }]);
        assert_eq!(extracted.actions, vec![Action { name: "increment".into() }]);
        assert_eq!(
            extracted.mixins.into_iter().collect::<Vec<_>>(),
            vec![Mixin::Disposable, Mixin::StateMachine]
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        assert_eq!(
            extract(COUNTER, "Counter").unwrap(),
            extract(COUNTER, "Counter").unwrap()
        );
    }

    #[test]
    fn missing_class_is_a_hard_failure() {
        let err = extract(COUNTER, "Missing").unwrap_err();
        assert!(matches!(err, SourceError::ClassNotFound { .. }));
    }

    #[test]
    fn scan_reports_tagged_members() {
        let file = SourceFile::parse(COUNTER).unwrap();
        let tagged = scan_members(&file, "Counter").unwrap();
        assert_eq!(tagged.len(), 6);
        assert_eq!(tagged[4].category, MemberCategory::Computed);
    }
}
