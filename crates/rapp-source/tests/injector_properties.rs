//! Property tests over sequences of injector edits

use proptest::prelude::*;
use rapp_protocol::InjectorKind;
use rapp_source::mutate::{add_injector, class_template, remove_injector};
use rapp_source::{extract_file, MutationOptions, SourceFile};

fn kind() -> impl Strategy<Value = InjectorKind> {
    prop_oneof![Just(InjectorKind::Inject), Just(InjectorKind::InjectFactory)]
}

fn sources() -> impl Strategy<Value = Vec<(String, InjectorKind)>> {
    prop::collection::btree_set("Svc[A-Z][a-z]{0,4}", 1..6)
        .prop_flat_map(|ids| {
            let len = ids.len();
            (Just(ids), prop::collection::vec(kind(), len))
        })
        .prop_map(|(ids, kinds)| ids.into_iter().zip(kinds).collect())
}

proptest! {
    #[test]
    fn injectors_are_extracted_in_insertion_order(sources in sources()) {
        let options = MutationOptions::default();
        let mut file = SourceFile::parse(class_template("Owner")).unwrap();
        for (source, kind) in &sources {
            file = add_injector(file, &options, "Owner", source, *kind).unwrap();
        }

        let extracted = extract_file(&file, "Owner").unwrap();
        let expected: Vec<(String, String)> = sources
            .iter()
            .map(|(source, kind)| (source.clone(), kind.property_name(source)))
            .collect();
        let actual: Vec<(String, String)> = extracted
            .injectors
            .iter()
            .map(|i| (i.class_id.clone(), i.property_name.clone()))
            .collect();
        prop_assert_eq!(actual, expected);
        prop_assert!(!file.has_errors());
    }

    #[test]
    fn removing_every_injector_restores_the_template(sources in sources()) {
        let options = MutationOptions::default();
        let template = class_template("Owner");
        let mut file = SourceFile::parse(template.clone()).unwrap();
        for (source, kind) in &sources {
            file = add_injector(file, &options, "Owner", source, *kind).unwrap();
        }
        for (source, _) in &sources {
            file = remove_injector(file, &options, "Owner", source).unwrap();
        }

        let extracted = extract_file(&file, "Owner").unwrap();
        prop_assert!(extracted.injectors.is_empty());
        prop_assert!(!file.text().contains("import"));
    }
}
