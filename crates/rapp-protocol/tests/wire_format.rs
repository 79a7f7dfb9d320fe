//! Wire shapes expected by editor frontends and instrumented programs

use pretty_assertions::assert_eq;
use rapp_protocol::prelude::*;
use rapp_protocol::BackendStatus;
use serde_json::json;

fn to_json<T: WireMessage>(message: &T) -> serde_json::Value {
    serde_json::from_str(&message.to_text().unwrap()).unwrap()
}

#[test]
fn unit_commands_have_no_data() {
    assert_eq!(Command::from_text(r#"{"type":"init"}"#).unwrap(), Command::Init);
    assert_eq!(to_json(&Event::Disconnect), json!({"type": "disconnect"}));
}

#[test]
fn inject_replace_uses_injector_type_field() {
    let text = r#"{
        "type": "inject-replace",
        "data": {"classId": "B", "injectClassId": "C", "propertyName": "a", "injectorType": "injectFactory"}
    }"#;
    assert_eq!(
        Command::from_text(text).unwrap(),
        Command::InjectReplace {
            class_id: "B".into(),
            inject_class_id: "C".into(),
            property_name: "a".into(),
            kind: InjectorKind::InjectFactory,
        }
    );
}

#[test]
fn toggle_mixin_names_mixin_by_interface() {
    let command = Command::ToggleMixin {
        class_id: "A".into(),
        mixin: Mixin::StateMachine,
    };
    assert_eq!(
        to_json(&command),
        json!({"type": "toggle-mixin", "data": {"classId": "A", "mixin": "StateMachine"}})
    );
}

#[test]
fn class_delete_event_carries_bare_id() {
    assert_eq!(
        to_json(&Event::ClassDelete("A".into())),
        json!({"type": "class-delete", "data": "A"})
    );
}

#[test]
fn init_event_carries_status_tag() {
    let event = Event::Init(BackendStatus::MissingDependencies { path: "/p".into() });
    assert_eq!(
        to_json(&event),
        json!({"type": "init", "data": {"status": "missing-dependencies", "path": "/p"}})
    );
}

#[test]
fn class_flattens_position_into_extraction() {
    let mut extracted = ExtractedClass::new("B");
    extracted.mixins.insert(Mixin::Disposable);
    extracted
        .injectors
        .push(Injector::new("A", "a", InjectorKind::Inject));
    let event = Event::ClassUpdate(Class::new(extracted, ClassMetadata::new(10.0, 20.0)));

    assert_eq!(
        to_json(&event),
        json!({
            "type": "class-update",
            "data": {
                "classId": "B",
                "mixins": ["Disposable"],
                "injectors": [{"classId": "A", "propertyName": "a", "type": "inject"}],
                "observables": [],
                "computed": [],
                "actions": [],
                "x": 10.0,
                "y": 20.0
            }
        })
    );
}

#[test]
fn app_messages_decode_from_runtime_lines() {
    let line = "{\"type\":\"splice\",\"data\":{\"classId\":\"A\",\"instanceId\":1,\"path\":[\"list\"],\"index\":1,\"deleteCount\":0,\"items\":[9]}}\n";
    let message = AppMessage::from_text(line).unwrap();
    assert_eq!(message.class_id(), "A");
    assert_eq!(message.instance_id(), 1);
    assert_eq!(
        message,
        AppMessage::Splice {
            class_id: "A".into(),
            instance_id: 1,
            path: vec!["list".into()],
            index: 1,
            delete_count: 0,
            items: vec![json!(9)],
        }
    );
}

#[test]
fn runtime_command_lines_are_newline_terminated() {
    let line = RuntimeCommand::RunAction {
        instance_id: 3,
        name: "increment".into(),
        args: Vec::new(),
    }
    .to_line()
    .unwrap();
    assert!(line.ends_with('\n'));
    assert_eq!(
        RuntimeCommand::from_text(r#"{"type":"run-action","data":{"instanceId":3,"name":"increment"}}"#).unwrap(),
        RuntimeCommand::RunAction {
            instance_id: 3,
            name: "increment".into(),
            args: Vec::new(),
        }
    );
}

#[test]
fn malformed_text_is_a_decode_error() {
    let err = Command::from_text(r#"{"type":"class-teleport"}"#).unwrap_err();
    assert!(matches!(err, rapp_protocol::ProtocolError::Decode { .. }));
}
