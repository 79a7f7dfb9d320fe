//! Container behavior observed through its reports

use crossbeam::channel::Receiver;
use pretty_assertions::assert_eq;
use rapp_protocol::{AppMessage, WireMessage};
use rapp_runtime::{
    ActionHandle, ChannelReporter, Container, Inject, InjectFactory, Observable, ObservableVec, RuntimeError,
};
use serde_json::json;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

struct A;

struct B {
    a: Inject<A>,
}

struct Shop {
    create_item: InjectFactory<A>,
}

struct Counter {
    count: Observable<i64>,
    history: ObservableVec<i64>,
    increment: ActionHandle,
}

fn container() -> (Container, Receiver<AppMessage>) {
    let (reporter, events) = ChannelReporter::new();
    let container = Container::builder()
        .reporter(Arc::new(reporter))
        .register_class("A", |_, _| Ok(A))
        .register_class("B", |cx, _| Ok(B { a: cx.inject("a", "A") }))
        .register_class("Shop", |cx, _| {
            Ok(Shop {
                create_item: cx.inject_factory("createA", "A"),
            })
        })
        .register_class("Counter", |cx, _| {
            let count = cx.observable("count", 0_i64);
            let history = cx.observable_vec("history", Vec::new());
            let increment = {
                let count = count.clone();
                let history = history.clone();
                cx.action("increment", move |_| {
                    count.update(|c| *c += 1);
                    history.push(count.get());
                    Ok(())
                })
            };
            let _double = {
                let count = count.clone();
                cx.computed("double", move || count.get() * 2)
            };
            Ok(Counter {
                count,
                history,
                increment,
            })
        })
        .build();
    (container, events)
}

#[test]
fn injection_reports_first_resolution_once() {
    let (container, events) = container();
    let b = container.get("B", &[]).unwrap();
    let b_id = b.id();
    let b = b.downcast::<B>().unwrap();

    let first = b.a.get().unwrap();
    let second = b.a.get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let events: Vec<AppMessage> = events.try_iter().collect();
    let a_instances = events
        .iter()
        .filter(|m| matches!(m, AppMessage::Instance { class_id, .. } if class_id == "A"))
        .count();
    assert_eq!(a_instances, 1);

    let injections: Vec<&AppMessage> = events
        .iter()
        .filter(|m| matches!(m, AppMessage::Injection { .. }))
        .collect();
    assert_eq!(
        injections,
        vec![&AppMessage::Injection {
            class_id: "B".into(),
            instance_id: b_id,
            property_name: "a".into(),
            inject_class_id: "A".into(),
            inject_instance_id: b_id + 1,
        }]
    );
}

struct Settings;

struct App {
    settings: Inject<Settings>,
}

struct Mistyped {
    a: Inject<B>,
}

#[test]
fn factory_registered_dependency_is_reported() {
    let (reporter, events) = ChannelReporter::new();
    let container = Container::builder()
        .reporter(Arc::new(reporter))
        .register_factory("Settings", |_, _| Ok(Settings))
        .register_class("App", |cx, _| {
            Ok(App {
                settings: cx.inject("settings", "Settings"),
            })
        })
        .build();

    let app = container.get("App", &[]).unwrap();
    let app_id = app.id();
    app.downcast::<App>().unwrap().settings.get().unwrap();

    let events: Vec<AppMessage> = events.try_iter().collect();
    assert_eq!(
        events,
        vec![
            AppMessage::Instance {
                class_id: "App".into(),
                instance_id: app_id,
            },
            AppMessage::Instance {
                class_id: "Settings".into(),
                instance_id: app_id + 1,
            },
            AppMessage::Injection {
                class_id: "App".into(),
                instance_id: app_id,
                property_name: "settings".into(),
                inject_class_id: "Settings".into(),
                inject_instance_id: app_id + 1,
            },
        ]
    );
}

#[test]
fn mistyped_injection_is_never_reported() {
    let (reporter, events) = ChannelReporter::new();
    let container = Container::builder()
        .reporter(Arc::new(reporter))
        .register_class("A", |_, _| Ok(A))
        .register_class("Mistyped", |cx, _| Ok(Mistyped { a: cx.inject("a", "A") }))
        .build();

    let mistyped = container.get("Mistyped", &[]).unwrap().downcast::<Mistyped>().unwrap();
    for _ in 0..3 {
        assert!(matches!(mistyped.a.get(), Err(RuntimeError::TypeMismatch { .. })));
    }
    assert!(!events
        .try_iter()
        .any(|m| matches!(m, AppMessage::Injection { .. })));
}

#[test]
fn singleton_is_shared_and_factory_is_fresh() {
    let (container, _events) = container();
    let first = container.get_singleton("A").unwrap();
    let second = container.get_singleton("A").unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.id(), second.id());

    let factory = container.get_factory("A");
    let one = factory.create(&[]).unwrap();
    let two = factory.create(&[]).unwrap();
    assert!(!one.ptr_eq(&two));
    assert_ne!(one.id(), two.id());
}

#[test]
fn inject_factory_reports_every_creation() {
    let (container, events) = container();
    let shop = container.get("Shop", &[]).unwrap().downcast::<Shop>().unwrap();
    shop.create_item.create(&[]).unwrap();
    shop.create_item.create(&[]).unwrap();

    let injections = events
        .try_iter()
        .filter(|m| matches!(m, AppMessage::Injection { property_name, .. } if property_name == "createA"))
        .count();
    assert_eq!(injections, 2);
}

#[test]
fn identities_are_unique_under_concurrency() {
    let (container, _events) = container();
    let ids: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                scope.spawn(move || {
                    (0..50)
                        .map(|_| container.get("A", &[]).unwrap().id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 400);
    assert_eq!(unique.iter().min(), Some(&1));
    assert_eq!(unique.iter().max(), Some(&400));
}

#[test]
fn identities_increase_in_construction_order() {
    let (container, _events) = container();
    let ids: Vec<u64> = (0..5)
        .map(|_| container.get("A", &[]).unwrap().id())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn unregistered_identifier_fails() {
    let (container, _events) = container();
    let err = container.get("Missing", &[]).unwrap_err();
    assert_eq!(err.to_string(), "The identifier Missing is not registered");
    assert!(matches!(
        container.get_singleton("Missing"),
        Err(RuntimeError::UnregisteredIdentifier(_))
    ));
    assert!(container.get_factory("Missing").create(&[]).is_err());
}

#[test]
fn injection_outside_container_fails() {
    let b = B {
        a: Inject::unbound("a", "A"),
    };
    assert!(matches!(
        b.a.get(),
        Err(RuntimeError::InjectionOutsideContainer { property_name }) if property_name == "a"
    ));
}

#[test]
fn members_report_updates_splices_and_actions() {
    let (container, events) = container();
    let instance = container.get("Counter", &[]).unwrap();
    let id = instance.id();
    assert_eq!(instance.members().observables, vec!["count", "history"]);
    assert_eq!(instance.members().computed, vec!["double"]);
    assert_eq!(instance.members().actions, vec!["increment"]);

    container.run_action(id, "increment", &[json!("click")]).unwrap();
    let counter = instance.downcast::<Counter>().unwrap();
    counter.increment.call(&[]).unwrap();
    assert_eq!(counter.count.get(), 2);
    assert_eq!(counter.history.to_vec(), vec![1, 2]);

    let events: Vec<AppMessage> = events.try_iter().collect();
    assert_eq!(
        &events[..3],
        &[
            AppMessage::Update {
                class_id: "Counter".into(),
                instance_id: id,
                path: vec!["count".into()],
                value: json!(0),
            },
            AppMessage::Update {
                class_id: "Counter".into(),
                instance_id: id,
                path: vec!["history".into()],
                value: json!([]),
            },
            AppMessage::Instance {
                class_id: "Counter".into(),
                instance_id: id,
            },
        ]
    );
    assert_eq!(
        events[3],
        AppMessage::Action {
            class_id: "Counter".into(),
            instance_id: id,
            name: "increment".into(),
            args: vec![json!("click")],
        }
    );
    assert_eq!(
        events[5],
        AppMessage::Splice {
            class_id: "Counter".into(),
            instance_id: id,
            path: vec!["history".into()],
            index: 0,
            delete_count: 0,
            items: vec![json!(1)],
        }
    );
}

#[test]
fn devtool_receives_reports_and_runs_actions() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let container = Container::builder()
        .devtool(address)
        .register_class("Counter", |cx, _| {
            let count = cx.observable("count", 0_i64);
            let handle = count.clone();
            cx.action("increment", move |_| {
                handle.update(|c| *c += 1);
                Ok(())
            });
            Ok(count)
        })
        .build();
    assert!(container.is_reporting());

    let (mut socket, _) = listener.accept().unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    let instance = container.get("Counter", &[]).unwrap();
    let id = instance.id();

    let mut lines = BufReader::new(socket.try_clone().unwrap()).lines();
    let mut next = || AppMessage::from_text(&lines.next().unwrap().unwrap()).unwrap();
    assert!(matches!(next(), AppMessage::Update { .. }));
    assert!(matches!(next(), AppMessage::Instance { .. }));

    socket
        .write_all(format!("{{\"type\":\"run-action\",\"data\":{{\"instanceId\":{id},\"name\":\"increment\"}}}}\n").as_bytes())
        .unwrap();
    assert!(matches!(next(), AppMessage::Action { name, .. } if name == "increment"));
    assert_eq!(
        next(),
        AppMessage::Update {
            class_id: "Counter".into(),
            instance_id: id,
            path: vec!["count".into()],
            value: json!(1),
        }
    );
}

#[test]
fn unreachable_devtool_disables_reporting() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let container = Container::builder()
        .devtool(address)
        .register_class("A", |_, _| Ok(A))
        .build();
    assert!(!container.is_reporting());
    assert!(container.get("A", &[]).is_ok());
}
