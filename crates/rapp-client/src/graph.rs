//! Class graph model
//!
//! One node per class, one link per injector whose source class is on the
//! graph, plus the live instances the runtime reported for every node.
//! Built on persistent maps so published snapshots share structure with
//! the working copy.

use crate::error::{ClientError, ClientResult};
use crate::values::{set_path, splice_path};
use chrono::{DateTime, Utc};
use im::{OrdMap, Vector};
use rapp_protocol::{
    AppMessage, BackendStatus, Class, ClassId, ClassMetadata, Event, ExtractedClass, Injector, InstanceId,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One recorded action call
#[derive(Debug, Clone, PartialEq)]
pub struct ActionExecution {
    /// Call arguments
    pub args: Vec<Value>,
    /// When the call was received
    pub time: DateTime<Utc>,
}

/// Runtime state of one instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceState {
    /// Observable values keyed by member name
    pub values: Value,
    /// Resolved instance ids per injected property, oldest first
    pub injections: OrdMap<String, Vector<InstanceId>>,
    /// Calls per action, most recent first
    pub action_executions: OrdMap<String, Vector<ActionExecution>>,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            values: Value::Object(Map::new()),
            injections: OrdMap::new(),
            action_executions: OrdMap::new(),
        }
    }
}

/// Graph node for one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    /// Structure and position
    pub class: Class,
    /// Reported instances
    pub instances: OrdMap<InstanceId, InstanceState>,
    /// Instance shown in the inspector
    pub current_instance_id: Option<InstanceId>,
}

impl ClassNode {
    /// Node without instances
    #[must_use]
    pub fn new(class: Class) -> Self {
        Self {
            class,
            instances: OrdMap::new(),
            current_instance_id: None,
        }
    }

    /// Class name
    #[inline]
    #[must_use]
    pub fn class_id(&self) -> &str {
        self.class.class_id()
    }

    fn instance_mut(&mut self, instance_id: InstanceId) -> &mut InstanceState {
        self.instances.entry(instance_id).or_insert_with(InstanceState::default)
    }

    fn focus_single(&mut self, instance_id: InstanceId) {
        if self.instances.len() == 1 {
            self.current_instance_id = Some(instance_id);
        }
    }

    fn clear_instances(&mut self) {
        self.instances = OrdMap::new();
        self.current_instance_id = None;
    }

    fn apply(&mut self, message: AppMessage) {
        match message {
            AppMessage::Instance { instance_id, .. } => {
                self.instance_mut(instance_id);
                if self.current_instance_id.is_none() {
                    self.current_instance_id = Some(instance_id);
                }
            }
            AppMessage::Injection {
                instance_id,
                property_name,
                inject_instance_id,
                ..
            } => {
                self.instance_mut(instance_id)
                    .injections
                    .entry(property_name)
                    .or_insert_with(Vector::new)
                    .push_back(inject_instance_id);
            }
            AppMessage::Update {
                instance_id,
                path,
                value,
                ..
            } => {
                set_path(&mut self.instance_mut(instance_id).values, &path, value);
                self.focus_single(instance_id);
            }
            AppMessage::Splice {
                instance_id,
                path,
                index,
                delete_count,
                items,
                ..
            } => {
                splice_path(&mut self.instance_mut(instance_id).values, &path, index, delete_count, items);
                self.focus_single(instance_id);
            }
            AppMessage::Action {
                instance_id, name, args, ..
            } => {
                self.instance_mut(instance_id)
                    .action_executions
                    .entry(name)
                    .or_insert_with(Vector::new)
                    .push_front(ActionExecution { args, time: Utc::now() });
            }
        }
    }
}

/// Port a link attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    /// Top of the owning class
    Input,
    /// Bottom of the dependency source
    Output,
}

/// Link endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEnd {
    /// Node the link attaches to
    pub node_id: ClassId,
    /// Port on that node
    pub port: Port,
}

/// Injection edge drawn from the source's output to the owner's input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// `{owner}_{source}_{property}`
    pub id: String,
    /// Dependency source
    pub from: LinkEnd,
    /// Owning class
    pub to: LinkEnd,
}

impl Link {
    /// Link for an injector declared on `owner`
    #[must_use]
    pub fn injection(owner: &str, injector: &Injector) -> Self {
        Self {
            id: link_id(owner, &injector.class_id, &injector.property_name),
            from: LinkEnd {
                node_id: injector.class_id.clone(),
                port: Port::Output,
            },
            to: LinkEnd {
                node_id: owner.to_string(),
                port: Port::Input,
            },
        }
    }

    /// Check if either end attaches to `class_id`
    #[inline]
    #[must_use]
    pub fn touches(&self, class_id: &str) -> bool {
        self.from.node_id == class_id || self.to.node_id == class_id
    }
}

/// Id of the link for `owner.property` injecting `source`
#[must_use]
pub fn link_id(owner: &str, source: &str, property_name: &str) -> String {
    format!("{owner}_{source}_{property_name}")
}

/// The editor's view of the project
#[derive(Debug, Clone, PartialEq)]
pub struct GraphModel {
    status: BackendStatus,
    nodes: OrdMap<ClassId, ClassNode>,
    links: OrdMap<String, Link>,
    selected: Option<ClassId>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self {
            status: BackendStatus::Pending,
            nodes: OrdMap::new(),
            links: OrdMap::new(),
            selected: None,
        }
    }
}

impl GraphModel {
    /// Empty graph with pending backend status
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend status from the last `init`
    #[inline]
    #[must_use]
    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    /// Every node
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &OrdMap<ClassId, ClassNode> {
        &self.nodes
    }

    /// Node by class id
    #[must_use]
    pub fn node(&self, class_id: &str) -> Option<&ClassNode> {
        self.nodes.get(class_id)
    }

    /// Every link
    #[inline]
    #[must_use]
    pub fn links(&self) -> &OrdMap<String, Link> {
        &self.links
    }

    /// Link by id
    #[must_use]
    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    /// Selected node
    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Instance state by owner and id
    #[must_use]
    pub fn instance(&self, class_id: &str, instance_id: InstanceId) -> Option<&InstanceState> {
        self.nodes.get(class_id)?.instances.get(&instance_id)
    }

    /// Apply one backend event
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Init(status) => self.status = status,
            Event::Disconnect => self.disconnect(),
            Event::Classes(classes) => self.load(classes),
            Event::ClassNew(extracted) => self.class_new(extracted),
            Event::ClassUpdate(class) => self.class_update(class),
            Event::ClassDelete(class_id) => self.remove_class(&class_id),
            Event::App(message) => self.apply_app(message),
        }
    }

    fn disconnect(&mut self) {
        let ids: Vec<ClassId> = self.nodes.keys().cloned().collect();
        for id in ids {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.clear_instances();
            }
        }
    }

    fn load(&mut self, classes: BTreeMap<ClassId, Class>) {
        let nodes: OrdMap<ClassId, ClassNode> = classes
            .into_iter()
            .map(|(class_id, class)| (class_id, ClassNode::new(class)))
            .collect();

        let mut links = OrdMap::new();
        for node in nodes.values() {
            for injector in &node.class.extracted.injectors {
                if nodes.contains_key(&injector.class_id) {
                    let link = Link::injection(node.class_id(), injector);
                    links.insert(link.id.clone(), link);
                }
            }
        }

        if self.selected.as_ref().is_some_and(|id| !nodes.contains_key(id)) {
            self.selected = None;
        }
        tracing::debug!(nodes = nodes.len(), links = links.len(), "loaded class snapshot");
        self.nodes = nodes;
        self.links = links;
    }

    fn class_new(&mut self, extracted: ExtractedClass) {
        let class_id = extracted.class_id.clone();
        match self.nodes.get_mut(&class_id) {
            Some(node) => node.class.extracted = extracted,
            None => {
                let class = Class::new(extracted, ClassMetadata::default());
                self.nodes.insert(class_id.clone(), ClassNode::new(class));
            }
        }
        self.link_class(&class_id);
    }

    fn class_update(&mut self, class: Class) {
        let class_id = class.class_id().to_string();
        match self.nodes.get_mut(&class_id) {
            Some(node) => node.class = class,
            None => {
                self.nodes.insert(class_id.clone(), ClassNode::new(class));
            }
        }
        self.link_class(&class_id);
    }

    /// Add missing links into and out of `class_id`; existing links stay
    fn link_class(&mut self, class_id: &str) {
        let mut candidates = Vec::new();
        for node in self.nodes.values() {
            for injector in &node.class.extracted.injectors {
                let outgoing = node.class_id() == class_id && self.nodes.contains_key(&injector.class_id);
                let incoming = injector.class_id == class_id;
                if outgoing || incoming {
                    candidates.push(Link::injection(node.class_id(), injector));
                }
            }
        }
        for link in candidates {
            if !self.links.contains_key(&link.id) {
                self.links.insert(link.id.clone(), link);
            }
        }
    }

    fn remove_class(&mut self, class_id: &str) {
        self.nodes.remove(class_id);
        let touching: Vec<String> = self
            .links
            .values()
            .filter(|link| link.touches(class_id))
            .map(|link| link.id.clone())
            .collect();
        for id in touching {
            self.links.remove(&id);
        }
        if self.selected.as_deref() == Some(class_id) {
            self.selected = None;
        }
    }

    fn apply_app(&mut self, message: AppMessage) {
        match self.nodes.get_mut(message.class_id()) {
            Some(node) => node.apply(message),
            None => tracing::debug!(class_id = %message.class_id(), "runtime message for unknown class"),
        }
    }

    /// Add a node for a class about to be created
    ///
    /// The node is selected and keeps its position when the backend later
    /// reports the class.
    ///
    /// # Errors
    /// Returns [`ClientError::ClassExists`] if the id is taken
    pub fn insert_placeholder(&mut self, class_id: &str, metadata: ClassMetadata) -> ClientResult<()> {
        if self.nodes.contains_key(class_id) {
            return Err(ClientError::ClassExists(class_id.to_string()));
        }
        let class = Class::new(ExtractedClass::new(class_id), metadata);
        self.nodes.insert(class_id.to_string(), ClassNode::new(class));
        self.selected = Some(class_id.to_string());
        Ok(())
    }

    /// Move a node
    ///
    /// # Errors
    /// Returns [`ClientError::UnknownClass`] if the node is missing
    pub fn move_class(&mut self, class_id: &str, metadata: ClassMetadata) -> ClientResult<()> {
        let node = self
            .nodes
            .get_mut(class_id)
            .ok_or_else(|| ClientError::UnknownClass(class_id.to_string()))?;
        node.class.x = metadata.x;
        node.class.y = metadata.y;
        Ok(())
    }

    /// Drop every link from `from` into `to`, returning how many were removed
    pub fn remove_links(&mut self, from: &str, to: &str) -> usize {
        let matching: Vec<String> = self
            .links
            .values()
            .filter(|link| link.from.node_id == from && link.to.node_id == to)
            .map(|link| link.id.clone())
            .collect();
        for id in &matching {
            self.links.remove(id);
        }
        matching.len()
    }

    /// Show `instance_id` in the inspector and select its node
    ///
    /// # Errors
    /// Returns [`ClientError::UnknownClass`] if the node is missing
    pub fn select_instance(&mut self, class_id: &str, instance_id: InstanceId) -> ClientResult<()> {
        let node = self
            .nodes
            .get_mut(class_id)
            .ok_or_else(|| ClientError::UnknownClass(class_id.to_string()))?;
        node.current_instance_id = Some(instance_id);
        self.selected = Some(class_id.to_string());
        Ok(())
    }

    /// Select a node, focusing its first instance if none is focused
    ///
    /// # Errors
    /// Returns [`ClientError::UnknownClass`] if the node is missing
    pub fn select_class(&mut self, class_id: &str) -> ClientResult<()> {
        let node = self
            .nodes
            .get_mut(class_id)
            .ok_or_else(|| ClientError::UnknownClass(class_id.to_string()))?;
        if node.current_instance_id.is_none() {
            node.current_instance_id = node.instances.keys().next().copied();
        }
        self.selected = Some(class_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rapp_protocol::InjectorKind;
    use serde_json::json;

    fn class(id: &str, sources: &[&str]) -> Class {
        let mut extracted = ExtractedClass::new(id);
        for source in sources {
            extracted.injectors.push(Injector::new(
                *source,
                InjectorKind::Inject.property_name(source),
                InjectorKind::Inject,
            ));
        }
        Class::new(extracted, ClassMetadata::new(10.0, 20.0))
    }

    fn graph(classes: &[Class]) -> GraphModel {
        let mut model = GraphModel::new();
        model.apply(Event::Classes(
            classes.iter().map(|c| (c.class_id().to_string(), c.clone())).collect(),
        ));
        model
    }

    fn update(class_id: &str, instance_id: InstanceId, key: &str, value: Value) -> Event {
        Event::App(AppMessage::Update {
            class_id: class_id.into(),
            instance_id,
            path: vec![key.into()],
            value,
        })
    }

    #[test]
    fn snapshot_links_only_present_sources() {
        let model = graph(&[class("A", &[]), class("B", &["A", "Missing"])]);
        assert_eq!(model.links().len(), 1);
        let link = model.link("B_A_a").unwrap();
        assert_eq!(link.from, LinkEnd { node_id: "A".into(), port: Port::Output });
        assert_eq!(link.to, LinkEnd { node_id: "B".into(), port: Port::Input });
    }

    #[test]
    fn update_creates_instance_and_focuses_it() {
        let mut model = graph(&[class("A", &[])]);
        model.apply(update("A", 1, "count", json!(5)));

        let node = model.node("A").unwrap();
        assert_eq!(node.current_instance_id, Some(1));
        assert_eq!(node.instances[&1_u64].values, json!({ "count": 5 }));
    }

    #[test]
    fn oversized_array_index_leaves_values_untouched() {
        let mut model = graph(&[class("A", &[])]);
        model.apply(update("A", 1, "items", json!([1])));
        model.apply(Event::App(AppMessage::Update {
            class_id: "A".into(),
            instance_id: 1,
            path: vec!["items".into(), "18446744073709551615".into()],
            value: json!(2),
        }));
        model.apply(Event::App(AppMessage::Splice {
            class_id: "A".into(),
            instance_id: 1,
            path: vec!["items".into(), "1000000000000".into()],
            index: 0,
            delete_count: 0,
            items: vec![json!(3)],
        }));

        assert_eq!(model.node("A").unwrap().instances[&1_u64].values, json!({ "items": [1] }));
    }

    #[test]
    fn focus_stays_once_several_instances_exist() {
        let mut model = graph(&[class("A", &[])]);
        model.apply(update("A", 1, "count", json!(1)));
        model.apply(update("A", 2, "count", json!(2)));
        model.apply(update("A", 2, "count", json!(3)));
        assert_eq!(model.node("A").unwrap().current_instance_id, Some(1));
    }

    #[test]
    fn injections_append_and_actions_prepend() {
        let mut model = graph(&[class("A", &[]), class("B", &["A"])]);
        for inject_instance_id in [1, 2] {
            model.apply(Event::App(AppMessage::Injection {
                class_id: "B".into(),
                instance_id: 3,
                property_name: "a".into(),
                inject_class_id: "A".into(),
                inject_instance_id,
            }));
        }
        for arg in ["first", "second"] {
            model.apply(Event::App(AppMessage::Action {
                class_id: "B".into(),
                instance_id: 3,
                name: "run".into(),
                args: vec![json!(arg)],
            }));
        }

        let instance = model.instance("B", 3).unwrap();
        assert_eq!(instance.injections["a"], Vector::from(vec![1, 2]));
        let args: Vec<&Value> = instance.action_executions["run"].iter().map(|e| &e.args[0]).collect();
        assert_eq!(args, vec![&json!("second"), &json!("first")]);
    }

    #[test]
    fn disconnect_clears_instances_only() {
        let mut model = graph(&[class("A", &[]), class("B", &["A"])]);
        model.apply(update("A", 1, "count", json!(5)));
        model.apply(Event::Disconnect);

        let node = model.node("A").unwrap();
        assert!(node.instances.is_empty());
        assert_eq!(node.current_instance_id, None);
        assert_eq!(model.nodes().len(), 2);
        assert_eq!(model.links().len(), 1);
    }

    #[test]
    fn class_update_adds_links_without_removing_others() {
        let mut model = graph(&[class("A", &[]), class("C", &[]), class("B", &["A"])]);
        model.apply(Event::ClassUpdate(class("B", &["C"])));

        assert!(model.link("B_A_a").is_some());
        assert!(model.link("B_C_c").is_some());
        assert_eq!(model.node("B").unwrap().class.extracted.injectors.len(), 1);
    }

    #[test]
    fn class_new_links_waiting_dependents() {
        let mut model = graph(&[class("B", &["A"])]);
        assert!(model.links().is_empty());

        model.apply(Event::ClassNew(ExtractedClass::new("A")));
        assert!(model.link("B_A_a").is_some());
        assert_eq!(model.node("A").unwrap().class.metadata(), ClassMetadata::default());
    }

    #[test]
    fn class_new_keeps_placeholder_position() {
        let mut model = GraphModel::new();
        model.insert_placeholder("A", ClassMetadata::new(40.0, 50.0)).unwrap();
        model.apply(Event::ClassNew(ExtractedClass::new("A")));
        assert_eq!(model.node("A").unwrap().class.metadata(), ClassMetadata::new(40.0, 50.0));
        assert_eq!(model.selected(), Some("A"));
    }

    #[test]
    fn class_delete_removes_node_links_and_selection() {
        let mut model = graph(&[class("A", &[]), class("B", &["A"]), class("C", &["B"])]);
        model.select_class("A").unwrap();
        model.apply(Event::ClassDelete("A".into()));

        assert!(model.node("A").is_none());
        assert!(model.link("B_A_a").is_none());
        assert!(model.link("C_B_b").is_some());
        assert_eq!(model.selected(), None);
    }

    #[test]
    fn runtime_messages_for_unknown_classes_are_dropped() {
        let mut model = graph(&[class("A", &[])]);
        let before = model.clone();
        model.apply(update("Ghost", 1, "count", json!(1)));
        assert_eq!(model, before);
    }

    #[test]
    fn placeholder_refuses_taken_ids() {
        let mut model = graph(&[class("A", &[])]);
        assert!(matches!(
            model.insert_placeholder("A", ClassMetadata::default()),
            Err(ClientError::ClassExists(id)) if id == "A"
        ));
    }

    #[test]
    fn select_instance_focuses_and_selects() {
        let mut model = graph(&[class("A", &[]), class("B", &[])]);
        model.apply(update("A", 4, "count", json!(1)));
        model.apply(update("A", 2, "count", json!(1)));
        assert_eq!(model.node("A").unwrap().current_instance_id, Some(4));

        model.select_instance("A", 2).unwrap();
        assert_eq!(model.node("A").unwrap().current_instance_id, Some(2));
        assert_eq!(model.selected(), Some("A"));

        model.select_class("B").unwrap();
        assert_eq!(model.node("B").unwrap().current_instance_id, None);
        assert_eq!(model.selected(), Some("B"));
        assert!(model.select_class("Ghost").is_err());
    }
}
