//! Grouping tree: an arena of `TestGroup` nodes owning result values.
//!
//! Groups and values live in two vectors and refer to each other by index.
//! A value's `parent` is a plain index back into the group arena; it is only
//! used to resolve display paths and is never an ownership edge.

use super::value::{MetricKey, MetricRow, ResultValue, ValueRole};
use crate::error::{MapError, MapResult};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(usize);

/// A child entry of a group, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Group(GroupId),
    Value(ValueId),
}

#[derive(Debug, Clone)]
pub struct TestGroup {
    name: String,
    parent: Option<GroupId>,
    children: Vec<Node>,
    by_name: HashMap<String, Node>,
}

impl TestGroup {
    fn new(name: String, parent: Option<GroupId>) -> Self {
        Self { name, parent, children: Vec::new(), by_name: HashMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct ResultTree {
    groups: Vec<TestGroup>,
    values: Vec<ResultValue>,
}

impl Default for ResultTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultTree {
    /// Create an empty tree holding only the unnamed root group.
    pub fn new() -> Self {
        Self { groups: vec![TestGroup::new(String::new(), None)], values: Vec::new() }
    }

    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    pub fn group(&self, id: GroupId) -> &TestGroup {
        &self.groups[id.0]
    }

    pub fn value(&self, id: ValueId) -> &ResultValue {
        &self.values[id.0]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut ResultValue {
        &mut self.values[id.0]
    }

    pub fn child(&self, parent: GroupId, name: &str) -> Option<Node> {
        self.groups[parent.0].by_name.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.groups[0].children.is_empty()
    }

    /// Add a new child group; names are unique per level.
    pub fn add_group(&mut self, parent: GroupId, name: impl Into<String>) -> MapResult<GroupId> {
        let name = name.into();
        if self.child(parent, &name).is_some() {
            return Err(MapError::validation(self.child_path(parent, &name), "duplicate entry in group"));
        }
        let id = GroupId(self.groups.len());
        self.groups.push(TestGroup::new(name.clone(), Some(parent)));
        self.attach(parent, name, Node::Group(id));
        Ok(id)
    }

    /// Return the named child group, creating it when absent.
    pub fn group_entry(&mut self, parent: GroupId, name: &str) -> MapResult<GroupId> {
        match self.child(parent, name) {
            Some(Node::Group(id)) => Ok(id),
            Some(Node::Value(_)) => {
                Err(MapError::validation(self.child_path(parent, name), "name is already used by a value"))
            }
            None => self.add_group(parent, name),
        }
    }

    /// Insert a value under `parent`, fixing its back-reference and group label.
    pub fn add_value(&mut self, parent: GroupId, mut value: ResultValue) -> MapResult<ValueId> {
        if self.child(parent, &value.name).is_some() {
            return Err(MapError::validation(self.child_path(parent, &value.name), "duplicate entry in group"));
        }
        value.parent = Some(parent);
        if value.group.is_none() && parent != self.root() {
            value.group = Some(self.groups[parent.0].name.clone());
        }
        let id = ValueId(self.values.len());
        let name = value.name.clone();
        self.values.push(value);
        self.attach(parent, name, Node::Value(id));
        Ok(id)
    }

    fn attach(&mut self, parent: GroupId, name: String, node: Node) {
        let group = &mut self.groups[parent.0];
        group.children.push(node);
        group.by_name.insert(name, node);
    }

    /// Group names from just below the root down to `id`.
    pub fn group_path(&self, id: GroupId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(gid) = current {
            let group = &self.groups[gid.0];
            if group.parent.is_some() {
                path.push(group.name.as_str());
            }
            current = group.parent;
        }
        path.reverse();
        path
    }

    /// Slash-joined display path of a value.
    pub fn value_path(&self, id: ValueId) -> String {
        let value = &self.values[id.0];
        let mut path = value.parent.map(|p| self.group_path(p)).unwrap_or_default();
        path.push(value.name.as_str());
        path.join("/")
    }

    fn child_path(&self, parent: GroupId, name: &str) -> String {
        let mut path = self.group_path(parent);
        path.push(name);
        path.join("/")
    }

    /// All values in depth-first document order.
    pub fn values(&self) -> Vec<(ValueId, &ResultValue)> {
        let mut out = Vec::with_capacity(self.values.len());
        self.collect_values(self.root(), &mut out);
        out
    }

    fn collect_values<'a>(&'a self, id: GroupId, out: &mut Vec<(ValueId, &'a ResultValue)>) {
        for node in &self.groups[id.0].children {
            match node {
                Node::Value(vid) => out.push((*vid, &self.values[vid.0])),
                Node::Group(gid) => self.collect_values(*gid, out),
            }
        }
    }

    pub fn number_of_results(&self) -> usize {
        self.values.iter().filter(|v| v.role == ValueRole::Result).count()
    }

    pub fn number_of_parameters(&self) -> usize {
        self.values.iter().filter(|v| v.role == ValueRole::Parameter).count()
    }

    /// Flatten into metric rows keyed by `file`, the group path and the value name.
    pub fn rows(&self, file: &str) -> Vec<MetricRow> {
        self.values()
            .into_iter()
            .map(|(_, value)| {
                let group = value.parent.map(|p| self.group_path(p).join("/")).unwrap_or_default();
                MetricRow { key: MetricKey::new(file, group, value.name.clone()), value: value.clone() }
            })
            .collect()
    }

    /// Copy every node of `other` beneath `parent`, merging same-named groups.
    pub fn graft(&mut self, parent: GroupId, other: &ResultTree) -> MapResult<()> {
        self.graft_group(parent, other, other.root())
    }

    fn graft_group(&mut self, target: GroupId, other: &ResultTree, source: GroupId) -> MapResult<()> {
        for node in &other.groups[source.0].children {
            match node {
                Node::Group(gid) => {
                    let name = other.groups[gid.0].name.clone();
                    let child = self.group_entry(target, &name)?;
                    self.graft_group(child, other, *gid)?;
                }
                Node::Value(vid) => {
                    let mut value = other.values[vid.0].clone();
                    value.parent = None;
                    self.add_value(target, value)?;
                }
            }
        }
        Ok(())
    }
}
