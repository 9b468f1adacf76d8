//! Service reference graph.
//!
//! Nodes are service ids, edges are references from one definition to another. Each
//! edge records whether the target is needed to construct the source, only to set it
//! up afterwards (properties, method calls), or lazily (closures, iterators). Cycle
//! detection only follows construction edges; reachability follows all of them.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::container::ContainerBuilder;
use crate::definition::{Definition, InvalidBehavior, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Needed by the constructor or factory.
    Construction,
    /// Injected after construction.
    Setup,
    /// Wrapped in a closure or iterator, or ignored when missing.
    Lazy,
}

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Debug, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<String, EdgeKind>,
    node_map: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of every definition in `container`. Alias references are followed to
    /// their definition; references to unknown ids still get a node.
    pub fn build(container: &ContainerBuilder) -> Self {
        let mut graph = Self::new();
        for (id, definition) in container.definitions() {
            graph.ensure_node(id);
            let mut edges = Vec::new();
            collect_definition(definition, EdgeKind::Construction, &mut edges);
            for (target, kind) in edges {
                let target = container.resolve_alias_target(&target).unwrap_or(target);
                graph.add_reference(id, &target, kind);
            }
        }
        graph
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(id) {
            index
        } else {
            let index = self.graph.add_node(id.to_string());
            self.node_map.insert(id.to_string(), index);
            index
        }
    }

    /// Record that `from` references `to`. The strongest kind wins when both are
    /// already connected.
    pub fn add_reference(&mut self, from: &str, to: &str, kind: EdgeKind) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        match self.graph.find_edge(from_idx, to_idx) {
            Some(edge) => {
                let current = self.graph[edge];
                if strength(kind) > strength(current) {
                    self.graph[edge] = kind;
                }
            }
            None => {
                self.graph.add_edge(from_idx, to_idx, kind);
            }
        }
    }

    /// The first construction cycle found, as ids ending with the id it started from.
    pub fn detect_cycles(&self) -> Option<Vec<String>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|node| (node, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                return Some(cycle.into_iter().map(|idx| self.graph[idx].clone()).collect());
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.construction_targets(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Construction targets in the order the references were added.
    fn construction_targets(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges(node)
            .filter(|edge| *edge.weight() == EdgeKind::Construction)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Every id reachable from `roots` through any kind of edge, roots included.
    pub fn reachable_from<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if let Some(&index) = self.node_map.get(root)
                && seen.insert(index)
            {
                queue.push_back(index);
            }
        }

        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.neighbors(current) {
                if seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        seen.into_iter().map(|index| self.graph[index].clone()).collect()
    }

    /// Ids referencing `id` directly.
    pub fn referenced_by(&self, id: &str) -> Vec<String> {
        let Some(&index) = self.node_map.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(index, petgraph::Direction::Incoming)
            .map(|source| self.graph[source].clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

fn strength(kind: EdgeKind) -> u8 {
    match kind {
        EdgeKind::Lazy => 0,
        EdgeKind::Setup => 1,
        EdgeKind::Construction => 2,
    }
}

fn collect_definition(definition: &Definition, kind: EdgeKind, edges: &mut Vec<(String, EdgeKind)>) {
    for value in definition.arguments.values() {
        collect_value(value, kind, edges);
    }
    if let Some(reference) = definition.factory.as_ref().and_then(|f| f.service.as_ref()) {
        edges.push((reference.id.clone(), kind));
    }

    let setup = if kind == EdgeKind::Lazy { EdgeKind::Lazy } else { EdgeKind::Setup };
    for value in definition.properties.values() {
        collect_value(value, setup, edges);
    }
    for call in &definition.calls {
        for value in call.arguments.values() {
            collect_value(value, setup, edges);
        }
    }
}

fn collect_value(value: &Value, kind: EdgeKind, edges: &mut Vec<(String, EdgeKind)>) {
    match value {
        Value::Reference(reference) => {
            let kind = if reference.invalid_behavior == InvalidBehavior::Ignore {
                EdgeKind::Lazy
            } else {
                kind
            };
            edges.push((reference.id.clone(), kind));
        }
        Value::List(items) => items.iter().for_each(|item| collect_value(item, kind, edges)),
        Value::Map(entries) => entries.values().for_each(|item| collect_value(item, kind, edges)),
        Value::ServiceClosure(inner) => collect_value(inner, EdgeKind::Lazy, edges),
        Value::Iterator(items) => items.iter().for_each(|item| collect_value(item, EdgeKind::Lazy, edges)),
        Value::Inline(definition) => collect_definition(definition, kind, edges),
        _ => {}
    }
}
