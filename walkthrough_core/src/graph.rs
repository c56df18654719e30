//! The room graph - rooms as nodes, direct connectivity as edges.
//!
//! Graphs arrive from several exporters with slightly different field
//! names, so parsing is deliberately lenient:
//! - ids may be strings or numbers
//! - missing, non-numeric or non-finite numbers fall back to defaults
//! - edges that reference unknown rooms are dropped
//!
//! Only input that is not JSON at all (or whose top level is not an
//! object) is rejected with a [`GraphError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use thiserror::Error;
use tracing::{debug, warn};
use walkthrough_env::RoomId;

/// Default room footprint (width and depth) when the exporter omits it.
pub const DEFAULT_ROOM_SIZE: f64 = 4.0;

/// Default room height when the exporter omits it.
pub const DEFAULT_ROOM_HEIGHT: f64 = 3.0;

/// Structural failures while loading a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Input was not valid JSON (or the reader failed)
    #[error("Invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level JSON value was not an object
    #[error("Graph must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// A single room of the floor plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomNode {
    /// Unique identifier
    pub id: RoomId,

    /// Human-readable name (e.g. "Foyer")
    pub name: Option<String>,

    /// Alternative label some exporters use instead of `name`
    pub label: Option<String>,

    /// Room type (e.g. "kitchen", "bedroom")
    pub kind: Option<String>,

    /// Planar center [x, z]
    pub center: [f64; 2],

    /// Footprint [width, depth]
    pub size: [f64; 2],

    /// Ceiling height
    pub height: f64,

    /// Floor index (0 = ground)
    pub floor: i32,

    /// Explicitly flagged as the building entry
    pub is_entry: bool,

    /// Privacy classification (e.g. "semi_private")
    pub privacy_level: Option<String>,

    /// Free-text description of notable features
    pub unique_features: Option<String>,
}

impl RoomNode {
    /// Creates a room at the origin of floor 0 with default dimensions.
    pub fn new(id: impl Into<RoomId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            label: None,
            kind: None,
            center: [0.0, 0.0],
            size: [DEFAULT_ROOM_SIZE, DEFAULT_ROOM_SIZE],
            height: DEFAULT_ROOM_HEIGHT,
            floor: 0,
            is_entry: false,
            privacy_level: None,
            unique_features: None,
        }
    }

    /// Sets the planar center.
    pub fn at(mut self, x: f64, z: f64) -> Self {
        self.center = [x, z];
        self
    }

    /// Sets the floor index.
    pub fn on_floor(mut self, floor: i32) -> Self {
        self.floor = floor;
        self
    }

    /// Sets the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the footprint.
    pub fn sized(mut self, width: f64, depth: f64) -> Self {
        self.size = [width, depth];
        self
    }

    /// Marks this room as the explicit entry.
    pub fn flagged_entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    /// Text used for entry-vocabulary matching: name, else label, else id.
    pub fn match_text(&self) -> &str {
        [self.name.as_deref(), self.label.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Title shown when the camera enters the room.
    pub fn title(&self) -> &str {
        [self.name.as_deref(), self.label.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| self.id.as_str())
    }
}

/// The room graph: nodes plus bidirectional adjacency.
///
/// Rooms are addressed internally by their insertion index; neighbour
/// lists preserve edge insertion order so every traversal is
/// reproducible for a given input file.
#[derive(Debug, Clone, Default)]
pub struct RoomGraph {
    nodes: Vec<RoomNode>,
    index: HashMap<RoomId, usize>,
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,

    /// `entry_strategy.anchor_point` from the input, if any
    anchor: Option<[f64; 2]>,

    /// `walkthrough.entry_glide` from the input, if any
    entry_glide: Option<f64>,
}

impl RoomGraph {
    /// Starts a programmatic graph.
    pub fn builder() -> RoomGraphBuilder {
        RoomGraphBuilder::default()
    }

    /// Parses a graph from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Parses a graph from a reader yielding JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GraphError> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_json_value(&value)
    }

    /// Parses a graph from an already-decoded JSON value.
    pub fn from_json_value(value: &Value) -> Result<Self, GraphError> {
        let root = value
            .as_object()
            .ok_or_else(|| GraphError::NotAnObject(json_kind(value)))?;

        let mut builder = RoomGraph::builder();

        if let Some(nodes) = root.get("nodes").and_then(Value::as_array) {
            for raw in nodes {
                match parse_node(raw) {
                    Some(node) => builder = builder.room(node),
                    None => warn!("Skipping room without a usable id: {}", raw),
                }
            }
        }

        if let Some(edges) = root.get("edges").and_then(Value::as_array) {
            for raw in edges {
                let pair = raw.as_array().filter(|a| a.len() >= 2);
                let ids = pair.and_then(|a| Some((parse_id(&a[0])?, parse_id(&a[1])?)));
                match ids {
                    Some((a, b)) => builder = builder.edge(a, b),
                    None => debug!("Ignoring malformed edge: {}", raw),
                }
            }
        }

        let anchor = root
            .get("entry_strategy")
            .and_then(|s| s.get("anchor_point"))
            .and_then(Value::as_array)
            .filter(|a| a.len() >= 2)
            .and_then(|a| Some([finite(&a[0])?, finite(&a[1])?]));
        if let Some([x, z]) = anchor {
            builder = builder.anchor(x, z);
        }

        if let Some(glide) = root
            .get("walkthrough")
            .and_then(|w| w.get("entry_glide"))
            .and_then(finite)
        {
            builder = builder.entry_glide(glide);
        }

        Ok(builder.build())
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no rooms.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// All rooms in insertion order.
    pub fn nodes(&self) -> &[RoomNode] {
        &self.nodes
    }

    /// Room at an index.
    pub fn node(&self, idx: usize) -> &RoomNode {
        &self.nodes[idx]
    }

    /// Index of a room id.
    pub fn index_of(&self, id: &RoomId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Room by id.
    pub fn get(&self, id: &RoomId) -> Option<&RoomNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Neighbours of a room, in edge insertion order.
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    /// Floor index of a room.
    pub fn floor_of(&self, idx: usize) -> i32 {
        self.nodes[idx].floor
    }

    /// True if `a` and `b` are directly connected.
    pub fn has_edge(&self, a: &RoomId, b: &RoomId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(ia), Some(ib)) => self.adjacency[ia].contains(&ib),
            _ => false,
        }
    }

    /// Distinct floor indices, ascending.
    pub fn floors(&self) -> Vec<i32> {
        let mut floors: Vec<i32> = self.nodes.iter().map(|n| n.floor).collect();
        floors.sort_unstable();
        floors.dedup();
        floors
    }

    /// Anchor hint carried by the input file.
    pub fn anchor(&self) -> Option<[f64; 2]> {
        self.anchor
    }

    /// Glide distance override carried by the input file.
    pub fn entry_glide(&self) -> Option<f64> {
        self.entry_glide
    }

    /// Planar centroid per floor over the given rooms.
    pub fn floor_centroids(&self, rooms: &[usize]) -> BTreeMap<i32, [f64; 2]> {
        let mut sums: BTreeMap<i32, (f64, f64, usize)> = BTreeMap::new();
        for &idx in rooms {
            let node = &self.nodes[idx];
            let entry = sums.entry(node.floor).or_insert((0.0, 0.0, 0));
            entry.0 += node.center[0];
            entry.1 += node.center[1];
            entry.2 += 1;
        }
        sums.into_iter()
            .map(|(floor, (sx, sz, c))| {
                let c = c.max(1) as f64;
                (floor, [sx / c, sz / c])
            })
            .collect()
    }
}

/// Incremental constructor for [`RoomGraph`].
#[derive(Debug, Default)]
pub struct RoomGraphBuilder {
    graph: RoomGraph,
    pending_edges: Vec<(RoomId, RoomId)>,
}

impl RoomGraphBuilder {
    /// Adds a room. A repeated id keeps the first room.
    pub fn room(mut self, node: RoomNode) -> Self {
        if self.graph.index.contains_key(&node.id) {
            warn!("Duplicate room id {}, keeping the first definition", node.id);
            return self;
        }
        self.graph.index.insert(node.id.clone(), self.graph.nodes.len());
        self.graph.nodes.push(node);
        self.graph.adjacency.push(Vec::new());
        self
    }

    /// Adds an undirected edge. Resolved when the graph is built, so
    /// edges may be declared before their rooms.
    pub fn edge(mut self, a: impl Into<RoomId>, b: impl Into<RoomId>) -> Self {
        self.pending_edges.push((a.into(), b.into()));
        self
    }

    /// Sets the anchor hint.
    pub fn anchor(mut self, x: f64, z: f64) -> Self {
        self.graph.anchor = Some([x, z]);
        self
    }

    /// Sets the glide distance override.
    pub fn entry_glide(mut self, glide: f64) -> Self {
        self.graph.entry_glide = Some(glide);
        self
    }

    /// Resolves edges and returns the graph.
    pub fn build(self) -> RoomGraph {
        let mut graph = self.graph;
        for (a, b) in self.pending_edges {
            let (ia, ib) = match (graph.index.get(&a), graph.index.get(&b)) {
                (Some(&ia), Some(&ib)) => (ia, ib),
                _ => {
                    debug!("Dropping edge {}-{}: unknown room", a, b);
                    continue;
                }
            };
            if ia == ib || graph.adjacency[ia].contains(&ib) {
                continue;
            }
            graph.adjacency[ia].push(ib);
            graph.adjacency[ib].push(ia);
            graph.edge_count += 1;
        }
        graph
    }
}

// ========== Lenient field parsing ==========

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_id(value: &Value) -> Option<RoomId> {
    if value.is_null() {
        return None;
    }
    RoomId::deserialize(value).ok()
}

/// A finite number from a JSON number or numeric string.
fn finite(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn num_or(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(finite).unwrap_or(default)
}

/// First candidate that is present and not null.
fn first_present<'a>(candidates: &[Option<&'a Value>]) -> Option<&'a Value> {
    candidates.iter().flatten().copied().find(|v| !v.is_null())
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        _ => false,
    }
}

fn parse_node(raw: &Value) -> Option<RoomNode> {
    let obj = raw.as_object()?;
    let id = parse_id(obj.get("id")?)?;

    let center = obj.get("center").and_then(Value::as_array);
    let cx = num_or(center.and_then(|c| c.first()), 0.0);
    let cz = num_or(center.and_then(|c| c.get(1)), 0.0);

    // `width` is either a scalar or a [w, d] pair.
    let width = obj.get("width");
    let width_pair = width.and_then(Value::as_array);
    let size = obj.get("size");
    let size_pair = size.and_then(Value::as_array);
    let size_scalar = size.filter(|s| s.is_number());

    let w = num_or(
        first_present(&[
            width_pair.and_then(|a| a.first()),
            width.filter(|w| !w.is_array()),
            size_pair.and_then(|a| a.first()),
            size_scalar,
        ]),
        DEFAULT_ROOM_SIZE,
    );
    let d = num_or(
        first_present(&[
            width_pair.and_then(|a| a.get(1)),
            obj.get("depth"),
            size_pair.and_then(|a| a.get(1)),
            size_scalar,
        ]),
        DEFAULT_ROOM_SIZE,
    );
    let height = num_or(
        first_present(&[obj.get("height"), obj.get("room_height")]),
        DEFAULT_ROOM_HEIGHT,
    );
    let floor = num_or(obj.get("floor"), 0.0).round();
    let floor = floor.clamp(i32::MIN as f64, i32::MAX as f64) as i32;

    let is_entry = truthy(obj.get("is_entry")) || obj.get("entry") == Some(&Value::Bool(true));

    Some(RoomNode {
        id,
        name: text(obj.get("name")),
        label: text(obj.get("label")),
        kind: text(obj.get("type")),
        center: [cx, cz],
        size: [w, d],
        height,
        floor,
        is_entry,
        privacy_level: text(obj.get("privacy_level")),
        unique_features: text(obj.get("unique_features")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_graph() {
        let graph = RoomGraph::from_json_str(
            r#"{
                "nodes": [
                    {"id": "a", "name": "Foyer", "center": [0, 0], "floor": 0},
                    {"id": "b", "center": [4, 0], "width": [3, 5], "room_height": 2.5},
                    {"id": 7, "center": ["8", 1], "size": [2, 6], "floor": 1}
                ],
                "edges": [["a", "b"], ["b", 7], ["b", "a"], ["a", "missing"], ["a"]]
            }"#,
        )
        .unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 2);

        let b = graph.get(&RoomId::new("b")).unwrap();
        assert_eq!(b.size, [3.0, 5.0]);
        assert_eq!(b.height, 2.5);

        let seven = graph.get(&RoomId::from(7u64)).unwrap();
        assert_eq!(seven.center, [8.0, 1.0]);
        assert_eq!(seven.size, [2.0, 6.0]);
        assert_eq!(seven.floor, 1);

        assert!(graph.has_edge(&RoomId::new("a"), &RoomId::new("b")));
        assert!(graph.has_edge(&RoomId::new("7"), &RoomId::new("b")));
        assert!(!graph.has_edge(&RoomId::new("a"), &RoomId::new("7")));
    }

    #[test]
    fn test_non_finite_and_missing_fields_use_defaults() {
        let graph = RoomGraph::from_json_str(
            r#"{"nodes": [{"id": "x", "center": [null, "abc"], "height": "tall", "floor": "up"}]}"#,
        )
        .unwrap();

        let x = graph.node(0);
        assert_eq!(x.center, [0.0, 0.0]);
        assert_eq!(x.size, [DEFAULT_ROOM_SIZE, DEFAULT_ROOM_SIZE]);
        assert_eq!(x.height, DEFAULT_ROOM_HEIGHT);
        assert_eq!(x.floor, 0);
    }

    #[test]
    fn test_empty_and_nodeless_graphs() {
        assert!(RoomGraph::from_json_str("{}").unwrap().is_empty());
        assert!(RoomGraph::from_json_str(r#"{"nodes": "nope"}"#).unwrap().is_empty());
        assert!(RoomGraph::from_json_str(r#"{"nodes": [{"name": "no id"}]}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            RoomGraph::from_json_str("[1, 2]"),
            Err(GraphError::NotAnObject("an array"))
        ));
        assert!(matches!(
            RoomGraph::from_json_str("not json"),
            Err(GraphError::Json(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("a").at(1.0, 1.0))
            .room(RoomNode::new("a").at(9.0, 9.0))
            .build();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(0).center, [1.0, 1.0]);
    }

    #[test]
    fn test_anchor_and_glide_overrides() {
        let graph = RoomGraph::from_json_str(
            r#"{
                "nodes": [{"id": "a"}],
                "entry_strategy": {"anchor_point": [-3, 2.5]},
                "walkthrough": {"entry_glide": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(graph.anchor(), Some([-3.0, 2.5]));
        assert_eq!(graph.entry_glide(), Some(4.0));
    }

    #[test]
    fn test_entry_flags() {
        let graph = RoomGraph::from_json_str(
            r#"{"nodes": [
                {"id": "a", "is_entry": 1},
                {"id": "b", "entry": true},
                {"id": "c", "entry": "yes"}
            ]}"#,
        )
        .unwrap();
        assert!(graph.node(0).is_entry);
        assert!(graph.node(1).is_entry);
        assert!(!graph.node(2).is_entry);
    }

    #[test]
    fn test_neighbor_order_follows_edges() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("hub"))
            .room(RoomNode::new("x"))
            .room(RoomNode::new("y"))
            .room(RoomNode::new("z"))
            .edge("hub", "z")
            .edge("hub", "x")
            .edge("y", "hub")
            .edge("hub", "hub")
            .build();
        assert_eq!(graph.neighbors(0), &[3, 1, 2]);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_floor_centroids() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("a").at(0.0, 0.0))
            .room(RoomNode::new("b").at(4.0, 2.0))
            .room(RoomNode::new("c").at(10.0, 10.0).on_floor(1))
            .build();
        let c = graph.floor_centroids(&[0, 1, 2]);
        assert_eq!(c[&0], [2.0, 1.0]);
        assert_eq!(c[&1], [10.0, 10.0]);
        assert_eq!(graph.floors(), vec![0, 1]);
    }

    #[test]
    fn test_titles() {
        let plain = RoomNode::new("r1");
        assert_eq!(plain.title(), "r1");
        assert_eq!(plain.match_text(), "r1");

        let mut typed = RoomNode::new("r2");
        typed.kind = Some("kitchen".into());
        assert_eq!(typed.title(), "kitchen");
        assert_eq!(typed.match_text(), "r2");

        let named = RoomNode::new("r3").named("Main Entry");
        assert_eq!(named.title(), "Main Entry");
    }
}
