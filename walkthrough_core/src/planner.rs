//! Planner facade - room graph in, walk plan out.
//!
//! Planning is total: an empty graph, or an explicit entry id that is
//! not in the graph, produces an empty plan rather than an error.

use crate::discovery::{discover, SpanningForest};
use crate::entry::{select_entry, EntryReason};
use crate::graph::RoomGraph;
use crate::route::{build_route, sorted_children};
use crate::waypoints::{build_waypoints, Waypoint, WaypointSettings};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use walkthrough_env::RoomId;

/// Outside glide distance when neither the options nor the graph set one.
pub const DEFAULT_ENTRY_GLIDE: f64 = 2.8;

/// Planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    /// Explicit entry room
    pub entry_id: Option<RoomId>,

    /// Planar anchor hint, overrides the graph's own anchor
    pub anchor: Option<[f64; 2]>,

    /// Planar scale applied to room centers
    pub xy_scale: f64,

    /// Vertical distance per floor
    pub level_rise: f64,

    /// Camera height above the floor
    pub eye_height: f64,

    /// Runway distance before and after room centers
    pub pad: f64,

    /// Corner rounding strength
    pub bend: f64,

    /// Outside glide distance
    pub entry_glide: Option<f64>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            entry_id: None,
            anchor: None,
            xy_scale: 1.0,
            level_rise: 3.0,
            eye_height: 1.6,
            pad: 0.9,
            bend: 0.55,
            entry_glide: None,
        }
    }
}

impl PlanOptions {
    /// Glide distance: options, then the graph override, then the default.
    pub fn resolve_glide(&self, graph: &RoomGraph) -> f64 {
        self.entry_glide
            .filter(|g| g.is_finite())
            .or(graph.entry_glide())
            .unwrap_or(DEFAULT_ENTRY_GLIDE)
    }

    fn settings(&self, graph: &RoomGraph) -> WaypointSettings {
        let or = |v: f64, d: f64| if v.is_finite() { v } else { d };
        let defaults = PlanOptions::default();
        WaypointSettings {
            xy_scale: or(self.xy_scale, defaults.xy_scale),
            level_rise: or(self.level_rise, defaults.level_rise),
            eye_height: or(self.eye_height, defaults.eye_height),
            pad: or(self.pad, defaults.pad),
            bend: or(self.bend, defaults.bend),
            glide: self.resolve_glide(graph),
        }
    }
}

/// Result of [`plan`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkPlan {
    /// Selected entry room
    pub entry: Option<RoomId>,

    /// How the entry was chosen (`None` when given explicitly)
    pub entry_reason: Option<EntryReason>,

    /// Curve control points, tagged
    pub waypoints: Vec<Waypoint>,

    /// First-visit order, floor-grouped
    pub order: Vec<RoomId>,

    /// Edge-faithful visiting sequence including backtracks
    pub route: Vec<RoomId>,

    /// Eye-height first-arrival center per room on the route
    pub centers: BTreeMap<RoomId, Vector3<f64>>,

    /// Spanning-forest parent per room
    pub parents: BTreeMap<RoomId, Option<RoomId>>,

    /// Walks of components unreachable from the entry, one per extra root
    pub detached: Vec<Vec<RoomId>>,

    #[serde(skip)]
    pub forest: SpanningForest,
}

impl WalkPlan {
    /// Bare control points for the curve.
    pub fn points(&self) -> Vec<Vector3<f64>> {
        self.waypoints.iter().map(|w| w.position).collect()
    }

    /// True if there is nothing to walk.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Plans an edge-faithful walkthrough of `graph`.
pub fn plan(graph: &RoomGraph, options: &PlanOptions) -> WalkPlan {
    if graph.is_empty() {
        debug!("Empty graph, nothing to plan");
        return WalkPlan::default();
    }

    let (entry, entry_reason) = match &options.entry_id {
        Some(id) => match graph.index_of(id) {
            Some(idx) => (idx, None),
            None => {
                warn!("Entry {} is not in the graph", id);
                return WalkPlan::default();
            }
        },
        None => match select_entry(graph, options.anchor) {
            Some(choice) => (choice.index, Some(choice.reason)),
            None => (0, None),
        },
    };
    debug!("Entry {} ({:?})", graph.node(entry).id, entry_reason);

    let discovery = discover(graph, entry);
    let centroids = graph.floor_centroids(&discovery.order);
    let kids = sorted_children(graph, &discovery.forest, &centroids);
    let route = build_route(&kids, entry);
    debug!(
        "Discovered {} rooms, route has {} steps",
        discovery.order.len(),
        route.len()
    );

    let settings = options.settings(graph);
    let path = build_waypoints(graph, &route, &centroids, &settings);

    let ids = |v: &[usize]| -> Vec<RoomId> {
        v.iter().map(|&i| graph.node(i).id.clone()).collect()
    };

    let detached: Vec<Vec<RoomId>> = discovery
        .forest
        .roots()
        .iter()
        .skip(1)
        .map(|&root| ids(&build_route(&kids, root)))
        .collect();
    if !detached.is_empty() {
        debug!("{} detached component(s) left off the route", detached.len());
    }

    WalkPlan {
        entry: Some(graph.node(entry).id.clone()),
        entry_reason,
        waypoints: path.waypoints,
        order: ids(&discovery.order),
        route: ids(&route),
        centers: path.centers,
        parents: discovery.forest.to_parent_map(graph),
        detached,
        forest: discovery.forest,
    }
}
