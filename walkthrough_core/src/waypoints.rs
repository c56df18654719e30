//! Waypoint construction - route to eye-height 3D control points.
//!
//! Layout per room along the route:
//!
//! ```text
//!   entry:          glide ─► center ─► post
//!   first arrival:  pre ─► (bend) ─► center ─► post
//!   revisit:        center
//! ```
//!
//! Directions are horizontal only; the vertical component comes from
//! the floor heights of the two rooms involved.

use crate::graph::RoomGraph;
use nalgebra::Vector3;
use serde::Serialize;
use std::collections::BTreeMap;
use walkthrough_env::RoomId;

/// Squared lengths at or below this count as zero.
const DEGENERATE_SQ: f64 = 1e-6;

/// Role of a waypoint in the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    /// Outside approach point before the entry
    Glide,
    /// Runway point before or after a room center
    Pad,
    /// Rounded-corner point between the inbound and outbound legs
    Bend,
    /// Center of a room on its first visit; room events sit here
    FirstArrival,
    /// Center of a room passed again while backtracking
    Revisit,
}

/// A control point of the walkthrough curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub position: Vector3<f64>,
    pub kind: WaypointKind,
    /// Room this point belongs to (`None` for the glide)
    pub room: Option<RoomId>,
}

/// Geometry parameters for waypoint placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointSettings {
    pub xy_scale: f64,
    pub level_rise: f64,
    pub eye_height: f64,
    pub pad: f64,
    pub bend: f64,
    pub glide: f64,
}

/// Eye-height 3D center of a room.
pub fn eye_center(graph: &RoomGraph, idx: usize, s: &WaypointSettings) -> Vector3<f64> {
    let node = graph.node(idx);
    Vector3::new(
        node.center[0] * s.xy_scale,
        node.floor as f64 * s.level_rise + s.eye_height,
        node.center[1] * s.xy_scale,
    )
}

/// Normalized horizontal direction from `from` to `to`, if any.
fn planar_dir(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Vector3<f64>> {
    let d = Vector3::new(to.x - from.x, 0.0, to.z - from.z);
    if d.norm_squared() <= DEGENERATE_SQ {
        None
    } else {
        Some(d.normalize())
    }
}

/// Direction pointing from the entry's surroundings out of the building.
fn glide_direction(
    graph: &RoomGraph,
    entry: usize,
    centroids: &BTreeMap<i32, [f64; 2]>,
    s: &WaypointSettings,
) -> Vector3<f64> {
    let c = eye_center(graph, entry, s);
    let neighbors = graph.neighbors(entry);

    let away = if neighbors.is_empty() {
        match centroids.get(&graph.floor_of(entry)) {
            Some([x, z]) => Vector3::new(c.x - x * s.xy_scale, 0.0, c.z - z * s.xy_scale),
            None => Vector3::zeros(),
        }
    } else {
        let sum = neighbors
            .iter()
            .fold(Vector3::zeros(), |acc, &n| acc + eye_center(graph, n, s));
        let avg = sum / neighbors.len() as f64;
        Vector3::new(c.x - avg.x, 0.0, c.z - avg.z)
    };

    if away.norm_squared() < DEGENERATE_SQ {
        Vector3::x()
    } else {
        away.normalize()
    }
}

/// Corner point between an inbound and outbound leg.
fn bend_point(
    c: &Vector3<f64>,
    dir_in: &Vector3<f64>,
    dir_out: &Vector3<f64>,
    bend: f64,
) -> Option<Vector3<f64>> {
    let bisector = dir_out - dir_in;
    if bisector.norm_squared() <= DEGENERATE_SQ {
        // straight pass, no corner to round
        return None;
    }
    Some(c + bisector.normalize() * bend)
}

/// Output of [`build_waypoints`].
#[derive(Debug, Clone, Default)]
pub struct WaypointPath {
    pub waypoints: Vec<Waypoint>,
    /// Exact first-arrival center per room
    pub centers: BTreeMap<RoomId, Vector3<f64>>,
}

/// Converts a route (room indices, entry first) into control points.
///
/// Consecutive duplicates in the route are zero-length steps and emit
/// nothing. Inbound and outbound directions are taken from the nearest
/// distinct room before and after; when one side is missing (or the
/// rooms are stacked vertically) the other side's direction is used,
/// and +x when both are missing.
pub fn build_waypoints(
    graph: &RoomGraph,
    route: &[usize],
    centroids: &BTreeMap<i32, [f64; 2]>,
    s: &WaypointSettings,
) -> WaypointPath {
    let mut path = WaypointPath::default();
    let Some(&entry) = route.first() else {
        return path;
    };

    let entry_c = eye_center(graph, entry, s);
    let out = glide_direction(graph, entry, centroids, s);
    path.waypoints.push(Waypoint {
        position: entry_c + out * s.glide,
        kind: WaypointKind::Glide,
        room: None,
    });

    let mut visited = vec![false; graph.len()];

    for (i, &room) in route.iter().enumerate() {
        if i > 0 && route[i - 1] == room {
            continue;
        }
        let c = eye_center(graph, room, s);
        let id = graph.node(room).id.clone();

        if visited[room] {
            path.waypoints.push(Waypoint {
                position: c,
                kind: WaypointKind::Revisit,
                room: Some(id),
            });
            continue;
        }
        visited[room] = true;
        path.centers.insert(id.clone(), c);

        let prev = route[..i].iter().rev().find(|&&r| r != room);
        let next = route[i + 1..].iter().find(|&&r| r != room);
        let dir_in = prev.and_then(|&p| planar_dir(&eye_center(graph, p, s), &c));
        let dir_out = next.and_then(|&n| planar_dir(&c, &eye_center(graph, n, s)));

        let mut push = |position: Vector3<f64>, kind: WaypointKind| {
            path.waypoints.push(Waypoint {
                position,
                kind,
                room: Some(id.clone()),
            });
        };

        if i == 0 {
            // The glide already leads in; nothing precedes the entry.
            push(c, WaypointKind::FirstArrival);
            if let Some(dout) = dir_out {
                push(c + dout * s.pad, WaypointKind::Pad);
            }
            continue;
        }

        let pre_dir = dir_in.or(dir_out).unwrap_or_else(Vector3::x);
        let post_dir = dir_out.or(dir_in).unwrap_or_else(Vector3::x);

        push(c - pre_dir * s.pad, WaypointKind::Pad);
        if let (Some(din), Some(dout)) = (&dir_in, &dir_out) {
            if let Some(b) = bend_point(&c, din, dout, s.bend) {
                push(b, WaypointKind::Bend);
            }
        }
        push(c, WaypointKind::FirstArrival);
        push(c + post_dir * s.pad, WaypointKind::Pad);
    }

    path
}
