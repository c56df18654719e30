//! Entry selection - which room the walkthrough starts in.
//!
//! Priority, first match wins:
//! 1. a room explicitly flagged as the entry
//! 2. a room whose name matches the entry vocabulary (foyer, lobby, ...)
//! 3. the room nearest the anchor hint, biased toward the ground floor
//! 4. the ground-floor room nearest the minimum-x side (street proxy)

use crate::graph::RoomGraph;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static ENTRY_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(entry|main\s*entry|foyer|vestibule|lobby|porch|mudroom)\b")
        .expect("entry vocabulary pattern is valid")
});

/// Floor preferred when distances tie.
const PREFERRED_FLOOR: i32 = 0;

/// Squared distances closer than this are treated as ties.
const TIE_EPSILON: f64 = 1e-9;

/// Why a room was chosen as the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryReason {
    /// `is_entry` / `entry: true` on the node
    Flagged,
    /// Name or label matched the entry vocabulary
    Named,
    /// Nearest room to the anchor hint
    Anchor,
    /// Nearest ground-floor room to the minimum-x side
    StreetSide,
}

/// The selected entry room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryChoice {
    /// Room index in the graph
    pub index: usize,
    pub reason: EntryReason,
}

/// True if a room name reads like an entrance.
pub fn is_entry_name(name: &str) -> bool {
    ENTRY_VOCABULARY.is_match(&name.to_lowercase())
}

/// Picks the starting room.
///
/// `anchor` overrides the anchor stored in the graph. Returns `None`
/// only for an empty graph.
pub fn select_entry(graph: &RoomGraph, anchor: Option<[f64; 2]>) -> Option<EntryChoice> {
    if graph.is_empty() {
        return None;
    }
    let nodes = graph.nodes();

    if let Some(index) = nodes.iter().position(|n| n.is_entry) {
        return Some(EntryChoice { index, reason: EntryReason::Flagged });
    }

    if let Some(index) = nodes.iter().position(|n| is_entry_name(n.match_text())) {
        return Some(EntryChoice { index, reason: EntryReason::Named });
    }

    if let Some([ax, az]) = anchor.or(graph.anchor()) {
        let all: Vec<usize> = (0..nodes.len()).collect();
        return nearest_to(graph, &all, ax, az)
            .map(|index| EntryChoice { index, reason: EntryReason::Anchor });
    }

    let ground: Vec<usize> = (0..nodes.len())
        .filter(|&i| nodes[i].floor == PREFERRED_FLOOR)
        .collect();
    let pool = if ground.is_empty() {
        (0..nodes.len()).collect()
    } else {
        ground
    };
    let min_x = pool
        .iter()
        .map(|&i| nodes[i].center[0])
        .fold(f64::INFINITY, f64::min);

    nearest_to(graph, &pool, min_x, 0.0)
        .map(|index| EntryChoice { index, reason: EntryReason::StreetSide })
}

/// Nearest room in `pool` to (px, pz); ties go to the room closer to the
/// preferred floor, then to the earlier room.
fn nearest_to(graph: &RoomGraph, pool: &[usize], px: f64, pz: f64) -> Option<usize> {
    let mut best: Option<(usize, f64, i32)> = None;
    for &i in pool {
        let node = graph.node(i);
        let dx = node.center[0] - px;
        let dz = node.center[1] - pz;
        let d = dx * dx + dz * dz;
        let floor_diff = (node.floor - PREFERRED_FLOOR).abs();

        let better = match best {
            None => true,
            Some((_, best_d, best_floor)) => {
                d < best_d - TIE_EPSILON
                    || ((d - best_d).abs() <= TIE_EPSILON && floor_diff < best_floor)
            }
        };
        if better {
            best = Some((i, d, floor_diff));
        }
    }
    best.map(|(i, _, _)| i)
}
