//! Route construction - depth-first walk of the spanning forest.
//!
//! The walk records every step, including the way back out of each
//! subtree, so consecutive distinct rooms in the route are always joined
//! by a real edge. Stepping into a child records the child twice (once
//! for the step, once as the start of its own visit); those duplicates
//! are zero-length and are absorbed by the waypoint builder.

use crate::discovery::SpanningForest;
use crate::graph::RoomGraph;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Child lists sorted so that rooms nearer the floor centroid come first.
///
/// The centroid used for a parent's children is the centroid of the
/// parent's floor, computed over `order`.
pub fn sorted_children(
    graph: &RoomGraph,
    forest: &SpanningForest,
    centroids: &BTreeMap<i32, [f64; 2]>,
) -> Vec<Vec<usize>> {
    let mut kids = forest.children();
    for (parent, list) in kids.iter_mut().enumerate() {
        let [cx, cz] = centroids
            .get(&graph.floor_of(parent))
            .copied()
            .unwrap_or([0.0, 0.0]);
        let dist = |i: usize| {
            let c = graph.node(i).center;
            (c[0] - cx).powi(2) + (c[1] - cz).powi(2)
        };
        list.sort_by(|&a, &b| {
            dist(a)
                .partial_cmp(&dist(b))
                .unwrap_or(Ordering::Equal)
                .then_with(|| graph.node(a).id.cmp(&graph.node(b).id))
        });
    }
    kids
}

/// Depth-first walk from `root` over `kids`, with explicit backtracks.
///
/// Iterative: each stack frame is (room, index of next child).
pub fn build_route(kids: &[Vec<usize>], root: usize) -> Vec<usize> {
    let mut route = vec![root];
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
        let (room, next) = *frame;
        match kids.get(room).and_then(|k| k.get(next)) {
            Some(&child) => {
                frame.1 += 1;
                // Step into the child, then open its own visit.
                route.push(child);
                route.push(child);
                stack.push((child, 0));
            }
            None => {
                stack.pop();
                if let Some(&(parent, _)) = stack.last() {
                    route.push(parent);
                }
            }
        }
    }

    route
}

/// True if every pair of consecutive distinct rooms is an edge.
pub fn is_edge_faithful(graph: &RoomGraph, route: &[usize]) -> bool {
    route
        .windows(2)
        .all(|w| w[0] == w[1] || graph.neighbors(w[0]).contains(&w[1]))
}
