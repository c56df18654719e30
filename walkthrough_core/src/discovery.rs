//! Floor-aware discovery - first-visit order and spanning forest.
//!
//! Floors are explored bottom-up. Each floor is flooded breadth-first
//! along same-floor edges; neighbours on other floors are carried in a
//! frontier and seed the floor they live on. Rooms that the entry's
//! component never reaches are appended at the end, floor by floor.
//!
//! Every parent link recorded here is a real edge of the graph, so the
//! forest can be walked without ever leaving the corridor set.

use crate::graph::RoomGraph;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;
use walkthrough_env::RoomId;

/// Parent relation built during discovery.
///
/// Indexed by room index. The entry is always the first root; further
/// roots appear only for rooms disconnected from the entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanningForest {
    parent: Vec<Option<usize>>,
    roots: Vec<usize>,
}

impl SpanningForest {
    /// Parent of a room, `None` for roots.
    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parent.get(idx).copied().flatten()
    }

    /// Roots in creation order (entry first).
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Number of rooms covered.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// True if the forest covers no rooms.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Child lists per room, in room-index order.
    pub fn children(&self) -> Vec<Vec<usize>> {
        let mut kids = vec![Vec::new(); self.parent.len()];
        for (child, parent) in self.parent.iter().enumerate() {
            if let Some(p) = parent {
                kids[*p].push(child);
            }
        }
        kids
    }

    /// Id-keyed view: room id -> parent id.
    pub fn to_parent_map(&self, graph: &RoomGraph) -> BTreeMap<RoomId, Option<RoomId>> {
        self.parent
            .iter()
            .enumerate()
            .map(|(i, p)| {
                (
                    graph.node(i).id.clone(),
                    p.map(|p| graph.node(p).id.clone()),
                )
            })
            .collect()
    }
}

/// Output of [`discover`].
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Room indices in first-visit order, grouped by ascending floor
    pub order: Vec<usize>,
    pub forest: SpanningForest,
}

/// Parent bookkeeping during discovery.
///
/// Links made by a room already connected to the entry are final.
/// Links made inside a re-seeded floor stay tentative: a later link
/// from the entry's tree overrides them, and whatever remains becomes a
/// separate tree. When discovery ends, every room adjacent to the
/// entry's tree is pulled into it, so only components the entry cannot
/// reach stay separate.
struct ForestBuilder {
    entry: usize,
    rooted: Vec<bool>,
    rooted_parent: Vec<Option<usize>>,
    tentative: Vec<Option<usize>>,
}

impl ForestBuilder {
    fn new(n: usize, entry: usize) -> Self {
        let mut rooted = vec![false; n];
        rooted[entry] = true;
        Self {
            entry,
            rooted,
            rooted_parent: vec![None; n],
            tentative: vec![None; n],
        }
    }

    /// Records `discoverer` as the parent of `child` unless `child`
    /// already has a parent of equal or stronger standing.
    fn link(&mut self, child: usize, discoverer: usize) {
        if self.rooted[child] || child == discoverer {
            return;
        }
        if self.rooted[discoverer] {
            self.rooted[child] = true;
            self.rooted_parent[child] = Some(discoverer);
        } else if self.tentative[child].is_none() && !self.descends_from(discoverer, child) {
            self.tentative[child] = Some(discoverer);
        }
    }

    /// Pulls every room connected to the entry's tree into it, breadth
    /// first from the rooms already there.
    ///
    /// Tentative links can leave a re-seeded room outside the tree even
    /// though its neighbour joined later.
    fn absorb_reachable(&mut self, graph: &RoomGraph) {
        let mut queue: VecDeque<usize> = (0..self.rooted.len()).filter(|&i| self.rooted[i]).collect();
        while let Some(c) = queue.pop_front() {
            for &v in graph.neighbors(c) {
                if !self.rooted[v] {
                    debug!(
                        "Room {} joins the entry's tree through {}",
                        graph.node(v).id,
                        graph.node(c).id
                    );
                    self.rooted[v] = true;
                    self.rooted_parent[v] = Some(c);
                    queue.push_back(v);
                }
            }
        }
    }

    fn has_parent(&self, idx: usize) -> bool {
        idx == self.entry || self.rooted[idx] || self.tentative[idx].is_some()
    }

    /// True if following tentative links up from `from` reaches `ancestor`.
    fn descends_from(&self, from: usize, ancestor: usize) -> bool {
        let mut cur = Some(from);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            if self.rooted[c] {
                return false;
            }
            cur = self.tentative[c];
        }
        false
    }

    fn finish(self, order: &[usize]) -> SpanningForest {
        let parent: Vec<Option<usize>> = (0..self.rooted.len())
            .map(|i| {
                if self.rooted[i] {
                    self.rooted_parent[i]
                } else {
                    self.tentative[i]
                }
            })
            .collect();

        let mut roots = vec![self.entry];
        roots.extend(
            order
                .iter()
                .copied()
                .filter(|&i| i != self.entry && parent[i].is_none()),
        );

        SpanningForest { parent, roots }
    }
}

/// Explores the graph floor by floor starting from `entry`.
pub fn discover(graph: &RoomGraph, entry: usize) -> Discovery {
    let n = graph.len();
    let floors = graph.floors();

    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut forest = ForestBuilder::new(n, entry);

    // Cross-floor neighbours waiting for their floor's turn.
    let mut frontier: Vec<usize> = vec![entry];

    for &floor in &floors {
        let mut seeds: Vec<usize> = Vec::new();
        for &id in &frontier {
            if graph.floor_of(id) == floor && !seen[id] && !seeds.contains(&id) {
                seeds.push(id);
            }
        }

        if seeds.is_empty() {
            // Nothing carried to this floor: re-seed from the lowest unseen id.
            let reseed = (0..n)
                .filter(|&i| graph.floor_of(i) == floor && !seen[i])
                .min_by(|&a, &b| graph.node(a).id.cmp(&graph.node(b).id));
            match reseed {
                Some(idx) => {
                    debug!("Floor {} has no carried seed, re-seeding at {}", floor, graph.node(idx).id);
                    seeds.push(idx);
                }
                None => continue,
            }
        }

        let mut queued = vec![false; n];
        for &s in &seeds {
            queued[s] = true;
        }
        let mut queue: VecDeque<usize> = seeds.into_iter().collect();

        while let Some(u) = queue.pop_front() {
            if !seen[u] && graph.floor_of(u) == floor {
                seen[u] = true;
                order.push(u);
            }

            for &v in graph.neighbors(u) {
                forest.link(v, u);

                if graph.floor_of(v) == floor {
                    if !queued[v] {
                        queued[v] = true;
                        queue.push_back(v);
                    }
                } else if !seen[v] && !frontier.contains(&v) {
                    frontier.push(v);
                }
            }
        }
    }

    // Rooms no floor pass reached.
    if order.len() < n {
        for &floor in &floors {
            for idx in 0..n {
                if seen[idx] || graph.floor_of(idx) != floor {
                    continue;
                }
                seen[idx] = true;
                order.push(idx);

                if forest.has_parent(idx) {
                    continue;
                }
                let neighbors = graph.neighbors(idx);
                let anchor = neighbors
                    .iter()
                    .copied()
                    .filter(|&v| graph.floor_of(v) == floor)
                    .find(|&v| seen[v] && v != idx)
                    .or_else(|| neighbors.iter().copied().find(|&v| seen[v] && v != idx));
                match anchor {
                    Some(p) => forest.link(idx, p),
                    None => debug!("Room {} is unreachable from the entry, new root", graph.node(idx).id),
                }
            }
        }
    }

    forest.absorb_reachable(graph);
    let forest = forest.finish(&order);
    Discovery { order, forest }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RoomNode;

    fn ids(graph: &RoomGraph, order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| graph.node(i).id.to_string()).collect()
    }

    #[test]
    fn test_line_graph_order() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("A").at(0.0, 0.0))
            .room(RoomNode::new("B").at(4.0, 0.0))
            .room(RoomNode::new("C").at(8.0, 0.0))
            .edge("A", "B")
            .edge("B", "C")
            .build();
        let d = discover(&graph, 0);
        assert_eq!(ids(&graph, &d.order), vec!["A", "B", "C"]);
        assert_eq!(d.forest.parent(0), None);
        assert_eq!(d.forest.parent(1), Some(0));
        assert_eq!(d.forest.parent(2), Some(1));
        assert_eq!(d.forest.roots(), &[0]);
    }

    #[test]
    fn test_ground_floor_before_upper_floor() {
        // Ring r0-r1-r2-r3 on floor 0, r2 has the stair to u on floor 1.
        let graph = RoomGraph::builder()
            .room(RoomNode::new("r0").at(0.0, 0.0))
            .room(RoomNode::new("r1").at(4.0, 0.0))
            .room(RoomNode::new("u").at(4.0, 4.0).on_floor(1))
            .room(RoomNode::new("r2").at(4.0, 4.0))
            .room(RoomNode::new("r3").at(0.0, 4.0))
            .edge("r0", "r1")
            .edge("r1", "u")
            .edge("r1", "r2")
            .edge("r2", "r3")
            .edge("r3", "r0")
            .build();
        let d = discover(&graph, 0);
        let order = ids(&graph, &d.order);
        assert_eq!(order.len(), 5);
        assert_eq!(order.last().map(String::as_str), Some("u"));
        assert_eq!(d.forest.parent(2), Some(1));
    }

    #[test]
    fn test_disconnected_rooms_appended_as_roots() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("a"))
            .room(RoomNode::new("b"))
            .room(RoomNode::new("island"))
            .room(RoomNode::new("island_annex"))
            .edge("a", "b")
            .edge("island", "island_annex")
            .build();
        let d = discover(&graph, 0);
        assert_eq!(ids(&graph, &d.order), vec!["a", "b", "island", "island_annex"]);
        assert_eq!(d.forest.roots(), &[0, 2]);
        assert_eq!(d.forest.parent(3), Some(2));
    }

    #[test]
    fn test_floor_without_carried_seed_is_reseeded() {
        // Floor 1 is not connected to the ground floor at all.
        let graph = RoomGraph::builder()
            .room(RoomNode::new("g"))
            .room(RoomNode::new("z_up").on_floor(1))
            .room(RoomNode::new("a_up").on_floor(1))
            .edge("z_up", "a_up")
            .build();
        let d = discover(&graph, 0);
        assert_eq!(ids(&graph, &d.order), vec!["g", "a_up", "z_up"]);
        assert_eq!(d.forest.roots(), &[0, 2]);
        assert_eq!(d.forest.parent(1), Some(2));
    }

    #[test]
    fn test_lower_floor_reached_from_above() {
        // Basement room only reachable through the upper floor.
        let graph = RoomGraph::builder()
            .room(RoomNode::new("entry"))
            .room(RoomNode::new("up").on_floor(1))
            .room(RoomNode::new("cellar").on_floor(-1))
            .edge("entry", "up")
            .edge("up", "cellar")
            .build();
        let d = discover(&graph, 0);
        // Floor-grouped: the basement floor comes first.
        assert_eq!(ids(&graph, &d.order), vec!["cellar", "entry", "up"]);
        // The cellar still hangs off the entry's tree through a real edge.
        assert_eq!(d.forest.parent(2), Some(1));
        assert_eq!(d.forest.roots(), &[0]);
    }

    #[test]
    fn test_reseeded_floor_joins_entry_tree_through_later_link() {
        // Floor 1 has no carried seed and is re-seeded at "s"; the only
        // way in from the entry is the upper floor's link down to "v".
        let graph = RoomGraph::builder()
            .room(RoomNode::new("E"))
            .room(RoomNode::new("W").on_floor(2))
            .room(RoomNode::new("v").on_floor(1))
            .room(RoomNode::new("s").on_floor(1))
            .edge("E", "W")
            .edge("v", "W")
            .edge("s", "v")
            .build();
        let d = discover(&graph, 0);
        assert_eq!(ids(&graph, &d.order), vec!["E", "s", "v", "W"]);
        assert_eq!(d.forest.roots(), &[0]);
        assert_eq!(d.forest.parent(1), Some(0));
        assert_eq!(d.forest.parent(2), Some(1));
        assert_eq!(d.forest.parent(3), Some(2));
    }

    #[test]
    fn test_parent_links_are_edges() {
        let graph = RoomGraph::builder()
            .room(RoomNode::new("a"))
            .room(RoomNode::new("b"))
            .room(RoomNode::new("c").on_floor(1))
            .room(RoomNode::new("d").on_floor(1))
            .room(RoomNode::new("e"))
            .edge("a", "b")
            .edge("b", "c")
            .edge("c", "d")
            .edge("d", "e")
            .build();
        let d = discover(&graph, 0);
        for idx in 0..graph.len() {
            if let Some(p) = d.forest.parent(idx) {
                assert!(graph.neighbors(idx).contains(&p));
            }
        }
        let map = d.forest.to_parent_map(&graph);
        assert_eq!(map[&RoomId::new("a")], None);
        assert_eq!(map[&RoomId::new("e")], Some(RoomId::new("d")));
    }
}
