//! Built-in floor plans for playback simulation.

use crate::error::SimError;
use nalgebra::Vector3;
use walkthrough_core::{RoomGraph, RoomNode};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// WT-001: three rooms in a row
    Line,

    /// WT-002: ground-floor ring with a stair to one upper room
    TwoFloorRing,

    /// WT-003: a single room with no edges
    Isolated,

    /// WT-004: a wing that cannot be reached from the entry
    SplitWings,

    /// WT-005: three floors, branches and a named foyer (JSON input)
    Townhouse,

    /// WT-006: no rooms, a bare 10-unit path
    Straight,
}

/// What a scenario hands to the runner.
#[derive(Debug, Clone)]
pub enum ScenarioInput {
    /// A room graph to plan
    Graph(RoomGraph),

    /// Pre-built control points, no rooms
    Path(Vec<Vector3<f64>>),
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Line,
            ScenarioId::TwoFloorRing,
            ScenarioId::Isolated,
            ScenarioId::SplitWings,
            ScenarioId::Townhouse,
            ScenarioId::Straight,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Line => "line",
            ScenarioId::TwoFloorRing => "two_floor_ring",
            ScenarioId::Isolated => "isolated",
            ScenarioId::SplitWings => "split_wings",
            ScenarioId::Townhouse => "townhouse",
            ScenarioId::Straight => "straight",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Line => "A-B-C corridor, entry at A",
            ScenarioId::TwoFloorRing => "4-room ring on floor 0, one stair to floor 1",
            ScenarioId::Isolated => "One room, no edges: glide straight into its center",
            ScenarioId::SplitWings => "Main house plus a wing with no corridor to it",
            ScenarioId::Townhouse => "3 floors, 11 rooms, lenient JSON with a named foyer",
            ScenarioId::Straight => "No rooms, 10-unit straight path at speed 2",
        }
    }

    /// Number of components the planner should report as detached.
    pub fn expected_detached(&self) -> usize {
        match self {
            ScenarioId::SplitWings => 1,
            _ => 0,
        }
    }

    /// Base speed the scenario is defined at, if it differs from the default.
    pub fn default_speed(&self) -> Option<f64> {
        match self {
            ScenarioId::Straight => Some(2.0),
            _ => None,
        }
    }

    /// Builds the scenario's input.
    pub fn build(&self) -> Result<ScenarioInput, SimError> {
        let input = match self {
            ScenarioId::Line => ScenarioInput::Graph(
                RoomGraph::builder()
                    .room(RoomNode::new("A").at(0.0, 0.0))
                    .room(RoomNode::new("B").at(4.0, 0.0))
                    .room(RoomNode::new("C").at(8.0, 0.0))
                    .edge("A", "B")
                    .edge("B", "C")
                    .build(),
            ),
            ScenarioId::TwoFloorRing => ScenarioInput::Graph(
                RoomGraph::builder()
                    .room(RoomNode::new("r0").at(0.0, 0.0))
                    .room(RoomNode::new("r1").at(5.0, 0.0))
                    .room(RoomNode::new("r2").at(5.0, 5.0))
                    .room(RoomNode::new("r3").at(0.0, 5.0))
                    .room(RoomNode::new("loft").at(5.0, 5.0).on_floor(1))
                    .edge("r0", "r1")
                    .edge("r1", "r2")
                    .edge("r2", "r3")
                    .edge("r3", "r0")
                    .edge("r2", "loft")
                    .build(),
            ),
            ScenarioId::Isolated => ScenarioInput::Graph(
                RoomGraph::builder()
                    .room(RoomNode::new("studio").at(2.0, 3.0).sized(6.0, 5.0))
                    .build(),
            ),
            ScenarioId::SplitWings => ScenarioInput::Graph(
                RoomGraph::builder()
                    .room(RoomNode::new("foyer").named("Foyer").at(0.0, 0.0))
                    .room(RoomNode::new("hall").at(5.0, 0.0))
                    .room(RoomNode::new("kitchen").at(5.0, 5.0))
                    .room(RoomNode::new("east_wing").at(20.0, 0.0))
                    .room(RoomNode::new("east_annex").at(25.0, 0.0))
                    .edge("foyer", "hall")
                    .edge("hall", "kitchen")
                    .edge("east_wing", "east_annex")
                    .build(),
            ),
            ScenarioId::Townhouse => ScenarioInput::Graph(RoomGraph::from_json_str(TOWNHOUSE)?),
            ScenarioId::Straight => ScenarioInput::Path(vec![
                Vector3::new(0.0, 1.6, 0.0),
                Vector3::new(10.0, 1.6, 0.0),
            ]),
        };
        Ok(input)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" | "wt-001" => Ok(ScenarioId::Line),
            "two_floor_ring" | "twofloorring" | "ring" | "wt-002" => Ok(ScenarioId::TwoFloorRing),
            "isolated" | "wt-003" => Ok(ScenarioId::Isolated),
            "split_wings" | "splitwings" | "wt-004" => Ok(ScenarioId::SplitWings),
            "townhouse" | "wt-005" => Ok(ScenarioId::Townhouse),
            "straight" | "wt-006" => Ok(ScenarioId::Straight),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Townhouse floor plan in the exporter's JSON format.
const TOWNHOUSE: &str = r#"{
  "nodes": [
    {"id": "foyer", "name": "Foyer", "type": "entry", "center": [0, 0], "width": [3, 3], "floor": 0,
     "privacy_level": "public", "unique_features": "Terrazzo floor, double doors"},
    {"id": "living", "name": "Living Room", "type": "living", "center": [5, 0], "size": [6, 5], "floor": 0,
     "privacy_level": "public"},
    {"id": "kitchen", "type": "kitchen", "center": [5, 6], "floor": 0, "privacy_level": "semi_private",
     "unique_features": "Island with skylight"},
    {"id": "dining", "label": "Dining", "center": [0, 6], "floor": 0, "privacy_level": "public"},
    {"id": "stair_hall", "name": "Stair Hall", "center": [-3, 2], "width": 2, "depth": 4, "floor": 0},
    {"id": "landing", "name": "Landing", "center": [-3, 2], "floor": 1, "room_height": 2.7},
    {"id": 12, "name": "Primary Bedroom", "type": "bedroom", "center": [3, 2], "floor": 1,
     "privacy_level": "private", "unique_features": "Bay window"},
    {"id": "bed2", "name": "Bedroom 2", "type": "bedroom", "center": [-3, 7], "floor": 1,
     "privacy_level": "private"},
    {"id": "bath", "name": "Bath", "type": "bathroom", "center": [0, 5], "floor": 1,
     "privacy_level": "private"},
    {"id": "attic", "name": "Attic", "center": [-3, 2], "floor": 2, "height": "2.2"},
    {"id": "study", "name": "Study", "type": "office", "center": [2, 2], "floor": 2,
     "privacy_level": "semi_private"}
  ],
  "edges": [
    ["foyer", "living"], ["foyer", "stair_hall"], ["living", "kitchen"],
    ["kitchen", "dining"], ["dining", "foyer"],
    ["stair_hall", "landing"], ["landing", 12], ["landing", "bed2"], ["landing", "bath"],
    ["landing", "attic"], ["attic", "study"],
    ["study", "roof_deck"], ["bath", "bath"]
  ],
  "walkthrough": {"entry_glide": 3.5}
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
        }
        assert!("nope".parse::<ScenarioId>().is_err());
        assert_eq!("WT-004".parse::<ScenarioId>(), Ok(ScenarioId::SplitWings));
    }

    #[test]
    fn test_every_scenario_builds() {
        for id in ScenarioId::all() {
            assert!(id.build().is_ok(), "{} failed to build", id);
        }
    }

    #[test]
    fn test_townhouse_parses_leniently() {
        let ScenarioInput::Graph(graph) = ScenarioId::Townhouse.build().unwrap() else {
            panic!("townhouse is a graph scenario");
        };
        assert_eq!(graph.len(), 11);
        // Unknown endpoint and self loop are dropped.
        assert_eq!(graph.edge_count(), 11);
        assert_eq!(graph.floors(), vec![0, 1, 2]);
        assert_eq!(graph.entry_glide(), Some(3.5));
        let attic = graph.get(&"attic".into()).unwrap();
        assert_eq!(attic.height, 2.2);
    }
}
