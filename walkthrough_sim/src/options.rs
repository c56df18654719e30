//! Options file for the simulator CLI.

use crate::error::SimError;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use walkthrough_core::{PlanOptions, WalkthroughOptions};

/// Planner and playback options loaded from one JSON file.
///
/// ```json
/// { "plan": { "pad": 1.2 }, "walkthrough": { "speed": 2.0, "dwell_sec": 0.5 } }
/// ```
///
/// Either section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    pub plan: PlanOptions,
    pub walkthrough: WalkthroughOptions,
}

impl SimOptions {
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
