//! Programs: named, reusable sequences of sauna and break intervals.
//!
//! The engine never edits a program. It clones one when a session or schedule
//! begins and runs that copy to the end, so catalog edits made mid-session
//! only affect the next run.

mod catalog;
mod interval;

pub use catalog::{ProgramCatalog, PROGRAMS_KEY};
pub use interval::{Intensity, Interval, IntervalKind};

use serde::{Deserialize, Serialize};

use crate::error::ProgramError;

/// RGB lighting for the cabin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lighting {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for Lighting {
    fn default() -> Self {
        // warm amber
        Self { r: 255, g: 147, b: 41 }
    }
}

/// When a program action happens relative to the heat intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPhase {
    Pre,
    Post,
}

/// A ritual step around the session, e.g. "Cold plunge" or "Hydrate".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramAction {
    pub name: String,
    pub phase: ActionPhase,
    /// Preparation time in minutes, if the action needs any.
    #[serde(default)]
    pub prep_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub intervals: Vec<Interval>,
    #[serde(default)]
    pub soundscape: Option<String>,
    #[serde(default)]
    pub lighting: Lighting,
    #[serde(default)]
    pub actions: Vec<ProgramAction>,
}

impl Program {
    /// Create a program with a fresh random id and default ambience.
    pub fn new(name: impl Into<String>, intervals: Vec<Interval>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            intervals,
            soundscape: None,
            lighting: Lighting::default(),
            actions: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_soundscape(mut self, soundscape: impl Into<String>) -> Self {
        self.soundscape = Some(soundscape.into());
        self
    }

    pub fn with_action(mut self, action: ProgramAction) -> Self {
        self.actions.push(action);
        self
    }

    /// A program is runnable when it has at least one interval and every
    /// interval lasts at least a minute.
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.intervals.is_empty() {
            return Err(ProgramError::Empty {
                program_id: self.id.clone(),
            });
        }
        self.intervals.iter().try_for_each(Interval::validate)
    }

    /// Sum of all interval durations.
    pub fn total_duration_minutes(&self) -> u64 {
        self.intervals
            .iter()
            .map(|i| u64::from(i.duration_minutes))
            .sum()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.total_duration_minutes() * 60
    }

    /// Minutes spent in heat, breaks excluded.
    pub fn sauna_minutes(&self) -> u64 {
        self.intervals
            .iter()
            .filter(|i| i.is_sauna())
            .map(|i| u64::from(i.duration_minutes))
            .sum()
    }

    /// Seconds elapsed in the program before `index` begins.
    pub fn interval_offset_secs(&self, index: usize) -> u64 {
        self.intervals
            .iter()
            .take(index)
            .map(Interval::duration_secs)
            .sum()
    }

    pub fn pre_actions(&self) -> impl Iterator<Item = &ProgramAction> {
        self.actions.iter().filter(|a| a.phase == ActionPhase::Pre)
    }

    pub fn post_actions(&self) -> impl Iterator<Item = &ProgramAction> {
        self.actions.iter().filter(|a| a.phase == ActionPhase::Post)
    }

    pub fn total_prep_minutes(&self) -> u64 {
        self.actions
            .iter()
            .filter_map(|a| a.prep_minutes)
            .map(u64::from)
            .sum()
    }
}
