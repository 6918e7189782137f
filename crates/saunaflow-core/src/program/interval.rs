use serde::{Deserialize, Serialize};

use crate::error::ProgramError;

/// Heat intensity of a sauna interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Mellow,
    Warm,
    Hot,
    Intense,
}

impl Intensity {
    pub fn label(self) -> &'static str {
        match self {
            Intensity::Mellow => "Mellow",
            Intensity::Warm => "Warm",
            Intensity::Hot => "Hot",
            Intensity::Intense => "Intense",
        }
    }
}

/// What an interval is. Only heat segments carry an intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IntervalKind {
    Sauna {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intensity: Option<Intensity>,
    },
    Break,
}

/// One timed segment of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Caller-assigned, opaque.
    pub id: String,
    pub kind: IntervalKind,
    /// Whole minutes, at least one.
    pub duration_minutes: u32,
}

impl Interval {
    pub fn sauna(
        id: impl Into<String>,
        duration_minutes: u32,
        intensity: Option<Intensity>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: IntervalKind::Sauna { intensity },
            duration_minutes,
        }
    }

    pub fn rest(id: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            id: id.into(),
            kind: IntervalKind::Break,
            duration_minutes,
        }
    }

    pub fn is_sauna(&self) -> bool {
        matches!(self.kind, IntervalKind::Sauna { .. })
    }

    pub fn intensity(&self) -> Option<Intensity> {
        match self.kind {
            IntervalKind::Sauna { intensity } => intensity,
            IntervalKind::Break => None,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.duration_minutes == 0 {
            return Err(ProgramError::ZeroDuration {
                interval_id: self.id.clone(),
            });
        }
        Ok(())
    }
}
