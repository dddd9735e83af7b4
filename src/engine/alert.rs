//! Threshold alerts evaluated against published analytics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Series an alert watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    #[default]
    ZScore,
    Price,
    Volume,
}

/// Comparison applied against the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
    /// Latest value moved to the other side of the threshold since the previous one
    Crosses,
}

/// Trigger latch.
///
/// `Idle -> Triggered` when the condition fires; a triggered alert stays inert
/// until toggled, which moves it to `Reset` (armed again).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Idle,
    Triggered {
        at: DateTime<Utc>,
    },
    Reset,
}

fn default_active() -> bool {
    true
}

/// User-supplied alert rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDefinition {
    #[serde(default)]
    pub kind: AlertKind,
    pub condition: AlertCondition,
    pub threshold: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl AlertDefinition {
    /// Active z-score rule
    pub fn z_score(condition: AlertCondition, threshold: f64, message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::ZScore,
            condition,
            threshold,
            message: message.into(),
            symbol: None,
            active: true,
        }
    }
}

/// Registered alert with identity and latch state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(flatten)]
    pub definition: AlertDefinition,
    pub state: AlertState,
}

impl Alert {
    /// Register a definition under a fresh `alert-<uuid>` id
    pub fn new(definition: AlertDefinition) -> Self {
        Self {
            id: format!("alert-{}", Uuid::new_v4()),
            definition,
            state: AlertState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.definition.active
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.state, AlertState::Triggered { .. })
    }

    pub fn triggered_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            AlertState::Triggered { at } => Some(at),
            _ => None,
        }
    }

    /// Flip `active` and re-arm a triggered alert
    pub fn toggle(&mut self) {
        self.definition.active = !self.definition.active;
        if self.is_triggered() {
            self.state = AlertState::Reset;
        }
    }

    /// Whether the rule holds for a z-score series, ignoring the latch.
    ///
    /// Only z-score rules are evaluated; price and volume rules have no data
    /// in a snapshot and never fire.
    pub fn condition_met(&self, z_score: &[f64]) -> bool {
        if self.definition.kind != AlertKind::ZScore {
            return false;
        }
        let Some(&last) = z_score.last() else {
            return false;
        };
        let threshold = self.definition.threshold;

        match self.definition.condition {
            AlertCondition::Above => last > threshold,
            AlertCondition::Below => last < threshold,
            AlertCondition::Crosses => match z_score.len().checked_sub(2).map(|i| z_score[i]) {
                Some(prev) => {
                    (prev < threshold && last >= threshold) || (prev > threshold && last <= threshold)
                }
                None => false,
            },
        }
    }

    /// Evaluate an armed, active alert and latch it if it fires.
    ///
    /// Returns true only on the transition into `Triggered`.
    pub fn evaluate(&mut self, z_score: &[f64], now: DateTime<Utc>) -> bool {
        if !self.is_active() || self.is_triggered() {
            return false;
        }
        if self.condition_met(z_score) {
            self.state = AlertState::Triggered { at: now };
            true
        } else {
            false
        }
    }
}
