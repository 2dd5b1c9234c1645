use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One segment of a breath cycle, cyclically ordered
/// `Inhale -> Hold1 -> Exhale -> Hold2 -> Inhale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Inhale,
    Hold1,
    Exhale,
    Hold2,
}

impl PhaseKind {
    pub fn next(self) -> Self {
        match self {
            PhaseKind::Inhale => PhaseKind::Hold1,
            PhaseKind::Hold1 => PhaseKind::Exhale,
            PhaseKind::Exhale => PhaseKind::Hold2,
            PhaseKind::Hold2 => PhaseKind::Inhale,
        }
    }

    pub fn is_hold(self) -> bool {
        matches!(self, PhaseKind::Hold1 | PhaseKind::Hold2)
    }

    /// Short instruction shown while the phase is active.
    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Inhale => "Breathe in",
            PhaseKind::Exhale => "Breathe out",
            PhaseKind::Hold1 | PhaseKind::Hold2 => "Keep breath",
        }
    }
}

/// How an oversized tick is applied at a phase boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// At most one phase advance per tick; overrun past the boundary is dropped.
    #[default]
    SinglePhase,
    /// Carry overrun into following phases until one has time left,
    /// counting any cycles crossed on the way.
    CatchUp,
}

/// Immutable session parameters, supplied at `start()`.
///
/// Both hold phases share `hold_ms`. Deserialization goes through
/// [`SessionConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSessionConfig")]
pub struct SessionConfig {
    pub inhale_ms: u64,
    pub hold_ms: u64,
    pub exhale_ms: u64,
    pub total_ms: u64,
    #[serde(default)]
    pub advance: AdvancePolicy,
}

#[derive(Deserialize)]
struct RawSessionConfig {
    inhale_ms: u64,
    hold_ms: u64,
    exhale_ms: u64,
    total_ms: u64,
    #[serde(default)]
    advance: AdvancePolicy,
}

impl TryFrom<RawSessionConfig> for SessionConfig {
    type Error = ValidationError;

    fn try_from(raw: RawSessionConfig) -> Result<Self, Self::Error> {
        let config = Self::new(raw.inhale_ms, raw.hold_ms, raw.exhale_ms, raw.total_ms)?;
        Ok(config.with_advance(raw.advance))
    }
}

impl SessionConfig {
    /// Build a config, rejecting any zero duration.
    pub fn new(
        inhale_ms: u64,
        hold_ms: u64,
        exhale_ms: u64,
        total_ms: u64,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            inhale_ms,
            hold_ms,
            exhale_ms,
            total_ms,
            advance: AdvancePolicy::SinglePhase,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_advance(mut self, advance: AdvancePolicy) -> Self {
        self.advance = advance;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("inhale_ms", self.inhale_ms),
            ("hold_ms", self.hold_ms),
            ("exhale_ms", self.exhale_ms),
            ("total_ms", self.total_ms),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ValidationError::NonPositiveDuration { field });
            }
        }
        Ok(())
    }

    pub fn duration_of(&self, phase: PhaseKind) -> Duration {
        let ms = match phase {
            PhaseKind::Inhale => self.inhale_ms,
            PhaseKind::Hold1 | PhaseKind::Hold2 => self.hold_ms,
            PhaseKind::Exhale => self.exhale_ms,
        };
        Duration::from_millis(ms)
    }

    /// Length of one full Inhale/Hold/Exhale/Hold loop.
    pub fn cycle_ms(&self) -> u64 {
        self.inhale_ms
            .saturating_add(self.hold_ms.saturating_mul(2))
            .saturating_add(self.exhale_ms)
    }

    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }
}

impl Default for SessionConfig {
    /// Five minutes of 4-4-4 breathing.
    fn default() -> Self {
        Self {
            inhale_ms: 4_000,
            hold_ms: 4_000,
            exhale_ms: 4_000,
            total_ms: 5 * 60 * 1000,
            advance: AdvancePolicy::SinglePhase,
        }
    }
}
