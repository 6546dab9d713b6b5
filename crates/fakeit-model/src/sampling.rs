use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Largest sample value a declaration may ask for.
pub const MAX_SAMPLE: f64 = 1_000_000.0;

/// Rounding applied to fractional sample ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Half away from zero.
    #[default]
    Nearest,
    Floor,
    Ceil,
}

impl Rounding {
    pub fn apply(self, value: f64) -> u64 {
        let rounded = match self {
            Rounding::Nearest => value.round(),
            Rounding::Floor => value.floor(),
            Rounding::Ceil => value.ceil(),
        };
        if rounded.is_finite() && rounded > 0.0 {
            rounded as u64
        } else {
            0
        }
    }
}

/// What to do when an input sample asks for more rows than the source has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InputOverflow {
    /// Keep every row once.
    #[default]
    Clamp,
    /// Draw with replacement until the requested size is reached.
    Cycle,
}

/// Requested versus granted size of a dependency attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub requested: u64,
    pub granted: usize,
}

impl Attachment {
    pub fn is_degraded(&self) -> bool {
        self.requested > self.granted as u64
    }
}

/// Turns fractional sample ratios into concrete counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SamplePolicy {
    pub rounding: Rounding,
    pub input_overflow: InputOverflow,
}

impl SamplePolicy {
    pub fn round(&self, sample: f64) -> u64 {
        self.rounding.apply(sample)
    }

    /// Documents to attach from a dependency store of `available` documents.
    pub fn dependency_count(&self, sample: Option<f64>, available: usize) -> Attachment {
        match sample {
            None => Attachment {
                requested: available as u64,
                granted: available,
            },
            Some(sample) => {
                let requested = self.round(sample);
                let granted = usize::try_from(requested).map_or(available, |r| r.min(available));
                Attachment { requested, granted }
            }
        }
    }

    /// Rows to keep from an input source of `available` rows.
    pub fn input_count(&self, sample: Option<f64>, available: usize) -> usize {
        let Some(sample) = sample else {
            return available;
        };
        let requested = usize::try_from(self.round(sample.min(MAX_SAMPLE))).unwrap_or(0);
        match self.input_overflow {
            InputOverflow::Clamp => requested.min(available),
            InputOverflow::Cycle if available == 0 => 0,
            InputOverflow::Cycle => requested,
        }
    }
}
