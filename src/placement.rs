//! Placement policies: which rule decides a particle's resting position.
//!
//! Policies are seed-gated and mutually exclusive. [`PLACEMENT_RULES`] is an
//! ordered guard chain; the first rule whose guard matches wins and anything
//! left over falls through to [`PlacementPolicy::Wave`]. The generated WGSL is
//! built from the same list, so the CPU and GPU orderings cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::shader_utils::wgsl_f32;

/// The rule that produced a particle's final position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PlacementPolicy {
    /// Wave position pushed far up or down: sparse "rising" particles.
    VerticalOffset = 0,
    /// Wave position discarded; uniform random point in a bounding box.
    RandomBox = 1,
    /// Plain wave position.
    Wave = 2,
}

impl PlacementPolicy {
    pub const ALL: [PlacementPolicy; 3] = [
        PlacementPolicy::VerticalOffset,
        PlacementPolicy::RandomBox,
        PlacementPolicy::Wave,
    ];

    /// Walk the guard chain and return the first matching policy.
    pub fn select(seed: f32, thresholds: &PlacementThresholds) -> Self {
        PLACEMENT_RULES
            .iter()
            .find(|rule| (rule.matches)(thresholds, seed))
            .map(|rule| rule.policy)
            .unwrap_or(PlacementPolicy::Wave)
    }

    /// Tag stored in the GPU particle struct.
    #[inline]
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(PlacementPolicy::VerticalOffset),
            1 => Some(PlacementPolicy::RandomBox),
            2 => Some(PlacementPolicy::Wave),
            _ => None,
        }
    }

    /// WGSL constant name for this policy.
    pub fn wgsl_name(self) -> &'static str {
        match self {
            PlacementPolicy::VerticalOffset => "PLACEMENT_VERTICAL_OFFSET",
            PlacementPolicy::RandomBox => "PLACEMENT_RANDOM_BOX",
            PlacementPolicy::Wave => "PLACEMENT_WAVE",
        }
    }
}

/// Seed thresholds gating the non-default policies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementThresholds {
    /// `seed < rising_below` selects [`PlacementPolicy::VerticalOffset`].
    pub rising_below: f32,
    /// `box_above < seed < box_below` selects [`PlacementPolicy::RandomBox`].
    pub box_above: f32,
    pub box_below: f32,
}

impl Default for PlacementThresholds {
    fn default() -> Self {
        Self {
            rising_below: 0.3,
            box_above: 0.6,
            box_below: 0.7,
        }
    }
}

/// One link of the guard chain.
pub struct PlacementRule {
    pub policy: PlacementPolicy,
    pub matches: fn(&PlacementThresholds, f32) -> bool,
    pub wgsl_condition: fn(&PlacementThresholds) -> String,
}

/// Guard chain, evaluated in order. Unmatched seeds get [`PlacementPolicy::Wave`].
pub const PLACEMENT_RULES: [PlacementRule; 2] = [
    PlacementRule {
        policy: PlacementPolicy::VerticalOffset,
        matches: is_rising,
        wgsl_condition: rising_wgsl,
    },
    PlacementRule {
        policy: PlacementPolicy::RandomBox,
        matches: is_boxed,
        wgsl_condition: boxed_wgsl,
    },
];

fn is_rising(t: &PlacementThresholds, seed: f32) -> bool {
    seed < t.rising_below
}

fn rising_wgsl(t: &PlacementThresholds) -> String {
    format!("seed < {}", wgsl_f32(t.rising_below))
}

fn is_boxed(t: &PlacementThresholds, seed: f32) -> bool {
    seed > t.box_above && seed < t.box_below
}

fn boxed_wgsl(t: &PlacementThresholds) -> String {
    format!(
        "seed > {} && seed < {}",
        wgsl_f32(t.box_above),
        wgsl_f32(t.box_below)
    )
}

/// WGSL `const` declarations for the policy tags.
pub fn policy_constants_wgsl() -> String {
    PlacementPolicy::ALL
        .iter()
        .map(|p| format!("const {}: u32 = {}u;", p.wgsl_name(), p.to_u32()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Emit the guard chain as an `if / else if / else` ladder.
///
/// `body` supplies the statements for each policy.
pub fn guard_chain_wgsl(
    thresholds: &PlacementThresholds,
    body: impl Fn(PlacementPolicy) -> String,
) -> String {
    let mut out = String::new();
    for (i, rule) in PLACEMENT_RULES.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { " else if" };
        out.push_str(&format!(
            "{} {} {{\n{}\n    }}",
            keyword,
            (rule.wgsl_condition)(thresholds),
            body(rule.policy)
        ));
    }
    out.push_str(&format!(" else {{\n{}\n    }}", body(PlacementPolicy::Wave)));
    out
}
