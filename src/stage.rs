//! Stage state machine.
//!
//! Stages change only through [`StageController::request_stage`] and the two
//! automatic forward transitions raised on tween completion:
//!
//! ```text
//! Preferences --request--> Enter --(enter tween to 1.0)--> Brand
//! Brand --request--> Avatar --request--> Restart --(restart tween to 0.0)--> Enter
//! ```
//!
//! Entering [`Stage::Enter`] or [`Stage::Restart`] starts the matching tween on
//! the enter progress. Every other transition leaves the progress untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::tween::{Easing, TransitionDriver, TweenId, TweenSpec};

/// Named phase of the experience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    #[default]
    Preferences,
    Enter,
    Brand,
    Avatar,
    Restart,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Preferences,
        Stage::Enter,
        Stage::Brand,
        Stage::Avatar,
        Stage::Restart,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Preferences => "preferences",
            Stage::Enter => "enter",
            Stage::Brand => "brand",
            Stage::Avatar => "avatar",
            Stage::Restart => "restart",
        }
    }

    #[inline]
    pub fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = StageError;

    /// Case-insensitive. `logo` is accepted for [`Stage::Brand`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "logo" {
            return Ok(Stage::Brand);
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == lower)
            .ok_or_else(|| StageError::Unknown(s.to_string()))
    }
}

impl TryFrom<u32> for Stage {
    type Error = StageError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Stage::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| StageError::Unknown(value.to_string()))
    }
}

/// Tweens started on entering the stages that have one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimings {
    pub enter: TweenSpec,
    pub restart: TweenSpec,
}

impl Default for StageTimings {
    fn default() -> Self {
        Self {
            enter: TweenSpec::new(1.0, 2.6)
                .with_delay(0.2)
                .with_easing(Easing::EaseInOutCubic),
            restart: TweenSpec::new(0.0, 1.0).with_easing(Easing::EaseInOutCubic),
        }
    }
}

impl StageTimings {
    /// The tween started on entering `stage` and the stage requested when it
    /// completes.
    pub fn automatic(&self, stage: Stage) -> Option<(TweenSpec, Stage)> {
        match stage {
            Stage::Enter => Some((self.enter, Stage::Brand)),
            Stage::Restart => Some((self.restart, Stage::Enter)),
            _ => None,
        }
    }
}

/// Handle returned by [`StageController::on_stage_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type StageListener = Box<dyn FnMut(Stage)>;

/// Forward transition armed by an automatic tween.
#[derive(Debug, Clone, Copy)]
struct PendingAdvance {
    tween: TweenId,
    from: Stage,
    to: Stage,
}

/// Owns the current stage, the enter-progress driver and the change listeners.
pub struct StageController {
    stage: Stage,
    timings: StageTimings,
    driver: TransitionDriver,
    pending: Option<PendingAdvance>,
    listeners: Vec<(ListenerId, StageListener)>,
    next_listener: u64,
}

impl StageController {
    pub fn new(timings: StageTimings) -> Self {
        Self {
            stage: Stage::default(),
            timings,
            driver: TransitionDriver::new(0.0),
            pending: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current enter progress, always within `[0, 1]`.
    #[inline]
    pub fn enter_progress(&self) -> f32 {
        self.driver.progress()
    }

    /// Whether an enter-progress tween is in flight.
    pub fn is_transitioning(&self) -> bool {
        self.driver.is_active()
    }

    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    /// Move to `stage`. Requesting the current stage is a no-op.
    ///
    /// Returns whether the stage changed.
    pub fn request_stage(&mut self, stage: Stage, now: f64) -> bool {
        if stage == self.stage {
            return false;
        }
        self.enter(stage, now);
        true
    }

    /// Parse `name` and request it. Unknown names leave the controller untouched.
    pub fn request_stage_named(&mut self, name: &str, now: f64) -> Result<bool, StageError> {
        let stage: Stage = name.parse()?;
        Ok(self.request_stage(stage, now))
    }

    /// Register a listener called on every stage change, automatic ones included.
    pub fn on_stage_changed(&mut self, listener: impl FnMut(Stage) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Evaluate the tween and fire any automatic transition.
    ///
    /// Returns the new stage if an automatic transition happened.
    pub fn tick(&mut self, now: f64) -> Option<Stage> {
        let completed = self.driver.tick(now)?;
        let pending = self.pending.filter(|p| p.tween == completed)?;
        self.pending = None;
        // The advance only applies if nothing moved the stage meanwhile
        if self.stage != pending.from {
            tracing::debug!(
                armed_by = %pending.from,
                current = %self.stage,
                "automatic advance skipped"
            );
            return None;
        }
        self.enter(pending.to, now);
        Some(pending.to)
    }

    fn enter(&mut self, stage: Stage, now: f64) {
        let previous = self.stage;
        self.stage = stage;
        tracing::info!(from = %previous, to = %stage, "stage changed");

        if let Some((spec, next)) = self.timings.automatic(stage) {
            let tween = self.driver.start(spec, now);
            self.pending = Some(PendingAdvance {
                tween,
                from: stage,
                to: next,
            });
        }

        for (_, listener) in self.listeners.iter_mut() {
            listener(stage);
        }
    }
}

impl Default for StageController {
    fn default() -> Self {
        Self::new(StageTimings::default())
    }
}

impl fmt::Debug for StageController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageController")
            .field("stage", &self.stage)
            .field("enter_progress", &self.driver.progress())
            .field("pending", &self.pending)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
