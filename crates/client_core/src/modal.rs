use std::time::{Duration, Instant};

pub const ENTER_DURATION: Duration = Duration::from_millis(300);
pub const LEAVE_DURATION: Duration = Duration::from_millis(200);
const ENTER_FROM_SCALE: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    Entering,
    Open,
    Leaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
    Escape,
    Overlay,
    CloseButton,
}

/// Emitted when the user asks the dialog to close; the owner decides
/// whether to flip `is_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseRequested(pub CloseTrigger);

/// Open/close transition state of a titled dialog driven by a boolean.
#[derive(Debug, Clone)]
pub struct ModalShell {
    title: String,
    is_open: bool,
    phase: ModalPhase,
    /// Visibility (0 hidden, 1 shown) when the current transition started.
    from: f32,
    started: Instant,
}

impl ModalShell {
    /// A shell created open plays its enter transition.
    pub fn new(title: impl Into<String>, is_open: bool, now: Instant) -> Self {
        Self {
            title: title.into(),
            is_open,
            phase: if is_open {
                ModalPhase::Entering
            } else {
                ModalPhase::Closed
            },
            from: 0.0,
            started: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn set_open(&mut self, open: bool, now: Instant) {
        if open == self.is_open {
            return;
        }
        self.from = self.visibility(now);
        self.started = now;
        self.is_open = open;
        self.phase = if open {
            ModalPhase::Entering
        } else {
            ModalPhase::Leaving
        };
    }

    /// Advances the transition and returns the phase at `now`.
    pub fn tick(&mut self, now: Instant) -> ModalPhase {
        match self.phase {
            ModalPhase::Entering if self.visibility(now) >= 1.0 => self.phase = ModalPhase::Open,
            ModalPhase::Leaving if self.visibility(now) <= 0.0 => self.phase = ModalPhase::Closed,
            _ => {}
        }
        self.phase
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    /// Whether anything should be drawn; a leaving dialog stays mounted until
    /// its exit transition ends.
    pub fn is_rendered(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    pub fn visibility(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f32();
        match self.phase {
            ModalPhase::Closed => 0.0,
            ModalPhase::Open => 1.0,
            ModalPhase::Entering => {
                (self.from + elapsed / ENTER_DURATION.as_secs_f32()).min(1.0)
            }
            ModalPhase::Leaving => {
                (self.from - elapsed / LEAVE_DURATION.as_secs_f32()).max(0.0)
            }
        }
    }

    /// Ease-out while entering, ease-in while leaving.
    pub fn opacity(&self, now: Instant) -> f32 {
        let v = self.visibility(now);
        match self.phase {
            ModalPhase::Entering => 1.0 - (1.0 - v) * (1.0 - v),
            ModalPhase::Leaving => v * v,
            ModalPhase::Open | ModalPhase::Closed => v,
        }
    }

    pub fn scale(&self, now: Instant) -> f32 {
        ENTER_FROM_SCALE + (1.0 - ENTER_FROM_SCALE) * self.opacity(now)
    }

    /// Close requests only count while the dialog is actually open or opening.
    pub fn request_close(&self, trigger: CloseTrigger) -> Option<CloseRequested> {
        self.is_open.then_some(CloseRequested(trigger))
    }
}

#[cfg(test)]
#[path = "tests/modal_tests.rs"]
mod tests;
