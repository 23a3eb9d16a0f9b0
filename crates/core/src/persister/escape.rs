//! Early-exit prompt after repeated "already exists" outcomes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::WriteOutcome;

/// Decides whether a scrape keeps going after a streak of existing descriptors.
#[async_trait]
pub trait ContinueDecider: Send + Sync {
    /// `streak` is the number of consecutive existing descriptors seen.
    async fn should_continue(&self, streak: u32) -> bool;
}

/// Always continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoContinue;

#[async_trait]
impl ContinueDecider for AutoContinue {
    async fn should_continue(&self, streak: u32) -> bool {
        info!(streak, "Auto-continuing past existing descriptors");
        true
    }
}

/// What the scrape should do before the next persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatchDecision {
    Proceed,
    Abort,
}

/// Counts consecutive "already exists" outcomes and consults a
/// [`ContinueDecider`] once the streak passes `limit`.
pub struct EscapeHatch {
    streak: u32,
    limit: u32,
    decider: Arc<dyn ContinueDecider>,
}

impl EscapeHatch {
    pub fn new(limit: u32, decider: Arc<dyn ContinueDecider>) -> Self {
        Self {
            streak: 0,
            limit,
            decider,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Call before each persist. Continuing resets the streak.
    pub async fn check(&mut self) -> HatchDecision {
        if self.streak <= self.limit {
            return HatchDecision::Proceed;
        }
        if self.decider.should_continue(self.streak).await {
            self.streak = 0;
            HatchDecision::Proceed
        } else {
            HatchDecision::Abort
        }
    }

    /// Feed a write outcome into the streak.
    pub fn observe(&mut self, outcome: &WriteOutcome) {
        match outcome {
            WriteOutcome::Written(_) => self.streak = 0,
            WriteOutcome::AlreadyExists(_) => self.streak += 1,
        }
    }
}
