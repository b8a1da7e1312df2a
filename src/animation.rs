//! LED animation scheduler
//!
//! At most one animation task runs at a time. The task never touches LED state
//! itself: on every tick it asks the dispatcher to render frame `n`, so
//! rendering happens at the same single mutation point as every other command.
//!
//! Each started animation gets a new generation number. Cancelling aborts the
//! task and bumps the generation, so frame requests that were already queued
//! when the cancel happened are recognised as stale and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dispatcher::Request;

/// Owner of the running animation task
#[derive(Debug)]
pub struct AnimationScheduler {
    interval: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl AnimationScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            task: None,
        }
    }

    /// Start ticking, replacing any running animation
    ///
    /// Returns the generation that frame requests will carry.
    pub fn start(&mut self, requests: mpsc::Sender<Request>) -> u64 {
        self.cancel();
        let generation = self.generation;
        let interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut tick: u32 = 0;
            loop {
                ticker.tick().await;
                match requests.try_send(Request::AnimationFrame { generation, tick }) {
                    Ok(()) => {}
                    // Dispatcher busy: drop this frame, the next one supersedes it
                    Err(TrySendError::Full(_)) => {
                        crate::log_trace!("animation frame {} dropped", tick);
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
                tick = tick.wrapping_add(1);
            }
        }));

        crate::log_debug!("animation generation {} started", generation);
        generation
    }

    /// Stop the running animation, if any
    ///
    /// Returns `true` if an animation was running.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.task.take() {
            Some(task) => {
                task.abort();
                crate::log_debug!("animation cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a frame request belongs to the running animation
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for AnimationScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
