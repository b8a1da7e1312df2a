//! Failsafe: session registry, disconnect policy and command watchdog
//!
//! Loss of control authority (controller disconnect, or command silence while
//! driving) must end in the motors being stopped. This module only decides
//! *when*; the dispatcher performs the stop through its normal `stop` path.
//!
//! The "active controller" is the session whose `motor_control` put the
//! motors in their current non-stop state. Sending `stop` (or any forced stop)
//! clears it, so a session that only ever stopped the rover never holds
//! authority.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{FailsafeConfig, FailsafePolicy};
use crate::dispatcher::Request;
use crate::hub::SessionId;

/// Cancellable one-shot timer that posts a request to the dispatcher
///
/// Re-arming or disarming bumps the generation; a request posted by an older
/// arm is ignored by [`Deadline::is_current`].
#[derive(Debug, Default)]
pub struct Deadline {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Deadline {
    /// (Re)arm: after `delay`, send `make(generation)` to `requests`
    pub fn arm(
        &mut self,
        delay: Duration,
        requests: mpsc::Sender<Request>,
        make: fn(u64) -> Request,
    ) -> u64 {
        self.disarm();
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = requests.send(make(generation)).await;
        }));
        generation
    }

    /// Cancel the pending deadline; returns `true` if one was armed
    pub fn disarm(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Whether `generation` is the live arm; consumes it if so
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.task.is_some() && generation == self.generation {
            self.task = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Session registry and stop policy
#[derive(Debug)]
pub struct Failsafe {
    policy: FailsafePolicy,
    command_timeout: Option<Duration>,
    sessions: HashSet<SessionId>,
    controller: Option<SessionId>,
    watchdog: Deadline,
}

impl Failsafe {
    pub fn new(config: &FailsafeConfig) -> Self {
        let command_timeout = (config.command_timeout_ms > 0)
            .then(|| Duration::from_millis(config.command_timeout_ms));
        Self {
            policy: config.policy,
            command_timeout,
            sessions: HashSet::new(),
            controller: None,
            watchdog: Deadline::default(),
        }
    }

    pub fn session_opened(&mut self, session: SessionId) {
        self.sessions.insert(session);
    }

    /// Forget a session; returns `true` if the motors must be stopped
    ///
    /// The active controller leaving always requires a stop. Under
    /// [`FailsafePolicy::AnySession`] every other disconnect does too.
    pub fn session_closed(&mut self, session: SessionId) -> bool {
        if !self.sessions.remove(&session) {
            return false;
        }
        if self.controller == Some(session) {
            self.controller = None;
            return true;
        }
        match self.policy {
            FailsafePolicy::AnySession => true,
            FailsafePolicy::ActiveController => false,
        }
    }

    /// Record who owns the motor state now in force (`None` once stopped)
    pub fn set_controller(&mut self, controller: Option<SessionId>) {
        self.controller = controller;
    }

    pub fn controller(&self) -> Option<SessionId> {
        self.controller
    }

    /// Restart the silence timer while driving, or cancel it once stopped
    pub fn feed_watchdog(&mut self, running: bool, requests: &mpsc::Sender<Request>) {
        match self.command_timeout {
            Some(timeout) if running => {
                self.watchdog.arm(timeout, requests.clone(), |generation| {
                    Request::WatchdogExpired { generation }
                });
            }
            _ => {
                self.watchdog.disarm();
            }
        }
    }

    /// Whether a watchdog expiry is still valid
    pub fn watchdog_fired(&mut self, generation: u64) -> bool {
        self.watchdog.fire(generation)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn policy(&self) -> FailsafePolicy {
        self.policy
    }
}
