//! Command dispatcher
//!
//! Single owner of [`VehicleState`] and the actuator backend. Every mutation
//! (client commands, animation frames, auto-stop, failsafe) arrives as a
//! [`Request`] on one bounded queue and is applied in arrival order.
//!
//! # Architecture
//!
//! ```text
//! sessions ──ControlHandle──┐
//! animation task ───────────┼──> mpsc<Request> ──> Dispatcher ──> Actuators
//! auto-stop / watchdog ─────┘                          │
//!                                                      └──> EventHub (broadcast)
//! ```
//!
//! # Rules
//!
//! - Commands are validated before anything is touched; a rejected command
//!   leaves state and hardware unchanged and only the requester is told.
//! - State is committed only after the driver call succeeds, so the store
//!   always reflects the last actuation that actually happened.
//! - A motor command equal to the current motor state makes no driver call.

use std::time::Duration;

use rover_link_core::command::{Command, LedCommand, MotorCommand};
use rover_link_core::led::LedState;
use rover_link_core::motor::MotorState;
use rover_link_core::servo::ServoAxis;
use rover_link_core::RGB8;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::animation::AnimationScheduler;
use crate::config::ServerConfig;
use crate::drivers::Actuators;
use crate::error::ControlError;
use crate::failsafe::{Deadline, Failsafe};
use crate::hub::{EventHub, SessionId};
use crate::protocol::{LedStatusPayload, ServerEvent, StatusPayload};
use crate::state::{Snapshot, VehicleState};

/// Message to the dispatcher task
#[derive(Debug)]
pub enum Request {
    /// Validated client command
    Command {
        session: SessionId,
        command: Command,
    },
    SessionOpened {
        session: SessionId,
    },
    SessionClosed {
        session: SessionId,
    },
    /// Render frame `tick` of animation `generation`
    AnimationFrame {
        generation: u64,
        tick: u32,
    },
    /// Bounded drive duration elapsed
    AutoStop {
        generation: u64,
    },
    /// No command received within the configured timeout
    WatchdogExpired {
        generation: u64,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    /// Stop everything and exit the dispatcher loop
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Cloneable handle for submitting requests to the dispatcher
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Request>,
}

impl ControlHandle {
    async fn send(&self, request: Request) -> Result<(), ControlError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| ControlError::Unavailable)
    }

    /// Queue a validated command from `session`
    pub async fn submit(&self, session: SessionId, command: Command) -> Result<(), ControlError> {
        self.send(Request::Command { session, command }).await
    }

    pub async fn open_session(&self, session: SessionId) -> Result<(), ControlError> {
        self.send(Request::SessionOpened { session }).await
    }

    pub async fn close_session(&self, session: SessionId) -> Result<(), ControlError> {
        self.send(Request::SessionClosed { session }).await
    }

    /// Copy of the current state, taken after every request queued before it
    pub async fn snapshot(&self) -> Result<Snapshot, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Snapshot { reply }).await?;
        rx.await.map_err(|_| ControlError::Unavailable)
    }

    /// Stop motors, blank LEDs and end the dispatcher; resolves once done
    pub async fn shutdown(&self) -> Result<(), ControlError> {
        let (done, rx) = oneshot::channel();
        self.send(Request::Shutdown { done }).await?;
        rx.await.map_err(|_| ControlError::Unavailable)
    }
}

/// Start the dispatcher task
///
/// The task ends after a shutdown request (or once every sender is gone) and
/// hands the actuator backend back.
pub fn spawn<A>(config: &ServerConfig, actuators: A, hub: EventHub) -> (ControlHandle, JoinHandle<A>)
where
    A: Actuators + 'static,
{
    let (tx, rx) = mpsc::channel(config.queue_depth);
    let dispatcher = Dispatcher {
        state: VehicleState::new(config),
        actuators,
        hub,
        animation: AnimationScheduler::new(Duration::from_millis(config.animation_interval_ms)),
        auto_stop: Deadline::default(),
        failsafe: Failsafe::new(&config.failsafe),
        requests: tx.downgrade(),
        rx,
    };
    (ControlHandle { tx }, tokio::spawn(dispatcher.run()))
}

struct Dispatcher<A: Actuators> {
    state: VehicleState,
    actuators: A,
    hub: EventHub,
    animation: AnimationScheduler,
    auto_stop: Deadline,
    failsafe: Failsafe,
    /// Weak so that dropping every handle lets the loop end
    requests: mpsc::WeakSender<Request>,
    rx: mpsc::Receiver<Request>,
}

impl<A: Actuators> Dispatcher<A> {
    async fn run(mut self) -> A {
        crate::log_info!("Dispatcher started ({} actuators)", self.actuators.name());
        self.initialize().await;

        while let Some(request) = self.rx.recv().await {
            match request {
                Request::Command { session, command } => {
                    self.handle_command(session, command).await;
                }
                Request::SessionOpened { session } => self.session_opened(session),
                Request::SessionClosed { session } => self.session_closed(session).await,
                Request::AnimationFrame { generation, tick } => {
                    self.animation_frame(generation, tick).await;
                }
                Request::AutoStop { generation } => {
                    if self.auto_stop.fire(generation) {
                        self.force_stop("drive duration elapsed").await;
                    }
                }
                Request::WatchdogExpired { generation } => {
                    if self.failsafe.watchdog_fired(generation) && self.state.motor.is_running() {
                        self.force_stop("command timeout").await;
                    }
                }
                Request::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                Request::Shutdown { done } => {
                    self.shutdown().await;
                    let _ = done.send(());
                    break;
                }
            }
        }

        crate::log_info!("Dispatcher stopped");
        self.actuators
    }

    /// Put the hardware in the state the store starts with
    async fn initialize(&mut self) {
        if let Err(e) = self.actuators.drive(&self.state.motor).await {
            crate::log_error!("Failed to stop motors at startup: {}", e);
        }
        for axis in [ServoAxis::Pitch, ServoAxis::Yaw] {
            let angle = self.state.servo(axis).angle();
            if let Err(e) = self.actuators.aim(axis, angle).await {
                crate::log_error!("Failed to center {} servo: {}", axis.as_str(), e);
            }
        }
        if let Err(e) = self.actuators.show(&self.state.leds.output_frame()).await {
            crate::log_error!("Failed to clear LED strip: {}", e);
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.state
            .snapshot(self.failsafe.session_count(), self.actuators.is_connected())
    }

    async fn handle_command(&mut self, session: SessionId, command: Command) {
        let result = match command {
            Command::Motor(motor) => self.motor_control(session, motor).await,
            Command::ServoStep { axis, direction } => {
                match self.state.servo(axis).angle_for_nudge(direction) {
                    Ok(angle) => self.aim(axis, angle).await,
                    Err(e) => Err(e.into()),
                }
            }
            Command::ServoAngle { axis, angle } => {
                let angle = self.state.servo(axis).angle_for_set(angle);
                self.aim(axis, angle).await
            }
            Command::Led(led) => self.led_control(led).await,
            Command::GetStatus => {
                let snapshot = self.snapshot();
                for event in snapshot.status_events() {
                    self.hub.send_to(session, event);
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            crate::log_warn!("Session {} command failed: {}", session, e);
            self.hub.send_to(session, ServerEvent::error(e.to_string()));
        }
        self.feed_watchdog();
    }

    async fn motor_control(
        &mut self,
        session: SessionId,
        command: MotorCommand,
    ) -> Result<(), ControlError> {
        self.drive(command.state).await?;
        self.auto_stop.disarm();
        self.failsafe
            .set_controller(command.state.is_running().then_some(session));

        if let Some(ms) = command.duration.as_millis() {
            if command.state.is_running() {
                if let Some(requests) = self.requests.upgrade() {
                    self.auto_stop
                        .arm(Duration::from_millis(u64::from(ms)), requests, |generation| {
                            Request::AutoStop { generation }
                        });
                    crate::log_debug!("auto-stop in {} ms", ms);
                }
            }
        }
        Ok(())
    }

    /// Apply a motor state and broadcast it; skips the driver if unchanged
    async fn drive(&mut self, next: MotorState) -> Result<(), ControlError> {
        if next != self.state.motor {
            self.actuators.drive(&next).await?;
            crate::log_info!("Motors: {} at {}", next.action().as_str(), next.speed());
            self.state.motor = next;
        }
        self.hub.broadcast(self.state.motor_status());
        Ok(())
    }

    /// Failsafe path: same as a client `stop`, plus cancelling auto-stop
    async fn force_stop(&mut self, reason: &str) {
        crate::log_warn!("Failsafe stop: {}", reason);
        self.auto_stop.disarm();
        match self.drive(MotorCommand::stop().state).await {
            Ok(()) => self.failsafe.set_controller(None),
            Err(e) => {
                crate::log_error!("Failsafe stop failed: {}", e);
                self.hub
                    .broadcast(ServerEvent::error(format!("failsafe stop failed: {e}")));
            }
        }
        self.feed_watchdog();
    }

    fn feed_watchdog(&mut self) {
        if let Some(requests) = self.requests.upgrade() {
            self.failsafe
                .feed_watchdog(self.state.motor.is_running(), &requests);
        }
    }

    async fn aim(&mut self, axis: ServoAxis, angle: u8) -> Result<(), ControlError> {
        self.actuators.aim(axis, angle).await?;
        self.state.servo_mut(axis).set_angle(i64::from(angle));
        crate::log_debug!("{} servo at {} deg", axis.as_str(), angle);
        self.hub.broadcast(self.state.servo_status(axis));
        Ok(())
    }

    async fn led_control(&mut self, command: LedCommand) -> Result<(), ControlError> {
        match command {
            LedCommand::SetColor { led_index, color } => {
                let target = self.state.leds.target(led_index)?;
                self.stop_animation();
                self.update_leds(|leds| leds.set_color(target, color)).await?;
                self.hub.broadcast(ServerEvent::LedStatus(LedStatusPayload::new(
                    "color_set",
                    target.as_index(),
                    color,
                )));
            }
            LedCommand::SetBrightness(brightness) => {
                self.update_leds(|leds| leds.set_brightness(brightness))
                    .await?;
                self.hub.broadcast(ServerEvent::LedStatus(LedStatusPayload {
                    brightness: Some(self.state.leds.brightness()),
                    ..LedStatusPayload::new("brightness_set", -1, self.state.leds.color())
                }));
            }
            LedCommand::Animate(pattern) => {
                let requests = self
                    .requests
                    .upgrade()
                    .ok_or(ControlError::Unavailable)?;
                self.animation.start(requests);
                self.state.leds.begin_animation(pattern);
                crate::log_info!("LED animation: {}", pattern.action_name());
                self.hub.broadcast(ServerEvent::LedStatus(LedStatusPayload::new(
                    pattern.action_name(),
                    -1,
                    self.state.leds.color(),
                )));
            }
            LedCommand::Off => {
                self.stop_animation();
                self.update_leds(LedState::off).await?;
                self.hub.broadcast(ServerEvent::LedStatus(LedStatusPayload::new(
                    "off",
                    -1,
                    RGB8::default(),
                )));
            }
        }
        Ok(())
    }

    fn stop_animation(&mut self) {
        if self.animation.cancel() {
            self.state.leds.end_animation();
        }
    }

    /// Show the edited strip, committing the edit only if the driver accepts it
    async fn update_leds(&mut self, edit: impl FnOnce(&mut LedState)) -> Result<(), ControlError> {
        let mut next = self.state.leds.clone();
        edit(&mut next);
        self.actuators.show(&next.output_frame()).await?;
        self.state.leds = next;
        Ok(())
    }

    async fn animation_frame(&mut self, generation: u64, tick: u32) {
        if !self.animation.is_current(generation) {
            crate::log_trace!("stale animation frame {} dropped", tick);
            return;
        }
        let result = self
            .update_leds(|leds| {
                leds.advance_animation(tick);
            })
            .await;
        if let Err(e) = result {
            crate::log_warn!("Animation frame {} failed: {}", tick, e);
        }
    }

    fn session_opened(&mut self, session: SessionId) {
        self.failsafe.session_opened(session);
        crate::log_info!(
            "Session {} connected ({} live)",
            session,
            self.failsafe.session_count()
        );
        self.hub.send_to(
            session,
            ServerEvent::Status(StatusPayload {
                action: "connected",
                speed: 0,
                connected: None,
            }),
        );
    }

    async fn session_closed(&mut self, session: SessionId) {
        let must_stop = self.failsafe.session_closed(session);
        crate::log_info!(
            "Session {} disconnected ({} live)",
            session,
            self.failsafe.session_count()
        );
        if must_stop && (self.state.motor.is_running() || self.auto_stop.is_armed()) {
            self.force_stop("session disconnected while driving").await;
        }
    }

    async fn shutdown(&mut self) {
        crate::log_info!("Shutting down: stopping motors and clearing LEDs");
        self.animation.cancel();
        self.auto_stop.disarm();
        self.state.leds.end_animation();

        match self.drive(MotorState::stopped()).await {
            Ok(()) => self.failsafe.set_controller(None),
            Err(e) => crate::log_error!("Failed to stop motors on shutdown: {}", e),
        }
        if let Err(e) = self.update_leds(LedState::off).await {
            crate::log_error!("Failed to clear LEDs on shutdown: {}", e);
        }
    }
}
