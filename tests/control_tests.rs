//! End-to-end tests: JSON frames in through the session loop, dispatcher,
//! recording actuators, JSON events out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{sink, stream};
use rover_link::config::{FailsafeConfig, FailsafePolicy};
use rover_link::dispatcher::{self, ControlHandle};
use rover_link::transport::{run_session, AppState};
use rover_link::{Actuators, DriverError, EventHub, ServerConfig};
use rover_link_core::animation::Pattern;
use rover_link_core::led::LedMode;
use rover_link_core::motor::{MotorAction, MotorState};
use rover_link_core::servo::ServoAxis;
use rover_link_core::RGB8;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Drive(MotorState),
    Aim(ServoAxis, u8),
    Show(Vec<RGB8>),
}

/// Actuators that record every call.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn drives(&self) -> Vec<MotorState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Drive(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn shows(&self) -> Vec<Vec<RGB8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Show(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Actuators for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn drive(&mut self, state: &MotorState) -> Result<(), DriverError> {
        self.calls.lock().unwrap().push(Call::Drive(*state));
        Ok(())
    }

    async fn aim(&mut self, axis: ServoAxis, angle_deg: u8) -> Result<(), DriverError> {
        self.calls.lock().unwrap().push(Call::Aim(axis, angle_deg));
        Ok(())
    }

    async fn show(&mut self, frame: &[RGB8]) -> Result<(), DriverError> {
        self.calls.lock().unwrap().push(Call::Show(frame.to_vec()));
        Ok(())
    }
}

struct Rig {
    hub: EventHub,
    control: ControlHandle,
    recorder: Recorder,
    dispatcher: JoinHandle<Recorder>,
}

impl Rig {
    fn new(config: ServerConfig) -> Self {
        let hub = EventHub::new(config.broadcast_capacity);
        let recorder = Recorder::default();
        let (control, dispatcher) = dispatcher::spawn(&config, recorder.clone(), hub.clone());
        Self {
            hub,
            control,
            recorder,
            dispatcher,
        }
    }

    /// Open a session and consume its `connected` greeting
    async fn connect(&self) -> Client {
        let (frames_tx, frames_rx) = mpsc::channel::<String>(16);
        let (events_tx, events_rx) = mpsc::unbounded_channel::<String>();

        let inbound = Box::pin(stream::unfold(frames_rx, |mut rx| async move {
            rx.recv().await.map(|text| (text, rx))
        }));
        let outbound = Box::pin(sink::unfold(events_tx, |tx, text: String| async move {
            tx.send(text).map_err(|_| ())?;
            Ok::<_, ()>(tx)
        }));

        let state = AppState {
            control: self.control.clone(),
            hub: self.hub.clone(),
        };
        let session = self.hub.next_session_id();
        let task = tokio::spawn(run_session(session, state, outbound, inbound));

        let mut client = Client {
            frames: Some(frames_tx),
            events: events_rx,
            task,
        };
        let greeting = client.next().await;
        assert_eq!(
            greeting,
            json!({"event": "status", "data": {"action": "connected", "speed": 0}})
        );
        client
    }

    async fn snapshot(&self) -> rover_link::state::Snapshot {
        self.control.snapshot().await.unwrap()
    }
}

struct Client {
    frames: Option<mpsc::Sender<String>>,
    events: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl Client {
    async fn send(&self, frame: Value) {
        self.send_text(&frame.to_string()).await;
    }

    async fn send_text(&self, text: &str) {
        self.frames
            .as_ref()
            .expect("client disconnected")
            .send(text.to_string())
            .await
            .unwrap();
    }

    async fn next(&mut self) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("session ended");
        serde_json::from_str(&text).unwrap()
    }

    /// Skip events until one named `name` arrives
    async fn next_named(&mut self, name: &str) -> Value {
        loop {
            let event = self.next().await;
            if event["event"] == name {
                return event["data"].clone();
            }
        }
    }

    async fn disconnect(mut self) {
        self.frames.take();
        self.task.await.unwrap();
    }
}

fn motor(action: &str, speed: i64) -> Value {
    json!({"event": "motor_control", "data": {"action": action, "speed": speed, "duration": 0}})
}

fn led(data: Value) -> Value {
    json!({"event": "led_control", "data": data})
}

#[tokio::test]
async fn motor_command_is_broadcast_to_every_session() {
    let rig = Rig::new(ServerConfig::default());
    let mut driver = rig.connect().await;
    let mut observer = rig.connect().await;

    driver.send(motor("forward", 60)).await;

    let expected = json!({"event": "status", "data": {"action": "forward", "speed": 60}});
    assert_eq!(driver.next().await, expected);
    assert_eq!(observer.next().await, expected);
    assert_eq!(
        rig.recorder.drives().last(),
        Some(&MotorState::new(MotorAction::Forward, 60))
    );
}

#[tokio::test]
async fn out_of_range_speed_is_rejected_without_actuation() {
    let rig = Rig::new(ServerConfig::default());
    let mut driver = rig.connect().await;
    let mut observer = rig.connect().await;

    driver.send(motor("forward", 150)).await;
    let error = driver.next().await;
    assert_eq!(error["event"], "error");

    // The observer's next event is its own status reply, not a broadcast
    observer.send(json!({"event": "get_status"})).await;
    let status = observer.next().await;
    assert_eq!(
        status,
        json!({"event": "status", "data": {"action": "stop", "speed": 0, "connected": true}})
    );

    assert_eq!(rig.recorder.drives(), vec![MotorState::stopped()]);
}

#[tokio::test]
async fn missing_speed_defaults_to_half() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(json!({"event": "motor_control", "data": {"action": "backward"}}))
        .await;
    let status = client.next_named("status").await;
    assert_eq!(status, json!({"action": "backward", "speed": 50}));
}

#[tokio::test]
async fn malformed_frames_report_errors_to_sender() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client.send_text("{not json").await;
    assert_eq!(client.next().await["event"], "error");

    client.send(json!({"event": "warp_drive", "data": {}})).await;
    let error = client.next().await;
    assert_eq!(error["event"], "error");
    assert!(error["data"]["message"]
        .as_str()
        .unwrap()
        .contains("warp_drive"));

    client
        .send(json!({"event": "motor_control", "data": {"action": "forward", "speed": "fast"}}))
        .await;
    assert_eq!(client.next().await["event"], "error");

    let snapshot = rig.snapshot().await;
    assert_eq!(snapshot.state.motor, MotorState::stopped());
}

#[tokio::test]
async fn repeated_stop_does_not_touch_the_motors() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client.send(motor("forward", 30)).await;
    client.send(motor("stop", 0)).await;
    client.send(motor("stop", 0)).await;
    for _ in 0..3 {
        client.next_named("status").await;
    }

    assert_eq!(
        rig.recorder.drives(),
        vec![
            MotorState::stopped(),
            MotorState::new(MotorAction::Forward, 30),
            MotorState::stopped(),
        ]
    );
}

#[tokio::test]
async fn servo_angle_is_clamped_to_limits() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(json!({"event": "servo_angle", "data": {"type": "pitch", "angle": 270}}))
        .await;
    assert_eq!(
        client.next().await,
        json!({"event": "servo_status", "data": {"type": "pitch", "angle": 180}})
    );

    client
        .send(json!({"event": "servo_angle", "data": {"type": "yaw", "angle": -30}}))
        .await;
    assert_eq!(
        client.next_named("servo_status").await,
        json!({"type": "yaw", "angle": 0})
    );

    assert!(rig.recorder.calls().contains(&Call::Aim(ServoAxis::Pitch, 180)));
    assert!(rig.recorder.calls().contains(&Call::Aim(ServoAxis::Yaw, 0)));
}

#[tokio::test]
async fn servo_steps_clamp_and_center() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(json!({"event": "servo_angle", "data": {"type": "pitch", "angle": 178}}))
        .await;
    client.next_named("servo_status").await;

    let up = json!({"event": "servo_control", "data": {"type": "pitch", "direction": "up"}});
    client.send(up.clone()).await;
    assert_eq!(client.next_named("servo_status").await["angle"], 180);
    client.send(up).await;
    assert_eq!(client.next_named("servo_status").await["angle"], 180);

    client
        .send(json!({"event": "servo_control", "data": {"type": "yaw", "direction": "left"}}))
        .await;
    assert_eq!(client.next_named("servo_status").await["angle"], 85);

    client
        .send(json!({"event": "servo_control", "data": {"type": "pitch", "direction": "center"}}))
        .await;
    assert_eq!(
        client.next_named("servo_status").await,
        json!({"type": "pitch", "angle": 90})
    );

    // Yaw has no "up"
    client
        .send(json!({"event": "servo_control", "data": {"type": "yaw", "direction": "up"}}))
        .await;
    assert_eq!(client.next().await["event"], "error");
    assert_eq!(rig.snapshot().await.state.yaw.angle(), 85);
}

#[tokio::test]
async fn get_status_after_set_color_reports_every_pixel() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(led(json!({"action": "set_color", "led_index": -1, "r": 255, "g": 0, "b": 0})))
        .await;
    assert_eq!(
        client.next().await,
        json!({"event": "led_status", "data": {"action": "color_set", "led_index": -1, "r": 255, "g": 0, "b": 0}})
    );

    client.send(json!({"event": "get_status"})).await;
    assert_eq!(client.next().await["event"], "status");
    assert_eq!(
        client.next().await,
        json!({"event": "servo_status", "data": {"pitch": 90, "yaw": 90}})
    );
    let leds = client.next().await;
    assert_eq!(leds["event"], "led_status");
    assert_eq!(leds["data"]["action"], "snapshot");
    assert_eq!(leds["data"]["mode"], "solid_color");
    assert_eq!(leds["data"]["brightness"], 100);
    assert_eq!(leds["data"]["pixels"], json!(vec![[255, 0, 0]; 6]));
}

#[tokio::test]
async fn status_reply_goes_to_requester_only() {
    let rig = Rig::new(ServerConfig::default());
    let mut asker = rig.connect().await;
    let mut other = rig.connect().await;

    asker.send(json!({"event": "get_status"})).await;
    for _ in 0..3 {
        asker.next().await;
    }

    other.send(motor("left", 20)).await;
    // First thing the other session sees is its own command's broadcast
    assert_eq!(
        other.next().await,
        json!({"event": "status", "data": {"action": "left", "speed": 20}})
    );
}

#[tokio::test]
async fn single_led_set_color_changes_one_pixel() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(led(json!({"action": "set_color", "led_index": 2, "r": 0, "g": 255, "b": 0})))
        .await;
    assert_eq!(client.next_named("led_status").await["led_index"], 2);

    let snapshot = rig.snapshot().await;
    let pixels = snapshot.state.leds.pixels();
    for (i, pixel) in pixels.iter().enumerate() {
        let expected = if i == 2 {
            RGB8::new(0, 255, 0)
        } else {
            RGB8::default()
        };
        assert_eq!(*pixel, expected, "pixel {i}");
    }

    client
        .send(led(json!({"action": "set_color", "led_index": 6, "r": 1, "g": 1, "b": 1})))
        .await;
    assert_eq!(client.next().await["event"], "error");

    client
        .send(led(json!({"action": "set_color", "led_index": -2, "r": 1, "g": 1, "b": 1})))
        .await;
    assert_eq!(
        client.next().await,
        json!({"event": "error", "data": {"message": "LED index -2 out of range (-1 or 0-5)"}})
    );
}

#[tokio::test]
async fn brightness_scales_output_but_not_stored_colour() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(led(json!({"action": "set_color", "r": 200, "g": 100, "b": 50})))
        .await;
    client.next_named("led_status").await;
    client
        .send(led(json!({"action": "set_brightness", "brightness": 50})))
        .await;
    assert_eq!(
        client.next_named("led_status").await,
        json!({"action": "brightness_set", "led_index": -1, "r": 200, "g": 100, "b": 50, "brightness": 50})
    );

    let last = rig.recorder.shows().pop().unwrap();
    assert_eq!(last, vec![RGB8::new(100, 50, 25); 6]);
    let snapshot = rig.snapshot().await;
    assert_eq!(snapshot.state.leds.pixels(), &[RGB8::new(200, 100, 50); 6]);

    client
        .send(led(json!({"action": "set_brightness", "brightness": 101})))
        .await;
    assert_eq!(client.next().await["event"], "error");
}

#[tokio::test(start_paused = true)]
async fn starting_chase_replaces_rainbow() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client.send(led(json!({"action": "animation_rainbow"}))).await;
    assert_eq!(
        client.next_named("led_status").await["action"],
        "animation_rainbow"
    );
    tokio::time::sleep(Duration::from_millis(200)).await;

    client
        .send(led(json!({"action": "animation_chase", "r": 0, "g": 0, "b": 255})))
        .await;
    assert_eq!(
        client.next_named("led_status").await,
        json!({"action": "animation_chase", "led_index": -1, "r": 0, "g": 0, "b": 255})
    );
    let shows_at_switch = rig.recorder.shows().len();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = rig.snapshot().await;
    assert_eq!(snapshot.state.leds.mode(), LedMode::Chase);
    assert_eq!(
        snapshot.state.leds.animation(),
        Some(Pattern::Chase(RGB8::new(0, 0, 255)))
    );

    let blue = RGB8::new(0, 0, 255);
    let frames = rig.recorder.shows();
    assert!(frames.len() > shows_at_switch);
    for frame in &frames[shows_at_switch..] {
        assert!(
            frame.iter().all(|&p| p == blue || p == RGB8::default()),
            "rainbow frame after chase started: {frame:?}"
        );
        assert_eq!(frame.iter().filter(|&&p| p == blue).count(), 3);
    }
}

#[tokio::test(start_paused = true)]
async fn off_cancels_animation_and_blanks_strip() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client.send(led(json!({"action": "animation_rainbow"}))).await;
    client.next_named("led_status").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    client.send(led(json!({"action": "off"}))).await;
    assert_eq!(
        client.next_named("led_status").await,
        json!({"action": "off", "led_index": -1, "r": 0, "g": 0, "b": 0})
    );
    let shows_after_off = rig.recorder.shows().len();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = rig.snapshot().await;
    assert_eq!(snapshot.state.leds.mode(), LedMode::Off);
    assert_eq!(snapshot.state.leds.animation(), None);
    assert_eq!(rig.recorder.shows().len(), shows_after_off);
    assert_eq!(
        rig.recorder.shows().last().unwrap(),
        &vec![RGB8::default(); 6]
    );
}

#[tokio::test]
async fn controller_disconnect_stops_motors() {
    let rig = Rig::new(ServerConfig::default());
    let driver = rig.connect().await;
    let mut observer = rig.connect().await;

    driver.send(motor("forward", 60)).await;
    observer.next_named("status").await;

    driver.disconnect().await;
    assert_eq!(
        observer.next().await,
        json!({"event": "status", "data": {"action": "stop", "speed": 0}})
    );

    let snapshot = rig.snapshot().await;
    assert_eq!(snapshot.state.motor, MotorState::stopped());
    assert_eq!(snapshot.sessions, 1);
    assert_eq!(rig.recorder.drives().last(), Some(&MotorState::stopped()));
}

fn active_controller_config() -> ServerConfig {
    ServerConfig {
        failsafe: FailsafeConfig {
            policy: FailsafePolicy::ActiveController,
            command_timeout_ms: 0,
        },
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn observer_disconnect_stops_by_default() {
    let rig = Rig::new(ServerConfig::default());
    let mut driver = rig.connect().await;
    let observer = rig.connect().await;

    driver.send(motor("forward", 40)).await;
    driver.next_named("status").await;
    observer.disconnect().await;

    assert_eq!(driver.next_named("status").await["action"], "stop");
    assert_eq!(rig.snapshot().await.state.motor, MotorState::stopped());
}

#[tokio::test]
async fn observer_disconnect_keeps_active_controller_driving() {
    let rig = Rig::new(active_controller_config());
    let mut driver = rig.connect().await;
    let observer = rig.connect().await;

    driver.send(motor("right", 40)).await;
    driver.next_named("status").await;
    observer.disconnect().await;

    let snapshot = rig.snapshot().await;
    assert_eq!(snapshot.state.motor, MotorState::new(MotorAction::Right, 40));
}

#[tokio::test]
async fn session_that_only_stopped_holds_no_authority() {
    let rig = Rig::new(active_controller_config());
    let driver = rig.connect().await;
    let mut idle = rig.connect().await;

    // A blurred tab sends stop, then another tab takes over
    idle.send(motor("stop", 0)).await;
    idle.next_named("status").await;
    driver.send(motor("forward", 60)).await;
    assert_eq!(idle.next_named("status").await["action"], "forward");

    driver.disconnect().await;
    assert_eq!(
        idle.next().await,
        json!({"event": "status", "data": {"action": "stop", "speed": 0}})
    );
    assert_eq!(rig.snapshot().await.state.motor, MotorState::stopped());
}

#[tokio::test]
async fn authority_follows_the_latest_driver() {
    let rig = Rig::new(active_controller_config());
    let mut first = rig.connect().await;
    let second = rig.connect().await;

    first.send(motor("forward", 30)).await;
    first.next_named("status").await;
    second.send(motor("left", 50)).await;
    first.next_named("status").await;

    // The first driver no longer owns the motion
    first.disconnect().await;
    assert_eq!(
        rig.snapshot().await.state.motor,
        MotorState::new(MotorAction::Left, 50)
    );

    second.disconnect().await;
    assert_eq!(rig.snapshot().await.state.motor, MotorState::stopped());
}

#[tokio::test]
async fn zero_speed_drive_is_stopped_on_disconnect() {
    let rig = Rig::new(active_controller_config());
    let mut driver = rig.connect().await;

    driver.send(motor("forward", 0)).await;
    assert_eq!(
        driver.next_named("status").await,
        json!({"action": "forward", "speed": 0})
    );
    driver.disconnect().await;

    assert_eq!(rig.snapshot().await.state.motor, MotorState::stopped());
    assert_eq!(rig.recorder.drives().last(), Some(&MotorState::stopped()));
}

#[tokio::test(start_paused = true)]
async fn bounded_duration_auto_stops() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(json!({"event": "motor_control", "data": {"action": "forward", "speed": 50, "duration": 300}}))
        .await;
    assert_eq!(client.next_named("status").await["action"], "forward");

    let stopped = client.next_named("status").await;
    assert_eq!(stopped, json!({"action": "stop", "speed": 0}));
    assert_eq!(rig.snapshot().await.state.motor, MotorState::stopped());
}

#[tokio::test(start_paused = true)]
async fn later_command_cancels_auto_stop() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client
        .send(json!({"event": "motor_control", "data": {"action": "forward", "speed": 50, "duration": 300}}))
        .await;
    client.next_named("status").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    client.send(motor("left", 50)).await;
    client.next_named("status").await;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(
        rig.snapshot().await.state.motor,
        MotorState::new(MotorAction::Left, 50)
    );
}

#[tokio::test(start_paused = true)]
async fn watchdog_stops_silent_driver() {
    let config = ServerConfig {
        failsafe: FailsafeConfig {
            policy: FailsafePolicy::ActiveController,
            command_timeout_ms: 500,
        },
        ..ServerConfig::default()
    };
    let rig = Rig::new(config);
    let mut client = rig.connect().await;

    client.send(motor("forward", 80)).await;
    client.next_named("status").await;

    // Keep-alive commands hold the watchdog off
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        client.send(motor("forward", 80)).await;
        assert_eq!(client.next_named("status").await["action"], "forward");
    }

    let stopped = client.next_named("status").await;
    assert_eq!(stopped, json!({"action": "stop", "speed": 0}));
    assert_eq!(rig.snapshot().await.state.motor, MotorState::stopped());
}

#[tokio::test]
async fn shutdown_stops_motors_and_clears_leds() {
    let rig = Rig::new(ServerConfig::default());
    let mut client = rig.connect().await;

    client.send(motor("backward", 70)).await;
    client
        .send(led(json!({"action": "set_color", "r": 9, "g": 9, "b": 9})))
        .await;
    client.next_named("led_status").await;

    rig.control.shutdown().await.unwrap();
    rig.dispatcher.await.unwrap();

    assert_eq!(rig.recorder.drives().last(), Some(&MotorState::stopped()));
    assert_eq!(
        rig.recorder.shows().last().unwrap(),
        &vec![RGB8::default(); 6]
    );
    // Session loop notices the dispatcher is gone on its next frame
    client.send(json!({"event": "get_status"})).await;
    client.task.await.unwrap();
}
