//! LED animation patterns
//!
//! Each pattern renders a frame as a pure function of the tick count, so an
//! animation has no history beyond "which pattern" and "how many ticks". The
//! timing (tick interval, cancellation) lives in the server's scheduler.

use smart_leds::hsv::{hsv2rgb, Hsv};
use smart_leds::RGB8;

use crate::led::LedMode;

/// Hue advance per tick for the rainbow (full cycle every 64 ticks)
pub const RAINBOW_HUE_STEP: u8 = 4;

/// Number of consecutive lit pixels in the chase window
pub const CHASE_WIDTH: usize = 3;

/// Timed LED pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Hue wheel spread across the strip, rotating over time
    Rainbow,
    /// A short window of the given colour sweeping along the strip
    Chase(RGB8),
}

impl Pattern {
    /// LED mode reported while this pattern runs
    pub fn mode(&self) -> LedMode {
        match self {
            Self::Rainbow => LedMode::Rainbow,
            Self::Chase(_) => LedMode::Chase,
        }
    }

    /// Wire action name that starts this pattern
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::Rainbow => "animation_rainbow",
            Self::Chase(_) => "animation_chase",
        }
    }

    /// Render frame `tick` into `out`
    pub fn render(&self, tick: u32, out: &mut [RGB8]) {
        match self {
            Self::Rainbow => render_rainbow(tick, out),
            Self::Chase(color) => render_chase(*color, tick, out),
        }
    }
}

fn render_rainbow(tick: u32, out: &mut [RGB8]) {
    let len = out.len();
    if len == 0 {
        return;
    }
    let base_hue = (tick as u8).wrapping_mul(RAINBOW_HUE_STEP);
    for (i, pixel) in out.iter_mut().enumerate() {
        let offset = ((i * 256) / len) as u8;
        *pixel = hsv2rgb(Hsv {
            hue: base_hue.wrapping_add(offset),
            sat: 255,
            val: 255,
        });
    }
}

fn render_chase(color: RGB8, tick: u32, out: &mut [RGB8]) {
    let len = out.len();
    if len == 0 {
        return;
    }
    let head = tick as usize % len;
    out.iter_mut().for_each(|p| *p = RGB8::default());
    for offset in 0..CHASE_WIDTH.min(len) {
        out[(head + offset) % len] = color;
    }
}
