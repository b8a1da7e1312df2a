//! Addressable LED strip state
//!
//! Holds the commanded colour of every pixel plus a global brightness. The
//! stored pixel colours are what clients asked for; brightness is applied only
//! when producing the output frame, so dimming never loses colour information.

use heapless::Vec;
use smart_leds::RGB8;

use crate::animation::Pattern;
use crate::error::ValidationError;

/// Upper bound on strip length (fixed-capacity frames)
pub const MAX_LEDS: usize = 64;

/// Maximum brightness (percent)
pub const MAX_BRIGHTNESS: u8 = 100;

/// One colour per pixel
pub type Frame = Vec<RGB8, MAX_LEDS>;

/// What the strip is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Off,
    SolidColor,
    Rainbow,
    Chase,
}

impl LedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::SolidColor => "solid_color",
            Self::Rainbow => "rainbow",
            Self::Chase => "chase",
        }
    }
}

/// Pixel selection for a colour set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedTarget {
    /// Every pixel (wire `led_index: -1`)
    All,
    /// One pixel by zero-based index
    Single(usize),
}

impl LedTarget {
    /// Resolve a wire index against the configured strip length
    pub fn from_index(index: i64, led_count: usize) -> Result<Self, ValidationError> {
        match index {
            -1 => Ok(Self::All),
            i if i >= 0 && (i as u64) < led_count as u64 => Ok(Self::Single(i as usize)),
            _ => Err(ValidationError::LedIndexOutOfRange { index, led_count }),
        }
    }

    /// Wire form of this target
    pub fn as_index(&self) -> i64 {
        match self {
            Self::All => -1,
            Self::Single(i) => *i as i64,
        }
    }
}

/// Scale a colour by a 0-100 brightness
pub fn scale(color: RGB8, brightness: u8) -> RGB8 {
    let b = brightness.min(MAX_BRIGHTNESS) as u16;
    let channel = |c: u8| ((c as u16 * b) / MAX_BRIGHTNESS as u16) as u8;
    RGB8::new(channel(color.r), channel(color.g), channel(color.b))
}

/// Commanded LED strip state
#[derive(Debug, Clone, PartialEq)]
pub struct LedState {
    mode: LedMode,
    color: RGB8,
    brightness: u8,
    pixels: Frame,
    animation: Option<Pattern>,
}

impl LedState {
    /// Create a dark strip of `led_count` pixels (clamped to 1..=MAX_LEDS)
    pub fn new(led_count: usize) -> Self {
        let count = led_count.clamp(1, MAX_LEDS);
        let mut pixels = Frame::new();
        // Cannot fail: count <= MAX_LEDS
        let _ = pixels.resize(count, RGB8::default());
        Self {
            mode: LedMode::Off,
            color: RGB8::default(),
            brightness: MAX_BRIGHTNESS,
            pixels,
            animation: None,
        }
    }

    pub fn mode(&self) -> LedMode {
        self.mode
    }

    /// Last colour set through `set_color` or the chase colour
    pub fn color(&self) -> RGB8 {
        self.color
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Stored (unscaled) colour of every pixel
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    pub fn led_count(&self) -> usize {
        self.pixels.len()
    }

    /// Pattern the strip is animating, if any
    pub fn animation(&self) -> Option<Pattern> {
        self.animation
    }

    /// Resolve a wire index against this strip
    pub fn target(&self, index: i64) -> Result<LedTarget, ValidationError> {
        LedTarget::from_index(index, self.led_count())
    }

    /// Set one or all pixels to a static colour; ends any animation
    pub fn set_color(&mut self, target: LedTarget, color: RGB8) {
        match target {
            LedTarget::All => self.pixels.iter_mut().for_each(|p| *p = color),
            LedTarget::Single(i) => {
                if let Some(p) = self.pixels.get_mut(i) {
                    *p = color;
                }
            }
        }
        self.color = color;
        self.mode = LedMode::SolidColor;
        self.animation = None;
    }

    /// Set output brightness without touching stored colours
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.min(MAX_BRIGHTNESS);
    }

    /// Record that an animation now owns the strip
    pub fn begin_animation(&mut self, pattern: Pattern) {
        if let Pattern::Chase(color) = pattern {
            self.color = color;
        }
        self.mode = pattern.mode();
        self.animation = Some(pattern);
    }

    /// Render `tick` of the running animation into the pixels
    ///
    /// Returns `false` (and leaves pixels alone) if no animation is running.
    pub fn advance_animation(&mut self, tick: u32) -> bool {
        match self.animation {
            Some(pattern) => {
                pattern.render(tick, &mut self.pixels);
                true
            }
            None => false,
        }
    }

    /// Stop animating, keeping whatever frame was last written
    pub fn end_animation(&mut self) {
        if self.animation.take().is_some() {
            self.mode = LedMode::SolidColor;
        }
    }

    /// Blank every pixel and end any animation
    pub fn off(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = RGB8::default());
        self.animation = None;
        self.mode = LedMode::Off;
    }

    /// Brightness-scaled frame for the strip driver
    pub fn output_frame(&self) -> Frame {
        self.pixels
            .iter()
            .map(|&p| scale(p, self.brightness))
            .collect()
    }
}
