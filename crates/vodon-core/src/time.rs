//! Time representation for the shared review timeline
//!
//! Uses rational numbers so that frame steps and bookmark instants compare
//! exactly. All time values are numerator/denominator pairs of seconds.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// An instant on the shared review timeline, or a signed distance between two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RationalTime {
    /// Seconds, always reduced
    value: Rational64,
}

impl RationalTime {
    /// `numerator / denominator` seconds, reduced.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Whole seconds.
    #[inline]
    pub fn from_secs(seconds: i64) -> Self {
        Self::new(seconds, 1)
    }

    /// Start of frame `frames` at `rate`, counted from zero.
    #[inline]
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        Self {
            value: Rational64::new(frames * rate.denominator as i64, rate.numerator as i64),
        }
    }

    /// Float seconds from a player or a config file, rounded to the
    /// microsecond. NaN and infinities become zero.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000_000;
        if !seconds.is_finite() {
            return Self::ZERO;
        }
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    /// Lossy float view for display and player APIs.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Index of the frame showing at this instant. Rounds toward negative
    /// infinity, so instants before zero map to negative frames.
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> i64 {
        let frames_rational =
            self.value * Rational64::new(rate.numerator as i64, rate.denominator as i64);
        frames_rational.floor().to_integer()
    }

    /// Start of the shared timeline.
    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    /// One second.
    pub const ONE: Self = Self {
        value: Rational64::new_raw(1, 1),
    };

    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }

    /// Before the start of the timeline.
    #[inline]
    pub fn is_negative(self) -> bool {
        *self.value.numer() < 0
    }

    /// Distance from zero, used for drift checks.
    #[inline]
    pub fn abs(self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self
        }
    }

    /// Format as `H:MM:SS` (whole seconds, rounded), the transport display format.
    pub fn to_hms(self) -> String {
        let total = self.to_seconds_f64().round() as i64;
        let sign = if total < 0 { "-" } else { "" };
        let total = total.abs();
        format!(
            "{}{}:{:02}:{:02}",
            sign,
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self { value: -self.value }
    }
}

impl Mul<i64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self {
            value: self.value * rhs,
        }
    }
}

impl Div<i64> for RationalTime {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self {
            value: self.value / rhs,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Nominal frame rate of a video stream, read from its container metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Frames per `denominator` seconds
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Parse an ffprobe-style rate such as `"30000/1001"` or `"25"`.
    pub fn parse(text: &str) -> Option<Self> {
        let (num, den) = match text.split_once('/') {
            Some((n, d)) => (n.trim().parse().ok()?, d.trim().parse().ok()?),
            None => (text.trim().parse().ok()?, 1),
        };
        let rate = Self::new(num, den);
        rate.is_valid().then_some(rate)
    }

    /// Both terms are non-zero.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// Approximate fps for display.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Exact length of one frame, the unit of a frame step.
    #[inline]
    pub fn frame_duration(self) -> RationalTime {
        RationalTime::new(self.denominator as i64, self.numerator as i64)
    }

    // Rates seen in screen and camera recordings.
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
