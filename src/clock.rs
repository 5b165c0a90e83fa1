//! Analog clock hand geometry.
//!
//! Angles are in degrees, measured clockwise from the 12 o'clock position, and
//! move continuously: the hour hand creeps with minutes and seconds, the
//! minute hand with seconds.

use chrono::Timelike;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

pub fn hand_angles<T: Timelike>(time: &T) -> HandAngles {
    let h = f64::from(time.hour() % 12);
    let m = f64::from(time.minute());
    let s = f64::from(time.second());

    HandAngles {
        hour: 30.0 * (h + m / 60.0 + s / 3600.0),
        minute: 6.0 * (m + s / 60.0),
        second: 6.0 * s,
    }
}

/// Angle of the minute hand at `time`. The overlay sweep starts here.
pub fn minute_angle<T: Timelike>(time: &T) -> f64 {
    hand_angles(time).minute
}

/// Canvas coordinates (y pointing up) of a hand tip of `length` at `angle`.
pub fn hand_tip(angle: f64, length: f64) -> (f64, f64) {
    let rad = angle.to_radians();
    (length * rad.sin(), length * rad.cos())
}
