//! Completion alerts: a synthesized tone and a desktop notification.

use std::f64::consts::PI;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use notify_rust::{Notification, Urgency};

pub const NOTIFICATION_TITLE: &str = "Focus Session Complete!";

const TONE_HZ: f64 = 440.0;
const TONE_SECS: f64 = 0.5;
const TONE_GAIN: f64 = 0.1;
const SAMPLE_RATE: u32 = 22_050;

/// Something that tells the user a session finished.
pub trait Notifier {
    fn session_complete(&mut self, total_sessions: u32, streak: u32);
}

pub fn notification_body(total_sessions: u32, streak: u32) -> String {
    let sessions = if total_sessions == 1 { "session" } else { "sessions" };
    let days = if streak == 1 { "day" } else { "days" };
    format!("{total_sessions} {sessions} completed • 🔥 {streak} {days} streak")
}

/// Mono 16-bit PCM WAV of a sine tone with a short linear fade-out.
pub fn sine_wav(freq: f64, secs: f64, gain: f64, sample_rate: u32) -> Vec<u8> {
    let samples = (secs * f64::from(sample_rate)) as u32;
    let data_len = samples * 2;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());

    for n in 0..samples {
        let t = f64::from(n) / f64::from(sample_rate);
        let fade = 1.0 - f64::from(n) / f64::from(samples);
        let v = (2.0 * PI * freq * t).sin() * gain * fade;
        wav.extend_from_slice(&((v * f64::from(i16::MAX)) as i16).to_le_bytes());
    }
    wav
}

fn play_tone(path: &Path) -> io::Result<()> {
    std::fs::write(path, sine_wav(TONE_HZ, TONE_SECS, TONE_GAIN, SAMPLE_RATE))?;
    for player in ["paplay", "aplay", "afplay"] {
        let spawned = Command::new(player)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if spawned.is_ok() {
            return Ok(());
        }
    }
    Err(io::Error::new(io::ErrorKind::NotFound, "no audio player available"))
}

pub struct DesktopNotifier {
    sound_enabled: bool,
    notifications_enabled: bool,
    tone_path: PathBuf,
}

impl DesktopNotifier {
    pub fn new(sound_enabled: bool, notifications_enabled: bool) -> Self {
        Self {
            sound_enabled,
            notifications_enabled,
            tone_path: std::env::temp_dir().join("focusclock-tone.wav"),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn session_complete(&mut self, total_sessions: u32, streak: u32) {
        if self.sound_enabled {
            let path = self.tone_path.clone();
            std::thread::spawn(move || {
                if let Err(e) = play_tone(&path) {
                    tracing::debug!(error = %e, "completion tone unavailable");
                }
            });
        }

        if !self.notifications_enabled {
            tracing::debug!("desktop notifications not permitted, skipping");
            return;
        }
        let shown = Notification::new()
            .summary(NOTIFICATION_TITLE)
            .body(&notification_body(total_sessions, streak))
            .appname("focusclock")
            .icon("alarm-clock")
            .urgency(Urgency::Normal)
            .show();
        if let Err(e) = shown {
            tracing::debug!(error = %e, "desktop notification failed");
        }
    }
}
