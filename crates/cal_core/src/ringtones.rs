//! Built-in alarm tones synthesized as sine sequences; no audio assets.

use crate::error::AppError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub const DEFAULT_RINGTONE_ID: u8 = 1;
/// Pause between repeats of the tone sequence, in milliseconds.
const REPEAT_GAP_MS: u32 = 300;
const PEAK_GAIN: f32 = 0.3;
const FLOOR_GAIN: f32 = 0.01;

/// One catalog entry: a note sequence (Hz, 0 = rest) played at a fixed
/// per-note spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ringtone {
    pub id: u8,
    pub name: &'static str,
    pub notes: &'static [u16],
    pub tempo_ms: u32,
}

pub const RINGTONES: [Ringtone; 10] = [
    Ringtone { id: 1, name: "Classic Bell", notes: &[880, 0, 880, 0, 880], tempo_ms: 200 },
    Ringtone { id: 2, name: "Gentle Chime", notes: &[523, 659, 784, 1047], tempo_ms: 300 },
    Ringtone { id: 3, name: "Alarm Clock", notes: &[800, 0, 800, 0, 800, 0, 800], tempo_ms: 150 },
    Ringtone { id: 4, name: "Melody Rise", notes: &[440, 494, 523, 587, 659, 698, 784, 880], tempo_ms: 180 },
    Ringtone { id: 5, name: "Digital Beep", notes: &[1200, 0, 1200, 0, 1200, 0], tempo_ms: 120 },
    Ringtone { id: 6, name: "Soft Wave", notes: &[330, 392, 440, 392, 330], tempo_ms: 350 },
    Ringtone { id: 7, name: "Piano Drop", notes: &[784, 659, 523, 440, 330], tempo_ms: 250 },
    Ringtone { id: 8, name: "Urgent Alert", notes: &[1000, 500, 1000, 500, 1000, 500], tempo_ms: 100 },
    Ringtone { id: 9, name: "Sparkle", notes: &[1047, 0, 880, 0, 1047, 0, 880, 0, 1047], tempo_ms: 130 },
    Ringtone { id: 10, name: "Trumpet Call", notes: &[523, 523, 523, 659, 784, 784], tempo_ms: 220 },
];

/// Look up a tone, falling back to the first entry for unknown ids.
pub fn ringtone_by_id(id: u8) -> &'static Ringtone {
    RINGTONES.iter().find(|tone| tone.id == id).unwrap_or(&RINGTONES[0])
}

/// Synthesize the playable sample buffer for a tone: each note occupies a
/// tempo-sized slot, sounds for 90% of it with an exponential decay from
/// peak to floor gain, and repeats are separated by a short gap.
pub fn render_samples(tone: &Ringtone, repeat: u32, sample_rate: u32) -> Vec<f32> {
    let slot = (sample_rate as u64 * tone.tempo_ms as u64 / 1000) as usize;
    let audible = slot * 9 / 10;
    let gap = (sample_rate as u64 * REPEAT_GAP_MS as u64 / 1000) as usize;

    let mut samples = Vec::with_capacity((slot * tone.notes.len() + gap) * repeat as usize);
    for round in 0..repeat {
        for &freq in tone.notes {
            if freq == 0 {
                samples.extend(std::iter::repeat_n(0.0, slot));
                continue;
            }
            for i in 0..slot {
                if i >= audible {
                    samples.push(0.0);
                    continue;
                }
                let t = i as f32 / sample_rate as f32;
                let envelope = PEAK_GAIN * (FLOOR_GAIN / PEAK_GAIN).powf(i as f32 / audible as f32);
                samples.push(envelope * (2.0 * std::f32::consts::PI * freq as f32 * t).sin());
            }
        }
        if round + 1 < repeat {
            samples.extend(std::iter::repeat_n(0.0, gap));
        }
    }
    samples
}

/// Cancel handle for an in-flight alarm.
#[derive(Debug, Clone)]
pub struct AlarmHandle {
    stopped: Arc<AtomicBool>,
}

impl AlarmHandle {
    fn new() -> Self {
        Self { stopped: Arc::new(AtomicBool::new(false)) }
    }

    fn inert() -> Self {
        let handle = Self::new();
        handle.stopped.store(true, Ordering::Relaxed);
        handle
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Plays a tone a given number of repetitions without blocking the caller.
pub trait AlarmPlayer: Send {
    fn play(&self, ringtone_id: u8, repeat: u32) -> Result<AlarmHandle, AppError>;
}

/// No-op player for headless runs and tests.
pub struct SilentPlayer;

impl AlarmPlayer for SilentPlayer {
    fn play(&self, _ringtone_id: u8, _repeat: u32) -> Result<AlarmHandle, AppError> {
        Ok(AlarmHandle::inert())
    }
}

/// Default-output-device player. Playback runs on a detached thread so
/// reminder scans never block on audio.
pub struct CpalPlayer;

impl AlarmPlayer for CpalPlayer {
    fn play(&self, ringtone_id: u8, repeat: u32) -> Result<AlarmHandle, AppError> {
        let tone = ringtone_by_id(ringtone_id);
        let handle = AlarmHandle::new();
        let stopped = Arc::clone(&handle.stopped);
        std::thread::spawn(move || {
            if let Err(err) = play_blocking(tone, repeat, &stopped) {
                warn!("alarm playback failed: {err}");
            }
            stopped.store(true, Ordering::Relaxed);
        });
        Ok(handle)
    }
}

/// Pick a player from the environment; `CALCLI_SILENT_ALARM` disables
/// audio output entirely.
pub fn player_from_env() -> Box<dyn AlarmPlayer> {
    if std::env::var("CALCLI_SILENT_ALARM").is_ok() {
        Box::new(SilentPlayer)
    } else {
        Box::new(CpalPlayer)
    }
}

struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

fn play_blocking(tone: &Ringtone, repeat: u32, stopped: &Arc<AtomicBool>) -> Result<(), AppError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AppError::io("no default output device"))?;
    let supported = device
        .default_output_config()
        .map_err(|err| AppError::io(format!("no output config: {err}")))?;
    let sample_rate = supported.sample_rate();
    let stream_config = StreamConfig {
        channels: 1,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(PlaybackBuffer {
        samples: render_samples(tone, repeat, sample_rate),
        position: 0,
        finished: false,
    }));
    let buffer_clone = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match buffer_clone.lock() {
                    Ok(buf) => buf,
                    Err(_) => return,
                };
                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            move |err| {
                warn!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|err| AppError::io(format!("failed to build output stream: {err}")))?;

    stream
        .play()
        .map_err(|err| AppError::io(format!("failed to start output stream: {err}")))?;

    loop {
        std::thread::sleep(std::time::Duration::from_millis(10));
        if stopped.load(Ordering::Relaxed) {
            break;
        }
        let finished = buffer
            .lock()
            .map(|buf| buf.finished)
            .unwrap_or(true);
        if finished {
            break;
        }
    }

    drop(stream);
    Ok(())
}
