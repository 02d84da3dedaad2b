//! # Audio Capture Module
//!
//! Microphone capture through CPAL. Builds a mono f32 input stream near
//! 44.1 kHz, chops the callback data into fixed analysis frames and ships
//! them over a channel to whichever thread runs the estimation loop.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Samples per analysis frame (~46 ms at 44.1 kHz).
pub const FRAME_SIZE: usize = 2048;

/// Sample rate the capture tries to negotiate.
const TARGET_SAMPLE_RATE: u32 = 44_100;

/// A live microphone capture.
///
/// Holds the running stream; dropping the handle stops capture and
/// releases the device.
pub struct Capture {
    stream: cpal::Stream,
    sample_rate: u32,
}

impl Capture {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Pauses the stream ahead of dropping it.
    pub fn pause(&self) {
        if let Err(e) = self.stream.pause() {
            eprintln!("[AUDIO] Error pausing stream: {}", e);
        }
    }
}

/// Opens the default input device and starts streaming analysis frames.
///
/// Frames of `FRAME_SIZE` samples are sent over `sender`; sends never
/// block, frames are dropped if the receiver falls behind.
///
/// # Errors
/// Fails when no input device is available, when the device offers no
/// usable mono f32 configuration, or when the stream cannot be built or
/// started (e.g. permission denied). Nothing is left allocated on
/// failure.
pub fn open_capture(sender: Sender<Vec<f32>>) -> Result<Capture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device available"))?;
    eprintln!("[AUDIO] Using input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = pick_input_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("no mono f32 input configuration available"))?;

    // The chosen range may not contain the target rate exactly.
    let rate = TARGET_SAMPLE_RATE.clamp(
        supported.min_sample_rate().0,
        supported.max_sample_rate().0,
    );
    let config = supported.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();
    eprintln!("[AUDIO] Capturing at {} Hz", sample_rate);

    // Accumulates callback data until a full analysis frame is ready.
    let mut pending: Vec<f32> = Vec::with_capacity(FRAME_SIZE * 2);
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= FRAME_SIZE {
                let frame = pending[..FRAME_SIZE].to_vec();
                let _ = sender.try_send(frame);
                pending.drain(..FRAME_SIZE);
            }
        },
        |err| eprintln!("[AUDIO] Stream error: {}", err),
        None,
    )?;
    stream.play()?;

    Ok(Capture {
        stream,
        sample_rate,
    })
}

/// Picks the supported configuration closest to the target rate among the
/// mono f32 options.
fn pick_input_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let below = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let above = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            below.min(above)
        })
}
