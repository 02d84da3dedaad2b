//! # Pitch Estimation Module
//!
//! The seam between raw audio frames and the practice session. A
//! `PitchEstimator` turns a buffer of samples into a `PitchSample`
//! (frequency plus clarity); the session layer decides what clarity is
//! good enough to act on.
//!
//! ## Features
//! - Injectable estimator trait so front-ends can swap implementations
//! - Difference-function estimator with octave error prevention
//! - Amplitude gating to filter out silence
//! - Parabolic interpolation for sub-sample accuracy

/// A single pitch observation produced from one analysis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchSample {
    /// Estimated fundamental frequency in Hz.
    pub frequency: f32,
    /// Periodicity strength of the frame, 0.0 (noise) to 1.0 (pure tone).
    pub clarity: f32,
}

/// Produces pitch observations from raw audio frames.
///
/// `None` means "no usable pitch this frame" (silence, noise or an
/// out-of-range result); callers must not change state on `None`.
pub trait PitchEstimator {
    fn estimate(&mut self, samples: &[f32], sample_rate: u32) -> Option<PitchSample>;
}

/// Default minimum RMS amplitude below which a frame counts as silence.
pub const DEFAULT_AMPLITUDE_THRESHOLD: f32 = 0.01;

/// Difference-function pitch estimator.
///
/// Computes the cumulative mean normalized difference of the frame, picks
/// the first significant dip as the period and refines it with parabolic
/// interpolation. Clarity is derived from the dip depth: a pure tone dips
/// close to zero, noise stays near one.
pub struct YinEstimator {
    amplitude_threshold: f32,
}

impl YinEstimator {
    pub fn new(amplitude_threshold: f32) -> Self {
        Self {
            amplitude_threshold,
        }
    }
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_AMPLITUDE_THRESHOLD)
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, samples: &[f32], sample_rate: u32) -> Option<PitchSample> {
        estimate_by_difference(samples, sample_rate, self.amplitude_threshold)
    }
}

/// Runs the difference-function estimate over one frame.
///
/// # Arguments
/// * `signal` - Input audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude_threshold` - Minimum RMS amplitude for estimation
///
/// # Returns
/// * `Some(sample)` - Estimated frequency and clarity
/// * `None` - No pitch detected (silence, no dip, or invalid result)
fn estimate_by_difference(
    signal: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
) -> Option<PitchSample> {
    let frame_size = signal.len();
    let half = frame_size / 2;
    if half < 4 {
        return None;
    }

    // RMS gate: silent frames carry no pitch worth reporting.
    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / frame_size as f32).sqrt();
    if rms < amplitude_threshold {
        return None;
    }

    // Squared difference function over the first half of the frame.
    let mut diff = vec![0.0f32; half];
    for lag in 1..half {
        let mut acc = 0.0;
        for i in 0..half {
            let delta = signal[i] - signal[i + lag];
            acc += delta * delta;
        }
        diff[lag] = acc;
    }

    // Cumulative mean normalization.
    let mut running_sum = 0.0;
    diff[0] = 1.0;
    for lag in 1..half {
        running_sum += diff[lag];
        if running_sum != 0.0 {
            diff[lag] *= lag as f32 / running_sum;
        } else {
            diff[lag] = 1.0;
        }
    }

    // First significant dip, to avoid locking onto a lower octave.
    let global_min = diff[1..].iter().cloned().fold(f32::INFINITY, f32::min);
    let threshold = global_min + 0.05;
    let mut period = 0;
    for lag in 2..half {
        if diff[lag] < threshold && diff[lag] < diff[lag - 1] {
            period = lag;
            break;
        }
    }
    if period == 0 || period + 1 >= half {
        return None;
    }

    // Parabolic interpolation around the dip for sub-sample precision.
    let y1 = diff[period - 1];
    let y2 = diff[period];
    let y3 = diff[period + 1];
    let denom = y1 - 2.0 * y2 + y3;
    let refined_period = if denom != 0.0 {
        period as f32 + (y1 - y3) / (2.0 * denom)
    } else {
        period as f32
    };

    let frequency = sample_rate as f32 / refined_period;
    if !frequency.is_finite() || frequency <= 20.0 {
        return None;
    }

    // The normalized dip depth doubles as a periodicity score.
    let clarity = (1.0 - y2).clamp(0.0, 1.0);
    Some(PitchSample { frequency, clarity })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn detects_a4_sine() {
        let mut estimator = YinEstimator::default();
        let frame = sine(440.0, 44_100, 2048);
        let sample = estimator.estimate(&frame, 44_100).unwrap();
        assert!((sample.frequency - 440.0).abs() < 1.0);
        assert!(sample.clarity > 0.9);
    }

    #[test]
    fn detects_a3_sine() {
        let mut estimator = YinEstimator::default();
        let frame = sine(220.0, 44_100, 2048);
        let sample = estimator.estimate(&frame, 44_100).unwrap();
        assert!((sample.frequency - 220.0).abs() < 1.0);
    }

    #[test]
    fn silence_has_no_pitch() {
        let mut estimator = YinEstimator::default();
        assert_eq!(estimator.estimate(&vec![0.0; 2048], 44_100), None);
    }

    #[test]
    fn tiny_frames_have_no_pitch() {
        let mut estimator = YinEstimator::default();
        let frame = sine(440.0, 44_100, 4);
        assert_eq!(estimator.estimate(&frame, 44_100), None);
    }
}
