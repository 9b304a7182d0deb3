//! Speech presence detection
//!
//! Energy-based check run before transcription so that silent recordings are
//! reported as unrecognized without a round-trip to the recognizer.

use tracing::debug;

use crate::audio::DecodedAudio;

/// Chunk length in milliseconds (512 samples at 16kHz)
pub const CHUNK_MS: u32 = 32;

/// Voice activity of a single chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceActivity {
    Silence,
    Speech,
}

/// Simple energy-based speech detector
#[derive(Debug, Clone)]
pub struct SpeechDetector {
    /// RMS threshold for a speech chunk (0.0 - 1.0)
    threshold: f32,
    /// Consecutive speech chunks required to count as speech
    min_speech_chunks: usize,
}

impl Default for SpeechDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechDetector {
    pub fn new() -> Self {
        Self {
            threshold: 0.01,
            min_speech_chunks: 3, // ~96ms
        }
    }

    /// Set the energy threshold (lower = more sensitive)
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.001, 0.5);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn calculate_rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
        (sum_squares / samples.len() as f32).sqrt()
    }

    /// Classify one chunk of normalized samples
    pub fn classify(&self, samples: &[f32]) -> VoiceActivity {
        if Self::calculate_rms(samples) >= self.threshold {
            VoiceActivity::Speech
        } else {
            VoiceActivity::Silence
        }
    }

    /// Whether the waveform holds at least one run of speech chunks
    pub fn contains_speech(&self, audio: &DecodedAudio) -> bool {
        let samples = audio.to_f32();
        let chunk_samples = u64::from(audio.sample_rate()) * u64::from(CHUNK_MS) / 1000;
        let chunk_size = usize::try_from(chunk_samples)
            .unwrap_or(usize::MAX)
            .clamp(1, samples.len().max(1));

        // clips shorter than the minimum run only need one loud chunk
        let required = self
            .min_speech_chunks
            .min(samples.len().div_ceil(chunk_size))
            .max(1);

        let mut run = 0;
        for chunk in samples.chunks(chunk_size) {
            match self.classify(chunk) {
                VoiceActivity::Speech => {
                    run += 1;
                    if run >= required {
                        return true;
                    }
                }
                VoiceActivity::Silence => run = 0,
            }
        }

        debug!(
            "No speech found in {}ms of audio (threshold {:.4})",
            audio.duration_ms(),
            self.threshold
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(samples: Vec<i16>) -> DecodedAudio {
        DecodedAudio::new(samples, 16000).unwrap()
    }

    #[test]
    fn test_rms_calculation() {
        let silence = vec![0.0f32; 512];
        assert_eq!(SpeechDetector::calculate_rms(&silence), 0.0);

        // full scale sine wave has RMS of 1/sqrt(2)
        let samples: Vec<f32> = (0..512)
            .map(|i| (i as f32 * std::f32::consts::PI * 2.0 / 32.0).sin())
            .collect();
        let rms = SpeechDetector::calculate_rms(&samples);
        assert!((rms - 0.707).abs() < 0.01);
    }

    #[test]
    fn test_silence_has_no_speech() {
        let detector = SpeechDetector::new();
        assert!(!detector.contains_speech(&audio(vec![0; 16000])));
        assert!(!detector.contains_speech(&audio(vec![10; 16000])));
        assert!(!detector.contains_speech(&audio(Vec::new())));
    }

    #[test]
    fn test_sustained_energy_is_speech() {
        let detector = SpeechDetector::new();
        let mut samples = vec![0i16; 8000];
        samples.extend(std::iter::repeat_n(3000i16, 4000));
        samples.extend(vec![0i16; 8000]);
        assert!(detector.contains_speech(&audio(samples)));
    }

    #[test]
    fn test_isolated_click_is_not_speech() {
        let detector = SpeechDetector::new();
        let mut samples = vec![0i16; 16000];
        // one loud chunk only
        for s in samples.iter_mut().skip(1024).take(512) {
            *s = 8000;
        }
        assert!(!detector.contains_speech(&audio(samples)));
    }

    #[test]
    fn test_extreme_sample_rates() {
        let detector = SpeechDetector::new();
        let loud = vec![8000i16; 4096];

        let fast = DecodedAudio::new(loud.clone(), 192_000_000).unwrap();
        assert!(detector.contains_speech(&fast));
        let fast_silence = DecodedAudio::new(vec![0; 4096], u32::MAX).unwrap();
        assert!(!detector.contains_speech(&fast_silence));

        // under 1000Hz a chunk rounds down to a single sample
        let slow = DecodedAudio::new(loud, 1).unwrap();
        assert!(detector.contains_speech(&slow));
    }

    #[test]
    fn test_threshold_is_clamped() {
        assert_eq!(SpeechDetector::new().with_threshold(0.0).threshold(), 0.001);
        assert_eq!(SpeechDetector::new().with_threshold(2.0).threshold(), 0.5);
    }
}
