//! Audio input resolution: turns an `AudioHandle` into a mono 16-bit waveform

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::AudioData;
use crate::error::{Error, Result};

/// Reference to a readable audio resource
#[derive(Debug, Clone)]
pub enum AudioHandle {
    /// WAV file on disk
    File(PathBuf),
    /// Encoded WAV bytes
    Wav(Vec<u8>),
    /// Raw 16-bit little-endian mono PCM
    Pcm {
        samples: AudioData,
        sample_rate: u32,
    },
}

impl AudioHandle {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        AudioHandle::File(path.into())
    }

    /// True when the handle carries no audio at all (files are checked on decode)
    pub fn is_empty(&self) -> bool {
        match self {
            AudioHandle::File(path) => path.as_os_str().is_empty(),
            AudioHandle::Wav(bytes) => bytes.is_empty(),
            AudioHandle::Pcm { samples, .. } => samples.is_empty(),
        }
    }

    /// Short label for logs and error messages
    pub fn describe(&self) -> String {
        match self {
            AudioHandle::File(path) => path.display().to_string(),
            AudioHandle::Wav(bytes) => format!("<{} bytes of WAV>", bytes.len()),
            AudioHandle::Pcm {
                samples,
                sample_rate,
            } => format!("<{} bytes of PCM @ {sample_rate}Hz>", samples.len()),
        }
    }
}

/// Mono 16-bit waveform ready for a recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidInput("sample rate must be positive".to_string()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / u64::from(self.sample_rate)
    }

    /// Samples scaled to -1.0..1.0
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| f32::from(s) / f32::from(i16::MAX))
            .collect()
    }

    /// Encode as a 16-bit mono WAV file
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| Error::InvalidInput(format!("Failed to encode WAV: {e}")))?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| Error::InvalidInput(format!("Failed to encode WAV: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| Error::InvalidInput(format!("Failed to encode WAV: {e}")))?;
        }

        Ok(cursor.into_inner())
    }
}

/// Resolve a handle to a decodable waveform
///
/// Blocking: reads files synchronously. Call from `spawn_blocking` in async code.
pub fn decode(handle: &AudioHandle) -> Result<DecodedAudio> {
    match handle {
        AudioHandle::File(path) => {
            let origin = path.display().to_string();
            let file = File::open(path).map_err(|e| Error::resource(&origin, e))?;
            decode_wav(BufReader::new(file), &origin)
        }
        AudioHandle::Wav(bytes) => decode_wav(Cursor::new(bytes.as_slice()), "WAV buffer"),
        AudioHandle::Pcm {
            samples,
            sample_rate,
        } => {
            if samples.len() % 2 != 0 {
                return Err(Error::InvalidInput(
                    "PCM buffer has an odd number of bytes".to_string(),
                ));
            }
            let pcm = samples
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            DecodedAudio::new(pcm, *sample_rate)
        }
    }
}

fn decode_wav<R: Read>(reader: R, origin: &str) -> Result<DecodedAudio> {
    let mut reader = WavReader::new(reader).map_err(|e| wav_error(e, origin))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    debug!(
        "Decoding {}: {} channel(s), {}Hz, {} bit {:?}",
        origin, spec.channels, spec.sample_rate, spec.bits_per_sample, spec.sample_format
    );

    let interleaved: Vec<i32> = match spec.sample_format {
        SampleFormat::Int => {
            let bits = u32::from(spec.bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| rescale_to_i16(v, bits)))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| wav_error(e, origin))?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i32))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| wav_error(e, origin))?,
    };

    // downmix by averaging channels
    let mono = interleaved
        .chunks(channels)
        .map(|frame| (frame.iter().sum::<i32>() / frame.len() as i32) as i16)
        .collect();

    DecodedAudio::new(mono, spec.sample_rate)
}

fn rescale_to_i16(value: i32, bits: u32) -> i32 {
    match bits {
        16 => value,
        b if b > 16 => value >> (b - 16),
        b => value << (16 - b),
    }
}

fn wav_error(error: hound::Error, origin: &str) -> Error {
    match error {
        hound::Error::IoError(io) if io.kind() != std::io::ErrorKind::UnexpectedEof => {
            Error::resource(origin, io)
        }
        other => Error::InvalidInput(format!("{origin} is not a decodable WAV stream: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn wav_bytes(spec: WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn mono_spec(sample_rate: u32) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    #[test]
    fn test_decode_wav_buffer() {
        let bytes = wav_bytes(mono_spec(16000), &[0, 100, -100, i16::MAX]);
        let audio = decode(&AudioHandle::Wav(bytes)).unwrap();

        assert_eq!(audio.sample_rate(), 16000);
        assert_eq!(audio.samples(), &[0, 100, -100, i16::MAX]);
    }

    #[test]
    fn test_decode_downmixes_stereo() {
        let spec = WavSpec {
            channels: 2,
            ..mono_spec(8000)
        };
        let bytes = wav_bytes(spec, &[100, 300, -50, -150]);
        let audio = decode(&AudioHandle::Wav(bytes)).unwrap();

        assert_eq!(audio.samples(), &[200, -100]);
    }

    #[test]
    fn test_decode_pcm() {
        let pcm: Vec<u8> = [1i16, -2, 300].iter().flat_map(|s| s.to_le_bytes()).collect();
        let audio = decode(&AudioHandle::Pcm {
            samples: pcm,
            sample_rate: 16000,
        })
        .unwrap();
        assert_eq!(audio.samples(), &[1, -2, 300]);

        let odd = decode(&AudioHandle::Pcm {
            samples: vec![0u8; 3],
            sample_rate: 16000,
        });
        assert_eq!(odd.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_decode_missing_file_is_resource_unavailable() {
        let err = decode(&AudioHandle::file("/definitely/not/here.wav")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn test_decode_garbage_is_invalid_input() {
        let err = decode(&AudioHandle::Wav(b"not a wav file at all".to_vec())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_decode_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, wav_bytes(mono_spec(16000), &vec![500; 16000])).unwrap();

        let audio = decode(&AudioHandle::file(&path)).unwrap();
        assert_eq!(audio.duration_ms(), 1000);
    }

    #[test]
    fn test_to_wav_header() {
        let audio = DecodedAudio::new(vec![0; 16000], 16000).unwrap();
        let wav = audio.to_wav().unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 32000);
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale_to_i16(127, 8), 127 << 8);
        assert_eq!(rescale_to_i16(1 << 23, 24), 1 << 15);
        assert_eq!(rescale_to_i16(-42, 16), -42);
    }

    #[test]
    fn test_handle_emptiness() {
        assert!(AudioHandle::Wav(Vec::new()).is_empty());
        assert!(AudioHandle::file("").is_empty());
        assert!(!AudioHandle::file("a.wav").is_empty());
    }
}
