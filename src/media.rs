use crate::audio::{LoopBuffer, DEFAULT_SAMPLE_RATE};
use rand::Rng;
use std::path::{Path, PathBuf};

/// The asset that gets looped. Loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopMedia {
    /// A buffer of white noise generated in memory.
    Synthesized { sample_rate: u32, frames: usize },
    /// A WAV file, mixed down to mono.
    Wav(PathBuf),
}

impl Default for LoopMedia {
    /// One second of noise at 44.1kHz.
    fn default() -> Self {
        LoopMedia::Synthesized {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frames: DEFAULT_SAMPLE_RATE as usize,
        }
    }
}

#[derive(Debug)]
pub enum MediaError {
    /// The loop asset is not where it was expected.
    Missing(PathBuf),
    /// The asset decoded to zero samples.
    Empty(PathBuf),
    Decode(PathBuf, hound::Error),
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::Missing(path) => {
                write!(f, "loop asset not found: {}", path.display())
            }
            MediaError::Empty(path) => write!(f, "loop asset has no samples: {}", path.display()),
            MediaError::Decode(path, e) => {
                write!(f, "could not decode loop asset {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Decode(_, e) => Some(e),
            _ => None,
        }
    }
}

impl LoopMedia {
    /// Startup precondition: the asset must exist before anything is opened.
    pub fn check(&self) -> Result<(), MediaError> {
        match self {
            LoopMedia::Synthesized { .. } => Ok(()),
            LoopMedia::Wav(path) if path.is_file() => Ok(()),
            LoopMedia::Wav(path) => Err(MediaError::Missing(path.clone())),
        }
    }

    /// Produces the loop buffer. The random source is only used for synthesized media.
    pub fn load<R: Rng>(&self, rng: &mut R) -> Result<LoopBuffer, MediaError> {
        match self {
            LoopMedia::Synthesized {
                sample_rate,
                frames,
            } => Ok(LoopBuffer::white_noise(*sample_rate, *frames, rng)),
            LoopMedia::Wav(path) => {
                self.check()?;
                let buffer = read_wav(path)?;
                log::info!(
                    "Loaded {} ({} frames at {}Hz)",
                    path.display(),
                    buffer.len(),
                    buffer.sample_rate()
                );
                Ok(buffer)
            }
        }
    }
}

fn read_wav(path: &Path) -> Result<LoopBuffer, MediaError> {
    let decode = |e: hound::Error| MediaError::Decode(path.to_path_buf(), e);
    let mut reader = hound::WavReader::open(path).map_err(decode)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode)?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(decode)?
        }
    };
    let channels = spec.channels.max(1) as usize;
    let mono: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    if mono.is_empty() {
        return Err(MediaError::Empty(path.to_path_buf()));
    }
    Ok(LoopBuffer::from_samples(mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn temp_wav(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tv_static_{}_{}.wav", name, std::process::id()))
    }

    #[test]
    fn default_media_is_one_second_of_noise() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let media = LoopMedia::default();
        assert!(media.check().is_ok());
        let buffer = media.load(&mut rng).unwrap();
        assert_eq!(buffer.len(), 44_100);
        assert_eq!(buffer.sample_rate(), 44_100);
    }

    #[test]
    fn missing_wav_fails_the_precondition() {
        let path = PathBuf::from("/definitely/not/here/static.wav");
        let media = LoopMedia::Wav(path.clone());
        match media.check() {
            Err(MediaError::Missing(p)) => assert_eq!(p, path),
            other => panic!("unexpected {:?}", other),
        }
        let message = media.check().unwrap_err().to_string();
        assert!(message.contains("/definitely/not/here/static.wav"));
    }

    #[test]
    fn stereo_wav_is_mixed_to_mono() {
        let path = temp_wav("stereo");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let buffer = LoopMedia::Wav(path.clone()).load(&mut rng).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.sample_rate(), 22_050);
        assert!(buffer.samples().iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn empty_wav_is_rejected() {
        let path = temp_wav("empty");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        hound::WavWriter::create(&path, spec)
            .unwrap()
            .finalize()
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = LoopMedia::Wav(path.clone()).load(&mut rng);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(MediaError::Empty(_))));
    }
}
