//! Audio source endpoints.
//!
//! An [`AudioSource`] produces interleaved PCM bytes in exact frame counts.
//! Variants cover in-memory buffers, headerless PCM files, WAVE files,
//! standard input and capture devices.

use std::path::{Path, PathBuf};

use crate::utils::errors::{ParamError, SourceError};

pub mod buffer;
pub mod capture;
pub mod raw;
pub mod stdin;
pub mod wave;

pub use buffer::BufferSource;
pub use capture::CaptureSource;
pub use raw::RawFileSource;
pub use stdin::StdinSource;
pub use wave::{WavWriter, WaveFileSource};

pub const DEFAULT_SAMPLING_RATE: u32 = 16000;
pub const DEFAULT_SAMPLE_WIDTH: usize = 2;
pub const DEFAULT_CHANNELS: usize = 1;

/// PCM parameters shared by every audio datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParams {
    pub sampling_rate: u32,
    pub sample_width: usize,
    pub channels: usize,
}

impl AudioParams {
    pub fn new(
        sampling_rate: u32,
        sample_width: usize,
        channels: usize,
    ) -> Result<Self, ParamError> {
        if !matches!(sample_width, 1 | 2 | 4) {
            return Err(ParamError::InvalidSampleWidth(sample_width));
        }
        if sampling_rate == 0 {
            return Err(ParamError::InvalidSamplingRate);
        }
        if channels == 0 {
            return Err(ParamError::InvalidChannels);
        }
        Ok(Self {
            sampling_rate,
            sample_width,
            channels,
        })
    }

    /// Bytes occupied by one frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        self.sample_width * self.channels
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sampling_rate as usize * self.frame_size()
    }

    /// Duration in seconds of a byte buffer with these parameters.
    pub fn duration_of(&self, len_bytes: usize) -> f64 {
        len_bytes as f64 / self.bytes_per_second() as f64
    }
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            sample_width: DEFAULT_SAMPLE_WIDTH,
            channels: DEFAULT_CHANNELS,
        }
    }
}

/// A PCM-producing endpoint.
///
/// Constructed closed; `open` acquires the backing resource, `close` releases
/// it and is idempotent. `read` takes a size in frames and returns a byte
/// buffer whose length is a multiple of the frame size, a short tail at
/// end-of-stream, then `None`. A size of `None` reads to end-of-stream.
pub trait AudioSource: Send {
    fn open(&mut self) -> Result<(), SourceError>;

    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError>;

    fn params(&self) -> AudioParams;

    /// Whether this source can restart from offset zero.
    fn rewindable(&self) -> bool {
        false
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        Err(SourceError::NotRewindable)
    }
}

/// Where the engine reads its signal from.
#[derive(Debug, Clone)]
pub enum Input {
    /// Audio file on disk (raw PCM or WAVE).
    File(PathBuf),
    /// Raw PCM from process standard input.
    Stdin,
    /// Native capture device.
    Capture,
}

/// Options for [`open_input`].
#[derive(Debug, Clone)]
pub struct InputOptions {
    /// Explicit format name; when absent the file extension decides.
    pub format: Option<String>,
    /// Parameters for raw files, stdin and capture. WAVE headers win.
    pub params: AudioParams,
    /// Stream large files from disk instead of loading them to memory.
    pub large_file: bool,
    /// Capture buffer size in frames.
    pub frames_per_buffer: usize,
    /// Capture device index; `None` selects the default device.
    pub device_index: Option<usize>,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            format: None,
            params: AudioParams::default(),
            large_file: false,
            frames_per_buffer: capture::DEFAULT_FRAMES_PER_BUFFER,
            device_index: None,
        }
    }
}

fn guess_format(explicit: Option<&str>, path: Option<&Path>) -> Option<String> {
    if let Some(fmt) = explicit {
        return Some(fmt.to_ascii_lowercase());
    }
    path.and_then(|p| p.extension())
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Build the audio source described by `input`.
///
/// Files are loaded into an in-memory [`BufferSource`] unless
/// `options.large_file` asks for on-demand reads. The returned source is
/// closed; callers open it when processing starts.
pub fn open_input(
    input: &Input,
    options: &InputOptions,
) -> Result<Box<dyn AudioSource>, SourceError> {
    match input {
        Input::Stdin => Ok(Box::new(StdinSource::new(options.params))),
        Input::Capture => Ok(Box::new(CaptureSource::new(
            options.params,
            options.frames_per_buffer,
            options.device_index,
        )?)),
        Input::File(path) => from_file(path, options),
    }
}

/// Open an audio file, guessing its format from `options.format` or the
/// file extension.
pub fn from_file(
    path: &Path,
    options: &InputOptions,
) -> Result<Box<dyn AudioSource>, SourceError> {
    let format = guess_format(options.format.as_deref(), Some(path));
    match format.as_deref() {
        Some("wav") | Some("wave") => {
            if options.large_file {
                Ok(Box::new(WaveFileSource::new(path)?))
            } else {
                let (params, data) = wave::load_wave(path)?;
                Ok(Box::new(BufferSource::new(data, params)?))
            }
        }
        Some("raw") | Some("pcm") | Some("data") | None => {
            if options.large_file {
                Ok(Box::new(RawFileSource::new(path, options.params)))
            } else {
                let data = std::fs::read(path)?;
                Ok(Box::new(BufferSource::new(data, options.params)?))
            }
        }
        Some(other) => Err(SourceError::UnsupportedFormat(other.to_string())),
    }
}

/// A size of zero means read-to-end, like `None`.
pub(crate) fn effective_size(size: Option<usize>) -> Option<usize> {
    size.filter(|&frames| frames > 0)
}

/// Read `size` frames (or to end for `None`) from a raw byte stream,
/// returning only whole frames. Shared by the file, stdin and capture
/// sources.
pub(crate) fn read_full_frames<R: std::io::Read>(
    stream: &mut R,
    size: Option<usize>,
    frame_size: usize,
) -> Result<Option<Vec<u8>>, SourceError> {
    let mut data = match effective_size(size) {
        Some(frames) => {
            let wanted = frames * frame_size;
            let mut buf = vec![0u8; wanted];
            let mut filled = 0;
            while filled < wanted {
                let n = stream.read(&mut buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            buf.truncate(filled);
            buf
        }
        None => {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf)?;
            buf
        }
    };
    if data.is_empty() {
        return Ok(None);
    }
    let partial = data.len() % frame_size;
    if partial != 0 {
        log::debug!("dropping {partial} trailing bytes of a partial frame");
        let keep = data.len() - partial;
        data.truncate(keep);
        if data.is_empty() {
            return Ok(None);
        }
    }
    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(AudioParams::new(16000, 2, 1).is_ok());
        assert!(matches!(
            AudioParams::new(16000, 3, 1),
            Err(ParamError::InvalidSampleWidth(3))
        ));
        assert!(matches!(
            AudioParams::new(0, 2, 1),
            Err(ParamError::InvalidSamplingRate)
        ));
        assert!(matches!(
            AudioParams::new(16000, 2, 0),
            Err(ParamError::InvalidChannels)
        ));
    }

    #[test]
    fn test_frame_arithmetic() {
        let params = AudioParams::new(16000, 2, 2).unwrap();
        assert_eq!(params.frame_size(), 4);
        assert_eq!(params.bytes_per_second(), 64000);
        assert_eq!(params.duration_of(32000), 0.5);
    }

    #[test]
    fn test_guess_format() {
        assert_eq!(
            guess_format(None, Some(Path::new("audio.WAV"))).as_deref(),
            Some("wav")
        );
        assert_eq!(
            guess_format(Some("ogg"), Some(Path::new("audio.wav"))).as_deref(),
            Some("ogg")
        );
        assert_eq!(guess_format(None, Some(Path::new("audio"))), None);
    }

    #[test]
    fn test_read_full_frames_drops_partial_tail() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7];
        let mut cursor = std::io::Cursor::new(&bytes[..]);
        let data = read_full_frames(&mut cursor, Some(10), 2).unwrap().unwrap();
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6]);
        assert!(read_full_frames(&mut cursor, Some(10), 2).unwrap().is_none());
    }
}
