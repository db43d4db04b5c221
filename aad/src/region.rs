//! Audio region value type.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::signal::check_data_multiple;
use crate::source::{AudioParams, wave};
use crate::utils::encode::encode_wave;
use crate::utils::errors::{SaveError, SourceError};

/// An immutable slice of audio: raw bytes plus position metadata.
///
/// `duration = len(data) / (sampling_rate * sample_width * channels)` and
/// `end = start + duration`; display rounds to millisecond resolution.
#[derive(Debug, Clone)]
pub struct AudioRegion {
    data: Vec<u8>,
    start: f64,
    params: AudioParams,
    timestamp: Option<DateTime<Local>>,
}

impl AudioRegion {
    pub fn new(data: Vec<u8>, params: AudioParams, start: f64) -> Result<Self, SourceError> {
        check_data_multiple(&data, params.sample_width, params.channels)?;
        Ok(Self {
            data,
            start,
            params,
            timestamp: None,
        })
    }

    /// A region of silence (zero samples) of the given duration.
    pub fn silence(duration: f64, params: AudioParams) -> Self {
        let frames = (duration * params.sampling_rate as f64).round() as usize;
        Self {
            data: vec![0u8; frames * params.frame_size()],
            start: 0.0,
            params,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn params(&self) -> AudioParams {
        self.params
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.params.duration_of(self.data.len())
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration()
    }

    pub fn timestamp(&self) -> Option<DateTime<Local>> {
        self.timestamp
    }

    /// Save the region at `path`.
    ///
    /// The format is `format` if given, otherwise guessed from the file
    /// extension, defaulting to raw. Formats other than raw and WAVE go
    /// through the encoder bridge; on bridge failure the audio survives as
    /// a WAVE scratch file whose path the error carries.
    pub fn save(&self, path: &Path, format: Option<&str>) -> Result<PathBuf, SaveError> {
        let format = format
            .map(|f| f.to_ascii_lowercase())
            .or_else(|| {
                path.extension()
                    .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            })
            .unwrap_or_else(|| "raw".to_string());

        match format.as_str() {
            "raw" | "pcm" | "data" => {
                std::fs::write(path, &self.data)?;
            }
            "wav" | "wave" => {
                wave::write_wave_file(path, &self.data, self.params)?;
            }
            other => {
                // scratch name appends to the full target name so the
                // target's own extension is preserved
                let base = path.to_string_lossy();
                let mut scratch = PathBuf::from(format!("{base}.wav"));
                let mut counter = 0usize;
                while scratch.exists() {
                    counter += 1;
                    scratch = PathBuf::from(format!("{base}({counter}).wav"));
                }
                wave::write_wave_file(&scratch, &self.data, self.params)?;
                encode_wave(&scratch, path, other)?;
            }
        }
        Ok(path.to_path_buf())
    }
}

/// Structural equality over bytes and PCM parameters.
impl PartialEq for AudioRegion {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.params == other.params
    }
}

impl Eq for AudioRegion {}

impl fmt::Display for AudioRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioRegion(start={:.3}, end={:.3}, duration={:.3})",
            self.start,
            self.end(),
            self.duration()
        )
    }
}
