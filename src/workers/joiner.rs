//! Event joiner: writes all detected events into one file, separated by a
//! fixed duration of generated silence.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use aad::region::AudioRegion;
use aad::source::{AudioParams, WavWriter};
use aad::utils::encode::encode_wave;

use super::EventSink;
use super::stream_saver::non_existent_wav_path;

pub struct JoinerSink {
    writer: Option<WavWriter<File>>,
    silence: Vec<u8>,
    first_event: bool,
}

/// Export step kept by the driver; runs after the joiner observer has been
/// stopped and its file closed.
pub struct JoinerExport {
    scratch: PathBuf,
    target: PathBuf,
    format: String,
}

/// Build the joiner observer sink plus its driver-side export handle.
pub fn joiner(
    target: &Path,
    format: Option<&str>,
    params: AudioParams,
    silence_duration: f64,
) -> Result<(JoinerSink, JoinerExport)> {
    let format = format
        .map(|f| f.to_ascii_lowercase())
        .or_else(|| {
            target
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        })
        .unwrap_or_else(|| "wav".to_string());

    let scratch = if format == "wav" || format == "wave" {
        target.to_path_buf()
    } else {
        non_existent_wav_path(target)
    };

    let file = File::create(&scratch)
        .with_context(|| format!("cannot create '{}'", scratch.display()))?;
    let mut writer = WavWriter::new(file, params);
    writer.write_header()?;

    Ok((
        JoinerSink {
            writer: Some(writer),
            silence: AudioRegion::silence(silence_duration, params).data().to_vec(),
            first_event: true,
        },
        JoinerExport {
            scratch,
            target: target.to_path_buf(),
            format,
        },
    ))
}

impl EventSink for JoinerSink {
    fn name(&self) -> &'static str {
        "event joiner"
    }

    fn handle(&mut self, _id: u64, region: &AudioRegion) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("joiner file already closed")?;
        if self.first_event {
            self.first_event = false;
        } else {
            writer.write_data(&self.silence)?;
        }
        writer.write_data(region.data())?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.finish()?;
        }
        Ok(())
    }
}

impl JoinerExport {
    /// Encode the joined WAVE file to the requested format if needed.
    pub fn export(self) -> Result<PathBuf> {
        if self.scratch != self.target {
            encode_wave(&self.scratch, &self.target, &self.format)?;
        }
        Ok(self.target)
    }
}
