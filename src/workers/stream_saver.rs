//! Stream saver: a tap on the window reader that persists every byte read
//! to a WAVE file from a background thread.
//!
//! The tap role (handed to the tokenizer) and the worker role (held by the
//! driver) are two structs sharing one inbox. The tap forwards each window
//! downstream and enqueues a copy; the worker batches writes and, for
//! non-WAVE targets, encodes the scratch file on export.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use aad::process::WindowReader;
use aad::source::{AudioParams, WavWriter};
use aad::utils::encode::encode_wave;
use aad::utils::errors::SourceError;

use super::{INBOX_TIMEOUT, WindowStream};

/// Batch threshold: flush the cache once it holds this much audio.
const CACHE_SIZE_SEC: f64 = 0.5;

enum SaveMessage {
    Data(Vec<u8>),
    Stop,
}

/// Reader role: wraps the window reader, forwarding windows while feeding
/// the saver inbox. Enqueues the poison pill at end-of-stream.
pub struct StreamSaverTap {
    reader: WindowReader,
    tx: Sender<SaveMessage>,
}

/// Worker role: owns the background thread and the export step.
pub struct StreamSaver {
    tx: Sender<SaveMessage>,
    handle: JoinHandle<Result<()>>,
    scratch: PathBuf,
    target: PathBuf,
    format: String,
}

/// Split a window reader into a saver tap and its background worker.
///
/// The export format is `format` if given, otherwise guessed from the
/// target extension, defaulting to WAVE. Non-WAVE targets are written to a
/// scratch WAVE file first and encoded on export.
pub fn stream_saver(
    reader: WindowReader,
    target: &Path,
    format: Option<&str>,
) -> Result<(StreamSaverTap, StreamSaver)> {
    let params = WindowStream::params(&reader);
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

    let (tx, rx) = mpsc::channel::<SaveMessage>();
    let cache_size = (CACHE_SIZE_SEC * params.bytes_per_second() as f64) as usize;
    let handle = thread::spawn(move || run_saver(writer, rx, cache_size));

    Ok((
        StreamSaverTap {
            reader,
            tx: tx.clone(),
        },
        StreamSaver {
            tx,
            handle,
            scratch,
            target: target.to_path_buf(),
            format,
        },
    ))
}

/// First `<target>.wav` or `<target>(N).wav` that does not exist yet.
pub(crate) fn non_existent_wav_path(target: &Path) -> PathBuf {
    let base = target.to_string_lossy();
    let mut candidate = PathBuf::from(format!("{base}.wav"));
    let mut counter = 0usize;
    while candidate.exists() {
        counter += 1;
        candidate = PathBuf::from(format!("{base}({counter}).wav"));
    }
    candidate
}

fn run_saver(
    mut writer: WavWriter<File>,
    rx: Receiver<SaveMessage>,
    cache_size: usize,
) -> Result<()> {
    let mut cache: Vec<Vec<u8>> = Vec::new();
    let mut total_cached = 0usize;

    loop {
        match rx.recv_timeout(INBOX_TIMEOUT) {
            Ok(SaveMessage::Data(data)) => {
                total_cached += data.len();
                cache.push(data);
                if total_cached >= cache_size {
                    write_cached(&mut writer, &mut cache, &mut total_cached)?;
                }
            }
            Ok(SaveMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }
    // drain remaining windows before closing the file
    while let Ok(message) = rx.try_recv() {
        if let SaveMessage::Data(data) = message {
            total_cached += data.len();
            cache.push(data);
        }
    }
    write_cached(&mut writer, &mut cache, &mut total_cached)?;
    writer.finish()?;
    Ok(())
}

fn write_cached(
    writer: &mut WavWriter<File>,
    cache: &mut Vec<Vec<u8>>,
    total_cached: &mut usize,
) -> Result<()> {
    for data in cache.drain(..) {
        writer.write_data(&data)?;
    }
    *total_cached = 0;
    Ok(())
}

impl WindowStream for StreamSaverTap {
    fn open(&mut self) -> Result<(), SourceError> {
        WindowStream::open(&mut self.reader)
    }

    fn close(&mut self) {
        WindowStream::close(&mut self.reader)
    }

    fn read_window(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        match self.reader.read_window()? {
            Some(window) => {
                let _ = self.tx.send(SaveMessage::Data(window.clone()));
                Ok(Some(window))
            }
            None => {
                let _ = self.tx.send(SaveMessage::Stop);
                Ok(None)
            }
        }
    }

    fn params(&self) -> AudioParams {
        WindowStream::params(&self.reader)
    }

    fn block_dur(&self) -> f64 {
        WindowStream::block_dur(&self.reader)
    }
}

impl StreamSaver {
    /// Stop the background thread, flush and close the WAVE file, and
    /// encode it to the requested format if needed.
    ///
    /// Returns the path audio ended up at. An exhausted encoder chain
    /// surfaces as an encoding error (downcastable from the returned
    /// error) with the scratch path preserved.
    pub fn finish(self) -> Result<PathBuf> {
        let _ = self.tx.send(SaveMessage::Stop);
        match self.handle.join() {
            Ok(result) => result?,
            Err(_) => anyhow::bail!("stream saver thread panicked"),
        }
        if self.scratch != self.target {
            encode_wave(&self.scratch, &self.target, &self.format)?;
        }
        Ok(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aad::process::ReaderOptions;
    use aad::source::{BufferSource, wave};

    #[test]
    fn test_tap_preserves_stream_bytes() {
        let params = AudioParams::new(100, 2, 1).unwrap();
        let data: Vec<u8> = (0..250u16).flat_map(|i| i.to_le_bytes()).collect();
        let source = Box::new(BufferSource::new(data.clone(), params).unwrap());
        let reader = WindowReader::new(source, &ReaderOptions::default()).unwrap();

        let mut target = std::env::temp_dir();
        target.push(format!("aad_stream_saver_test_{}.wav", std::process::id()));

        let (mut tap, saver) = stream_saver(reader, &target, None).unwrap();
        WindowStream::open(&mut tap).unwrap();
        while tap.read_window().unwrap().is_some() {}
        WindowStream::close(&mut tap);

        let saved_to = saver.finish().unwrap();
        assert_eq!(saved_to, target);

        let (read_params, read_data) = wave::load_wave(&target).unwrap();
        assert_eq!(read_params, params);
        assert_eq!(read_data, data);
        std::fs::remove_file(&target).ok();
    }

    #[test]
    fn test_scratch_name_avoids_existing_files() {
        let dir = std::env::temp_dir();
        let base = dir.join(format!("aad_scratch_test_{}.mp3", std::process::id()));
        let first = non_existent_wav_path(&base);
        std::fs::write(&first, b"x").unwrap();
        let second = non_existent_wav_path(&base);
        assert_ne!(first, second);
        assert!(second.to_string_lossy().contains("(1)"));
        std::fs::remove_file(&first).ok();
    }

    #[test]
    fn test_finish_without_eof_pill_flushes() {
        // driver-side stop (e.g. interrupt) must still produce a valid file
        let params = AudioParams::new(100, 2, 1).unwrap();
        let data: Vec<u8> = vec![0u8; 200];
        let source = Box::new(BufferSource::new(data, params).unwrap());
        let reader = WindowReader::new(source, &ReaderOptions::default()).unwrap();

        let mut target = std::env::temp_dir();
        target.push(format!(
            "aad_stream_saver_interrupt_{}.wav",
            std::process::id()
        ));

        let (mut tap, saver) = stream_saver(reader, &target, None).unwrap();
        WindowStream::open(&mut tap).unwrap();
        tap.read_window().unwrap();
        saver.finish().unwrap();

        let (_, read_data) = wave::load_wave(&target).unwrap();
        assert_eq!(read_data.len(), 2); // one 1-frame window at 100 Hz * 0.01 s
        std::fs::remove_file(&target).ok();
    }
}
