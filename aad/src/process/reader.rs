//! Fixed-duration analysis windows over an audio source.
//!
//! The reader composes an audio source with optional wrappers applied in a
//! fixed order: `source -> limiter? -> recorder?`, with window overlap
//! handled by the reader itself.

use crate::process::tokenize::DataSource;
use crate::source::{AudioParams, AudioSource, BufferSource};
use crate::utils::errors::{ParamError, SourceError};

pub const DEFAULT_BLOCK_DUR: f64 = 0.01;

/// Reader configuration, durations in seconds.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Analysis window duration.
    pub block_dur: f64,
    /// Hop between consecutive windows; `None` means no overlap.
    pub hop_dur: Option<f64>,
    /// Cap on the total amount of audio drawn from the source.
    pub max_read: Option<f64>,
    /// Retain all bytes read so the reader can rewind over any source.
    pub record: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            block_dur: DEFAULT_BLOCK_DUR,
            hop_dur: None,
            max_read: None,
            record: false,
        }
    }
}

/// Caps the aggregate byte count drawn from the wrapped source.
struct Limiter {
    source: Box<dyn AudioSource>,
    max_bytes: usize,
    read_bytes: usize,
}

impl AudioSource for Limiter {
    fn open(&mut self) -> Result<(), SourceError> {
        self.source.open()
    }

    fn close(&mut self) {
        self.source.close();
    }

    fn is_open(&self) -> bool {
        self.source.is_open()
    }

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError> {
        let remaining = self.max_bytes.saturating_sub(self.read_bytes);
        if remaining == 0 {
            return Ok(None);
        }
        let frame_size = self.params().frame_size();
        let remaining_frames = remaining / frame_size;
        let frames = match size {
            Some(frames) => frames.min(remaining_frames),
            None => remaining_frames,
        };
        if frames == 0 {
            return Ok(None);
        }
        match self.source.read(Some(frames))? {
            Some(data) => {
                self.read_bytes += data.len();
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    fn params(&self) -> AudioParams {
        self.source.params()
    }

    fn rewindable(&self) -> bool {
        self.source.rewindable()
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.source.rewind()?;
        self.read_bytes = 0;
        Ok(())
    }
}

/// Retains every byte read; on rewind the wrapped source is replaced with
/// an in-memory buffer over the recorded log.
struct Recorder {
    source: Box<dyn AudioSource>,
    log: Vec<u8>,
    recording: bool,
}

impl AudioSource for Recorder {
    fn open(&mut self) -> Result<(), SourceError> {
        self.source.open()
    }

    fn close(&mut self) {
        self.source.close();
    }

    fn is_open(&self) -> bool {
        self.source.is_open()
    }

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError> {
        let data = self.source.read(size)?;
        if self.recording {
            if let Some(ref data) = data {
                self.log.extend_from_slice(data);
            }
        }
        Ok(data)
    }

    fn params(&self) -> AudioParams {
        self.source.params()
    }

    fn rewindable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        if self.recording {
            let params = self.source.params();
            self.source.close();
            let mut buffer = BufferSource::new(std::mem::take(&mut self.log), params)?;
            buffer.open()?;
            self.source = Box::new(buffer);
            self.recording = false;
            Ok(())
        } else {
            self.source.rewind()
        }
    }
}

/// Drives an audio source and yields fixed-size analysis windows.
pub struct WindowReader {
    source: Box<dyn AudioSource>,
    params: AudioParams,
    block_size: usize,
    hop_size: usize,
    cache: Vec<u8>,
    first_block_read: bool,
}

impl std::fmt::Debug for WindowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowReader")
            .field("params", &self.params)
            .field("block_size", &self.block_size)
            .field("hop_size", &self.hop_size)
            .field("cache", &self.cache)
            .field("first_block_read", &self.first_block_read)
            .finish()
    }
}

impl WindowReader {
    pub fn new(source: Box<dyn AudioSource>, options: &ReaderOptions) -> Result<Self, ParamError> {
        let params = source.params();
        let block_size = (options.block_dur * params.sampling_rate as f64).round() as usize;
        if block_size == 0 {
            return Err(ParamError::WindowTooSmall {
                block_dur: options.block_dur,
                sampling_rate: params.sampling_rate,
            });
        }
        let hop_size = match options.hop_dur {
            Some(hop_dur) => (hop_dur * params.sampling_rate as f64).round() as usize,
            None => block_size,
        };
        if hop_size == 0 || hop_size > block_size {
            return Err(ParamError::InvalidHop {
                hop: hop_size,
                block: block_size,
            });
        }

        let mut source = source;
        if let Some(max_read) = options.max_read {
            let max_bytes =
                (max_read * params.sampling_rate as f64) as usize * params.frame_size();
            source = Box::new(Limiter {
                source,
                max_bytes,
                read_bytes: 0,
            });
        }
        if options.record {
            source = Box::new(Recorder {
                source,
                log: Vec::new(),
                recording: true,
            });
        }

        Ok(Self {
            source,
            params,
            block_size,
            hop_size,
            cache: Vec::new(),
            first_block_read: false,
        })
    }

    pub fn open(&mut self) -> Result<(), SourceError> {
        self.source.open()
    }

    pub fn close(&mut self) {
        self.source.close();
    }

    pub fn is_open(&self) -> bool {
        self.source.is_open()
    }

    pub fn params(&self) -> AudioParams {
        self.params
    }

    /// Window size in frames.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Duration in seconds of one analysis window.
    pub fn block_dur(&self) -> f64 {
        self.block_size as f64 / self.params.sampling_rate as f64
    }

    /// Read the next analysis window, or `None` at end-of-stream.
    pub fn read(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        if self.hop_size == self.block_size {
            return self.source.read(Some(self.block_size));
        }
        if !self.first_block_read {
            return self.read_first_block();
        }
        self.read_next_block()
    }

    fn read_first_block(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let hop_bytes = self.hop_size * self.params.frame_size();
        match self.source.read(Some(self.block_size))? {
            Some(block) => {
                if block.len() > hop_bytes {
                    self.cache = block[hop_bytes..].to_vec();
                }
                self.first_block_read = true;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    fn read_next_block(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let hop_bytes = self.hop_size * self.params.frame_size();
        let block_bytes = self.block_size * self.params.frame_size();
        match self.source.read(Some(self.hop_size))? {
            Some(fresh) => {
                let mut block = std::mem::take(&mut self.cache);
                block.extend_from_slice(&fresh);
                // keep a slice in cache only for a full-length block;
                // anything shorter is the trailing block
                if block.len() == block_bytes {
                    self.cache = block[hop_bytes..].to_vec();
                }
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Restart from offset zero. Works when the backing source is
    /// rewindable or when recording was requested.
    pub fn rewind(&mut self) -> Result<(), SourceError> {
        if !self.source.rewindable() {
            return Err(SourceError::NotRewindable);
        }
        self.source.rewind()?;
        self.cache.clear();
        self.first_block_read = false;
        Ok(())
    }

    pub fn rewindable(&self) -> bool {
        self.source.rewindable()
    }
}

impl DataSource for WindowReader {
    type Frame = Vec<u8>;

    fn read(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        WindowReader::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_buffer(frames: usize, rate: u32) -> Box<dyn AudioSource> {
        let params = AudioParams::new(rate, 2, 1).unwrap();
        let data: Vec<u8> = (0..frames).flat_map(|i| (i as i16).to_le_bytes()).collect();
        Box::new(BufferSource::new(data, params).unwrap())
    }

    fn collect_windows(reader: &mut WindowReader) -> Vec<Vec<u8>> {
        let mut windows = Vec::new();
        while let Some(window) = reader.read().unwrap() {
            windows.push(window);
        }
        windows
    }

    #[test]
    fn test_fixed_windows_without_overlap() {
        // 100 Hz, block_dur 0.1 s -> 10-frame windows
        let mut reader = WindowReader::new(
            make_buffer(25, 100),
            &ReaderOptions {
                block_dur: 0.1,
                ..Default::default()
            },
        )
        .unwrap();
        reader.open().unwrap();
        let windows = collect_windows(&mut reader);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].len(), 20);
        assert_eq!(windows[1].len(), 20);
        assert_eq!(windows[2].len(), 10); // short tail
    }

    #[test]
    fn test_zero_frame_window_is_rejected() {
        let err = WindowReader::new(
            make_buffer(10, 100),
            &ReaderOptions {
                block_dur: 0.001,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::WindowTooSmall { .. }));
    }

    #[test]
    fn test_overlapping_windows() {
        // block 4 frames, hop 2 frames over 8 frames of data:
        // [0..4], [2..6], [4..8], then the stream ends
        let mut reader = WindowReader::new(
            make_buffer(8, 100),
            &ReaderOptions {
                block_dur: 0.04,
                hop_dur: Some(0.02),
                ..Default::default()
            },
        )
        .unwrap();
        reader.open().unwrap();
        let windows = collect_windows(&mut reader);
        let frames: Vec<Vec<i16>> = windows
            .iter()
            .map(|w| {
                w.chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect()
            })
            .collect();
        assert_eq!(frames[0], vec![0, 1, 2, 3]);
        assert_eq!(frames[1], vec![2, 3, 4, 5]);
        assert_eq!(frames[2], vec![4, 5, 6, 7]);
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn test_overlap_trailing_short_block() {
        // block 4, hop 2 over 7 frames: last block is [4..7], 3 frames
        let mut reader = WindowReader::new(
            make_buffer(7, 100),
            &ReaderOptions {
                block_dur: 0.04,
                hop_dur: Some(0.02),
                ..Default::default()
            },
        )
        .unwrap();
        reader.open().unwrap();
        let windows = collect_windows(&mut reader);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].len(), 6);
    }

    #[test]
    fn test_invalid_hop() {
        let err = WindowReader::new(
            make_buffer(10, 100),
            &ReaderOptions {
                block_dur: 0.04,
                hop_dur: Some(0.08),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::InvalidHop { .. }));
    }

    #[test]
    fn test_max_read_caps_source_bytes() {
        // 100 Hz, 0.15 s cap -> 15 frames of the 30 available
        let mut reader = WindowReader::new(
            make_buffer(30, 100),
            &ReaderOptions {
                block_dur: 0.1,
                max_read: Some(0.15),
                ..Default::default()
            },
        )
        .unwrap();
        reader.open().unwrap();
        let windows = collect_windows(&mut reader);
        let total: usize = windows.iter().map(Vec::len).sum();
        assert_eq!(total, 30); // 15 frames * 2 bytes
        assert_eq!(windows.last().unwrap().len(), 10); // short last window
    }

    #[test]
    fn test_record_enables_rewind_and_preserves_stream() {
        let mut reader = WindowReader::new(
            make_buffer(30, 100),
            &ReaderOptions {
                block_dur: 0.1,
                max_read: Some(0.2),
                record: true,
                ..Default::default()
            },
        )
        .unwrap();
        reader.open().unwrap();
        let first_pass: Vec<u8> = collect_windows(&mut reader).concat();
        assert_eq!(first_pass.len(), 40);

        reader.rewind().unwrap();
        let second_pass: Vec<u8> = collect_windows(&mut reader).concat();
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_rewind_without_record_uses_backing_source() {
        let mut reader =
            WindowReader::new(make_buffer(10, 100), &ReaderOptions::default()).unwrap();
        reader.open().unwrap();
        collect_windows(&mut reader);
        reader.rewind().unwrap();
        assert!(!collect_windows(&mut reader).is_empty());
    }

    #[test]
    fn test_windows_hold_whole_frames() {
        let params = AudioParams::new(100, 2, 2).unwrap();
        let data: Vec<u8> = (0..100u16).flat_map(|i| i.to_le_bytes()).collect();
        let source = Box::new(BufferSource::new(data, params).unwrap());
        let mut reader = WindowReader::new(
            source,
            &ReaderOptions {
                block_dur: 0.07,
                ..Default::default()
            },
        )
        .unwrap();
        reader.open().unwrap();
        for window in collect_windows(&mut reader) {
            assert_eq!(window.len() % params.frame_size(), 0);
        }
    }
}
