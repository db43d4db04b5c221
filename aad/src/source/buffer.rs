//! In-memory audio source with rewind and absolute seek.

use crate::signal::check_data_multiple;
use crate::source::{AudioParams, AudioSource};
use crate::utils::errors::SourceError;

/// An [`AudioSource`] over a byte buffer. Rewindable and seekable by
/// sample, second or millisecond.
#[derive(Debug, Clone)]
pub struct BufferSource {
    buffer: Vec<u8>,
    params: AudioParams,
    position_bytes: usize,
    open: bool,
}

impl BufferSource {
    pub fn new(buffer: Vec<u8>, params: AudioParams) -> Result<Self, SourceError> {
        check_data_multiple(&buffer, params.sample_width, params.channels)?;
        Ok(Self {
            buffer,
            params,
            position_bytes: 0,
            open: false,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Current position in frames.
    pub fn position(&self) -> usize {
        self.position_bytes / self.params.frame_size()
    }

    /// Seek to an absolute position in frames. Negative positions count
    /// from the end of the buffer.
    pub fn seek(&mut self, position: i64) -> Result<(), SourceError> {
        let frame_size = self.params.frame_size() as i64;
        let mut byte_position = position * frame_size;
        if byte_position < 0 {
            byte_position += self.buffer.len() as i64;
        }
        if byte_position < 0 || byte_position > self.buffer.len() as i64 {
            return Err(SourceError::PositionOutOfRange(position));
        }
        self.position_bytes = byte_position as usize;
        Ok(())
    }

    pub fn seek_seconds(&mut self, seconds: f64) -> Result<(), SourceError> {
        self.seek((seconds * self.params.sampling_rate as f64) as i64)
    }

    pub fn seek_ms(&mut self, milliseconds: i64) -> Result<(), SourceError> {
        self.seek(self.params.sampling_rate as i64 * milliseconds / 1000)
    }

    /// Append more frames to the buffer.
    pub fn append_data(&mut self, data: &[u8]) -> Result<(), SourceError> {
        check_data_multiple(data, self.params.sample_width, self.params.channels)?;
        self.buffer.extend_from_slice(data);
        Ok(())
    }
}

impl AudioSource for BufferSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.position_bytes = 0;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        let remaining = self.buffer.len() - self.position_bytes;
        let bytes_to_read = match crate::source::effective_size(size) {
            Some(frames) => (frames * self.params.frame_size()).min(remaining),
            None => remaining,
        };
        if bytes_to_read == 0 {
            return Ok(None);
        }
        let start = self.position_bytes;
        self.position_bytes += bytes_to_read;
        Ok(Some(self.buffer[start..start + bytes_to_read].to_vec()))
    }

    fn params(&self) -> AudioParams {
        self.params
    }

    fn rewindable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.position_bytes = 0;
        Ok(())
    }
}
