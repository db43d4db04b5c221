//! Raw PCM from process standard input.

use std::io;

use crate::source::{AudioParams, AudioSource, read_full_frames};
use crate::utils::errors::SourceError;

/// Reads headerless PCM from stdin. Not rewindable.
pub struct StdinSource {
    params: AudioParams,
    open: bool,
}

impl StdinSource {
    pub fn new(params: AudioParams) -> Self {
        Self {
            params,
            open: false,
        }
    }
}

impl AudioSource for StdinSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        let mut stdin = io::stdin().lock();
        read_full_frames(&mut stdin, size, self.params.frame_size())
    }

    fn params(&self) -> AudioParams {
        self.params
    }
}
