//! Headerless PCM file source.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::source::{AudioParams, AudioSource, read_full_frames};
use crate::utils::errors::SourceError;

/// Reads interleaved PCM from a file with caller-supplied parameters.
pub struct RawFileSource {
    path: PathBuf,
    params: AudioParams,
    stream: Option<BufReader<File>>,
}

impl RawFileSource {
    pub fn new<P: AsRef<Path>>(path: P, params: AudioParams) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            params,
            stream: None,
        }
    }
}

impl AudioSource for RawFileSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.stream.is_none() {
            self.stream = Some(BufReader::new(File::open(&self.path)?));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError> {
        let frame_size = self.params.frame_size();
        let stream = self.stream.as_mut().ok_or(SourceError::NotOpen)?;
        read_full_frames(stream, size, frame_size)
    }

    fn params(&self) -> AudioParams {
        self.params
    }

    fn rewindable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        match self.stream.as_mut() {
            Some(stream) => {
                stream.seek(SeekFrom::Start(0))?;
                Ok(())
            }
            None => self.open(),
        }
    }
}
