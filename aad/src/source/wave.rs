//! Canonical RIFF/WAVE reading and writing (PCM encoding only).

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::source::{AudioParams, AudioSource, read_full_frames};
use crate::utils::errors::SourceError;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_MAGIC: &[u8; 4] = b"WAVE";
const FMT_CHUNK: &[u8; 4] = b"fmt ";
const DATA_CHUNK: &[u8; 4] = b"data";
const FORMAT_PCM: u16 = 1;

/// Parsed WAVE header: PCM parameters plus the location of the data chunk.
#[derive(Debug, Clone, Copy)]
pub struct WaveSpec {
    pub params: AudioParams,
    pub data_offset: u64,
    pub data_len: u64,
}

/// Parse the RIFF/WAVE header of `reader`, leaving it positioned at the
/// start of the data chunk.
pub fn read_wave_header<R: Read + Seek>(reader: &mut R) -> Result<WaveSpec, SourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != RIFF_MAGIC {
        return Err(SourceError::InvalidWaveHeader(
            "missing RIFF signature".into(),
        ));
    }
    reader.seek(SeekFrom::Current(4))?; // RIFF size
    reader.read_exact(&mut magic)?;
    if &magic != WAVE_MAGIC {
        return Err(SourceError::InvalidWaveHeader(
            "missing WAVE signature".into(),
        ));
    }

    let mut params: Option<AudioParams> = None;
    loop {
        let mut chunk_id = [0u8; 4];
        if let Err(e) = reader.read_exact(&mut chunk_id) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Err(SourceError::InvalidWaveHeader("no data chunk".into()));
            }
            return Err(e.into());
        }
        let mut size_bytes = [0u8; 4];
        reader.read_exact(&mut size_bytes)?;
        let chunk_size = u32::from_le_bytes(size_bytes) as u64;

        match &chunk_id {
            id if id == FMT_CHUNK => {
                let mut fmt = vec![0u8; chunk_size as usize];
                reader.read_exact(&mut fmt)?;
                if fmt.len() < 16 {
                    return Err(SourceError::InvalidWaveHeader("fmt chunk too short".into()));
                }
                let format_tag = u16::from_le_bytes([fmt[0], fmt[1]]);
                if format_tag != FORMAT_PCM {
                    return Err(SourceError::UnsupportedWaveEncoding(format_tag));
                }
                let channels = u16::from_le_bytes([fmt[2], fmt[3]]) as usize;
                let sampling_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
                let bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
                if !bits_per_sample.is_multiple_of(8) {
                    return Err(SourceError::InvalidWaveHeader(format!(
                        "bits per sample must be a multiple of 8, got {bits_per_sample}"
                    )));
                }
                let sample_width = bits_per_sample as usize / 8;
                params = Some(AudioParams::new(sampling_rate, sample_width, channels)?);
                if chunk_size.is_multiple_of(2) {
                    continue;
                }
                reader.seek(SeekFrom::Current(1))?; // chunk padding
            }
            id if id == DATA_CHUNK => {
                let params = params.ok_or_else(|| {
                    SourceError::InvalidWaveHeader("data chunk before fmt chunk".into())
                })?;
                let data_offset = reader.stream_position()?;
                return Ok(WaveSpec {
                    params,
                    data_offset,
                    data_len: chunk_size,
                });
            }
            _ => {
                // skip unknown chunks, honoring the even-byte padding rule
                let skip = chunk_size + (chunk_size & 1);
                reader.seek(SeekFrom::Current(skip as i64))?;
            }
        }
    }
}

/// Load a whole WAVE file to memory, returning its parameters and sample
/// data.
pub fn load_wave(path: &Path) -> Result<(AudioParams, Vec<u8>), SourceError> {
    let mut reader = BufReader::new(File::open(path)?);
    let spec = read_wave_header(&mut reader)?;
    let mut data = vec![0u8; spec.data_len as usize];
    reader.read_exact(&mut data)?;
    Ok((spec.params, data))
}

/// Streaming [`AudioSource`] over a WAVE file; parameters come from the
/// container header.
pub struct WaveFileSource {
    path: PathBuf,
    spec: WaveSpec,
    stream: Option<BufReader<File>>,
    remaining: u64,
}

impl WaveFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let spec = read_wave_header(&mut reader)?;
        Ok(Self {
            path,
            spec,
            stream: None,
            remaining: 0,
        })
    }
}

impl AudioSource for WaveFileSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.stream.is_none() {
            let mut reader = BufReader::new(File::open(&self.path)?);
            reader.seek(SeekFrom::Start(self.spec.data_offset))?;
            self.stream = Some(reader);
            self.remaining = self.spec.data_len;
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
        if self.stream.is_none() {
            return Err(SourceError::NotOpen);
        }
        let frame_size = self.spec.params.frame_size();
        let remaining_frames = (self.remaining / frame_size as u64) as usize;
        if remaining_frames == 0 {
            return Ok(None);
        }
        let frames = match crate::source::effective_size(size) {
            Some(frames) => frames.min(remaining_frames),
            None => remaining_frames,
        };
        let stream = self.stream.as_mut().ok_or(SourceError::NotOpen)?;
        let data = read_full_frames(stream, Some(frames), frame_size)?;
        if let Some(ref data) = data {
            self.remaining -= data.len() as u64;
        }
        Ok(data)
    }

    fn params(&self) -> AudioParams {
        self.spec.params
    }

    fn rewindable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        match self.stream.as_mut() {
            Some(stream) => {
                stream.seek(SeekFrom::Start(self.spec.data_offset))?;
                self.remaining = self.spec.data_len;
                Ok(())
            }
            None => self.open(),
        }
    }
}

/// Canonical RIFF/WAVE writer for PCM audio.
///
/// Sizes in the header are placeholders until [`WavWriter::finish`] seeks
/// back and patches them.
pub struct WavWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    params: AudioParams,
    riff_size_position: u64,
    data_size_position: u64,
    data_written: u64,
    header_written: bool,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(writer: W, params: AudioParams) -> Self {
        Self {
            writer: BufWriter::new(writer),
            params,
            riff_size_position: 0,
            data_size_position: 0,
            data_written: 0,
            header_written: false,
        }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(RIFF_MAGIC)?;
        self.riff_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // RIFF size, patched later
        self.writer.write_all(WAVE_MAGIC)?;

        self.writer.write_all(FMT_CHUNK)?;
        self.writer.write_all(&16u32.to_le_bytes())?;
        self.writer.write_all(&FORMAT_PCM.to_le_bytes())?;
        self.writer
            .write_all(&(self.params.channels as u16).to_le_bytes())?;
        self.writer
            .write_all(&self.params.sampling_rate.to_le_bytes())?;
        self.writer
            .write_all(&(self.params.bytes_per_second() as u32).to_le_bytes())?;
        self.writer
            .write_all(&(self.params.frame_size() as u16).to_le_bytes())?;
        self.writer
            .write_all(&((self.params.sample_width * 8) as u16).to_le_bytes())?;

        self.writer.write_all(DATA_CHUNK)?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // data size, patched later
        self.header_written = true;
        Ok(())
    }

    /// Append interleaved PCM bytes to the data chunk.
    pub fn write_data(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.header_written {
            self.write_header()?;
        }
        self.writer.write_all(data)?;
        self.data_written += data.len() as u64;
        Ok(())
    }

    /// Patch chunk sizes and flush. Idempotent with respect to the data.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.header_written {
            self.write_header()?;
        }
        self.writer.flush()?;
        let end = self.writer.stream_position()?;

        self.writer
            .seek(SeekFrom::Start(self.data_size_position))?;
        self.writer
            .write_all(&(self.data_written as u32).to_le_bytes())?;

        self.writer
            .seek(SeekFrom::Start(self.riff_size_position))?;
        let riff_size = end - self.riff_size_position - 4;
        self.writer.write_all(&(riff_size as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn data_written(&self) -> u64 {
        self.data_written
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

/// Write `data` as a WAVE file at `path`.
pub fn write_wave_file(path: &Path, data: &[u8], params: AudioParams) -> io::Result<()> {
    let mut writer = WavWriter::new(File::create(path)?, params);
    writer.write_header()?;
    writer.write_data(data)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_to_cursor(data: &[u8], params: AudioParams) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(cursor, params);
        writer.write_header().unwrap();
        writer.write_data(data).unwrap();
        writer.finish().unwrap();
        writer.into_inner().unwrap().into_inner()
    }

    #[test]
    fn test_header_layout() {
        let params = AudioParams::new(16000, 2, 1).unwrap();
        let bytes = write_to_cursor(&[], params);
        assert_eq!(&bytes[0..4], RIFF_MAGIC);
        assert_eq!(&bytes[8..12], WAVE_MAGIC);
        assert_eq!(&bytes[12..16], FMT_CHUNK);
        assert_eq!(&bytes[36..40], DATA_CHUNK);
        // RIFF size covers everything after its own field
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            bytes.len() as u32 - 8
        );
    }

    #[test]
    fn test_round_trip() {
        let params = AudioParams::new(16000, 2, 2).unwrap();
        let data: Vec<u8> = (0..640u32).flat_map(|i| (i as i16).to_le_bytes()).collect();
        let bytes = write_to_cursor(&data, params);

        let mut cursor = Cursor::new(bytes);
        let spec = read_wave_header(&mut cursor).unwrap();
        assert_eq!(spec.params, params);
        assert_eq!(spec.data_len as usize, data.len());

        let mut read_back = vec![0u8; spec.data_len as usize];
        cursor.read_exact(&mut read_back).unwrap();
        assert_eq!(read_back, data);
    }

    #[test]
    fn test_rejects_non_riff() {
        let mut cursor = Cursor::new(b"OggS00000000".to_vec());
        assert!(matches!(
            read_wave_header(&mut cursor),
            Err(SourceError::InvalidWaveHeader(_))
        ));
    }

    #[test]
    fn test_rejects_non_pcm_encoding() {
        let params = AudioParams::new(8000, 2, 1).unwrap();
        let mut bytes = write_to_cursor(&[0, 0], params);
        bytes[20] = 0x55; // format tag -> non-PCM
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read_wave_header(&mut cursor),
            Err(SourceError::UnsupportedWaveEncoding(0x55))
        ));
    }
}
