use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ParamError {
    #[error("Sample width must be one of 1, 2 or 4 bytes, got {0}")]
    InvalidSampleWidth(usize),

    #[error("Sampling rate must be > 0")]
    InvalidSamplingRate,

    #[error("Number of channels must be > 0")]
    InvalidChannels,

    #[error(
        "Audio data length must be a multiple of sample_width * channels = {frame_size}, got {len} bytes"
    )]
    DataLengthNotMultiple { len: usize, frame_size: usize },

    #[error(
        "Channel {selected} out of range for {channels}-channel audio. \
         Selected channel must be 'mix' or an integer >= -channels and < channels"
    )]
    ChannelOutOfRange { selected: i64, channels: usize },

    #[error(
        "Unknown channel selector '{0}', expected an integer, 'left', 'right', 'mix', 'avg' or 'average'"
    )]
    UnknownChannelSelector(String),

    #[error("Analysis window of {block_dur}s holds no frame at {sampling_rate} Hz")]
    WindowTooSmall { block_dur: f64, sampling_rate: u32 },

    #[error("hop_dur must be > 0 and <= block_dur, got hop of {hop} frames for a window of {block} frames")]
    InvalidHop { hop: usize, block: usize },

    #[error("'max_length' must be > 0, got {0}")]
    InvalidMaxLength(usize),

    #[error("'min_length' must be > 0 and <= 'max_length', got {0}")]
    InvalidMinLength(usize),

    #[error("'max_continuous_silence' must be < 'max_length', got {0}")]
    InvalidMaxSilence(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Audio stream is not open")]
    NotOpen,

    #[error("Audio source is neither rewindable nor recorded")]
    NotRewindable,

    #[error("Position {0} out of range")]
    PositionOutOfRange(i64),

    #[error("Not a RIFF/WAVE file: {0}")]
    InvalidWaveHeader(String),

    #[error("WAVE encoding {0:#06X} is not PCM")]
    UnsupportedWaveEncoding(u16),

    #[error(
        "Unsupported audio format '{0}'. Supported input formats are wav and raw; \
         convert the input with an external encoder first"
    )]
    UnsupportedFormat(String),

    #[error("Capture device unavailable: {0}")]
    Capture(String),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error(
        "Couldn't encode audio in format '{format}'. Either none of 'ffmpeg', 'avconv' or 'sox' \
         is installed or this format is not recognized. Audio was kept as WAVE in '{scratch}'"
    )]
    ChainExhausted { format: String, scratch: PathBuf },
}

impl EncodeError {
    /// Path of the WAVE scratch file preserved after a failed encode.
    pub fn scratch_path(&self) -> &PathBuf {
        match self {
            EncodeError::ChainExhausted { scratch, .. } => scratch,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
