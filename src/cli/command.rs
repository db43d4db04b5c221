use std::path::PathBuf;

use clap::Parser as ClapParser;

const IO_OPTIONS: &str = "Input-Output options";
const TOKENIZATION_OPTIONS: &str = "Tokenization options";
const AUDIO_PARAMETERS: &str = "Audio parameters";
const USE_EVENTS: &str = "Use audio events";
const LOGGING: &str = "Logging";

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "An audio activity detection tool",
    long_about = None,
)]
pub struct Cli {
    /// Input audio file. Use '-' for stdin [Default: read from the
    /// default capture device].
    #[arg(value_name = "INPUT")]
    pub input: Option<String>,

    /// Capture device index. Only effective when reading from a capture
    /// device.
    #[arg(short = 'I', long, value_name = "INT", help_heading = IO_OPTIONS)]
    pub input_device_index: Option<usize>,

    /// Capture buffer size in frames. Only effective when reading from a
    /// capture device.
    #[arg(
        short = 'F',
        long = "audio-frame-per-buffer",
        value_name = "INT",
        default_value_t = 1024,
        help_heading = IO_OPTIONS
    )]
    pub frame_per_buffer: usize,

    /// Input audio format. If not provided, the format is inferred from
    /// the file extension.
    #[arg(short = 'f', long, value_name = "STRING", help_heading = IO_OPTIONS)]
    pub input_format: Option<String>,

    /// Maximum data (in seconds) to read from a capture device or a file
    /// [Default: read until the end of the file or stream].
    #[arg(short = 'M', long, value_name = "FLOAT", help_heading = IO_OPTIONS)]
    pub max_read: Option<f64>,

    /// Stream the input file from disk instead of loading it to memory
    /// first.
    #[arg(short = 'L', long, help_heading = IO_OPTIONS)]
    pub large_file: bool,

    /// Save read audio data to a file. If omitted, no audio data is saved.
    #[arg(short = 'O', long, value_name = "FILE", help_heading = IO_OPTIONS)]
    pub save_stream: Option<PathBuf>,

    /// File name format for saving detected events. Accepts the
    /// placeholders {id} (sequential, starting from 1), {start}, {end}
    /// and {duration}; time placeholders are in seconds.
    /// Example: 'Event_{id}_{start}-{end}_{duration:.3}.wav'
    #[arg(short = 'o', long, value_name = "TEMPLATE", help_heading = IO_OPTIONS)]
    pub save_detections_as: Option<String>,

    /// Join detected audio events in the --save-stream file, separated by
    /// the given duration of silence.
    #[arg(short = 'j', long, value_name = "FLOAT", help_heading = IO_OPTIONS)]
    pub join_detections: Option<f64>,

    /// Audio format for saving detections and/or the main stream. If not
    /// provided, the format is (1) inferred from the file extension or
    /// (2) raw.
    #[arg(short = 'T', long, value_name = "STRING", help_heading = IO_OPTIONS)]
    pub output_format: Option<String>,

    /// Audio channel to use for detection on multi-channel input (0 is
    /// the first channel). By default all channels are used, capturing a
    /// valid event from any channel. Set to 'mix' (or 'avg'/'average') to
    /// average all channels into one. Saved events always keep the
    /// channel count of the input.
    #[arg(short = 'u', long, value_name = "INT/STRING", help_heading = IO_OPTIONS)]
    pub use_channel: Option<String>,

    /// Size of the analysis window in seconds.
    #[arg(
        short = 'a',
        long,
        value_name = "FLOAT",
        default_value_t = 0.01,
        help_heading = TOKENIZATION_OPTIONS
    )]
    pub analysis_window: f64,

    /// Minimum duration of a valid audio event in seconds.
    #[arg(
        short = 'n',
        long,
        value_name = "FLOAT",
        default_value_t = 0.2,
        help_heading = TOKENIZATION_OPTIONS
    )]
    pub min_duration: f64,

    /// Maximum duration of a valid audio event in seconds.
    #[arg(
        short = 'm',
        long,
        value_name = "FLOAT",
        default_value_t = 5.0,
        help_heading = TOKENIZATION_OPTIONS
    )]
    pub max_duration: f64,

    /// Maximum duration of consecutive silence allowed within a valid
    /// audio event, in seconds.
    #[arg(
        short = 's',
        long,
        value_name = "FLOAT",
        default_value_t = 0.3,
        help_heading = TOKENIZATION_OPTIONS
    )]
    pub max_silence: f64,

    /// Remove trailing silence from a detection [Default: trailing
    /// silence is retained].
    #[arg(short = 'd', long, help_heading = TOKENIZATION_OPTIONS)]
    pub drop_trailing_silence: bool,

    /// Reject events shorter than --min-duration even when adjacent to
    /// the most recent event that reached --max-duration [Default: retain
    /// such events].
    #[arg(short = 'R', long, help_heading = TOKENIZATION_OPTIONS)]
    pub strict_min_duration: bool,

    /// Log-energy threshold for detection.
    #[arg(
        short = 'e',
        long,
        value_name = "FLOAT",
        default_value_t = 50.0,
        help_heading = TOKENIZATION_OPTIONS
    )]
    pub energy_threshold: f64,

    /// Sampling rate of audio data, for headerless input (raw file or
    /// stdin) and capture.
    #[arg(
        short = 'r',
        long = "rate",
        value_name = "INT",
        default_value_t = 16000,
        help_heading = AUDIO_PARAMETERS
    )]
    pub rate: u32,

    /// Number of channels of audio data, for headerless input and capture.
    #[arg(
        short = 'c',
        long,
        value_name = "INT",
        default_value_t = 1,
        help_heading = AUDIO_PARAMETERS
    )]
    pub channels: usize,

    /// Number of bytes per audio sample, for headerless input and capture.
    #[arg(
        short = 'w',
        long = "width",
        value_name = "INT",
        default_value_t = 2,
        help_heading = AUDIO_PARAMETERS
    )]
    pub width: usize,

    /// Command to execute when an audio event is detected. Use '{file}'
    /// as a placeholder for the temporary WAVE file holding the event
    /// (e.g. `-C 'du -h {file}'`).
    #[arg(short = 'C', long, value_name = "STRING", help_heading = USE_EVENTS)]
    pub command: Option<String>,

    /// Immediately play back each detected audio event.
    #[arg(short = 'E', long, help_heading = USE_EVENTS)]
    pub echo: bool,

    /// Show a progress bar while playing audio.
    #[arg(short = 'B', long, help_heading = USE_EVENTS)]
    pub progress_bar: bool,

    /// Plot the audio signal along with detections (delegated to external
    /// tooling; not available in this build).
    #[arg(short = 'p', long, help_heading = USE_EVENTS)]
    pub plot: bool,

    /// Save the plotted signal and detections to a picture or PDF file
    /// (delegated to external tooling; not available in this build).
    #[arg(long, value_name = "FILE", help_heading = USE_EVENTS)]
    pub save_image: Option<PathBuf>,

    /// Print information about each audio event on a new line. Accepts
    /// text and the placeholders {id}, {start}, {end}, {duration} and
    /// {timestamp}. Time placeholders follow --time-format.
    /// Example: '[{id}]: {start} -> {end} -- {timestamp}'
    #[arg(
        long,
        value_name = "STRING",
        default_value = "{id} {start} {end}",
        help_heading = USE_EVENTS
    )]
    pub printf: String,

    /// Format of {start}, {end} and {duration} with --printf. %S prints
    /// absolute seconds, %I absolute milliseconds; any mix of %h, %m, %s
    /// and %i converts into hours, minutes, seconds and milliseconds and
    /// prints the provided fields. %S and %I can only be used alone.
    #[arg(
        long,
        value_name = "STRING",
        default_value = "%S",
        help_heading = USE_EVENTS
    )]
    pub time_format: String,

    /// strftime-style format of the {timestamp} placeholder.
    #[arg(
        long,
        value_name = "STRING",
        default_value = "%Y/%m/%d %H:%M:%S",
        help_heading = USE_EVENTS
    )]
    pub timestamp_format: String,

    /// Quiet mode: do not print any information about events.
    #[arg(short = 'q', long, help_heading = LOGGING)]
    pub quiet: bool,

    /// Debug mode: log processing operations to stderr.
    #[arg(short = 'D', long, help_heading = LOGGING)]
    pub debug: bool,

    /// Log processing operations to the specified file.
    #[arg(long, value_name = "FILE", help_heading = LOGGING)]
    pub debug_file: Option<PathBuf>,
}
