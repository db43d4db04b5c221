//! The driver: turns parsed arguments into a source/reader pipeline and a
//! worker graph, then supervises the run until end-of-input or interrupt.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::MultiProgress;

use aad::process::{
    EnergyValidator, ReaderOptions, StreamTokenizer, TokenizerMode, WindowReader,
};
use aad::signal::ChannelSelector;
use aad::source::{AudioParams, Input, InputOptions, open_input};
use aad::utils::errors::EncodeError;

use crate::timestamp::{DurationFormat, validate_timestamp_format};
use crate::workers::command::CommandSink;
use crate::workers::joiner::{JoinerExport, joiner};
use crate::workers::player::PlayerSink;
use crate::workers::printer::{PrintSink, unescape_print_format};
use crate::workers::region_saver::RegionSaverSink;
use crate::workers::stream_saver::{StreamSaver, stream_saver};
use crate::workers::tokenizer::TokenizerWorker;
use crate::workers::{Observer, WindowStream, spawn_observer};

use super::command::Cli;

/// Guards duration-to-window-count conversions against float error.
const DURATION_EPSILON: f64 = 1e-9;

pub fn run(cli: &Cli, multi: &MultiProgress) -> Result<()> {
    if cli.plot || cli.save_image.is_some() {
        bail!(
            "plotting is delegated to external tooling and is not available in this build; \
             use --save-stream and plot the audio with your tool of choice"
        );
    }
    if cli.join_detections.is_some() && cli.save_stream.is_none() {
        bail!("--join-detections requires --save-stream");
    }

    let selector = match cli.use_channel.as_deref() {
        None => ChannelSelector::Any,
        Some(value) => ChannelSelector::parse(value)?,
    };
    let time_format = DurationFormat::parse(&cli.time_format)?;
    validate_timestamp_format(&cli.timestamp_format)?;

    let declared_params = AudioParams::new(cli.rate, cli.width, cli.channels)?;
    let input = match cli.input.as_deref() {
        Some("-") => Input::Stdin,
        Some(path) => Input::File(PathBuf::from(path)),
        None => Input::Capture,
    };
    let source = open_input(
        &input,
        &InputOptions {
            format: cli.input_format.clone(),
            params: declared_params,
            large_file: cli.large_file,
            frames_per_buffer: cli.frame_per_buffer,
            device_index: cli.input_device_index,
        },
    )?;
    let params = source.params();

    log::info!(
        "reading from {} ({} Hz, {} byte(s)/sample, {} channel(s))",
        match &input {
            Input::File(path) => path.display().to_string(),
            Input::Stdin => "stdin".to_string(),
            Input::Capture => "capture device".to_string(),
        },
        params.sampling_rate,
        params.sample_width,
        params.channels,
    );

    let reader = WindowReader::new(
        source,
        &ReaderOptions {
            block_dur: cli.analysis_window,
            hop_dur: None,
            max_read: cli.max_read,
            record: false,
        },
    )?;

    let mode = TokenizerMode {
        strict_min_length: cli.strict_min_duration,
        drop_trailing_silence: cli.drop_trailing_silence,
    };
    let min_length =
        ((cli.min_duration / cli.analysis_window).round() as usize).max(1);
    let max_length = (cli.max_duration / cli.analysis_window + DURATION_EPSILON) as usize;
    let max_continuous_silence =
        ((cli.max_silence / cli.analysis_window + DURATION_EPSILON) as usize)
            .min(max_length.saturating_sub(1));

    let validator = EnergyValidator::new(cli.energy_threshold, params, selector)?;
    let tokenizer =
        StreamTokenizer::new(validator, min_length, max_length, max_continuous_silence, mode)?;

    // fan-out observers
    let mut observers: Vec<Observer> = Vec::new();
    let mut joiner_export: Option<JoinerExport> = None;

    if let Some(template) = &cli.save_detections_as {
        let template = template.clone();
        let format = cli.output_format.clone();
        observers.push(spawn_observer("region saver", move || {
            Ok(RegionSaverSink::new(template, format))
        }));
    }

    if let (Some(silence_duration), Some(target)) = (cli.join_detections, &cli.save_stream) {
        let (sink, export) = joiner(
            target,
            cli.output_format.as_deref(),
            params,
            silence_duration,
        )?;
        joiner_export = Some(export);
        observers.push(spawn_observer("event joiner", move || Ok(sink)));
    }

    if cli.echo {
        let progress_bar = cli.progress_bar;
        let multi = multi.clone();
        observers.push(spawn_observer("player", move || {
            PlayerSink::new(progress_bar, multi)
        }));
    }

    if let Some(command) = &cli.command {
        let command = command.clone();
        observers.push(spawn_observer("command", move || {
            Ok(CommandSink::new(command))
        }));
    }

    if !cli.quiet {
        let print_format = unescape_print_format(&cli.printf);
        let time_format = time_format.clone();
        let timestamp_format = cli.timestamp_format.clone();
        observers.push(spawn_observer("printer", move || {
            Ok(PrintSink::new(print_format, time_format, timestamp_format))
        }));
    }

    // stream saver taps the reader unless the joiner owns the output file
    let mut saver: Option<StreamSaver> = None;
    let reader: Box<dyn WindowStream> = match &cli.save_stream {
        Some(target) if cli.join_detections.is_none() => {
            let (tap, worker) = stream_saver(reader, target, cli.output_format.as_deref())?;
            saver = Some(worker);
            Box::new(tap)
        }
        _ => Box::new(reader),
    };

    let senders = observers.iter().map(Observer::sender).collect();
    let worker = TokenizerWorker::spawn(reader, tokenizer, senders);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::Relaxed))
            .context("cannot install interrupt handler")?;
    }

    loop {
        if worker.is_finished() {
            break;
        }
        if interrupted.load(Ordering::Relaxed) {
            log::info!("interrupted, finishing in-flight processing");
            worker.stop();
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let run_result = worker.join();

    for observer in observers {
        observer.stop();
    }

    // the stream saver flushes and closes no matter how the run ended
    if let Some(saver) = saver {
        finish_export(saver.finish())?;
    }
    if let Some(export) = joiner_export {
        finish_export(export.export())?;
    }

    let detections = run_result?;
    log::info!("{} audio event(s) detected", detections.len());
    Ok(())
}

/// Encoding warnings keep exit code 0: the audio survived as WAVE.
fn finish_export(result: Result<PathBuf>) -> Result<()> {
    match result {
        Ok(path) => {
            log::info!("stream saved to '{}'", path.display());
            Ok(())
        }
        Err(e) => {
            if let Some(encode_error) = e.downcast_ref::<EncodeError>() {
                log::warn!("{encode_error}");
                eprintln!("{encode_error}");
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}
