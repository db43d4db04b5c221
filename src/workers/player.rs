//! Playback observer: plays each detected event through the default
//! loudspeaker.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use aad::region::AudioRegion;

use super::EventSink;

pub struct PlayerSink {
    // the output stream must stay alive for the sink to produce sound
    _stream: OutputStream,
    handle: OutputStreamHandle,
    progress_bar: bool,
    multi: MultiProgress,
}

impl PlayerSink {
    /// Open the default output device. Must be called on the worker
    /// thread: the stream is not `Send`.
    pub fn new(progress_bar: bool, multi: MultiProgress) -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("no audio output device available")?;
        Ok(Self {
            _stream: stream,
            handle,
            progress_bar,
            multi,
        })
    }

    fn play_blocking(&self, region: &AudioRegion) -> Result<()> {
        let params = region.params();
        let sink = Sink::try_new(&self.handle).context("cannot open playback sink")?;
        let channels = params.channels as u16;
        let rate = params.sampling_rate;

        match params.sample_width {
            1 => {
                let samples: Vec<i16> = region
                    .data()
                    .iter()
                    .map(|&b| (b as i8 as i16) << 8)
                    .collect();
                sink.append(SamplesBuffer::new(channels, rate, samples));
            }
            2 => {
                let samples: Vec<i16> = region
                    .data()
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect();
                sink.append(SamplesBuffer::new(channels, rate, samples));
            }
            4 => {
                let samples: Vec<f32> = region
                    .data()
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32 / i32::MAX as f32)
                    .collect();
                sink.append(SamplesBuffer::new(channels, rate, samples));
            }
            _ => unreachable!("sample width validated at construction"),
        }

        if self.progress_bar {
            let total_ms = (region.duration() * 1000.0) as u64;
            let pb = self.multi.add(ProgressBar::new(total_ms));
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40.cyan/blue} {elapsed_precise}")
            {
                pb.set_style(style);
            }
            let started = Instant::now();
            while !sink.empty() {
                pb.set_position((started.elapsed().as_millis() as u64).min(total_ms));
                std::thread::sleep(Duration::from_millis(100));
            }
            pb.finish_and_clear();
        } else {
            sink.sleep_until_end();
        }
        Ok(())
    }
}

impl EventSink for PlayerSink {
    fn name(&self) -> &'static str {
        "player"
    }

    fn handle(&mut self, id: u64, region: &AudioRegion) -> Result<()> {
        log::debug!("[PLAY]: Detection {id} played");
        self.play_blocking(region)
    }
}
