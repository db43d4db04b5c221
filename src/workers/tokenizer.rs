//! The tokenizer worker: drives the window reader in its own thread, runs
//! the detection automaton and fans events out to observers.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta};

use aad::process::{DataSource, EnergyValidator, StreamTokenizer};
use aad::region::AudioRegion;
use aad::utils::errors::SourceError;

use super::{Message, WindowStream};

/// One detected event, as reported after the run.
#[derive(Debug, Clone)]
pub struct Detection {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub timestamp: DateTime<Local>,
}

pub struct TokenizerWorker {
    handle: JoinHandle<Result<Vec<Detection>>>,
    stop_tx: Sender<()>,
}

/// Wraps the reader so the automaton sees end-of-stream as soon as a stop
/// is requested.
struct StoppableStream<'a> {
    reader: &'a mut dyn WindowStream,
    stop_rx: &'a Receiver<()>,
}

impl DataSource for StoppableStream<'_> {
    type Frame = Vec<u8>;

    fn read(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        if self.stop_rx.try_recv().is_ok() {
            return Ok(None);
        }
        self.reader.read_window()
    }
}

impl TokenizerWorker {
    /// Spawn the worker. Events are broadcast to every observer in
    /// detection-id order; the poison pill follows the last event.
    pub fn spawn(
        mut reader: Box<dyn WindowStream>,
        mut tokenizer: StreamTokenizer<EnergyValidator>,
        observers: Vec<Sender<Message>>,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || -> Result<Vec<Detection>> {
            let audio_params = reader.params();
            let block_dur = reader.block_dur();

            reader.open()?;
            let processing_start = Local::now();
            let mut detections: Vec<Detection> = Vec::new();

            let result = {
                let mut source = StoppableStream {
                    reader: reader.as_mut(),
                    stop_rx: &stop_rx,
                };
                tokenizer.tokenize(&mut source, |token| {
                    let id = detections.len() as u64 + 1;
                    let start = token.start as f64 * block_dur;
                    let data: Vec<u8> = token.data.concat();
                    let region = match AudioRegion::new(data, audio_params, start) {
                        Ok(region) => region,
                        Err(e) => {
                            log::error!("dropping malformed detection {id}: {e}");
                            return;
                        }
                    };
                    let timestamp = processing_start
                        + TimeDelta::milliseconds((start * 1000.0) as i64);
                    let region = Arc::new(region.with_timestamp(timestamp));

                    let detection = Detection {
                        id,
                        start,
                        end: region.end(),
                        duration: region.duration(),
                        timestamp,
                    };
                    log::debug!(
                        "[DET]: Detection {} (start: {:.3}, end: {:.3}, duration: {:.3})",
                        detection.id,
                        detection.start,
                        detection.end,
                        detection.duration
                    );
                    detections.push(detection);

                    for observer in &observers {
                        let _ = observer.send(Message::Event(id, Arc::clone(&region)));
                    }
                })
            };

            for observer in &observers {
                let _ = observer.send(Message::Stop);
            }
            reader.close();
            result?;

            log::info!("processing complete: {} detection(s)", detections.len());
            Ok(detections)
        });

        Self { handle, stop_tx }
    }

    /// Ask the worker to stop reading further windows. In-flight events
    /// are still post-processed and dispatched.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to finish and collect its detections.
    pub fn join(self) -> Result<Vec<Detection>> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("tokenizer thread panicked")),
        }
    }
}
