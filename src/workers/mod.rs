//! Message-passing workers around the tokenizer.
//!
//! Each worker owns exactly one inbox. Observers receive detected events
//! in id order and a poison pill on shutdown; on receipt they drain their
//! inbox best-effort, run a post-process hook and exit.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use aad::region::AudioRegion;
use aad::source::AudioParams;
use aad::utils::errors::SourceError;

pub mod command;
pub mod joiner;
pub mod player;
pub mod printer;
pub mod region_saver;
pub mod stream_saver;
pub mod tokenizer;

/// Inbox receive timeout, keeps cancellation prompt even when idle.
pub const INBOX_TIMEOUT: Duration = Duration::from_millis(200);

/// What flows through observer inboxes.
pub enum Message {
    /// A detected event with its sequential id.
    Event(u64, Arc<AudioRegion>),
    /// Poison pill: finish draining and exit.
    Stop,
}

/// An observer's event handler, driven by the generic inbox loop.
///
/// Implementations run entirely on their worker thread, so they need not
/// be `Send`; construction happens on that thread too.
pub trait EventSink {
    fn name(&self) -> &'static str;

    fn handle(&mut self, id: u64, region: &AudioRegion) -> anyhow::Result<()>;

    /// Post-process hook, runs after the inbox is drained.
    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A spawned observer: its inbox sender plus the thread handle.
pub struct Observer {
    name: &'static str,
    tx: Sender<Message>,
    handle: JoinHandle<()>,
}

impl Observer {
    pub fn sender(&self) -> Sender<Message> {
        self.tx.clone()
    }

    /// Request shutdown and wait for the drain + post-process to finish.
    pub fn stop(self) {
        let _ = self.tx.send(Message::Stop);
        if self.handle.join().is_err() {
            log::error!("{} worker panicked", self.name);
        }
    }
}

/// Spawn an observer thread. `make_sink` runs on the new thread, so sinks
/// may own thread-bound resources (e.g. an audio output stream).
pub fn spawn_observer<S, F>(name: &'static str, make_sink: F) -> Observer
where
    S: EventSink + 'static,
    F: FnOnce() -> anyhow::Result<S> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Message>();
    let handle = thread::spawn(move || {
        let mut sink = match make_sink() {
            Ok(sink) => sink,
            Err(e) => {
                log::error!("{name} worker failed to start: {e}");
                drain_until_stop(&rx);
                return;
            }
        };
        run_inbox_loop(&mut sink, &rx);
    });
    Observer { name, tx, handle }
}

fn run_inbox_loop<S: EventSink>(sink: &mut S, rx: &Receiver<Message>) {
    loop {
        match rx.recv_timeout(INBOX_TIMEOUT) {
            Ok(Message::Event(id, region)) => handle_event(sink, id, &region),
            Ok(Message::Stop) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    // drain whatever is still queued before exiting
    while let Ok(message) = rx.try_recv() {
        if let Message::Event(id, region) = message {
            handle_event(sink, id, &region);
        }
    }
    if let Err(e) = sink.finalize() {
        log::error!("{} worker post-process failed: {e}", sink.name());
    }
}

fn handle_event<S: EventSink>(sink: &mut S, id: u64, region: &AudioRegion) {
    if let Err(e) = sink.handle(id, region) {
        log::error!("{} worker failed on detection {id}: {e}", sink.name());
    }
}

fn drain_until_stop(rx: &Receiver<Message>) {
    loop {
        match rx.recv_timeout(INBOX_TIMEOUT) {
            Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            _ => continue,
        }
    }
}

/// The tokenizer's view of its input: a stream of analysis windows.
///
/// Implemented by the window reader directly and by the stream-saver tap
/// that forwards windows while persisting them.
pub trait WindowStream: Send {
    fn open(&mut self) -> Result<(), SourceError>;

    fn close(&mut self);

    fn read_window(&mut self) -> Result<Option<Vec<u8>>, SourceError>;

    fn params(&self) -> AudioParams;

    /// Duration in seconds of one analysis window.
    fn block_dur(&self) -> f64;
}

impl WindowStream for aad::process::WindowReader {
    fn open(&mut self) -> Result<(), SourceError> {
        aad::process::WindowReader::open(self)
    }

    fn close(&mut self) {
        aad::process::WindowReader::close(self)
    }

    fn read_window(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        self.read()
    }

    fn params(&self) -> AudioParams {
        aad::process::WindowReader::params(self)
    }

    fn block_dur(&self) -> f64 {
        aad::process::WindowReader::block_dur(self)
    }
}
