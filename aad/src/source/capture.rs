//! Capture-device source backed by cpal.
//!
//! The cpal stream is not `Send`, so `open` spawns a dedicated thread that
//! owns the stream and forwards byte chunks over a channel. `read` pulls
//! whole frames from that channel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::source::{AudioParams, AudioSource};
use crate::utils::errors::SourceError;

pub const DEFAULT_FRAMES_PER_BUFFER: usize = 1024;

/// Reads frames from a native capture device. Not rewindable.
pub struct CaptureSource {
    params: AudioParams,
    frames_per_buffer: usize,
    device_index: Option<usize>,
    state: Option<CaptureState>,
}

struct CaptureState {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureSource {
    /// Checks device availability up front so a missing capture device is
    /// reported at startup rather than at the first read.
    pub fn new(
        params: AudioParams,
        frames_per_buffer: usize,
        device_index: Option<usize>,
    ) -> Result<Self, SourceError> {
        let host = cpal::default_host();
        pick_device(&host, device_index).map_err(SourceError::Capture)?;
        Ok(Self {
            params,
            frames_per_buffer,
            device_index,
            state: None,
        })
    }
}

impl AudioSource for CaptureSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.state.is_some() {
            return Ok(());
        }
        let (data_tx, data_rx) = mpsc::channel::<Vec<u8>>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let stop = Arc::new(AtomicBool::new(false));

        let params = self.params;
        let frames_per_buffer = self.frames_per_buffer;
        let device_index = self.device_index;
        let thread_stop = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            run_capture_stream(
                params,
                frames_per_buffer,
                device_index,
                data_tx,
                ready_tx,
                thread_stop,
            );
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.state = Some(CaptureState {
                    rx: data_rx,
                    pending: VecDeque::new(),
                    stop,
                    thread: Some(thread),
                });
                Ok(())
            }
            Ok(Err(message)) => {
                let _ = thread.join();
                Err(SourceError::Capture(message))
            }
            Err(mpsc::RecvError) => {
                let _ = thread.join();
                Err(SourceError::Capture(
                    "capture thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.stop.store(true, Ordering::Relaxed);
            if let Some(thread) = state.thread.take() {
                let _ = thread.join();
            }
        }
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, SourceError> {
        let frame_size = self.params.frame_size();
        let state = self.state.as_mut().ok_or(SourceError::NotOpen)?;

        let wanted = crate::source::effective_size(size).map(|frames| frames * frame_size);
        loop {
            if let Some(wanted) = wanted {
                if state.pending.len() >= wanted {
                    break;
                }
            }
            match state.rx.recv() {
                Ok(chunk) => state.pending.extend(chunk),
                Err(mpsc::RecvError) => break, // stream ended
            }
        }

        let available = state.pending.len();
        let take = wanted.map_or(available, |w| w.min(available));
        let take = take - take % frame_size;
        if take == 0 {
            return Ok(None);
        }
        Ok(Some(state.pending.drain(..take).collect()))
    }

    fn params(&self) -> AudioParams {
        self.params
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_capture_stream(
    params: AudioParams,
    frames_per_buffer: usize,
    device_index: Option<usize>,
    data_tx: Sender<Vec<u8>>,
    ready_tx: Sender<Result<(), String>>,
    stop: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match pick_device(&host, device_index) {
        Ok(device) => device,
        Err(message) => {
            let _ = ready_tx.send(Err(message));
            return;
        }
    };

    let config = cpal::StreamConfig {
        channels: params.channels as u16,
        sample_rate: cpal::SampleRate(params.sampling_rate),
        buffer_size: cpal::BufferSize::Fixed(frames_per_buffer as u32),
    };
    let err_fn = |err| log::error!("capture stream error: {err}");

    let callback_stop = Arc::clone(&stop);
    let stream = match params.sample_width {
        1 => device.build_input_stream(
            &config,
            move |data: &[i8], _: &cpal::InputCallbackInfo| {
                if !callback_stop.load(Ordering::Relaxed) {
                    let bytes: Vec<u8> = data.iter().map(|s| *s as u8).collect();
                    let _ = data_tx.send(bytes);
                }
            },
            err_fn,
            None,
        ),
        2 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if !callback_stop.load(Ordering::Relaxed) {
                    let bytes: Vec<u8> =
                        data.iter().flat_map(|s| s.to_le_bytes()).collect();
                    let _ = data_tx.send(bytes);
                }
            },
            err_fn,
            None,
        ),
        4 => device.build_input_stream(
            &config,
            move |data: &[i32], _: &cpal::InputCallbackInfo| {
                if !callback_stop.load(Ordering::Relaxed) {
                    let bytes: Vec<u8> =
                        data.iter().flat_map(|s| s.to_le_bytes()).collect();
                    let _ = data_tx.send(bytes);
                }
            },
            err_fn,
            None,
        ),
        _ => unreachable!("sample width validated at construction"),
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(e.to_string()));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
}

fn pick_device(host: &cpal::Host, index: Option<usize>) -> Result<cpal::Device, String> {
    match index {
        None => host
            .default_input_device()
            .ok_or_else(|| "no default input device".to_string()),
        Some(index) => {
            let mut devices = host
                .input_devices()
                .map_err(|e| format!("cannot enumerate input devices: {e}"))?;
            devices
                .nth(index)
                .ok_or_else(|| format!("no input device with index {index}"))
        }
    }
}
