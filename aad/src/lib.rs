//! Audio activity detection engine.
//!
//! Consumes a continuous PCM stream, partitions it into fixed-size analysis
//! windows, classifies each window as valid or silent by log-energy, and
//! folds the classified stream into time-bounded audio events.
//!
//! ## Pipeline
//!
//! 1. Open an endpoint with [`source::open_input`] (file, stdin or capture
//!    device), or build a [`source::BufferSource`] over bytes in memory.
//! 2. Wrap it in a [`process::WindowReader`] for fixed-duration windows,
//!    optionally limited, recorded or overlapping.
//! 3. Run [`process::StreamTokenizer::tokenize`] with an
//!    [`process::EnergyValidator`] to obtain events.
//!
//! ```rust,no_run
//! use aad::process::{EnergyValidator, ReaderOptions, StreamTokenizer, TokenizerMode, WindowReader};
//! use aad::signal::ChannelSelector;
//! use aad::source::{AudioParams, BufferSource};
//!
//! let params = AudioParams::new(16000, 2, 1)?;
//! let source = Box::new(BufferSource::new(std::fs::read("audio.raw")?, params)?);
//! let mut reader = WindowReader::new(source, &ReaderOptions::default())?;
//! reader.open()?;
//!
//! let validator = EnergyValidator::new(50.0, params, ChannelSelector::Any)?;
//! let mut tokenizer = StreamTokenizer::new(validator, 20, 500, 30, TokenizerMode::default())?;
//! for token in tokenizer.tokenize_to_vec(&mut reader)? {
//!     println!("event: windows {}..={}", token.start, token.end);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// PCM byte/sample conversion, channel selection and log-energy.
pub mod signal;

/// Audio source endpoints: buffer, raw file, WAVE file, stdin, capture.
pub mod source;

/// Window reader, energy validator and the tokenizer automaton.
pub mod process;

/// The [`AudioRegion`](region::AudioRegion) value type.
pub mod region;

/// Error taxonomies and the external-encoder bridge.
pub mod utils;
