//! The detection pipeline.
//!
//! 1. **Window reading** ([`reader`]): drives an
//!    [`AudioSource`](crate::source::AudioSource) to yield fixed-duration
//!    analysis windows, with optional read limit, recording and overlap.
//!
//! 2. **Validation** ([`validator`]): classifies each window as valid or
//!    silent by comparing its log-energy to a threshold.
//!
//! 3. **Tokenization** ([`tokenize`]): folds the classified window stream
//!    into time-bounded events honoring length and silence policies.

pub mod reader;
pub mod tokenize;
pub mod validator;

pub use reader::{ReaderOptions, WindowReader};
pub use tokenize::{DataSource, StreamTokenizer, Token, TokenizerMode};
pub use validator::{EnergyValidator, FrameValidator};
