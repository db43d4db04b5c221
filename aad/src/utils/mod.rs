//! Supporting infrastructure.
//!
//! - **Error types** ([`errors`]): parameter, source, encoding and save
//!   error taxonomies.
//! - **Encoder bridge** ([`encode`]): external-encoder fallback chain for
//!   non-WAVE output formats.

pub mod encode;
pub mod errors;
