//! Encoder bridge: transcode a WAVE scratch file to another format with an
//! external encoder.
//!
//! Encoders are tried in a fixed order: `ffmpeg`, `avconv`, `sox`. A
//! missing binary or a non-zero exit moves on to the next; when the chain
//! is exhausted the scratch file is preserved and an error carrying its
//! path is returned.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::utils::errors::EncodeError;

/// Encode `scratch` (a WAVE file) into `format` at `target`.
///
/// On success the scratch file is deleted, unless it is the target itself.
pub fn encode_wave(scratch: &Path, target: &Path, format: &str) -> Result<(), EncodeError> {
    let encoders: [(&str, Vec<&std::ffi::OsStr>); 3] = [
        ("ffmpeg", ffmpeg_args(scratch, target, format)),
        ("avconv", ffmpeg_args(scratch, target, format)),
        ("sox", sox_args(scratch, target)),
    ];

    for (encoder, args) in encoders {
        match run_encoder(encoder, &args) {
            Ok(()) => {
                log::debug!("encoded '{}' with {encoder}", target.display());
                if scratch != target {
                    if let Err(e) = std::fs::remove_file(scratch) {
                        log::warn!(
                            "couldn't remove scratch file '{}': {e}",
                            scratch.display()
                        );
                    }
                }
                return Ok(());
            }
            Err(reason) => {
                log::debug!("{encoder} failed: {reason}");
            }
        }
    }

    Err(EncodeError::ChainExhausted {
        format: format.to_string(),
        scratch: scratch.to_path_buf(),
    })
}

fn ffmpeg_args<'a>(scratch: &'a Path, target: &'a Path, format: &'a str) -> Vec<&'a std::ffi::OsStr> {
    vec![
        "-y".as_ref(),
        "-f".as_ref(),
        "wav".as_ref(),
        "-i".as_ref(),
        scratch.as_os_str(),
        "-f".as_ref(),
        format.as_ref(),
        target.as_os_str(),
    ]
}

fn sox_args<'a>(scratch: &'a Path, target: &'a Path) -> Vec<&'a std::ffi::OsStr> {
    vec![
        "-t".as_ref(),
        "wav".as_ref(),
        scratch.as_os_str(),
        target.as_os_str(),
    ]
}

fn run_encoder(encoder: &str, args: &[&std::ffi::OsStr]) -> Result<(), String> {
    let output = Command::new(encoder)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_chain_preserves_scratch() {
        // an unknown format makes every encoder fail (or be absent)
        let mut scratch = std::env::temp_dir();
        scratch.push(format!("aad_encode_test_{}.wav", std::process::id()));
        std::fs::write(&scratch, b"RIFF").unwrap();

        let target = scratch.with_extension("definitely-not-a-format");
        let err = encode_wave(&scratch, &target, "definitely-not-a-format").unwrap_err();
        assert_eq!(err.scratch_path(), &scratch);
        assert!(scratch.exists());

        std::fs::remove_file(&scratch).ok();
    }
}
