//! Subprocess observer: writes each event to a temporary WAVE file and
//! runs a user command with `{file}` substituted.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use aad::region::AudioRegion;

use super::EventSink;

pub struct CommandSink {
    command: String,
}

impl CommandSink {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl EventSink for CommandSink {
    fn name(&self) -> &'static str {
        "command"
    }

    fn handle(&mut self, id: u64, region: &AudioRegion) -> Result<()> {
        let temp = tempfile::Builder::new()
            .prefix("aadetect_")
            .suffix(".wav")
            .tempfile()
            .context("cannot create temporary WAVE file")?;
        region.save(temp.path(), Some("wav"))?;

        let command = self
            .command
            .replace("{file}", &temp.path().display().to_string());
        let status = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("couldn't run command: '{command}'"))?;
        log::debug!("[COMMAND]: Detection {id} command: '{command}' ({status})");
        // temp file removed on drop, best effort
        Ok(())
    }
}
