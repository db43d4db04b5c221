//! Print observer: one formatted line per detected event on stdout.

use anyhow::Result;
use chrono::Local;

use aad::region::AudioRegion;

use crate::timestamp::DurationFormat;

use super::EventSink;

pub struct PrintSink {
    print_format: String,
    time_format: DurationFormat,
    timestamp_format: String,
}

impl PrintSink {
    pub fn new(
        print_format: String,
        time_format: DurationFormat,
        timestamp_format: String,
    ) -> Self {
        Self {
            print_format,
            time_format,
            timestamp_format,
        }
    }
}

impl EventSink for PrintSink {
    fn name(&self) -> &'static str {
        "printer"
    }

    fn handle(&mut self, id: u64, region: &AudioRegion) -> Result<()> {
        let timestamp = region
            .timestamp()
            .unwrap_or_else(Local::now)
            .format(&self.timestamp_format)
            .to_string();
        let line = self
            .print_format
            .replace("{id}", &id.to_string())
            .replace("{start}", &self.time_format.format(region.start()))
            .replace("{end}", &self.time_format.format(region.end()))
            .replace("{duration}", &self.time_format.format(region.duration()))
            .replace("{timestamp}", &timestamp);
        println!("{line}");
        Ok(())
    }
}

/// Turn the escaped `\n`, `\t` and `\r` sequences a shell may hand us into
/// real characters.
pub fn unescape_print_format(format: &str) -> String {
    format
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}
