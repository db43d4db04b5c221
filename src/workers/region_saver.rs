//! Region saver: writes each detected event to its own file, named from a
//! user-supplied template.

use std::path::Path;

use anyhow::Result;

use aad::region::AudioRegion;

use super::EventSink;

pub struct RegionSaverSink {
    filename_template: String,
    format: Option<String>,
}

impl RegionSaverSink {
    pub fn new(filename_template: String, format: Option<String>) -> Self {
        Self {
            filename_template,
            format,
        }
    }
}

impl EventSink for RegionSaverSink {
    fn name(&self) -> &'static str {
        "region saver"
    }

    fn handle(&mut self, id: u64, region: &AudioRegion) -> Result<()> {
        let filename = render_template(
            &self.filename_template,
            id,
            region.start(),
            region.end(),
            region.duration(),
        );
        let saved = region.save(Path::new(&filename), self.format.as_deref())?;
        log::debug!("[SAVE]: Detection {id} saved as '{}'", saved.display());
        Ok(())
    }
}

/// Render a filename template holding `{id}`, `{start}`, `{end}` and
/// `{duration}` placeholders, each with an optional precision spec such as
/// `{start:.3}`. Unknown placeholders are left untouched.
pub fn render_template(template: &str, id: u64, start: f64, end: f64, duration: f64) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let placeholder = &after[..close];
                match expand_placeholder(placeholder, id, start, end, duration) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(placeholder);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn expand_placeholder(placeholder: &str, id: u64, start: f64, end: f64, duration: f64) -> Option<String> {
    let (name, spec) = match placeholder.split_once(':') {
        Some((name, spec)) => (name, Some(spec)),
        None => (placeholder, None),
    };
    let value = match name {
        "id" => return Some(id.to_string()),
        "start" => start,
        "end" => end,
        "duration" => duration,
        _ => return None,
    };
    match spec {
        None => Some(format!("{value}")),
        Some(spec) => {
            let precision = spec
                .trim_start_matches('.')
                .trim_end_matches('f')
                .parse::<usize>()
                .ok()?;
            Some(format!("{value:.precision$}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_placeholders() {
        let name = render_template("event_{id}_{start}-{end}.wav", 3, 1.5, 2.5, 1.0);
        assert_eq!(name, "event_3_1.5-2.5.wav");
    }

    #[test]
    fn test_precision_spec() {
        let name = render_template("{duration:.3}.wav", 1, 0.0, 0.5, 0.5);
        assert_eq!(name, "0.500.wav");
        let name = render_template("{start:.2f}", 1, 1.2345, 0.0, 0.0);
        assert_eq!(name, "1.23");
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        let name = render_template("{pid}_{id}", 7, 0.0, 0.0, 0.0);
        assert_eq!(name, "{pid}_7");
    }

    #[test]
    fn test_unterminated_brace() {
        let name = render_template("event_{id", 7, 0.0, 0.0, 0.0);
        assert_eq!(name, "event_{id");
    }
}
