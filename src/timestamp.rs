//! Duration and timestamp formatting for printed event lines.

use anyhow::{Result, anyhow};
use chrono::format::{Item, StrftimeItems};

/// How `{start}`, `{end}` and `{duration}` placeholders are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationFormat {
    /// `%S`: absolute seconds with millisecond precision.
    Seconds,
    /// `%I`: absolute integer milliseconds.
    Millis,
    /// Any mix of `%h`, `%m`, `%s` and `%i`; only provided fields are
    /// printed.
    Pattern(String),
}

impl DurationFormat {
    /// Parse a `--time-format` value, rejecting unknown directives.
    pub fn parse(fmt: &str) -> Result<Self> {
        match fmt {
            "%S" => return Ok(DurationFormat::Seconds),
            "%I" => return Ok(DurationFormat::Millis),
            _ => {}
        }
        let stripped = fmt
            .replace("%h", "")
            .replace("%m", "")
            .replace("%s", "")
            .replace("%i", "");
        if let Some(position) = stripped.find('%') {
            let directive: String = stripped[position..].chars().take(2).collect();
            return Err(anyhow!("Unknown time format directive '{directive}'"));
        }
        Ok(DurationFormat::Pattern(fmt.to_string()))
    }

    pub fn format(&self, seconds: f64) -> String {
        match self {
            DurationFormat::Seconds => format!("{seconds:.3}"),
            DurationFormat::Millis => format!("{}", (seconds * 1000.0) as i64),
            DurationFormat::Pattern(pattern) => {
                let millis = (seconds * 1000.0) as i64;
                let (hrs, rest) = (millis / 3_600_000, millis % 3_600_000);
                let (mins, rest) = (rest / 60_000, rest % 60_000);
                let (secs, millis) = (rest / 1000, rest % 1000);
                pattern
                    .replace("%h", &format!("{hrs:02}"))
                    .replace("%m", &format!("{mins:02}"))
                    .replace("%s", &format!("{secs:02}"))
                    .replace("%i", &format!("{millis:03}"))
            }
        }
    }
}

/// Validate a strftime-style `--timestamp-format` value.
pub fn validate_timestamp_format(fmt: &str) -> Result<()> {
    for item in StrftimeItems::new(fmt) {
        if matches!(item, Item::Error) {
            return Err(anyhow!("Invalid timestamp format '{fmt}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_format() {
        let fmt = DurationFormat::parse("%S").unwrap();
        assert_eq!(fmt.format(1.2345), "1.234");
        assert_eq!(fmt.format(0.0), "0.000");
    }

    #[test]
    fn test_millis_format() {
        let fmt = DurationFormat::parse("%I").unwrap();
        assert_eq!(fmt.format(1.2345), "1234");
    }

    #[test]
    fn test_pattern_format() {
        let fmt = DurationFormat::parse("%h:%m:%s.%i").unwrap();
        assert_eq!(fmt.format(3723.456), "01:02:03.456");

        let fmt = DurationFormat::parse("%m:%s").unwrap();
        assert_eq!(fmt.format(3723.456), "02:03");
    }

    #[test]
    fn test_unknown_directive_is_rejected() {
        assert!(DurationFormat::parse("%h:%x").is_err());
        assert!(DurationFormat::parse("%y").is_err());
    }

    #[test]
    fn test_plain_text_pattern_is_accepted() {
        let fmt = DurationFormat::parse("t=%s").unwrap();
        assert_eq!(fmt.format(12.0), "t=12");
    }

    #[test]
    fn test_timestamp_format_validation() {
        assert!(validate_timestamp_format("%Y/%m/%d %H:%M:%S").is_ok());
        assert!(validate_timestamp_format("%Q--%").is_err());
    }
}
