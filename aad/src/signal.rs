//! Conversion of interleaved PCM bytes into per-channel samples and
//! per-window log-energy computation.
//!
//! All PCM data is little-endian signed, 1, 2 or 4 bytes per sample.
//! Multi-channel data is interleaved by frame (one sample per channel).

use crate::utils::errors::ParamError;

/// Floor applied to the mean square so zero signals yield a finite energy.
pub const ENERGY_EPSILON: f64 = 1e-10;

/// Check that `data` holds a whole number of frames.
pub fn check_data_multiple(
    data: &[u8],
    sample_width: usize,
    channels: usize,
) -> Result<(), ParamError> {
    let frame_size = sample_width * channels;
    if frame_size == 0 || !data.len().is_multiple_of(frame_size) {
        return Err(ParamError::DataLengthNotMultiple {
            len: data.len(),
            frame_size,
        });
    }
    Ok(())
}

fn decode_sample(bytes: &[u8], sample_width: usize) -> i64 {
    match sample_width {
        1 => bytes[0] as i8 as i64,
        2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i64,
        4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64,
        _ => unreachable!("sample width validated at construction"),
    }
}

fn encode_sample(value: i64, sample_width: usize, dst: &mut Vec<u8>) {
    match sample_width {
        1 => dst.push(value as i8 as u8),
        2 => dst.extend_from_slice(&(value as i16).to_le_bytes()),
        4 => dst.extend_from_slice(&(value as i32).to_le_bytes()),
        _ => unreachable!("sample width validated at construction"),
    }
}

/// Decode every sample of a single-channel buffer to `f64`.
pub fn to_samples(data: &[u8], sample_width: usize) -> Vec<f64> {
    data.chunks_exact(sample_width)
        .map(|chunk| decode_sample(chunk, sample_width) as f64)
        .collect()
}

/// Extract one channel from interleaved data as raw bytes.
///
/// A negative `channel` counts from the end, python-style: `-1` is the last
/// channel.
pub fn extract_channel(
    data: &[u8],
    sample_width: usize,
    channels: usize,
    channel: i64,
) -> Result<Vec<u8>, ParamError> {
    check_data_multiple(data, sample_width, channels)?;
    let resolved = resolve_channel_index(channel, channels)?;
    if channels == 1 {
        return Ok(data.to_vec());
    }
    let frame_size = sample_width * channels;
    let mut out = Vec::with_capacity(data.len() / channels);
    for frame in data.chunks_exact(frame_size) {
        let offset = resolved * sample_width;
        out.extend_from_slice(&frame[offset..offset + sample_width]);
    }
    Ok(out)
}

/// Average all channels into one, keeping the input sample width.
///
/// The output is `data.len() / channels` bytes long.
pub fn mix_channels(
    data: &[u8],
    sample_width: usize,
    channels: usize,
) -> Result<Vec<u8>, ParamError> {
    check_data_multiple(data, sample_width, channels)?;
    if channels == 1 {
        return Ok(data.to_vec());
    }
    let frame_size = sample_width * channels;
    let mut out = Vec::with_capacity(data.len() / channels);
    for frame in data.chunks_exact(frame_size) {
        let sum: i64 = frame
            .chunks_exact(sample_width)
            .map(|chunk| decode_sample(chunk, sample_width))
            .sum();
        encode_sample(sum.div_euclid(channels as i64), sample_width, &mut out);
    }
    Ok(out)
}

fn resolve_channel_index(channel: i64, channels: usize) -> Result<usize, ParamError> {
    let resolved = if channel < 0 {
        channel + channels as i64
    } else {
        channel
    };
    if resolved < 0 || resolved >= channels as i64 {
        return Err(ParamError::ChannelOutOfRange {
            selected: channel,
            channels,
        });
    }
    Ok(resolved as usize)
}

/// Log-energy of a sample window: `10 * log10(max(mean(x^2), epsilon))`.
///
/// An empty window is treated as all-zero and yields the epsilon floor.
pub fn log_energy(samples: &[f64]) -> f64 {
    let mean_square = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64
    };
    10.0 * mean_square.max(ENERGY_EPSILON).log10()
}

/// Per-channel log-energies of an interleaved window.
pub fn channel_log_energies(
    data: &[u8],
    sample_width: usize,
    channels: usize,
) -> Result<Vec<f64>, ParamError> {
    check_data_multiple(data, sample_width, channels)?;
    let frame_size = sample_width * channels;
    let frames = data.len() / frame_size;
    let mut sums = vec![0.0f64; channels];
    for frame in data.chunks_exact(frame_size) {
        for (ch, chunk) in frame.chunks_exact(sample_width).enumerate() {
            let x = decode_sample(chunk, sample_width) as f64;
            sums[ch] += x * x;
        }
    }
    Ok(sums
        .into_iter()
        .map(|sum| {
            let mean_square = if frames == 0 { 0.0 } else { sum / frames as f64 };
            10.0 * mean_square.max(ENERGY_EPSILON).log10()
        })
        .collect())
}

/// Channel selection rule applied before energy validation.
///
/// `Any` keeps the multi-channel view: a window is considered active if any
/// channel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelSelector {
    #[default]
    Any,
    Index(i64),
    Mix,
}

impl ChannelSelector {
    /// Parse a user-supplied selector: an integer index, `left`, `right`,
    /// `mix`, `avg` or `average`.
    pub fn parse(value: &str) -> Result<Self, ParamError> {
        match value.to_ascii_lowercase().as_str() {
            "mix" | "avg" | "average" => Ok(ChannelSelector::Mix),
            "left" => Ok(ChannelSelector::Index(0)),
            "right" => Ok(ChannelSelector::Index(1)),
            other => other
                .parse::<i64>()
                .map(ChannelSelector::Index)
                .map_err(|_| ParamError::UnknownChannelSelector(value.to_string())),
        }
    }

    /// Validate the selector against a concrete channel count.
    pub fn validate(&self, channels: usize) -> Result<(), ParamError> {
        if let ChannelSelector::Index(index) = self {
            resolve_channel_index(*index, channels)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleave_i16(channels: &[&[i16]]) -> Vec<u8> {
        let len = channels[0].len();
        let mut out = Vec::new();
        for i in 0..len {
            for ch in channels {
                out.extend_from_slice(&ch[i].to_le_bytes());
            }
        }
        out
    }

    #[test]
    fn test_extract_channel() {
        let data = interleave_i16(&[&[1, 2, 3], &[-1, -2, -3]]);
        let left = extract_channel(&data, 2, 2, 0).unwrap();
        assert_eq!(to_samples(&left, 2), vec![1.0, 2.0, 3.0]);
        let right = extract_channel(&data, 2, 2, 1).unwrap();
        assert_eq!(to_samples(&right, 2), vec![-1.0, -2.0, -3.0]);
        let last = extract_channel(&data, 2, 2, -1).unwrap();
        assert_eq!(last, right);
    }

    #[test]
    fn test_extract_channel_out_of_range() {
        let data = interleave_i16(&[&[1], &[2]]);
        assert!(matches!(
            extract_channel(&data, 2, 2, 2),
            Err(ParamError::ChannelOutOfRange { .. })
        ));
        assert!(matches!(
            extract_channel(&data, 2, 2, -3),
            Err(ParamError::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_mix_channels() {
        let data = interleave_i16(&[&[100, 200], &[300, -100]]);
        let mixed = mix_channels(&data, 2, 2).unwrap();
        assert_eq!(mixed.len(), data.len() / 2);
        assert_eq!(to_samples(&mixed, 2), vec![200.0, 50.0]);
    }

    #[test]
    fn test_mix_single_channel_is_identity() {
        let data = interleave_i16(&[&[5, -5, 7]]);
        assert_eq!(mix_channels(&data, 2, 1).unwrap(), data);
    }

    #[test]
    fn test_data_length_multiple() {
        assert!(check_data_multiple(&[0u8; 8], 2, 2).is_ok());
        assert!(matches!(
            check_data_multiple(&[0u8; 7], 2, 2),
            Err(ParamError::DataLengthNotMultiple { .. })
        ));
    }

    #[test]
    fn test_log_energy_zero_signal() {
        let silent = vec![0.0f64; 160];
        assert_eq!(log_energy(&silent), 10.0 * ENERGY_EPSILON.log10());
    }

    #[test]
    fn test_log_energy_full_scale() {
        // A constant signal of amplitude a has energy 10*log10(a^2).
        let signal = vec![1000.0f64; 160];
        let expected = 10.0 * (1000.0f64 * 1000.0).log10();
        assert!((log_energy(&signal) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_channel_log_energies() {
        let loud: Vec<i16> = vec![2000; 160];
        let quiet: Vec<i16> = vec![0; 160];
        let data = interleave_i16(&[&loud, &quiet]);
        let energies = channel_log_energies(&data, 2, 2).unwrap();
        assert!(energies[0] > 60.0);
        assert_eq!(energies[1], 10.0 * ENERGY_EPSILON.log10());
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(ChannelSelector::parse("mix").unwrap(), ChannelSelector::Mix);
        assert_eq!(
            ChannelSelector::parse("average").unwrap(),
            ChannelSelector::Mix
        );
        assert_eq!(
            ChannelSelector::parse("left").unwrap(),
            ChannelSelector::Index(0)
        );
        assert_eq!(
            ChannelSelector::parse("right").unwrap(),
            ChannelSelector::Index(1)
        );
        assert_eq!(
            ChannelSelector::parse("-2").unwrap(),
            ChannelSelector::Index(-2)
        );
        assert!(ChannelSelector::parse("stereo").is_err());
    }
}
