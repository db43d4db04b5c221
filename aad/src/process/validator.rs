//! Energy-based frame validation.

use crate::signal::{self, ChannelSelector};
use crate::source::AudioParams;
use crate::utils::errors::ParamError;

/// Decides whether a frame is acoustically active.
pub trait FrameValidator<F> {
    fn is_valid(&self, frame: &F) -> bool;
}

/// Validates analysis windows by comparing their log-energy to a threshold.
///
/// The channel selection rule decides which signal the energy is computed
/// on: a single channel, the average of all channels, or each channel
/// separately with the window valid as soon as any channel passes.
#[derive(Debug, Clone)]
pub struct EnergyValidator {
    energy_threshold: f64,
    sample_width: usize,
    channels: usize,
    selector: ChannelSelector,
}

impl EnergyValidator {
    pub fn new(
        energy_threshold: f64,
        params: AudioParams,
        selector: ChannelSelector,
    ) -> Result<Self, ParamError> {
        selector.validate(params.channels)?;
        Ok(Self {
            energy_threshold,
            sample_width: params.sample_width,
            channels: params.channels,
            selector,
        })
    }

    pub fn energy_threshold(&self) -> f64 {
        self.energy_threshold
    }

    fn window_energy(&self, window: &[u8]) -> f64 {
        match self.selector {
            ChannelSelector::Index(index) => {
                match signal::extract_channel(window, self.sample_width, self.channels, index) {
                    Ok(channel) => {
                        signal::log_energy(&signal::to_samples(&channel, self.sample_width))
                    }
                    Err(_) => f64::NEG_INFINITY,
                }
            }
            ChannelSelector::Mix => {
                match signal::mix_channels(window, self.sample_width, self.channels) {
                    Ok(mixed) => {
                        signal::log_energy(&signal::to_samples(&mixed, self.sample_width))
                    }
                    Err(_) => f64::NEG_INFINITY,
                }
            }
            ChannelSelector::Any => {
                match signal::channel_log_energies(window, self.sample_width, self.channels) {
                    Ok(energies) => energies.into_iter().fold(f64::NEG_INFINITY, f64::max),
                    Err(_) => f64::NEG_INFINITY,
                }
            }
        }
    }
}

impl FrameValidator<Vec<u8>> for EnergyValidator {
    fn is_valid(&self, window: &Vec<u8>) -> bool {
        self.window_energy(window) >= self.energy_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_window(left: i16, right: i16, frames: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(frames * 4);
        for _ in 0..frames {
            out.extend_from_slice(&left.to_le_bytes());
            out.extend_from_slice(&right.to_le_bytes());
        }
        out
    }

    fn stereo_params() -> AudioParams {
        AudioParams::new(16000, 2, 2).unwrap()
    }

    #[test]
    fn test_any_channel_uses_max_energy() {
        // left silent, right loud: valid because one channel is active
        let window = stereo_window(0, 10_000, 160);
        let validator =
            EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Any).unwrap();
        assert!(validator.is_valid(&window));

        let silent = stereo_window(0, 0, 160);
        assert!(!validator.is_valid(&silent));
    }

    #[test]
    fn test_single_channel_selection() {
        let window = stereo_window(0, 10_000, 160);
        let left =
            EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Index(0)).unwrap();
        assert!(!left.is_valid(&window));
        let right =
            EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Index(1)).unwrap();
        assert!(right.is_valid(&window));
        let right_negative =
            EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Index(-1)).unwrap();
        assert!(right_negative.is_valid(&window));
    }

    #[test]
    fn test_mix_averages_channels() {
        // opposite-phase full-scale channels cancel out in the mix
        let window = stereo_window(10_000, -10_000, 160);
        let mix = EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Mix).unwrap();
        assert!(!mix.is_valid(&window));
        let any = EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Any).unwrap();
        assert!(any.is_valid(&window));
    }

    #[test]
    fn test_threshold_boundary() {
        let params = AudioParams::new(16000, 2, 1).unwrap();
        let window: Vec<u8> = std::iter::repeat_n(1000i16, 160)
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let energy = 10.0 * (1000.0f64 * 1000.0).log10();
        let accept = EnergyValidator::new(energy - 0.1, params, ChannelSelector::Any).unwrap();
        assert!(accept.is_valid(&window));
        let reject = EnergyValidator::new(energy + 0.1, params, ChannelSelector::Any).unwrap();
        assert!(!reject.is_valid(&window));
    }

    #[test]
    fn test_selector_validated_at_construction() {
        assert!(matches!(
            EnergyValidator::new(50.0, stereo_params(), ChannelSelector::Index(2)),
            Err(ParamError::ChannelOutOfRange { .. })
        ));
    }
}
