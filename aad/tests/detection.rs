//! End-to-end detection over synthesized audio.

use std::f64::consts::TAU;

use aad::process::{
    EnergyValidator, ReaderOptions, StreamTokenizer, TokenizerMode, WindowReader,
};
use aad::signal::ChannelSelector;
use aad::source::{AudioParams, BufferSource};

const RATE: u32 = 16000;

fn sine_samples(freq: f64, duration: f64, amplitude: f64) -> Vec<i16> {
    let frames = (duration * RATE as f64).round() as usize;
    (0..frames)
        .map(|i| (amplitude * (TAU * freq * i as f64 / RATE as f64).sin()) as i16)
        .collect()
}

fn silence_samples(duration: f64) -> Vec<i16> {
    vec![0i16; (duration * RATE as f64).round() as usize]
}

fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn interleave(left: &[i16], right: &[i16]) -> Vec<u8> {
    left.iter()
        .zip(right)
        .flat_map(|(l, r)| {
            let mut frame = l.to_le_bytes().to_vec();
            frame.extend_from_slice(&r.to_le_bytes());
            frame
        })
        .collect()
}

fn run_detection(
    data: Vec<u8>,
    params: AudioParams,
    selector: ChannelSelector,
    mode: TokenizerMode,
) -> Vec<(usize, usize)> {
    let source = Box::new(BufferSource::new(data, params).unwrap());
    let mut reader = WindowReader::new(
        source,
        &ReaderOptions {
            block_dur: 0.01,
            ..Default::default()
        },
    )
    .unwrap();
    reader.open().unwrap();

    let validator = EnergyValidator::new(50.0, params, selector).unwrap();
    // min 0.2 s, max 5 s, max silence 0.3 s at a 0.01 s analysis window
    let mut tokenizer = StreamTokenizer::new(validator, 20, 500, 30, mode).unwrap();
    tokenizer
        .tokenize_to_vec(&mut reader)
        .unwrap()
        .into_iter()
        .map(|token| (token.start, token.end))
        .collect()
}

#[test]
fn tone_between_silences_is_one_detection() {
    let mut samples = silence_samples(0.5);
    samples.extend(sine_samples(400.0, 0.7, 10_000.0));
    samples.extend(silence_samples(0.5));

    let params = AudioParams::new(RATE, 2, 1).unwrap();
    let events = run_detection(
        to_bytes(&samples),
        params,
        ChannelSelector::Any,
        TokenizerMode {
            strict_min_length: false,
            drop_trailing_silence: true,
        },
    );

    assert_eq!(events.len(), 1);
    let (start, end) = events[0];
    // the tone spans windows 50..=119; allow one window of slack
    assert!((49..=51).contains(&start), "start window was {start}");
    assert!((118..=120).contains(&end), "end window was {end}");
}

#[test]
fn trailing_silence_is_kept_without_drop_flag() {
    let mut samples = silence_samples(0.5);
    samples.extend(sine_samples(400.0, 0.7, 10_000.0));
    samples.extend(silence_samples(0.5));

    let params = AudioParams::new(RATE, 2, 1).unwrap();
    let events = run_detection(
        to_bytes(&samples),
        params,
        ChannelSelector::Any,
        TokenizerMode::default(),
    );

    assert_eq!(events.len(), 1);
    let (start, end) = events[0];
    assert!((49..=51).contains(&start));
    // the tolerated 0.3 s of trailing silence (30 windows) stays in
    assert!((148..=150).contains(&end), "end window was {end}");
}

#[test]
fn single_channel_activity_is_seen_by_any_but_not_by_other_channel() {
    let silence = silence_samples(2.0);
    let mut right = silence_samples(0.5);
    right.extend(sine_samples(400.0, 1.0, 10_000.0));
    right.extend(silence_samples(0.5));

    let params = AudioParams::new(RATE, 2, 2).unwrap();
    let data = interleave(&silence, &right);

    let any = run_detection(
        data.clone(),
        params,
        ChannelSelector::Any,
        TokenizerMode::default(),
    );
    assert_eq!(any.len(), 1);

    let left_only = run_detection(
        data.clone(),
        params,
        ChannelSelector::Index(0),
        TokenizerMode::default(),
    );
    assert!(left_only.is_empty());

    let right_only = run_detection(
        data,
        params,
        ChannelSelector::Index(1),
        TokenizerMode::default(),
    );
    assert_eq!(right_only.len(), 1);
}

#[test]
fn multiple_tones_yield_multiple_detections() {
    let mut samples = Vec::new();
    for _ in 0..3 {
        samples.extend(silence_samples(0.5));
        samples.extend(sine_samples(400.0, 0.4, 10_000.0));
    }
    samples.extend(silence_samples(0.5));

    let params = AudioParams::new(RATE, 2, 1).unwrap();
    let events = run_detection(
        to_bytes(&samples),
        params,
        ChannelSelector::Any,
        TokenizerMode {
            strict_min_length: false,
            drop_trailing_silence: true,
        },
    );

    assert_eq!(events.len(), 3);
    for (i, (start, end)) in events.iter().enumerate() {
        let expected_start = 50 + i * 90; // 0.5 s silence + 0.4 s tone per cycle
        assert!(
            start.abs_diff(expected_start) <= 1,
            "event {i} started at window {start}"
        );
        assert!(end > start);
    }
}
