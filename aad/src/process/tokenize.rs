//! Stream tokenizer: a 4-state automaton that turns a sequence of
//! valid/silent frames into time-bounded tokens.

use crate::process::validator::FrameValidator;
use crate::utils::errors::{ParamError, SourceError};

/// Yields frames to [`StreamTokenizer::tokenize`]; `None` ends the run.
pub trait DataSource {
    type Frame;

    fn read(&mut self) -> Result<Option<Self::Frame>, SourceError>;
}

/// Emission policy flags.
///
/// `strict_min_length` rejects an event shorter than `min_length` even when
/// it is contiguous to a previous truncated event. `drop_trailing_silence`
/// removes tolerated trailing silent frames from non-truncated events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizerMode {
    pub strict_min_length: bool,
    pub drop_trailing_silence: bool,
}

/// A delivered token: accumulated frames plus inclusive frame bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<F> {
    pub data: Vec<F>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Silence,
    PossibleNoise,
    Noise,
    PossibleSilence,
}

/// The detection automaton.
///
/// Lengths are counted in frames and include tolerated silent frames.
/// `init_min`/`init_max_silence` gate event qualification: until `init_min`
/// valid frames have been seen, at most `init_max_silence` consecutive
/// silent frames are tolerated before the accumulation is discarded.
pub struct StreamTokenizer<V> {
    validator: V,
    min_length: usize,
    max_length: usize,
    max_continuous_silence: usize,
    init_min: usize,
    init_max_silence: usize,
    mode: TokenizerMode,
}

struct Run<F> {
    state: State,
    data: Vec<F>,
    start_frame: usize,
    current_frame: usize,
    init_count: usize,
    silence_length: usize,
    contiguous: bool,
}

impl<F> Run<F> {
    fn new() -> Self {
        Self {
            state: State::Silence,
            data: Vec::new(),
            start_frame: 0,
            current_frame: 0,
            init_count: 0,
            silence_length: 0,
            contiguous: false,
        }
    }
}

impl<V> StreamTokenizer<V> {
    pub fn new(
        validator: V,
        min_length: usize,
        max_length: usize,
        max_continuous_silence: usize,
        mode: TokenizerMode,
    ) -> Result<Self, ParamError> {
        if max_length == 0 {
            return Err(ParamError::InvalidMaxLength(max_length));
        }
        if min_length == 0 || min_length > max_length {
            return Err(ParamError::InvalidMinLength(min_length));
        }
        if max_continuous_silence >= max_length {
            return Err(ParamError::InvalidMaxSilence(max_continuous_silence));
        }
        Ok(Self {
            validator,
            min_length,
            max_length,
            max_continuous_silence,
            init_min: 0,
            init_max_silence: 0,
            mode,
        })
    }

    /// Require `init_min` initial valid frames with at most
    /// `init_max_silence` tolerated silent frames before qualification.
    pub fn with_init(mut self, init_min: usize, init_max_silence: usize) -> Self {
        self.init_min = init_min;
        self.init_max_silence = init_max_silence;
        self
    }

    /// Consume `source` to exhaustion, delivering each accepted token.
    ///
    /// The run is a pure function of the frame sequence and the
    /// configuration.
    pub fn tokenize<F, S, D>(&mut self, source: &mut S, mut deliver: D) -> Result<(), SourceError>
    where
        V: FrameValidator<F>,
        S: DataSource<Frame = F>,
        D: FnMut(Token<F>),
    {
        let mut run = Run::new();
        while let Some(frame) = source.read()? {
            self.process(&mut run, frame, &mut deliver);
            run.current_frame += 1;
        }
        self.post_process(&mut run, &mut deliver);
        Ok(())
    }

    /// Like [`tokenize`](Self::tokenize) but collects tokens into a vector.
    pub fn tokenize_to_vec<F, S>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<Token<F>>, SourceError>
    where
        V: FrameValidator<F>,
        S: DataSource<Frame = F>,
    {
        let mut tokens = Vec::new();
        self.tokenize(source, |token| tokens.push(token))?;
        Ok(tokens)
    }

    fn process<F, D>(&self, run: &mut Run<F>, frame: F, deliver: &mut D)
    where
        V: FrameValidator<F>,
        D: FnMut(Token<F>),
    {
        let valid = self.validator.is_valid(&frame);

        match run.state {
            State::Silence => {
                if valid {
                    run.init_count = 1;
                    run.silence_length = 0;
                    run.start_frame = run.current_frame;
                    run.data.push(frame);
                    if run.init_count >= self.init_min {
                        run.state = State::Noise;
                        if run.data.len() >= self.max_length {
                            self.end_of_detection(run, true, deliver);
                        }
                    } else {
                        run.state = State::PossibleNoise;
                    }
                }
            }

            State::PossibleNoise => {
                if valid {
                    run.silence_length = 0;
                    run.init_count += 1;
                    run.data.push(frame);
                    if run.init_count >= self.init_min {
                        run.state = State::Noise;
                        if run.data.len() >= self.max_length {
                            self.end_of_detection(run, true, deliver);
                        }
                    }
                } else {
                    run.silence_length += 1;
                    if run.silence_length > self.init_max_silence
                        || run.data.len() + 1 >= self.max_length
                    {
                        // init_max_silence or max_length reached before
                        // init_min frames, discard and go back to silence
                        run.data.clear();
                        run.state = State::Silence;
                    } else {
                        run.data.push(frame);
                    }
                }
            }

            State::Noise => {
                if valid {
                    run.data.push(frame);
                    if run.data.len() >= self.max_length {
                        self.end_of_detection(run, true, deliver);
                    }
                } else if self.max_continuous_silence == 0 {
                    self.end_of_detection(run, false, deliver);
                    run.state = State::Silence;
                } else {
                    // first tolerated silent frame after a valid one
                    run.silence_length = 1;
                    run.data.push(frame);
                    run.state = State::PossibleSilence;
                    if run.data.len() == self.max_length {
                        self.end_of_detection(run, true, deliver);
                        // keep silence_length, the total silent-run count
                        // is still needed
                    }
                }
            }

            State::PossibleSilence => {
                if valid {
                    run.data.push(frame);
                    run.silence_length = 0;
                    run.state = State::Noise;
                    if run.data.len() >= self.max_length {
                        self.end_of_detection(run, true, deliver);
                    }
                } else if run.silence_length >= self.max_continuous_silence {
                    if run.silence_length < run.data.len() {
                        self.end_of_detection(run, false, deliver);
                    } else {
                        // everything gathered is silence
                        run.data.clear();
                    }
                    run.state = State::Silence;
                    run.silence_length = 0;
                } else {
                    run.data.push(frame);
                    run.silence_length += 1;
                    if run.data.len() >= self.max_length {
                        self.end_of_detection(run, true, deliver);
                        // keep silence_length here as well
                    }
                }
            }
        }
    }

    fn post_process<F, D: FnMut(Token<F>)>(&self, run: &mut Run<F>, deliver: &mut D) {
        if matches!(run.state, State::Noise | State::PossibleSilence)
            && !run.data.is_empty()
            && run.data.len() > run.silence_length
        {
            self.end_of_detection(run, false, deliver);
        }
    }

    fn end_of_detection<F, D: FnMut(Token<F>)>(
        &self,
        run: &mut Run<F>,
        truncated: bool,
        deliver: &mut D,
    ) {
        if !truncated && self.mode.drop_trailing_silence && run.silence_length > 0 {
            // reached max_continuous_silence, or ended at tolerated silence
            run.data.truncate(run.data.len() - run.silence_length);
        }

        let accepted = run.data.len() >= self.min_length
            || (!run.data.is_empty() && !self.mode.strict_min_length && run.contiguous);

        if accepted {
            let end_frame = run.start_frame + run.data.len() - 1;
            deliver(Token {
                data: std::mem::take(&mut run.data),
                start: run.start_frame,
                end: end_frame,
            });
            if truncated {
                // next token, if any, starts right after the current frame
                run.start_frame = run.current_frame + 1;
                run.contiguous = true;
            } else {
                run.contiguous = false;
            }
        } else {
            run.contiguous = false;
        }

        run.data.clear();
    }
}
