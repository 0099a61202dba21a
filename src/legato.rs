//! Legato transitions of a sounding voice.
//!
//! Retuning a voice that is producing sound would cause a click, so a legato
//! request runs the voice through a short sequence instead:
//!
//! - `FadeOut`: the old note keeps sounding while its gain ramps to zero.
//! - `CatchUp`: the voice is silent and runs at a synthetic frequency for one
//!   fade length, so that its modulation catches up with where the new note
//!   would be by now.
//! - Back to `Normal` with the real target applied, still silent.
//!
//! A silent voice answers a request with `FadeIn` instead: it takes the new
//! note at once and ramps its gain up from zero. Hosts pair a sounding voice
//! with a silent one so that one fades in while the other fades out.

use crate::SampleRate;

/// Length of a legato fade.
pub const FADE_MILLIS: f32 = 5.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LegatoMode {
    #[default]
    Normal,
    FadeIn,
    FadeOut,
    CatchUp,
    /// The target note is being applied; settles to `Normal` right away.
    ToNormal,
}

/// Note a voice is asked to play.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LegatoNote {
    pub freq: f32,
    pub velocity: f32,
    pub portamento: bool,
    pub midi_note: i32,
}

/// What the voice has to do after a request or a processed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegatoAction {
    /// Keep the current note.
    Hold,
    /// Retune the voice to this note.
    Retune(LegatoNote),
}

#[derive(Debug, Clone)]
pub struct Legato {
    mode: LegatoMode,
    fade_length: usize,
    fade_step: f32,
    fade_level: f32,
    /// Samples left in the current fade or catch-up; `None` when idle.
    countdown: Option<usize>,
    pending: LegatoNote,
    /// Note the voice is sounding.
    playing: LegatoNote,
    silent: bool,
}

impl Legato {
    pub fn new(note: LegatoNote, silent: bool, sample_rate: &SampleRate) -> Self {
        let fade_length = sample_rate.samples_for_millis(FADE_MILLIS);
        Self {
            mode: LegatoMode::Normal,
            fade_length,
            fade_step: 1.0 / fade_length as f32,
            fade_level: 0.0,
            countdown: None,
            pending: note,
            playing: note,
            silent,
        }
    }

    #[inline]
    pub fn mode(&self) -> LegatoMode {
        self.mode
    }

    #[inline]
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    #[inline]
    pub fn fade_length(&self) -> usize {
        self.fade_length
    }

    #[inline]
    pub fn fade_level(&self) -> f32 {
        self.fade_level
    }

    /// The note the voice converges to.
    #[inline]
    pub fn pending(&self) -> &LegatoNote {
        &self.pending
    }

    /// The note currently sounding.
    #[inline]
    pub fn playing(&self) -> &LegatoNote {
        &self.playing
    }

    /// Handles a legato request from the host.
    ///
    /// Only one transition runs at a time: requests arriving while one is in
    /// flight replace its target note.
    pub fn request(&mut self, note: LegatoNote) -> LegatoAction {
        match self.mode {
            LegatoMode::Normal | LegatoMode::ToNormal => {
                self.pending = note;
                if self.silent {
                    self.playing = note;
                    self.fade_level = 0.0;
                    self.enter(LegatoMode::FadeIn);
                    LegatoAction::Retune(note)
                } else {
                    self.fade_level = 1.0;
                    self.enter(LegatoMode::FadeOut);
                    LegatoAction::Hold
                }
            }
            LegatoMode::FadeIn | LegatoMode::FadeOut | LegatoMode::CatchUp => {
                self.pending = note;
                LegatoAction::Hold
            }
        }
    }

    /// Called once the target note has been applied to the voice.
    pub fn settle(&mut self) {
        if self.mode == LegatoMode::ToNormal {
            self.enter(LegatoMode::Normal);
        }
    }

    /// Applies the transition to a rendered block and advances it.
    pub fn process(&mut self, out_l: &mut [f32], out_r: &mut [f32]) -> LegatoAction {
        if self.silent && self.mode != LegatoMode::FadeIn {
            out_l.fill(0.0);
            out_r.fill(0.0);
        }

        match self.mode {
            LegatoMode::CatchUp => {
                let mut countdown = self.countdown.unwrap_or(self.fade_length);
                for _ in 0..out_l.len() {
                    countdown = countdown.saturating_sub(1);
                    if countdown < 1 {
                        self.countdown = None;
                        self.playing = self.pending;
                        self.enter(LegatoMode::ToNormal);
                        return LegatoAction::Retune(self.pending);
                    }
                }
                self.countdown = Some(countdown);
                LegatoAction::Hold
            }

            LegatoMode::FadeIn => {
                let mut countdown = self.countdown.unwrap_or(self.fade_length);
                self.silent = false;
                for (left, right) in out_l.iter_mut().zip(out_r.iter_mut()) {
                    countdown = countdown.saturating_sub(1);
                    if countdown < 1 {
                        self.countdown = None;
                        if self.pending != self.playing {
                            // A request came in during the fade: run it as
                            // the next transition.
                            self.fade_level = 1.0;
                            self.enter(LegatoMode::FadeOut);
                        } else {
                            self.enter(LegatoMode::Normal);
                        }
                        return LegatoAction::Hold;
                    }
                    self.fade_level += self.fade_step;
                    *left *= self.fade_level;
                    *right *= self.fade_level;
                }
                self.countdown = Some(countdown);
                LegatoAction::Hold
            }

            LegatoMode::FadeOut => {
                let mut countdown = self.countdown.unwrap_or(self.fade_length);
                for i in 0..out_l.len() {
                    countdown = countdown.saturating_sub(1);
                    if countdown < 1 {
                        out_l[i..].fill(0.0);
                        out_r[i..].fill(0.0);
                        self.silent = true;
                        self.fade_level = 0.0;
                        self.countdown = Some(self.fade_length);
                        self.enter(LegatoMode::CatchUp);

                        // Running at this frequency for one fade length puts
                        // the silent voice where the new note would be had it
                        // started when the fade-out did.
                        let catch_up = LegatoNote {
                            freq: self.pending.freq * (self.pending.freq / self.playing.freq),
                            ..self.pending
                        };
                        return LegatoAction::Retune(catch_up);
                    }
                    self.fade_level -= self.fade_step;
                    out_l[i] *= self.fade_level;
                    out_r[i] *= self.fade_level;
                }
                self.countdown = Some(countdown);
                LegatoAction::Hold
            }

            LegatoMode::Normal | LegatoMode::ToNormal => LegatoAction::Hold,
        }
    }

    fn enter(&mut self, mode: LegatoMode) {
        log::trace!("legato: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }
}
