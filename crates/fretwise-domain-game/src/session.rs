use crate::config::GameConfig;
use crate::mode::GameMode;
use crate::stats::{PitchTally, Progress};
use fretwise_domain_fretboard::{Chord, ChordQuality, FretPosition, Fretboard, PitchClass};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Target {
    Pitch(PitchClass),
    Chord(Chord),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("no weak notes recorded yet")]
    NoWeakPitches,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightKind {
    Revealed,
    Correct,
    Wrong,
    Found,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub position: FretPosition,
    pub pitch: PitchClass,
    pub kind: HighlightKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum GameEvent {
    RoundStarted {
        mode: GameMode,
        target: Option<Target>,
        time_left: Option<u32>,
    },
    TargetChanged {
        target: Target,
    },
    NoteRevealed {
        position: FretPosition,
        pitch: PitchClass,
    },
    Correct {
        position: FretPosition,
        pitch: PitchClass,
    },
    Wrong {
        position: FretPosition,
        played: PitchClass,
        target: Target,
    },
    AlreadyFound {
        position: FretPosition,
        pitch: PitchClass,
    },
    StringLocked {
        position: FretPosition,
    },
    PositionFound {
        position: FretPosition,
        found: usize,
        needed: usize,
    },
    ChordPitchFound {
        pitch: PitchClass,
        found: usize,
        needed: usize,
    },
    ChordCompleted {
        chord: Chord,
    },
    ScoreChanged {
        score: u32,
        high_score: u32,
    },
    TimeChanged {
        time_left: u32,
    },
    MasteryProgress {
        count: u32,
        threshold: u32,
    },
    StringUnlocked {
        unlocked: u8,
    },
    StatsRecorded {
        pitch: PitchClass,
        tally: PitchTally,
    },
    /// The caller should invoke [`GameSession::advance_target`] after the delay.
    AdvanceRequested {
        delay_ms: u64,
    },
    RoundOver {
        mode: GameMode,
        score: u32,
        high_score: u32,
        new_record: bool,
    },
}

/// Render-ready snapshot of the session for the fretboard view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub mode: GameMode,
    pub active: bool,
    pub score: u32,
    pub high_score: u32,
    pub time_left: Option<u32>,
    pub target: Option<Target>,
    pub chord_pitches: Vec<PitchClass>,
    pub found_pitches: Vec<PitchClass>,
    pub highlights: Vec<Highlight>,
    pub locked_strings: Vec<u8>,
    pub unlocked_strings: u8,
    pub mastery: u32,
    pub mastery_threshold: u32,
    pub fret_count: u8,
    pub awaiting_next: bool,
}

#[derive(Clone, Debug, Default)]
struct RoundState {
    active: bool,
    score: u32,
    time_left: Option<u32>,
    target: Option<Target>,
    pool: Vec<PitchClass>,
    found_positions: BTreeSet<FretPosition>,
    found_pitches: BTreeSet<PitchClass>,
    mastery: u32,
    awaiting_next: bool,
    new_record: bool,
    last_click: Option<(FretPosition, HighlightKind)>,
}

pub struct GameSession {
    cfg: GameConfig,
    fretboard: Fretboard,
    progress: Progress,
    rng: StdRng,
    mode: GameMode,
    round: RoundState,
}

impl GameSession {
    pub fn new(cfg: GameConfig, fretboard: Fretboard, progress: Progress) -> Self {
        Self::with_rng(cfg, fretboard, progress, StdRng::from_entropy())
    }

    /// Deterministic target selection, for tests and replays.
    pub fn with_seed(
        cfg: GameConfig,
        fretboard: Fretboard,
        progress: Progress,
        seed: u64,
    ) -> Self {
        Self::with_rng(cfg, fretboard, progress, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cfg: GameConfig, fretboard: Fretboard, progress: Progress, rng: StdRng) -> Self {
        let mut session = Self {
            cfg,
            fretboard,
            progress: Progress::default(),
            rng,
            mode: GameMode::Explore,
            round: RoundState {
                active: true,
                ..RoundState::default()
            },
        };
        session.set_progress(progress);
        session
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn fretboard(&self) -> &Fretboard {
        &self.fretboard
    }

    /// Takes effect on the next round; callers normally restart the mode.
    pub fn set_fretboard(&mut self, fretboard: Fretboard) {
        self.fretboard = fretboard;
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn set_progress(&mut self, mut progress: Progress) {
        progress.unlocked_strings = progress
            .unlocked_strings
            .clamp(self.cfg.initial_strings.max(1), self.cfg.max_strings);
        self.progress = progress;
    }

    pub fn reset_statistics(&mut self) {
        self.progress.note_stats.clear();
    }

    pub fn is_active(&self) -> bool {
        self.round.active
    }

    pub fn score(&self) -> u32 {
        self.round.score
    }

    pub fn time_left(&self) -> Option<u32> {
        self.round.time_left
    }

    pub fn target(&self) -> Option<Target> {
        self.round.target
    }

    pub fn mastery(&self) -> u32 {
        self.round.mastery
    }

    pub fn awaiting_next(&self) -> bool {
        self.round.awaiting_next
    }

    /// Strings that accept answers in the current mode.
    pub fn playable_strings(&self) -> Vec<u8> {
        let count = self.fretboard.string_count() as u8;
        if self.mode == GameMode::StringMaster {
            let unlocked = self.progress.unlocked_strings.min(count);
            (count - unlocked..count).collect()
        } else {
            (0..count).collect()
        }
    }

    pub fn weak_pitches(&self) -> Vec<PitchClass> {
        let reachable = self.fretboard.pitches_on(&self.playable_strings());
        self.progress
            .note_stats
            .weak_pitches(&self.cfg.weak_rule)
            .into_iter()
            .filter(|pitch| reachable.contains(pitch))
            .collect()
    }

    /// Starts a fresh round in `mode`. On refusal the current round is untouched.
    pub fn switch_mode(&mut self, mode: GameMode) -> Result<Vec<GameEvent>, SessionError> {
        let previous = self.mode;
        self.mode = mode;
        let pool = match mode {
            GameMode::Explore | GameMode::ChordCompletion => Vec::new(),
            GameMode::WeakNotes => self.weak_pitches(),
            _ => self.fretboard.pitches_on(&self.playable_strings()),
        };
        if mode == GameMode::WeakNotes && pool.is_empty() {
            self.mode = previous;
            return Err(SessionError::NoWeakPitches);
        }

        self.round = RoundState {
            active: true,
            time_left: self.cfg.timer(mode).map(|rules| rules.start_secs),
            pool,
            ..RoundState::default()
        };
        self.round.target = self.pick_target();

        Ok(vec![GameEvent::RoundStarted {
            mode,
            target: self.round.target,
            time_left: self.round.time_left,
        }])
    }

    /// Applies one fret click. Clicks are ignored while the round is over
    /// or a target advance is pending.
    pub fn on_fret(&mut self, position: FretPosition) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !self.round.active || self.round.awaiting_next {
            return events;
        }

        let pitch = self.fretboard.pitch_at(position);
        match self.mode {
            GameMode::Explore => {
                self.round.last_click = Some((position, HighlightKind::Revealed));
                events.push(GameEvent::NoteRevealed { position, pitch });
            }
            GameMode::Quiz | GameMode::Survival | GameMode::WeakNotes => {
                self.judge_single(position, pitch, &mut events);
            }
            GameMode::StringMaster => {
                if !self.playable_strings().contains(&position.string) {
                    events.push(GameEvent::StringLocked { position });
                } else {
                    self.judge_single(position, pitch, &mut events);
                }
            }
            GameMode::FindAll => self.judge_find_all(position, pitch, &mut events),
            GameMode::ChordCompletion => self.judge_chord(position, pitch, &mut events),
        }
        events
    }

    /// One-second countdown step; a no-op outside active timed rounds.
    pub fn on_second(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !self.round.active {
            return events;
        }
        let Some(time_left) = self.round.time_left else {
            return events;
        };

        self.set_time_left(time_left.saturating_sub(1), &mut events);
        events
    }

    /// Completes a pending advance by drawing the next target.
    pub fn advance_target(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !self.round.active || !self.round.awaiting_next {
            return events;
        }

        self.round.awaiting_next = false;
        self.round.found_positions.clear();
        self.round.found_pitches.clear();
        self.round.last_click = None;
        self.round.target = self.pick_target();
        if let Some(target) = self.round.target {
            events.push(GameEvent::TargetChanged { target });
        }
        events
    }

    pub fn view(&self) -> SessionView {
        let chord_pitches = match self.round.target {
            Some(Target::Chord(chord)) => chord.pitches().into_iter().collect(),
            _ => Vec::new(),
        };

        let mut highlights: Vec<Highlight> = self
            .round
            .found_positions
            .iter()
            .map(|position| Highlight {
                position: *position,
                pitch: self.fretboard.pitch_at(*position),
                kind: HighlightKind::Found,
            })
            .collect();
        if let Some((position, kind)) = self.round.last_click {
            if !self.round.found_positions.contains(&position) {
                highlights.push(Highlight {
                    position,
                    pitch: self.fretboard.pitch_at(position),
                    kind,
                });
            }
        }

        let playable = self.playable_strings();
        let locked_strings = (0..self.fretboard.string_count() as u8)
            .filter(|string| !playable.contains(string))
            .collect();

        SessionView {
            mode: self.mode,
            active: self.round.active,
            score: self.round.score,
            high_score: self.progress.high_score(self.mode),
            time_left: self.round.time_left,
            target: self.round.target,
            chord_pitches,
            found_pitches: self.round.found_pitches.iter().copied().collect(),
            highlights,
            locked_strings,
            unlocked_strings: self.progress.unlocked_strings,
            mastery: self.round.mastery,
            mastery_threshold: self.cfg.mastery_threshold,
            fret_count: self.fretboard.fret_count(),
            awaiting_next: self.round.awaiting_next,
        }
    }

    fn judge_single(
        &mut self,
        position: FretPosition,
        pitch: PitchClass,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(Target::Pitch(target)) = self.round.target else {
            return;
        };

        if pitch != target {
            self.record(target, false, events);
            self.round.last_click = Some((position, HighlightKind::Wrong));
            events.push(GameEvent::Wrong {
                position,
                played: pitch,
                target: Target::Pitch(target),
            });
            self.apply_penalty(events);
            return;
        }

        self.record(target, true, events);
        self.round.last_click = Some((position, HighlightKind::Correct));
        events.push(GameEvent::Correct { position, pitch });
        self.add_score(events);
        self.apply_bonus(events);
        if self.mode == GameMode::StringMaster {
            self.advance_mastery(events);
        }
        self.request_advance(events);
    }

    fn judge_find_all(
        &mut self,
        position: FretPosition,
        pitch: PitchClass,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(Target::Pitch(target)) = self.round.target else {
            return;
        };

        if pitch != target {
            self.record(target, false, events);
            self.round.last_click = Some((position, HighlightKind::Wrong));
            events.push(GameEvent::Wrong {
                position,
                played: pitch,
                target: Target::Pitch(target),
            });
            self.apply_penalty(events);
            return;
        }

        if !self.round.found_positions.insert(position) {
            events.push(GameEvent::AlreadyFound { position, pitch });
            return;
        }

        self.record(target, true, events);
        self.round.last_click = Some((position, HighlightKind::Correct));
        events.push(GameEvent::Correct { position, pitch });
        self.add_score(events);
        self.apply_bonus(events);

        let found = self.round.found_positions.len();
        let needed = self.cfg.found_threshold;
        events.push(GameEvent::PositionFound {
            position,
            found,
            needed,
        });
        if found >= needed {
            self.request_advance(events);
        }
    }

    fn judge_chord(
        &mut self,
        position: FretPosition,
        pitch: PitchClass,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(Target::Chord(chord)) = self.round.target else {
            return;
        };
        let chord_pitches = chord.pitches();

        if !chord_pitches.contains(&pitch) {
            self.record(chord.root, false, events);
            self.round.last_click = Some((position, HighlightKind::Wrong));
            events.push(GameEvent::Wrong {
                position,
                played: pitch,
                target: Target::Chord(chord),
            });
            self.apply_penalty(events);
            return;
        }

        if !self.round.found_pitches.insert(pitch) {
            events.push(GameEvent::AlreadyFound { position, pitch });
            return;
        }

        self.record(pitch, true, events);
        self.round.last_click = Some((position, HighlightKind::Correct));
        events.push(GameEvent::Correct { position, pitch });

        let found = self.round.found_pitches.len();
        let needed = chord_pitches.len();
        events.push(GameEvent::ChordPitchFound {
            pitch,
            found,
            needed,
        });

        if found == needed {
            events.push(GameEvent::ChordCompleted { chord });
            self.add_score(events);
            self.apply_bonus(events);
            self.request_advance(events);
        }
    }

    fn advance_mastery(&mut self, events: &mut Vec<GameEvent>) {
        self.round.mastery = self.round.mastery.saturating_add(1);

        let max = self.cfg.max_strings.min(self.fretboard.string_count() as u8);
        if self.progress.unlocked_strings < max
            && self.round.mastery >= self.cfg.mastery_threshold
        {
            self.progress.unlocked_strings += 1;
            self.round.mastery = 0;
            self.round.pool = self.fretboard.pitches_on(&self.playable_strings());
            events.push(GameEvent::StringUnlocked {
                unlocked: self.progress.unlocked_strings,
            });
        }

        events.push(GameEvent::MasteryProgress {
            count: self.round.mastery,
            threshold: self.cfg.mastery_threshold,
        });
    }

    fn record(&mut self, pitch: PitchClass, correct: bool, events: &mut Vec<GameEvent>) {
        let tally = self.progress.note_stats.record(pitch, correct);
        events.push(GameEvent::StatsRecorded { pitch, tally });
    }

    fn add_score(&mut self, events: &mut Vec<GameEvent>) {
        self.round.score = self.round.score.saturating_add(1);
        let mut high_score = self.progress.high_score(self.mode);
        if self.round.score > high_score {
            high_score = self.round.score;
            self.progress.high_scores.insert(self.mode, high_score);
            self.round.new_record = true;
        }
        events.push(GameEvent::ScoreChanged {
            score: self.round.score,
            high_score,
        });
    }

    fn apply_bonus(&mut self, events: &mut Vec<GameEvent>) {
        let (Some(rules), Some(time_left)) = (self.cfg.timer(self.mode), self.round.time_left)
        else {
            return;
        };
        if rules.bonus_secs == 0 {
            return;
        }
        self.set_time_left(rules.with_bonus(time_left), events);
    }

    fn apply_penalty(&mut self, events: &mut Vec<GameEvent>) {
        let (Some(rules), Some(time_left)) = (self.cfg.timer(self.mode), self.round.time_left)
        else {
            return;
        };
        if rules.penalty_secs == 0 {
            return;
        }
        self.set_time_left(rules.with_penalty(time_left), events);
    }

    fn set_time_left(&mut self, time_left: u32, events: &mut Vec<GameEvent>) {
        self.round.time_left = Some(time_left);
        events.push(GameEvent::TimeChanged { time_left });
        if time_left == 0 {
            self.end_round(events);
        }
    }

    fn end_round(&mut self, events: &mut Vec<GameEvent>) {
        self.round.active = false;
        self.round.awaiting_next = false;
        events.push(GameEvent::RoundOver {
            mode: self.mode,
            score: self.round.score,
            high_score: self.progress.high_score(self.mode),
            new_record: self.round.new_record,
        });
    }

    fn request_advance(&mut self, events: &mut Vec<GameEvent>) {
        if !self.round.active {
            return;
        }
        self.round.awaiting_next = true;
        events.push(GameEvent::AdvanceRequested {
            delay_ms: self.cfg.advance_delay_ms,
        });
    }

    fn pick_target(&mut self) -> Option<Target> {
        match self.mode {
            GameMode::Explore => None,
            GameMode::ChordCompletion => self.pick_chord().map(Target::Chord),
            _ => self.pick_pitch().map(Target::Pitch),
        }
    }

    /// Draws from the round's pool, avoiding an immediate repeat when possible.
    fn pick_pitch(&mut self) -> Option<PitchClass> {
        let current = match self.round.target {
            Some(Target::Pitch(pitch)) => Some(pitch),
            _ => None,
        };
        let mut candidates: Vec<PitchClass> = self
            .round
            .pool
            .iter()
            .copied()
            .filter(|pitch| Some(*pitch) != current)
            .collect();
        if candidates.is_empty() {
            candidates = self.round.pool.clone();
        }
        candidates.choose(&mut self.rng).copied()
    }

    fn pick_chord(&mut self) -> Option<Chord> {
        let current = match self.round.target {
            Some(Target::Chord(chord)) => Some(chord),
            _ => None,
        };
        let reachable = self.fretboard.pitches_on(&self.playable_strings());
        let candidates: Vec<Chord> = PitchClass::ALL
            .into_iter()
            .flat_map(|root| {
                ChordQuality::ALL
                    .into_iter()
                    .map(move |quality| Chord::new(root, quality))
            })
            .filter(|chord| Some(*chord) != current)
            .filter(|chord| chord.pitches().iter().all(|pitch| reachable.contains(pitch)))
            .collect();
        candidates.choose(&mut self.rng).copied()
    }
}
