use crate::audio_graph::AudioGraph;
use crate::audio_params::AudioParams;
use crate::ipc::{Command, Event};
use crate::progress_store;
use crate::scheduler::{Clock, MonotonicClock, Scheduler, TimerTask};
use fretwise_domain_fretboard::{FretPosition, Fretboard, Tuning};
use fretwise_domain_game::{GameConfig, GameEvent, GameMode, GameSession, Progress};
use fretwise_ports::audio::{AudioError, AudioOutputPort, AudioStreamHandle};
use fretwise_ports::storage::{SettingsDto, StorageError, StoragePort};
use fretwise_ports::synth::{SynthError, SynthPort};
use fretwise_ports::types::{AudioConfig, DeviceId, PluckEvent, Volume01};
use rtrb::{Producer, RingBuffer};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PLUCK_VELOCITY: u8 = 100;
const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("synth error: {0}")]
    Synth(#[from] SynthError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid fret position: string {string}, fret {fret}")]
    InvalidPosition { string: u8, fret: u8 },
}

#[derive(Default)]
struct Dirty {
    stats: bool,
    unlocked: bool,
    high_score: bool,
}

pub struct AppCore {
    audio_port: Box<dyn AudioOutputPort>,
    synth: Arc<dyn SynthPort>,
    storage: Option<Box<dyn StoragePort>>,
    settings: SettingsDto,
    session: GameSession,
    scheduler: Scheduler,
    audio_params: Arc<AudioParams>,
    audio_stream: Option<Box<dyn AudioStreamHandle>>,
    audio_queue_tx: Option<Producer<PluckEvent>>,
    events: VecDeque<Event>,
    clock: Box<dyn Clock>,
    now: Duration,
}

impl AppCore {
    pub fn new(
        audio_port: Box<dyn AudioOutputPort>,
        synth: Arc<dyn SynthPort>,
        storage: Option<Box<dyn StoragePort>>,
    ) -> Result<Self, AppError> {
        Self::with_config(audio_port, synth, storage, GameConfig::default())
    }

    pub fn with_config(
        audio_port: Box<dyn AudioOutputPort>,
        synth: Arc<dyn SynthPort>,
        storage: Option<Box<dyn StoragePort>>,
        cfg: GameConfig,
    ) -> Result<Self, AppError> {
        Self::with_clock(
            audio_port,
            synth,
            storage,
            cfg,
            Box::new(MonotonicClock::new()),
        )
    }

    pub fn with_clock(
        audio_port: Box<dyn AudioOutputPort>,
        synth: Arc<dyn SynthPort>,
        storage: Option<Box<dyn StoragePort>>,
        cfg: GameConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self, AppError> {
        let mut settings = match storage.as_deref() {
            Some(storage) => progress_store::load_settings(storage).unwrap_or_else(|err| {
                warn!(%err, "failed to load settings, using defaults");
                SettingsDto::default()
            }),
            None => SettingsDto::default(),
        };

        let fretboard = Fretboard::new(Tuning::standard(), settings.fret_count);
        settings.fret_count = fretboard.fret_count();
        settings.master_volume = Volume01::new(settings.master_volume.get());
        let audio_params = Arc::new(AudioParams::new(&settings));

        let progress = match storage.as_deref() {
            Some(storage) => progress_store::load_progress(storage).unwrap_or_else(|err| {
                warn!(%err, "failed to load progress, starting fresh");
                Progress::default()
            }),
            None => Progress::default(),
        };
        let session = GameSession::new(cfg, fretboard, progress);

        let mut core = Self {
            audio_port,
            synth,
            storage,
            settings,
            session,
            scheduler: Scheduler::new(),
            audio_params,
            audio_stream: None,
            audio_queue_tx: None,
            events: VecDeque::new(),
            clock,
            now: Duration::ZERO,
        };
        core.start_mode(GameMode::Explore);
        Ok(core)
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), AppError> {
        self.now = self.now.max(self.clock.elapsed());
        match cmd {
            Command::ListAudioOutputs => {
                let devices = self.audio_port.list_outputs()?;
                self.events.push_back(Event::AudioOutputsUpdated { devices });
            }
            Command::SelectAudioOutput { device_id, config } => {
                self.open_audio_output(device_id, config)?;
            }
            Command::SetSoundEnabled { enabled } => {
                self.settings.sound_enabled = enabled;
                self.audio_params.set_sound_enabled(enabled);
                self.emit_settings();
                self.save_settings();
            }
            Command::SetMasterVolume { volume } => {
                let volume = Volume01::new(volume.get());
                self.settings.master_volume = volume;
                self.audio_params.set_master(volume);
                self.emit_settings();
                self.save_settings();
            }
            Command::SetFretCount { count } => {
                let fretboard = Fretboard::new(Tuning::standard(), count);
                self.settings.fret_count = fretboard.fret_count();
                self.session.set_fretboard(fretboard);
                if !self.start_mode(self.session.mode()) {
                    self.start_mode(GameMode::Explore);
                }
                self.emit_settings();
                self.save_settings();
            }
            Command::SwitchMode { mode } => {
                self.start_mode(mode);
            }
            Command::RestartRound => {
                self.start_mode(self.session.mode());
            }
            Command::ClickFret { position } => {
                self.click_fret(position)?;
            }
            Command::ResetStatistics => {
                self.session.reset_statistics();
                let stats = &self.session.progress().note_stats;
                if let Some(storage) = self.storage.as_deref() {
                    if let Err(err) = progress_store::save_note_stats(storage, stats) {
                        warn!(%err, "failed to clear note statistics");
                    }
                }
                info!("note statistics reset");
                self.emit_statistics();
                self.emit_session();
            }
            Command::RequestSnapshot => {
                self.emit_settings();
                self.emit_session();
            }
            Command::RequestStatistics => {
                self.emit_statistics();
            }
        }
        Ok(())
    }

    /// Advances timers against the core's clock.
    pub fn tick(&mut self) {
        let elapsed = self.clock.elapsed();
        self.tick_at(elapsed);
    }

    /// Advances timers to `elapsed` since the core was created.
    pub fn tick_at(&mut self, elapsed: Duration) {
        self.now = self.now.max(elapsed);
        let due = self.scheduler.poll(self.now);
        if due.is_empty() {
            return;
        }

        for task in due {
            let events = match task {
                TimerTask::Countdown => self.session.on_second(),
                TimerTask::NextTarget => self.session.advance_target(),
            };
            self.dispatch(events);
        }
        self.emit_session();
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Reopens the saved output device, or the first one available.
    pub fn restore_audio_output(&mut self) -> Result<(), AppError> {
        let devices = self.audio_port.list_outputs()?;
        let saved = self
            .settings
            .selected_audio_out
            .as_ref()
            .and_then(|id| devices.iter().find(|device| &device.id == id));
        let Some(device) = saved.or_else(|| devices.first()) else {
            return Err(AppError::Audio(AudioError::DeviceNotFound(
                "no audio output available".to_string(),
            )));
        };

        let config = AudioConfig {
            buffer_size_frames: self.settings.audio_buffer_size_frames,
            ..device.default_config
        };
        let device_id = device.id.clone();
        self.open_audio_output(device_id, Some(config))
    }

    fn open_audio_output(
        &mut self,
        device_id: DeviceId,
        config: Option<AudioConfig>,
    ) -> Result<(), AppError> {
        if let Some(stream) = self.audio_stream.take() {
            stream.close();
        }
        self.audio_queue_tx = None;

        let config = config.unwrap_or(AudioConfig {
            sample_rate_hz: 48_000,
            channels: 2,
            buffer_size_frames: self.settings.audio_buffer_size_frames,
        });
        self.synth.set_sample_rate(config.sample_rate_hz)?;

        let (producer, consumer) = RingBuffer::new(256);
        let audio_graph = AudioGraph::new(self.synth.clone(), self.audio_params.clone(), consumer);
        let stream = self
            .audio_port
            .open_output(&device_id, config, Box::new(audio_graph))?;

        info!(device = %device_id, sample_rate_hz = config.sample_rate_hz, "audio output opened");
        self.audio_stream = Some(stream);
        self.audio_queue_tx = Some(producer);
        self.settings.selected_audio_out = Some(device_id);
        self.settings.audio_buffer_size_frames = config.buffer_size_frames;
        self.emit_settings();
        self.save_settings();
        Ok(())
    }

    /// Starts a fresh round; returns false when the session refused the mode.
    fn start_mode(&mut self, mode: GameMode) -> bool {
        self.merge_stored_progress();

        match self.session.switch_mode(mode) {
            Ok(events) => {
                self.scheduler.cancel_all();
                if mode.is_timed() {
                    self.scheduler
                        .schedule_every(self.now, COUNTDOWN_PERIOD, TimerTask::Countdown);
                }
                debug!(?mode, "round started");
                self.dispatch(events);
                self.emit_session();
                true
            }
            Err(err) => {
                info!(?mode, %err, "mode refused");
                self.events.push_back(Event::ModeRefused {
                    mode,
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    fn click_fret(&mut self, position: FretPosition) -> Result<(), AppError> {
        let fretboard = self.session.fretboard();
        if !fretboard.contains(position) {
            return Err(AppError::InvalidPosition {
                string: position.string,
                fret: position.fret,
            });
        }

        let note = fretboard.midi_note(position);
        self.play_note(note);

        let events = self.session.on_fret(position);
        if !events.is_empty() {
            self.dispatch(events);
            self.emit_session();
        }
        Ok(())
    }

    fn play_note(&mut self, note: u8) {
        if !self.settings.sound_enabled {
            return;
        }
        let Some(producer) = self.audio_queue_tx.as_mut() else {
            return;
        };
        if producer
            .push(PluckEvent {
                note,
                velocity: PLUCK_VELOCITY,
            })
            .is_err()
        {
            debug!(note, "audio queue full, pluck dropped");
        }
    }

    fn dispatch(&mut self, events: Vec<GameEvent>) {
        let mut dirty = Dirty::default();

        for event in events {
            match &event {
                GameEvent::AdvanceRequested { delay_ms } => {
                    self.scheduler.schedule_once(
                        self.now,
                        Duration::from_millis(*delay_ms),
                        TimerTask::NextTarget,
                    );
                }
                GameEvent::StatsRecorded { .. } => dirty.stats = true,
                GameEvent::ScoreChanged { score, high_score } if score == high_score => {
                    dirty.high_score = true;
                }
                GameEvent::StringUnlocked { unlocked } => {
                    info!(unlocked, "string unlocked");
                    dirty.unlocked = true;
                }
                GameEvent::RoundOver {
                    mode,
                    score,
                    new_record,
                    ..
                } => {
                    info!(?mode, score, new_record, "round over");
                    self.scheduler.cancel_all();
                }
                _ => {}
            }
            self.events.push_back(Event::Feedback { event });
        }

        let stats_changed = dirty.stats;
        self.persist(dirty);
        if stats_changed {
            self.emit_statistics();
        }
    }

    fn persist(&self, dirty: Dirty) {
        let Some(storage) = self.storage.as_deref() else {
            return;
        };
        let progress = self.session.progress();

        if dirty.stats {
            if let Err(err) = progress_store::save_note_stats(storage, &progress.note_stats) {
                warn!(%err, "failed to save note statistics");
            }
        }
        if dirty.unlocked {
            if let Err(err) =
                progress_store::save_unlocked_strings(storage, progress.unlocked_strings)
            {
                warn!(%err, "failed to save unlocked strings");
            }
        }
        if dirty.high_score {
            let mode = self.session.mode();
            if let Err(err) =
                progress_store::save_high_score(storage, mode, progress.high_score(mode))
            {
                warn!(%err, "failed to save high score");
            }
        }
    }

    /// Folds stored progress into the session without ever lowering it.
    fn merge_stored_progress(&mut self) {
        let Some(storage) = self.storage.as_deref() else {
            return;
        };
        match progress_store::load_progress(storage) {
            Ok(stored) => {
                let mut progress = self.session.progress().clone();
                progress.merge(&stored);
                self.session.set_progress(progress);
            }
            Err(err) => warn!(%err, "failed to read stored progress, keeping in-memory state"),
        }
    }

    fn emit_session(&mut self) {
        self.events.push_back(Event::SessionUpdated {
            view: self.session.view(),
        });
    }

    fn emit_settings(&mut self) {
        self.events.push_back(Event::SettingsUpdated {
            settings: self.settings.clone(),
        });
    }

    fn emit_statistics(&mut self) {
        self.events.push_back(Event::StatisticsUpdated {
            stats: self.session.progress().note_stats.summary(),
        });
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_deref() {
            if let Err(err) = progress_store::save_settings(storage, &self.settings) {
                warn!(%err, "failed to save settings");
            }
        }
    }
}
