use fretwise_core::{AppCore, AppError, Clock, Command, Event, TimerTask};
use fretwise_domain_fretboard::{FretPosition, PitchClass};
use fretwise_domain_game::{GameConfig, GameEvent, GameMode, Target};
use fretwise_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use fretwise_ports::storage::{StorageError, StoragePort};
use fretwise_ports::synth::{SynthError, SynthPort};
use fretwise_ports::types::{
    AudioConfig, AudioOutputDevice, DeviceId, PluckEvent, SampleTime, Volume01,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Storage whose writes always fail and which never has anything stored.
struct BrokenStorage;

impl StoragePort for BrokenStorage {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("disk full".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("disk full".to_string()))
    }
}

#[derive(Clone, Default)]
struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    fn set(&self, now: Duration) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock()
    }
}

type SharedCallback = Arc<Mutex<Option<Box<dyn AudioRenderCallback>>>>;

#[derive(Clone, Default)]
struct FakeAudioPort {
    callback: SharedCallback,
}

struct FakeStream;

impl AudioStreamHandle for FakeStream {
    fn close(self: Box<Self>) {}
}

impl AudioOutputPort for FakeAudioPort {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        Ok(vec![AudioOutputDevice {
            id: DeviceId("fake:0".to_string()),
            name: "Fake Output".to_string(),
            default_config: AudioConfig {
                sample_rate_hz: 44_100,
                channels: 2,
                buffer_size_frames: None,
            },
        }])
    }

    fn open_output(
        &self,
        device_id: &DeviceId,
        _config: AudioConfig,
        cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        if device_id.0 != "fake:0" {
            return Err(AudioError::DeviceNotFound(device_id.to_string()));
        }
        *self.callback.lock() = Some(cb);
        Ok(Box::new(FakeStream))
    }
}

#[derive(Default)]
struct FakeSynth {
    plucks: Mutex<Vec<PluckEvent>>,
    sample_rate_hz: Mutex<u32>,
}

impl SynthPort for FakeSynth {
    fn set_sample_rate(&self, sample_rate_hz: u32) -> Result<(), SynthError> {
        *self.sample_rate_hz.lock() = sample_rate_hz;
        Ok(())
    }

    fn pluck(&self, event: PluckEvent, _at: SampleTime) {
        self.plucks.lock().push(event);
    }

    fn render(&self, frames: usize, out_l: &mut [f32], out_r: &mut [f32]) {
        let level = if self.plucks.lock().is_empty() { 0.0 } else { 0.5 };
        out_l[..frames].fill(level);
        out_r[..frames].fill(level);
    }
}

struct Harness {
    core: AppCore,
    storage: MemoryStorage,
    audio: FakeAudioPort,
    synth: Arc<FakeSynth>,
    clock: ManualClock,
}

fn harness_with(storage: MemoryStorage) -> Harness {
    let audio = FakeAudioPort::default();
    let synth = Arc::new(FakeSynth::default());
    let clock = ManualClock::default();
    let core = AppCore::with_clock(
        Box::new(audio.clone()),
        synth.clone(),
        Some(Box::new(storage.clone())),
        GameConfig::default(),
        Box::new(clock.clone()),
    )
    .expect("core");
    Harness {
        core,
        storage,
        audio,
        synth,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(MemoryStorage::default())
}

fn switch(core: &mut AppCore, mode: GameMode) {
    core.handle_command(Command::SwitchMode { mode }).unwrap();
}

fn correct_position(core: &AppCore) -> FretPosition {
    let session = core.session();
    let pitch = match session.target() {
        Some(Target::Pitch(pitch)) => pitch,
        other => panic!("expected pitch target, got {other:?}"),
    };
    session
        .fretboard()
        .positions_of_on(pitch, &session.playable_strings())[0]
}

fn wrong_position(core: &AppCore) -> FretPosition {
    let session = core.session();
    let target = session.target();
    (0..=11)
        .map(|fret| FretPosition::new(0, fret))
        .find(|position| {
            target != Some(Target::Pitch(session.fretboard().pitch_at(*position)))
        })
        .expect("some other pitch on the high string")
}

fn click(core: &mut AppCore, position: FretPosition) {
    core.handle_command(Command::ClickFret { position }).unwrap();
}

fn feedback(events: &[Event]) -> Vec<GameEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Feedback { event } => Some(event.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn starts_in_explore_and_reveals_notes() {
    let mut h = harness();
    let events = h.core.drain_events();
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::SessionUpdated { view } if view.mode == GameMode::Explore)));

    h.core
        .handle_command(Command::ClickFret {
            position: FretPosition::new(5, 5),
        })
        .unwrap();
    let events = h.core.drain_events();

    assert_eq!(
        feedback(&events),
        vec![GameEvent::NoteRevealed {
            position: FretPosition::new(5, 5),
            pitch: PitchClass::A,
        }]
    );
}

#[test]
fn rejects_positions_off_the_board() {
    let mut h = harness();

    let err = h
        .core
        .handle_command(Command::ClickFret {
            position: FretPosition::new(6, 0),
        })
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidPosition { string: 6, fret: 0 }));

    let err = h
        .core
        .handle_command(Command::ClickFret {
            position: FretPosition::new(0, 13),
        })
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidPosition { .. }));
}

#[test]
fn survival_counts_down_and_ends() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Survival);
    assert!(h.core.scheduler().is_pending(fretwise_core::TimerTask::Countdown));

    h.core.tick_at(Duration::from_millis(1_000));
    assert_eq!(h.core.session().time_left(), Some(29));

    h.core.tick_at(Duration::from_millis(1_500));
    assert_eq!(h.core.session().time_left(), Some(29));

    h.core.drain_events();
    h.core.tick_at(Duration::from_secs(30));
    let events = feedback(&h.core.drain_events());

    assert_eq!(h.core.session().time_left(), Some(0));
    assert!(!h.core.session().is_active());
    assert!(events
        .iter()
        .any(|event| matches!(event, GameEvent::RoundOver { score: 0, .. })));
    assert!(h.core.scheduler().is_empty());
}

#[test]
fn correct_answer_advances_after_delay() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Quiz);
    let first = h.core.session().target();

    let position = correct_position(&h.core);
    h.core
        .handle_command(Command::ClickFret { position })
        .unwrap();
    assert!(h.core.session().awaiting_next());

    h.core.tick_at(Duration::from_millis(599));
    assert!(h.core.session().awaiting_next());

    h.core.tick_at(Duration::from_millis(600));
    assert!(!h.core.session().awaiting_next());
    assert_ne!(h.core.session().target(), first);
}

#[test]
fn mode_switch_cancels_pending_timers() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Survival);
    let position = correct_position(&h.core);
    h.core
        .handle_command(Command::ClickFret { position })
        .unwrap();
    assert!(h.core.scheduler().is_pending(fretwise_core::TimerTask::NextTarget));

    switch(&mut h.core, GameMode::Quiz);

    assert!(h.core.scheduler().is_empty());
    assert_eq!(h.core.session().score(), 0);
}

#[test]
fn scores_and_stats_are_persisted() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Quiz);
    let position = correct_position(&h.core);
    h.core
        .handle_command(Command::ClickFret { position })
        .unwrap();

    assert_eq!(h.storage.get("high_score.quiz"), Some("1".to_string()));
    let stats = h.storage.get("note_stats").expect("stats written");
    assert!(stats.contains("\"correct\":1"));

    let mut reopened = harness_with(h.storage.clone());
    switch(&mut reopened.core, GameMode::Quiz);
    assert_eq!(reopened.core.session().view().high_score, 1);
}

#[test]
fn unlocking_a_string_is_persisted() {
    let mut h = harness();
    switch(&mut h.core, GameMode::StringMaster);

    let mut now = Duration::ZERO;
    for _ in 0..10 {
        let position = correct_position(&h.core);
        h.core
            .handle_command(Command::ClickFret { position })
            .unwrap();
        now += Duration::from_secs(1);
        h.core.tick_at(now);
    }

    assert_eq!(h.storage.get("unlocked_strings"), Some("2".to_string()));
    assert_eq!(h.core.session().playable_strings(), vec![4, 5]);

    switch(&mut h.core, GameMode::Explore);
    switch(&mut h.core, GameMode::StringMaster);
    assert_eq!(h.core.session().progress().unlocked_strings, 2);
    assert_eq!(h.core.session().mastery(), 0);
}

#[test]
fn weak_notes_refused_without_history() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Quiz);
    h.core.drain_events();

    switch(&mut h.core, GameMode::WeakNotes);
    let events = h.core.drain_events();

    assert!(events.iter().any(|event| matches!(
        event,
        Event::ModeRefused {
            mode: GameMode::WeakNotes,
            ..
        }
    )));
    assert_eq!(h.core.session().mode(), GameMode::Quiz);
}

#[test]
fn weak_notes_use_stored_history() {
    let storage = MemoryStorage::default();
    storage.put("note_stats", r#"{"F#":{"correct":1,"wrong":4}}"#);
    let mut h = harness_with(storage);

    switch(&mut h.core, GameMode::WeakNotes);

    assert_eq!(h.core.session().mode(), GameMode::WeakNotes);
    assert_eq!(
        h.core.session().target(),
        Some(Target::Pitch(PitchClass::FSharp))
    );
}

#[test]
fn clicks_pluck_through_the_audio_graph() {
    let mut h = harness();
    h.core.restore_audio_output().unwrap();
    assert_eq!(*h.synth.sample_rate_hz.lock(), 44_100);

    h.core
        .handle_command(Command::ClickFret {
            position: FretPosition::new(5, 0),
        })
        .unwrap();

    let mut left = vec![0.0_f32; 64];
    let mut right = vec![0.0_f32; 64];
    {
        let mut callback = h.audio.callback.lock();
        let cb = callback.as_mut().expect("stream opened");
        cb.render(0, &mut left, &mut right);
    }

    assert_eq!(
        *h.synth.plucks.lock(),
        vec![PluckEvent {
            note: 40,
            velocity: 100
        }]
    );
    // Master volume defaults to 0.8.
    assert!((left[0] - 0.4).abs() < 1e-6);
    assert_eq!(
        h.storage.get("settings").map(|s| s.contains("fake:0")),
        Some(true)
    );
}

#[test]
fn muted_clicks_do_not_pluck() {
    let mut h = harness();
    h.core.restore_audio_output().unwrap();
    h.core
        .handle_command(Command::SetSoundEnabled { enabled: false })
        .unwrap();

    h.core
        .handle_command(Command::ClickFret {
            position: FretPosition::new(0, 0),
        })
        .unwrap();
    let mut left = vec![1.0_f32; 16];
    let mut right = vec![1.0_f32; 16];
    if let Some(cb) = h.audio.callback.lock().as_mut() {
        cb.render(0, &mut left, &mut right);
    }

    assert!(h.synth.plucks.lock().is_empty());
    assert!(left.iter().all(|sample| *sample == 0.0));
}

#[test]
fn fret_count_is_clamped_saved_and_restarts_round() {
    let mut h = harness();
    switch(&mut h.core, GameMode::FindAll);
    h.core.tick_at(Duration::from_secs(3));

    h.core
        .handle_command(Command::SetFretCount { count: 30 })
        .unwrap();

    assert_eq!(h.core.settings().fret_count, 24);
    assert_eq!(h.core.session().fretboard().fret_count(), 24);
    assert_eq!(h.core.session().mode(), GameMode::FindAll);
    assert_eq!(h.core.session().time_left(), Some(60));
    assert!(h
        .storage
        .get("settings")
        .map(|s| s.contains("\"fret_count\":24"))
        .unwrap_or(false));
}

#[test]
fn reset_statistics_clears_storage() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Quiz);
    let position = correct_position(&h.core);
    h.core
        .handle_command(Command::ClickFret { position })
        .unwrap();
    assert!(h.storage.get("note_stats").is_some());

    h.core.handle_command(Command::ResetStatistics).unwrap();
    let events = h.core.drain_events();

    assert_eq!(h.storage.get("note_stats"), None);
    let stats = events
        .iter()
        .find_map(|event| match event {
            Event::StatisticsUpdated { stats } => Some(stats.clone()),
            _ => None,
        })
        .expect("statistics event");
    assert!(stats.iter().all(|row| row.correct == 0 && row.wrong == 0));
}

#[test]
fn commands_deserialize_from_webview_json() {
    let cmd: Command = serde_json::from_str(
        r#"{"type":"ClickFret","payload":{"position":{"string":1,"fret":3}}}"#,
    )
    .unwrap();
    assert!(matches!(
        cmd,
        Command::ClickFret {
            position: FretPosition { string: 1, fret: 3 }
        }
    ));

    let cmd: Command =
        serde_json::from_str(r#"{"type":"SwitchMode","payload":{"mode":"chord_completion"}}"#)
            .unwrap();
    assert!(matches!(
        cmd,
        Command::SwitchMode {
            mode: GameMode::ChordCompletion
        }
    ));
}

#[test]
fn progress_survives_failed_writes() {
    let mut core = AppCore::with_clock(
        Box::new(FakeAudioPort::default()),
        Arc::new(FakeSynth::default()),
        Some(Box::new(BrokenStorage)),
        GameConfig::default(),
        Box::new(ManualClock::default()),
    )
    .expect("core");

    switch(&mut core, GameMode::Quiz);
    let target = match core.session().target() {
        Some(Target::Pitch(pitch)) => pitch,
        other => panic!("expected pitch target, got {other:?}"),
    };
    for _ in 0..5 {
        let position = wrong_position(&core);
        click(&mut core, position);
    }
    let position = correct_position(&core);
    click(&mut core, position);

    switch(&mut core, GameMode::Explore);

    let progress = core.session().progress();
    assert_eq!(progress.high_score(GameMode::Quiz), 1);
    assert_eq!(progress.note_stats.tally(target).correct, 1);
    assert_eq!(progress.note_stats.tally(target).wrong, 5);

    switch(&mut core, GameMode::WeakNotes);
    assert_eq!(core.session().mode(), GameMode::WeakNotes);
    assert_eq!(core.session().target(), Some(Target::Pitch(target)));
}

#[test]
fn round_timers_start_from_the_current_time() {
    let mut h = harness();
    h.clock.set(Duration::from_millis(400));
    switch(&mut h.core, GameMode::Survival);

    h.core.tick_at(Duration::from_millis(1_000));
    assert_eq!(h.core.session().time_left(), Some(30));
    h.core.tick_at(Duration::from_millis(1_400));
    assert_eq!(h.core.session().time_left(), Some(29));

    switch(&mut h.core, GameMode::Quiz);
    h.clock.set(Duration::from_millis(2_000));
    let position = correct_position(&h.core);
    click(&mut h.core, position);
    assert!(h.core.scheduler().is_pending(TimerTask::NextTarget));

    h.core.tick_at(Duration::from_millis(2_599));
    assert!(h.core.session().awaiting_next());
    h.core.tick_at(Duration::from_millis(2_600));
    assert!(!h.core.session().awaiting_next());
}

#[test]
fn master_volume_is_clamped() {
    let mut h = harness();
    let cmd: Command =
        serde_json::from_str(r#"{"type":"SetMasterVolume","payload":{"volume":5.0}}"#).unwrap();

    h.core.handle_command(cmd).unwrap();

    assert_eq!(h.core.settings().master_volume, Volume01::new(1.0));
    assert!(h
        .storage
        .get("settings")
        .map(|s| s.contains("\"master_volume\":1.0"))
        .unwrap_or(false));
}

#[test]
fn stored_fret_count_is_clamped_on_startup() {
    let storage = MemoryStorage::default();
    storage.put("settings", r#"{"fret_count":99}"#);

    let h = harness_with(storage);

    assert_eq!(h.core.settings().fret_count, 24);
    assert_eq!(h.core.session().fretboard().fret_count(), 24);
}

#[test]
fn answers_refresh_statistics() {
    let mut h = harness();
    switch(&mut h.core, GameMode::Quiz);
    h.core.drain_events();

    let position = correct_position(&h.core);
    let pitch = h.core.session().fretboard().pitch_at(position);
    click(&mut h.core, position);
    let events = h.core.drain_events();

    let stats = events
        .iter()
        .find_map(|event| match event {
            Event::StatisticsUpdated { stats } => Some(stats.clone()),
            _ => None,
        })
        .expect("statistics event");
    let row = stats
        .iter()
        .find(|row| row.pitch == pitch)
        .expect("row for answered pitch");
    assert_eq!((row.correct, row.wrong), (1, 0));
}

#[test]
fn mode_entry_merges_newer_stored_progress() {
    let mut h = harness();
    h.storage.put("high_score.quiz", "9");

    switch(&mut h.core, GameMode::Quiz);

    assert_eq!(h.core.session().view().high_score, 9);
}
