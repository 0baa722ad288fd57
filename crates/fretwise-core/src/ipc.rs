use fretwise_domain_fretboard::FretPosition;
use fretwise_domain_game::{GameEvent, GameMode, PitchAccuracy, SessionView};
use fretwise_ports::storage::SettingsDto;
use fretwise_ports::types::{AudioConfig, AudioOutputDevice, DeviceId, Volume01};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    ListAudioOutputs,
    SelectAudioOutput { device_id: DeviceId, config: Option<AudioConfig> },
    SetSoundEnabled { enabled: bool },
    SetMasterVolume { volume: Volume01 },
    SetFretCount { count: u8 },
    SwitchMode { mode: GameMode },
    RestartRound,
    ClickFret { position: FretPosition },
    ResetStatistics,
    RequestSnapshot,
    RequestStatistics,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    AudioOutputsUpdated { devices: Vec<AudioOutputDevice> },
    SettingsUpdated { settings: SettingsDto },
    SessionUpdated { view: SessionView },
    Feedback { event: GameEvent },
    ModeRefused { mode: GameMode, reason: String },
    StatisticsUpdated { stats: Vec<PitchAccuracy> },
}
