use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_sound_enabled() -> bool {
    true
}

fn default_master_volume() -> Volume01 {
    Volume01::new(0.8)
}

fn default_fret_count() -> u8 {
    12
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub selected_audio_out: Option<DeviceId>,
    pub audio_buffer_size_frames: Option<u32>,
    #[serde(default = "default_sound_enabled")]
    pub sound_enabled: bool,
    #[serde(default = "default_master_volume")]
    pub master_volume: Volume01,
    #[serde(default = "default_fret_count")]
    pub fret_count: u8,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            selected_audio_out: None,
            audio_buffer_size_frames: None,
            sound_enabled: true,
            master_volume: Volume01::new(0.8),
            fret_count: 12,
        }
    }
}

/// Key-value persistence. Values are opaque strings (JSON in practice);
/// a missing key reads as `None`.
pub trait StoragePort: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
