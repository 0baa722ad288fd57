use fretwise_domain_game::{GameMode, NoteStats, Progress};
use fretwise_ports::storage::{SettingsDto, StorageError, StoragePort};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const SETTINGS_KEY: &str = "settings";
pub const NOTE_STATS_KEY: &str = "note_stats";
pub const UNLOCKED_STRINGS_KEY: &str = "unlocked_strings";

pub fn high_score_key(mode: GameMode) -> String {
    format!("high_score.{}", mode.key())
}

fn read_json<T: DeserializeOwned>(
    storage: &dyn StoragePort,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.read(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Serde(format!("{key}: {e}")))
}

fn write_json<T: Serialize>(
    storage: &dyn StoragePort,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    storage.write(key, &raw)
}

pub fn load_settings(storage: &dyn StoragePort) -> Result<SettingsDto, StorageError> {
    Ok(read_json(storage, SETTINGS_KEY)?.unwrap_or_default())
}

pub fn save_settings(
    storage: &dyn StoragePort,
    settings: &SettingsDto,
) -> Result<(), StorageError> {
    write_json(storage, SETTINGS_KEY, settings)
}

/// Absent keys read as zero/empty.
pub fn load_progress(storage: &dyn StoragePort) -> Result<Progress, StorageError> {
    let mut progress = Progress::default();

    for mode in GameMode::ALL.into_iter().filter(|mode| mode.is_scored()) {
        if let Some(score) = read_json::<u32>(storage, &high_score_key(mode))? {
            progress.high_scores.insert(mode, score);
        }
    }
    if let Some(stats) = read_json::<NoteStats>(storage, NOTE_STATS_KEY)? {
        progress.note_stats = stats;
    }
    if let Some(unlocked) = read_json::<u8>(storage, UNLOCKED_STRINGS_KEY)? {
        progress.unlocked_strings = unlocked;
    }

    Ok(progress)
}

pub fn save_high_score(
    storage: &dyn StoragePort,
    mode: GameMode,
    score: u32,
) -> Result<(), StorageError> {
    write_json(storage, &high_score_key(mode), &score)
}

pub fn save_note_stats(storage: &dyn StoragePort, stats: &NoteStats) -> Result<(), StorageError> {
    if stats.is_empty() {
        return storage.remove(NOTE_STATS_KEY);
    }
    write_json(storage, NOTE_STATS_KEY, stats)
}

pub fn save_unlocked_strings(storage: &dyn StoragePort, unlocked: u8) -> Result<(), StorageError> {
    write_json(storage, UNLOCKED_STRINGS_KEY, &unlocked)
}
