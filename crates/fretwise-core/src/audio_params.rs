use fretwise_ports::storage::SettingsDto;
use fretwise_ports::types::Volume01;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Mixer parameters shared with the audio thread.
#[derive(Debug)]
pub struct AudioParams {
    master: AtomicU32,
    sound_enabled: AtomicBool,
}

impl AudioParams {
    pub fn new(settings: &SettingsDto) -> Self {
        Self {
            master: AtomicU32::new(settings.master_volume.get().to_bits()),
            sound_enabled: AtomicBool::new(settings.sound_enabled),
        }
    }

    pub fn set_master(&self, volume: Volume01) {
        self.master.store(volume.get().to_bits(), Ordering::Relaxed);
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.sound_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn master(&self) -> f32 {
        f32::from_bits(self.master.load(Ordering::Relaxed))
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled.load(Ordering::Relaxed)
    }
}
