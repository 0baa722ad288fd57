use fretwise_core::{AppCore, Command};
use fretwise_infra_audio_cpal::CpalAudioOutputPort;
use fretwise_infra_storage_fs::FsStorage;
use fretwise_infra_synth_pluck::PluckSynth;
use fretwise_ports::storage::StoragePort;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tauri::Manager;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Clone)]
struct AppState {
    core: Arc<Mutex<AppCore>>,
}

#[tauri::command]
fn send_command(state: tauri::State<'_, AppState>, command: Command) -> Result<(), String> {
    let mut core = state.core.lock();
    core.handle_command(command).map_err(|err| err.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let audio_port = Box::new(CpalAudioOutputPort::new());
    let synth = Arc::new(PluckSynth::default());
    let storage: Option<Box<dyn StoragePort>> = match FsStorage::default_base_dir() {
        Ok(dir) => {
            info!(dir = %dir.display(), "using settings directory");
            Some(Box::new(FsStorage::new(dir)))
        }
        Err(err) => {
            warn!(%err, "no settings directory, progress will not be saved");
            None
        }
    };

    let mut core =
        AppCore::new(audio_port, synth, storage).expect("failed to initialize core");
    if let Err(err) = core.restore_audio_output() {
        warn!(%err, "audio output unavailable, continuing silently");
    }
    let state = AppState {
        core: Arc::new(Mutex::new(core)),
    };

    tauri::Builder::default()
        .manage(state.clone())
        .invoke_handler(tauri::generate_handler![send_command])
        .setup(move |app| {
            let app_handle = app.handle();
            let core = state.core.clone();
            std::thread::spawn(move || loop {
                let events = {
                    let mut core = core.lock();
                    core.tick();
                    core.drain_events()
                };

                for event in events {
                    let _ = app_handle.emit_all("core_event", event);
                }

                std::thread::sleep(TICK_INTERVAL);
            });
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
