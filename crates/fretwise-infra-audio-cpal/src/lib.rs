use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, Sample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedStreamConfig, SupportedStreamConfigRange,
};
use fretwise_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use fretwise_ports::types::{AudioConfig, AudioOutputDevice, DeviceId};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error};

const FALLBACK_BUFFER_FRAMES: usize = 4096;

/// cpal-backed output. Each open stream lives on its own thread because
/// `cpal::Stream` is not `Send` on every host.
pub struct CpalAudioOutputPort {
    host: cpal::Host,
}

impl CpalAudioOutputPort {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn enumerate(host: &cpal::Host) -> Result<Vec<(DeviceId, cpal::Device)>, AudioError> {
        let host_id = format!("{:?}", host.id());
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| {
                let name = device_name(&device);
                (DeviceId(format!("cpal:{host_id}:{index}:{name}")), device)
            })
            .collect())
    }

    fn find_device(device_id: &DeviceId) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        Self::enumerate(&host)?
            .into_iter()
            .find(|(id, _)| id == device_id)
            .map(|(_, device)| device)
            .ok_or_else(|| AudioError::DeviceNotFound(device_id.to_string()))
    }
}

impl Default for CpalAudioOutputPort {
    fn default() -> Self {
        Self::new()
    }
}

fn device_name(device: &cpal::Device) -> String {
    device
        .name()
        .unwrap_or_else(|_| "Unknown Output".to_string())
}

pub struct CpalAudioStreamHandle {
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AudioStreamHandle for CpalAudioStreamHandle {
    fn close(mut self: Box<Self>) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioOutputPort for CpalAudioOutputPort {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        let mut outputs = Vec::new();
        for (id, device) in Self::enumerate(&self.host)? {
            let Ok(default_config) = device.default_output_config() else {
                debug!(device = %id, "skipping output without default config");
                continue;
            };
            outputs.push(AudioOutputDevice {
                id,
                name: device_name(&device),
                default_config: AudioConfig {
                    sample_rate_hz: default_config.sample_rate().0,
                    channels: default_config.channels(),
                    buffer_size_frames: None,
                },
            });
        }
        Ok(outputs)
    }

    fn open_output(
        &self,
        device_id: &DeviceId,
        config: AudioConfig,
        cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        let device_id = device_id.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join_handle = thread::spawn(move || {
            let stream = match Self::find_device(&device_id)
                .and_then(|device| start_stream(&device, config, cb))
            {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            let _ = ready_tx.send(Ok(()));
            let _ = stop_rx.recv();
            drop(stream);
            debug!(device = %device_id, "audio stream closed");
        });

        ready_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))??;
        Ok(Box::new(CpalAudioStreamHandle {
            stop_tx,
            join_handle: Some(join_handle),
        }))
    }
}

fn start_stream(
    device: &cpal::Device,
    desired: AudioConfig,
    cb: Box<dyn AudioRenderCallback>,
) -> Result<cpal::Stream, AudioError> {
    let mut supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::Backend(e.to_string()))?;
    let chosen = select_supported_config(&mut supported, desired)?;

    let sample_format = chosen.sample_format();
    let mut config = chosen.config();
    config.buffer_size = match desired.buffer_size_frames {
        Some(frames) => BufferSize::Fixed(frames),
        None => BufferSize::Default,
    };

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(device, &config, cb),
        SampleFormat::I16 => build_stream::<i16>(device, &config, cb),
        SampleFormat::U16 => build_stream::<u16>(device, &config, cb),
        other => {
            return Err(AudioError::UnsupportedConfig(format!(
                "sample format {other:?}"
            )))
        }
    }
    .map_err(|e| AudioError::Backend(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::Backend(e.to_string()))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut cb: Box<dyn AudioRenderCallback>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let initial_frames = match config.buffer_size {
        BufferSize::Fixed(frames) => frames as usize,
        BufferSize::Default => FALLBACK_BUFFER_FRAMES,
    };
    let mut left = vec![0.0_f32; initial_frames];
    let mut right = vec![0.0_f32; initial_frames];
    let mut sample_time: u64 = 0;

    device.build_output_stream(
        config,
        move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels.max(1);
            if frames > left.len() {
                left.resize(frames, 0.0);
                right.resize(frames, 0.0);
            }
            cb.render(sample_time, &mut left[..frames], &mut right[..frames]);
            write_interleaved(data, channels, &left[..frames], &right[..frames]);
            sample_time = sample_time.saturating_add(frames as u64);
        },
        |err| error!(%err, "cpal stream error"),
        None,
    )
}

/// Prefers the desired channel count, then stereo, then sample format quality.
fn select_supported_config(
    supported: &mut dyn Iterator<Item = SupportedStreamConfigRange>,
    desired: AudioConfig,
) -> Result<SupportedStreamConfig, AudioError> {
    let mut best: Option<(i32, SupportedStreamConfig)> = None;

    for range in supported {
        let rate = desired.sample_rate_hz;
        if rate < range.min_sample_rate().0 || rate > range.max_sample_rate().0 {
            continue;
        }

        let format_score = match range.sample_format() {
            SampleFormat::F32 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::U16 => 1,
            _ => continue,
        };
        let channel_score = if range.channels() == desired.channels {
            20
        } else if range.channels() == 2 {
            10
        } else {
            0
        };
        let score = channel_score + format_score;

        if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
            best = Some((score, range.with_sample_rate(SampleRate(rate))));
        }
    }

    best.map(|(_, config)| config).ok_or_else(|| {
        AudioError::UnsupportedConfig(format!(
            "no stream config at {} Hz",
            desired.sample_rate_hz
        ))
    })
}

/// Mono devices get the L/R average; channels past the second are silent.
fn write_interleaved<T>(data: &mut [T], channels: usize, left: &[f32], right: &[f32])
where
    T: SizedSample + FromSample<f32>,
{
    if channels == 0 {
        return;
    }
    for (frame, out) in data.chunks_mut(channels).enumerate() {
        let l = left.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        let r = right.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        match out {
            [mono] => *mono = T::from_sample((l + r) * 0.5),
            [first, second, rest @ ..] => {
                *first = T::from_sample(l);
                *second = T::from_sample(r);
                rest.fill(T::EQUILIBRIUM);
            }
            [] => {}
        }
    }
}
