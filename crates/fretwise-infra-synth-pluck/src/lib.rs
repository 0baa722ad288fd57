use fretwise_ports::synth::{SynthError, SynthPort};
use fretwise_ports::types::{PluckEvent, SampleTime};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MIN_SAMPLE_RATE_HZ: u32 = 8_000;
const MAX_SAMPLE_RATE_HZ: u32 = 192_000;
const SILENCE: f32 = 1.0e-4;

/// Karplus-Strong plucked string: a noise burst circulating through a
/// damped two-tap averaging delay line.
pub struct PluckSynth {
    inner: Mutex<Inner>,
}

struct Inner {
    sample_rate_hz: f32,
    max_voices: usize,
    decay: f32,
    rng: StdRng,
    voices: Vec<Voice>,
    note_counter: u64,
}

struct Voice {
    note: u8,
    buffer: Vec<f32>,
    cursor: usize,
    gain: f32,
    samples_left: u32,
    age: u64,
}

impl PluckSynth {
    pub fn new(sample_rate_hz: u32, max_voices: usize) -> Self {
        Self::with_seed(sample_rate_hz, max_voices, 0x5eed)
    }

    pub fn with_seed(sample_rate_hz: u32, max_voices: usize, seed: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sample_rate_hz: sample_rate_hz.max(MIN_SAMPLE_RATE_HZ) as f32,
                max_voices: max_voices.max(1),
                decay: 0.996,
                rng: StdRng::seed_from_u64(seed),
                voices: Vec::new(),
                note_counter: 0,
            }),
        }
    }

    pub fn active_voices(&self) -> usize {
        self.inner.lock().voices.len()
    }

    pub fn sounding_notes(&self) -> Vec<u8> {
        self.inner.lock().voices.iter().map(|voice| voice.note).collect()
    }
}

impl Default for PluckSynth {
    fn default() -> Self {
        Self::new(48_000, 12)
    }
}

impl Inner {
    fn pluck(&mut self, note: u8, velocity: u8) {
        self.note_counter = self.note_counter.wrapping_add(1);

        // Re-plucking a ringing note restarts it.
        self.voices.retain(|voice| voice.note != note);
        if self.voices.len() >= self.max_voices {
            if let Some((idx, _)) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, voice)| voice.age)
            {
                self.voices.swap_remove(idx);
            }
        }

        let freq = 440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0);
        let period = ((self.sample_rate_hz / freq).round() as usize).max(2);
        let buffer = (0..period)
            .map(|_| self.rng.gen_range(-1.0_f32..=1.0))
            .collect();
        let gain = (velocity as f32 / 127.0).clamp(0.05, 1.0) * 0.3;

        self.voices.push(Voice {
            note,
            buffer,
            cursor: 0,
            gain,
            samples_left: (self.sample_rate_hz * 4.0) as u32,
            age: self.note_counter,
        });
    }

    fn render(&mut self, frames: usize, out_l: &mut [f32], out_r: &mut [f32]) {
        out_l.fill(0.0);
        out_r.fill(0.0);
        let frames = frames.min(out_l.len()).min(out_r.len());
        let decay = self.decay;

        for voice in &mut self.voices {
            let len = voice.buffer.len();
            let mut peak = 0.0_f32;
            for i in 0..frames {
                if voice.samples_left == 0 {
                    break;
                }
                let current = voice.buffer[voice.cursor];
                let next = voice.buffer[(voice.cursor + 1) % len];
                let filtered = 0.5 * (current + next) * decay;
                voice.buffer[voice.cursor] = filtered;
                voice.cursor = (voice.cursor + 1) % len;
                voice.samples_left -= 1;

                let sample = current * voice.gain;
                out_l[i] += sample;
                out_r[i] += sample;
                peak = peak.max(current.abs());
            }
            if frames > 0 && peak < SILENCE {
                voice.samples_left = 0;
            }
        }

        self.voices.retain(|voice| voice.samples_left > 0);
    }
}

impl SynthPort for PluckSynth {
    fn set_sample_rate(&self, sample_rate_hz: u32) -> Result<(), SynthError> {
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&sample_rate_hz) {
            return Err(SynthError::UnsupportedSampleRate(sample_rate_hz));
        }
        let mut inner = self.inner.lock();
        inner.sample_rate_hz = sample_rate_hz as f32;
        inner.voices.clear();
        Ok(())
    }

    fn pluck(&self, event: PluckEvent, _at: SampleTime) {
        let mut inner = self.inner.lock();
        inner.pluck(event.note, event.velocity);
    }

    fn render(&self, frames: usize, out_l: &mut [f32], out_r: &mut [f32]) {
        let mut inner = self.inner.lock();
        inner.render(frames, out_l, out_r);
    }
}
