use crate::audio_params::AudioParams;
use fretwise_ports::audio::AudioRenderCallback;
use fretwise_ports::synth::SynthPort;
use fretwise_ports::types::{PluckEvent, SampleTime};
use rtrb::Consumer;
use std::sync::Arc;

pub struct AudioGraph {
    synth: Arc<dyn SynthPort>,
    params: Arc<AudioParams>,
    consumer: Consumer<PluckEvent>,
    limiter_gain: f32,
}

impl AudioGraph {
    pub fn new(
        synth: Arc<dyn SynthPort>,
        params: Arc<AudioParams>,
        consumer: Consumer<PluckEvent>,
    ) -> Self {
        Self {
            synth,
            params,
            consumer,
            limiter_gain: 1.0,
        }
    }

    fn apply_master(&mut self, out_l: &mut [f32], out_r: &mut [f32]) {
        let master = self.params.master();
        for (l, r) in out_l.iter_mut().zip(out_r.iter_mut()) {
            *l *= master;
            *r *= master;
        }

        let limit = 0.98_f32;
        let peak = out_l
            .iter()
            .chain(out_r.iter())
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()));

        let target_gain = if peak > limit { limit / peak } else { 1.0 };
        let coeff = if target_gain < self.limiter_gain {
            0.25
        } else {
            0.01
        };
        self.limiter_gain =
            (self.limiter_gain + coeff * (target_gain - self.limiter_gain)).clamp(0.0, 1.0);

        if self.limiter_gain < 0.999 {
            for (l, r) in out_l.iter_mut().zip(out_r.iter_mut()) {
                *l *= self.limiter_gain;
                *r *= self.limiter_gain;
            }
        }
    }
}

impl AudioRenderCallback for AudioGraph {
    fn render(&mut self, sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = out_l.len().min(out_r.len());
        let sound_enabled = self.params.sound_enabled();

        // Plucks queued while muted are dropped, not deferred.
        while let Ok(event) = self.consumer.pop() {
            if sound_enabled {
                self.synth.pluck(event, sample_time_start);
            }
        }

        self.synth
            .render(frames, &mut out_l[..frames], &mut out_r[..frames]);
        if !sound_enabled {
            out_l.fill(0.0);
            out_r.fill(0.0);
            return;
        }
        self.apply_master(&mut out_l[..frames], &mut out_r[..frames]);
    }
}
