//! Web Audio sound cues
//!
//! Procedurally generated tones, so there are no sound files to load.

use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

use crate::host::{AudioError, AudioSink};
use crate::sim::SoundCue;

/// Browser audio sink
pub struct WebAudio {
    ctx: Option<AudioContext>,
    volume: f32,
    muted: bool,
}

impl Default for WebAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAudio {
    pub fn new() -> Self {
        // Fails outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            volume: 0.8,
            muted: false,
        }
    }

    /// Resume the context; browsers require a user gesture first
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx
            && let Err(e) = ctx.resume()
        {
            log::warn!("AudioContext resume failed: {:?}", e);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Oscillator routed through a gain node to the output
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Result<(OscillatorNode, GainNode), AudioError> {
        let fail = |e: wasm_bindgen::JsValue| AudioError::Playback(format!("{e:?}"));
        let osc = ctx.create_oscillator().map_err(fail)?;
        let gain = ctx.create_gain().map_err(fail)?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).map_err(fail)?;
        gain.connect_with_audio_node(&ctx.destination()).map_err(fail)?;
        Ok((osc, gain))
    }

    /// One enveloped tone, optionally gliding to `glide_to`
    fn tone(
        ctx: &AudioContext,
        freq: f32,
        glide_to: Option<f32>,
        osc_type: OscillatorType,
        vol: f32,
        delay: f64,
        length: f64,
    ) -> Result<(), AudioError> {
        let fail = |e: wasm_bindgen::JsValue| AudioError::Playback(format!("{e:?}"));
        let (osc, gain) = Self::create_osc(ctx, freq, osc_type)?;
        let t = ctx.current_time() + delay;

        gain.gain().set_value_at_time(vol, t).map_err(fail)?;
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + length)
            .map_err(fail)?;
        if let Some(target) = glide_to {
            osc.frequency().set_value_at_time(freq, t).map_err(fail)?;
            osc.frequency()
                .exponential_ramp_to_value_at_time(target, t + length * 0.8)
                .map_err(fail)?;
        }
        osc.start_with_when(t).map_err(fail)?;
        osc.stop_with_when(t + length + 0.05).map_err(fail)?;
        Ok(())
    }

    /// Notes played one after another
    fn arpeggio(
        ctx: &AudioContext,
        notes: &[f32],
        spacing: f64,
        osc_type: OscillatorType,
        vol: f32,
    ) -> Result<(), AudioError> {
        for (i, &freq) in notes.iter().enumerate() {
            Self::tone(ctx, freq, None, osc_type, vol, i as f64 * spacing, 0.3)?;
        }
        Ok(())
    }
}

impl AudioSink for WebAudio {
    fn play(&mut self, cue: SoundCue) -> Result<(), AudioError> {
        if self.muted || self.volume <= 0.0 {
            return Ok(());
        }
        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| AudioError::Unavailable("no AudioContext".into()))?;
        if ctx.state() == AudioContextState::Suspended {
            // Autoplay policy: retried on the next cue after a gesture
            let _ = ctx.resume();
        }

        let vol = self.volume;
        match cue {
            SoundCue::Launch => {
                Self::tone(ctx, 200.0, Some(600.0), OscillatorType::Triangle, vol * 0.3, 0.0, 0.2)
            }
            SoundCue::Merge => {
                Self::tone(ctx, 330.0, Some(660.0), OscillatorType::Sine, vol * 0.4, 0.0, 0.15)?;
                Self::tone(ctx, 660.0, None, OscillatorType::Triangle, vol * 0.2, 0.08, 0.2)
            }
            SoundCue::Eat => {
                Self::tone(ctx, 180.0, Some(90.0), OscillatorType::Square, vol * 0.2, 0.0, 0.12)
            }
            SoundCue::RoundWon => Self::arpeggio(
                ctx,
                &[400.0, 500.0, 600.0, 800.0],
                0.1,
                OscillatorType::Triangle,
                vol * 0.3,
            ),
            SoundCue::LifeLost => {
                Self::tone(ctx, 300.0, Some(120.0), OscillatorType::Sawtooth, vol * 0.25, 0.0, 0.4)
            }
            SoundCue::GameOver => Self::arpeggio(
                ctx,
                &[400.0, 350.0, 300.0, 200.0],
                0.2,
                OscillatorType::Sine,
                vol * 0.3,
            ),
        }
    }
}
