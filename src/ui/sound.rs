/// Sound engine: procedural sound effects via rodio.
///
/// Every effect is synthesized into an in-memory WAV buffer once at init.
/// Playback is fire-and-forget through a detached rodio `Sink`.
///
/// Without the "sound" feature the engine is a stub and every call is a
/// no-op; `sfx_for` (event → effect) is shared by both builds.

use grenadier::domain::controller::ControllerEvent;
use grenadier::domain::entity::EntityKind;
use grenadier::sim::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Jump,
    Land,
    Throw,
    Impact,
    Explode,
}

impl Sfx {
    #[cfg_attr(not(feature = "sound"), allow(dead_code))]
    const ALL: [Sfx; 5] = [Sfx::Jump, Sfx::Land, Sfx::Throw, Sfx::Impact, Sfx::Explode];
}

/// Which effect (if any) an event plays. Only grenade impacts click;
/// debris bouncing around would be noise.
pub fn sfx_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::Controller(ControllerEvent::Jumped) => Some(Sfx::Jump),
        GameEvent::Controller(ControllerEvent::Landed) => Some(Sfx::Land),
        GameEvent::Controller(ControllerEvent::ThrowReleased { .. }) => Some(Sfx::Throw),
        GameEvent::Controller(ControllerEvent::Exploded { .. }) => Some(Sfx::Explode),
        GameEvent::BodyImpact { kind: EntityKind::Grenade, .. } => Some(Sfx::Impact),
        _ => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// Indexed by `Sfx as usize`.
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "audio_output_unavailable");
                    return None;
                }
            };

            let buffers = Sfx::ALL.iter()
                .map(|&sfx| Arc::new(make_wav(&synth(sfx))))
                .collect();

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let buf = &self.buffers[sfx as usize];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce mono f32 samples
    // ════════════════════════════════════════════════════════════

    fn synth(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Jump => sweep(320.0, 720.0, 0.09, 0.22, 0.0),
            Sfx::Land => sweep(180.0, 90.0, 0.06, 0.3, 0.3),
            Sfx::Throw => sweep(900.0, 400.0, 0.12, 0.15, 0.6),
            Sfx::Impact => sweep(1400.0, 1200.0, 0.025, 0.2, 0.2),
            Sfx::Explode => explosion(),
        }
    }

    /// Linear pitch sweep with a fading envelope. `noise` (0..1) mixes in
    /// white noise for thuds and whooshes.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32, noise: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 0x9E37_79B9;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq * TAU / SAMPLE_RATE as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let white = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.7);
                (phase.sin() * (1.0 - noise) + white * noise) * env * volume
            })
            .collect()
    }

    /// Long noise burst over a low rumble, with a slow decay.
    fn explosion() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.6) as usize;
        let mut rng: u32 = 12345;
        let mut smooth = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let white = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                // One-pole low-pass: darker as the blast decays.
                let k = 0.5 - 0.45 * t;
                smooth += (white - smooth) * k;
                let rumble = (ti * 55.0 * TAU).sin() * 0.4;
                (smooth * 0.8 + rumble) * (1.0 - t).powf(1.8) * 0.45
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}
