/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// Every effect the game can play.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Chomp,
    PowerUp,
    EatAdversary,
    Revive,
    Caught,
    Win,
    Lose,
    Ready,
}

/// Which effect (if any) a simulation event triggers.
pub fn sfx_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::PelletEaten { .. } => Some(Sfx::Chomp),
        GameEvent::PowerPelletEaten { .. } => Some(Sfx::PowerUp),
        GameEvent::AdversaryEaten { .. } => Some(Sfx::EatAdversary),
        GameEvent::AdversaryRevived { .. } => Some(Sfx::Revive),
        GameEvent::PowerExpired => None,
        GameEvent::PlayerCaught { lives_left, .. } if *lives_left > 0 => Some(Sfx::Caught),
        // The RoundLost that follows carries the sound.
        GameEvent::PlayerCaught { .. } => None,
        GameEvent::RoundWon => Some(Sfx::Win),
        GameEvent::RoundLost => Some(Sfx::Lose),
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::cell::Cell;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    use super::Sfx;

    pub(super) const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_chomp: [Arc<Vec<u8>>; 2],
        sfx_power: Arc<Vec<u8>>,
        sfx_eat: Arc<Vec<u8>>,
        sfx_revive: Arc<Vec<u8>>,
        sfx_caught: Arc<Vec<u8>>,
        sfx_win: Arc<Vec<u8>>,
        sfx_lose: Arc<Vec<u8>>,
        sfx_ready: Arc<Vec<u8>>,
        /// Alternates the two chomp pitches ("wa-ka").
        chomp_flip: Cell<bool>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("audio output unavailable: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_chomp: [
                    Arc::new(make_wav(&gen_chomp(480.0, 260.0))),
                    Arc::new(make_wav(&gen_chomp(260.0, 480.0))),
                ],
                sfx_power: Arc::new(make_wav(&gen_power())),
                sfx_eat: Arc::new(make_wav(&gen_eat())),
                sfx_revive: Arc::new(make_wav(&gen_blip(880.0, 0.05, 0.15))),
                sfx_caught: Arc::new(make_wav(&gen_caught())),
                sfx_win: Arc::new(make_wav(&gen_win())),
                sfx_lose: Arc::new(make_wav(&gen_lose())),
                sfx_ready: Arc::new(make_wav(&gen_ready())),
                chomp_flip: Cell::new(false),
            })
        }

        fn play_buf(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play(&self, sfx: Sfx) {
            match sfx {
                Sfx::Chomp => {
                    let flip = self.chomp_flip.get();
                    self.chomp_flip.set(!flip);
                    self.play_buf(&self.sfx_chomp[flip as usize]);
                }
                Sfx::PowerUp => self.play_buf(&self.sfx_power),
                Sfx::EatAdversary => self.play_buf(&self.sfx_eat),
                Sfx::Revive => self.play_buf(&self.sfx_revive),
                Sfx::Caught => self.play_buf(&self.sfx_caught),
                Sfx::Win => self.play_buf(&self.sfx_win),
                Sfx::Lose => self.play_buf(&self.sfx_lose),
                Sfx::Ready => self.play_buf(&self.sfx_ready),
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn tone(t: f32, freq: f32) -> f32 {
        (t * freq * 2.0 * std::f32::consts::PI).sin()
    }

    /// Simple sine blip at given frequency and duration
    pub(super) fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                tone(t, freq) * env * volume
            })
            .collect()
    }

    /// Pellet: very short square-ish glide between two pitches
    fn gen_chomp(from: f32, to: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.06) as usize;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = from + (to - from) * p;
                let t = i as f32 / SAMPLE_RATE as f32;
                let wave = tone(t, freq) * 0.7 + tone(t, freq * 3.0) * 0.3;
                wave * (1.0 - p).powf(0.5) * 0.2
            })
            .collect()
    }

    /// Power pellet: rising wobble
    fn gen_power() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.35) as usize;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let wobble = (t * 18.0 * 2.0 * std::f32::consts::PI).sin() * 40.0;
                let freq = 300.0 + p * 500.0 + wobble;
                tone(t, freq) * (1.0 - p * 0.6) * 0.25
            })
            .collect()
    }

    /// Adversary eaten: fast upward sweep
    fn gen_eat() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.18) as usize;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let freq = 200.0 + p * p * 1400.0;
                tone(t, freq) * (1.0 - p).powf(0.3) * 0.25
            })
            .collect()
    }

    /// Caught: descending spiral
    fn gen_caught() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.7) as usize;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let freq = 700.0 - p * 550.0 + (t * 12.0 * 2.0 * std::f32::consts::PI).sin() * 30.0;
                tone(t, freq) * (1.0 - p) * 0.3
            })
            .collect()
    }

    fn gen_notes(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = tone(t, freq) * 0.6 + tone(t, freq * 2.0) * 0.3 + tone(t, freq * 3.0) * 0.1;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Round won: ascending fanfare with a held top note
    fn gen_win() -> Vec<f32> {
        let mut samples = gen_notes(&[523.0, 659.0, 784.0, 1047.0], 0.1, 0.3); // C5→E5→G5→C6
        samples.extend(gen_blip(1047.0, 0.25, 0.3));
        samples
    }

    /// Round lost: sad descending tones with a final fade
    fn gen_lose() -> Vec<f32> {
        let mut samples = gen_notes(&[440.0, 370.0, 311.0, 261.0], 0.14, 0.3); // A4→F#4→Eb4→C4
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for (i, s) in samples.iter_mut().enumerate().skip(total - fade_len) {
            *s *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    /// Ready jingle
    fn gen_ready() -> Vec<f32> {
        gen_notes(&[523.0, 1047.0, 784.0, 659.0, 1047.0, 784.0], 0.07, 0.2)
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
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
//  Public API — compiles to no-ops when sound feature is off
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

impl SoundEngine {
    /// Play whatever the step's events call for.
    pub fn play_events(&self, events: &[GameEvent]) {
        for sfx in events.iter().filter_map(sfx_for) {
            self.play(sfx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::TilePos;

    #[test]
    fn events_map_to_effects() {
        let tile = TilePos::new(1, 1);
        assert_eq!(sfx_for(&GameEvent::PelletEaten { tile }), Some(Sfx::Chomp));
        assert_eq!(sfx_for(&GameEvent::PowerPelletEaten { tile }), Some(Sfx::PowerUp));
        assert_eq!(sfx_for(&GameEvent::PowerExpired), None);
        assert_eq!(sfx_for(&GameEvent::PlayerCaught { by: 0, lives_left: 2 }), Some(Sfx::Caught));
        assert_eq!(sfx_for(&GameEvent::PlayerCaught { by: 0, lives_left: 0 }), None);
        assert_eq!(sfx_for(&GameEvent::RoundLost), Some(Sfx::Lose));
    }

    #[cfg(feature = "sound")]
    #[test]
    fn wav_header_matches_payload() {
        let samples = inner::gen_blip(440.0, 0.01, 0.5);
        let wav = inner::make_wav(&samples);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + samples.len() * 2);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size as usize, samples.len() * 2);
    }
}
