//! Tick-driven music player
//!
//! The player is polled from the frame loop with a millisecond clock. When
//! the current note's time is up it decodes the next one and dispatches a
//! [`Sequence`] to the connected sink. Dispatch never blocks: when the sink
//! falls behind, sequences are dropped.

use crate::codec;
use crate::error::{AudioError, Result};
use crate::types::*;
use crossbeam::channel::{self, Receiver, Sender};

/// Player statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerStats {
    pub notes_played: u64,
    pub sequences_dropped: u64,
}

pub struct MusicPlayer {
    config: PlayerConfig,
    music: Option<Music>,

    // Derived from the current music's tempo
    beat_ms: f32,
    separation_ms: u32,

    playing: bool,
    cursor: usize,
    last_start: u64,
    next_note: u64,

    sink: Option<Sender<Sequence>>,
    stats: PlayerStats,
}

impl MusicPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config: PlayerConfig {
                volume: config.volume.clamp(0.0, 1.0),
                ..config
            },
            music: None,
            beat_ms: 0.0,
            separation_ms: 0,
            playing: false,
            cursor: 0,
            last_start: 0,
            next_note: 0,
            sink: None,
            stats: PlayerStats::default(),
        }
    }

    /// Connect the notification sink
    ///
    /// Replaces any previous sink. Returns the receiving end the sink drains.
    pub fn connect_sink(&mut self) -> Receiver<Sequence> {
        let (tx, rx) = channel::bounded(self.config.queue_depth.max(1));
        self.sink = Some(tx);
        rx
    }

    pub fn disconnect_sink(&mut self) {
        self.sink = None;
    }

    /// Install a song. Playback stops until [`MusicPlayer::play`].
    pub fn set_music(&mut self, music: Music) -> Result<()> {
        if music.bpm == 0 {
            return Err(AudioError::ZeroTempo);
        }
        if music.notes.is_empty() {
            return Err(AudioError::EmptyMusic);
        }

        self.beat_ms = music.beat_ms();
        self.separation_ms = (self.beat_ms * music.separation.max(0.0)).floor() as u32;
        self.playing = false;
        self.music = Some(music);
        Ok(())
    }

    pub fn music(&self) -> Option<&Music> {
        self.music.as_ref()
    }

    /// Start from the first note; it sounds one beat after `now_ms`
    pub fn play(&mut self, now_ms: u64) {
        if self.music.is_none() {
            log::warn!("play() without music");
            return;
        }

        self.playing = true;
        self.cursor = 0;
        self.last_start = now_ms;
        self.next_note = self.beat_ms.floor() as u64;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.config.volume
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.config.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.config.muted
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    /// Advance playback to `now_ms`
    ///
    /// Returns true when a new note was started.
    pub fn update(&mut self, now_ms: u64) -> bool {
        if !self.playing {
            return false;
        }
        let Some(looping) = self.music.as_ref().map(|m| m.looping) else {
            return false;
        };
        if now_ms.saturating_sub(self.last_start) < self.next_note {
            return false;
        }

        let mut beat = match self.beat_at(self.cursor) {
            Ok(beat) => beat,
            Err(e) => {
                log::warn!("Skipping note {}: {}", self.cursor, e);
                self.cursor += 1;
                return false;
            }
        };

        if beat.note == Note::End {
            if !looping {
                log::debug!("Music finished after {} notes", self.cursor);
                self.playing = false;
                return false;
            }

            self.cursor = 0;
            beat = match self.beat_at(0) {
                Ok(beat) if beat.note != Note::End => beat,
                _ => {
                    log::warn!("Looping music has no playable first note");
                    self.playing = false;
                    return false;
                }
            };
        }

        let length_ms = (self.beat_ms * beat.length).floor() as u32;
        let sequence = Sequence::new(
            self.directives(&beat, length_ms.saturating_sub(self.separation_ms)),
            now_ms,
        );

        if !self.config.muted {
            self.dispatch(sequence);
        }

        self.last_start = now_ms;
        self.next_note = length_ms as u64;
        self.cursor += 1;
        self.stats.notes_played += 1;
        true
    }

    /// Missing entries past the end of the list read as the end marker
    fn beat_at(&self, index: usize) -> Result<Beat> {
        match self.music.as_ref().and_then(|m| m.notes.get(index)) {
            Some(&value) => codec::decode(value),
            None => Ok(Beat::end()),
        }
    }

    fn directives(&self, beat: &Beat, hold_ms: u32) -> Vec<Directive> {
        match beat.note {
            Note::Buzz => vec![
                Directive::Vibrate(true),
                Directive::Delay(hold_ms),
                Directive::Vibrate(false),
            ],
            Note::None | Note::End => vec![
                Directive::Silence,
                Directive::Delay(hold_ms),
                Directive::Silence,
            ],
            _ => vec![
                Directive::Tone {
                    frequency: codec::frequency(beat),
                    volume: self.config.volume,
                },
                Directive::Delay(hold_ms),
                Directive::Silence,
            ],
        }
    }

    fn dispatch(&mut self, sequence: Sequence) {
        let Some(sink) = &self.sink else {
            return;
        };

        // Non-blocking send; a full or disconnected sink loses the note
        if sink.try_send(sequence).is_err() {
            self.stats.sequences_dropped += 1;
            log::trace!("Dropped note sequence, sink not keeping up");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(looping: bool) -> Music {
        let notes = vec![
            codec::encode(&Beat::new(Note::A, 4, 1.0)).unwrap(),
            codec::encode(&Beat::new(Note::Buzz, 0, 0.5)).unwrap(),
            codec::encode(&Beat::new(Note::None, 0, 1.0)).unwrap(),
            codec::encode(&Beat::end()).unwrap(),
        ];
        Music::new(notes, 60).with_separation(0.1).with_loop(looping)
    }

    fn hold_ms(beats: f32) -> u32 {
        (1000.0 * codec::unscale_length(codec::scale_length(beats))).floor() as u32 - 100
    }

    #[test]
    fn test_first_note_after_one_beat() {
        let mut player = MusicPlayer::new(PlayerConfig::default());
        let rx = player.connect_sink();
        player.set_music(song(false)).unwrap();
        player.play(0);

        assert!(!player.update(999));
        assert!(rx.is_empty());

        assert!(player.update(1000));
        let sequence = rx.try_recv().unwrap();
        assert_eq!(sequence.timestamp, 1000);
        assert_eq!(sequence.len(), 3);
        match sequence.directives[0] {
            Directive::Tone { frequency, volume } => {
                assert!((frequency - 440.0).abs() < 0.5);
                assert_eq!(volume, 1.0);
            }
            other => panic!("expected tone, got {:?}", other),
        }
        assert_eq!(sequence.directives[1], Directive::Delay(hold_ms(1.0)));
        assert_eq!(sequence.directives[2], Directive::Silence);
    }

    #[test]
    fn test_buzz_and_rest() {
        let mut player = MusicPlayer::new(PlayerConfig::default());
        let rx = player.connect_sink();
        player.set_music(song(false)).unwrap();
        player.play(0);

        assert!(player.update(10_000));
        assert!(player.update(20_000));
        assert!(player.update(30_000));

        let _tone = rx.try_recv().unwrap();
        let buzz = rx.try_recv().unwrap();
        assert_eq!(
            buzz.directives,
            vec![
                Directive::Vibrate(true),
                Directive::Delay(hold_ms(0.5)),
                Directive::Vibrate(false)
            ]
        );
        let rest = rx.try_recv().unwrap();
        assert_eq!(rest.directives[0], Directive::Silence);
    }

    #[test]
    fn test_non_looping_stops_at_end() {
        let mut player = MusicPlayer::new(PlayerConfig {
            queue_depth: 8,
            ..PlayerConfig::default()
        });
        let _rx = player.connect_sink();
        player.set_music(song(false)).unwrap();
        player.play(0);

        for step in 1..=3 {
            assert!(player.update(step * 10_000));
        }
        assert!(!player.update(40_000));
        assert!(!player.is_playing());
        assert_eq!(player.stats().notes_played, 3);
    }

    #[test]
    fn test_looping_restarts() {
        let mut player = MusicPlayer::new(PlayerConfig {
            queue_depth: 8,
            ..PlayerConfig::default()
        });
        let rx = player.connect_sink();
        player.set_music(song(true)).unwrap();
        player.play(0);

        for step in 1..=4 {
            assert!(player.update(step * 10_000));
        }
        assert!(player.is_playing());

        let sequences: Vec<_> = rx.try_iter().collect();
        assert_eq!(sequences.len(), 4);
        assert!(matches!(sequences[3].directives[0], Directive::Tone { .. }));
    }

    #[test]
    fn test_muted_keeps_time() {
        let mut player = MusicPlayer::new(PlayerConfig {
            muted: true,
            ..PlayerConfig::default()
        });
        let rx = player.connect_sink();
        player.set_music(song(false)).unwrap();
        player.play(0);

        assert!(player.update(1000));
        assert!(rx.is_empty());
        assert_eq!(player.stats().notes_played, 1);
    }

    #[test]
    fn test_full_sink_drops() {
        let mut player = MusicPlayer::new(PlayerConfig {
            queue_depth: 1,
            ..PlayerConfig::default()
        });
        let rx = player.connect_sink();
        player.set_music(song(false)).unwrap();
        player.play(0);

        assert!(player.update(10_000));
        assert!(player.update(20_000));
        assert_eq!(rx.len(), 1);
        assert_eq!(player.stats().sequences_dropped, 1);
    }

    #[test]
    fn test_stop() {
        let mut player = MusicPlayer::new(PlayerConfig::default());
        player.set_music(song(true)).unwrap();
        player.play(0);
        player.stop();
        assert!(!player.update(10_000));
    }

    #[test]
    fn test_set_music_rejects_invalid() {
        let mut player = MusicPlayer::new(PlayerConfig::default());
        assert_eq!(
            player.set_music(Music::new(vec![0], 0)),
            Err(AudioError::ZeroTempo)
        );
        assert_eq!(
            player.set_music(Music::new(vec![], 120)),
            Err(AudioError::EmptyMusic)
        );
        assert!(player.music().is_none());
    }

    #[test]
    fn test_volume_clamped() {
        let mut player = MusicPlayer::new(PlayerConfig {
            volume: 3.0,
            ..PlayerConfig::default()
        });
        assert_eq!(player.volume(), 1.0);
        player.set_volume(-0.5);
        assert_eq!(player.volume(), 0.0);
    }
}
