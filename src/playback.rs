//! Visual playback of a resolved move
//!
//! Turns a move's explosion log into a time-ordered list of orb flights.
//! Purely cosmetic: the game state is already final when a playback is built,
//! and dropping a playback half way never touches it.

use crate::settings::Settings;
use crate::sim::{ExplosionEvent, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightKind {
    /// The placed orb falling into its cell
    Drop,
    /// An orb thrown from an exploding cell into a neighbour
    Burst { wave: u32 },
}

/// One orb moving between two cells
#[derive(Debug, Clone, PartialEq)]
pub struct OrbFlight {
    pub kind: FlightKind,
    pub from: (usize, usize),
    pub to: (usize, usize),
    /// Colour at take-off (`None` renders as neutral)
    pub from_owner: Option<PlayerId>,
    /// Colour on landing
    pub to_owner: PlayerId,
    /// Seconds from the start of the playback
    pub start: f32,
    pub duration: f32,
}

impl OrbFlight {
    /// Linear progress in [0, 1) at time `t`, or `None` outside the flight
    pub fn progress_at(&self, t: f32) -> Option<f32> {
        if t < self.start || t >= self.start + self.duration {
            return None;
        }
        Some((t - self.start) / self.duration)
    }
}

/// Timed schedule for one move
#[derive(Debug, Clone)]
pub struct Playback {
    flights: Vec<OrbFlight>,
    /// (start time, origin) per explosion, in start order
    explosions: Vec<(f32, (usize, usize))>,
    elapsed: f32,
    total: f32,
}

impl Playback {
    /// Schedule the drop-in at `placed` followed by each wave in order.
    ///
    /// Waves play one after another; explosions inside a wave start together.
    /// The whole schedule is compressed uniformly to fit `max_playback_secs`.
    pub fn schedule(
        placed: (usize, usize),
        mover: PlayerId,
        events: &[ExplosionEvent],
        settings: &Settings,
    ) -> Self {
        let waves = events.iter().map(|e| e.wave + 1).max().unwrap_or(0);
        let gaps = waves.saturating_sub(1) as f32;
        let natural = settings.drop_secs
            + waves as f32 * settings.flight_secs
            + gaps * settings.wave_gap_secs;
        let scale = if natural > settings.max_playback_secs {
            settings.max_playback_secs / natural
        } else {
            1.0
        };

        let drop = settings.drop_secs * scale;
        let flight = settings.flight_secs * scale;
        let stride = (settings.flight_secs + settings.wave_gap_secs) * scale;

        let mut flights = Vec::with_capacity(1 + events.len() * 4);
        flights.push(OrbFlight {
            kind: FlightKind::Drop,
            from: placed,
            to: placed,
            from_owner: Some(mover),
            to_owner: mover,
            start: 0.0,
            duration: drop,
        });

        let mut explosions = Vec::with_capacity(events.len());
        for event in events {
            let start = drop + event.wave as f32 * stride;
            let origin = (event.origin_row, event.origin_col);
            explosions.push((start, origin));
            for &to in &event.destinations {
                flights.push(OrbFlight {
                    kind: FlightKind::Burst { wave: event.wave },
                    from: origin,
                    to,
                    from_owner: event.from_owner,
                    to_owner: event.to_owner,
                    start,
                    duration: flight,
                });
            }
        }

        Self {
            flights,
            explosions,
            elapsed: 0.0,
            total: natural * scale,
        }
    }

    /// Advance by `dt` seconds. Returns true once the playback has finished.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.total);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.total
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn flights(&self) -> &[OrbFlight] {
        &self.flights
    }

    /// Flights in the air right now, with their progress
    pub fn active(&self) -> impl Iterator<Item = (&OrbFlight, f32)> {
        let t = self.elapsed;
        self.flights
            .iter()
            .filter_map(move |f| f.progress_at(t).map(|p| (f, p)))
    }

    /// Origin of the most recently started explosion, for highlights
    pub fn last_explosion(&self) -> Option<(usize, usize)> {
        self.explosions
            .iter()
            .take_while(|(start, _)| *start <= self.elapsed)
            .last()
            .map(|&(_, origin)| origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u8) -> PlayerId {
        PlayerId::new(n).unwrap()
    }

    fn event(wave: u32, origin: (usize, usize), dests: &[(usize, usize)]) -> ExplosionEvent {
        ExplosionEvent {
            wave,
            origin_row: origin.0,
            origin_col: origin.1,
            from_owner: Some(p(2)),
            to_owner: p(1),
            destinations: dests.to_vec(),
        }
    }

    #[test]
    fn test_drop_only() {
        let settings = Settings::default();
        let mut playback = Playback::schedule((3, 3), p(1), &[], &settings);
        assert_eq!(playback.flights().len(), 1);
        assert_eq!(playback.flights()[0].kind, FlightKind::Drop);
        assert!((playback.total() - settings.drop_secs).abs() < 1e-6);
        assert!(!playback.advance(0.25));
        assert_eq!(playback.active().count(), 1);
        assert!(playback.advance(0.25));
        assert_eq!(playback.active().count(), 0);
    }

    #[test]
    fn test_waves_play_in_order() {
        let settings = Settings::default();
        let events = vec![
            event(0, (0, 0), &[(1, 0), (0, 1)]),
            event(1, (0, 1), &[(1, 1), (0, 0), (0, 2)]),
        ];
        let playback = Playback::schedule((0, 0), p(1), &events, &settings);
        assert_eq!(playback.flights().len(), 6);

        let wave0 = &playback.flights()[1];
        let wave1 = &playback.flights()[3];
        assert_eq!(wave0.kind, FlightKind::Burst { wave: 0 });
        assert_eq!(wave1.kind, FlightKind::Burst { wave: 1 });
        assert!(wave0.start + wave0.duration <= wave1.start);
        assert_eq!(wave0.from_owner, Some(p(2)));
        assert_eq!(wave0.to_owner, p(1));
    }

    #[test]
    fn test_long_cascade_is_compressed() {
        let settings = Settings::default();
        let events: Vec<_> = (0..20).map(|w| event(w, (0, 0), &[(0, 1)])).collect();
        let mut playback = Playback::schedule((0, 0), p(1), &events, &settings);
        assert!(playback.total() <= settings.max_playback_secs + 1e-4);
        assert!(playback.advance(settings.max_playback_secs + 0.01));
    }

    #[test]
    fn test_last_explosion_tracks_time() {
        let settings = Settings::default();
        let events = vec![event(0, (0, 0), &[(1, 0)]), event(1, (1, 0), &[(2, 0)])];
        let mut playback = Playback::schedule((0, 0), p(1), &events, &settings);
        assert_eq!(playback.last_explosion(), None);
        playback.advance(settings.drop_secs + 0.01);
        assert_eq!(playback.last_explosion(), Some((0, 0)));
        playback.advance(settings.flight_secs + settings.wave_gap_secs);
        assert_eq!(playback.last_explosion(), Some((1, 0)));
    }
}
