//! Optimistic realtime sync
//!
//! Peers share one JSON document per game holding the latest [`GameState`].
//! Every accepted move publishes the whole state; every peer adopts whatever
//! arrives if it differs from its own. Last writer wins, no merging.
//!
//! [`LocalHub`] is an in-process document store implementing [`SyncAdapter`],
//! used by tests and the native demo. Browser builds plug a realtime database
//! in behind the same trait.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ChainError;
use crate::orchestrator::MoveOrchestrator;
use crate::settings::Settings;
use crate::sim::GameState;

/// Lowest and highest generated host id
const HOST_ID_RANGE: std::ops::RangeInclusive<u32> = 1000..=9999;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("document codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("unknown subscription {0}")]
    UnknownSubscription(u64),

    /// The backing store refused or could not take the write
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key shared by all peers of one game
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(String);

impl GameId {
    /// Fresh 4-digit id for a hosted game
    pub fn host<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(HOST_ID_RANGE).to_string())
    }

    /// Id typed in by a joining player. Empty input is `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the shared document
    pub fn document_key(&self) -> String {
        format!("chain/{}", self.0)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type RemoteCallback = Box<dyn FnMut(GameState)>;

/// Shared document store keyed by game id
pub trait SyncAdapter {
    /// Watch a game. Seeds the document with `local` if it does not exist yet,
    /// then reports the current document and every later write to `on_remote`.
    fn subscribe(
        &self,
        game_id: &GameId,
        local: &GameState,
        on_remote: RemoteCallback,
    ) -> Result<SubscriptionId, SyncError>;

    fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), SyncError>;

    /// Overwrite the document
    fn publish(&self, game_id: &GameId, state: &GameState) -> Result<(), SyncError>;
}

struct Subscriber {
    id: SubscriptionId,
    key: String,
    callback: Rc<RefCell<RemoteCallback>>,
}

#[derive(Default)]
struct HubInner {
    documents: HashMap<String, String>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// In-process document store. Clones share the same documents.
#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Rc<RefCell<HubInner>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON of a game's document
    pub fn document(&self, game_id: &GameId) -> Option<String> {
        self.inner
            .borrow()
            .documents
            .get(&game_id.document_key())
            .cloned()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Call the listed subscribers with `json`. The hub is not borrowed while
    /// callbacks run, so they may publish in turn.
    fn deliver(json: &str, callbacks: Vec<Rc<RefCell<RemoteCallback>>>) {
        let state: GameState = match serde_json::from_str(json) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("dropping undecodable document: {}", e);
                return;
            }
        };
        for callback in callbacks {
            (&mut *callback.borrow_mut())(state.clone());
        }
    }
}

impl SyncAdapter for LocalHub {
    fn subscribe(
        &self,
        game_id: &GameId,
        local: &GameState,
        on_remote: RemoteCallback,
    ) -> Result<SubscriptionId, SyncError> {
        let key = game_id.document_key();
        let callback = Rc::new(RefCell::new(on_remote));

        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.documents.contains_key(&key) {
                log::info!("seeding new game document {}", key);
                inner.documents.insert(key.clone(), serde_json::to_string(local)?);
            }
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.subscribers.push(Subscriber {
                id,
                key: key.clone(),
                callback: callback.clone(),
            });
            (id, inner.documents.get(&key).cloned())
        };

        if let Some(json) = current {
            Self::deliver(&json, vec![callback]);
        }
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), SyncError> {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != subscription);
        if inner.subscribers.len() == before {
            return Err(SyncError::UnknownSubscription(subscription.0));
        }
        Ok(())
    }

    fn publish(&self, game_id: &GameId, state: &GameState) -> Result<(), SyncError> {
        let key = game_id.document_key();
        let json = serde_json::to_string(state)?;
        let callbacks: Vec<_> = {
            let mut inner = self.inner.borrow_mut();
            inner.documents.insert(key.clone(), json.clone());
            inner
                .subscribers
                .iter()
                .filter(|s| s.key == key)
                .map(|s| s.callback.clone())
                .collect()
        };
        Self::deliver(&json, callbacks);
        Ok(())
    }
}

/// One peer's view of a shared game
pub struct SyncedGame<A: SyncAdapter> {
    game_id: GameId,
    orchestrator: MoveOrchestrator,
    adapter: A,
    subscription: Option<SubscriptionId>,
    inbox: Rc<RefCell<VecDeque<GameState>>>,
}

impl<A: SyncAdapter> SyncedGame<A> {
    /// Host a new game under a random id
    pub fn host<R: Rng + ?Sized>(
        adapter: A,
        settings: Settings,
        rng: &mut R,
    ) -> Result<Self, ChainError> {
        let game_id = GameId::host(rng);
        log::info!("hosting game {}", game_id);
        Self::connect(adapter, MoveOrchestrator::new(settings)?, game_id)
    }

    /// Join a game by id, adopting whatever the document holds
    pub fn join(adapter: A, settings: Settings, game_id: GameId) -> Result<Self, ChainError> {
        log::info!("joining game {}", game_id);
        Self::connect(adapter, MoveOrchestrator::new(settings)?, game_id)
    }

    /// Attach an existing orchestrator to `game_id`
    pub fn connect(
        adapter: A,
        orchestrator: MoveOrchestrator,
        game_id: GameId,
    ) -> Result<Self, ChainError> {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = inbox.clone();
        let subscription = adapter.subscribe(
            &game_id,
            orchestrator.state(),
            Box::new(move |state| sink.borrow_mut().push_back(state)),
        )?;

        let mut game = Self {
            game_id,
            orchestrator,
            adapter,
            subscription: Some(subscription),
            inbox,
        };
        game.poll();
        Ok(game)
    }

    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    pub fn orchestrator(&self) -> &MoveOrchestrator {
        &self.orchestrator
    }

    pub fn state(&self) -> &GameState {
        self.orchestrator.state()
    }

    /// Adopt pending remote snapshots in arrival order. Returns true if the
    /// local state changed.
    pub fn poll(&mut self) -> bool {
        let pending: Vec<GameState> = self.inbox.borrow_mut().drain(..).collect();
        let mut changed = false;
        for state in pending {
            changed |= self.orchestrator.adopt_remote(state);
        }
        changed
    }

    /// Submit a move locally and publish the result if accepted.
    ///
    /// If the publish fails the move is rolled back, so this peer never runs
    /// ahead of what the others can see.
    pub fn submit_move(&mut self, row: usize, col: usize) -> Result<bool, ChainError> {
        self.poll();
        let before = self.orchestrator.state().clone();
        if !self.orchestrator.submit_move(row, col)? {
            return Ok(false);
        }
        if let Err(e) = self.adapter.publish(&self.game_id, self.orchestrator.state()) {
            log::warn!(
                "publish to game {} failed, rolling back move ({}, {}): {}",
                self.game_id,
                row,
                col,
                e
            );
            self.orchestrator.restore(before);
            return Err(e.into());
        }
        Ok(true)
    }

    /// Frame step: adopt remote updates, then drive playback
    pub fn advance(&mut self, dt: f32) {
        self.poll();
        self.orchestrator.advance(dt);
    }

    pub fn playback_finished(&mut self) {
        self.orchestrator.playback_finished();
    }

    /// Reset locally and for every peer
    pub fn reset(&mut self) -> Result<(), ChainError> {
        self.orchestrator.reset();
        self.adapter.publish(&self.game_id, self.orchestrator.state())?;
        Ok(())
    }

    /// Stop listening for remote updates
    pub fn leave(&mut self) -> Result<(), ChainError> {
        if let Some(subscription) = self.subscription.take() {
            self.adapter.unsubscribe(subscription)?;
            log::info!("left game {}", self.game_id);
        }
        Ok(())
    }
}

impl<A: SyncAdapter> Drop for SyncedGame<A> {
    fn drop(&mut self) {
        if let Err(e) = self.leave() {
            log::warn!("failed to leave game {}: {}", self.game_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::sim::PlayerId;

    /// Hub whose writes can be switched off
    struct FlakyHub {
        hub: LocalHub,
        down: Rc<Cell<bool>>,
    }

    impl SyncAdapter for FlakyHub {
        fn subscribe(
            &self,
            game_id: &GameId,
            local: &GameState,
            on_remote: RemoteCallback,
        ) -> Result<SubscriptionId, SyncError> {
            self.hub.subscribe(game_id, local, on_remote)
        }

        fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), SyncError> {
            self.hub.unsubscribe(subscription)
        }

        fn publish(&self, game_id: &GameId, state: &GameState) -> Result<(), SyncError> {
            if self.down.get() {
                return Err(SyncError::Unavailable("offline".into()));
            }
            self.hub.publish(game_id, state)
        }
    }

    #[test]
    fn test_host_ids_are_four_digits() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let id = GameId::host(&mut rng);
            let n: u32 = id.as_str().parse().unwrap();
            assert!(HOST_ID_RANGE.contains(&n));
        }
    }

    #[test]
    fn test_parse_game_id() {
        assert_eq!(GameId::parse("  4821 ").unwrap().as_str(), "4821");
        assert_eq!(GameId::parse("4821").unwrap().document_key(), "chain/4821");
        assert!(GameId::parse("   ").is_none());
    }

    #[test]
    fn test_subscribe_seeds_only_when_absent() {
        let hub = LocalHub::new();
        let id = GameId::parse("1234").unwrap();
        let first = GameState::new(9, 6, 2);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        hub.subscribe(&id, &first, Box::new(move |s| sink.borrow_mut().push(s)))
            .unwrap();
        assert_eq!(seen.borrow().len(), 1);

        let mut other = GameState::new(9, 6, 2);
        other.move_count = 7;
        let sink = seen.clone();
        hub.subscribe(&id, &other, Box::new(move |s| sink.borrow_mut().push(s)))
            .unwrap();

        // Second subscriber gets the existing document, not its own seed
        assert_eq!(seen.borrow()[1], first);
        let stored: GameState = serde_json::from_str(&hub.document(&id).unwrap()).unwrap();
        assert_eq!(stored, first);
    }

    #[test]
    fn test_publish_reaches_every_subscriber_of_the_key() {
        let hub = LocalHub::new();
        let a = GameId::parse("1111").unwrap();
        let b = GameId::parse("2222").unwrap();
        let state = GameState::new(9, 6, 2);
        let hits = Rc::new(RefCell::new(0));

        for id in [&a, &a, &b] {
            let hits = hits.clone();
            hub.subscribe(id, &state, Box::new(move |_| *hits.borrow_mut() += 1))
                .unwrap();
        }
        *hits.borrow_mut() = 0;

        let mut next = state.clone();
        next.current_player = PlayerId::new(2).unwrap();
        hub.publish(&a, &next).unwrap();
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let hub = LocalHub::new();
        let id = GameId::parse("5555").unwrap();
        let sub = hub
            .subscribe(&id, &GameState::new(3, 3, 2), Box::new(|_| {}))
            .unwrap();
        assert_eq!(hub.subscriber_count(), 1);
        hub.unsubscribe(sub).unwrap();
        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(
            hub.unsubscribe(sub),
            Err(SyncError::UnknownSubscription(_))
        ));
    }

    #[test]
    fn test_dropping_game_unsubscribes() {
        let hub = LocalHub::new();
        let mut rng = Pcg32::seed_from_u64(1);
        let game = SyncedGame::host(hub.clone(), Settings::default(), &mut rng).unwrap();
        assert_eq!(hub.subscriber_count(), 1);
        drop(game);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_failed_publish_rolls_back_move() {
        let hub = LocalHub::new();
        let down = Rc::new(Cell::new(false));
        let adapter = FlakyHub {
            hub: hub.clone(),
            down: down.clone(),
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let mut game = SyncedGame::host(adapter, Settings::default(), &mut rng).unwrap();
        let document = hub.document(game.game_id());

        down.set(true);
        assert!(matches!(
            game.submit_move(4, 2),
            Err(ChainError::Sync(SyncError::Unavailable(_)))
        ));
        assert_eq!(game.state(), &GameState::new(9, 6, 2));
        assert!(!game.orchestrator().is_busy());
        assert_eq!(hub.document(game.game_id()), document);

        down.set(false);
        assert!(game.submit_move(4, 2).unwrap());
        let stored: GameState = serde_json::from_str(&hub.document(game.game_id()).unwrap()).unwrap();
        assert_eq!(&stored, game.state());
        assert_eq!(stored.move_count, 1);
    }
}
