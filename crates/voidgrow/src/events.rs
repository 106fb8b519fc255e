//! # VOIDGROW Event Bus
//!
//! Carries expansion notifications off the world thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  BusHooks  ┌─────────────┐      ┌──────────────┐
//! │ World Thread │───────────>│   Event     │─────>│ Chat / Mobs  │
//! │  (manager)   │            │   Channel   │      │  / Network   │
//! └──────────────┘            └─────────────┘      └──────────────┘
//! ```
//!
//! Publishing never blocks the world thread: a full channel drops the
//! event and counts it.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use voidgrow_core::{CategoryId, TierId, TileCoord};
use voidgrow_expansion::{ExpansionEvent, ExpansionHooks, OriginMarker, Requester, RequesterNotice};
use voidgrow_rules::MobSpawnRule;

/// Everything the engine tells the outside world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// Broadcast to every player.
    Expansion(ExpansionEvent),
    /// Addressed to one requester.
    Notice {
        /// Recipient.
        requester: Requester,
        /// Message.
        notice: RequesterNotice,
    },
    /// A request's origin marker should be removed from the world.
    MarkerConsumed(OriginMarker),
    /// A freshly revealed tile should be populated.
    MobsSeeded {
        /// Revealed tile.
        tile: TileCoord,
        /// Its category.
        category: CategoryId,
        /// Request tier.
        tier: TierId,
        /// Spawn table to draw from.
        spawns: Vec<MobSpawnRule>,
    },
}

/// Bounded channel pair for `WorldEvent`s.
pub struct EventBus {
    sender: Sender<WorldEvent>,
    receiver: Receiver<WorldEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Hooks that publish onto this bus.
    #[must_use]
    pub fn hooks(&self) -> BusHooks {
        BusHooks {
            sender: self.sender.clone(),
            dropped: 0,
        }
    }

    /// A consumer handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// `ExpansionHooks` implementation backed by an `EventBus`.
pub struct BusHooks {
    sender: Sender<WorldEvent>,
    dropped: u64,
}

impl BusHooks {
    /// Events lost to a full or closed channel.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn publish(&mut self, event: WorldEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped += 1;
                tracing::warn!("Event bus full; dropped {event:?}");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}

impl ExpansionHooks for BusHooks {
    fn broadcast(&mut self, event: ExpansionEvent) {
        self.publish(WorldEvent::Expansion(event));
    }

    fn notify_requester(&mut self, requester: &Requester, notice: RequesterNotice) {
        self.publish(WorldEvent::Notice {
            requester: requester.clone(),
            notice,
        });
    }

    fn consume_origin_marker(&mut self, marker: &OriginMarker) {
        self.publish(WorldEvent::MarkerConsumed(marker.clone()));
    }

    fn seed_mobs(&mut self, tile: TileCoord, category: &CategoryId, tier: &TierId, spawns: &[MobSpawnRule]) {
        self.publish(WorldEvent::MobsSeeded {
            tile,
            category: category.clone(),
            tier: tier.clone(),
            spawns: spawns.to_vec(),
        });
    }
}

/// Consumer side of an `EventBus`.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<WorldEvent>,
}

impl EventReceiver {
    /// Takes every pending event (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<WorldEvent> {
        self.receiver.try_iter().collect()
    }

    /// Takes one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<WorldEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}
