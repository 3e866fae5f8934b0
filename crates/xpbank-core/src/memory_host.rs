//! An in-process experience table.
//!
//! [`MemoryExperience`] stands in for a game server: players join with some
//! experience, the "game" changes it, and players leave. While a player is
//! offline the ledger can neither read nor write their experience.

use std::collections::BTreeMap;
use std::sync::Mutex;

use xpbank_ledger::ExperienceSource;
use xpbank_types::PlayerId;

#[derive(Debug, Clone, Copy)]
struct Slot {
    total: u64,
    online: bool,
}

/// Experience totals keyed by player, with online/offline state.
#[derive(Debug, Default)]
pub struct MemoryExperience {
    players: Mutex<BTreeMap<PlayerId, Slot>>,
}

impl MemoryExperience {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_players<R>(&self, f: impl FnOnce(&mut BTreeMap<PlayerId, Slot>) -> R) -> Option<R> {
        match self.players.lock() {
            Ok(mut players) => Some(f(&mut players)),
            Err(_) => {
                tracing::error!("Experience table lock poisoned");
                None
            }
        }
    }

    /// Bring a player online with `total` points.
    pub fn join(&self, player: PlayerId, total: u64) {
        self.with_players(|players| {
            players.insert(player, Slot { total, online: true });
        });
    }

    /// Take a player offline. Their last total is remembered.
    pub fn leave(&self, player: PlayerId) {
        self.with_players(|players| {
            if let Some(slot) = players.get_mut(&player) {
                slot.online = false;
            }
        });
    }

    /// Change a player's total as the game would, online or not.
    pub fn set_total(&self, player: PlayerId, total: u64) {
        self.with_players(|players| {
            players
                .entry(player)
                .and_modify(|slot| slot.total = total)
                .or_insert(Slot { total, online: false });
        });
    }

    /// A player's last known total, regardless of online state.
    pub fn total(&self, player: PlayerId) -> Option<u64> {
        self.with_players(|players| players.get(&player).map(|slot| slot.total))
            .flatten()
    }

    /// Whether the player is online.
    pub fn is_online(&self, player: PlayerId) -> bool {
        self.with_players(|players| players.get(&player).is_some_and(|slot| slot.online))
            .unwrap_or(false)
    }

    /// Number of online players.
    pub fn online_count(&self) -> usize {
        self.with_players(|players| players.values().filter(|slot| slot.online).count())
            .unwrap_or(0)
    }
}

impl ExperienceSource for MemoryExperience {
    fn read_total(&self, player: PlayerId) -> Option<u64> {
        self.with_players(|players| {
            players
                .get(&player)
                .filter(|slot| slot.online)
                .map(|slot| slot.total)
        })
        .flatten()
    }

    fn write_total(&self, player: PlayerId, total: u64) {
        self.with_players(|players| {
            if let Some(slot) = players.get_mut(&player).filter(|slot| slot.online) {
                slot.total = total;
            }
        });
    }
}
