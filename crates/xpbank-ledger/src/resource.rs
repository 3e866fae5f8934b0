//! The host engine's experience value, as seen by the ledger.
//!
//! The ledger never owns live player state. It reads and writes the point
//! total through [`ExperienceSource`], which the embedding host implements.
//! Calls only happen once the host's own mutation for the triggering event
//! has settled (see the reconciler in `xpbank-core`).

use xpbank_types::PlayerId;

use crate::conversion::{level_progress_from_total, total_from_level_progress, LevelProgress};

/// Read/write access to a player's cumulative experience total.
pub trait ExperienceSource: Send + Sync {
    /// Current point total, or `None` if the player is not reachable.
    fn read_total(&self, player: PlayerId) -> Option<u64>;

    /// Overwrite the point total. A no-op when the player is not reachable.
    fn write_total(&self, player: PlayerId, total: u64);
}

/// A host that exposes experience as a level plus in-level progress.
pub trait LevelHost: Send + Sync {
    /// Current level and progress, or `None` if the player is not reachable.
    fn level_progress(&self, player: PlayerId) -> Option<LevelProgress>;

    /// Replace the player's level and progress.
    fn set_level_progress(&self, player: PlayerId, value: LevelProgress);
}

/// Adapts a [`LevelHost`] into an [`ExperienceSource`] using the level curve.
#[derive(Debug, Clone, Default)]
pub struct LevelledExperience<H> {
    host: H,
}

impl<H> LevelledExperience<H> {
    /// Wrap a level-speaking host.
    pub const fn new(host: H) -> Self {
        Self { host }
    }

    /// The wrapped host.
    pub const fn host(&self) -> &H {
        &self.host
    }
}

impl<H: LevelHost> ExperienceSource for LevelledExperience<H> {
    fn read_total(&self, player: PlayerId) -> Option<u64> {
        self.host
            .level_progress(player)
            .map(|lp| total_from_level_progress(lp.level, lp.progress))
    }

    fn write_total(&self, player: PlayerId, total: u64) {
        self.host
            .set_level_progress(player, level_progress_from_total(total));
    }
}

/// An experience source with no reachable players.
///
/// Used for offline tooling (ledger migration, inspection) and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl ExperienceSource for Detached {
    fn read_total(&self, _player: PlayerId) -> Option<u64> {
        None
    }

    fn write_total(&self, _player: PlayerId, _total: u64) {}
}
