//! Line commands on stdin that play the part of the game.
//!
//! Without a game attached the engine's experience table is empty, so these
//! commands bring players online, change their totals and send the matching
//! [`ResourceEvent`] to the tick loop:
//!
//! ```text
//! join <player> [total]   online; total defaults to the last known one
//! leave <player>          offline, no event
//! set <player> <total>    experience changed
//! spend <player> <total>  experience spent, e.g. on an enchantment
//! die <player>            total drops to zero
//! respawn <player>
//! ```

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use xpbank_core::{MemoryExperience, ResourceEvent};
use xpbank_types::PlayerId;

/// A console line that could not be understood.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The first word is not a command.
    #[error("unknown command `{0}`")]
    Unknown(String),
    /// A required argument is absent.
    #[error("`{command}` needs {argument}")]
    Missing {
        /// The command being parsed.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
    },
    /// An argument did not parse.
    #[error("invalid {argument} `{value}`")]
    Invalid {
        /// What was expected.
        argument: &'static str,
        /// The text given.
        value: String,
    },
    /// Words left over after the command.
    #[error("unexpected `{0}`")]
    Trailing(String),
}

/// One parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Bring a player online.
    Join(PlayerId, Option<u64>),
    /// Take a player offline.
    Leave(PlayerId),
    /// Set a player's experience total.
    Set(PlayerId, u64),
    /// Lower a player's total by spending.
    Spend(PlayerId, u64),
    /// Player died.
    Die(PlayerId),
    /// Player respawned.
    Respawn(PlayerId),
}

impl HostCommand {
    /// Parse one line. Blank lines and `#` comments yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] describing the first problem in the line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let command = match verb.to_ascii_lowercase().as_str() {
            "join" => {
                let player = player_arg("join", words.next())?;
                let total = words.next().map(total_arg).transpose()?;
                Self::Join(player, total)
            }
            "leave" => Self::Leave(player_arg("leave", words.next())?),
            "set" => Self::Set(
                player_arg("set", words.next())?,
                total_arg(required("set", words.next())?)?,
            ),
            "spend" => Self::Spend(
                player_arg("spend", words.next())?,
                total_arg(required("spend", words.next())?)?,
            ),
            "die" => Self::Die(player_arg("die", words.next())?),
            "respawn" => Self::Respawn(player_arg("respawn", words.next())?),
            other => return Err(CommandError::Unknown(other.to_owned())),
        };

        if let Some(extra) = words.next() {
            return Err(CommandError::Trailing(extra.to_owned()));
        }
        Ok(Some(command))
    }

    /// Update the experience table and return the event the game would
    /// raise, if any.
    pub fn apply(self, host: &MemoryExperience) -> Option<ResourceEvent> {
        match self {
            Self::Join(player, total) => {
                let total = total.or_else(|| host.total(player)).unwrap_or(0);
                host.join(player, total);
                Some(ResourceEvent::Joined(player))
            }
            Self::Leave(player) => {
                host.leave(player);
                None
            }
            Self::Set(player, total) => {
                host.set_total(player, total);
                Some(ResourceEvent::ExperienceChanged(player))
            }
            Self::Spend(player, total) => {
                host.set_total(player, total);
                Some(ResourceEvent::ExperienceSpent(player))
            }
            Self::Die(player) => {
                host.set_total(player, 0);
                Some(ResourceEvent::Died(player))
            }
            Self::Respawn(player) => Some(ResourceEvent::Respawned(player)),
        }
    }
}

const fn required<'a>(command: &'static str, word: Option<&'a str>) -> Result<&'a str, CommandError> {
    match word {
        Some(word) => Ok(word),
        None => Err(CommandError::Missing {
            command,
            argument: "a total",
        }),
    }
}

fn player_arg(command: &'static str, word: Option<&str>) -> Result<PlayerId, CommandError> {
    let word = word.ok_or(CommandError::Missing {
        command,
        argument: "a player id",
    })?;
    word.parse().map_err(|_| CommandError::Invalid {
        argument: "player id",
        value: word.to_owned(),
    })
}

fn total_arg(word: &str) -> Result<u64, CommandError> {
    word.parse().map_err(|_| CommandError::Invalid {
        argument: "total",
        value: word.to_owned(),
    })
}

/// Read commands from `input` until it closes or the tick loop goes away.
///
/// Blocks; run it on its own thread.
pub fn feed<R: BufRead>(input: R, host: &MemoryExperience, events: &mpsc::Sender<ResourceEvent>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Console read failed");
                break;
            }
        };
        let command = match HostCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = %line, error = %e, "Ignoring console line");
                continue;
            }
        };
        debug!(?command, "Console command");
        if let Some(event) = command.apply(host) {
            if events.blocking_send(event).is_err() {
                break;
            }
        }
    }
    info!("Console input closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        let p = PlayerId::new();
        assert_eq!(HostCommand::parse(&format!("join {p}")).unwrap(), Some(HostCommand::Join(p, None)));
        assert_eq!(
            HostCommand::parse(&format!("JOIN {p} 250")).unwrap(),
            Some(HostCommand::Join(p, Some(250)))
        );
        assert_eq!(HostCommand::parse(&format!("leave {p}")).unwrap(), Some(HostCommand::Leave(p)));
        assert_eq!(HostCommand::parse(&format!("set {p} 9")).unwrap(), Some(HostCommand::Set(p, 9)));
        assert_eq!(HostCommand::parse(&format!("spend {p} 3")).unwrap(), Some(HostCommand::Spend(p, 3)));
        assert_eq!(HostCommand::parse(&format!("  die {p} ")).unwrap(), Some(HostCommand::Die(p)));
        assert_eq!(HostCommand::parse(&format!("respawn {p}")).unwrap(), Some(HostCommand::Respawn(p)));
        assert_eq!(HostCommand::parse("   ").unwrap(), None);
        assert_eq!(HostCommand::parse("# comment").unwrap(), None);
    }

    #[test]
    fn rejects_bad_lines() {
        let p = PlayerId::new();
        assert_eq!(HostCommand::parse("fly"), Err(CommandError::Unknown("fly".to_owned())));
        assert!(matches!(HostCommand::parse("join"), Err(CommandError::Missing { .. })));
        assert!(matches!(HostCommand::parse(&format!("set {p}")), Err(CommandError::Missing { .. })));
        assert!(matches!(HostCommand::parse("leave bob"), Err(CommandError::Invalid { .. })));
        assert!(matches!(HostCommand::parse(&format!("set {p} -1")), Err(CommandError::Invalid { .. })));
        assert_eq!(
            HostCommand::parse(&format!("die {p} now")),
            Err(CommandError::Trailing("now".to_owned()))
        );
    }

    #[test]
    fn rejoin_keeps_the_last_total() {
        let host = MemoryExperience::new();
        let p = PlayerId::new();
        assert_eq!(HostCommand::Join(p, Some(40)).apply(&host), Some(ResourceEvent::Joined(p)));
        assert_eq!(HostCommand::Leave(p).apply(&host), None);
        assert!(!host.is_online(p));

        HostCommand::Join(p, None).apply(&host);
        assert!(host.is_online(p));
        assert_eq!(host.total(p), Some(40));

        assert_eq!(HostCommand::Die(p).apply(&host), Some(ResourceEvent::Died(p)));
        assert_eq!(host.total(p), Some(0));
    }

    #[test]
    fn feed_turns_lines_into_events() {
        let host = MemoryExperience::new();
        let (tx, mut rx) = mpsc::channel(8);
        let p = PlayerId::new();
        let script = format!("join {p} 100\nnonsense\nset {p} 120\nleave {p}\n");

        feed(script.as_bytes(), &host, &tx);
        drop(tx);

        assert_eq!(rx.try_recv(), Ok(ResourceEvent::Joined(p)));
        assert_eq!(rx.try_recv(), Ok(ResourceEvent::ExperienceChanged(p)));
        assert!(rx.try_recv().is_err());
        assert_eq!(host.total(p), Some(120));
        assert!(!host.is_online(p));
    }
}
