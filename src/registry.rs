//! Command unit registry.
//!
//! All command units are declared statically in `commands::all()`. Before
//! registration each unit is validated; malformed units are skipped with a
//! warning instead of poisoning the whole registration.

use crate::types::{Data, Error};
use tracing::{info, warn};

/// Validate command units and drop the malformed ones.
///
/// A unit must carry a name and at least one invocable action, either its
/// own slash action or subcommands.
pub fn validated_commands(
    commands: Vec<poise::Command<Data, Error>>,
) -> Vec<poise::Command<Data, Error>> {
    let total = commands.len();
    let valid: Vec<_> = commands
        .into_iter()
        .filter(|command| {
            if command.name.is_empty() {
                warn!("skipping command unit without a name");
                return false;
            }
            if command.slash_action.is_none() && command.subcommands.is_empty() {
                warn!(command = %command.name, "skipping command unit without an action");
                return false;
            }
            true
        })
        .collect();

    if valid.len() < total {
        warn!(
            skipped = total - valid.len(),
            registered = valid.len(),
            "some command units were rejected"
        );
    } else {
        info!(count = valid.len(), "command units validated");
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_units_are_skipped() {
        // A default unit has neither name nor action
        let commands = vec![poise::Command::<Data, Error>::default()];
        assert!(validated_commands(commands).is_empty());
    }

    #[test]
    fn test_declared_units_all_pass() {
        let declared = crate::commands::all();
        let total = declared.len();
        assert!(total > 0);
        assert_eq!(validated_commands(declared).len(), total);
    }
}
