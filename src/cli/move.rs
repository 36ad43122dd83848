use std::path::PathBuf;

use clap::Parser;
use orbat::{Registry, Uic};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Move a unit under a new higher headquarters")]
pub struct Move {
    /// The UIC of the unit to move
    #[clap(value_parser = super::parse_uic)]
    pub(super) uic: Uic,

    /// The UIC of the new parent unit (omit with --detach)
    #[clap(value_parser = super::parse_uic)]
    pub(super) parent: Option<Uic>,

    /// Detach the unit, making it a root
    #[arg(long, conflicts_with = "parent")]
    pub(super) detach: bool,

    /// Reject the move if the unit has been updated since this as-of stamp
    /// was read
    #[arg(long, value_name = "STAMP")]
    pub(super) expect_as_of: Option<u64>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub(super) yes: bool,
}

impl Move {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        if self.parent.is_none() && !self.detach {
            anyhow::bail!("specify a new parent UIC, or --detach to make the unit a root");
        }

        let mut registry = Registry::new(root).load_all()?;

        let subtree_size = registry
            .forest()
            .descendants_of(&self.uic, false)
            .map_or(0, |descendants| descendants.len());

        if !self.yes {
            let destination = self.parent.as_ref().map_or_else(
                || "the root level".to_string(),
                |parent| format!("{parent}"),
            );
            if subtree_size == 0 {
                println!("Will move {} under {destination}", self.uic);
            } else {
                println!(
                    "Will move {} and its {subtree_size} subordinates under {destination}",
                    self.uic
                );
            }

            eprint!("\nProceed? (y/N) ");
            use std::io::{self, BufRead};
            let stdin = io::stdin();
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            if !line.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        let outcome = registry.reparent_unit(&self.uic, self.parent.as_ref(), self.expect_as_of)?;

        if outcome.is_noop() {
            println!(
                "{}",
                format!("{} is already in place; nothing to do", self.uic).dim()
            );
            return Ok(());
        }

        let destination = outcome.new_parent.as_ref().map_or_else(
            || "the root level".to_string(),
            |parent| format!("{parent}"),
        );
        println!(
            "{}",
            format!(
                "✅ Moved {} under {destination} ({} units updated, as-of {})",
                outcome.uic,
                outcome.touched.len(),
                outcome.as_of
            )
            .success()
        );
        Ok(())
    }
}
