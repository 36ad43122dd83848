use std::path::PathBuf;

mod list;
mod r#move;
mod show;
mod status;
mod terminal;
mod validate;

use clap::ArgAction;
use list::List;
use orbat::{Echelon, Registry, Uic, storage::META_DIR};
use r#move::Move;
use show::Show;
use status::Status;
use tracing::instrument;
use validate::Validate;

/// Parse a UIC from a string, normalizing to uppercase.
///
/// This is a CLI boundary function that accepts lowercase input
/// and normalizes it before parsing.
fn parse_uic(s: &str) -> Result<Uic, String> {
    Uic::new(s.to_uppercase()).map_err(|e| format!("{e}"))
}

/// Parse an echelon code from a string, normalizing to uppercase.
fn parse_echelon(s: &str) -> Result<Echelon, String> {
    s.to_uppercase().parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the unit registry
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show registry status (default)
    Status(Status),

    /// Initialize a new unit registry
    Init,

    /// Add a new unit
    Add(Add),

    /// Move a unit under a new higher headquarters
    ///
    /// The unit's whole subtree moves with it; every affected ancestor
    /// chain is updated and rewritten.
    Move(Move),

    /// List units with filters and hierarchy views
    List(List),

    /// Show detailed information about a unit
    Show(Show),

    /// Validate hierarchy health
    Validate(Validate),

    /// Recompute every hierarchy closure from the unit files
    Rebuild,
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Add(command) => command.run(root)?,
            Self::Move(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Validate(command) => command.run(root)?,
            Self::Rebuild => Rebuild::run(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &PathBuf) -> anyhow::Result<()> {
        let meta_dir = root.join(META_DIR);
        if meta_dir.exists() {
            anyhow::bail!("Registry already initialized (found existing {META_DIR} directory)");
        }

        Registry::init(root)
            .map_err(|e| anyhow::anyhow!("Failed to initialize registry: {e}"))?;

        println!("Initialized unit registry in {}", root.display());
        println!("  Created: {META_DIR}/config.toml");
        println!();
        println!("Next steps:");
        println!("  orbat add WABC01 --name \"1st Battalion\" --echelon BN");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// The UIC of the new unit. Omit with --task-force to generate one.
    #[clap(value_parser = parse_uic)]
    uic: Option<Uic>,

    /// Generate the next free task-force UIC instead of supplying one.
    #[arg(long, conflicts_with = "uic")]
    task_force: bool,

    /// The display name of the unit.
    #[clap(long, short)]
    name: String,

    /// The echelon code (TM, SQD, SEC, PLT, DET, CO, BN, BDE, DIV, CORPS,
    /// ARMY, TF, UNK). Ignored with --task-force.
    #[clap(long, short, value_parser = parse_echelon, default_value = "UNK")]
    echelon: Echelon,

    /// The UIC of the parent unit.
    #[clap(long, short, value_parser = parse_uic)]
    parent: Option<Uic>,

    /// Free-form notes stored in the unit file body.
    #[clap(long)]
    notes: Option<String>,
}

impl Add {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut registry = Registry::new(root).load_all()?;
        let notes = self.notes.unwrap_or_default();

        let unit = if self.task_force {
            registry.add_task_force(self.name, self.parent, notes)?
        } else {
            let uic = self
                .uic
                .ok_or_else(|| anyhow::anyhow!("supply a UIC, or --task-force to generate one"))?;
            registry.add_unit(uic, self.name, self.echelon, self.parent, notes)?
        };

        println!("Added unit {} (as-of {})", unit.uic(), unit.as_of());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Rebuild {}

impl Rebuild {
    #[instrument]
    fn run(root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut registry = Registry::new(root).load_all()?;
        let outcome = registry.rebuild()?;

        if outcome.changed.is_empty() {
            println!("{}", "✅ Closures already consistent.".success());
        } else {
            println!(
                "{}",
                format!("✅ Recomputed closures for {} units", outcome.changed.len()).success()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn add_run_creates_unit_under_parent() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let mut registry = Registry::new(root.clone()).load_all().unwrap();
        registry
            .add_unit(
                parse_uic("wbde01").unwrap(),
                "1st Brigade".to_string(),
                Echelon::Brigade,
                None,
                String::new(),
            )
            .unwrap();

        let add = Add {
            uic: Some(parse_uic("wbn001").unwrap()),
            task_force: false,
            name: "1st Battalion".to_string(),
            echelon: Echelon::Battalion,
            parent: Some(parse_uic("wbde01").unwrap()),
            notes: None,
        };

        add.run(root.clone()).expect("add command should succeed");

        let registry = Registry::new(root).load_all().unwrap();
        let unit = registry
            .forest()
            .find(&parse_uic("WBN001").unwrap())
            .expect("unit should exist after add");
        assert_eq!(unit.name(), "1st Battalion");
        assert_eq!(unit.parent(), Some(&parse_uic("WBDE01").unwrap()));
    }

    #[test]
    fn add_run_requires_uic_or_task_force() {
        let tmp = tempdir().unwrap();

        let add = Add {
            uic: None,
            task_force: false,
            name: "Nameless".to_string(),
            echelon: Echelon::Unknown,
            parent: None,
            notes: None,
        };

        assert!(add.run(tmp.path().to_path_buf()).is_err());
    }

    #[test]
    fn add_run_generates_task_force_uic() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let add = Add {
            uic: None,
            task_force: true,
            name: "TF Anvil".to_string(),
            echelon: Echelon::Unknown,
            parent: None,
            notes: None,
        };

        add.run(root.clone()).expect("add command should succeed");

        let registry = Registry::new(root).load_all().unwrap();
        let unit = registry
            .forest()
            .find(&parse_uic("TF0001").unwrap())
            .expect("generated task force should exist");
        assert_eq!(unit.echelon(), Echelon::TaskForce);
    }

    #[test]
    fn move_run_reparents_subtree() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let mut registry = Registry::new(root.clone()).load_all().unwrap();
        for (uic, echelon, parent) in [
            ("WBDE01", Echelon::Brigade, None),
            ("WBDE02", Echelon::Brigade, None),
            ("WBN001", Echelon::Battalion, Some("WBDE01")),
            ("WCO001", Echelon::Company, Some("WBN001")),
        ] {
            registry
                .add_unit(
                    parse_uic(uic).unwrap(),
                    uic.to_string(),
                    echelon,
                    parent.map(|p| parse_uic(p).unwrap()),
                    String::new(),
                )
                .unwrap();
        }

        let cmd = Move {
            uic: parse_uic("WBN001").unwrap(),
            parent: Some(parse_uic("WBDE02").unwrap()),
            detach: false,
            expect_as_of: None,
            yes: true,
        };

        cmd.run(root.clone()).expect("move command should succeed");

        let registry = Registry::new(root).load_all().unwrap();
        let forest = registry.forest();
        assert_eq!(
            forest.ancestors_of(&parse_uic("WCO001").unwrap()).unwrap(),
            vec![parse_uic("WBN001").unwrap(), parse_uic("WBDE02").unwrap()]
        );
    }

    #[test]
    fn move_run_requires_parent_or_detach() {
        let tmp = tempdir().unwrap();

        let cmd = Move {
            uic: parse_uic("WBN001").unwrap(),
            parent: None,
            detach: false,
            expect_as_of: None,
            yes: true,
        };

        assert!(cmd.run(tmp.path().to_path_buf()).is_err());
    }

    #[test]
    fn init_run_refuses_second_initialization() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Init::run(&root).expect("first init should succeed");
        assert!(root.join(META_DIR).join("config.toml").exists());
        assert!(Init::run(&root).is_err());
    }

    #[test]
    fn rebuild_run_succeeds_on_consistent_registry() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let mut registry = Registry::new(root.clone()).load_all().unwrap();
        registry
            .add_unit(
                parse_uic("WBDE01").unwrap(),
                "1st Brigade".to_string(),
                Echelon::Brigade,
                None,
                String::new(),
            )
            .unwrap();

        Rebuild::run(root).expect("rebuild should succeed");
    }

    #[test]
    fn status_run_reports_counts_without_exit() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let mut registry = Registry::new(root.clone()).load_all().unwrap();
        registry
            .add_unit(
                parse_uic("WBDE01").unwrap(),
                "1st Brigade".to_string(),
                Echelon::Brigade,
                None,
                String::new(),
            )
            .unwrap();
        registry
            .add_unit(
                parse_uic("WBN001").unwrap(),
                "1st Battalion".to_string(),
                Echelon::Battalion,
                Some(parse_uic("WBDE01").unwrap()),
                String::new(),
            )
            .unwrap();

        Status::default()
            .run(root)
            .expect("status should succeed on a healthy registry");
    }

    #[test]
    fn parse_uic_normalizes_case() {
        assert_eq!(parse_uic("wbn001").unwrap().as_str(), "WBN001");
        assert!(parse_uic("").is_err());
    }

    #[test]
    fn parse_echelon_accepts_codes_case_insensitively() {
        assert_eq!(parse_echelon("bn").unwrap(), Echelon::Battalion);
        assert!(parse_echelon("battalion-ish").is_err());
    }
}
