use std::{path::PathBuf, process};

use clap::Parser;
use orbat::{
    Registry, Uic,
    storage::{Loaded, unit_path},
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about a unit")]
pub struct Show {
    /// The UIC of the unit to display
    #[clap(value_parser = super::parse_uic)]
    uic: Uic,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,

    /// Include the notes body in output
    #[arg(long)]
    with_notes: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let registry = Registry::new(root).load_all()?;

        if registry.forest().find(&self.uic).is_none() {
            eprintln!("Unit {} not found", self.uic);
            process::exit(1);
        }

        match self.output {
            OutputFormat::Pretty => self.output_pretty(&registry),
            OutputFormat::Json => self.output_json(&registry)?,
        }

        Ok(())
    }

    fn output_pretty(&self, registry: &Registry<Loaded>) {
        let forest = registry.forest();
        let Some(unit) = forest.find(&self.uic) else {
            return;
        };

        // Header
        println!("# {}", unit.uic());
        println!("{}\n", unit.name());

        // Metadata
        println!("{}", "Metadata".dim());
        println!("  Echelon:   {}", unit.echelon().name());
        if let Some(level) = forest.level_of(&self.uic) {
            println!("  Level:     {level}");
        }
        println!("  Created:   {}", unit.created());
        println!("  As-of:     {}", unit.as_of());
        println!(
            "  Path:      {}",
            unit_path(registry.root(), &self.uic).display()
        );

        // Higher headquarters, nearest first
        if let Some(chain) = forest.ancestors_of(&self.uic)
            .filter(|chain| !chain.is_empty())
        {
            println!("\n{}", "Higher headquarters".dim());
            for ancestor in &chain {
                let name = forest.find(ancestor).map_or("?", |u| u.name());
                println!("  • {ancestor} {name}");
            }
        }

        // Immediate subordinates, with their own subtree sizes
        if let Some(children) = forest.children_of(&self.uic).filter(|c| !c.is_empty()) {
            println!("\n{}", "Subordinates".dim());
            for child in &children {
                let name = forest.find(child).map_or("?", |u| u.name());
                let subtree = forest
                    .descendants_of(child, false)
                    .map_or(0, |d| d.len());
                if subtree == 0 {
                    println!("  • {child} {name}");
                } else {
                    println!(
                        "  • {child} {name} {}",
                        format!("(+{subtree} below)").dim()
                    );
                }
            }
        }

        // Notes
        if self.with_notes && !unit.notes().is_empty() {
            println!("\n{}", "Notes".dim());
            println!("{}", unit.notes());
        }
    }

    fn output_json(&self, registry: &Registry<Loaded>) -> anyhow::Result<()> {
        use serde_json::json;

        let forest = registry.forest();
        let Some(unit) = forest.find(&self.uic) else {
            return Ok(());
        };

        let output = json!({
            "uic": unit.uic().as_str(),
            "name": unit.name(),
            "echelon": unit.echelon().code(),
            "level": forest.level_of(&self.uic),
            "parent": unit.parent().map(Uic::as_str),
            "ancestors": forest.ancestors_of(&self.uic).unwrap_or_default(),
            "children": forest.children_of(&self.uic).unwrap_or_default(),
            "subordinates": forest.descendants_of(&self.uic, false).map_or(0, |d| d.len()),
            "created": unit.created().to_rfc3339(),
            "as_of": unit.as_of(),
            "path": unit_path(registry.root(), &self.uic),
            "notes": self.with_notes.then(|| unit.notes()),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
