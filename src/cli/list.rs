use std::{collections::BTreeSet, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use orbat::{Echelon, Forest, Registry, Uic};
use regex::Regex;
use tracing::instrument;

use super::terminal::Colorize;

/// Command arguments for `orbat list`.
#[derive(Debug, Parser)]
#[command(about = "List units with filters and hierarchy views")]
pub struct List {
    /// UICs whose subordinate hierarchies to list (default: the whole
    /// forest).
    #[arg(value_parser = super::parse_uic)]
    targets: Vec<Uic>,

    /// Render an indented hierarchy instead of a flat table.
    #[arg(long)]
    tree: bool,

    /// Filter by echelon code (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',', value_name = "ECH", value_parser = super::parse_echelon)]
    echelon: Vec<Echelon>,

    /// Show only units one level below each target.
    #[arg(long, conflicts_with = "depth")]
    children: bool,

    /// Depth limit below each target (unlimited if omitted).
    #[arg(long, value_name = "N")]
    depth: Option<usize>,

    /// Show only root units.
    #[arg(long)]
    roots: bool,

    /// Case-insensitive substring match against unit names.
    #[arg(long, conflicts_with = "regex")]
    contains: Option<String>,

    /// Regular expression match against unit names.
    #[arg(long)]
    regex: Option<String>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,

    /// Limit number of rows returned.
    #[arg(long)]
    limit: Option<usize>,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let registry = Registry::new(root).load_all()?;
        let forest = registry.forest();

        let depth = if self.children { Some(1) } else { self.depth };

        // Candidate set: the targets' subordinate hierarchies, or everything.
        let mut candidates: BTreeSet<Uic> = BTreeSet::new();
        if self.targets.is_empty() {
            candidates.extend(forest.iter().filter_map(|unit| {
                let level = forest.level_of(unit.uic())?;
                depth
                    .is_none_or(|d| level <= d)
                    .then(|| unit.uic().clone())
            }));
        } else {
            for target in &self.targets {
                let subtree = forest
                    .subordinate_hierarchy(target, !self.children, depth)
                    .with_context(|| format!("unit {target} not found"))?;
                candidates.extend(subtree);
            }
        }

        let regex = self
            .regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| {
                format!("invalid regex: {}", self.regex.as_deref().unwrap_or_default())
            })?;

        let selected: Vec<Uic> = candidates
            .into_iter()
            .filter(|uic| self.matches(forest, uic, regex.as_ref()))
            .collect();

        if selected.is_empty() {
            if !self.quiet {
                println!("No units matched.");
            }
            return Ok(());
        }

        let limited: Vec<Uic> = selected
            .iter()
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        match self.output {
            OutputFormat::Json => Self::output_json(forest, &limited)?,
            OutputFormat::Table => {
                if self.tree {
                    self.output_tree(forest, &limited);
                } else {
                    self.output_table(forest, &limited);
                }
            }
        }

        Ok(())
    }

    /// Applies the row filters to a single unit.
    fn matches(&self, forest: &Forest, uic: &Uic, regex: Option<&Regex>) -> bool {
        let Some(unit) = forest.find(uic) else {
            return false;
        };

        if self.roots && unit.parent().is_some() {
            return false;
        }

        if !self.echelon.is_empty() && !self.echelon.contains(&unit.echelon()) {
            return false;
        }

        if let Some(needle) = &self.contains {
            let haystack = unit.name().to_lowercase();
            if !haystack.contains(&needle.to_lowercase()) {
                return false;
            }
        }

        if regex.is_some_and(|regex| !regex.is_match(unit.name())) {
            return false;
        }

        true
    }

    fn output_table(&self, forest: &Forest, selected: &[Uic]) {
        if !self.quiet {
            println!(
                "{:<10} {:<6} {:<5} {:<10} Name",
                "UIC", "Ech", "Lvl", "Parent"
            );
        }
        for uic in selected {
            let Some(unit) = forest.find(uic) else {
                continue;
            };
            let level = forest.level_of(uic).unwrap_or_default();
            let parent = unit.parent().map_or_else(
                || "–".to_string(),
                |parent| parent.as_str().to_string(),
            );
            println!(
                "{:<10} {:<6} {:<5} {:<10} {}",
                uic.as_str(),
                unit.echelon().code(),
                level,
                parent,
                unit.name()
            );
        }
    }

    /// Renders the selection as an indented hierarchy.
    ///
    /// Units whose ancestors were filtered out are indented relative to their
    /// nearest selected ancestor, so a pruned selection still reads as a
    /// forest.
    fn output_tree(&self, forest: &Forest, selected: &[Uic]) {
        let in_selection: BTreeSet<&Uic> = selected.iter().collect();

        // Roots of the rendered forest: selected units with no selected
        // ancestor.
        let tops: Vec<&Uic> = selected
            .iter()
            .filter(|uic| {
                forest
                    .ancestors_of(uic)
                    .is_none_or(|chain| !chain.iter().any(|a| in_selection.contains(a)))
            })
            .collect();

        for top in tops {
            Self::render_subtree(forest, top, &in_selection, 0);
        }
        if !self.quiet {
            println!();
            println!("{}", format!("{} units", selected.len()).dim());
        }
    }

    fn render_subtree(forest: &Forest, uic: &Uic, in_selection: &BTreeSet<&Uic>, indent: usize) {
        if let Some(unit) = forest.find(uic) {
            println!(
                "{}{} {} {}",
                "  ".repeat(indent),
                uic.as_str(),
                unit.name(),
                format!("[{}]", unit.echelon().code()).dim()
            );
        }
        if let Some(children) = forest.children_of(uic) {
            for child in &children {
                if in_selection.contains(child) {
                    Self::render_subtree(forest, child, in_selection, indent + 1);
                }
            }
        }
    }

    fn output_json(forest: &Forest, selected: &[Uic]) -> anyhow::Result<()> {
        use serde_json::json;

        let rows: Vec<_> = selected
            .iter()
            .filter_map(|uic| {
                let unit = forest.find(uic)?;
                Some(json!({
                    "uic": uic.as_str(),
                    "name": unit.name(),
                    "echelon": unit.echelon().code(),
                    "level": forest.level_of(uic),
                    "parent": unit.parent().map(Uic::as_str),
                    "as_of": unit.as_of(),
                }))
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&rows)?);
        Ok(())
    }
}
