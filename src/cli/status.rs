use std::{collections::BTreeMap, path::PathBuf, process};

use clap::Parser;
use orbat::{Registry, domain::ClosureIssue};
use tracing::instrument;

use super::terminal::{Colorize, is_narrow};

#[derive(Debug, Parser, Default)]
#[command(about = "Show unit counts and hierarchy health")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let registry = Registry::new(root).load_all()?;
        let forest = registry.forest();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for unit in forest.iter() {
            *counts.entry(unit.echelon().code().to_string()).or_insert(0) += 1;
        }

        let total: usize = counts.values().sum();
        let root_count = forest.roots().count();

        let issues = forest.verify_closure();
        let cycle_count = issues
            .iter()
            .filter(|issue| matches!(issue, ClosureIssue::Cycle { .. }))
            .count();
        let stale_count = issues.len() - cycle_count;

        if total == 0 {
            println!("No units found yet. Create one with 'orbat add'.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => {
                Self::output_json(&counts, total, root_count, stale_count, cycle_count)?;
            }
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(total, root_count, stale_count, cycle_count);
                } else {
                    Self::output_table(&counts, total, root_count, stale_count, &issues);
                }
            }
        }

        // Exit with a non-zero code when the hierarchy needs attention.
        let mut exit_code = 0;
        if cycle_count > 0 {
            exit_code = exit_code.max(3);
        }
        if stale_count > 0 {
            exit_code = exit_code.max(2);
        }

        if exit_code != 0 {
            process::exit(exit_code);
        }

        Ok(())
    }

    fn output_json(
        counts: &BTreeMap<String, usize>,
        total: usize,
        root_count: usize,
        stale_count: usize,
        cycle_count: usize,
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let echelons: Vec<_> = counts
            .iter()
            .map(|(echelon, count)| {
                json!({
                    "echelon": echelon,
                    "count": count,
                })
            })
            .collect();

        let output = json!({
            "echelons": echelons,
            "total": total,
            "roots": root_count,
            "stale_closures": stale_count,
            "cycles": cycle_count,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(total: usize, root_count: usize, stale_count: usize, cycle_count: usize) {
        println!("total={total} roots={root_count} stale={stale_count} cycles={cycle_count}");
    }

    fn output_table(
        counts: &BTreeMap<String, usize>,
        total: usize,
        root_count: usize,
        stale_count: usize,
        issues: &[ClosureIssue],
    ) {
        const MAX_ISSUE_DISPLAY: usize = 5;
        let narrow = is_narrow();

        println!("Unit counts");
        println!("{}", "──────────────".dim());

        if narrow {
            // Stacked output for narrow terminals
            for (echelon, count) in counts {
                println!("{echelon}: {count}");
            }
            println!("Total: {total}");
        } else {
            // Table layout
            println!("{:<10} {:<6}", "Echelon", "Count");
            for (echelon, count) in counts {
                println!("{echelon:<10} {count:<6}");
            }
            println!("Total      {total}");
        }

        println!();
        println!("Roots: {root_count}");

        println!();

        if issues.is_empty() {
            println!("Closure issues: {} ✅", "0".success());
        } else {
            println!(
                "Closure issues: {} ⚠️",
                issues.len().to_string().warning()
            );
            for issue in issues.iter().take(MAX_ISSUE_DISPLAY) {
                println!("  - {issue}");
            }
            if issues.len() > MAX_ISSUE_DISPLAY {
                println!("  - ... and {} more issues", issues.len() - MAX_ISSUE_DISPLAY);
            }
            let hint = if stale_count > 0 {
                "Run 'orbat rebuild' to recompute closures."
            } else {
                "Resolve cycles to restore a valid hierarchy."
            };
            println!("{}", hint.dim());
        }
    }
}
