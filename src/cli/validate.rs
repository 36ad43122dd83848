use std::path::PathBuf;

use clap::Parser;
use orbat::{
    Registry,
    domain::{ClosureIssue, EchelonViolation},
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Validate hierarchy health across multiple dimensions")]
pub struct Validate {
    /// Types of checks to run (can be specified multiple times)
    #[arg(long, value_name = "TYPE")]
    check: Vec<CheckType>,

    /// Repair stale closure caches by running a full rebuild
    #[arg(long)]
    fix: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
enum CheckType {
    /// Check cached closures against the parent pointers
    Closure,
    /// Check for cycles in the parent relation
    Cycles,
    /// Check children sit at a lower echelon than their parents
    Echelon,
    /// Run all checks
    All,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

#[derive(Debug, Default)]
struct ValidationResult {
    closure_issues: Vec<ClosureIssue>,
    cycle_detected: bool,
    echelon_violations: Vec<EchelonViolation>,
    /// Echelon violations are errors only when the config enforces the
    /// ordering; otherwise they are advisory.
    echelon_enforced: bool,
}

impl ValidationResult {
    fn error_count(&self) -> usize {
        let mut count = self.closure_issues.len() + usize::from(self.cycle_detected);
        if self.echelon_enforced {
            count += self.echelon_violations.len();
        }
        count
    }

    fn warning_count(&self) -> usize {
        if self.echelon_enforced {
            0
        } else {
            self.echelon_violations.len()
        }
    }
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut registry = Registry::new(root).load_all()?;
        let forest = registry.forest();

        let checks = if self.check.is_empty() || self.check.contains(&CheckType::All) {
            vec![CheckType::Closure, CheckType::Cycles, CheckType::Echelon]
        } else {
            self.check.clone()
        };

        let mut result = ValidationResult {
            echelon_enforced: registry.config().enforce_echelon_order,
            ..ValidationResult::default()
        };

        for check in &checks {
            match check {
                CheckType::Closure => result.closure_issues = forest.verify_closure(),
                CheckType::Cycles => result.cycle_detected = !forest.is_acyclic(),
                CheckType::Echelon => result.echelon_violations = forest.echelon_violations(),
                CheckType::All => unreachable!("All should have been expanded"),
            }
        }

        match self.output {
            OutputFormat::Table => self.output_table(&result),
            OutputFormat::Json => Self::output_json(&result)?,
            OutputFormat::Summary => self.output_summary(&result),
        }

        if self.fix && !result.closure_issues.is_empty() {
            let outcome = registry.rebuild()?;
            if !self.quiet {
                println!(
                    "{}",
                    format!("✅ Recomputed closures for {} units", outcome.changed.len())
                        .success()
                );
            }
            result.closure_issues = registry.forest().verify_closure();
        }

        if result.error_count() > 0 {
            std::process::exit(2);
        }

        Ok(())
    }

    fn output_table(&self, result: &ValidationResult) {
        if self.quiet && result.error_count() == 0 {
            return;
        }

        if result.cycle_detected {
            println!("{}", "⚠️  Parent relation contains a cycle".warning());
        }

        if !result.closure_issues.is_empty() {
            println!(
                "{}",
                format!("⚠️  {} closure issues:", result.closure_issues.len()).warning()
            );
            for issue in &result.closure_issues {
                println!("  • {issue}");
            }
            println!("{}", "Run 'orbat rebuild' to recompute closures.".dim());
        }

        if !result.echelon_violations.is_empty() {
            let heading = format!(
                "{} echelon ordering violations:",
                result.echelon_violations.len()
            );
            if result.echelon_enforced {
                println!("{}", format!("⚠️  {heading}").warning());
            } else {
                println!("{}", format!("ℹ️  {heading} (advisory)").info());
            }
            for violation in &result.echelon_violations {
                println!("  • {violation}");
            }
        }

        if result.error_count() == 0 && result.warning_count() == 0 {
            println!("{}", "✅ No issues detected.".success());
        }
    }

    fn output_json(result: &ValidationResult) -> anyhow::Result<()> {
        use serde_json::json;

        let closure: Vec<String> = result
            .closure_issues
            .iter()
            .map(ToString::to_string)
            .collect();
        let echelon: Vec<_> = result
            .echelon_violations
            .iter()
            .map(|violation| {
                json!({
                    "child": violation.child.as_str(),
                    "child_echelon": violation.child_echelon.code(),
                    "parent": violation.parent.as_str(),
                    "parent_echelon": violation.parent_echelon.code(),
                })
            })
            .collect();

        let output = json!({
            "cycle_detected": result.cycle_detected,
            "closure_issues": closure,
            "echelon_violations": echelon,
            "echelon_enforced": result.echelon_enforced,
            "errors": result.error_count(),
            "warnings": result.warning_count(),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_summary(&self, result: &ValidationResult) {
        if self.quiet && result.error_count() == 0 {
            return;
        }
        println!(
            "errors={} warnings={}",
            result.error_count(),
            result.warning_count()
        );
    }
}
