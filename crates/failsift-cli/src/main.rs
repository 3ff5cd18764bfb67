//! Failsift - CI failure triage CLI
//!
//! The `failsift` command ranks candidate classifications for
//! automatically-detected failure lines.
//!
//! ## Commands
//!
//! - `rank`: rank classification options for error lines from a JSON file
//! - `similarity`: score the token-overlap similarity of two strings

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};

use failsift_classify::{rank, similarity, RankedOptions};
use failsift_domain::{ClassificationOption, ErrorData, FailureLine, LineId, MatcherRegistry};
use failsift_panel::{ErrorLineProvider, JsonFileProvider};

mod telemetry;

#[derive(Parser)]
#[command(name = "failsift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CI failure triage - rank classification options for failure lines", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank classification options for error lines in a JSON file
    Rank {
        /// Path to an error-data JSON file (matchers + error lines)
        #[arg(short, long)]
        input: PathBuf,

        /// Only rank the line with this id
        #[arg(long)]
        line: Option<u64>,

        /// Also print options hidden by the visibility policy
        #[arg(long)]
        show_hidden: bool,

        /// Print the ranked options as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Score the token-overlap similarity of two strings
    Similarity {
        /// First string
        a: String,

        /// Second string
        b: String,
    },
}

/// JSON shape of one ranked line for `rank --json`
#[derive(Serialize)]
struct RankReport<'a> {
    line_id: LineId,
    search: &'a str,
    #[serde(flatten)]
    ranked: &'a RankedOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Rank {
            input,
            line,
            show_hidden,
            json,
        } => cmd_rank(&input, line.map(LineId), show_hidden, json).await,
        Commands::Similarity { a, b } => {
            println!("{:.6}", similarity(&a, &b));
            Ok(())
        }
    }
}

/// Rank every requested line and print the results
async fn cmd_rank(
    input: &PathBuf,
    only_line: Option<LineId>,
    show_hidden: bool,
    json: bool,
) -> Result<()> {
    let provider = JsonFileProvider::new(input);
    let data: ErrorData = provider
        .fetch(0)
        .await
        .with_context(|| format!("Failed to load error data from {:?}", input))?;

    let matchers = MatcherRegistry::new(data.matchers.clone());
    info!(
        lines = data.error_lines.len(),
        matchers = matchers.len(),
        "loaded error data"
    );

    let lines: Vec<&FailureLine> = data
        .error_lines
        .iter()
        .filter(|line| only_line.is_none_or(|id| line.id == id))
        .collect();

    if lines.is_empty() {
        anyhow::bail!("No matching error lines in {:?}", input);
    }

    let mut reports = Vec::new();
    for line in &lines {
        let ranked = rank(line)
            .with_context(|| format!("Failed to rank line {}", line.id))?;
        if json {
            reports.push((line, ranked));
        } else {
            print_ranked(line, &ranked, &matchers, show_hidden);
        }
    }

    if json {
        let reports: Vec<RankReport> = reports
            .iter()
            .map(|(line, ranked)| RankReport {
                line_id: line.id,
                search: line.search_text(),
                ranked,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}

fn print_ranked(
    line: &FailureLine,
    ranked: &RankedOptions,
    matchers: &MatcherRegistry,
    show_hidden: bool,
) {
    println!("line {}: {}", line.id, line.search_text());

    let hidden = ranked
        .options
        .iter()
        .filter(|option| option.hidden)
        .count();

    for (idx, option) in ranked.options.iter().enumerate() {
        if option.hidden && !show_hidden {
            continue;
        }
        println!("  {:>2}. {}", idx + 1, render_option(option, matchers));
    }
    if hidden > 0 && !show_hidden {
        println!("      ({} hidden, use --show-hidden)", hidden);
    }
    for option in &ranked.extras {
        println!("   -. {}", render_option(option, matchers));
    }
    println!();
}

fn render_option(option: &ClassificationOption, matchers: &MatcherRegistry) -> String {
    let mut rendered = format!("[{:.3}]", option.score);
    if option.is_best {
        rendered.push_str(" *best*");
    }
    if option.hidden {
        rendered.push_str(" (hidden)");
    }
    match option.bug_number() {
        Some(0) => rendered.push_str(" ignore"),
        Some(bug) => rendered.push_str(&format!(" bug {}", bug)),
        None => rendered.push_str(&format!(" {}", option.kind.name())),
    }
    if let Some(summary) = option.bug_summary() {
        rendered.push_str(&format!(" - {}", summary));
    }
    if let Some(matches) = option.matches() {
        let names: Vec<String> = matches
            .iter()
            .map(|evidence| {
                format!(
                    "{} {:.2}",
                    matchers.name(evidence.matcher).unwrap_or("unknown"),
                    evidence.score
                )
            })
            .collect();
        rendered.push_str(&format!(" ({})", names.join(", ")));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsift_domain::{BugSuggestion, BugSuggestions, Matcher, MatcherId, SuggestionId};

    fn sample_data() -> ErrorData {
        ErrorData {
            matchers: vec![Matcher {
                id: MatcherId(1),
                name: "PreciseTestMatcher".to_string(),
            }],
            error_lines: vec![FailureLine {
                id: LineId(12),
                bug_suggestions: BugSuggestions {
                    search: "TEST-UNEXPECTED-FAIL /a/b/foo.js line 10".to_string(),
                    open_recent: vec![BugSuggestion {
                        id: SuggestionId(1),
                        bug_number: 9001,
                        summary: "foo.js line 10 fail".to_string(),
                        resolution: None,
                    }],
                    all_others: vec![],
                },
                classified_failures: vec![],
                matches: vec![],
                best_classification: None,
                best_is_verified: false,
            }],
        }
    }

    #[tokio::test]
    async fn test_cmd_rank_reads_and_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, serde_json::to_string(&sample_data()).unwrap()).unwrap();

        cmd_rank(&path, None, false, false).await.unwrap();
        cmd_rank(&path, Some(LineId(12)), true, true).await.unwrap();

        let err = cmd_rank(&path, Some(LineId(99)), false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No matching error lines"));
    }

    #[test]
    fn test_render_option_shows_bug_and_summary() {
        let data = sample_data();
        let ranked = rank(&data.error_lines[0]).unwrap();
        let matchers = MatcherRegistry::new(data.matchers.clone());

        let rendered = render_option(&ranked.options[0], &matchers);
        assert!(rendered.contains("bug 9001"));
        assert!(rendered.contains("foo.js line 10 fail"));

        let ignore = ranked.extras.last().unwrap();
        assert!(render_option(ignore, &matchers).contains("ignore"));
    }
}
