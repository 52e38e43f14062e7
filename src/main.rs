use log::{debug, info, warn};

use clap::Parser;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::fs;

use serde::{Deserialize, Serialize};
use text_diff::print_diff;

use star_voting::{run_star_tally, BallotScores, Statistics, TallyErrors};

mod args;

use crate::args::Args;

#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("Error opening election file {path}"))]
    OpeningElection {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing election file {path}"))]
    ParsingElection {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening reference summary {path}"))]
    OpeningReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing reference summary {path}"))]
    ParsingReference {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error tabulating the election"))]
    Tabulating { source: TallyErrors },
    #[snafu(display("The tabulated summary differs from the reference"))]
    ReferenceMismatch,
}

type CliResult<T> = Result<T, CliError>;

/// The JSON description of an election: the option names and one score
/// row per ballot, aligned with the options.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ElectionFile {
    options: Vec<String>,
    ballots: Vec<Vec<u8>>,
}

fn read_election(path: &str) -> CliResult<ElectionFile> {
    let contents = fs::read_to_string(path).context(OpeningElectionSnafu { path })?;
    debug!("read content: {:?}", contents);
    let election: ElectionFile =
        serde_json::from_str(contents.as_str()).context(ParsingElectionSnafu { path })?;
    Ok(election)
}

fn tabulate(election: &ElectionFile) -> CliResult<Statistics> {
    let ballots: Vec<BallotScores> = election
        .ballots
        .iter()
        .map(|scores| BallotScores::new(scores.clone()))
        .collect();
    run_star_tally(&election.options, &ballots).context(TabulatingSnafu {})
}

fn main_flow(args: &Args) -> CliResult<()> {
    let election = read_election(args.input.as_str())?;
    info!(
        "election: {} options, {} ballots",
        election.options.len(),
        election.ballots.len()
    );

    let stats = tabulate(&election)?;
    info!("winner: {:?}", stats.winner());

    // Serialization of Statistics cannot fail: no maps with non-string keys.
    let pretty_js_stats =
        serde_json::to_string_pretty(&stats).unwrap_or_else(|_| "{}".to_string());
    match args.out.as_deref() {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js_stats);
        }
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingSummarySnafu { path })?;
            info!("summary written to {}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(ref_path) = args.reference.clone() {
        let ref_contents = fs::read_to_string(ref_path.as_str())
            .context(OpeningReferenceSnafu { path: ref_path.as_str() })?;
        let ref_js: serde_json::Value = serde_json::from_str(ref_contents.as_str())
            .context(ParsingReferenceSnafu { path: ref_path.as_str() })?;
        let pretty_js_ref =
            serde_json::to_string_pretty(&ref_js).unwrap_or_else(|_| "{}".to_string());
        if pretty_js_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(pretty_js_ref.as_str(), pretty_js_stats.as_str(), "\n");
            return ReferenceMismatchSnafu {}.fail();
        }
        info!("summary matches the reference");
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(log_level).init();

    if let Err(e) = main_flow(&args) {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
