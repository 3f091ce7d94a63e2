use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use f1x::config::{load_from_path, RepairConfig};
use f1x::{
    enumerate, expression_to_string, load_candidate_locations, rank, visualize_element,
    visualize_f1xid, CandidateLocation, DriverRunner, F1xId, IdSpace, Sandbox,
    SearchSpaceElement, SourcePatch, Verdict,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "f1x")]
#[command(about = "Explore and validate the patch space of candidate locations", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate locations and the size of their id spaces
    List {
        /// Candidate locations (JSON)
        locations: PathBuf,

        /// Repair configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Decode one F1X id at one location
    Decode {
        locations: PathBuf,

        /// Location id
        #[arg(short, long)]
        loc: u32,

        /// Id in base:int2:bool2:cond3:param form
        #[arg(short, long)]
        id: F1xId,

        /// Source file to diff against
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Enumerate the well-formed candidates of one location
    Enumerate {
        locations: PathBuf,

        #[arg(short, long)]
        loc: u32,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many candidates
        #[arg(long)]
        limit: Option<usize>,

        /// Order by edit distance instead of id
        #[arg(long)]
        rank: bool,
    },

    /// Patch one candidate into its source and run the configured tests
    Test {
        locations: PathBuf,

        #[arg(short, long)]
        loc: u32,

        #[arg(short, long)]
        id: F1xId,

        /// Source files, indexed by the locations' file id
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::List { locations, config } => cmd_list(&locations, config.as_deref()),
        Commands::Decode {
            locations,
            loc,
            id,
            file,
        } => cmd_decode(&locations, loc, id, file.as_deref()),
        Commands::Enumerate {
            locations,
            loc,
            config,
            limit,
            rank,
        } => cmd_enumerate(&locations, loc, config.as_deref(), limit, rank),
        Commands::Test {
            locations,
            loc,
            id,
            files,
            config,
        } => cmd_test(&locations, loc, id, &files, config.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "f1x=debug" } else { "f1x=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

/// `load_from_path` validates; only the defaults are checked here.
fn load_config(path: Option<&Path>) -> Result<RepairConfig> {
    match path {
        Some(path) => Ok(load_from_path(path)?),
        None => {
            let config = RepairConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn find_location(
    locations: &[Arc<CandidateLocation>],
    loc_id: u32,
) -> Result<Arc<CandidateLocation>> {
    locations
        .iter()
        .find(|l| l.loc_id == loc_id)
        .cloned()
        .with_context(|| format!("no candidate location with id {loc_id}"))
}

fn display_diff(diff: &str) {
    for line in diff.lines() {
        let styled = if line.starts_with("+++") || line.starts_with("---") {
            line.dimmed()
        } else if line.starts_with("@@") {
            line.cyan()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else {
            line.normal()
        };
        println!("{styled}");
    }
}

fn cmd_list(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let locations = load_candidate_locations(path)?;

    println!("{}", format!("{} candidate locations", locations.len()).bold());
    for loc in &locations {
        let space = IdSpace::for_location(loc, config.search.param_limit);
        println!(
            "  {:>4}  {:<10} {}  {}  ({} components, {} ids)",
            loc.loc_id,
            loc.defect.as_str(),
            loc.location,
            expression_to_string(&loc.original).cyan(),
            loc.components.len(),
            space.size()
        );
    }
    Ok(())
}

fn cmd_decode(path: &Path, loc_id: u32, id: F1xId, file: Option<&Path>) -> Result<()> {
    let locations = load_candidate_locations(path)?;
    let loc = find_location(&locations, loc_id)?;
    let element = SearchSpaceElement::decode(&loc, id)
        .with_context(|| format!("id {} is not well-formed at location {loc_id}", visualize_f1xid(&id)))?;

    println!("{}", element.summary());
    if let Some(file) = file {
        display_diff(&visualize_element(&element, file)?);
    }
    Ok(())
}

fn cmd_enumerate(
    path: &Path,
    loc_id: u32,
    config: Option<&Path>,
    limit: Option<usize>,
    ranked: bool,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(limit) = limit {
        config.search.max_candidates = limit;
    }

    let locations = load_candidate_locations(path)?;
    let loc = find_location(&locations, loc_id)?;
    let mut elements = enumerate(&loc, &config.search);
    if ranked {
        rank(&mut elements);
    }

    for element in &elements {
        println!(
            "{}  {}  {} {}",
            visualize_f1xid(element.id()).dimmed(),
            expression_to_string(element.patch()),
            element.meta().transformation.as_str().yellow(),
            element.meta().distance
        );
    }
    println!("{}", format!("{} candidates", elements.len()).bold());
    Ok(())
}

fn cmd_test(
    path: &Path,
    loc_id: u32,
    id: F1xId,
    files: &[PathBuf],
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let Some(runner) = DriverRunner::from_config(&config.tests) else {
        bail!("no test driver configured ([tests] driver)");
    };
    if config.tests.ids.is_empty() {
        bail!("no test ids configured ([tests] ids)");
    }
    let sandbox = Sandbox::from_config(&config.sandbox);

    let locations = load_candidate_locations(path)?;
    let loc = find_location(&locations, loc_id)?;
    let file = files
        .get(loc.location.file_id as usize)
        .with_context(|| format!("no source file for file id {}", loc.location.file_id))?;
    let element = SearchSpaceElement::decode(&loc, id)
        .with_context(|| format!("id {} is not well-formed at location {loc_id}", visualize_f1xid(&id)))?;

    println!("{}", element.summary());
    let applied = SourcePatch::for_element(&element, file)?.apply()?;
    let verdicts = sandbox.validate(&runner, &element, &config.tests.ids);
    applied.revert()?;

    let mut failed = 0;
    for (test, verdict) in verdicts? {
        let mark = match verdict {
            Verdict::Pass => "✓".green(),
            Verdict::Fail => "✗".red(),
            Verdict::Error | Verdict::Timeout => "⊘".yellow(),
        };
        println!("  {mark} {test}: {verdict}");
        if verdict != Verdict::Pass {
            failed += 1;
        }
    }

    if failed > 0 {
        println!("{}", format!("{failed} of {} tests did not pass", config.tests.ids.len()).bold());
        std::process::exit(1);
    }
    println!("{}", "all tests passed".green().bold());
    Ok(())
}
