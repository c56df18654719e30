//! Walkthrough Simulator CLI
//!
//! Plans and plays back built-in floor plans, or a graph JSON file, and
//! reports whether every walkthrough check held.

use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use walkthrough_core::RoomGraph;
use walkthrough_sim::{ScenarioId, ScenarioResult, ScenarioRunner, SimError, SimExport, SimOptions};

/// Walkthrough playback simulator
#[derive(Parser, Debug)]
#[command(name = "walkthrough-sim")]
#[command(about = "Plan and play back edge-faithful room walkthroughs", long_about = None)]
struct Args {
    /// Scenario to run (line, two_floor_ring, isolated, split_wings, townhouse, straight, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Room graph JSON file to run instead of the built-in scenarios
    #[arg(short, long)]
    graph: Option<PathBuf>,

    /// Base travel speed (units/s), overrides scenario and options file
    #[arg(long)]
    speed: Option<f64>,

    /// Simulation tick rate
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Laps to play; more than one turns on looping
    #[arg(long, default_value = "1")]
    loop_count: u32,

    /// Budget per run before it counts as stuck
    #[arg(long, default_value = "600")]
    max_seconds: f64,

    /// Planner and playback options JSON file
    #[arg(long)]
    options: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export sampled frames to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

/// One run: a built-in scenario or a graph file.
enum Job {
    Scenario(ScenarioId),
    Graph(PathBuf),
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Walkthrough Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let jobs: Vec<Job> = match &args.graph {
        Some(path) => vec![Job::Graph(path.clone())],
        None if args.scenario == "all" => ScenarioId::all().into_iter().map(Job::Scenario).collect(),
        None => match args.scenario.parse() {
            Ok(id) => vec![Job::Scenario(id)],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(1);
            }
        },
    };

    if args.export.is_some() && jobs.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        std::process::exit(1);
    }

    let runner = match build_runner(&args) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Failed to load options: {}", e);
            std::process::exit(1);
        }
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for job in &jobs {
        let result = match run_job(&runner, job, args.export.as_deref()) {
            Ok(result) => result,
            Err(e) => {
                error!("✗ {} aborted: {}", job_name(job), e);
                failed_count += 1;
                continue;
            }
        };

        if !args.json {
            if result.passed {
                info!("✓ {} PASSED", result.scenario);
            } else {
                error!(
                    "✗ {} FAILED: {}",
                    result.scenario,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }
        all_results.push(result);
    }

    // Summary
    let total = jobs.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to encode summary: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} walkthrough runs passed!", total);
        } else {
            error!("❌ {}/{} walkthrough runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {}: {}",
                    result.scenario,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn build_runner(args: &Args) -> Result<ScenarioRunner, SimError> {
    let options = match &args.options {
        Some(path) => SimOptions::from_file(path)?,
        None => SimOptions::default(),
    };

    let mut runner = ScenarioRunner::new()
        .with_fps(args.fps)
        .with_duration(args.max_seconds)
        .with_loop_count(args.loop_count)
        .with_plan_options(options.plan);
    if let Some(speed) = args.speed {
        runner = runner.with_speed(speed);
    } else if args.options.is_some() {
        runner = runner.with_speed(options.walkthrough.speed);
    }
    Ok(runner.with_walk_options(options.walkthrough))
}

fn run_job(
    runner: &ScenarioRunner,
    job: &Job,
    export_path: Option<&Path>,
) -> Result<ScenarioResult, SimError> {
    let (result, export) = match job {
        Job::Scenario(id) => match export_path {
            Some(_) => {
                let (result, export) = runner.run_with_export(*id)?;
                (result, Some(export))
            }
            None => (runner.run(*id)?, None),
        },
        Job::Graph(path) => {
            let graph = RoomGraph::from_reader(BufReader::new(File::open(path)?))?;
            let name = job_name(job);
            let mut export = export_path.map(|_| SimExport::new(&name, runner.fps()));
            let result = runner.run_graph(&name, &graph, export.as_mut())?;
            if let Some(export) = export.as_mut() {
                export.finalize(result.passed, result.failure_reason.clone());
            }
            (result, export)
        }
    };

    if let (Some(path), Some(export)) = (export_path, export) {
        export.write_to_file(path)?;
        info!("Exported {} frames to {}", export.frames.len(), path.display());
    }
    Ok(result)
}

fn job_name(job: &Job) -> String {
    match job {
        Job::Scenario(id) => id.name().to_string(),
        Job::Graph(path) => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}
