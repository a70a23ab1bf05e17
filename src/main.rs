//! promptbench - LLM prompt benchmarking harness
//!
//! USAGE:
//!   promptbench run --models <id,...> [--suite FILE]   # benchmark models
//!   promptbench run --free                             # benchmark top free models
//!   promptbench report <run.json>                      # re-render a saved run
//!   promptbench models --refresh                       # refresh models cache
//!   promptbench doctor                                 # check config, key, network
//!   promptbench config set key <value>                 # non-interactive config

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use promptbench::artifacts::ArtifactStore;
use promptbench::client::{self, OpenRouterBackend};
use promptbench::config::{self, Config};
use promptbench::models;
use promptbench::report::{self, RunReport};
use promptbench::scheduler::{RunConfig, Scheduler};
use promptbench::suite::{builtin_suite, Suite};

// ═══════════════════════════════════════════════════════════════
// CLI
// ═══════════════════════════════════════════════════════════════

#[derive(Debug)]
enum Command {
    Run {
        suite: Option<PathBuf>,
        models: Vec<String>,
        runs: Option<usize>,
        jobs: Option<usize>,
        timeout: Option<u64>,
        free: bool,
        fresh: bool,
        out: Option<PathBuf>,
    },
    Report {
        path: PathBuf,
    },
    Models {
        refresh: bool,
    },
    Doctor,
    ConfigSet {
        key: String,
        value: String,
    },
    Help,
}

fn parse_args() -> Command {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        return Command::Help;
    }

    match args.first().map(|s| s.as_str()) {
        Some("doctor") => return Command::Doctor,
        Some("models") => {
            return Command::Models {
                refresh: args.iter().any(|a| a == "--refresh"),
            };
        }
        Some("report") => {
            return Command::Report {
                path: PathBuf::from(args.get(1).cloned().unwrap_or_default()),
            };
        }
        Some("config") => {
            if args.get(1).map(|s| s.as_str()) == Some("set") {
                return Command::ConfigSet {
                    key: args.get(2).cloned().unwrap_or_default(),
                    value: args.get(3).cloned().unwrap_or_default(),
                };
            }
            return Command::Help;
        }
        Some("run") => {}
        _ => return Command::Help,
    }

    // Parse `run` flags
    let mut suite = None;
    let mut model_list = Vec::new();
    let mut runs = None;
    let mut jobs = None;
    let mut timeout = None;
    let mut free = false;
    let mut fresh = false;
    let mut out = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--suite" | "-s" => {
                i += 1;
                suite = args.get(i).map(PathBuf::from);
            }
            "--models" | "-m" => {
                i += 1;
                if let Some(list) = args.get(i) {
                    model_list = list
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
            }
            "--runs" | "-r" => {
                i += 1;
                runs = args.get(i).and_then(|s| s.parse().ok());
            }
            "--jobs" | "-j" => {
                i += 1;
                jobs = args.get(i).and_then(|s| s.parse().ok());
            }
            "--timeout" | "-t" => {
                i += 1;
                timeout = args.get(i).and_then(|s| s.parse().ok());
            }
            "--free" | "-f" => free = true,
            "--fresh" => fresh = true,
            "--out" | "-o" => {
                i += 1;
                out = args.get(i).map(PathBuf::from);
            }
            _ => {}
        }
        i += 1;
    }

    Command::Run {
        suite,
        models: model_list,
        runs,
        jobs,
        timeout,
        free,
        fresh,
        out,
    }
}

fn print_help() {
    println!(
        r#"promptbench - LLM prompt benchmarking harness (OpenRouter powered)

USAGE:
    promptbench run [OPTIONS]         # benchmark models against a suite
    promptbench report <run.json>     # re-render a saved run as markdown
    promptbench models [--refresh]    # list cached models / refresh cache
    promptbench doctor                # check config, key, network
    promptbench config set <k> <v>    # set config value

RUN OPTIONS:
    -s, --suite <file>      Suite JSON file (default: built-in suite)
    -m, --models <id,...>   Models to benchmark (comma-separated)
    -r, --runs <n>          Runs per (model, test) pair
    -j, --jobs <n>          Max concurrent invocations
    -t, --timeout <secs>    Per-job timeout
    -f, --free              Without --models, pick the top free models
        --fresh             Ignore cached artifacts (still records new ones)
    -o, --out <dir>         Report output directory (default: bench-results)

CONFIG:
    ~/.config/promptbench/config.json       API key, run defaults
    ~/.cache/promptbench/models.json        Cached model catalog
    ~/.local/state/promptbench/artifacts/   Reusable run artifacts

ENVIRONMENT:
    OPENROUTER_API_KEY      Override API key from config
"#
    );
}

// ═══════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<()> {
    match parse_args() {
        Command::Run {
            suite,
            models,
            runs,
            jobs,
            timeout,
            free,
            fresh,
            out,
        } => cmd_run(suite, models, runs, jobs, timeout, free, fresh, out).await,
        Command::Report { path } => cmd_report(&path),
        Command::Models { refresh } => cmd_models(refresh).await,
        Command::Doctor => cmd_doctor().await,
        Command::ConfigSet { key, value } => cmd_config_set(&key, &value),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

/// How many free models `run --free` picks when none are named
const FREE_MODEL_COUNT: usize = 3;

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    suite_path: Option<PathBuf>,
    cli_models: Vec<String>,
    runs: Option<usize>,
    jobs: Option<usize>,
    timeout: Option<u64>,
    free: bool,
    fresh: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let cfg = Config::load()?;
    let api_key = config::get_api_key()?;

    let suite = match suite_path {
        Some(path) => Suite::load(&path)?,
        None => builtin_suite(),
    };

    let catalog = match models::load_or_fetch(&api_key).await {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("warning: could not load model catalog ({}), costs will be $0", e);
            Vec::new()
        }
    };

    // Flag > config > free-model pick
    let mut model_ids = if !cli_models.is_empty() {
        cli_models
    } else {
        cfg.default_models.clone()
    };
    if model_ids.is_empty() && (free || cfg.free_only) {
        model_ids = models::get_free_models(&catalog)
            .into_iter()
            .take(FREE_MODEL_COUNT)
            .map(|m| m.id.clone())
            .collect();
    }
    if model_ids.is_empty() {
        anyhow::bail!(
            "No models selected. Pass --models <id,...>, use --free, or run: \
             promptbench config set models <id,...>"
        );
    }

    let run_config = RunConfig {
        models: model_ids,
        runs_per_test: runs.unwrap_or(cfg.runs_per_test),
        max_concurrent: jobs.unwrap_or(cfg.max_concurrent),
        timeout_secs: timeout.unwrap_or(cfg.timeout_secs),
        reuse_artifacts: !fresh && cfg.reuse_artifacts,
    };

    println!(
        "Suite '{}': {} tests x {} models x {} runs",
        suite.name,
        suite.count(),
        run_config.models.len(),
        run_config.runs_per_test.max(1)
    );

    let mut store = ArtifactStore::open(ArtifactStore::default_dir()?)?;
    let backend = Arc::new(OpenRouterBackend::new(&api_key));
    let scheduler = Scheduler::new(backend, suite.clone(), &catalog);

    // Ctrl-C drains the queue; in-flight jobs finish and partial reports
    // are still written.
    let stop = scheduler.stop_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after in-flight jobs...");
        stop.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let result = scheduler.run(&run_config, &mut store).await?;

    let report = RunReport::new(&suite.name, suite.version, run_config, result);
    println!("\n{}", report::render_markdown(&report));

    let out_dir = out.unwrap_or_else(|| PathBuf::from(&cfg.out_dir));
    let written = report::write_reports(&report, &out_dir)?;
    for path in written {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn cmd_report(path: &PathBuf) -> Result<()> {
    let report = RunReport::load(path)?;
    println!("{}", report::render_markdown(&report));
    Ok(())
}

async fn cmd_models(refresh: bool) -> Result<()> {
    let api_key = config::get_api_key()?;

    let catalog = if refresh {
        let fetched = client::fetch_models(&api_key).await?;
        models::save_cache(&fetched)?;
        fetched
    } else {
        models::load_or_fetch(&api_key).await?
    };

    println!("{} models cached", catalog.len());
    for model in &catalog {
        let tag = if model.is_free() { "free" } else { "paid" };
        println!(
            "  {:50} {:>8} ctx  {}  ${:.2}/M in ${:.2}/M out",
            model.id,
            model.context_length,
            tag,
            model.pricing_prompt * 1_000_000.0,
            model.pricing_completion * 1_000_000.0,
        );
    }
    Ok(())
}

async fn cmd_doctor() -> Result<()> {
    println!("promptbench doctor\n");

    let config_path = config::config_path()?;
    println!(
        "  config: {} ({})",
        config_path.display(),
        if config_path.exists() { "present" } else { "missing, defaults apply" }
    );

    match config::get_api_key() {
        Ok(_) => println!("  api key: configured"),
        Err(e) => println!("  api key: MISSING ({})", e),
    }

    match client::check_connectivity().await {
        Ok(()) => println!("  network: OpenRouter reachable"),
        Err(e) => println!("  network: UNREACHABLE ({})", e),
    }

    match models::load_cache() {
        Ok(Some(cache)) => println!("  models cache: {} models", cache.models.len()),
        Ok(None) => println!("  models cache: empty or stale"),
        Err(e) => println!("  models cache: unreadable ({})", e),
    }

    let store = ArtifactStore::open(ArtifactStore::default_dir()?)?;
    println!("  artifacts: {} cached responses", store.len());

    Ok(())
}

fn cmd_config_set(key: &str, value: &str) -> Result<()> {
    if key.is_empty() {
        anyhow::bail!("Usage: promptbench config set <key> <value>");
    }
    let mut cfg = Config::load()?;
    cfg.set(key, value)?;
    cfg.save()?;
    let shown = if key == "key" || key == "api_key" { "***" } else { value };
    println!("Set {} = {}", key, shown);
    Ok(())
}
