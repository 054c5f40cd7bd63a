use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use evo_checker::{check_workspace, Runner, WorkspacePaths};
use evo_core::{Finding, ValidationReport, ValidatorConfig};
use evo_journal::{check_significance, journal_files, validate_synthesis_file, JournalIndex};
use evo_proposal::validate_proposals;
use evo_soul::{validate_soul, SnapshotMode};
use evo_state::{validate_state, StoreLayout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn root_arg() -> Arg {
    Arg::new("root")
        .long("root")
        .default_value(".")
        .value_parser(value_parser!(PathBuf))
        .help("Workspace root")
}

fn today_arg() -> Arg {
    Arg::new("today")
        .long("today")
        .value_parser(value_parser!(NaiveDate))
        .help("Journal day to check (YYYY-MM-DD, default: local date)")
}

fn cli() -> Command {
    Command::new("evo-check")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audit a persona document and its evolution pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to evoclaw/config.json"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("soul")
                .about("Validate SOUL.md structure")
                .arg(path_arg("path", "Path to SOUL.md")),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Save or check the immutable-bullet snapshot")
                .subcommand_required(true)
                .subcommand(
                    Command::new("save")
                        .about("Record the current [CORE] bullets")
                        .arg(path_arg("soul", "Path to SOUL.md"))
                        .arg(path_arg("snapshot", "Snapshot file to write")),
                )
                .subcommand(
                    Command::new("check")
                        .about("Compare [CORE] bullets against a saved snapshot")
                        .arg(path_arg("soul", "Path to SOUL.md"))
                        .arg(path_arg("snapshot", "Snapshot file to read")),
                ),
        )
        .subcommand(
            Command::new("journal")
                .about("Validate a daily experience file")
                .arg(path_arg("file", "Path to YYYY-MM-DD.jsonl"))
                .arg(
                    Arg::new("journal-dir")
                        .long("journal-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Journal directory scanned for cross-file duplicates (default: the file's directory)"),
                ),
        )
        .subcommand(
            Command::new("synthesis")
                .about("Validate a reflection record")
                .arg(path_arg("file", "Path to REF-*.json"))
                .arg(
                    Arg::new("experiences-dir")
                        .long("experiences-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Journal directory used to resolve experience ids"),
                ),
        )
        .subcommand(
            Command::new("proposals")
                .about("Validate pending proposals against SOUL.md")
                .arg(path_arg("pending", "Path to pending.jsonl"))
                .arg(path_arg("soul", "Path to SOUL.md"))
                .arg(
                    Arg::new("history")
                        .long("history")
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to history.jsonl; ids found there are rejected"),
                ),
        )
        .subcommand(
            Command::new("state")
                .about("Validate the cached state file")
                .arg(path_arg("file", "Path to evoclaw-state.json"))
                .arg(
                    Arg::new("memory-dir")
                        .long("memory-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("memory/ directory for reconciliation"),
                )
                .arg(
                    Arg::new("proposals-dir")
                        .long("proposals-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding pending.jsonl (default: <memory-dir>/proposals)"),
                )
                .arg(today_arg()),
        )
        .subcommand(
            Command::new("significance")
                .about("Check promotion and reflection of notable and pivotal experiences")
                .arg(path_arg("experiences", "memory/experiences/ directory"))
                .arg(path_arg("significant", "Path to significant.jsonl")),
        )
        .subcommand(
            Command::new("workspace")
                .about("Check that EvoClaw is installed in a workspace")
                .arg(root_arg()),
        )
        .subcommand(
            Command::new("all")
                .about("Run every validator over a workspace")
                .arg(root_arg())
                .arg(today_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the summary as JSON"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .help("Per-validator timeout in seconds"),
                )
                .arg(
                    Arg::new("window")
                        .long("window")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Recent reflection files to validate"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("evo_check=info,evo_checker=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<ValidatorConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => ValidatorConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ValidatorConfig::default()),
    }
}

fn path<'a>(matches: &'a ArgMatches, name: &str) -> &'a Path {
    matches
        .get_one::<PathBuf>(name)
        .map_or(Path::new("."), PathBuf::as_path)
}

fn emit(report: &ValidationReport) -> Result<i32> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(report.exit_code())
}

fn journal(matches: &ArgMatches, config: &ValidatorConfig) -> Result<i32> {
    let file = path(matches, "file");
    let dir = matches
        .get_one::<PathBuf>("journal-dir")
        .cloned()
        .or_else(|| file.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let mut files = journal_files(&dir)?;
    if !files.iter().any(|f| f == file) {
        files.push(file.to_path_buf());
    }
    let report = JournalIndex::scan(&files, config)
        .into_report_for(file)
        .unwrap_or_else(|| ValidationReport::unreadable(file.display().to_string(), "File was not scanned"));
    emit(&report)
}

// A missing journal directory skips id resolution instead of failing every id.
fn check_synthesis(
    file: &Path,
    experiences: Option<&Path>,
    config: &ValidatorConfig,
) -> Result<ValidationReport> {
    let Some(dir) = experiences else {
        return Ok(validate_synthesis_file(file, None));
    };
    if !dir.is_dir() {
        let mut report = validate_synthesis_file(file, None);
        report.push(
            Finding::warning(format!(
                "Experiences directory not found: {}; experience IDs were not resolved",
                dir.display()
            ))
            .field("experience_ids"),
        );
        return Ok(report);
    }
    let index = JournalIndex::scan_dir(dir, config)?;
    Ok(validate_synthesis_file(file, Some(&index)))
}

fn synthesis(matches: &ArgMatches, config: &ValidatorConfig) -> Result<i32> {
    let experiences = matches.get_one::<PathBuf>("experiences-dir").map(PathBuf::as_path);
    emit(&check_synthesis(path(matches, "file"), experiences, config)?)
}

fn state(matches: &ArgMatches, config: &ValidatorConfig) -> Result<i32> {
    let mut layout = matches
        .get_one::<PathBuf>("memory-dir")
        .map(StoreLayout::from_memory_dir)
        .unwrap_or_default();
    if let Some(dir) = matches.get_one::<PathBuf>("proposals-dir") {
        layout.proposals_dir = Some(dir.clone());
    }
    let today = matches
        .get_one::<NaiveDate>("today")
        .copied()
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    emit(&validate_state(path(matches, "file"), &layout, today, config))
}

async fn all(matches: &ArgMatches) -> Result<i32> {
    let root = path(matches, "root");
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(_) => load_config(matches)?,
        None => ValidatorConfig::load_or_default(Some(&WorkspacePaths::new(root).config())),
    };
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*secs));
    }

    let mut runner = Runner::new(root).with_config(config);
    if let Some(today) = matches.get_one::<NaiveDate>("today") {
        runner = runner.with_today(*today);
    }
    if let Some(window) = matches.get_one::<usize>("window") {
        runner = runner.with_synthesis_window(*window);
    }

    let summary = runner.run().await;
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.generate_text());
    }
    Ok(summary.exit_code())
}

async fn dispatch(matches: &ArgMatches) -> Result<i32> {
    match matches.subcommand() {
        Some(("soul", sub)) => {
            let config = load_config(sub)?;
            emit(&validate_soul(path(sub, "path"), SnapshotMode::Off, &config))
        }
        Some(("snapshot", sub)) => match sub.subcommand() {
            Some(("save", args)) => {
                let config = load_config(args)?;
                let snapshot = path(args, "snapshot");
                emit(&validate_soul(path(args, "soul"), SnapshotMode::Save(snapshot), &config))
            }
            Some(("check", args)) => {
                let config = load_config(args)?;
                let snapshot = path(args, "snapshot");
                emit(&validate_soul(path(args, "soul"), SnapshotMode::Check(snapshot), &config))
            }
            _ => unreachable!("snapshot requires a subcommand"),
        },
        Some(("journal", sub)) => journal(sub, &load_config(sub)?),
        Some(("synthesis", sub)) => synthesis(sub, &load_config(sub)?),
        Some(("proposals", sub)) => {
            let config = load_config(sub)?;
            let history = sub.get_one::<PathBuf>("history").map(PathBuf::as_path);
            emit(&validate_proposals(
                path(sub, "pending"),
                path(sub, "soul"),
                history,
                &config,
            ))
        }
        Some(("state", sub)) => state(sub, &load_config(sub)?),
        Some(("significance", sub)) => {
            let config = load_config(sub)?;
            let index = JournalIndex::scan_dir(path(sub, "experiences"), &config)?;
            emit(&check_significance(&index, path(sub, "significant"), &config))
        }
        Some(("workspace", sub)) => emit(&check_workspace(&WorkspacePaths::new(path(sub, "root")))),
        Some(("all", sub)) => all(sub).await,
        _ => unreachable!("a subcommand is required"),
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let code = match dispatch(&matches).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            2
        }
    };
    std::process::exit(code);
}
