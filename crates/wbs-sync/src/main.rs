//! Command-line front end: runs sync passes against plan snapshot files.
//!
//! The plan hierarchy lives in a JSON snapshot ([`MemHierarchy`]'s wire
//! form). `init` seeds a project root in a snapshot, `run` executes a pass
//! (what-if unless `--live`), and `check` answers "is a sync needed?" via
//! its exit code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use wbs_hier::{HierPath, HierarchyStore, MemHierarchy};
use wbs_model::{FileSource, SourceError};
use wbs_sync::{names, SyncError, SyncMode, SyncOptions, SyncReport, SyncRole, WbsSynchronizer};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("init", args)) => init(args),
        Some(("run", args)) => run(args),
        Some(("check", args)) => check(args),
        _ => unreachable!("a subcommand is required"),
    }
}

fn cli() -> Command {
    Command::new("wbs-sync")
        .version(wbs_sync::VERSION)
        .about("Synchronizes a team WBS document with a local plan hierarchy")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            pairing_args(Command::new("init"))
                .about("Create a project root in a plan snapshot")
                .arg(
                    Arg::new("team")
                        .long("team")
                        .action(ArgAction::SetTrue)
                        .help("Seed a team rollup root instead of a personal one"),
                ),
        )
        .subcommand(
            role_args(document_args(pairing_args(Command::new("run"))))
                .about("Run one sync pass (what-if unless --live)")
                .arg(
                    Arg::new("live")
                        .long("live")
                        .action(ArgAction::SetTrue)
                        .help("Apply the changes and save the snapshot back"),
                )
                .arg(
                    Arg::new("background")
                        .long("background")
                        .action(ArgAction::SetTrue)
                        .help("Throttle the walk and yield to interactive passes"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON instead of text"),
                ),
        )
        .subcommand(
            role_args(document_args(pairing_args(Command::new("check"))))
                .about("Exit non-zero when the plan is behind the document"),
        )
}

fn pairing_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("plan")
            .long("plan")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .required(true)
            .help("Plan snapshot file (JSON)"),
    )
    .arg(
        Arg::new("project")
            .long("project")
            .value_name("PATH")
            .required(true)
            .help("Project root path inside the plan, e.g. /Rollout"),
    )
}

fn document_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("document")
            .long("document")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .required(true)
            .help("WBS document to sync against (JSON)"),
    )
    .arg(
        Arg::new("dataset")
            .long("dataset")
            .value_name("ID")
            .help("Dataset identity for locally minted node IDs"),
    )
}

fn role_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("team")
            .long("team")
            .action(ArgAction::SetTrue)
            .conflicts_with_all(["initials", "owner"])
            .help("Sync the team rollup instead of a personal plan"),
    )
    .arg(
        Arg::new("initials")
            .long("initials")
            .value_name("II")
            .required_unless_present("team")
            .help("Plan owner's initials as used in document time assignments"),
    )
    .arg(
        Arg::new("owner")
            .long("owner")
            .value_name("NAME")
            .required_unless_present("team")
            .help("Plan owner's username, the prefix of minted node IDs"),
    )
}

fn init(args: &ArgMatches) -> anyhow::Result<()> {
    let plan = args.get_one::<PathBuf>("plan").unwrap();
    let project = project_path(args)?;

    let mut store = match std::fs::read(plan) {
        Ok(bytes) => MemHierarchy::from_json(&bytes)
            .with_context(|| format!("unreadable plan snapshot {}", plan.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemHierarchy::new(),
        Err(e) => return Err(e).context(format!("could not read {}", plan.display())),
    };
    anyhow::ensure!(
        !store.node_exists(&project),
        "'{project}' already exists in {}",
        plan.display()
    );

    let template = if args.get_flag("team") {
        names::TEAM_ROOT_TEMPLATE
    } else {
        names::PERSONAL_ROOT_TEMPLATE
    };
    // Missing ancestors become plain grouping components.
    let mut chain = Vec::new();
    let mut cursor = Some(project.clone());
    while let Some(path) = cursor {
        if path.is_root() || store.node_exists(&path) {
            break;
        }
        cursor = path.parent();
        chain.push(path);
    }
    for path in chain.iter().rev() {
        let tid = if *path == project { template } else { names::COMPONENT_TEMPLATE };
        store.add_node(path, tid)?;
    }

    save_plan(plan, &store)?;
    println!("Created '{project}' in {}", plan.display());
    Ok(())
}

fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let plan = args.get_one::<PathBuf>("plan").unwrap();
    let live = args.get_flag("live");
    let mode = if live { SyncMode::Live } else { SyncMode::WhatIf };
    let options = options_from(args)
        .with_mode(mode)
        .with_background(args.get_flag("background"));

    let mut store = load_plan(plan)?;
    let Some(report) = run_pass(args, options, &mut store)? else {
        return Ok(());
    };
    if live {
        save_plan(plan, &store)?;
    }

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn check(args: &ArgMatches) -> anyhow::Result<()> {
    let plan = args.get_one::<PathBuf>("plan").unwrap();
    let options = options_from(args).with_mode(SyncMode::WhatIfBrief);

    let mut store = load_plan(plan)?;
    let Some(report) = run_pass(args, options, &mut store)? else {
        return Ok(());
    };
    if report.is_noop() {
        println!("The plan is up to date.");
        Ok(())
    } else {
        println!("A sync is needed.");
        std::process::exit(1);
    }
}

/// Runs one pass, treating an unpublished document as a quiet no-op.
fn run_pass(
    args: &ArgMatches,
    options: SyncOptions,
    store: &mut MemHierarchy,
) -> anyhow::Result<Option<SyncReport>> {
    let document = args.get_one::<PathBuf>("document").unwrap();
    let project = project_path(args)?;
    let syncer = WbsSynchronizer::new(project, Box::new(FileSource::new(document)), options);
    match syncer.sync(store) {
        Ok(report) => Ok(Some(report)),
        Err(SyncError::Source(SourceError::NotFound(loc))) => {
            println!("No document published at {loc}; nothing to do.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn options_from(args: &ArgMatches) -> SyncOptions {
    let role = if args.get_flag("team") {
        SyncRole::Team
    } else {
        // clap enforces both when --team is absent.
        SyncRole::individual(
            args.get_one::<String>("initials").unwrap().clone(),
            args.get_one::<String>("owner").unwrap().clone(),
        )
    };
    let mut options = SyncOptions::new(role).with_throttle(Duration::from_millis(25));
    if let Some(dataset) = args.get_one::<String>("dataset") {
        options = options.with_dataset_id(dataset.clone());
    }
    options
}

fn project_path(args: &ArgMatches) -> anyhow::Result<HierPath> {
    let raw = args.get_one::<String>("project").unwrap();
    raw.parse::<HierPath>().with_context(|| format!("invalid project path '{raw}'"))
}

fn load_plan(path: &Path) -> anyhow::Result<MemHierarchy> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("could not read plan snapshot {}", path.display()))?;
    MemHierarchy::from_json(&bytes)
        .with_context(|| format!("unreadable plan snapshot {}", path.display()))
}

fn save_plan(path: &Path, store: &MemHierarchy) -> anyhow::Result<()> {
    let bytes = store.to_json().context("could not serialize the plan snapshot")?;
    std::fs::write(path, bytes)
        .with_context(|| format!("could not write {}", path.display()))
}

fn print_report(report: &SyncReport) {
    if report.is_noop() {
        println!("Nothing to change; the plan matches the document.");
    } else {
        let suffix = if report.mode.is_live() { "" } else { " (what-if, nothing was written)" };
        println!("{} change(s){suffix}:", report.changes.len());
        for change in &report.changes {
            println!("  - {change}");
        }
    }
    if report.stopped_early {
        println!("Stopped at the first change found.");
    }
    for path in &report.deletions_pending {
        println!("Needs permission to delete: {path}");
    }
    for path in &report.completions_pending {
        println!("Needs permission to mark complete: {path}");
    }
    for path in &report.psp_tasks_pending {
        println!("Phase setup to review: {path}");
    }
    if !report.discrepancies.is_empty() {
        println!(
            "{} locally edited value(s) recorded for the document to adopt.",
            report.discrepancies.len()
        );
    }
    if !report.mode.is_live() && !report.is_noop() {
        println!("Run again with --live to apply.");
    }
}
