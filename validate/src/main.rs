//! loopmod-validate - Offline checks for a mods root.
//!
//! Usage: loopmod-validate <mods_root> [--strict] [--handler NAME]...
//!
//! Loads the parameter, add-on and action folders without running anything
//! and prints every problem found. Exits with 1 on errors, or on warnings
//! when `--strict` is given.

mod report;

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use loopmod_core::handlers::builtin_handler_names;
use loopmod_core::input::{BIND_INPUT, UNBIND_INPUT};
use loopmod_core::{ModFolders, ModSnapshot};
use loopmod_types::EngineConfig;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Validate a LoopMod mods root")]
struct Args {
    /// Directory containing the Parameters, Addons and Actions folders
    mods_root: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,

    /// Extra handler name the host registers (repeatable)
    #[arg(long = "handler", value_name = "NAME")]
    handlers: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::ERROR.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.mods_root.is_dir() {
        eprintln!("Mods root {} is not a directory", args.mods_root.display());
        return ExitCode::from(2);
    }

    let config = EngineConfig::with_root(&args.mods_root);
    let snapshot = ModSnapshot::load(&ModFolders::from_config(&config));

    let mut handlers: HashSet<String> = builtin_handler_names()
        .into_iter()
        .chain([BIND_INPUT, UNBIND_INPUT])
        .map(str::to_string)
        .collect();
    handlers.extend(args.handlers);

    let report = report::check(&snapshot, &handlers);
    for finding in &report.findings {
        println!("{finding}");
    }

    println!(
        "{}: {} parameter(s), {} add-on(s), {} action(s); {} error(s), {} warning(s)",
        args.mods_root.display(),
        snapshot.parameters.len(),
        snapshot.catalog.addons.len(),
        snapshot.catalog.actions.len(),
        report.errors(),
        report.warnings()
    );

    if report.failed(args.strict) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
