//! Cairn command line.
//!
//! Reads CND definitions the way a running node does: system definitions
//! from the configured `etc` directory first, then module files given on the
//! command line. `deploy` and `undeploy` drive the configured store
//! providers against in-memory repositories, keeping the deployment ledger
//! and snapshots in the configured snapshot directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;

use commands::ModuleArg;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(about = "Node type definitions and store providers")]
struct Args {
	/// Settings file
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Read CND files into the registry and summarize them.
	Parse {
		/// Module id the files are registered under
		#[arg(short, long, default_value = "cli")]
		system_id: String,
		#[arg(required = true)]
		files: Vec<PathBuf>,
	},
	/// Check a CND file without registering it. Fails when it has issues.
	Validate {
		#[arg(short, long, default_value = "cli")]
		system_id: String,
		file: PathBuf,
	},
	/// Print CND files back in canonical form.
	Print {
		#[arg(short, long, default_value = "cli")]
		system_id: String,
		#[arg(required = true)]
		files: Vec<PathBuf>,
	},
	/// List registered node types by module.
	List {
		/// Module definitions, as `id=path` or `id@version=path`
		#[arg(short, long = "module", value_name = "MODULE")]
		modules: Vec<ModuleArg>,
		/// Only list this module
		#[arg(long)]
		only: Option<String>,
	},
	/// Start the configured providers, deploying pending definitions.
	Deploy {
		#[arg(short, long = "module", value_name = "MODULE")]
		modules: Vec<ModuleArg>,
	},
	/// Withdraw a module's definitions from every provider.
	Undeploy {
		#[arg(short, long = "module", value_name = "MODULE")]
		modules: Vec<ModuleArg>,
		system_id: String,
	},
}

fn main() -> ExitCode {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let settings = match commands::load_settings(args.config.as_deref()) {
		Ok(settings) => settings,
		Err(e) => {
			eprintln!("error: {e}");
			return ExitCode::FAILURE;
		}
	};
	debug!(command = ?args.command, "running");

	let result = match args.command {
		Command::Parse { system_id, files } => commands::parse(&settings, &system_id, &files),
		Command::Validate { system_id, file } => commands::validate(&settings, &system_id, &file),
		Command::Print { system_id, files } => commands::print(&settings, &system_id, &files),
		Command::List { modules, only } => commands::list(&settings, &modules, only.as_deref()),
		Command::Deploy { modules } => commands::deploy(&settings, &modules),
		Command::Undeploy { modules, system_id } => commands::undeploy(&settings, &modules, &system_id),
	};
	match result {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::FAILURE,
		Err(e) => {
			eprintln!("error: {e}");
			ExitCode::FAILURE
		}
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_env("CAIRN_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("cairn=debug,cairn_store=debug,cairn_nodetypes=debug,info")
			} else {
				EnvFilter::new("warn")
			}
		});

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(verbose))
		.init();
}
