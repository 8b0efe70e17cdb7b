
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use gumdrop::Options;

use thunderstorm_automator::commands;
use thunderstorm_automator::config::Config;
use thunderstorm_automator::logging::{self, ResultExt};
use thunderstorm_automator::platform::Platform;
use thunderstorm_automator::VERSION;


#[derive(Options)]
struct Args {

	/// print help message
	#[options()]
	help: bool,

	/// print version
	#[options()]
	version: bool,

	/// settings for log output
	#[options(default = "thunderstorm_automator=info")]
	log: String,

	/// JSON file with configuration overrides
	#[options(parse(try_from_str))]
	config: Option<PathBuf>,

	#[options(command)]
	cmd: Option<Command>
}

#[derive(Options)]
enum Command {

	/// Show the effective configuration
	Config(commands::config::Args),

	/// Download and install Fiji with the ThunderSTORM plugin
	Setup(commands::setup::Args),

	/// Check Fiji can be found and can run a macro
	Check(commands::check::Args),

	/// Describe an image file
	Info(commands::info::Args),

	/// Run a ThunderSTORM analysis on a TIFF stack
	Analyze(commands::analyze::Args),

	/// Write a synthetic TIFF stack for trying out the pipeline
	MakeStack(commands::make_stack::Args)
}


fn main() -> ExitCode {

	let args = Args::parse_args_default_or_exit();

	if args.version {
		println!("thunderstorm-automator version {}", VERSION);
		return ExitCode::SUCCESS;
	}

	// init logging
	let Ok(_) = logging::init(&args.log)
		.log_err()
		else { return ExitCode::FAILURE; };

	let Ok(_) = run(args)
		.log_err()
		else { return ExitCode::FAILURE; };

	ExitCode::SUCCESS
}


#[tracing::instrument(skip_all, level = 5, name = "ThunderstormAutomator")]
fn run(args: Args) -> Result<()> {

	let Some(cmd) = args.cmd
		else { bail!("No command, try one of:\n{}", Args::command_list().unwrap_or_default()); };

	let config = Config::load(Platform::current(), args.config.as_deref());

	match cmd {
		Command::Config(cmd_args) => commands::config::run(&config, cmd_args),
		Command::Setup(cmd_args) => commands::setup::run(&config, cmd_args),
		Command::Check(cmd_args) => commands::check::run(&config, cmd_args),
		Command::Info(cmd_args) => commands::info::run(cmd_args),
		Command::Analyze(cmd_args) => commands::analyze::run(&config, cmd_args),
		Command::MakeStack(cmd_args) => commands::make_stack::run(cmd_args)
	}
}
