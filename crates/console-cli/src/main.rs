mod commands;
mod input;
mod opts;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use commands::plugins::PluginsArgs;
use commands::run::RunArgs;
use opts::GlobalOpts;

#[derive(Parser, Debug)]
#[command(name = "console", version, about = "Plugin-driven console shell")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the configuration aggregated from plugin descriptors
    Plugins(PluginsArgs),

    /// Start the shell, apply state changes and report live controllers
    Run(RunArgs),
}

fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let opts = &cli.opts;
    commands::setup_logging(opts);

    match cli.command {
        Command::Plugins(args) => commands::plugins::cmd_plugins(opts, &args),
        Command::Run(args) => {
            // Step order across --set/--unset/--submit is only visible in the raw matches.
            let run = matches
                .subcommand_matches("run")
                .context("missing run arguments")?;
            commands::run::cmd_run(opts, &args, run)
        }
    }
}
