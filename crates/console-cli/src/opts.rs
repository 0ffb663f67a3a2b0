//! Global CLI options.

use clap::Args;

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// JSON output envelope
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output (implies --json)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Suppress warnings in the output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Debug-level logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}
