use clap::Parser;
use jarscope::cli::{Cli, Command};
use jarscope::{cmd_analyze, cmd_init};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so reports on stdout stay pipeable
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let exit_code = match cli.command {
        Command::Analyze(args) => cmd_analyze(args),
        Command::Init(args) => cmd_init(args),
    };

    std::process::exit(exit_code);
}
