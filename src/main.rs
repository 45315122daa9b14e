use clap::Parser;
use crosstrader::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "crosstrader=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(Cli::parse())
}
