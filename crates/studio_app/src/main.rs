mod app;
mod cli;
mod config;
mod console;
mod logging;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::initialize(cli.log);
    let config = config::load(&cli.config)?;
    let plan = app::RunPlan::resolve(&cli, config);
    app::run(plan)
}
