use grappler::commands::{self, Cli};
use grappler::utils::{init_logger, GrapplerPaths};
use grappler::{Context, GrapplerResult};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = init_logger(cli.log_level()) {
        eprintln!("Warning: failed to initialize logger: {}", err);
    }

    match main_impl(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(1)
        }
    }
}

async fn main_impl(cli: Cli) -> GrapplerResult<()> {
    let ctx = Context::new(GrapplerPaths::resolve()?);
    commands::execute(&ctx, cli.command).await
}
