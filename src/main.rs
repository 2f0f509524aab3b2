mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use code_atlas::git::DiffRequest;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "code_atlas=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deps { path, file, format } => {
            let config = cli::load_config(&path, cli.config.as_deref())?;
            cli::show_dependencies(&path, &config, file, &format)?;
        }
        Commands::Changed {
            path,
            head,
            base,
            event,
            format,
        } => {
            let config = cli::load_config(&path, cli.config.as_deref())?;
            let request = DiffRequest::from_event(&event, base, head)?;
            cli::show_changed(&path, &config, request, &format).await?;
        }
        Commands::Plan {
            path,
            head,
            base,
            event,
            format,
        } => {
            let config = cli::load_config(&path, cli.config.as_deref())?;
            let request = DiffRequest::from_event(&event, base, head)?;
            cli::show_plan(&path, &config, request, &format).await?;
        }
        Commands::Index { path } => {
            let config = cli::load_config(&path, cli.config.as_deref())?;
            cli::show_index(&path, &config)?;
        }
    }

    Ok(())
}
