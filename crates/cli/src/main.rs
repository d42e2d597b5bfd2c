use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Books and reviews service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Create missing indices and exit; non-zero if any could not be created
    EnsureIndices,
    /// Print the resolved settings
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let _telemetry = bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "starting bookshelf service");
            bookshelf_app::app::serve(settings).await
        }
        Command::EnsureIndices => {
            let _telemetry = bookshelf_telemetry::init(&settings.telemetry)?;
            let report = bookshelf_app::app::ensure_indices(&settings).await?;
            tracing::info!(
                created = report.created.len(),
                existing = report.existing.len(),
                "indices ready"
            );
            Ok(())
        }
        Command::Config => {
            println!("{settings:#?}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["bookshelf", "ensure-indices"]).unwrap();
        assert!(matches!(cli.command, Some(Command::EnsureIndices)));

        let cli = Cli::try_parse_from(["bookshelf"]).unwrap();
        assert!(cli.command.is_none());
    }
}
