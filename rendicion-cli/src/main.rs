use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod audit_cmd;
mod config;
mod ocr;
mod prompt;
mod report_cmd;
mod request_cmd;
mod scan_cmd;
mod state;

use request_cmd::RequestCommand;

#[derive(Parser, Debug)]
#[command(
    name = "rendicion",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RENDICION_BUILD_SHA"), ")"),
    about = "Expense requests and their reports, from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage ~/.rendicion/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Create, list, inspect and delete expense requests
    Request {
        #[command(subcommand)]
        command: RequestCommand,
    },

    /// Fill in the expense report for a pending request (resumes a saved draft)
    Report {
        /// Request id
        id: String,
    },

    /// Scan receipt images against a request and preview the result (nothing is saved)
    Scan {
        /// Request id
        id: String,

        /// Receipt images (jpg, png, webp, heic)
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Extract expense lines from the text of a submitted report
    Audit {
        /// Plain text of the report
        text_file: PathBuf,

        /// Also write the lines to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a config file with the defaults (keeps an existing one)
    Init,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Request { command } => {
            let cfg = config::load_config()?;
            request_cmd::run(command, &cfg)?;
        }

        Command::Report { id } => {
            let cfg = config::load_config()?;
            report_cmd::run(&id, &cfg).await?;
        }

        Command::Scan { id, images } => {
            let cfg = config::load_config()?;
            scan_cmd::run(&id, &images, &cfg).await?;
        }

        Command::Audit { text_file, csv } => {
            let cfg = config::load_config()?;
            audit_cmd::run(&text_file, csv.as_deref(), &cfg)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so they never interleave with prompts on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_needs_at_least_one_image() {
        assert!(Cli::try_parse_from(["rendicion", "scan", "123"]).is_err());
        let cli = Cli::try_parse_from(["rendicion", "scan", "123", "a.jpg", "b.png"]).unwrap();
        match cli.command {
            Command::Scan { id, images } => {
                assert_eq!(id, "123");
                assert_eq!(images.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_audit_csv_flag() {
        let cli = Cli::try_parse_from(["rendicion", "audit", "r.txt", "--csv", "out.csv"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Audit { csv: Some(_), .. }
        ));
    }
}
