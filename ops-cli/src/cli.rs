use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DocVault document store maintenance
#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(version)]
#[command(about = "Maintenance jobs and offline checks for the DocVault document store")]
#[command(long_about = "Runs the periodic maintenance jobs of the document store \
    (temp cleanup, daily backup, retention) and offline upload validation.\n\n\
    Settings come from DOCVAULT_* environment variables, optionally loaded from a .env file.")]
pub struct Cli {
    /// Storage root, overriding DOCVAULT_STORAGE_ROOT
    #[arg(long, env = "DOCVAULT_STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show file counts and sizes per storage area
    Stats,

    /// Securely delete stale files from temp storage
    CleanupTemp {
        /// Age threshold in hours, overriding DOCVAULT_TEMP_MAX_AGE_HOURS
        #[arg(long)]
        max_age_hours: Option<u64>,
    },

    /// Copy encrypted documents into today's backup and prune old backups
    DailyBackup,

    /// Delete documents past their retention period
    EnforceRetention,

    /// Check a local file against the policy for a document type
    Validate {
        /// File to check
        file: PathBuf,

        /// Document type identifier, e.g. identity_card
        #[arg(short, long)]
        document_type: String,

        /// Declared MIME type; guessed from the extension if omitted
        #[arg(short, long)]
        mime_type: Option<String>,
    },

    /// List the policy for every document type
    Policies,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from([
            "docvault",
            "--format",
            "json",
            "validate",
            "scan.pdf",
            "--document-type",
            "rental_contract",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Validate {
                file,
                document_type,
                mime_type,
            } => {
                assert_eq!(file, PathBuf::from("scan.pdf"));
                assert_eq!(document_type, "rental_contract");
                assert!(mime_type.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_cleanup_override() {
        let cli = Cli::try_parse_from(["docvault", "cleanup-temp", "--max-age-hours", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::CleanupTemp { max_age_hours: Some(2) }));
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["docvault"]).is_err());
    }
}
