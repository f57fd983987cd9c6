use ainovel::core::config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "ainovel",
    version,
    about = "Generate a serialized novel through the AI backend and keep the story locally"
)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Use canned responses instead of the backend
    #[arg(long)]
    pub demo: bool,

    /// Talk to the local development backend
    #[arg(long)]
    pub local: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a settings file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Ask the backend for story ideas
    Ideas {
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Start a new story from an interactive form
    New,
    /// Generate the next episode
    Continue,
    /// List stored episodes
    List,
    /// Print one episode (1-based)
    Show { number: usize },
    /// Write a snapshot of the story and session
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the stored story with a snapshot file
    Import { file: PathBuf },
    /// Delete the stored story and session
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Character gallery
    Character {
        #[command(subcommand)]
        action: CharacterAction,
    },
    /// Location gallery
    Location {
        #[command(subcommand)]
        action: LocationAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CharacterAction {
    Show { id: String },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Random {
        #[arg(long)]
        gender: Option<String>,
    },
    /// Hand the character to the next `new`
    Use { id: String },
}

#[derive(Debug, Subcommand)]
pub enum LocationAction {
    Show { id: String },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Random,
    /// Hand the location to the next `new`
    Use { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags_and_subcommand() {
        let cli = Cli::parse_from(["ainovel", "--demo", "show", "2"]);
        assert!(cli.demo);
        assert_eq!(cli.config, PathBuf::from("config.yml"));
        assert!(matches!(cli.command, Command::Show { number: 2 }));
    }

    #[test]
    fn test_parse_catalog_actions() {
        let cli = Cli::parse_from(["ainovel", "character", "random", "--gender", "female"]);
        match cli.command {
            Command::Character {
                action: CharacterAction::Random { gender },
            } => assert_eq!(gender.as_deref(), Some("female")),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["ainovel", "--config", "alt.yml", "init", "--force"]);
        assert_eq!(cli.config, PathBuf::from("alt.yml"));
        assert!(matches!(cli.command, Command::Init { force: true }));

        let cli = Cli::parse_from(["ainovel", "location", "delete", "7", "--yes"]);
        assert!(matches!(
            cli.command,
            Command::Location {
                action: LocationAction::Delete { yes: true, .. }
            }
        ));
    }
}
