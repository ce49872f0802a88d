use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "civiq",
    about = "Semantic search and recommendations over a citizen-services knowledge base"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rebuild the search index from a knowledge base snapshot
    Rebuild(RebuildArgs),
    /// Search the published index
    Search(SearchArgs),
    /// Score candidates and education rules for a user
    Recommend(RecommendArgs),
    /// Show data directory and index status
    Status(StatusArgs),
}

/// Which retrieval strategy to build the index for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Flat exact inner-product index
    Exact,
    /// Raw embedding matrix served by linear scan
    Fallback,
}

// -- Rebuild --

#[derive(Debug, Parser)]
pub struct RebuildArgs {
    /// Path to the knowledge base snapshot (JSON)
    #[arg(long)]
    pub knowledge: PathBuf,

    /// Retrieval backend to build for
    #[arg(long, value_enum, default_value_t = BackendArg::Exact)]
    pub backend: BackendArg,

    /// Use the offline hashing embedder instead of the sentence model
    #[arg(long)]
    pub hashing: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Use the offline hashing embedder instead of the sentence model
    #[arg(long)]
    pub hashing: bool,
}

// -- Recommend --

#[derive(Debug, Parser)]
pub struct RecommendArgs {
    /// Path to a JSON file with profile, history, and candidates
    #[arg(long)]
    pub input: PathBuf,

    /// Maximum number of scored candidates to return
    #[arg(long, default_value = "5")]
    pub limit: usize,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["civiq", "search", "passport renewal"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "passport renewal");
                assert_eq!(args.count, 5);
                assert!(!args.json);
                assert!(!args.hashing);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_rebuild_backend() {
        let cli = Cli::parse_from([
            "civiq",
            "rebuild",
            "--knowledge",
            "kb.json",
            "--backend",
            "fallback",
        ]);
        match cli.command {
            Command::Rebuild(args) => {
                assert_eq!(args.backend, BackendArg::Fallback);
                assert_eq!(args.knowledge, PathBuf::from("kb.json"));
            }
            _ => panic!("expected rebuild command"),
        }
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::parse_from(["civiq", "status", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Status(_)));
    }
}
