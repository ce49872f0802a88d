use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use civiq::{
    ArtifactStore, DataDir, HashingEmbedder, IndexBackendKind, IndexBuilder,
    MiniLmEmbedder, TextEmbedder, VectorSearcher, answer,
    cli::{BackendArg, Cli, Command, RebuildArgs, RecommendArgs, SearchArgs},
    error::Result,
    knowledge::{self, KnowledgeBase},
    recommend::{self, Candidate},
    segment::{InteractionRecord, UserProfile},
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("CIVIQ_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Rebuild(args) => cmd_rebuild(&data_dir, &args),
        Command::Search(args) => cmd_search(&data_dir, &args),
        Command::Recommend(args) => cmd_recommend(&args),
        Command::Status(args) => cmd_status(&data_dir, args.json),
    }
}

fn make_embedder(hashing: bool) -> Arc<dyn TextEmbedder> {
    if hashing {
        Arc::new(HashingEmbedder::new())
    } else {
        Arc::new(MiniLmEmbedder::new())
    }
}

fn backend_kind(arg: BackendArg) -> IndexBackendKind {
    match arg {
        BackendArg::Exact => IndexBackendKind::Exact,
        BackendArg::Fallback => IndexBackendKind::Fallback,
    }
}

fn cmd_rebuild(data_dir: &DataDir, args: &RebuildArgs) -> Result<()> {
    let snapshot = std::fs::read_to_string(&args.knowledge)?;
    let kb: KnowledgeBase = serde_json::from_str(&snapshot)?;
    let documents = knowledge::flatten(&kb);

    let store = ArtifactStore::new(data_dir.artifacts_dir()?);
    let builder = IndexBuilder::new(
        make_embedder(args.hashing),
        store,
        backend_kind(args.backend),
    );
    let summary = builder.build(&documents)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_search(data_dir: &DataDir, args: &SearchArgs) -> Result<()> {
    let store = ArtifactStore::new(data_dir.artifacts_dir()?);
    let searcher = VectorSearcher::new(make_embedder(args.hashing), store);

    let hits = searcher.search(&args.query, args.count)?;
    let result = answer::compose(&args.query, &hits);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.answer);
        if !result.sources.is_empty() {
            println!();
            for src in &result.sources {
                println!("  {} / {}: {}", src.source_id, src.parent_id, src.title);
            }
        }
    }
    Ok(())
}

/// The JSON envelope accepted by `recommend --input`.
#[derive(Debug, Deserialize)]
struct RecommendInput {
    #[serde(default)]
    profile: Option<UserProfile>,
    #[serde(default)]
    history: Vec<InteractionRecord>,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn cmd_recommend(args: &RecommendArgs) -> Result<()> {
    let input: RecommendInput =
        serde_json::from_str(&std::fs::read_to_string(&args.input)?)?;

    let response = recommend::respond(
        input.profile.as_ref(),
        &input.history,
        &input.candidates,
        chrono::Utc::now(),
        args.limit,
    );

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn cmd_status(data_dir: &DataDir, json: bool) -> Result<()> {
    let store = ArtifactStore::new(data_dir.artifacts_dir()?);
    let artifact = store.load()?;
    let generation = store.current_generation()?;

    let (documents, backend) = match &artifact {
        Some(a) => (a.documents.len(), a.backend.as_str()),
        None => (0, "none"),
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "data_dir": data_dir.root().display().to_string(),
                "generation": generation,
                "documents": documents,
                "backend": backend,
            })
        );
    } else {
        println!("Data directory: {}", data_dir.root().display());
        match generation {
            Some(generation) => {
                println!("Generation: {generation}");
                println!("Documents: {documents}");
                println!("Backend: {backend}");
            }
            None => println!("No index published."),
        }
    }
    Ok(())
}
