use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tripledb::{cli::{print_entities, Repl}, storage, QueryOptions, TraverseOptions, TripleStore};

#[derive(Parser)]
#[command(name = "tripledb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "TripleDB Contributors")]
#[command(about = "TripleDB - an in-memory triple store with graph traversal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open interactive shell
    Shell {
        /// Optional: entity file (JSON array or NDJSON) to load first
        #[arg(long)]
        load: Option<PathBuf>,
    },

    /// Load an entity file and run a single query
    Query {
        /// Entity file (JSON array or NDJSON)
        path: PathBuf,

        /// type:<Name>, <predicate>:<value> or *
        query: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        skip: usize,
    },

    /// Load an entity file and walk the graph from one entity
    Traverse {
        /// Entity file (JSON array or NDJSON)
        path: PathBuf,

        /// Start entity (target entity with --reverse)
        start: String,

        /// Predicate to follow
        predicate: String,

        #[arg(long)]
        depth: Option<usize>,

        #[arg(long)]
        limit: Option<usize>,

        /// Find entities pointing at START instead
        #[arg(long)]
        reverse: bool,
    },

    /// Show triple/entity/predicate counts of an entity file
    Stats {
        /// Entity file (JSON array or NDJSON)
        path: PathBuf,
    },

    /// Print an entity file as NDJSON triples
    Export {
        /// Entity file (JSON array or NDJSON)
        path: PathBuf,
    },
}

fn open_store(path: &Path) -> anyhow::Result<TripleStore> {
    let store = TripleStore::new();
    let report = storage::load_file(&store, path)?;
    for failure in &report.failures {
        eprintln!("Warning: record {} skipped: {}", failure.record, failure.error);
    }
    Ok(store)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // If no command provided, open an empty shell
    let command = cli.command.unwrap_or(Commands::Shell { load: None });

    match command {
        Commands::Shell { load } => {
            let mut repl = Repl::new(load.as_deref())?;
            repl.run()?;
        }

        Commands::Query { path, query, limit, skip } => {
            let store = open_store(&path)?;
            let result = store.query_with(&query, QueryOptions { limit, skip })?;
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }

        Commands::Traverse { path, start, predicate, depth, limit, reverse } => {
            let store = open_store(&path)?;

            let entities = if reverse {
                store.reverse_traverse(&start, &predicate, limit)
            } else {
                let options = TraverseOptions { max_depth: depth, limit };
                store.traverse(&start, &predicate, options)
            };
            print_entities(&entities)?;
        }

        Commands::Stats { path } => {
            let store = open_store(&path)?;
            let stats = store.stats();

            println!("File: {}", path.display());
            println!("Entities: {}", stats.entities);
            println!("Triples: {}", stats.triples);
            println!("Predicates: {}", stats.predicates);
        }

        Commands::Export { path } => {
            let store = open_store(&path)?;
            let stdout = std::io::stdout();
            storage::write_triples(&store, stdout.lock())?;
        }
    }

    Ok(())
}
