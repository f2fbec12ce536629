use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;

use lattice_rs::docstore::{DocumentStore, MemoryStore, Reference};
use lattice_rs::lattice::resolver::Resolver;
use lattice_rs::lattice::seed::SeedLoader;
use lattice_rs::lattice::server::{serve, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Optional seed file loaded into the store at startup
        #[arg(short, long)]
        seed: Option<String>,
    },
    /// Resolve one document from a seed file and print the expanded tree
    Resolve {
        /// Seed file with the documents to resolve against
        #[arg(short, long)]
        seed: String,

        /// Document path, e.g. tasks/t1
        #[arg(short = 'd', long)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Serve { port, seed } => {
            let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
            if let Some(path) = seed {
                let written = SeedLoader::load(&path, store.as_ref()).await?;
                log::info!("loaded {} documents from {}", written, path);
            }
            serve(port, AppState::new(store)).await?;
        }
        Commands::Resolve { seed, path } => {
            let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
            SeedLoader::load(&seed, store.as_ref()).await?;

            let reference = Reference::parse(&path)?;
            let resolver = Resolver::new(store);
            let tree = resolver.resolve_reference(&reference).await;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
    }

    Ok(())
}
