mod constraints;
mod entity_store;
mod errors;
mod graph_store;
mod importer;
mod memory_store;
mod neo4j_storage;
mod records;
mod resolver;
mod retry;
mod upsert;

use anyhow::{bail, Context, Result};
use entity_store::{Dataset, EntityStore};
use errors::ImportError;
use graph_store::{GraphStore, NodeLabel, RelType};
use importer::Importer;
use memory_store::MemoryGraph;
use neo4j_storage::Neo4jStore;
use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};
use upsert::{BatchConfig, DEFAULT_BATCH_SIZE};

#[derive(Debug)]
struct Config {
    neo4j_uri: String,
    neo4j_user: String,
    neo4j_password: String,
    data_dir: PathBuf,
    batch_size: usize,
    max_retries: u32,
    dry_run: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            neo4j_uri: get("NEO4J_URI").unwrap_or_else(|| "bolt://localhost:7687".to_string()),
            neo4j_user: get("NEO4J_USER").unwrap_or_else(|| "neo4j".to_string()),
            neo4j_password: get("NEO4J_PASSWORD").unwrap_or_else(|| "password".to_string()),
            data_dir: get("IMPORT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output_entities")),
            batch_size: parse_var(&get, "IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            max_retries: parse_var(&get, "IMPORT_MAX_RETRIES", DEFAULT_MAX_ATTEMPTS)?,
            dry_run: parse_var(&get, "IMPORT_DRY_RUN", false)?,
        };

        if config.batch_size == 0 {
            bail!("IMPORT_BATCH_SIZE must be greater than zero");
        }
        if config.max_retries == 0 {
            bail!("IMPORT_MAX_RETRIES must be greater than zero");
        }
        Ok(config)
    }

    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            retry: RetryPolicy::new(self.max_retries),
        }
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting graph import...");

    // Store is dropped inside run() on both paths
    match run().await {
        Ok(()) => {
            info!("👋 Import finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ CRITICAL ERROR: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let batch = config.batch_config();

    let dataset = Dataset::load(&EntityStore::new(&config.data_dir))
        .context("Failed to load entity collections")?;
    if dataset.properties.is_empty() {
        return Err(ImportError::EmptyProperties.into());
    }

    if config.dry_run {
        info!("🧪 Dry run: importing into an in-memory graph");
        let graph = MemoryGraph::new();
        import(&graph, batch, &dataset).await?;
        info!(
            "   In-memory graph: {} users, {} properties, {} BOOKED, {} MANAGES",
            graph.node_count(NodeLabel::User),
            graph.node_count(NodeLabel::Property),
            graph.edge_count(RelType::Booked),
            graph.edge_count(RelType::Manages)
        );
        return Ok(());
    }

    let store = Neo4jStore::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        &batch.retry,
    )
    .await
    .context("Failed to connect to Neo4j")?;

    import(&store, batch, &dataset).await
}

async fn import(store: &dyn GraphStore, config: BatchConfig, dataset: &Dataset) -> Result<()> {
    let mut importer = Importer::new(store, config);
    let summary = importer
        .run(dataset)
        .await
        .with_context(|| format!("Import stopped in state {:?}", importer.stage()))?;
    summary.log();
    Ok(())
}

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;
