//! Thin smoke-test driver: loads configuration, stands up a project, ingests
//! a few documents, and runs a sample query end to end. Not an HTTP server —
//! the network surface lives outside this crate.

use anyhow::Result;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[cfg(feature = "mock")]
#[tokio::main]
async fn main() -> Result<()> {
    use std::collections::HashMap;

    use kbcore::{Config, ProjectManager, ProjectStore, QueryOptions};
    use tracing::info;

    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    config.validate()?;

    let store = ProjectStore::open_in_memory()?;
    let manager = ProjectManager::new(config, store, kbcore::BACKEND_KIND_MOCK, "", None);

    let project = manager
        .create_project(
            None,
            "demo",
            "smoke-test project",
            "all-MiniLM-L6-v2",
            HashMap::new(),
        )
        .await?;
    info!(project_id = %project.project_id, "created project");

    manager
        .ingest_document(
            &project.project_id,
            "rust is a systems programming language focused on safety and speed",
            Some("rust-overview".to_string()),
            None,
            HashMap::new(),
        )
        .await?;
    manager
        .ingest_document(
            &project.project_id,
            "python is a dynamically typed language popular for data science",
            Some("python-overview".to_string()),
            None,
            HashMap::new(),
        )
        .await?;

    let result = manager
        .query_project(&project.project_id, "rust programming", QueryOptions::default())
        .await?;

    for (rank, scored) in result.results.iter().enumerate() {
        println!("{}. {} (score {:.3})", rank + 1, scored.document.name, scored.score);
    }

    let stats = manager.get_project_stats(&project.project_id).await?;
    info!(documents = stats.documents, terms = stats.terms, "final project stats");

    Ok(())
}

#[cfg(not(feature = "mock"))]
fn main() {
    eprintln!("Run with: cargo run --bin kbd --features mock");
}
