//! CLI commands for the workbench
//!
//! Implements command handlers for the CLI interface.

use crate::api::{create_router, ApiState, WsBroadcaster};
use crate::artifact::{artifact_id, ArtifactRegistry, CompiledArtifact, RawArtifact};
use crate::chain::DevChain;
use crate::session::{SessionManager, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Parse and display an artifact file
pub fn cmd_inspect(file: &Path) -> CliResult<()> {
    let bytes = std::fs::read(file)?;
    let raw: RawArtifact = serde_json::from_slice(&bytes)?;
    let source_id = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let artifact = CompiledArtifact::from_raw(&source_id, raw)?;

    println!("📦 {}", artifact.name);
    println!("   Id:       {}", artifact.id);
    println!("   Source:   {}", artifact.source);
    println!("   Bytecode: {} bytes", artifact.bytecode.len());

    match artifact.constructor() {
        Some(ctor) => println!("   Constructor({})", ctor.input_types().join(", ")),
        None => println!("   No constructor"),
    }

    let functions: Vec<_> = artifact.abi.iter().filter(|f| f.is_function()).collect();
    if functions.is_empty() {
        println!("   No callable functions");
    } else {
        println!("   Functions ({}):", functions.len());
        for f in functions {
            let marker = if f.constant { "call" } else { "tx  " };
            println!(
                "   [{}] {}({}) -> ({})",
                marker,
                f.name,
                f.input_types().join(", "),
                f.output_types().join(", ")
            );
        }
    }

    Ok(())
}

/// Print the derived artifact id for a file
pub fn cmd_artifact_id(file: &Path, source: Option<&str>) -> CliResult<()> {
    let bytes = std::fs::read(file)?;
    let raw: RawArtifact = serde_json::from_slice(&bytes)?;
    let source_id = match source {
        Some(s) => s.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    println!("{}", artifact_id(&source_id, &raw.contract_name));
    Ok(())
}

/// Run the API server over an in-process dev chain
pub async fn cmd_serve(
    port: u16,
    artifacts_dir: Option<&PathBuf>,
    account: &str,
) -> CliResult<()> {
    let store = Arc::new(SessionStore::new(account));
    let chain = Arc::new(DevChain::new());
    let manager = Arc::new(SessionManager::new(store.clone(), chain));
    let registry = Arc::new(ArtifactRegistry::new(store.clone()));
    let ws_broadcaster = Arc::new(WsBroadcaster::new(store.clone()));

    if let Some(dir) = artifacts_dir {
        let loaded = registry.load_dir(dir)?;
        println!("📦 Loaded {} artifact(s) from {:?}", loaded, dir);
    }

    let state = ApiState {
        manager,
        registry,
        ws_broadcaster,
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    println!("🚀 Workbench API starting on http://localhost:{}", port);
    println!("   Active account: {}", account);
    println!();
    println!("📖 Available endpoints:");
    println!("   GET    /health                          - Health check");
    println!("   GET    /ws                              - Transaction stream");
    println!("   GET    /api/session                     - Session overview");
    println!("   GET    /api/account                     - Active account");
    println!("   PUT    /api/account                     - Replace account");
    println!("   GET    /api/artifacts                   - List artifacts");
    println!("   POST   /api/artifacts/{{source_id}}       - Load artifact");
    println!("   POST   /api/deploy                      - Deploy artifact");
    println!("   GET    /api/instances                   - List instances");
    println!("   GET    /api/instances/{{id}}              - Instance detail");
    println!("   POST   /api/instances/{{id}}/call         - Read-only invoke");
    println!("   POST   /api/instances/{{id}}/tx           - State-changing invoke");
    println!("   DELETE /api/instances/{{id}}              - Dispose instance");
    println!("   DELETE /api/instances/{{id}}/state/{{fn}}   - Clear cached outputs");
    println!("   GET    /api/history                     - Transaction history");
    println!();

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!("\n📴 Shutting down workbench...");
        std::process::exit(0);
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
