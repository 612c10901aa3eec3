use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use sql_user_directory::config::AppConfig;
use sql_user_directory::provider::ProviderRegistry;
use sql_user_directory::resource;

#[derive(Parser, Debug)]
#[command(name = "sql-user-directory")]
#[command(about = "User directory backed by an existing SQL database")]
struct Args {
    /// Configuration file path (default: config.yaml)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config file)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let mut app_config =
        if args.config == "config.yaml" && !std::path::Path::new("config.yaml").exists() {
            println!("No config.yaml found, using default configuration:");
            println!("   - Realm 'default' on an empty in-memory SQLite database");
            println!("   - Placeholder only: the default queries expect a `users` table that does not exist,");
            println!("     so every lookup answers empty until a config.yaml points at a real database\n");
            AppConfig::default_config()
        } else {
            AppConfig::load_from_file(&args.config)
                .map_err(|e| format!("Failed to load configuration: {}", e))?
        };

    if let Some(port) = args.port {
        app_config.server.port = port;
    }
    if let Some(host) = args.host {
        app_config.server.host = host;
    }

    let registry = Arc::new(ProviderRegistry::new(&app_config));

    // Realms that fail here are retried on first request
    for realm in &app_config.realms {
        match registry.get_or_configure(&realm.id).await {
            Ok(_) => info!(realm = %realm.id, rdbms = %realm.database.rdbms, "Realm ready"),
            Err(e) => error!(realm = %realm.id, error = %e, "Realm configuration failed"),
        }
    }

    let app = resource::router(registry.clone());

    let host: std::net::IpAddr = app_config.server.host.parse().unwrap_or_else(|_| {
        eprintln!(
            "Invalid host address: {}, using 127.0.0.1",
            app_config.server.host
        );
        [127, 0, 0, 1].into()
    });
    let addr = SocketAddr::from((host, app_config.server.port));
    println!("User directory listening on {}", addr);
    for realm in &app_config.realms {
        println!("  - {} ({}): /realms/{}/users", realm.display_name(), realm.database.rdbms, realm.id);
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    registry.close().await;
    Ok(())
}
