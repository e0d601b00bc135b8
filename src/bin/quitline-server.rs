// ABOUTME: Server binary entry point: config load, logging init, database connect, serve
// ABOUTME: CLI flags override environment-provided settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

#![allow(clippy::print_stderr)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use quitline_server::auth::AuthManager;
use quitline_server::config::ServerConfig;
use quitline_server::database::Database;
use quitline_server::logging;
use quitline_server::resources::ServerResources;
use quitline_server::server::run_http_server;

/// Quitline coaching API server
#[derive(Debug, Parser)]
#[command(name = "quitline-server", version, about)]
struct Args {
    /// HTTP port to bind (overrides HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args = Args::parse();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    let database = match Database::new(&config.database_url).await {
        Ok(database) => database,
        Err(e) => {
            eprintln!("Database initialization failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let auth_manager = AuthManager::new(&config.jwt_secret, config.jwt_expiry_hours);
    let resources = Arc::new(ServerResources::new(database, auth_manager, config));

    if let Err(e) = run_http_server(resources).await {
        eprintln!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
