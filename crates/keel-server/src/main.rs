// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keel inference gateway and provisioning CLI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use keel_server::{build_gateway, create_router, dry_run, init_tracing, synth};
use keel_server_config::ServerConfig;

mod version;

/// Keel - provisions a managed inference endpoint and fronts it with a
/// validating HTTP gateway.
#[derive(Parser, Debug)]
#[command(name = "keel", about = "Keel inference gateway", version)]
struct Args {
	/// Config file (defaults to /etc/keel/server.toml)
	#[arg(long, global = true, env = "KEEL_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the invocation gateway (default)
	Serve,
	/// Print the provisioning template for an external deployment engine
	Synth {
		/// Pretty-print the JSON
		#[arg(long)]
		pretty: bool,
	},
	/// Provision and tear down against an in-memory control plane
	DryRun,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	match args.command.unwrap_or(Command::Serve) {
		Command::Version => println!("{}", version::format_version_info()),
		Command::Serve => serve(load(args.config)?).await?,
		Command::Synth { pretty } => {
			let config = load(args.config)?;
			println!("{}", synth(&config.provisioner, pretty)?);
		}
		Command::DryRun => {
			let config = load(args.config)?;
			let report = dry_run(&config.provisioner).await?;
			println!("{}", serde_json::to_string_pretty(&report)?);
		}
	}

	Ok(())
}

/// Loads `.env`, resolves configuration and installs the subscriber.
fn load(config_path: Option<PathBuf>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = match config_path {
		Some(path) => keel_server_config::load_config_with_file(path)?,
		None => keel_server_config::load_config()?,
	};
	init_tracing(&config.logging);
	Ok(config)
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
	let gateway = Arc::new(build_gateway(&config.gateway)?);
	let app = create_router(gateway);

	let addr = config.socket_addr();
	tracing::info!(
		addr = %addr,
		endpoint = %config.gateway.endpoint_name,
		"starting keel gateway"
	);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("Received shutdown signal");
}
