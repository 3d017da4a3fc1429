mod ingest;
mod poll;
mod store;
mod trail;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::trail::{Advisory, Fix, TrailCache};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "fixtrail")]
#[command(about = "GPS fix trail cache service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingest worker, poller and HTTP API
    Serve {
        #[arg(long, default_value = "fixtrail.yaml")]
        config: String,
    },
    /// Print the cached trail once and exit
    Window {
        #[arg(long, default_value = "fixtrail.yaml")]
        config: String,
    },
    /// Append one fix to the trail and exit
    Record {
        /// Fix encoded as JSON, e.g. '{"latitude":48.2,"longitude":16.37,"timestamp":1700000000000}'
        fix: String,
        #[arg(long, default_value = "fixtrail.yaml")]
        config: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config),
        Commands::Window { config } => window(&config),
        Commands::Record { fix, config } => record(&fix, &config),
    }
}

fn serve(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn window(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let cache = TrailCache::new(config.store.resolve());
        if !cache.is_available() {
            eprintln!("{}; showing empty trail", Advisory::StoreUnavailable);
        }

        let trail = cache.read().await;
        match serde_json::to_string_pretty(&trail) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error encoding trail: {}", e);
                ExitCode::FAILURE
            }
        }
    })
}

fn record(fix_json: &str, path: &str) -> ExitCode {
    let fix: Fix = match serde_json::from_str(fix_json) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error parsing fix: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let cache = TrailCache::new(config.store.resolve());
        if !cache.is_available() {
            eprintln!("{}; fix not recorded", Advisory::StoreUnavailable);
            return ExitCode::FAILURE;
        }

        // A successful append always holds at least the new fix.
        let trail = cache.append(fix).await;
        if trail.is_empty() {
            eprintln!("{}", Advisory::CacheWriteFailed);
            return ExitCode::FAILURE;
        }

        println!("trail now holds {} fixes", trail.len());
        ExitCode::SUCCESS
    })
}
