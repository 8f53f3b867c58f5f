//! Character sheet tracker.
//!
//! A line-oriented interface over a character sheet session, suitable for
//! scripting and automated testing:
//!
//! ```bash
//! SHEET_STORE_PATH=party.json cargo run -p sheet
//! cargo run -p sheet -- --store party.json
//! ```

mod headless;

use sheet_core::StoreConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays a clean protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = parse_config_from_args(&args);
    headless::run_headless(config).await?;
    Ok(())
}

/// Build the store configuration from `--store <path>`, falling back to the
/// environment.
fn parse_config_from_args(args: &[String]) -> StoreConfig {
    match args.iter().position(|a| a == "--store") {
        Some(i) => match args.get(i + 1) {
            Some(path) => StoreConfig::new(path),
            None => {
                eprintln!("--store needs a path, using {}", sheet_core::persist::STORE_PATH_VAR);
                StoreConfig::from_env()
            }
        },
        None => StoreConfig::from_env(),
    }
}

fn print_help() {
    println!("sheet - character resource tracker");
    println!();
    println!("USAGE:");
    println!("    sheet [--store <path>]");
    println!();
    println!("OPTIONS:");
    println!("    --store <path>    Table file to load and save characters");
    println!("    -h, --help        Print this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    SHEET_STORE_PATH  Table file, when --store is not given");
    println!("    RUST_LOG          Log filter (default: info)");
    println!();
    println!("Without a table file the tracker runs in memory and saves fail.");
    println!("Type `help` once running for the list of commands.");
}
