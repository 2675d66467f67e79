//! # Thrones CLI
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! thrones serve --config thrones.toml --port 8080
//!
//! # Print the effective configuration
//! thrones config --config thrones.toml
//! ```

use colored::Colorize;
use thrones_cli::server;
use thrones_storage::ThronesConfig;

/// Options shared by the subcommands.
#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config: Option<String>,
    port: Option<u16>,
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().ok_or("--config requires a path")?;
                options.config = Some(path.clone());
            }
            "--port" | "-p" => {
                let raw = iter.next().ok_or("--port requires a value")?;
                let port = raw.parse().map_err(|_| format!("invalid port '{}'", raw))?;
                options.port = Some(port);
            }
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }
    Ok(options)
}

fn load_config(options: &CliOptions) -> Result<ThronesConfig, String> {
    let mut config = ThronesConfig::load(options.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(port) = options.port {
        config.server.port = port;
    }
    Ok(config)
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let rest = args.get(2..).unwrap_or_default();

    let result = match args.get(1).map(|s| s.as_str()) {
        Some("serve") => run_serve(rest),
        Some("config") => run_config(rest),
        Some("--help") | Some("-h") | None => {
            print_help();
            Ok(())
        }
        Some(other) => Err(format!("unknown command '{}'", other)),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red(), e);
        eprintln!("Run 'thrones --help' for usage.");
        std::process::exit(1);
    }
}

fn print_help() {
    println!("{}", format!("Thrones v{}", env!("CARGO_PKG_VERSION")).bold().cyan());
    println!("HTTP facade over the Westeros graph\n");
    println!("USAGE:");
    println!("    thrones <COMMAND> [OPTIONS]\n");
    println!("COMMANDS:");
    println!("    serve          Start the HTTP server");
    println!("    config         Print the effective configuration (password redacted)\n");
    println!("OPTIONS:");
    println!("    --config, -c <PATH>   TOML configuration file");
    println!("    --port, -p <PORT>     Override server.port (serve only)");
    println!("    --help, -h            Show this help message\n");
    println!("Settings can be overridden with THRONES__<SECTION>__<KEY> environment variables,");
    println!("e.g. THRONES__DATABASE__URL=neo4j://db:7687. Log filters come from THRONES_LOG.");
}

fn print_banner() {
    println!();
    println!("{}", "╔══════════════════════════════════════════════╗".cyan());
    println!("{}", "║            🐺 Thrones graph service          ║".cyan());
    println!("{}", "║     Houses, regions, seats and their kin     ║".cyan());
    println!("{}", "╚══════════════════════════════════════════════╝".cyan());
    println!();
}

fn run_serve(args: &[String]) -> Result<(), String> {
    let options = parse_options(args)?;
    let config = load_config(&options)?;

    print_banner();
    println!(
        "{}",
        format!("Starting {} backend on port {}...", config.database.backend, config.server.port).bold()
    );

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("failed to create Tokio runtime: {}", e))?;
    rt.block_on(server::run_server(config)).map_err(|e| e.to_string())
}

fn run_config(args: &[String]) -> Result<(), String> {
    let options = parse_options(args)?;
    let config = load_config(&options)?;
    let text = config.to_toml_redacted().map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}
