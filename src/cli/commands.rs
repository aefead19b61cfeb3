use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::dispatcher::{Dispatcher, Request};
use crate::echo::echo;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::router::{RouteLookup, Router};
use crate::runtime_config::RuntimeConfig;
use crate::table::{parse_method, HandlerRegistry, RouteTable};

/// Command-line interface for inspecting route tables
#[derive(Debug, Parser)]
#[command(name = "brrtrouter-dispatch")]
#[command(about = "Inspect and exercise BRRTRouter route tables", long_about = None)]
pub struct Cli {
    /// Runtime config file (YAML, TOML or JSON); BRRTR_* variables override it
    #[arg(long, global = true, env = "BRRTR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Install a log subscriber (BRRTR_LOG_* controls it)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a route table and print its routes
    Check {
        /// Route table file (YAML, TOML or JSON)
        #[arg(short, long)]
        table: PathBuf,
    },
    /// Resolve one request against a route table
    Resolve {
        #[arg(short, long)]
        table: PathBuf,
        /// HTTP method, e.g. GET
        method: String,
        /// Request path; a query string is ignored
        path: String,
    },
    /// Run one request through the matched chain with echo handlers
    Dispatch {
        #[arg(short, long)]
        table: PathBuf,
        method: String,
        /// Request path with optional query string
        uri: String,
        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

/// Registry used by the CLI: built-in middleware, echo for everything else.
#[must_use]
pub fn cli_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::with_builtin_middleware();
    registry.set_fallback(echo("echo"));
    registry
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path),
        None => Ok(RuntimeConfig::from_env()),
    }
}

fn load_router(table: &Path, config: &RuntimeConfig) -> Result<(RouteTable, Router)> {
    let route_table = RouteTable::from_file(table)?;
    let mut router = Router::with_config(config);
    router
        .extend_from_table(&route_table, &cli_registry())
        .with_context(|| format!("route table {} is invalid", table.display()))?;
    if config.log_routes {
        router.dump_routes();
    }
    Ok((route_table, router))
}

/// Parse the command line and run it against stdout.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)
}

/// Run a parsed command, writing human-readable output to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let _guard = if cli.verbose {
        init_logging_with_config(&LogConfig::from_env())?
    } else {
        None
    };
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Check { table } => {
            let (route_table, router) = load_router(table, &config)?;
            let registry = cli_registry();
            writeln!(out, "{} routes OK", router.len())?;
            for entry in router.routes() {
                writeln!(
                    out,
                    "  {:<7} {:<40} chain={}",
                    entry.method.as_str(),
                    entry.pattern,
                    entry.chain.len()
                )?;
            }
            let echoed: Vec<&str> = route_table
                .referenced_names()
                .into_iter()
                .filter(|name| !registry.contains(name))
                .collect();
            if !echoed.is_empty() {
                writeln!(out, "served by echo: {}", echoed.join(", "))?;
            }
        }
        Commands::Resolve {
            table,
            method,
            path,
        } => {
            let (_, router) = load_router(table, &config)?;
            let method = parse_method(method)?;
            let path = path.split_once('?').map_or(path.as_str(), |(p, _)| p);
            match router.resolve(&method, path) {
                RouteLookup::Match(m) => {
                    writeln!(out, "MATCH {} {}", m.entry.method, m.entry.pattern)?;
                    for (name, value) in m.params.iter() {
                        writeln!(out, "  {name} = {value}")?;
                    }
                }
                RouteLookup::MethodNotAllowed { allowed } => {
                    writeln!(out, "METHOD NOT ALLOWED (allow: {})", allowed.header_value())?;
                }
                RouteLookup::NotFound => writeln!(out, "NOT FOUND")?,
            }
        }
        Commands::Dispatch {
            table,
            method,
            uri,
            headers,
            body,
        } => {
            let (_, router) = load_router(table, &config)?;
            let mut request = Request::new(parse_method(method)?, uri);
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .with_context(|| format!("header '{header}' must look like 'name: value'"))?;
                request = request.header(name.trim(), value.trim());
            }
            if let Some(body) = body {
                let body: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
                request = request.body(body);
            }

            let dispatcher = Dispatcher::with_config(router, config);
            let response = dispatcher.handle(request);
            writeln!(out, "HTTP {}", response.status)?;
            for (name, value) in &response.headers {
                writeln!(out, "{name}: {value}")?;
            }
            writeln!(out)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&response.body)?)?;
        }
    }
    Ok(())
}
