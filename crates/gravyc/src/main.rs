//! The gravy inference driver.
//!
//! Provides the `gravyc` command with subcommands:
//! - `gravyc infer <ast.json>` - Print the inferred type of every node
//! - `gravyc check <ast.json> --source <file>` - Report references whose type cannot be inferred
//!
//! The input is an already-parsed module in JSON form. Logging goes to
//! stderr and is controlled by the `GRAVY_LOG` environment variable.

mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use gravy_common::LineIndex;
use gravy_infer::diagnostics::{self, DiagnosticOptions};
use gravy_infer::{InferenceEngine, InferredNode};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::DriverConfig;

#[derive(Parser)]
#[command(name = "gravyc", version, about = "Best-effort type inference for Groovy-like syntax trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the inferred type of every node in a module
    Infer {
        /// Path to the module's JSON syntax tree
        ast: PathBuf,

        /// Source text the tree was parsed from, used to print line:column positions
        #[arg(long)]
        source: Option<PathBuf>,

        /// TOML file with an `[inference]` table
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit one JSON object per node instead of text
        #[arg(long)]
        json: bool,
    },
    /// Report references whose type cannot be inferred
    Check {
        /// Path to the module's JSON syntax tree
        ast: PathBuf,

        /// Source text the tree was parsed from
        #[arg(long)]
        source: PathBuf,

        /// TOML file with an `[inference]` table
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable colored diagnostics
        #[arg(long)]
        no_color: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Infer {
            ast,
            source,
            config,
            json,
        } => infer(&ast, source.as_deref(), config.as_deref(), json),
        Commands::Check {
            ast,
            source,
            config,
            no_color,
        } => check(&ast, &source, config.as_deref(), no_color),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = match std::env::var("GRAVY_LOG") {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::new("warn"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

/// Load the module at `ast` and run inference over it.
fn run(ast: &Path, config: Option<&Path>) -> Result<Vec<InferredNode>, String> {
    let text = read_file(ast)?;
    let module = gravy_ast::from_json(&text).map_err(|e| format!("Failed to load '{}': {}", ast.display(), e))?;
    let config = DriverConfig::load(config)?;
    debug!(module = %module.name, options = ?config.inference, "running inference");

    let mut engine = InferenceEngine::new().with_options(config.inference);
    let (_, nodes) = engine.collect(&module).map_err(|e| e.to_string())?;
    Ok(nodes)
}

fn infer(ast: &Path, source: Option<&Path>, config: Option<&Path>, json: bool) -> Result<(), String> {
    let nodes = run(ast, config)?;
    let index = match source {
        Some(path) => Some(LineIndex::new(&read_file(path)?)),
        None => None,
    };

    for node in &nodes {
        if json {
            let line = serde_json::to_string(node).map_err(|e| format!("Failed to encode node: {}", e))?;
            println!("{}", line);
        } else {
            println!("{}", text_line(node, index.as_ref()));
        }
    }
    Ok(())
}

fn check(ast: &Path, source: &Path, config: Option<&Path>, no_color: bool) -> Result<(), String> {
    let nodes = run(ast, config)?;
    let text = read_file(source)?;
    let options = DiagnosticOptions { color: !no_color };
    let filename = source.display().to_string();

    let reports = diagnostics::render_all(&nodes, &text, &filename, &options);
    for report in &reports {
        eprint!("{}", report);
    }
    match reports.len() {
        0 => println!("no unresolved references"),
        1 => println!("1 unresolved reference"),
        n => println!("{} unresolved references", n),
    }
    Ok(())
}

/// `kind label: type (confidence)`, prefixed with `line:col` when a source
/// index is available and the node has a span.
fn text_line(node: &InferredNode, index: Option<&LineIndex>) -> String {
    let body = format!("{} {}: {} ({})", node.kind, node.label, node.ty, node.confidence);
    match (index, node.span) {
        (Some(index), Some(span)) => {
            let (line, col) = index.line_col(span.start);
            format!("{}:{} {}", line, col, body)
        }
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravy_common::Span;

    fn node(span: Option<Span>) -> InferredNode {
        InferredNode {
            kind: "expr",
            id: Some(3),
            label: "size(..)".to_string(),
            span,
            ty: "int".to_string(),
            confidence: "exact".to_string(),
            declaring_type: Some("java.util.List<java.lang.String>".to_string()),
            declaration: None,
            extension: false,
            enclosing: "demo.Script1.run".to_string(),
        }
    }

    #[test]
    fn text_line_without_source() {
        assert_eq!(text_line(&node(Some(Span::new(4, 10))), None), "expr size(..): int (exact)");
    }

    #[test]
    fn text_line_with_position() {
        let index = LineIndex::new("def x\nx.size()\n");
        assert_eq!(
            text_line(&node(Some(Span::new(8, 14))), Some(&index)),
            "2:3 expr size(..): int (exact)"
        );
        assert_eq!(text_line(&node(None), Some(&index)), "expr size(..): int (exact)");
    }
}
