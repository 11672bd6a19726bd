//! Stage graph CLI.
//!
//! Provides the `stagegraph` binary, which loads an execution trace from a
//! JSON file, builds its stage graph once and reports on it. Subcommands:
//! `nodes` prints the pipeline nodes as JSON, `edges` prints one edge per
//! line, and `check` validates the graph and prints a summary.
//!
//! The trace path may also be given through `STAGEGRAPH_TRACE`. Diagnostics
//! go to stderr; `-v` raises the log level to debug.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::Level;

use stagegraph_core::{CoreError, TraceGraph, TraceTable};

/// Stage graph tools.
#[derive(Parser)]
#[command(name = "stagegraph", about = "Build stage DAGs from execution traces")]
struct Cli {
    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the pipeline nodes of a trace as JSON.
    Nodes {
        /// Path to the JSON trace file.
        #[arg(short, long, env = "STAGEGRAPH_TRACE")]
        trace: PathBuf,

        /// Print single-line JSON instead of pretty JSON.
        #[arg(long)]
        compact: bool,
    },
    /// Print every edge as `from -> to`.
    Edges {
        /// Path to the JSON trace file.
        #[arg(short, long, env = "STAGEGRAPH_TRACE")]
        trace: PathBuf,
    },
    /// Build and validate the graph, then print a one-line summary.
    Check {
        /// Path to the JSON trace file.
        #[arg(short, long, env = "STAGEGRAPH_TRACE")]
        trace: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Nodes { trace, compact } => run_nodes(&trace, compact),
        Commands::Edges { trace } => run_edges(&trace),
        Commands::Check { trace } => run_check(&trace),
    };
    process::exit(exit_code);
}

/// Load a trace file and build its graph.
fn load(path: &Path) -> Result<TraceGraph, CoreError> {
    let file = File::open(path)?;
    let table = TraceTable::from_reader(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), rows = table.len(), "loaded trace");
    Ok(TraceGraph::new(table))
}

/// Map an error to an exit code: 1 = invalid graph or trace content,
/// 3 = I/O or parse error.
fn exit_code_for(err: &CoreError) -> i32 {
    match err {
        CoreError::Io(_) | CoreError::Json(_) => 3,
        _ => 1,
    }
}

fn report(path: &Path, err: &CoreError) -> i32 {
    eprintln!("Error: {}: {}", path.display(), err);
    exit_code_for(err)
}

/// Execute the nodes subcommand.
fn run_nodes(path: &Path, compact: bool) -> i32 {
    let graph = match load(path) {
        Ok(g) => g,
        Err(e) => return report(path, &e),
    };

    let nodes = graph.pipeline_nodes();
    let json = if compact {
        serde_json::to_string(&nodes)
    } else {
        serde_json::to_string_pretty(&nodes)
    };
    match json {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => report(path, &CoreError::Json(e)),
    }
}

/// Execute the edges subcommand.
fn run_edges(path: &Path) -> i32 {
    let graph = match load(path) {
        Ok(g) => g,
        Err(e) => return report(path, &e),
    };

    let stages = graph.graph();
    for id in stages.node_ids() {
        for succ in stages.successors(id) {
            println!("{} -> {}", id, succ);
        }
    }
    0
}

/// Execute the check subcommand.
fn run_check(path: &Path) -> i32 {
    let graph = match load(path) {
        Ok(g) => g,
        Err(e) => return report(path, &e),
    };

    if let Err(e) = graph.validate() {
        return report(path, &e);
    }

    let stages = graph.graph();
    let failed = stages.error_table().len();
    println!(
        "ok: {} rows, {} nodes, {} edges, {} failed node(s)",
        graph.trace().len(),
        stages.len(),
        stages.edge_count(),
        failed
    );
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::NodeId;

    #[test]
    fn io_and_parse_errors_exit_with_three() {
        let io = CoreError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(exit_code_for(&io), 3);

        let parse = serde_json::from_str::<u32>("x").unwrap_err();
        assert_eq!(exit_code_for(&CoreError::Json(parse)), 3);
    }

    #[test]
    fn content_errors_exit_with_one() {
        let dup = CoreError::DuplicateNode { id: NodeId(1) };
        assert_eq!(exit_code_for(&dup), 1);

        let cycle = CoreError::Cycle { node: NodeId(2) };
        assert_eq!(exit_code_for(&cycle), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load(Path::new("/nonexistent/trace.json"));
        assert!(matches!(result, Err(CoreError::Io(_))));
    }

    #[test]
    fn cli_parses_nodes_subcommand() {
        let cli = Cli::try_parse_from(["stagegraph", "-v", "nodes", "--trace", "t.json", "--compact"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Nodes { trace, compact } => {
                assert_eq!(trace, PathBuf::from("t.json"));
                assert!(compact);
            }
            _ => panic!("expected nodes subcommand"),
        }
    }
}
