//! Topology Viz - network place tree server
//!
//! Serves the nested switch/port/MAC tree for a topology snapshot, or prints
//! it to the terminal.

use clap::Parser;
use std::path::PathBuf;
use topology_viz::render::render_text;
use topology_viz::tree::ROOT_LEVEL;
use topology_viz::{
    BuildOptions, Error, Result, ServerConfig, TopologyServer, TopologySnapshot, TreeBuilder,
};

/// Network topology tree server
#[derive(Parser, Debug)]
#[command(name = "topology-viz")]
#[command(version)]
#[command(about = "Nested switch/port/MAC tree view of a network topology", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8880)]
    port: u16,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Snapshot document to load at startup
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Print the tree for the snapshot and exit
    #[arg(long, requires = "snapshot")]
    print: bool,

    /// Only print the tree rooted at this device
    #[arg(long, requires = "print")]
    root: Option<String>,

    /// Maximum devices on one root-to-leaf path
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u64).range(1..))]
    max_depth: u64,

    /// Drop failed subtrees instead of failing the whole tree
    #[arg(long)]
    prune: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let build = BuildOptions {
        max_depth: usize::try_from(args.max_depth).unwrap_or(usize::MAX),
        prune_failed_subtrees: args.prune,
    };
    let snapshot = args
        .snapshot
        .as_ref()
        .map(TopologySnapshot::from_file)
        .transpose()?;

    if args.print {
        let snapshot = snapshot.ok_or_else(|| Error::Config("--print needs --snapshot".into()))?;
        return print_trees(&snapshot, args.root.as_deref(), build);
    }

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        enable_cors: !args.no_cors,
        enable_tracing: args.verbose > 0,
        build,
    };

    let server = match snapshot {
        Some(snapshot) => TopologyServer::with_snapshot(config, snapshot),
        None => {
            log::info!("No snapshot given; PUT one to /api/place");
            TopologyServer::new(config)
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutdown signal received");
    };

    server.start_with_shutdown(shutdown).await
}

fn print_trees(snapshot: &TopologySnapshot, root: Option<&str>, build: BuildOptions) -> Result<()> {
    let builder = TreeBuilder::for_snapshot(snapshot, build);
    let trees = match root {
        Some(root) => vec![builder.build(root, &snapshot.tree, ROOT_LEVEL)?],
        None => builder.build_forest(&snapshot.tree)?,
    };
    for tree in &trees {
        print!("{}", render_text(tree));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_depth_must_be_positive() {
        assert!(Args::try_parse_from(["topology-viz", "--max-depth", "0"]).is_err());

        let args = Args::try_parse_from(["topology-viz", "--max-depth", "3"]).unwrap();
        assert_eq!(args.max_depth, 3);
        assert_eq!(Args::try_parse_from(["topology-viz"]).unwrap().max_depth, 64);
    }
}
