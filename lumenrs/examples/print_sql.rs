use std::{env, fs, path::PathBuf};

use lumen::{service::UserContext, CompiledMetricQuery, ExploreRegistry, LumenConfig, QueryService};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("Usage: print_sql <explores_dir> <query_json>");
    eprintln!(
        "Example: cargo run --example print_sql -- \
         demos/explores demos/queries/orders_by_status.json"
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let explores_dir = PathBuf::from(args.remove(0));
    let query_path = PathBuf::from(args.remove(0));

    let registry = ExploreRegistry::load_from_dir(explores_dir)?;
    let query: CompiledMetricQuery = serde_json::from_str(&fs::read_to_string(query_path)?)?;

    let service = QueryService::with_config(registry, LumenConfig::load_default());
    let compiled = service.compile(&query, &UserContext::default())?;
    println!("{}", compiled.query);
    Ok(())
}
