use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use punto_registro::{Dataset, JsonFileGateway, PersistenceGateway, RecordStore};

const DEFAULT_DATA_PATH: &str = "data/db.json";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => run_seed(data_path(args.get(2))),
        Some("stats") => run_stats(data_path(args.get(2))),
        _ => {
            eprintln!("Usage: punto-registro <seed|stats> [path]");
            eprintln!("  seed   Write a fresh dataset document (taxonomy only, no points)");
            eprintln!("  stats  Print aggregate statistics for an existing dataset");
            eprintln!();
            eprintln!("The dataset path defaults to DATA_PATH or {}", DEFAULT_DATA_PATH);
            std::process::exit(2);
        }
    }
}

fn data_path(arg: Option<&String>) -> PathBuf {
    arg.cloned()
        .or_else(|| env::var("DATA_PATH").ok())
        .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
        .into()
}

fn run_seed(path: PathBuf) -> Result<()> {
    let gateway = JsonFileGateway::new(&path);
    if gateway.exists() {
        bail!("refusing to overwrite existing dataset at {}", path.display());
    }

    let dataset = Dataset::with_default_taxonomy();
    gateway
        .commit(&dataset)
        .with_context(|| format!("seeding dataset at {}", path.display()))?;

    println!("Seeded dataset at {}", path.display());
    println!(
        "  {} categories, {} states, 0 points",
        dataset.taxonomy.categories.len(),
        dataset.taxonomy.states.len()
    );
    Ok(())
}

fn run_stats(path: PathBuf) -> Result<()> {
    let store = RecordStore::open(Box::new(JsonFileGateway::new(&path)))
        .with_context(|| format!("loading dataset from {}", path.display()))?;

    let stats = store.statistics();
    println!("Collection points: {}", stats.total);

    println!("\nBy category:");
    for (category, count) in &stats.by_category {
        let name = store
            .taxonomy()
            .resolve_category(category)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        println!("  {:<6} {:<28} {}", category, name, count);
    }

    println!("\nBy state:");
    for (state, count) in &stats.by_state {
        println!("  {:<6} {}", state, count);
    }

    println!("\nBy subcategory:");
    for (subcategory, count) in &stats.by_subcategory {
        println!("  {:<28} {}", subcategory, count);
    }

    Ok(())
}
