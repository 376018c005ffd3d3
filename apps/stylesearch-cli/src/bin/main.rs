use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use stylesearch_catalog::LanceCatalog;
use stylesearch_cli::{load_file, product_files};
use stylesearch_core::config::{CatalogSettings, Config};
use stylesearch_core::traits::{CatalogStore, Embedder};
use stylesearch_core::types::SearchRequest;
use stylesearch_embed::get_default_embedder;
use stylesearch_hybrid::HybridSearchEngine;

const USAGE: &str = "Usage: stylesearch <ingest [dir] | count | query \"<text>\" [--limit N] [--category C] [--min-score S] [--lexical-weight W] [--semantic-weight W]>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn open_catalog(settings: &CatalogSettings) -> Result<LanceCatalog> {
    let uri = settings.resolved_uri();
    if let Some(parent) = uri.parent() { std::fs::create_dir_all(parent)?; }
    LanceCatalog::open(&uri.to_string_lossy(), &settings.table)
}

fn main() -> Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&config, &args),
        "count" => {
            let catalog = open_catalog(&config.catalog()?)?;
            println!("{}", catalog.count()?);
            Ok(())
        }
        "query" => query(&config, &args),
        _ => { eprintln!("Unknown command: {cmd}\n{USAGE}"); std::process::exit(1); }
    }
}

fn ingest(config: &Config, args: &[String]) -> Result<()> {
    let data_dir = args.first().map_or_else(
        || PathBuf::from(config.get::<String>("data.products_dir").unwrap_or_else(|_| "./data/products".to_string())),
        PathBuf::from,
    );
    if !data_dir.is_dir() { bail!("{} is not a directory", data_dir.display()); }
    let files = product_files(&data_dir);
    println!("Ingesting {} product files from {}", files.len(), data_dir.display());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut records = Vec::new();
    let mut rejected = 0usize;
    for file in &files {
        let loaded = load_file(file)?;
        rejected += loaded.rejected;
        records.extend(loaded.records);
        pb.set_message(format!("{} products", records.len()));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let catalog = open_catalog(&config.catalog()?)?;
    let written = catalog.upsert(&records)?;
    println!("Upserted {written} products ({rejected} rejected); catalog now holds {}", catalog.count()?);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1).map(String::as_str).with_context(|| format!("{flag} requires a value"))
}

fn query(config: &Config, args: &[String]) -> Result<()> {
    let settings = config.search()?;
    let mut request: Option<SearchRequest> = None;
    let mut limit = settings.default_limit;
    let (mut lexical, mut semantic) = (settings.lexical_weight, settings.semantic_weight);
    let mut min_score = settings.min_score;
    let mut category = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => { limit = flag_value(args, i, "--limit")?.parse().context("--limit expects an integer")?; i += 1; }
            "--category" => { category = Some(flag_value(args, i, "--category")?.to_string()); i += 1; }
            "--min-score" => { min_score = flag_value(args, i, "--min-score")?.parse().context("--min-score expects a number")?; i += 1; }
            "--lexical-weight" => { lexical = flag_value(args, i, "--lexical-weight")?.parse().context("--lexical-weight expects a number")?; i += 1; }
            "--semantic-weight" => { semantic = flag_value(args, i, "--semantic-weight")?.parse().context("--semantic-weight expects a number")?; i += 1; }
            text if !text.starts_with("--") && request.is_none() => request = Some(SearchRequest::new(text)),
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
        i += 1;
    }
    let Some(mut request) = request else { bail!("missing query text\n{USAGE}") };
    request = request.with_limit(limit).with_weights(lexical, semantic).with_min_score(min_score);
    if let Some(category) = category { request = request.with_category(category); }

    let catalog: Arc<dyn CatalogStore> = Arc::new(open_catalog(&config.catalog()?)?);
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&config.embedding()?)?);
    let engine = HybridSearchEngine::with_settings(catalog, embedder, settings);
    let report = engine.refresh()?;
    if !report.failures.is_empty() {
        println!("{} of {} products could not be indexed", report.failures.len(), report.scanned);
    }

    let results = engine.search(&request)?;
    if results.is_empty() { println!("No results for \"{}\"", request.query); return Ok(()); }
    for (rank, r) in results.iter().enumerate() {
        let info = &r.product_info;
        println!("{:>2}. [{:.3}] {} ({}) {} {:.2} {}", rank + 1, r.similarity_score, info.name, info.product_id, info.brand.as_deref().unwrap_or("-"), info.price, info.currency);
        println!("    {}", r.match_reasoning);
        for highlight in &r.key_similarities { println!("    - {highlight}"); }
    }
    Ok(())
}
