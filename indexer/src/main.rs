use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_core::persist::{load_snapshot, save_meta, save_snapshot, IndexPaths, MetaFile, FORMAT_VERSION};
use folio_core::{top_n, Analyzer, BoostSignals, Document, IndexConfig, PruneConfig, Snapshot};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One book as exported by the catalogue database.
#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "descript")]
    description: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    review_score: Option<serde_json::Value>,
    #[serde(default)]
    review_count: Option<serde_json::Value>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query book search snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Field to index; repeat for several (default: all book fields)
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Minimum number of documents a term must occur in
        #[arg(long, default_value_t = 5)]
        min_df: usize,
        /// Maximum fraction of documents a term may occur in
        #[arg(long, default_value_t = 0.95)]
        max_df_ratio: f64,
        /// Stem tokens with the English Snowball stemmer
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Strip diacritics before tokenizing
        #[arg(long, default_value_t = false)]
        fold_diacritics: bool,
    },
    /// Run one query against a built snapshot and print the ranked books as JSON
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Field to search
        #[arg(long, default_value = "description")]
        field: String,
        /// Number of results
        #[arg(long, default_value_t = folio_core::DEFAULT_TOP_N)]
        k: usize,
        /// Query text
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, fields, min_df, max_df_ratio, stem, fold_diacritics } => {
            let mut config = IndexConfig {
                prune: PruneConfig { min_df, max_df_ratio },
                analyzer: Analyzer { stem, fold_diacritics },
                ..IndexConfig::default()
            };
            if !fields.is_empty() {
                config.fields = fields;
            }
            build_index(&input, &output, config)
        }
        Commands::Search { index, field, k, query } => search_index(&index, &field, k, &query),
    }
}

fn build_index(input: &str, output: &str, config: IndexConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&config.prune.max_df_ratio) {
        bail!("--max-df-ratio must be within [0, 1], got {}", config.prune.max_df_ratio);
    }
    let out_paths = IndexPaths::new(output);
    fs::create_dir_all(&out_paths.root)?;

    let mut inputs: Vec<InputDoc> = Vec::new();
    for file in input_files(Path::new(input))? {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut inputs)?;
        } else {
            read_json(&file, &mut inputs)?;
        }
    }
    tracing::info!(num_docs = inputs.len(), "ingested documents");

    let raw_rating: Vec<f64> = inputs.iter().map(|d| parse_number(d.review_score.as_ref())).collect();
    let raw_thumbs: Vec<f64> = inputs.iter().map(|d| parse_number(d.review_count.as_ref())).collect();
    let signals = BoostSignals::normalized_by_max(&raw_rating, &raw_thumbs);
    let docs: Vec<Document> = inputs.into_iter().map(into_document).collect();

    let snapshot = Snapshot::build(&docs, signals, config)?;
    save_snapshot(&out_paths, &snapshot)?;
    let meta = MetaFile {
        num_docs: snapshot.num_docs() as u32,
        fields: snapshot.field_names().map(str::to_string).collect(),
        created_at: build_timestamp()?,
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn build_timestamp() -> Result<String> {
    let now = time::OffsetDateTime::now_utc();
    now.format(&Rfc3339).context("formatting build timestamp")
}

fn search_index(index: &str, field: &str, k: usize, query: &str) -> Result<()> {
    let snapshot = load_snapshot(&IndexPaths::new(index)).with_context(|| format!("loading snapshot from {index}"))?;
    let hits = top_n(snapshot.search(field, query)?, k);
    let out: Vec<serde_json::Value> = hits
        .iter()
        .filter_map(|h| {
            let meta = snapshot.doc(h.doc_id)?;
            Some(serde_json::json!({ "doc_id": h.doc_id, "score": h.score, "id": meta.external_id, "title": meta.title }))
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Files are read in sorted path order so doc ids are stable across rebuilds of the same input.
fn input_files(input_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input {} does not exist", input_path.display());
    }
    Ok(files)
}

fn read_jsonl(file: &Path, out: &mut Vec<InputDoc>) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        out.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<InputDoc>) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping file without a JSON object or array"),
    }
    Ok(())
}

fn into_document(doc: InputDoc) -> Document {
    let mut out = Document::new(doc.id).with_title(doc.title);
    for (name, text) in [
        (folio_core::features::CATEGORIES, doc.categories),
        (folio_core::features::AUTHORS, doc.authors),
        (folio_core::features::PUBLISHER, doc.publisher),
        (folio_core::features::DESCRIPTION, doc.description),
    ] {
        if let Some(text) = text {
            out = out.with_field(name, text);
        }
    }
    out
}

/// Review columns arrive as numbers or numeric strings; anything else counts as 0.
fn parse_number(v: Option<&serde_json::Value>) -> f64 {
    let n = match v {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() && n > 0.0 { n } else { 0.0 }
}
