use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use cik_resolver::{
    generate_candidates, normalize_name, normalize_zip5, rank_candidates, ColumnSpec, NameIndex,
    Pipeline, PipelineConfig, SicCache, SubmissionsStore,
};

/// Offline record linkage: company name/city/ZIP → CIK → SIC classification
#[derive(Parser, Debug)]
#[command(name = "cik-resolver", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to the name→CIKs index JSON
    #[arg(long)]
    names_json: PathBuf,

    /// Submissions source: directory of CIK##########.json files or a .tar archive
    #[arg(long)]
    submissions_path: PathBuf,
}

#[derive(Args, Debug)]
struct TuningArgs {
    /// Minimum name similarity for candidate generation
    #[arg(long, default_value_t = 0.85)]
    threshold: f64,

    /// Maximum candidates carried through the pipeline
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Minimum total score for acceptance
    #[arg(long, default_value_t = 1.6)]
    min_accept: f64,

    /// Minimum margin over the runner-up for acceptance
    #[arg(long, default_value_t = 0.3)]
    gap_accept: f64,

    /// Candidates retained in ambiguous diagnostics
    #[arg(long, default_value_t = 3)]
    keep_top: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a single query and print the decision as JSON
    Resolve {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        #[arg(long)]
        name: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        zip5: String,
    },

    /// Print the ranked candidate list for a single query as JSON
    Score {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        #[arg(long)]
        name: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        zip5: String,
    },

    /// Resolve every row of a CSV and write results with SIC classification
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Input CSV with name/city/zip columns
        #[arg(long = "in")]
        input: PathBuf,

        /// Output CSV
        #[arg(long = "out")]
        output: PathBuf,

        /// Column for the company name (auto-detected when omitted)
        #[arg(long)]
        name_col: Option<String>,

        /// Column for the city (auto-detected when omitted)
        #[arg(long)]
        city_col: Option<String>,

        /// Column for the ZIP/postal code (auto-detected when omitted)
        #[arg(long)]
        zip_col: Option<String>,

        /// SQLite file for the SIC cache
        #[arg(long, default_value = "sic_cache.db")]
        cache_db: PathBuf,

        /// SIC cache entry lifetime in hours
        #[arg(long, default_value_t = 24)]
        sic_ttl_hours: i64,

        /// Optional JSONL audit log: per-row ranked candidates and decision
        #[arg(long)]
        audit: Option<PathBuf>,

        /// Do NOT promote ambiguous rows to their top candidate
        #[arg(long)]
        no_force_ambiguous: bool,
    },
}

fn tuning_config(tuning: &TuningArgs) -> PipelineConfig {
    PipelineConfig {
        threshold: tuning.threshold,
        limit: tuning.limit,
        min_accept: tuning.min_accept,
        gap_accept: tuning.gap_accept,
        keep_top: tuning.keep_top,
        ..Default::default()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve {
            source,
            tuning,
            name,
            city,
            zip5,
        } => {
            let config = tuning_config(&tuning);
            let pipeline = Pipeline::new(
                NameIndex::load(&source.names_json)?,
                SubmissionsStore::open(&source.submissions_path)?,
                SicCache::open_in_memory(config.sic_ttl_hours)?,
                config,
            );
            let (_, resolution) = pipeline.resolve_query(&name, &city, &zip5)?;
            let out = serde_json::json!({
                "query": {
                    "name": name,
                    "city": city,
                    "zip5": normalize_zip5(&zip5),
                },
                "final": resolution,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Score {
            source,
            tuning,
            name,
            city,
            zip5,
        } => {
            let index = NameIndex::load(&source.names_json)?;
            let store = SubmissionsStore::open(&source.submissions_path)?;
            let name_norm = normalize_name(&name);
            let cands = generate_candidates(&name_norm, &index, tuning.threshold, tuning.limit);
            let ranked = rank_candidates(
                &cands,
                &city,
                &normalize_zip5(&zip5),
                &store,
                tuning.limit,
            )?;
            let out = serde_json::json!({ "query": name_norm, "results": ranked });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Run {
            source,
            tuning,
            input,
            output,
            name_col,
            city_col,
            zip_col,
            cache_db,
            sic_ttl_hours,
            audit,
            no_force_ambiguous,
        } => {
            let config = PipelineConfig {
                sic_ttl_hours,
                force_ambiguous: !no_force_ambiguous,
                ..tuning_config(&tuning)
            };
            let pipeline = Pipeline::new(
                NameIndex::load(&source.names_json)?,
                SubmissionsStore::open(&source.submissions_path)?,
                SicCache::open(&cache_db, sic_ttl_hours)?,
                config,
            );
            let columns = ColumnSpec {
                name: name_col,
                city: city_col,
                zip: zip_col,
            };
            let rows = pipeline.run_csv(&input, &output, &columns, audit.as_deref())?;
            println!("✓ Wrote {} with {} rows", output.display(), rows.len());
        }
    }

    Ok(())
}
