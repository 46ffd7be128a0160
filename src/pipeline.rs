// 🔗 Pipeline - end-to-end wiring: query → candidates → scoring → resolution → SIC
// Batch mode reads a CSV of (name, city, zip) rows and writes one result row each

use crate::candidates::{generate_candidates, NameIndex};
use crate::normalize::{normalize_name, normalize_zip5};
use crate::resolution::{force_top_candidate, resolve_cik, Resolution, ResolutionStatus};
use crate::scoring::{rank_candidates, RankedCandidate};
use crate::sic::SicCache;
use crate::store::SubmissionsStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Tunable thresholds and policy for the resolution pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum name similarity for candidate generation
    pub threshold: f64,

    /// Maximum candidates carried through generation and scoring
    pub limit: usize,

    /// Minimum total_score for acceptance
    pub min_accept: f64,

    /// Minimum margin over the runner-up for acceptance
    pub gap_accept: f64,

    /// Candidates retained in ambiguous diagnostics
    pub keep_top: usize,

    /// SIC cache entry lifetime in hours
    pub sic_ttl_hours: i64,

    /// Promote ambiguous rows to their top candidate (audited override)
    pub force_ambiguous: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            threshold: 0.85,
            limit: 10,
            min_accept: 1.6,
            gap_accept: 0.3,
            keep_top: 3,
            sic_ttl_hours: 24,
            force_ambiguous: false,
        }
    }
}

/// Explicit column choices for batch input; `None` means auto-detect.
#[derive(Debug, Clone, Default)]
pub struct ColumnSpec {
    pub name: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

/// One output row of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    pub name: String,
    pub city: String,
    pub zip5: String,
    pub status: ResolutionStatus,
    pub cik10: String,
    pub reason: String,
    pub sic: String,
    pub sic_description: String,
    pub industry_subtype: String,
    pub forced: bool,
}

/// The full resolution engine: name index + submissions store + SIC cache.
pub struct Pipeline {
    index: NameIndex,
    store: SubmissionsStore,
    sic_cache: SicCache,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        index: NameIndex,
        store: SubmissionsStore,
        sic_cache: SicCache,
        config: PipelineConfig,
    ) -> Self {
        Pipeline {
            index,
            store,
            sic_cache,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the matching stages for one query, without the SIC lookup.
    ///
    /// Returns the full ranked list (for audit) together with the terminal
    /// resolution, already forced if the config says so.
    pub fn resolve_query(
        &self,
        name: &str,
        city: &str,
        zip: &str,
    ) -> Result<(Vec<RankedCandidate>, Resolution)> {
        let cfg = &self.config;
        let name_norm = normalize_name(name);
        let zip5 = normalize_zip5(zip);

        let cands = generate_candidates(&name_norm, &self.index, cfg.threshold, cfg.limit);
        let ranked = rank_candidates(&cands, city, &zip5, &self.store, cfg.limit)?;
        let mut resolution = resolve_cik(&ranked, &zip5, cfg.min_accept, cfg.gap_accept, cfg.keep_top);

        if cfg.force_ambiguous {
            resolution = force_top_candidate(resolution);
        }

        debug!(
            name = %name_norm,
            status = resolution.status.as_str(),
            "query resolved"
        );
        Ok((ranked, resolution))
    }

    /// Resolve one row end-to-end, including the SIC classification.
    ///
    /// Missing inputs short-circuit to not_found without running the stages;
    /// a row never fails the batch.
    pub fn run_row(&self, name: &str, city: &str, zip: &str) -> Result<RowResult> {
        let name = name.trim();
        let city = city.trim();
        let zip = zip.trim();

        if name.is_empty() || city.is_empty() || zip.is_empty() {
            return Ok(RowResult {
                name: name.to_string(),
                city: city.to_string(),
                zip5: normalize_zip5(zip),
                status: ResolutionStatus::NotFound,
                cik10: String::new(),
                reason: "missing inputs".to_string(),
                sic: String::new(),
                sic_description: String::new(),
                industry_subtype: String::new(),
                forced: false,
            });
        }

        let (_, resolution) = self.resolve_query(name, city, zip)?;
        self.finish_row(name, city, zip, resolution)
    }

    /// Attach the SIC classification to an accepted (or forced) resolution.
    fn finish_row(
        &self,
        name: &str,
        city: &str,
        zip: &str,
        resolution: Resolution,
    ) -> Result<RowResult> {
        let mut out = RowResult {
            name: name.to_string(),
            city: city.to_string(),
            zip5: normalize_zip5(zip),
            status: resolution.status,
            cik10: resolution.cik10.clone().unwrap_or_default(),
            reason: resolution.reason,
            sic: String::new(),
            sic_description: String::new(),
            industry_subtype: String::new(),
            forced: resolution.forced,
        };

        if resolution.status == ResolutionStatus::Accepted {
            if let Some(cik10) = &resolution.cik10 {
                // No classification is not a failure: fields stay blank
                if let Some(info) = self.sic_cache.get_sic(cik10, &self.store)? {
                    out.sic = info.sic;
                    out.sic_description = info.sic_description.clone();
                    out.industry_subtype = info.sic_description;
                }
            }
        }

        Ok(out)
    }

    /// Resolve every row of a CSV table, writing one output row per input row.
    ///
    /// Columns are taken from `columns` or auto-detected case-insensitively.
    /// Missing required columns are fatal for the whole batch. When `audit`
    /// is given, one JSON record per row (query, ranked list, final decision)
    /// is appended to that file.
    pub fn run_csv(
        &self,
        input: &Path,
        output: &Path,
        columns: &ColumnSpec,
        audit: Option<&Path>,
    ) -> Result<Vec<RowResult>> {
        let mut reader = csv::Reader::from_path(input)
            .with_context(|| format!("Failed to open input CSV: {:?}", input))?;

        let headers = reader
            .headers()
            .context("Failed to read CSV headers")?
            .clone();
        let (name_idx, city_idx, zip_idx) = locate_columns(&headers, columns)?;

        let mut writer = csv::Writer::from_path(output)
            .with_context(|| format!("Failed to open output CSV: {:?}", output))?;

        let mut audit_file = match audit {
            Some(path) => Some(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("Failed to open audit log: {:?}", path))?,
            )),
            None => None,
        };

        let mut results = Vec::new();
        for record in reader.records() {
            let record = record.context("Failed to read CSV record")?;
            let name = record.get(name_idx).unwrap_or("").trim().to_string();
            let city = record.get(city_idx).unwrap_or("").trim().to_string();
            let zip = record.get(zip_idx).unwrap_or("").trim().to_string();

            let row = if name.is_empty() || city.is_empty() || zip.is_empty() {
                self.run_row(&name, &city, &zip)?
            } else {
                let (ranked, resolution) = self.resolve_query(&name, &city, &zip)?;

                if let Some(f) = audit_file.as_mut() {
                    let entry = serde_json::json!({
                        "query": {
                            "name": normalize_name(&name),
                            "city": city,
                            "zip5": normalize_zip5(&zip),
                        },
                        "ranked": ranked,
                        "final": resolution,
                    });
                    writeln!(f, "{}", entry).context("Failed to write audit record")?;
                }

                self.finish_row(&name, &city, &zip, resolution)?
            };

            writer.serialize(&row).context("Failed to write output row")?;
            results.push(row);
        }

        writer.flush().context("Failed to flush output CSV")?;
        if let Some(mut f) = audit_file {
            f.flush().context("Failed to flush audit log")?;
        }

        info!(rows = results.len(), output = %output.display(), "batch complete");
        Ok(results)
    }
}

/// Aliases tried, in order, when auto-detecting each input column.
const NAME_ALIASES: &[&str] = &["normalized_name", "company name", "company", "name"];
const CITY_ALIASES: &[&str] = &["city"];
const ZIP_ALIASES: &[&str] = &[
    "zip",
    "zip code",
    "zip_code",
    "zip-code",
    "postal code",
    "postal_code",
    "postal",
];

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    // exact alias match first, then substring
    for alias in aliases {
        if let Some(i) = lower.iter().position(|h| h == alias) {
            return Some(i);
        }
    }
    for alias in aliases {
        if let Some(i) = lower.iter().position(|h| h.contains(alias)) {
            return Some(i);
        }
    }
    None
}

/// Resolve the three required columns, or fail naming exactly the missing ones.
fn locate_columns(
    headers: &csv::StringRecord,
    columns: &ColumnSpec,
) -> Result<(usize, usize, usize)> {
    let explicit = |want: &Option<String>| -> Result<Option<usize>> {
        match want {
            Some(label) => {
                let found = headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(label));
                match found {
                    Some(i) => Ok(Some(i)),
                    None => bail!("column {:?} not present in input CSV", label),
                }
            }
            None => Ok(None),
        }
    };

    let name_idx = match explicit(&columns.name)? {
        Some(i) => Some(i),
        None => find_column(headers, NAME_ALIASES),
    };
    let city_idx = match explicit(&columns.city)? {
        Some(i) => Some(i),
        None => find_column(headers, CITY_ALIASES),
    };
    let zip_idx = match explicit(&columns.zip)? {
        Some(i) => Some(i),
        None => find_column(headers, ZIP_ALIASES),
    };

    let mut missing = Vec::new();
    if name_idx.is_none() {
        missing.push("name");
    }
    if city_idx.is_none() {
        missing.push("city");
    }
    if zip_idx.is_none() {
        missing.push("zip");
    }
    if !missing.is_empty() {
        bail!(
            "input CSV missing required column(s): {}. Rename the columns or pass them explicitly.",
            missing.join(", ")
        );
    }

    // Guarded by the missing check above
    Ok((
        name_idx.unwrap_or_default(),
        city_idx.unwrap_or_default(),
        zip_idx.unwrap_or_default(),
    ))
}

// ============================================================================
// TESTS
// ============================================================================
