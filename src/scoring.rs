// 📊 Scoring - rank CIK candidates by address evidence
// total_score = addr_score + 0.5 * name_score; addr_score = city + zip bonus

use crate::candidates::Candidate;
use crate::normalize::{normalize_city, normalize_zip5};
use crate::store::SubmissionsStore;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// A candidate after address and filing-metadata scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub cik10: String,
    pub edgar_name: String,
    pub name_score: f64,

    /// city similarity (0-1) + exact-zip bonus (0 or 1)
    pub addr_score: f64,

    /// addr_score + 0.5 * name_score
    pub total_score: f64,

    /// Raw city string from the address slot that produced the best similarity
    pub matched_city: Option<String>,

    /// Normalized zip that matched exactly, when any slot did
    pub matched_zip: Option<String>,

    pub form: Option<String>,
    pub accession: Option<String>,
    pub filing_date: Option<String>,
}

/// Token-set similarity between two city strings.
///
/// Both sides are normalized, split into token sets, and compared through
/// their intersection: ratio(intersection, intersection + left-only tokens)
/// vs ratio(intersection, intersection + right-only tokens), keeping the max.
/// This rewards partial overlap ("NEW YORK CITY" vs "NEW YORK" scores 1.0)
/// where a whole-string comparison would not.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let a = normalize_city(a);
    let b = normalize_city(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_set: BTreeSet<&str> = a.split(' ').collect();
    let b_set: BTreeSet<&str> = b.split(' ').collect();

    let join = |set: &BTreeSet<&str>| set.iter().copied().collect::<Vec<_>>().join(" ");

    let inter = join(&a_set.intersection(&b_set).copied().collect());
    let a_only = join(&a_set.difference(&b_set).copied().collect());
    let b_only = join(&b_set.difference(&a_set).copied().collect());

    let with = |rem: &str| {
        if rem.is_empty() {
            inter.clone()
        } else if inter.is_empty() {
            rem.to_string()
        } else {
            format!("{} {}", inter, rem)
        }
    };

    let s1 = strsim::normalized_levenshtein(&inter, &with(&a_only));
    let s2 = strsim::normalized_levenshtein(&inter, &with(&b_only));
    s1.max(s2)
}

/// Score candidates against the query city/zip and rank them.
///
/// Each candidate's document is fetched once via the store (which memoizes);
/// a missing document scores with empty addresses and metadata rather than
/// failing. Output is sorted by total_score desc, then addr_score desc, with
/// filing date desc as a pure tie-break, and truncated to `limit`.
pub fn rank_candidates(
    candidates: &[Candidate],
    city: &str,
    zip5: &str,
    store: &SubmissionsStore,
    limit: usize,
) -> Result<Vec<RankedCandidate>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let zip_in = normalize_zip5(zip5);

    let mut ranked = Vec::with_capacity(candidates.len());
    for cand in candidates {
        let doc = store.get(&cand.cik10)?;

        let mut city_score = 0.0_f64;
        let mut matched_city: Option<String> = None;
        let mut zip_bonus = 0.0_f64;
        let mut matched_zip: Option<String> = None;

        if let Some(doc) = doc.as_deref() {
            for slot in doc.address_slots().into_iter().flatten() {
                if let Some(slot_city) = slot.city.as_deref() {
                    let s = token_set_ratio(city, slot_city);
                    if s > city_score {
                        city_score = s;
                        matched_city = Some(slot_city.to_string());
                    }
                }
                if !zip_in.is_empty() {
                    let slot_zip = normalize_zip5(slot.zip_code.as_deref().unwrap_or(""));
                    if !slot_zip.is_empty() && slot_zip == zip_in {
                        zip_bonus = 1.0;
                        matched_zip = Some(slot_zip);
                    }
                }
            }
        }

        let meta = doc
            .as_deref()
            .map(|d| d.latest_filing())
            .unwrap_or_default();

        let addr_score = city_score + zip_bonus;
        let total_score = addr_score + 0.5 * cand.name_score;

        ranked.push(RankedCandidate {
            cik10: cand.cik10.clone(),
            edgar_name: cand.edgar_name.clone(),
            name_score: cand.name_score,
            addr_score,
            total_score,
            matched_city,
            matched_zip,
            form: meta.form,
            accession: meta.accession,
            filing_date: meta.filing_date,
        });
    }

    // total_score dominates; filing date only ever breaks exact score ties
    ranked.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
            .then(
                b.addr_score
                    .partial_cmp(&a.addr_score)
                    .unwrap_or(Ordering::Equal),
            )
            .then_with(|| b.filing_date.cmp(&a.filing_date))
    });
    ranked.truncate(limit);

    debug!(count = ranked.len(), "candidates ranked");
    Ok(ranked)
}

// ============================================================================
// TESTS
// ============================================================================
