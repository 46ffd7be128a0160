// 🎯 Candidate Generation - name → CIK candidates from the filer name index

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A tentative CIK match for a query name, before address scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// 10-digit zero-padded CIK
    pub cik10: String,

    /// Filer name as registered on EDGAR (the index key that matched)
    pub edgar_name: String,

    /// Name similarity: 1.0 for an exact key hit, Jaro-Winkler otherwise
    pub name_score: f64,
}

/// Read-only index from normalized filer name to one or more CIKs.
///
/// Built offline from the EDGAR company index; loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    map: HashMap<String, Vec<String>>,
}

/// On-disk shape: either a bare map or wrapped as {"map": {...}}.
#[derive(Deserialize)]
#[serde(untagged)]
enum NameIndexFile {
    Wrapped { map: HashMap<String, Vec<String>> },
    Bare(HashMap<String, Vec<String>>),
}

impl NameIndex {
    pub fn from_map(map: HashMap<String, Vec<String>>) -> Self {
        NameIndex { map }
    }

    /// Load the name→CIKs index from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read name index: {:?}", path.as_ref()))?;

        let parsed: NameIndexFile =
            serde_json::from_str(&content).context("Failed to parse name index JSON")?;

        let map = match parsed {
            NameIndexFile::Wrapped { map } => map,
            NameIndexFile::Bare(map) => map,
        };

        debug!(keys = map.len(), "name index loaded");
        Ok(NameIndex { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn get(&self, key: &str) -> Option<&Vec<String>> {
        self.map.get(key)
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }
}

/// Generate CIK candidates for a normalized query name.
///
/// An exact key hit scores 1.0. When the exact key misses (or to widen the
/// pool), every index key is compared with Jaro-Winkler and keys at or above
/// `threshold` contribute their CIKs at that similarity. Candidates are
/// deduplicated by CIK keeping the best score, sorted best-first, and
/// truncated to `limit`. An empty result is a valid outcome, not an error.
pub fn generate_candidates(
    normalized_name: &str,
    index: &NameIndex,
    threshold: f64,
    limit: usize,
) -> Vec<Candidate> {
    if normalized_name.is_empty() || limit == 0 {
        return Vec::new();
    }

    // best score seen per CIK, with the key that produced it
    let mut best: HashMap<String, (f64, String)> = HashMap::new();

    if let Some(ciks) = index.get(normalized_name) {
        for cik in ciks {
            best.insert(cik.clone(), (1.0, normalized_name.to_string()));
        }
    }

    for key in index.keys() {
        if key == normalized_name {
            continue; // already scored as exact
        }
        let score = strsim::jaro_winkler(normalized_name, key);
        if score < threshold {
            continue;
        }
        if let Some(ciks) = index.get(key) {
            for cik in ciks {
                let entry = best.entry(cik.clone()).or_insert((score, key.clone()));
                if score > entry.0 {
                    *entry = (score, key.clone());
                }
            }
        }
    }

    let mut candidates: Vec<Candidate> = best
        .into_iter()
        .map(|(cik10, (name_score, edgar_name))| Candidate {
            cik10,
            edgar_name,
            name_score,
        })
        .collect();

    // Best score first; CIK ascending as a deterministic tie-break
    candidates.sort_by(|a, b| {
        b.name_score
            .partial_cmp(&a.name_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cik10.cmp(&b.cik10))
    });
    candidates.truncate(limit);

    debug!(
        query = normalized_name,
        count = candidates.len(),
        "candidates generated"
    );
    candidates
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_index() -> NameIndex {
        let mut map = HashMap::new();
        map.insert("ACME".to_string(), vec!["0000012345".to_string()]);
        map.insert("ACME WIDGETS".to_string(), vec!["0000067890".to_string()]);
        map.insert(
            "GLOBEX".to_string(),
            vec!["0000000042".to_string(), "0000000043".to_string()],
        );
        NameIndex::from_map(map)
    }

    #[test]
    fn test_exact_hit_scores_one() {
        let cands = generate_candidates("ACME", &test_index(), 0.85, 10);
        assert_eq!(cands[0].cik10, "0000012345");
        assert_eq!(cands[0].name_score, 1.0);
    }

    #[test]
    fn test_fuzzy_fallback_above_threshold() {
        // "ACME WIDGET" is not a key but is close to "ACME WIDGETS"
        let cands = generate_candidates("ACME WIDGET", &test_index(), 0.85, 10);
        assert!(cands.iter().any(|c| c.cik10 == "0000067890"));
        let hit = cands.iter().find(|c| c.cik10 == "0000067890").unwrap();
        assert!(hit.name_score >= 0.85 && hit.name_score < 1.0);
        assert_eq!(hit.edgar_name, "ACME WIDGETS");
    }

    #[test]
    fn test_no_key_clears_threshold() {
        let cands = generate_candidates("ZZZZZZ", &test_index(), 0.85, 10);
        assert!(cands.is_empty());
    }

    #[test]
    fn test_multi_cik_key_and_limit() {
        let cands = generate_candidates("GLOBEX", &test_index(), 0.85, 1);
        assert_eq!(cands.len(), 1);
        // deterministic tie-break: lowest CIK wins at equal score
        assert_eq!(cands[0].cik10, "0000000042");
    }

    #[test]
    fn test_dedupe_keeps_best_score() {
        let mut map = HashMap::new();
        map.insert("ACME".to_string(), vec!["0000012345".to_string()]);
        map.insert("ACMES".to_string(), vec!["0000012345".to_string()]);
        let index = NameIndex::from_map(map);

        let cands = generate_candidates("ACME", &index, 0.85, 10);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].name_score, 1.0);
    }

    #[test]
    fn test_empty_query() {
        assert!(generate_candidates("", &test_index(), 0.85, 10).is_empty());
    }
}
