// ⚖️ Resolution - accept, flag ambiguous, or reject the ranked candidates

use crate::scoring::RankedCandidate;
use serde::{Deserialize, Serialize};

/// Terminal state of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Accepted,
    Ambiguous,
    NotFound,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Accepted => "accepted",
            ResolutionStatus::Ambiguous => "ambiguous",
            ResolutionStatus::NotFound => "not_found",
        }
    }
}

/// Terminal decision for one query, with a diagnostic trail for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub status: ResolutionStatus,

    /// Present iff accepted (or forced); always the top-ranked candidate
    pub cik10: Option<String>,

    /// Human-readable diagnostic for the decision
    pub reason: String,

    /// Up to keep_top candidates retained for audit
    pub candidates: Vec<RankedCandidate>,

    /// True only when an ambiguous result was promoted by the caller
    pub forced: bool,
}

impl Resolution {
    fn not_found(reason: String, candidates: Vec<RankedCandidate>) -> Self {
        Resolution {
            status: ResolutionStatus::NotFound,
            cik10: None,
            reason,
            candidates,
            forced: false,
        }
    }
}

/// Decide on a ranked candidate list.
///
/// Accept iff the top candidate clears `min_accept` and leads the runner-up
/// by at least `gap_accept` (or has no runner-up). A top candidate above
/// `min_accept` but inside the margin is ambiguous: no CIK is chosen, the
/// top `keep_top` candidates stay in the trail. Everything else, including
/// an empty list, is not_found.
pub fn resolve_cik(
    ranked: &[RankedCandidate],
    zip5: &str,
    min_accept: f64,
    gap_accept: f64,
    keep_top: usize,
) -> Resolution {
    let Some(top) = ranked.first() else {
        return Resolution::not_found("no candidates".to_string(), Vec::new());
    };

    let trail: Vec<RankedCandidate> = ranked.iter().take(keep_top).cloned().collect();

    if top.total_score < min_accept {
        return Resolution::not_found(
            format!(
                "insufficient confidence: top score {:.3} below min_accept {:.3} (zip {})",
                top.total_score,
                min_accept,
                if zip5.is_empty() { "none" } else { zip5 }
            ),
            trail,
        );
    }

    match ranked.get(1) {
        None => Resolution {
            status: ResolutionStatus::Accepted,
            cik10: Some(top.cik10.clone()),
            reason: format!(
                "single candidate with score {:.3} at or above min_accept {:.3}",
                top.total_score, min_accept
            ),
            candidates: trail,
            forced: false,
        },
        Some(second) => {
            let margin = top.total_score - second.total_score;
            if margin >= gap_accept {
                Resolution {
                    status: ResolutionStatus::Accepted,
                    cik10: Some(top.cik10.clone()),
                    reason: format!(
                        "top score {:.3} leads runner-up by {:.3} (gap_accept {:.3})",
                        top.total_score, margin, gap_accept
                    ),
                    candidates: trail,
                    forced: false,
                }
            } else {
                Resolution {
                    status: ResolutionStatus::Ambiguous,
                    cik10: None,
                    reason: format!(
                        "margin {:.3} between {} and {} below gap_accept {:.3}",
                        margin, top.cik10, second.cik10, gap_accept
                    ),
                    candidates: trail,
                    forced: false,
                }
            }
        }
    }
}

/// Promote an ambiguous resolution to its top candidate.
///
/// Policy layered above `resolve_cik`, never folded into it: the ambiguous
/// provenance stays in the reason and `forced` is set, so the override is
/// always auditable. Non-ambiguous resolutions pass through unchanged.
pub fn force_top_candidate(resolution: Resolution) -> Resolution {
    if resolution.status != ResolutionStatus::Ambiguous {
        return resolution;
    }
    let Some(top) = resolution.candidates.first() else {
        return resolution;
    };
    Resolution {
        status: ResolutionStatus::Accepted,
        cik10: Some(top.cik10.clone()),
        reason: format!("forced top candidate despite ambiguity: {}", resolution.reason),
        forced: true,
        candidates: resolution.candidates,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rc(cik10: &str, total_score: f64) -> RankedCandidate {
        RankedCandidate {
            cik10: cik10.to_string(),
            edgar_name: "TEST".to_string(),
            name_score: 1.0,
            addr_score: total_score - 0.5,
            total_score,
            matched_city: None,
            matched_zip: None,
            form: None,
            accession: None,
            filing_date: None,
        }
    }

    #[test]
    fn test_accept_with_clear_margin() {
        // margin 0.5 >= gap 0.3
        let ranked = vec![rc("0000000001", 2.0), rc("0000000002", 1.5)];
        let res = resolve_cik(&ranked, "62704", 1.6, 0.3, 3);
        assert_eq!(res.status, ResolutionStatus::Accepted);
        assert_eq!(res.cik10.as_deref(), Some("0000000001"));
        assert!(!res.forced);
    }

    #[test]
    fn test_ambiguous_on_narrow_margin() {
        // margin 0.2 < gap 0.3
        let ranked = vec![rc("0000000001", 2.0), rc("0000000002", 1.8)];
        let res = resolve_cik(&ranked, "62704", 1.6, 0.3, 3);
        assert_eq!(res.status, ResolutionStatus::Ambiguous);
        assert!(res.cik10.is_none());
        assert!(res.reason.contains("0.200"));
        assert_eq!(res.candidates.len(), 2);
    }

    #[test]
    fn test_not_found_below_min_accept() {
        let ranked = vec![rc("0000000001", 1.0)];
        let res = resolve_cik(&ranked, "62704", 1.6, 0.3, 3);
        assert_eq!(res.status, ResolutionStatus::NotFound);
        assert!(res.cik10.is_none());
        assert!(res.reason.contains("insufficient confidence"));
    }

    #[test]
    fn test_not_found_on_empty_list() {
        let res = resolve_cik(&[], "62704", 1.6, 0.3, 3);
        assert_eq!(res.status, ResolutionStatus::NotFound);
        assert_eq!(res.reason, "no candidates");
        assert!(res.candidates.is_empty());
    }

    #[test]
    fn test_single_candidate_accepts_without_margin() {
        let ranked = vec![rc("0000000001", 1.7)];
        let res = resolve_cik(&ranked, "", 1.6, 0.3, 3);
        assert_eq!(res.status, ResolutionStatus::Accepted);
    }

    #[test]
    fn test_keep_top_bounds_trail() {
        let ranked = vec![
            rc("0000000001", 2.0),
            rc("0000000002", 1.9),
            rc("0000000003", 1.85),
            rc("0000000004", 1.8),
        ];
        let res = resolve_cik(&ranked, "", 1.6, 0.3, 3);
        assert_eq!(res.candidates.len(), 3);
    }

    #[test]
    fn test_force_promotes_ambiguous_only() {
        let ranked = vec![rc("0000000001", 2.0), rc("0000000002", 1.8)];
        let ambiguous = resolve_cik(&ranked, "", 1.6, 0.3, 3);
        let forced = force_top_candidate(ambiguous.clone());
        assert_eq!(forced.status, ResolutionStatus::Accepted);
        assert_eq!(forced.cik10.as_deref(), Some("0000000001"));
        assert!(forced.forced);
        assert!(forced.reason.contains(&ambiguous.reason));

        let not_found = resolve_cik(&[], "", 1.6, 0.3, 3);
        let untouched = force_top_candidate(not_found);
        assert_eq!(untouched.status, ResolutionStatus::NotFound);
        assert!(!untouched.forced);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ResolutionStatus::NotFound).unwrap();
        assert_eq!(json, r#""not_found""#);
    }
}
