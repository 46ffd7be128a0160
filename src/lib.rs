// CIK Resolver - Core Library
// Offline record linkage: noisy (name, city, zip) rows → canonical 10-digit
// CIK from the EDGAR filer index, plus the filer's SIC classification.
// Exposes all modules for use in the CLI and tests

pub mod candidates;
pub mod normalize;
pub mod pipeline;
pub mod resolution;
pub mod scoring;
pub mod sic;
pub mod store;
pub mod submissions;

// Re-export commonly used types
pub use candidates::{generate_candidates, Candidate, NameIndex};
pub use normalize::{normalize_cik10, normalize_city, normalize_name, normalize_zip5};
pub use pipeline::{ColumnSpec, Pipeline, PipelineConfig, RowResult};
pub use resolution::{force_top_candidate, resolve_cik, Resolution, ResolutionStatus};
pub use scoring::{rank_candidates, token_set_ratio, RankedCandidate};
pub use sic::{SicCache, SicInfo};
pub use store::SubmissionsStore;
pub use submissions::{Address, Addresses, FilingMeta, Filings, RecentFilings, Submissions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
