// 📄 Submissions document model - one EDGAR record per CIK
// Addresses, recent filing history, and SIC classification fields

use serde::{Deserialize, Serialize};

/// Annual-report forms preferred when picking the latest filing.
const HIGH_VALUE_FORMS: &[&str] = &["10-K", "20-F"];

/// One filer's submissions record, as served by the offline store.
///
/// Unknown fields are ignored; every field here is optional because bulk
/// records are uneven. A missing or empty document scores as empty
/// addresses and no filing metadata, never as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submissions {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sic: Option<String>,

    #[serde(default, rename = "sicDescription")]
    pub sic_description: Option<String>,

    #[serde(default)]
    pub addresses: Addresses,

    #[serde(default)]
    pub filings: Filings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Addresses {
    #[serde(default)]
    pub business: Option<Address>,

    #[serde(default)]
    pub mailing: Option<Address>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,

    #[serde(default, rename = "stateOrCountry", alias = "state")]
    pub state_or_country: Option<String>,

    #[serde(default, rename = "zipCode", alias = "zip")]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filings {
    #[serde(default)]
    pub recent: RecentFilings,
}

/// Parallel arrays in document order, newest filings typically first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentFilings {
    #[serde(default)]
    pub form: Vec<String>,

    #[serde(default, rename = "accessionNumber")]
    pub accession_number: Vec<String>,

    #[serde(default, rename = "filingDate")]
    pub filing_date: Vec<String>,
}

/// Metadata of the filing chosen to represent a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilingMeta {
    pub form: Option<String>,
    pub accession: Option<String>,
    pub filing_date: Option<String>,
}

impl Submissions {
    /// Business and mailing address slots, in scoring order.
    pub fn address_slots(&self) -> [Option<&Address>; 2] {
        [
            self.addresses.business.as_ref(),
            self.addresses.mailing.as_ref(),
        ]
    }

    /// Pick the filing that best represents this filer.
    ///
    /// Prefers the most recent annual-report form (10-K, 20-F); if none
    /// exists, falls back to the single most recent filing by date, ties
    /// broken by document order. Empty history yields empty metadata.
    pub fn latest_filing(&self) -> FilingMeta {
        let recent = &self.filings.recent;
        if recent.form.is_empty() {
            return FilingMeta::default();
        }

        let date_at = |i: usize| recent.filing_date.get(i).map(String::as_str).unwrap_or("");

        let mut idxs: Vec<usize> = (0..recent.form.len()).collect();
        // Stable sort: equal dates keep document order
        idxs.sort_by(|&a, &b| date_at(b).cmp(date_at(a)));

        let chosen = idxs
            .iter()
            .copied()
            .find(|&i| HIGH_VALUE_FORMS.contains(&recent.form[i].as_str()))
            .or_else(|| idxs.first().copied());

        match chosen {
            Some(i) => FilingMeta {
                form: recent.form.get(i).cloned(),
                accession: recent.accession_number.get(i).cloned(),
                filing_date: recent.filing_date.get(i).cloned(),
            },
            None => FilingMeta::default(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
