// 🔤 Normalization - canonical forms for names, cities, ZIPs, and CIKs
// Every comparison in the pipeline happens on these normalized keys

use anyhow::{bail, Result};

/// Legal-entity suffix tokens stripped from company names.
/// Ordered longest-form first for readability only; matching is per-token.
const NAME_SUFFIXES: &[&str] = &[
    "CORPORATION",
    "CORP",
    "INCORPORATED",
    "INC",
    "LLC",
    "LTD",
    "LIMITED",
    "PLC",
    "CO",
    "COMPANY",
    "HOLDING",
    "HOLDINGS",
];

/// Directional/ordinal abbreviations canonicalized in city names.
const CITY_CANON: &[(&str, &str)] = &[
    ("ST", "SAINT"),
    ("FT", "FORT"),
    ("MT", "MOUNT"),
    ("N", "NORTH"),
    ("S", "SOUTH"),
    ("E", "EAST"),
    ("W", "WEST"),
];

/// Uppercase and replace every non-alphanumeric run with a single space.
fn upper_alnum(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Normalize a company name for index lookup.
///
/// Uppercases, strips punctuation, collapses whitespace, then iteratively
/// removes legal-entity suffix tokens from either end until a fixed point.
/// Iterative because stripping can expose a new trailing suffix:
/// "X HOLDINGS INC" → "X HOLDINGS" → "X".
pub fn normalize_name(text: &str) -> String {
    let cleaned = upper_alnum(text);
    let mut tokens: Vec<&str> = cleaned.split(' ').filter(|t| !t.is_empty()).collect();

    loop {
        let before = tokens.len();
        if tokens
            .first()
            .is_some_and(|t| NAME_SUFFIXES.contains(t))
        {
            tokens.remove(0);
        }
        if tokens
            .last()
            .is_some_and(|t| NAME_SUFFIXES.contains(t))
        {
            tokens.pop();
        }
        if tokens.len() == before {
            break;
        }
    }

    tokens.join(" ")
}

/// Normalize a city name: uppercase, punctuation to spaces, and map
/// common abbreviations to their long forms (ST→SAINT, N→NORTH, ...).
pub fn normalize_city(text: &str) -> String {
    let cleaned = upper_alnum(text);
    cleaned
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| {
            CITY_CANON
                .iter()
                .find(|(abbr, _)| *abbr == t)
                .map(|(_, long)| *long)
                .unwrap_or(t)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a ZIP/postal code to exactly five digits.
///
/// Keeps digits only: five or more → first five; one to four → zero-left-pad;
/// none → empty string. Empty means "no constraint", never "00000".
pub fn normalize_zip5(text: &str) -> String {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        String::new()
    } else if digits.len() >= 5 {
        digits[..5].to_string()
    } else {
        format!("{:0>5}", digits)
    }
}

/// Normalize a CIK to its canonical 10-digit zero-padded form.
///
/// Accepts any numeric form ("320193", "0000320193", " 320193 ").
/// Non-numeric input is rejected here, at the boundary, so malformed
/// identifiers never reach scoring or the store.
pub fn normalize_cik10(cik: &str) -> Result<String> {
    let trimmed = cik.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        bail!("invalid CIK {:?}: expected a numeric identifier", cik);
    }
    // Strip leading zeros via integer parse, then re-pad to 10.
    let n: u64 = trimmed.parse()?;
    Ok(format!("{:010}", n))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_basic() {
        assert_eq!(normalize_name("Acme Corp."), "ACME");
        assert_eq!(normalize_name("  acme,   inc  "), "ACME");
        assert_eq!(normalize_name("ACME"), "ACME");
    }

    #[test]
    fn test_name_suffix_fixed_point() {
        // Stripping INC exposes HOLDINGS, which must also go
        assert_eq!(normalize_name("X Holdings Inc"), "X");
        assert_eq!(normalize_name("Acme Holding Company Ltd"), "ACME");
    }

    #[test]
    fn test_name_pathological_all_suffixes() {
        // Bounded: every token is removable, result is empty
        assert_eq!(normalize_name("INC INC INC"), "");
        assert_eq!(normalize_name("CORP"), "");
    }

    #[test]
    fn test_name_idempotent() {
        let once = normalize_name("Saint-Gobain Holdings, Inc.");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn test_name_interior_suffix_kept() {
        // CO is only a suffix at the edges, not mid-name
        assert_eq!(normalize_name("Co Op Works"), "OP WORKS");
        assert_eq!(normalize_name("Works Co Op"), "WORKS CO OP");
    }

    #[test]
    fn test_city_canonicalization() {
        assert_eq!(normalize_city("St. Louis"), "SAINT LOUIS");
        assert_eq!(normalize_city("Ft Worth"), "FORT WORTH");
        assert_eq!(normalize_city("N Las Vegas"), "NORTH LAS VEGAS");
        assert_eq!(normalize_city("Mt. Pleasant"), "MOUNT PLEASANT");
    }

    #[test]
    fn test_city_plain() {
        assert_eq!(normalize_city("New York"), "NEW YORK");
        assert_eq!(normalize_city(""), "");
    }

    #[test]
    fn test_zip5_rules() {
        assert_eq!(normalize_zip5("62704"), "62704");
        assert_eq!(normalize_zip5("62704-1234"), "62704");
        assert_eq!(normalize_zip5("627"), "00627");
        assert_eq!(normalize_zip5("abc"), "");
        assert_eq!(normalize_zip5(""), "");
    }

    #[test]
    fn test_cik10_padding() {
        assert_eq!(normalize_cik10("320193").unwrap(), "0000320193");
        assert_eq!(normalize_cik10("0000320193").unwrap(), "0000320193");
        assert_eq!(normalize_cik10(" 320193 ").unwrap(), "0000320193");
    }

    #[test]
    fn test_cik10_rejects_non_numeric() {
        assert!(normalize_cik10("APPLE").is_err());
        assert!(normalize_cik10("").is_err());
        assert!(normalize_cik10("12-34").is_err());
    }
}
