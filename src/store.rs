// 🗄️ Submissions Store - offline per-CIK document source
// One JSON document per CIK, served from a directory tree or a .tar archive

use crate::normalize::normalize_cik10;
use crate::submissions::Submissions;
use anyhow::{bail, Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tar::Archive;
use tracing::{debug, warn};

/// Conventional member/file name for one CIK's document.
fn member_name(cik10: &str) -> String {
    format!("CIK{}.json", cik10)
}

enum Backend {
    /// Directory tree containing CIK##########.json files
    Dir(PathBuf),

    /// Single uncompressed tar archive with the same member naming.
    /// Entry offsets are indexed once at open; reads seek directly.
    Tar {
        path: PathBuf,
        index: HashMap<String, (u64, u64)>,
    },
}

/// Offline store of submissions documents, keyed by 10-digit CIK.
///
/// Hides the archive-vs-directory distinction behind a single `get` and
/// memoizes every lookup (hits and misses) for its lifetime: a document is
/// read from the backing storage at most once per run.
pub struct SubmissionsStore {
    backend: Backend,
    cache: RefCell<HashMap<String, Option<Rc<Submissions>>>>,
}

impl SubmissionsStore {
    /// Open a store over a directory of CIK JSON files or a `.tar` archive.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let backend = if path.is_dir() {
            Backend::Dir(path.to_path_buf())
        } else if path.is_file() {
            let index = Self::index_tar(path)?;
            debug!(entries = index.len(), "submissions archive indexed");
            Backend::Tar {
                path: path.to_path_buf(),
                index,
            }
        } else {
            bail!("submissions source not found: {:?}", path);
        };

        Ok(SubmissionsStore {
            backend,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// Scan the archive once, recording (offset, size) per CIK member.
    fn index_tar(path: &Path) -> Result<HashMap<String, (u64, u64)>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open submissions archive: {:?}", path))?;
        let mut archive = Archive::new(file);

        let mut index = HashMap::new();
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read archive entries: {:?}", path))?
        {
            let entry = entry.context("Failed to read archive entry")?;
            let entry_path = entry.path().context("Archive entry has invalid path")?;
            let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Members are CIK##########.json; anything else is ignored
            let Some(cik10) = name
                .strip_prefix("CIK")
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            index.insert(
                cik10.to_string(),
                (entry.raw_file_position(), entry.size()),
            );
        }
        Ok(index)
    }

    /// Fetch the document for a CIK.
    ///
    /// The identifier is normalized defensively (non-numeric input is an
    /// error at this boundary). An absent document is `Ok(None)`, never an
    /// error; a document that fails to parse is logged and treated as absent.
    pub fn get(&self, cik: &str) -> Result<Option<Rc<Submissions>>> {
        let cik10 = normalize_cik10(cik)?;

        if let Some(hit) = self.cache.borrow().get(&cik10) {
            return Ok(hit.clone());
        }

        let doc = self.load(&cik10).map(Rc::new);
        self.cache.borrow_mut().insert(cik10, doc.clone());
        Ok(doc)
    }

    /// Number of memoized lookups (hits and misses) so far.
    pub fn cached_lookups(&self) -> usize {
        self.cache.borrow().len()
    }

    fn load(&self, cik10: &str) -> Option<Submissions> {
        let raw = match &self.backend {
            Backend::Dir(dir) => {
                let path = dir.join(member_name(cik10));
                match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(_) => return None,
                }
            }
            Backend::Tar { path, index } => {
                let &(offset, size) = index.get(cik10)?;
                match Self::read_tar_member(path, offset, size) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(cik10, %err, "failed to read archive member");
                        return None;
                    }
                }
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(cik10, %err, "malformed submissions document, treating as absent");
                None
            }
        }
    }

    fn read_tar_member(path: &Path, offset: u64, size: u64) -> Result<Vec<u8>> {
        let mut file = File::open(path)
            .with_context(|| format!("Failed to reopen submissions archive: {:?}", path))?;
        file.seek(SeekFrom::Start(offset))
            .context("Failed to seek to archive member")?;
        let mut buf = vec![0u8; size as usize];
        file.read_exact(&mut buf)
            .context("Failed to read archive member")?;
        Ok(buf)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{"name":"ACME CORP","sic":"3714","sicDescription":"Motor Vehicle Parts",
            "addresses":{"business":{"city":"Springfield","stateOrCountry":"IL","zipCode":"62704"}},
            "filings":{"recent":{"form":["10-K"],"accessionNumber":["a1"],"filingDate":["2024-02-15"]}}}"#
    }

    fn dir_store(dir: &Path) -> SubmissionsStore {
        let path = dir.join("CIK0000012345.json");
        std::fs::write(path, sample_json()).unwrap();
        SubmissionsStore::open(dir).unwrap()
    }

    #[test]
    fn test_dir_get_and_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let store = dir_store(tmp.path());

        let doc = store.get("12345").unwrap().expect("document present");
        assert_eq!(doc.sic.as_deref(), Some("3714"));

        assert!(store.get("9999999999").unwrap().is_none());
    }

    #[test]
    fn test_get_memoizes_across_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let store = dir_store(tmp.path());

        assert!(store.get("12345").unwrap().is_some());
        // If the second get re-read the directory it would now miss
        std::fs::remove_file(tmp.path().join("CIK0000012345.json")).unwrap();
        assert!(store.get("0000012345").unwrap().is_some());
        assert_eq!(store.cached_lookups(), 1);
    }

    #[test]
    fn test_malformed_cik_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = dir_store(tmp.path());
        assert!(store.get("not-a-cik").is_err());
    }

    #[test]
    fn test_malformed_document_treated_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("CIK0000000007.json"), b"{ not json").unwrap();
        let store = SubmissionsStore::open(tmp.path()).unwrap();
        assert!(store.get("7").unwrap().is_none());
    }

    #[test]
    fn test_tar_archive_matches_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let tar_path = tmp.path().join("submissions.tar");

        let file = File::create(&tar_path).unwrap();
        let mut builder = tar::Builder::new(file);
        let data = sample_json().as_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "CIK0000012345.json", data)
            .unwrap();
        builder.into_inner().unwrap().flush().unwrap();

        let store = SubmissionsStore::open(&tar_path).unwrap();
        let doc = store.get("12345").unwrap().expect("document present");
        assert_eq!(doc.addresses.business.as_ref().unwrap().zip_code.as_deref(), Some("62704"));
        assert!(store.get("42").unwrap().is_none());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        assert!(SubmissionsStore::open("/nonexistent/submissions.tar").is_err());
    }
}
