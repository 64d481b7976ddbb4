//! Local record store.
//!
//! Seeded once from a flat `<name> <address>` file and extended at runtime
//! with addresses resolved upstream. Entries never expire.

use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::error::LoadError;

/// In-memory name -> address table.
pub struct RecordStore {
    entries: RwLock<FxHashMap<String, String>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Load the store from a records file.
    ///
    /// Any malformed line aborts the whole load.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse records from file contents.
    ///
    /// Blank lines and `#` comments are skipped; every other line must hold
    /// exactly two whitespace separated fields. Names are lowercased.
    pub fn parse(contents: &str) -> Result<Self, LoadError> {
        let mut entries = FxHashMap::default();

        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [name, address] = fields.as_slice() else {
                return Err(LoadError::MalformedRecord {
                    line_number: idx + 1,
                    line: line.to_string(),
                });
            };

            entries.insert(name.to_lowercase(), address.to_string());
        }

        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Exact-match lookup. The caller normalizes case.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let Ok(entries) = self.entries.read() else {
            return None;
        };
        entries.get(name).cloned()
    }

    /// Insert or overwrite an entry.
    pub fn insert(&self, name: String, address: String) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.insert(name, address);
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let store = RecordStore::parse(
            "# internal names\n\none.test.   10.0.0.1\n  # indented comment\ntwo.test.\t10.0.0.2\n",
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("one.test.").as_deref(), Some("10.0.0.1"));
        assert_eq!(store.lookup("two.test.").as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn parse_rejects_single_field_line() {
        let err = RecordStore::parse("one.test. 10.0.0.1\nonlyonefield\n").err().unwrap();

        match err {
            LoadError::MalformedRecord { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "onlyonefield");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_rejects_extra_fields() {
        let result = RecordStore::parse("one.test. 10.0.0.1 extra\n");

        assert!(matches!(result, Err(LoadError::MalformedRecord { .. })));
    }

    #[test]
    fn parse_lowercases_names_and_last_write_wins() {
        let store = RecordStore::parse("One.TEST. 10.0.0.1\none.test. 10.0.0.9\n").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("one.test.").as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn lookup_is_exact_match() {
        let store = RecordStore::parse("one.test. 10.0.0.1\n").unwrap();

        assert!(store.lookup("one.test").is_none());
        assert!(store.lookup("ONE.TEST.").is_none());
        assert!(store.lookup("sub.one.test.").is_none());
    }

    #[test]
    fn insert_overwrites() {
        let store = RecordStore::new();

        store.insert("a.test.".to_string(), "10.0.0.1".to_string());
        store.insert("a.test.".to_string(), "10.0.0.2".to_string());

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("a.test.").as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one.test. 10.0.0.1").unwrap();

        let store = RecordStore::load(file.path()).unwrap();

        assert_eq!(store.lookup("one.test.").as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();

        let result = RecordStore::load(&dir.path().join("missing.txt"));

        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
