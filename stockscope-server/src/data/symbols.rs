//! Stock code to display name lookup.

use std::collections::HashMap;
use std::path::Path;
use stockscope_common::Error;
use tracing::{info, warn};

use crate::csv_source;

/// Display name for codes missing from the directory.
pub const UNKNOWN_SECURITY: &str = "未知证券";

const CODE_HEADERS: &[&str] = &["code", "symbol", "股票代码", "代码"];
const NAME_HEADERS: &[&str] = &["name", "股票简称", "名称"];

/// Immutable `code -> name` map, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct SymbolDirectory {
    names: HashMap<String, String>,
}

impl SymbolDirectory {
    /// Load from a CSV file.
    ///
    /// A missing file yields an empty directory; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            warn!(path = %path.display(), "Symbol file not found, names will resolve to {}", UNKNOWN_SECURITY);
            return Ok(Self::default());
        }

        let read_error = |message: String| Error::DataRead {
            path: path.display().to_string(),
            message,
        };

        let text = csv_source::read_utf8(path).map_err(|e| read_error(e.to_string()))?;
        let mut reader = csv_source::reader(&text);
        let headers = reader.headers().map_err(|e| read_error(e.to_string()))?.clone();

        let find = |candidates: &[&str]| headers.iter().position(|h| candidates.contains(&h));
        let (code_idx, name_idx) = match (find(CODE_HEADERS), find(NAME_HEADERS)) {
            (Some(c), Some(n)) => (c, n),
            _ => {
                return Err(read_error(format!(
                    "expected code and name columns, found: {}",
                    headers.iter().collect::<Vec<_>>().join(",")
                )))
            }
        };

        let mut names = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| read_error(e.to_string()))?;
            match (record.get(code_idx), record.get(name_idx)) {
                (Some(code), Some(name)) if !code.is_empty() => {
                    names.insert(code.to_string(), name.to_string());
                }
                _ => continue,
            }
        }

        info!(path = %path.display(), symbols = names.len(), "Loaded symbol directory");
        Ok(Self { names })
    }

    /// Build a directory from in-memory pairs.
    pub fn from_pairs<I, C, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }

    /// Display name for `code`, or [`UNKNOWN_SECURITY`].
    pub fn name_for(&self, code: &str) -> &str {
        self.names
            .get(code.trim())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SECURITY)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
