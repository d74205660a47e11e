mod hashing;
mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::key::{KeyQuantizer, ObjectKey};

pub use parser::parse_catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    MissingAttribute,
    InvalidValue,
    DuplicateKey,
}

#[derive(Debug, Clone)]
pub struct CatalogError {
    pub code: CatalogErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Every grass key known to exist, grouped by region, plus the declared
/// aliases between keys that moved or were renamed.
#[derive(Debug, Clone, Default)]
pub struct CuratedCatalog {
    version: u32,
    digest_hex: String,
    keys_by_region: BTreeMap<String, Vec<ObjectKey>>,
    aliases: Vec<(ObjectKey, ObjectKey)>,
}

impl CuratedCatalog {
    pub(crate) fn new(
        version: u32,
        digest_hex: String,
        mut keys_by_region: BTreeMap<String, Vec<ObjectKey>>,
        aliases: Vec<(ObjectKey, ObjectKey)>,
    ) -> Self {
        for keys in keys_by_region.values_mut() {
            keys.sort();
        }
        Self {
            version,
            digest_hex,
            keys_by_region,
            aliases,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// SHA-256 of the catalog source, lowercase hex.
    pub fn digest_hex(&self) -> &str {
        &self.digest_hex
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.keys_by_region.keys().map(String::as_str)
    }

    pub fn keys_in_region(&self, region: &str) -> &[ObjectKey] {
        self.keys_by_region
            .get(region)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObjectKey> {
        self.keys_by_region.values().flatten()
    }

    pub fn key_count(&self) -> usize {
        self.keys_by_region.values().map(Vec::len).sum()
    }

    pub fn aliases(&self) -> &[(ObjectKey, ObjectKey)] {
        &self.aliases
    }
}

pub fn load_catalog_file(
    path: &Path,
    quantizer: &KeyQuantizer,
) -> Result<CuratedCatalog, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError {
        code: CatalogErrorCode::ReadFile,
        message: format!("failed to read catalog file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_catalog(&raw, path, quantizer)
}
