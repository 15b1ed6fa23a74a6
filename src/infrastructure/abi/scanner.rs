//! ABI file scanner - discovers ABI and catalog files on the filesystem

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use alloy_json_abi::JsonAbi;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::abi::{normalize_hex_key, CatalogFragment, CatalogSource};

/// Files larger than this are never parsed
const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// ABI file scanner
pub struct AbiScanner;

impl AbiScanner {
    /// Discover JSON files under a root, one catalog source per file
    pub fn scan(root: impl AsRef<Path>) -> Vec<Box<dyn CatalogSource>> {
        let root = root.as_ref();
        let mut sources: Vec<Box<dyn CatalogSource>> = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "skipping unreadable path");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match entry.metadata() {
                Ok(meta) if meta.len() > MAX_FILE_BYTES => {
                    debug!(path = %path.display(), "skipping oversized file");
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable file");
                    continue;
                }
            }

            sources.push(Box::new(AbiFile::new(path)));
        }

        sources
    }

    /// Scan multiple root directories, preserving root order
    pub fn scan_roots(roots: &[PathBuf]) -> Vec<Box<dyn CatalogSource>> {
        roots.iter().flat_map(Self::scan).collect()
    }

    /// Check if a path should be ignored
    fn is_ignored_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| {
                matches!(
                    name,
                    ".git" | "target" | "node_modules" | ".next" | "dist" | "build" | "cache"
                )
            })
            .unwrap_or(false)
    }
}

/// A single JSON file on disk
#[derive(Debug, Clone)]
pub struct AbiFile {
    path: PathBuf,
}

impl AbiFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for AbiFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<CatalogFragment> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("parse {}", self.path.display()))?;
        parse_catalog_document(&value)
    }
}

/// Parse any supported catalog document shape
///
/// Accepts a raw ABI array, an artifact object with an `abi` field, or a
/// bundle `{ "abis": [[...]], "topics": {...}, "addresses": {...} }`.
/// Documents with none of these yield an empty fragment.
pub fn parse_catalog_document(value: &Value) -> Result<CatalogFragment> {
    if value.is_array() {
        return parse_abi(value);
    }

    let Some(object) = value.as_object() else {
        bail!("expected a JSON array or object");
    };

    if let Some(abi) = object.get("abi") {
        return parse_abi(abi);
    }

    let mut fragment = CatalogFragment::new();

    if let Some(abis) = object.get("abis") {
        let Some(abis) = abis.as_array() else {
            bail!("`abis` must be an array of ABI arrays");
        };
        for abi in abis {
            let parsed = parse_abi(abi)?;
            fragment.descriptors.extend(parsed.descriptors);
        }
    }

    if let Some(topics) = object.get("topics") {
        fragment.event_names = parse_name_map(topics).context("invalid `topics` map")?;
    }
    if let Some(addresses) = object.get("addresses") {
        fragment.address_names = parse_name_map(addresses).context("invalid `addresses` map")?;
    }

    Ok(fragment)
}

/// Descriptors in declaration order
///
/// `JsonAbi` groups items by name, so each item is parsed on its own and
/// appended in sequence.
fn parse_abi(value: &Value) -> Result<CatalogFragment> {
    let Some(items) = value.as_array() else {
        bail!("invalid ABI: expected an array of items");
    };
    let mut fragment = CatalogFragment::new();
    for (idx, item) in items.iter().enumerate() {
        let abi: JsonAbi = serde_json::from_value(Value::Array(vec![item.clone()]))
            .with_context(|| format!("invalid ABI item #{}", idx))?;
        fragment
            .descriptors
            .extend(CatalogFragment::from_json_abi(&abi).descriptors);
    }
    Ok(fragment)
}

fn parse_name_map(value: &Value) -> Result<HashMap<String, String>> {
    let map: HashMap<String, String> = serde_json::from_value(value.clone())?;
    Ok(map
        .into_iter()
        .map(|(key, name)| (normalize_hex_key(&key), name))
        .collect())
}
