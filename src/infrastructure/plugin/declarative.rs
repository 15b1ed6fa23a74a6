//! Declarative decoder plugins loaded from TOML definitions
//!
//! ```toml
//! name = "Router swap"
//! priority = 10
//! selector = "0x38ed1739"
//! address = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d" # optional
//! chain_id = 1                                            # optional
//!
//! [[params]]
//! name = "amountIn"
//! type = "uint256"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::domain::abi::{normalize_hex_key, AbiDecoder, ParamSpec};
use crate::domain::decoder::{CalldataDecoder, DecodeContext, DecoderSource, PluginCall, PluginError};
use crate::infrastructure::abi::AlloyAbiDecoder;

/// On-disk shape of a decoder definition
#[derive(Debug, Clone, Deserialize)]
pub struct DecoderDefinition {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub selector: String,
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

/// A decoder that claims one selector (optionally scoped to a contract and chain)
#[derive(Debug, Clone)]
pub struct DeclarativeDecoder {
    name: String,
    priority: i32,
    selector: [u8; 4],
    address: Option<String>,
    chain_id: Option<u64>,
    params: Vec<ParamSpec>,
    abi: AlloyAbiDecoder,
}

impl DeclarativeDecoder {
    pub fn from_definition(def: DecoderDefinition) -> Result<Self> {
        let selector_hex = normalize_hex_key(&def.selector);
        let bytes = hex::decode(&selector_hex[2..])
            .with_context(|| format!("invalid selector '{}'", def.selector))?;
        let selector: [u8; 4] = match bytes.try_into() {
            Ok(selector) => selector,
            Err(_) => bail!("selector '{}' is not 4 bytes", def.selector),
        };
        if def.name.trim().is_empty() {
            bail!("decoder name must not be empty");
        }

        Ok(Self {
            name: def.name,
            priority: def.priority,
            selector,
            address: def.address.as_deref().map(normalize_hex_key),
            chain_id: def.chain_id,
            params: def.params,
            abi: AlloyAbiDecoder::new(),
        })
    }

    /// Parse a TOML definition
    pub fn from_toml(content: &str) -> Result<Self> {
        let def: DecoderDefinition = toml::from_str(content).context("invalid decoder definition")?;
        Self::from_definition(def)
    }
}

impl CalldataDecoder for DeclarativeDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn matches(&self, data: &[u8], ctx: &DecodeContext) -> bool {
        if data.len() < 4 || data[..4] != self.selector {
            return false;
        }
        if let Some(expected) = &self.address {
            match ctx.address.as_deref().map(normalize_hex_key) {
                Some(actual) if actual == *expected => {}
                _ => return false,
            }
        }
        if let Some(expected) = self.chain_id {
            if ctx.chain_id != Some(expected) {
                return false;
            }
        }
        true
    }

    fn decode(&self, data: &[u8], _ctx: &DecodeContext) -> Result<Option<PluginCall>, PluginError> {
        if data.len() < 4 {
            return Err(PluginError::Malformed("payload shorter than a selector".into()));
        }
        let params = self.abi.decode_params(&self.params, &data[4..], false)?;
        Ok(Some(PluginCall::new(self.name.clone(), params)))
    }
}

/// A directory of `*.toml` decoder definitions
#[derive(Debug, Clone)]
pub struct DecoderDir {
    path: PathBuf,
}

impl DecoderDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn definition_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.path) else {
            debug!(path = %self.path.display(), "decoder directory not present");
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("toml"))
            .collect();
        files.sort();
        files
    }
}

fn load_definition(path: &Path) -> Result<Arc<dyn CalldataDecoder>> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let decoder = DeclarativeDecoder::from_toml(&content).with_context(|| format!("load {}", path.display()))?;
    Ok(Arc::new(decoder))
}

impl DecoderSource for DecoderDir {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Vec<Result<Arc<dyn CalldataDecoder>>> {
        self.definition_files()
            .iter()
            .map(|path| load_definition(path))
            .collect()
    }
}
