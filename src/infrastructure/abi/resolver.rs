//! Remote signature databases (OpenChain, 4byte.directory)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// A remote selector -> text signature database
#[async_trait]
pub trait SignatureSource: Send + Sync {
    fn name(&self) -> &str;

    /// Candidate signatures for a 0x-prefixed lowercase selector
    async fn lookup(&self, selector: &str) -> Result<Vec<String>>;
}

/// OpenChain API response structures
#[derive(Debug, Deserialize)]
struct OpenChainResponse {
    ok: bool,
    result: OpenChainResult,
}

#[derive(Debug, Deserialize)]
struct OpenChainResult {
    #[serde(default)]
    function: HashMap<String, Option<Vec<OpenChainSignature>>>,
}

#[derive(Debug, Deserialize)]
struct OpenChainSignature {
    name: String,
}

/// 4byte.directory response structures
#[derive(Debug, Deserialize)]
struct FourByteResponse {
    #[serde(default)]
    results: Vec<FourByteSignature>,
}

#[derive(Debug, Deserialize)]
struct FourByteSignature {
    text_signature: String,
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// OpenChain signature database (used by `cast 4byte`)
pub struct OpenChainSource {
    http: reqwest::Client,
    base_url: String,
}

impl OpenChainSource {
    pub const DEFAULT_URL: &'static str = "https://api.openchain.xyz/signature-database/v1/lookup";

    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: Self::DEFAULT_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SignatureSource for OpenChainSource {
    fn name(&self) -> &str {
        "openchain"
    }

    async fn lookup(&self, selector: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("function", selector), ("filter", "true")])
            .send()
            .await
            .context("Failed to query OpenChain API")?;

        if !response.status().is_success() {
            bail!("OpenChain API returned status {}", response.status());
        }

        let data: OpenChainResponse = response
            .json()
            .await
            .context("Failed to parse OpenChain response")?;

        if !data.ok {
            bail!("OpenChain API returned ok=false");
        }

        Ok(data
            .result
            .function
            .get(selector)
            .and_then(|sigs| sigs.as_ref())
            .map(|sigs| sigs.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default())
    }
}

/// 4byte.directory signature database
pub struct FourByteSource {
    http: reqwest::Client,
    base_url: String,
}

impl FourByteSource {
    pub const DEFAULT_URL: &'static str = "https://www.4byte.directory/api/v1/signatures/";

    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: Self::DEFAULT_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SignatureSource for FourByteSource {
    fn name(&self) -> &str {
        "4byte"
    }

    async fn lookup(&self, selector: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("hex_signature", selector)])
            .send()
            .await
            .context("Failed to query 4byte API")?;

        if !response.status().is_success() {
            bail!("4byte API returned status {}", response.status());
        }

        let data: FourByteResponse = response
            .json()
            .await
            .context("Failed to parse 4byte response")?;

        Ok(data.results.into_iter().map(|s| s.text_signature).collect())
    }
}

/// Build remote sources by name, in the given priority order
///
/// Unknown names are logged and ignored.
pub fn remote_sources(names: &[String], timeout: Duration) -> Result<Vec<Arc<dyn SignatureSource>>> {
    let mut sources: Vec<Arc<dyn SignatureSource>> = Vec::new();
    for name in names {
        match name.trim().to_lowercase().as_str() {
            "openchain" => sources.push(Arc::new(OpenChainSource::new(timeout)?)),
            "4byte" | "fourbyte" => sources.push(Arc::new(FourByteSource::new(timeout)?)),
            other => warn!(source = other, "unknown signature source"),
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openchain_response() {
        let body = r#"{"ok":true,"result":{"event":{},"function":{
            "0xa9059cbb":[{"name":"transfer(address,uint256)","filtered":false}],
            "0xdeadbeef":null}}}"#;
        let data: OpenChainResponse = serde_json::from_str(body).unwrap();

        assert!(data.ok);
        let sigs = data.result.function.get("0xa9059cbb").unwrap().as_ref().unwrap();
        assert_eq!(sigs[0].name, "transfer(address,uint256)");
        assert!(data.result.function.get("0xdeadbeef").unwrap().is_none());
    }

    #[test]
    fn test_parse_fourbyte_response() {
        let body = r#"{"count":2,"next":null,"previous":null,"results":[
            {"id":2,"text_signature":"foo()","hex_signature":"0x12345678"},
            {"id":1,"text_signature":"bar()","hex_signature":"0x12345678"}]}"#;
        let data: FourByteResponse = serde_json::from_str(body).unwrap();

        let sigs: Vec<String> = data.results.into_iter().map(|s| s.text_signature).collect();
        assert_eq!(sigs, vec!["foo()", "bar()"]);
    }

    #[test]
    fn test_remote_sources_by_name() {
        let names = vec!["4byte".to_string(), "nope".to_string(), "openchain".to_string()];
        let sources = remote_sources(&names, Duration::from_secs(1)).unwrap();

        let built: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(built, vec!["4byte", "openchain"]);
    }
}
