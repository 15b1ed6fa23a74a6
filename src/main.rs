use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use txinspect::config::{self, Config};
use txinspect::domain::abi::{CatalogSource, DecodedArg, DecodedLog};
use txinspect::domain::decoder::DecoderSource;
use txinspect::infrastructure::abi::remote_sources;
use txinspect::infrastructure::{AbiScanner, BuiltinSource, DecoderDir, InterfaceCatalog, SelectorCache};
use txinspect::store::LabelStore;
use txinspect::{CalldataResolver, DecodeContext, DecodedCall, DecoderRegistry};

#[derive(Debug, Parser)]
#[command(
    name = "txinspect",
    version,
    about = "txinspect: turn raw EVM calldata, logs and revert data into readable call trees"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode transaction calldata, including calls nested inside it
    Decode {
        /// Hex calldata (0x-prefixed or bare)
        calldata: String,

        /// Contract the calldata was sent to
        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        chain_id: Option<u64>,

        /// Skip remote signature databases
        #[arg(long)]
        offline: bool,

        #[arg(long)]
        json: bool,
    },

    /// Decode an event log
    Log {
        /// Log topics in order, topic0 first
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,

        /// Non-indexed log data
        #[arg(long, default_value = "0x")]
        data: String,

        #[arg(long)]
        json: bool,
    },

    /// Decode revert data against known errors
    Revert {
        data: String,

        #[arg(long)]
        json: bool,
    },

    /// Show, set or (with --remove) delete the display label for an address
    Label {
        address: String,

        name: Option<String>,

        #[arg(long)]
        remove: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TXINSPECT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = config::load();

    match args.command {
        Command::Decode {
            calldata,
            address,
            chain_id,
            offline,
            json,
        } => {
            let resolver = build_resolver(&config, offline)?;
            let mut ctx = load_context();
            if let Some(address) = address {
                ctx = ctx.with_address(address);
            }
            if let Some(chain_id) = chain_id {
                ctx = ctx.with_chain_id(chain_id);
            }

            let call = resolver.resolve_hex(&calldata, &ctx).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&call)?);
            } else {
                let target = ctx
                    .address
                    .as_deref()
                    .and_then(|addr| display_address(addr, &ctx, resolver.catalog()));
                if let Some(target) = target {
                    println!("to {}", target);
                }
                let mut out = String::new();
                render_call(&call, &ctx, resolver.catalog(), 0, &mut out);
                print!("{}", out);
            }
        }
        Command::Log { topics, data, json } => {
            let catalog = build_catalog(&config);
            let topics = topics
                .iter()
                .map(|topic| parse_topic(topic))
                .collect::<Result<Vec<_>>>()?;
            let data = parse_hex(&data)?;

            let Some(log) = catalog.resolve_log(&topics, &data) else {
                let name = topics.first().and_then(|t| catalog.event_name(t));
                bail!(
                    "no known event matches topic0 {} ({} topics){}",
                    topics.first().map(|t| format!("0x{}", hex::encode(t))).unwrap_or_default(),
                    topics.len(),
                    name.map(|n| format!(", name hint: {}", n)).unwrap_or_default()
                );
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&log)?);
            } else {
                let ctx = load_context();
                print!("{}", render_log(&log, &ctx, &catalog));
            }
        }
        Command::Revert { data, json } => {
            let catalog = build_catalog(&config);
            let data = parse_hex(&data)?;
            let Some(call) = catalog.resolve_error(&data) else {
                bail!("no known error matches the revert data");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&call)?);
            } else {
                let ctx = DecodeContext::default();
                let mut out = String::new();
                render_call(&call, &ctx, &catalog, 0, &mut out);
                print!("{}", out);
            }
        }
        Command::Label {
            address,
            name,
            remove,
        } => {
            let Some(path) = config::labels_db_path() else {
                bail!("no data directory available for the label store");
            };
            ensure_parent(&path)?;
            let store = LabelStore::open(&path)?;
            match (remove, name) {
                (true, _) => {
                    if !store.remove_label(&address)? {
                        println!("no label for {}", address);
                    }
                }
                (false, Some(name)) => store.set_label(&address, &name)?,
                (false, None) => match store.get_label(&address)? {
                    Some(label) => println!("{}", label),
                    None => bail!("no label for {}", address),
                },
            }
        }
    }

    Ok(())
}

fn build_catalog(config: &Config) -> InterfaceCatalog {
    let mut sources: Vec<Box<dyn CatalogSource>> = vec![Box::new(BuiltinSource)];
    sources.extend(AbiScanner::scan_roots(&config.abi_roots()));
    InterfaceCatalog::aggregate(&sources).with_structural_fallback(config.catalog.structural_fallback)
}

fn build_plugins(config: &Config) -> DecoderRegistry {
    let mut sources: Vec<Box<dyn DecoderSource>> =
        vec![Box::new(DecoderDir::new(config::project_decoders_dir()))];
    if let Some(dir) = config::user_decoders_dir() {
        sources.push(Box::new(DecoderDir::new(dir)));
    }
    for root in config.decoder_roots() {
        sources.push(Box::new(DecoderDir::new(root)));
    }
    DecoderRegistry::load(&sources)
}

fn build_resolver(config: &Config, offline: bool) -> Result<CalldataResolver> {
    let timeout = Duration::from_secs(config.signatures.timeout_secs);
    let remote = if offline || !config.signatures.enabled {
        Vec::new()
    } else {
        remote_sources(&config.signatures.sources, timeout)?
    };

    let mut selectors = SelectorCache::new(remote).with_timeout(timeout);
    if let Some(path) = config::selector_cache_path() {
        selectors = selectors.with_store_path(path);
    }
    if let Some(days) = config.signatures.max_age_days {
        selectors = selectors.with_max_age_days(days);
    }

    let plugins = build_plugins(config);
    debug!(decoders = plugins.len(), "decoder plugins loaded");

    Ok(CalldataResolver::new(
        Arc::new(plugins),
        Arc::new(build_catalog(config)),
        Arc::new(selectors),
    )
    .with_limits(config.nested))
}

/// Decode context seeded with stored labels; labels are optional
fn load_context() -> DecodeContext {
    let Some(path) = config::labels_db_path() else {
        return DecodeContext::default();
    };
    if !path.exists() {
        return DecodeContext::default();
    }
    match LabelStore::open(&path).and_then(|store| store.context()) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to load address labels");
            DecodeContext::default()
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(payload).with_context(|| format!("invalid hex '{}'", input))
}

fn parse_topic(input: &str) -> Result<B256> {
    let bytes = parse_hex(input)?;
    if bytes.len() != 32 {
        bail!("topic '{}' is {} bytes, expected 32", input, bytes.len());
    }
    Ok(B256::from_slice(&bytes))
}

/// User label first, then catalog name, then the raw address
fn display_address(address: &str, ctx: &DecodeContext, catalog: &InterfaceCatalog) -> Option<String> {
    let name = ctx
        .label_for(address)
        .or_else(|| catalog.address_name(address))?;
    Some(format!("{} ({})", name, address))
}

fn render_call(
    call: &DecodedCall,
    ctx: &DecodeContext,
    catalog: &InterfaceCatalog,
    depth: usize,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}{} [{}]\n", indent, call.label(), call.selector_hex()));
    for arg in &call.args {
        render_arg(arg, ctx, catalog, depth + 1, out);
    }
    for child in &call.nested {
        render_call(child, ctx, catalog, depth + 1, out);
    }
}

fn render_arg(arg: &DecodedArg, ctx: &DecodeContext, catalog: &InterfaceCatalog, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let value = match arg.value.as_address() {
        Some(addr) => {
            let raw = addr.to_string();
            display_address(&raw, ctx, catalog).unwrap_or(raw)
        }
        None => arg.value.to_string(),
    };
    out.push_str(&format!("{}{}: {} = {}\n", indent, arg.name, arg.kind, value));
}

fn render_log(log: &DecodedLog, ctx: &DecodeContext, catalog: &InterfaceCatalog) -> String {
    let mut out = format!("{} [{}]\n", log.name, log.signature);
    for arg in &log.args {
        render_arg(arg, ctx, catalog, 1, &mut out);
    }
    out
}
