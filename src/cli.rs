//! CLI argument definitions using clap derive macros.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use harvester_core::source::DEFAULT_TIMEOUT;
use harvester_core::{Decoder, DecodingStrategy, RequestBody, RequestConfig, Source};
use reqwest::header::{HeaderName, HeaderValue};

/// Extract structured data from web pages and documents.
///
/// Harvester applies a JSON schema of delimiter-bounded fields to a page
/// (fetched from a URL or read from a file) and prints the resolved fields
/// as JSON.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "content"])))]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Schema definition file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Address to fetch
    #[arg(short, long)]
    pub url: Option<String>,

    /// File with literal content to parse ("-" reads stdin)
    #[arg(long, value_name = "FILE")]
    pub content: Option<PathBuf>,

    /// Origin used to resolve relative addresses found in literal content
    #[arg(long, value_name = "URL", requires = "content")]
    pub base_url: Option<String>,

    /// Extra request header, e.g. -H "Accept-Language: es"
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Proxy to route requests through; one is picked at random per request
    #[arg(long = "proxy", value_name = "URL")]
    pub proxies: Vec<String>,

    /// Send a random browser User-Agent
    #[arg(long)]
    pub disguise: bool,

    /// Wait about this many seconds (plus up to 1.5s) before each fetch
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub wait_about: Option<f64>,

    /// Reuse fetched content for repeated addresses within the run
    #[arg(long)]
    pub cache: bool,

    /// Encoding label to try before detection (repeatable)
    #[arg(long = "encoding", value_name = "LABEL")]
    pub encodings: Vec<String>,

    /// Enable statistical encoding detection
    #[arg(long)]
    pub deep_encoding: bool,

    /// POST this key/value pair instead of issuing a GET (repeatable)
    #[arg(long = "post", value_name = "KEY=VALUE", value_parser = parse_key_value, requires = "url")]
    pub post: Vec<(String, String)>,

    /// Send the POST pairs as a JSON object instead of a form
    #[arg(long, requires = "post")]
    pub json_body: bool,

    /// Request timeout in seconds (1-600)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,
}

impl Args {
    /// Request configuration described by the flags.
    ///
    /// # Errors
    ///
    /// Fails on header names or values HTTP does not allow.
    pub fn request_config(&self) -> Result<RequestConfig> {
        let mut config = RequestConfig::default()
            .proxies(self.proxies.iter().cloned())
            .disguise(self.disguise)
            .use_cache(self.cache)
            .decoding(DecodingStrategy {
                preferred: self.encodings.clone(),
                deep_discovery: self.deep_encoding,
            })
            .timeout(Duration::from_secs(self.timeout));
        if let Some(secs) = self.wait_about {
            config = config.wait_about(Duration::from_secs_f64(secs));
        }
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header '{name}'"))?;
            config = config.header(name, value);
        }
        Ok(config)
    }

    /// Where the Document comes from.
    ///
    /// # Errors
    ///
    /// Fails if the content file cannot be read or decoded.
    pub fn source(&self) -> Result<Source> {
        if let Some(url) = &self.url {
            return Ok(match self.request_body() {
                Some(body) => Source::post(url, body),
                None => Source::address(url),
            });
        }

        let path = self
            .content
            .as_ref()
            .context("either --url or --content is required")?;
        let bytes = if path.as_os_str() == "-" {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read content from stdin")?;
            buffer
        } else {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?
        };
        let text = Decoder::default().decode(&bytes, &self.encodings, self.deep_encoding)?;

        Ok(match &self.base_url {
            Some(base) => Source::content_with_base(text, base),
            None => Source::content(text),
        })
    }

    fn request_body(&self) -> Option<RequestBody> {
        if self.post.is_empty() {
            return None;
        }
        Some(if self.json_body {
            let object = self
                .post
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            RequestBody::Json(serde_json::Value::Object(object))
        } else {
            RequestBody::Form(self.post.clone())
        })
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn parse_seconds(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(format!("'{raw}' must be a non-negative number of seconds"))
    }
}
