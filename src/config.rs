// src/config.rs

use log::{info, warn};
use anyhow::Context;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;

use crate::classifier::LEXICON_MODEL_ID;

pub const RAW_REVIEWS_FILE: &str = "reviews.json";
pub const ANALYZED_REVIEWS_FILE: &str = "reviews_analyzed.json";
pub const PRODUCTS_FILE: &str = "products.json";
pub const TESTIMONIALS_FILE: &str = "testimonials.json";

/// Hard truncation bound applied to review bodies before classification.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 512;
/// Number of tokens kept for the word cloud.
pub const DEFAULT_TOP_WORDS: usize = 100;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CACHE_DIR: &str = ".cache/sentiment";
const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8501;

/// Process configuration shared by both binaries.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// `None` disables the classifier result cache.
    pub cache_dir: Option<PathBuf>,
    pub model_id: String,
    pub inference_base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub max_input_chars: usize,
    pub top_words: usize,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from_lookup(|_| None)
    }
}

impl Settings {
    /// Builds settings from the process environment.
    pub fn from_env() -> Self {
        let settings = Settings::from_lookup(|key| std::env::var(key).ok());
        info!(
            "Settings: data_dir={:?}, cache_dir={:?}, model={}, max_input_chars={}, top_words={}, bind={}:{}",
            settings.data_dir,
            settings.cache_dir,
            settings.model_id,
            settings.max_input_chars,
            settings.top_words,
            settings.host,
            settings.port
        );
        settings
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("SENTIMENT_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let cache_dir = match lookup("SENTIMENT_CACHE_DIR") {
            Some(v) if v.trim().is_empty() || v.trim().eq_ignore_ascii_case("none") => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_CACHE_DIR)),
        };
        let model_id = lookup("SENTIMENT_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| LEXICON_MODEL_ID.to_string());
        let inference_base_url = lookup("HF_INFERENCE_URL")
            .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string());
        let api_token = lookup("HF_API_TOKEN").filter(|v| !v.trim().is_empty());
        let host = lookup("DASHBOARD_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        Settings {
            data_dir: PathBuf::from(data_dir),
            cache_dir,
            model_id,
            inference_base_url,
            api_token,
            timeout_secs: parse_or(&lookup, "SENTIMENT_TIMEOUT_SECS", 30u64).max(1),
            max_retries: parse_or(&lookup, "SENTIMENT_MAX_RETRIES", 3usize).max(1),
            max_input_chars: parse_or(&lookup, "SENTIMENT_MAX_INPUT_CHARS", DEFAULT_MAX_INPUT_CHARS)
                .max(1),
            top_words: parse_or(&lookup, "DASHBOARD_TOP_WORDS", DEFAULT_TOP_WORDS),
            host,
            port: parse_or(&lookup, "DASHBOARD_PORT", DEFAULT_PORT),
        }
    }

    pub fn raw_reviews_path(&self) -> PathBuf {
        self.data_dir.join(RAW_REVIEWS_FILE)
    }

    pub fn analyzed_reviews_path(&self) -> PathBuf {
        self.data_dir.join(ANALYZED_REVIEWS_FILE)
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(PRODUCTS_FILE)
    }

    pub fn testimonials_path(&self) -> PathBuf {
        self.data_dir.join(TESTIMONIALS_FILE)
    }

    /// Socket address the dashboard binds to. `host` may be an IP literal
    /// (IPv6 with or without brackets) or a resolvable host name.
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.host.trim().trim_start_matches('[').trim_end_matches(']');
        (host, self.port)
            .to_socket_addrs()
            .with_context(|| format!("cannot resolve bind host '{}'", self.host))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("bind host '{}' resolved to no addresses", self.host))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}='{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}
