//! Server configuration, layered the way the original Go service loads
//! `config.yml`: a file plus environment overrides, `.`-separated nested
//! keys translated from `_`-separated env var names.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::errors::{Error, Result};

fn default_logger() -> String {
    "info".to_string()
}

fn default_udp() -> SocketAddr {
    "0.0.0.0:5060".parse().unwrap()
}

fn default_api() -> SocketAddr {
    "0.0.0.0:8090".parse().unwrap()
}

fn default_mod() -> String {
    "release".to_string()
}

fn default_record_expire() -> u32 {
    7
}

fn default_record_max() -> u32 {
    600
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaServerConfig {
    pub restful: String,
    #[serde(default)]
    pub http: String,
    #[serde(default)]
    pub ws: String,
    #[serde(default)]
    pub rtmp: String,
    #[serde(default)]
    pub rtsp: String,
    #[serde(default)]
    pub rtp: String,
    #[serde(default)]
    pub secret: String,
}

/// Which output protocols the media server should be told to expose.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub hls: bool,
    #[serde(default)]
    pub rtmp: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordConfig {
    #[serde(default)]
    pub filepath: String,
    #[serde(default = "default_record_expire")]
    pub expire: u32,
    #[serde(default = "default_record_max")]
    pub recordmax: u32,
}

impl Default for RecordConfig {
    fn default() -> Self {
        RecordConfig {
            filepath: String::new(),
            expire: default_record_expire(),
            recordmax: default_record_max(),
        }
    }
}

/// The region/channel/device id prefixes this server answers to, and the
/// counters it reports back in catalog responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Gb28181Config {
    pub region: String,
    pub cid: String,
    #[serde(default)]
    pub cnum: u32,
    pub did: String,
    #[serde(default)]
    pub dnum: u32,
    pub lid: String,
}

/// Top-level server configuration, `mapstructure`-equivalent to the
/// original service's flat/nested key set: `mod`, `logger`, `udp`, `api`,
/// `secret`, `media.*`, `record.*`, `gb28181.*`, and a `notify` map whose
/// keys use `_` in place of `.` (translated on load, see [`Config::load`]).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_mod")]
    pub r#mod: String,
    #[serde(default = "default_logger")]
    pub logger: String,
    #[serde(default = "default_udp")]
    pub udp: SocketAddr,
    #[serde(default = "default_api")]
    pub api: SocketAddr,
    #[serde(default)]
    pub secret: String,
    pub media: MediaServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub record: RecordConfig,
    pub gb28181: Gb28181Config,
    #[serde(default)]
    pub notify: std::collections::HashMap<String, String>,

    /// Derived from `notify` at load time: keys with `_` replaced by `.`,
    /// empty values dropped. This is what the webhook dispatcher actually
    /// keys lookups against.
    #[serde(skip)]
    pub notify_map: std::collections::HashMap<String, String>,
}

impl Config {
    /// Loads `config.yml` from `path` (or the current directory if `path`
    /// is empty), overlaying `GB28181_`-prefixed environment variables
    /// with `_` standing in for `.` in nested keys, matching the
    /// viper-based loader this was ported from.
    pub fn load(path: &str) -> Result<Config> {
        let mut builder = ::config::Config::builder()
            .set_default("mod", "release")
            .map_err(|e| Error::Config(e.to_string()))?
            .set_default("logger", "info")
            .map_err(|e| Error::Config(e.to_string()))?
            .set_default("udp", "0.0.0.0:5060")
            .map_err(|e| Error::Config(e.to_string()))?
            .set_default("api", "0.0.0.0:8090")
            .map_err(|e| Error::Config(e.to_string()))?;

        let file_stem = if path.is_empty() { "config" } else { path };
        builder = builder.add_source(::config::File::with_name(file_stem).required(false));
        builder = builder.add_source(
            ::config::Environment::with_prefix("GB28181")
                .separator("_")
                .try_parsing(true),
        );

        let raw = builder.build().map_err(|e| Error::Config(e.to_string()))?;
        let mut cfg: Config = raw.try_deserialize().map_err(|e| Error::Config(e.to_string()))?;

        cfg.r#mod = cfg.r#mod.to_uppercase();
        cfg.notify_map = cfg
            .notify
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.replace('_', "."), v.clone()))
            .collect();
        if cfg.record.expire == 0 {
            cfg.record.expire = default_record_expire();
        }
        if cfg.record.recordmax == 0 {
            cfg.record.recordmax = default_record_max();
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_keys_translate_underscore_to_dot() {
        let mut notify = std::collections::HashMap::new();
        notify.insert("device_online".to_string(), "http://example.com/hook".to_string());
        notify.insert("device_offline".to_string(), String::new());

        let translated: std::collections::HashMap<String, String> = notify
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.replace('_', "."), v.clone()))
            .collect();

        assert_eq!(translated.get("device.online"), Some(&"http://example.com/hook".to_string()));
        assert!(!translated.contains_key("device.offline"));
    }
}
