//! Configuration management for the catalog downloader.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. Every tunable has a sensible default so that a bare
//! installation works against the public catalog endpoints; the `.env` file only
//! needs to override what differs.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults
//!
//! Components never read the environment themselves. [`Settings::from_env`]
//! snapshots all values once and the resulting structs are passed down explicitly.

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::types::Quality;

/// Name of the per-user application directory below the local data directory.
pub const APP_DIR: &str = "dzload";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `dzload/.env`. A missing file is not an error,
/// the built-in defaults apply instead.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/dzload/.env`
/// - macOS: `~/Library/Application Support/dzload/.env`
/// - Windows: `%LOCALAPPDATA%/dzload/.env`
///
/// # Errors
///
/// Returns an error string if the parent directory cannot be created or if an
/// existing `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = app_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Returns the platform-specific application directory (`<data_local_dir>/dzload`).
pub fn app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("ignoring invalid value {raw:?} for {key}");
                default
            }
        },
        Err(_) => default,
    }
}

/// Returns the private gateway endpoint every session call is posted to.
///
/// Reads `DZ_GATEWAY_URL`, defaulting to `https://www.deezer.com/ajax/gw-light.php`.
pub fn gateway_url() -> String {
    var_or("DZ_GATEWAY_URL", "https://www.deezer.com/ajax/gw-light.php")
}

/// Returns the public catalog API base used for release type and genre lookups.
///
/// Reads `DZ_PUBLIC_API_URL`, defaulting to `https://api.deezer.com`.
pub fn public_api_url() -> String {
    var_or("DZ_PUBLIC_API_URL", "https://api.deezer.com")
}

/// Returns the public site base used to build canonical item URLs for the ledgers.
///
/// Reads `DZ_SITE_URL`, defaulting to `https://www.deezer.com`.
pub fn site_url() -> String {
    var_or("DZ_SITE_URL", "https://www.deezer.com")
}

/// Returns the base URL of the media mirror payloads are fetched from.
///
/// Reads `DZ_MEDIA_URL`, defaulting to `https://e-cdns-proxy-0.dzcdn.net/mobile/1`.
pub fn media_url() -> String {
    var_or("DZ_MEDIA_URL", "https://e-cdns-proxy-0.dzcdn.net/mobile/1")
}

/// Lifetime of a cached catalog response (`DZ_CACHE_TTL_SECS`, default two hours).
pub fn cache_ttl() -> Duration {
    Duration::from_secs(parse_or("DZ_CACHE_TTL_SECS", 7200u64))
}

/// Maximum number of cached catalog responses (`DZ_CACHE_CAPACITY`, default 1000).
pub fn cache_capacity() -> u64 {
    parse_or("DZ_CACHE_CAPACITY", 1000u64)
}

/// Retry ceiling for transport failures (`DZ_TRANSPORT_RETRIES`, default 10).
///
/// A value of `0` retries without limit.
pub fn transport_retries() -> u32 {
    parse_or("DZ_TRANSPORT_RETRIES", 10u32)
}

/// Fixed delay between retries of any kind (`DZ_RETRY_DELAY_MS`, default 1000).
pub fn retry_delay() -> Duration {
    Duration::from_millis(parse_or("DZ_RETRY_DELAY_MS", 1000u64))
}

/// Consecutive token refreshes tolerated before giving up (`DZ_TOKEN_REFRESH_LIMIT`, default 3).
pub fn token_refresh_limit() -> u32 {
    parse_or("DZ_TOKEN_REFRESH_LIMIT", 3u32)
}

/// Pipeline restarts allowed per item (`DZ_MAX_RESTARTS`, default 4).
///
/// Each fallback hop or searched alternative counts as one restart.
pub fn max_restarts() -> u32 {
    parse_or("DZ_MAX_RESTARTS", 4u32)
}

/// Directory the outcome ledgers are written to (`DZ_LEDGER_DIR`, default `.`).
pub fn ledger_dir() -> PathBuf {
    PathBuf::from(var_or("DZ_LEDGER_DIR", "."))
}

/// Directory playlist manifests are written to (`DZ_PLAYLIST_DIR`, default `PLAYLISTS`).
pub fn playlist_dir() -> PathBuf {
    PathBuf::from(var_or("DZ_PLAYLIST_DIR", "PLAYLISTS"))
}

/// Batch input file (`DZ_BATCH_FILE`, default `downloadLinks.txt`).
pub fn batch_file() -> PathBuf {
    PathBuf::from(var_or("DZ_BATCH_FILE", "downloadLinks.txt"))
}

/// Session secret used when the credential store holds none.
pub fn fallback_arl() -> Option<String> {
    env::var("DZ_ARL").ok().filter(|v| !v.trim().is_empty())
}

/// Settings consumed by the session manager and the catalog resolvers.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub gateway_url: String,
    pub public_api_url: String,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
    /// `None` retries transport failures forever.
    pub transport_retries: Option<u32>,
    pub retry_delay: Duration,
    pub token_refresh_limit: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            gateway_url: "https://www.deezer.com/ajax/gw-light.php".to_string(),
            public_api_url: "https://api.deezer.com".to_string(),
            cache_ttl: Duration::from_secs(7200),
            cache_capacity: 1000,
            transport_retries: Some(10),
            retry_delay: Duration::from_millis(1000),
            token_refresh_limit: 3,
        }
    }
}

/// Settings consumed by the scheduler, the item pipeline and the state tracker.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub download_root: PathBuf,
    pub quality: Quality,
    pub site_url: String,
    pub media_url: String,
    pub ledger_dir: PathBuf,
    pub playlist_dir: PathBuf,
    pub retry_delay: Duration,
    /// Upper bound of pipeline restarts (fallback hop or searched alternative) per item.
    pub max_restarts: u32,
    /// Fixed pool width. `None` sizes the pool from free memory.
    pub concurrency: Option<usize>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("DOWNLOADS"),
            quality: Quality::Mp3_320,
            site_url: "https://www.deezer.com".to_string(),
            media_url: "https://e-cdns-proxy-0.dzcdn.net/mobile/1".to_string(),
            ledger_dir: PathBuf::from("."),
            playlist_dir: PathBuf::from("PLAYLISTS"),
            retry_delay: Duration::from_millis(1000),
            max_restarts: 4,
            concurrency: None,
        }
    }
}

/// Snapshot of every tunable, split by consumer.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub session: SessionSettings,
    pub download: DownloadSettings,
}

impl Settings {
    /// Reads all settings from the environment. Call after [`load_env`].
    pub fn from_env(download_root: PathBuf, quality: Quality) -> Self {
        let retries = transport_retries();
        let delay = retry_delay();

        Self {
            session: SessionSettings {
                gateway_url: gateway_url(),
                public_api_url: public_api_url(),
                cache_ttl: cache_ttl(),
                cache_capacity: cache_capacity(),
                transport_retries: (retries > 0).then_some(retries),
                retry_delay: delay,
                token_refresh_limit: token_refresh_limit(),
            },
            download: DownloadSettings {
                download_root,
                quality,
                site_url: site_url(),
                media_url: media_url(),
                ledger_dir: ledger_dir(),
                playlist_dir: playlist_dir(),
                retry_delay: delay,
                max_restarts: max_restarts(),
                concurrency: None,
            },
        }
    }
}
