//! Catalog Batch Downloader Library
//!
//! This library resolves catalog URLs (albums, artists, playlists, profiles and
//! single tracks) into ordered track lists, enriches every track with album and
//! release metadata, substitutes unavailable tracks with equivalent catalog
//! entries and downloads the media payloads into a deterministic library layout.
//!
//! # Modules
//!
//! - `cli` - Command implementations (single URL and batch file downloads)
//! - `config` - Configuration management and environment variables
//! - `deezer` - Session-based catalog API client (session, collections, tracks, search, media)
//! - `download` - Item pipeline, scheduler and the decrypt/tag collaborator seams
//! - `error` - Typed error taxonomy shared by all components
//! - `management` - Download state tracking, ledgers, playlists, credentials and batch files
//! - `types` - Data structures and type definitions
//! - `utils` - URL parsing, file naming and other helpers
//!
//! # Example
//!
//! ```
//! use dzload::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> dzload::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod deezer;
pub mod download;
pub mod error;
pub mod management;
pub mod types;
pub mod utils;

/// A convenient Result type alias for top-level command plumbing.
///
/// Component APIs return the typed errors from [`error`]; this alias is used
/// where heterogeneous failures are funnelled towards `main`.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Connecting to the catalog...");
/// info!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Connected to the catalog");
/// success!("Finished downloading {}", label);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Terminates the program with exit code 1 right after printing. Only used for
/// fatal top-level failures such as a rejected credential.
///
/// # Example
///
/// ```
/// error!("Wrong credentials!");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a failure message with a red cross without exiting.
///
/// Used for per-item failures that must not stop sibling downloads.
#[macro_export]
macro_rules! failure {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✗".red().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("No tracks to download for playlist \"{}\"", name);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
