//! # CLI Module
//!
//! Command implementations for the `dzload` binary. Argument parsing lives in
//! `main.rs`; everything here receives already-parsed values.
//!
//! ## Commands
//!
//! - [`login`] - Stores the session secret in the credential store
//! - [`connect`] - Authenticates and assembles the [`DownloadContext`](crate::download::DownloadContext)
//! - [`download`] - Downloads a single catalog URL (album, artist, playlist, profile or track)
//! - [`batch`] - Consumes a newline-delimited URL file from its head
//!
//! ## Output
//!
//! Per-track outcomes are printed by the download tracker while the spinner is
//! suspended. Each finished collection is followed by a one-row summary table.
//! Only authentication problems end the process early, through `error!`.
//!
//! ## Usage Patterns
//!
//! ```bash
//! dzload login <ARL>
//! dzload download https://www.deezer.com/album/302127
//! dzload download https://www.deezer.com/playlist/908622995 --quality FLAC --path ~/Music
//! dzload batch --file downloadLinks.txt
//! ```

mod batch;
mod connect;
mod download;
mod login;

pub use batch::batch;
pub use connect::connect;
pub use download::{download, print_summary};
pub use login::login;
