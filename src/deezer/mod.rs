//! # Catalog API Module
//!
//! Session-based client for the streaming catalog. Every network call made by the
//! downloader goes through this module, so retry, caching and token refresh live in
//! exactly one place.
//!
//! ## Architecture
//!
//! ```text
//! Download pipeline (download::*)
//!          ↓
//! Catalog layer
//!     ├── Collection resolution (album, playlist, profile, artist)
//!     ├── Track metadata and enrichment
//!     ├── Alternative track search
//!     └── Media payload fetch
//!          ↓
//! Session (token, cache, retry)
//!          ↓
//! Transport (reqwest, JSON)
//! ```
//!
//! ## Core Modules
//!
//! - [`session`] - Owns the API token. Issues gateway calls in cached or uncached
//!   mode, retries transport failures with a fixed delay and transparently
//!   re-authenticates when the gateway reports an expired token.
//! - [`collection`] - Turns a [`CollectionRef`](crate::types::CollectionRef) into an
//!   ordered track list plus an album index.
//! - [`track`] - Fetches track and album records and merges them into
//!   [`TrackMetadata`](crate::types::TrackMetadata).
//! - [`search`] - Finds an equivalent catalog entry for a track that can no
//!   longer be fetched.
//! - [`media`] - Fetches raw payload bytes with the 403 retry budget.
//! - [`transport`] - The HTTP seam. Tests replace it with a scripted catalog.
//!
//! ## Request modes
//!
//! Read-mostly lookups (albums, tracks, searches, public album info) use the
//! cached mode. Playlists, profiles, discographies and payloads always hit the
//! network.
//!
//! ## Error Types
//!
//! Functions return [`ApiError`](crate::error::ApiError). Only its `Auth` variant is
//! meant to reach `main`; everything else is turned into an item outcome by the
//! pipeline.

pub mod collection;
pub mod media;
pub mod search;
pub mod session;
pub mod track;
pub mod transport;

pub use collection::{ResolvedCollection, resolve_collection};
pub use search::{find_alternative, select_alternative};
pub use session::{RequestMode, Session};
pub use transport::{HttpTransport, Transport};
