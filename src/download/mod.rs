//! Download orchestration.
//!
//! A collection is resolved into an ordered item list, every item is driven
//! through the [`pipeline`] by the [`scheduler`] and the shared
//! [`DownloadTracker`] records the outcomes. Playlist collections with at least
//! one track additionally get a manifest once every item has settled.

pub mod collaborators;
pub mod naming;
pub mod pipeline;
pub mod scheduler;

use std::sync::Arc;

pub use collaborators::{LoftyTagger, PassthroughCodec, PayloadCodec, Tagger};
pub use naming::NamingScheme;
pub use pipeline::ItemRequest;

use crate::{
    config::DownloadSettings,
    deezer::{Session, resolve_collection},
    error::ApiError,
    failure,
    management::{CollectionSummary, DownloadTracker, write_manifest},
    types::{CollectionRef, CollectionType},
    warning,
};

/// Everything a pipeline needs, passed explicitly to every item.
pub struct DownloadContext {
    pub session: Arc<Session>,
    pub tracker: Arc<DownloadTracker>,
    pub codec: Arc<dyn PayloadCodec>,
    pub tagger: Arc<dyn Tagger>,
    pub naming: NamingScheme,
    pub settings: DownloadSettings,
}

/// Downloads one collection (or single track) and returns its summary.
///
/// A collection that cannot be resolved is reported and yields `Ok(None)`.
/// Only fatal errors are returned; the ledgers are closed before that happens.
pub async fn run_collection(
    ctx: &DownloadContext,
    collection: CollectionRef,
    from_batch: bool,
) -> Result<Option<CollectionSummary>, ApiError> {
    let tracker = &ctx.tracker;
    tracker
        .start_collection(collection.clone(), from_batch)
        .await
        .map_err(|e| ApiError::Unexpected(format!("cannot open ledgers: {e}")))?;

    if collection.kind == CollectionType::Track {
        tracker.set_total(1).await;
        let outcome = pipeline::run_item(ctx, ItemRequest::bare(collection.id.clone())).await;
        return finish(ctx, outcome, from_batch).await;
    }

    let resolved = match resolve_collection(&ctx.session, &collection).await {
        Ok(resolved) => resolved,
        Err(err) if err.is_fatal() => {
            close(ctx).await;
            return Err(err);
        }
        Err(err) => {
            failure!(
                "Could not fetch {} \"{}\": {err}",
                collection.kind,
                collection.id
            );
            close(ctx).await;
            return Ok(None);
        }
    };

    tracker.set_label(&resolved.label).await;
    if resolved.tracks.is_empty() {
        warning!(
            "No tracks to download for {} \"{}\"",
            collection.kind,
            resolved.label
        );
    }

    if resolved.playlist_title.is_some() {
        tracker.enable_playlist().await;
    }

    let order: Vec<String> = resolved.tracks.iter().map(|t| t.id.clone()).collect();
    let items: Vec<ItemRequest> = resolved
        .tracks
        .iter()
        .map(|t| ItemRequest::from_listing(t.clone(), resolved.album_for(t).cloned()))
        .collect();

    tracker.set_total(items.len()).await;
    let outcome = scheduler::run(ctx, items).await;

    // An empty playlist ends without a manifest
    if let Some(title) = &resolved.playlist_title
        && !order.is_empty()
        && let Some(entries) = tracker.take_playlist_entries().await
        && let Err(err) = write_manifest(&ctx.settings.playlist_dir, title, &order, &entries).await
    {
        failure!("Could not write playlist \"{title}\": {err}");
    }

    finish(ctx, outcome, from_batch).await
}

async fn finish(
    ctx: &DownloadContext,
    outcome: Result<(), ApiError>,
    from_batch: bool,
) -> Result<Option<CollectionSummary>, ApiError> {
    if let Err(err) = outcome {
        close(ctx).await;
        return Err(err);
    }

    ctx.tracker
        .finish_collection(!from_batch)
        .await
        .map_err(|e| ApiError::Unexpected(format!("cannot close ledgers: {e}")))
}

async fn close(ctx: &DownloadContext) {
    if let Err(err) = ctx.tracker.close_ledgers().await {
        log::error!("cannot close ledgers: {err}");
    }
}
