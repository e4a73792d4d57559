use std::{collections::HashSet, path::Path};

use crate::{
    deezer::{
        media::fetch_payload,
        search::find_alternative,
        track::{enrich, get_track, inherit},
    },
    download::DownloadContext,
    error::ApiError,
    types::{AlbumRecord, PlaylistEntry, Quality, TrackMetadata, TrackRecord},
};

/// One entry of a resolved collection.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    /// Collection item id. Progress, outcome and playlist entry are keyed by it.
    pub id: String,
    /// Track record from the collection listing, if the listing had one.
    pub record: Option<TrackRecord>,
    /// Album record from the collection listing, if the listing had one.
    pub album: Option<AlbumRecord>,
}

impl ItemRequest {
    pub fn from_listing(record: TrackRecord, album: Option<AlbumRecord>) -> Self {
        Self {
            id: record.id.clone(),
            record: Some(record),
            album,
        }
    }

    /// A bare track id, resolved from scratch.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record: None,
            album: None,
        }
    }
}

/// A single try at downloading one catalog track on behalf of an item.
#[derive(Debug, Clone)]
struct Attempt {
    track_id: String,
    /// Known record. Always refetched for alternatives.
    record: Option<TrackRecord>,
    album: Option<AlbumRecord>,
    /// Metadata of the track the item originally referred to. Set for
    /// alternatives, which are named and tagged as the original.
    identity: Option<TrackMetadata>,
    is_alternative: bool,
}

impl Attempt {
    fn alternative(
        track_id: String,
        identity: Option<TrackMetadata>,
        album: Option<AlbumRecord>,
    ) -> Self {
        Self {
            track_id,
            record: None,
            album,
            identity,
            is_alternative: true,
        }
    }
}

/// Result of one attempt.
enum Step {
    /// A terminal outcome has been recorded.
    Settled,
    /// Nothing left to try.
    Exhausted(String),
    /// Try again with another track. `give_up` is reported if that is not allowed.
    Restart { next: Box<Attempt>, give_up: String },
}

/// Drives one item to exactly one terminal outcome.
///
/// Only fatal errors (authentication) are returned. Everything else ends as a
/// success, warning or failure on the tracker.
pub async fn run_item(ctx: &DownloadContext, item: ItemRequest) -> Result<(), ApiError> {
    let root = item.id.clone();

    if let Some(record) = &item.record {
        ctx.tracker
            .add(
                &root,
                &format!("{} - {}", record.artist_name, record.display_title()),
            )
            .await;
    }

    let mut attempted: HashSet<String> = HashSet::from([root.clone()]);
    let mut restarts = 0u32;
    let mut attempt = Attempt {
        track_id: root.clone(),
        record: item.record.clone(),
        album: item.album.clone(),
        identity: None,
        is_alternative: false,
    };

    if let Some(record) = item.record.as_ref().filter(|r| r.is_placeholder()) {
        match find_alternative(&ctx.session, record).await {
            Ok(alternative) if attempted.insert(alternative.id.clone()) => {
                log::debug!("placeholder {root} replaced by {}", alternative.id);
                restarts += 1;
                attempt = Attempt::alternative(alternative.id, None, None);
            }
            Err(err) if err.is_fatal() => {
                ctx.tracker.remove(&root).await;
                return Err(err);
            }
            _ => {
                log::debug!("no alternative for placeholder {root}, resolving it directly");
                attempt.record = None;
            }
        }
    }

    loop {
        let step = match process(ctx, &root, attempt).await {
            Ok(step) => step,
            Err(err) => {
                ctx.tracker.remove(&root).await;
                return Err(err);
            }
        };

        match step {
            Step::Settled => return Ok(()),
            Step::Exhausted(message) => {
                ctx.tracker.fail(&root, &message).await;
                return Ok(());
            }
            Step::Restart { next, give_up } => {
                restarts += 1;
                if restarts > ctx.settings.max_restarts
                    || !attempted.insert(next.track_id.clone())
                {
                    log::debug!("{root}: not retrying with {}", next.track_id);
                    ctx.tracker.fail(&root, &give_up).await;
                    return Ok(());
                }
                ctx.tracker.remove(&root).await;
                attempt = *next;
            }
        }
    }
}

async fn process(ctx: &DownloadContext, root: &str, attempt: Attempt) -> Result<Step, ApiError> {
    let record = match attempt.record.clone().filter(|_| !attempt.is_alternative) {
        Some(record) => record,
        None => match get_track(&ctx.session, &attempt.track_id).await {
            Ok(record) => record,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::debug!("track {} unavailable: {err}", attempt.track_id);
                ctx.tracker
                    .fail(root, &format!("Track \"{}\" not found", attempt.track_id))
                    .await;
                return Ok(Step::Settled);
            }
        },
    };

    ctx.tracker
        .update(
            root,
            &format!("{} - {}", record.artist_name, record.display_title()),
        )
        .await;

    let meta = enrich(&ctx.session, record.clone(), attempt.album.clone()).await?;
    let identity = match &attempt.identity {
        Some(original) => inherit(original, &record),
        None => meta.clone(),
    };
    ctx.tracker.update(root, &identity.display_name()).await;

    let quality = ctx.settings.quality.effective_for(&record);
    let path = ctx
        .naming
        .destination(&ctx.settings.download_root, &identity, quality);

    if !ctx.tracker.try_claim_path(&path).await {
        record_entry(ctx, root, &identity, &path).await;
        ctx.tracker
            .success(
                root,
                &format!("{} \n  › Song already exists", identity.display_name()),
            )
            .await;
        return Ok(Step::Settled);
    }

    let url = ctx.codec.payload_url(&record, quality);
    let raw = match fetch_payload(&ctx.session, &url, &record, ctx.settings.retry_delay).await {
        Ok(raw) => raw,
        Err(err) => {
            ctx.tracker.release_path(&path).await;
            log::debug!("payload of {} failed: {err}", record.id);
            return substitute(ctx, &attempt, &record, identity).await;
        }
    };

    finalize(
        ctx,
        root,
        &attempt,
        &record,
        &meta,
        &identity,
        quality,
        raw,
        &path,
    )
    .await;
    ctx.tracker.release_path(&path).await;
    Ok(Step::Settled)
}

/// Picks what to try after a failed payload fetch: the catalog's own fallback
/// id first, then a searched alternative.
async fn substitute(
    ctx: &DownloadContext,
    attempt: &Attempt,
    record: &TrackRecord,
    identity: TrackMetadata,
) -> Result<Step, ApiError> {
    let give_up = format!(
        "{}\n  › The catalog doesn't provide the song anymore",
        identity.display_name()
    );

    if let Some(fallback) = record.fallback_id()
        && fallback != record.id
        && fallback != identity.track.id
    {
        log::debug!(
            "{} unavailable, switching to fallback {fallback}",
            record.id
        );
        let next = Attempt::alternative(fallback, Some(identity), attempt.album.clone());
        return Ok(Step::Restart {
            next: Box::new(next),
            give_up,
        });
    }

    match find_alternative(&ctx.session, &identity.track).await {
        Ok(alternative) => {
            log::debug!(
                "{} unavailable, using alternative {}",
                record.id,
                alternative.id
            );
            let next = Attempt::alternative(alternative.id, Some(identity), None);
            Ok(Step::Restart {
                next: Box::new(next),
                give_up,
            })
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(_) => Ok(Step::Exhausted(give_up)),
    }
}

#[allow(clippy::too_many_arguments)]
async fn finalize(
    ctx: &DownloadContext,
    root: &str,
    attempt: &Attempt,
    record: &TrackRecord,
    meta: &TrackMetadata,
    identity: &TrackMetadata,
    quality: Quality,
    raw: Vec<u8>,
    path: &Path,
) {
    let plain = match ctx.codec.decrypt(raw, record) {
        Ok(plain) => plain,
        Err(err) => {
            ctx.tracker
                .fail(root, &format!("{}\n  › {err}", identity.display_name()))
                .await;
            return;
        }
    };

    if let Err(err) = write_file(path, &plain).await {
        ctx.tracker
            .fail(
                root,
                &format!(
                    "{}\n  › Cannot write {}: {err}",
                    identity.display_name(),
                    path.display()
                ),
            )
            .await;
        return;
    }

    let mut message = identity.display_name();
    if attempt.is_alternative
        && identity.title.trim().to_lowercase() != meta.title.trim().to_lowercase()
    {
        message.push_str(&format!(
            "\n  › Used \"{}\" as alternative",
            meta.display_name()
        ));
    }
    if quality != ctx.settings.quality {
        message.push_str(&format!(
            "\n  › Used \"{quality}\" because \"{}\" wasn't available",
            ctx.settings.quality
        ));
    }

    record_entry(ctx, root, identity, path).await;

    match ctx.tagger.embed_tags(path, identity).await {
        Ok(()) => ctx.tracker.success(root, &message).await,
        Err(err) => {
            log::debug!("tagging {} failed: {err}", path.display());
            ctx.tracker
                .warn(root, &format!("{message}\n  › Failed writing ID3 tags"))
                .await
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }
    async_fs::write(path, bytes).await
}

async fn record_entry(ctx: &DownloadContext, root: &str, identity: &TrackMetadata, path: &Path) {
    ctx.tracker
        .record_playlist_entry(
            root,
            PlaylistEntry {
                duration: identity.track.duration,
                artist: identity.album_artist.clone(),
                title: identity.title.clone(),
                path: path.to_path_buf(),
            },
        )
        .await;
}
