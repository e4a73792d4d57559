use serde_json::json;

use crate::{
    deezer::session::{RequestMode, Session},
    error::{ApiError, NoAlternative},
    types::TrackRecord,
    utils::normalize_title,
};

/// Seconds a candidate may be shorter than the original.
const SHORTER_TOLERANCE: i64 = 5;
/// Seconds a candidate may be longer than the original.
const LONGER_TOLERANCE: i64 = 10;

/// Searches the catalog for a track equivalent to `original`.
///
/// Only authentication failures are reported as such. Every other failure,
/// including an empty or unusable result set, is [`ApiError::NoAlternative`].
pub async fn find_alternative(
    session: &Session,
    original: &TrackRecord,
) -> Result<TrackRecord, ApiError> {
    let query = format!(
        "artist:'{}' track:'{}'",
        original.artist_name, original.title
    );

    let results = match session
        .call(
            "search.music",
            json!({ "QUERY": query, "OUTPUT": "TRACK", "NB": 50, "FILTER": 0 }),
            RequestMode::Cached,
        )
        .await
    {
        Ok(results) => results,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            log::debug!("search for {} failed: {err}", original.id);
            return Err(NoAlternative.into());
        }
    };

    let candidates: Vec<TrackRecord> = match serde_json::from_value(results["data"].clone()) {
        Ok(candidates) => candidates,
        Err(err) => {
            log::debug!("cannot decode search results for {}: {err}", original.id);
            return Err(NoAlternative.into());
        }
    };

    Ok(select_alternative(original, &candidates)?)
}

/// Deterministic choice among search results, in server order.
///
/// The original itself is never a candidate. Candidates sharing the
/// original's checksum and lying within `[duration - 5, duration + 10]` are
/// kept; a single survivor wins outright.
/// With no survivor the duration window is dropped. The first remaining
/// candidate whose normalized title equals the original's is chosen.
pub fn select_alternative(
    original: &TrackRecord,
    candidates: &[TrackRecord],
) -> Result<TrackRecord, NoAlternative> {
    let duration = i64::from(original.duration);
    let same_payload: Vec<&TrackRecord> = candidates
        .iter()
        .filter(|c| c.id != original.id && c.checksum == original.checksum)
        .collect();

    let in_window: Vec<&TrackRecord> = same_payload
        .iter()
        .copied()
        .filter(|c| {
            let d = i64::from(c.duration);
            duration - SHORTER_TOLERANCE <= d && d <= duration + LONGER_TOLERANCE
        })
        .collect();

    if let [only] = in_window.as_slice() {
        return Ok((*only).clone());
    }

    let pool = if in_window.is_empty() {
        same_payload
    } else {
        in_window
    };

    let wanted = normalize_title(&original.display_title());
    pool.into_iter()
        .find(|c| normalize_title(&c.display_title()) == wanted)
        .cloned()
        .ok_or(NoAlternative)
}
