use serde_json::json;

use crate::{
    deezer::session::{RequestMode, Session},
    error::ApiError,
    types::{AlbumRecord, Lyrics, ReleaseInfo, SongList, TrackMetadata, TrackRecord},
};

/// Canonical track record, with inline lyrics when the catalog has them.
pub async fn get_track(session: &Session, id: &str) -> Result<TrackRecord, ApiError> {
    let results = session
        .call(
            "deezer.pageTrack",
            json!({ "sng_id": id }),
            RequestMode::Cached,
        )
        .await?;

    if results["DATA"].is_null() {
        return Err(ApiError::NotFound(format!("Track \"{id}\"")));
    }

    let mut track: TrackRecord = serde_json::from_value(results["DATA"].clone())
        .map_err(|e| ApiError::Unexpected(format!("cannot decode track {id}: {e}")))?;

    if let Ok(lyrics) = serde_json::from_value::<Lyrics>(results["LYRICS"].clone())
        && !lyrics.text.is_empty()
    {
        track.lyrics = Some(lyrics);
    }

    Ok(track)
}

pub async fn get_album(session: &Session, id: &str) -> Result<AlbumRecord, ApiError> {
    let results = session
        .call(
            "deezer.pageAlbum",
            json!({ "alb_id": id, "lang": "us", "tab": 0 }),
            RequestMode::Cached,
        )
        .await?;

    if results["DATA"].is_null() || results["SONGS"].is_null() {
        return Err(ApiError::NotFound(format!("Album \"{id}\"")));
    }

    let mut album: AlbumRecord = serde_json::from_value(results["DATA"].clone())
        .map_err(|e| ApiError::Unexpected(format!("cannot decode album {id}: {e}")))?;
    let songs: SongList = serde_json::from_value(results["SONGS"].clone())
        .map_err(|e| ApiError::Unexpected(format!("cannot decode album {id} songs: {e}")))?;
    album.songs = Some(songs);

    Ok(album)
}

/// Release type and genres from the public catalog.
pub async fn get_release_info(session: &Session, album_id: &str) -> Result<ReleaseInfo, ApiError> {
    let response = session.public_json(&format!("album/{album_id}")).await?;

    let record_type = response["record_type"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let genres = response["genres"]["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|g| g["name"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ReleaseInfo {
        record_type,
        genres,
    })
}

/// Resolves the album and release info of `track` and merges them.
///
/// Every failure here is swallowed except authentication: the track is still
/// downloadable with default album fields.
pub async fn enrich(
    session: &Session,
    track: TrackRecord,
    album: Option<AlbumRecord>,
) -> Result<TrackMetadata, ApiError> {
    let has_album_id = !track.album_id.is_empty() && track.album_id != "0";

    let mut album = match album {
        Some(album) => Some(album),
        None if has_album_id => match get_album(session, &track.album_id).await {
            Ok(album) => Some(album),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::debug!("album {} unavailable: {err}", track.album_id);
                None
            }
        },
        None => None,
    };

    let needs_release_info = album.as_ref().is_none_or(|a| !a.has_release_info());
    if has_album_id && needs_release_info {
        match get_release_info(session, &track.album_id).await {
            Ok(info) => {
                let target = album.get_or_insert_with(AlbumRecord::default);
                target.release_type = info.record_type;
                target.genres = info.genres;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => log::debug!("no release info for album {}: {err}", track.album_id),
        }
    }

    Ok(merge(track, album.as_ref()))
}

/// Merges a track with its album. Track fields win where both are set.
pub fn merge(track: TrackRecord, album: Option<&AlbumRecord>) -> TrackMetadata {
    let empty = AlbumRecord::default();
    let album = album.unwrap_or(&empty);

    let mut album_artist = if album.artist_name.trim().is_empty() {
        track.artist_name.clone()
    } else {
        album.artist_name.clone()
    };

    let artists: Vec<String> = if track.artists.is_empty() {
        vec![album_artist.clone()]
    } else {
        track.artists.iter().map(|a| a.name.clone()).collect()
    };

    if album_artist.trim().eq_ignore_ascii_case("various") {
        album_artist = "Various Artists".to_string();
    }

    let release_date = if track.release_date.trim().is_empty() {
        album.release_date.clone()
    } else {
        track.release_date.clone()
    };

    let album_title = if track.album_title.trim().is_empty() {
        album.title.clone()
    } else {
        track.album_title.clone()
    };

    TrackMetadata {
        title: track.display_title(),
        lyrics: track.lyrics_text(),
        album_artist,
        artists,
        album_title,
        label: album.label.clone(),
        upc: album.upc.clone(),
        release_date,
        disc_count: album.disc_count(),
        track_count: album.track_count(),
        release_type: album.release_type.clone(),
        genres: album.genres.clone(),
        track,
    }
}

/// Keeps the identity of `original` (naming and tags) while taking the
/// playable attributes of `substitute`.
pub fn inherit(original: &TrackMetadata, substitute: &TrackRecord) -> TrackMetadata {
    let mut merged = original.clone();
    merged.track.duration = substitute.duration;
    merged.track.gain = substitute.gain.clone();
    merged.track.lyrics = substitute.lyrics.clone();
    merged.lyrics = substitute.lyrics_text();
    merged
}
