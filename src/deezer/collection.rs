use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    deezer::session::{RequestMode, Session},
    error::ApiError,
    types::{AlbumRecord, CollectionRef, CollectionType, TrackRecord},
};

/// Ordered track list of a collection, with the album records the listing
/// already contained.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCollection {
    pub label: String,
    pub tracks: Vec<TrackRecord>,
    pub albums: HashMap<String, AlbumRecord>,
    /// Set only for genuine playlists. Drives the manifest writer.
    pub playlist_title: Option<String>,
}

impl ResolvedCollection {
    pub fn album_for(&self, track: &TrackRecord) -> Option<&AlbumRecord> {
        self.albums.get(&track.album_id)
    }
}

pub async fn resolve_collection(
    session: &Session,
    collection: &CollectionRef,
) -> Result<ResolvedCollection, ApiError> {
    match collection.kind {
        CollectionType::Album => resolve_album(session, &collection.id).await,
        CollectionType::Playlist => resolve_playlist(session, &collection.id).await,
        CollectionType::Profile => resolve_profile(session, &collection.id).await,
        CollectionType::Artist => resolve_artist(session, &collection.id).await,
        CollectionType::Track => Err(ApiError::Unexpected(
            "a single track is not a collection".to_string(),
        )),
    }
}

async fn resolve_album(session: &Session, id: &str) -> Result<ResolvedCollection, ApiError> {
    let results = session
        .call(
            "deezer.pageAlbum",
            json!({ "alb_id": id, "lang": "en", "tab": 0 }),
            RequestMode::Cached,
        )
        .await?;

    let mut album: AlbumRecord = decode(&results["DATA"], "album")?;
    album.songs = Some(decode(&results["SONGS"], "album songs")?);
    if album.id.is_empty() {
        album.id = id.to_string();
    }

    let tracks = album.songs().to_vec();
    let label = album.title.clone();
    let mut albums = HashMap::new();
    albums.insert(album.id.clone(), album);

    Ok(ResolvedCollection {
        label,
        tracks,
        albums,
        playlist_title: None,
    })
}

async fn resolve_playlist(session: &Session, id: &str) -> Result<ResolvedCollection, ApiError> {
    let results = session
        .call(
            "deezer.pagePlaylist",
            json!({
                "playlist_id": id,
                "lang": "en",
                "nb": -1,
                "start": 0,
                "tab": 0,
                "tags": true,
                "header": true
            }),
            RequestMode::Uncached,
        )
        .await?;

    let tracks: Vec<TrackRecord> = decode_list(&results["SONGS"]["data"], "playlist songs")?;
    let declared_duration = number(&results["DATA"]["DURATION"]);
    if declared_duration > 0 && tracks.is_empty() {
        return Err(ApiError::PrivatePlaylist);
    }

    let title = results["DATA"]["TITLE"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    Ok(ResolvedCollection {
        label: title.clone(),
        tracks,
        albums: HashMap::new(),
        playlist_title: Some(title),
    })
}

async fn resolve_profile(session: &Session, id: &str) -> Result<ResolvedCollection, ApiError> {
    let results = session
        .call(
            "deezer.pageProfile",
            json!({ "user_id": id, "tab": "loved", "nb": -1 }),
            RequestMode::Uncached,
        )
        .await?;

    let tracks = decode_list(&results["TAB"]["loved"]["data"], "profile favourites")?;
    let label = results["DATA"]["USER"]["DISPLAY_NAME"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    Ok(ResolvedCollection {
        label,
        tracks,
        albums: HashMap::new(),
        playlist_title: None,
    })
}

async fn resolve_artist(session: &Session, id: &str) -> Result<ResolvedCollection, ApiError> {
    let artist = session
        .call(
            "artist.getData",
            json!({
                "art_id": id,
                "filter_role_id": [0],
                "lang": "us",
                "tab": 0,
                "nb": -1,
                "start": 0
            }),
            RequestMode::Cached,
        )
        .await?;
    let label = artist["ART_NAME"].as_str().unwrap_or_default().to_string();

    let discography = session
        .call(
            "album.getDiscography",
            json!({
                "art_id": id,
                "filter_role_id": [0],
                "lang": "us",
                "nb": 500,
                "nb_songs": -1,
                "start": 0
            }),
            RequestMode::Uncached,
        )
        .await?;

    let releases: Vec<AlbumRecord> = decode_list(&discography["data"], "discography")?;
    let mut tracks = Vec::new();
    let mut albums = HashMap::new();
    for album in releases {
        tracks.extend(album.songs().iter().cloned());
        albums.insert(album.id.clone(), album);
    }

    Ok(ResolvedCollection {
        label,
        tracks,
        albums,
        playlist_title: None,
    })
}

fn decode<T: DeserializeOwned + Default>(value: &Value, what: &str) -> Result<T, ApiError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| ApiError::Unexpected(format!("cannot decode {what}: {e}")))
}

fn decode_list<T: DeserializeOwned>(value: &Value, what: &str) -> Result<Vec<T>, ApiError> {
    match value {
        Value::Null => Ok(Vec::new()),
        _ => serde_json::from_value(value.clone())
            .map_err(|e| ApiError::Unexpected(format!("cannot decode {what}: {e}"))),
    }
}

fn number(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
