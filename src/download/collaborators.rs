//! Seams for the payload-format specific steps.
//!
//! URL derivation and decryption are opaque to the pipeline and supplied through
//! [`PayloadCodec`]. Tag embedding goes through [`Tagger`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lofty::{
    config::WriteOptions,
    file::{AudioFile, TaggedFileExt},
    prelude::Accessor,
    read_from_path,
    tag::{ItemKey, Tag},
};

use crate::{
    error::{DecryptError, TagError},
    types::{Quality, TrackMetadata, TrackRecord},
};

pub trait PayloadCodec: Send + Sync {
    /// Where the payload of `track` in `quality` can be fetched.
    fn payload_url(&self, track: &TrackRecord, quality: Quality) -> String;

    fn decrypt(&self, raw: Vec<u8>, track: &TrackRecord) -> Result<Vec<u8>, DecryptError>;
}

/// Codec for mirrors that serve plain payloads addressed by checksum.
pub struct PassthroughCodec {
    media_base: String,
}

impl PassthroughCodec {
    pub fn new(media_base: impl Into<String>) -> Self {
        Self {
            media_base: media_base.into(),
        }
    }
}

impl PayloadCodec for PassthroughCodec {
    fn payload_url(&self, track: &TrackRecord, quality: Quality) -> String {
        format!(
            "{}/{}/{}/{}",
            self.media_base.trim_end_matches('/'),
            track.checksum,
            quality.id(),
            track.media_version
        )
    }

    fn decrypt(&self, raw: Vec<u8>, track: &TrackRecord) -> Result<Vec<u8>, DecryptError> {
        if raw.is_empty() {
            let id = &track.id;
            return Err(DecryptError(format!("empty payload for track {id}")));
        }
        Ok(raw)
    }
}

/// Embeds metadata into a file that already exists at `path`.
#[async_trait]
pub trait Tagger: Send + Sync {
    async fn embed_tags(&self, path: &Path, meta: &TrackMetadata) -> Result<(), TagError>;
}

/// Writes the primary tag of the file type (ID3v2 for MP3, Vorbis comments for FLAC).
pub struct LoftyTagger;

#[async_trait]
impl Tagger for LoftyTagger {
    async fn embed_tags(&self, path: &Path, meta: &TrackMetadata) -> Result<(), TagError> {
        let path: PathBuf = path.to_path_buf();
        let meta = meta.clone();

        tokio::task::spawn_blocking(move || write_tags(&path, &meta))
            .await
            .map_err(|e| TagError(e.to_string()))?
    }
}

fn write_tags(path: &Path, meta: &TrackMetadata) -> Result<(), TagError> {
    let mut tagged_file = read_from_path(path).map_err(|e| TagError(e.to_string()))?;
    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| TagError(format!("no writable tag for {tag_type:?}")))?;

    tag.set_title(meta.title.clone());
    tag.set_artist(meta.artists.join(", "));
    tag.set_album(meta.album_title.clone());
    tag.insert_text(ItemKey::AlbumArtist, meta.album_artist.clone());

    if meta.track.track_number > 0 {
        tag.set_track(meta.track.track_number);
    }
    if meta.track_count > 0 {
        tag.set_track_total(meta.track_count);
    }
    if meta.track.disk_number > 0 {
        tag.set_disk(meta.track.disk_number);
    }
    if meta.disc_count > 0 {
        tag.set_disk_total(meta.disc_count);
    }
    if !meta.genres.is_empty() {
        tag.set_genre(meta.genres.join(", "));
    }
    if !meta.label.is_empty() {
        tag.insert_text(ItemKey::Label, meta.label.clone());
    }
    if !meta.release_date.is_empty() {
        tag.insert_text(ItemKey::RecordingDate, meta.release_date.clone());
    }
    if !meta.upc.is_empty() {
        tag.insert_text(ItemKey::Barcode, meta.upc.clone());
    }
    if let Some(lyrics) = &meta.lyrics {
        tag.insert_text(ItemKey::Lyrics, lyrics.clone());
    }

    tag.remove_empty();
    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|e| TagError(e.to_string()))
}
