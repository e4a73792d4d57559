use std::{fmt, path::PathBuf, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

use crate::error::UrlError;

/// The gateway mixes strings and numbers for the same field depending on the
/// endpoint, and sends `null` or `[]` for absent objects.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        })
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + Default,
    {
        let raw = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Ok(T::default()),
        };
        Ok(raw.trim().parse::<T>().unwrap_or_default())
    }

    pub fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Album,
    Artist,
    Playlist,
    Profile,
    Track,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Album => "album",
            CollectionType::Artist => "artist",
            CollectionType::Playlist => "playlist",
            CollectionType::Profile => "profile",
            CollectionType::Track => "track",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionType {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "album" => Ok(CollectionType::Album),
            "artist" => Ok(CollectionType::Artist),
            "playlist" => Ok(CollectionType::Playlist),
            "profile" => Ok(CollectionType::Profile),
            "track" => Ok(CollectionType::Track),
            other => Err(UrlError::UnsupportedType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub kind: CollectionType,
    pub id: String,
}

impl CollectionRef {
    pub fn new(kind: CollectionType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// `<site>/<type>/<id>`, the form written to the outcome ledgers.
    pub fn canonical_url(&self, site: &str) -> String {
        format!("{}/{}/{}", site.trim_end_matches('/'), self.kind, self.id)
    }

    pub fn is_placeholder(&self) -> bool {
        crate::utils::is_placeholder_id(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(rename = "ART_ID", default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(rename = "ART_NAME", default, deserialize_with = "lenient::string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lyrics {
    #[serde(rename = "LYRICS_TEXT", default, deserialize_with = "lenient::string")]
    pub text: String,
}

/// A track as the gateway describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    #[serde(rename = "SNG_ID", default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(rename = "SNG_TITLE", default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(rename = "VERSION", default, deserialize_with = "lenient::string")]
    pub version: String,
    #[serde(rename = "DURATION", default, deserialize_with = "lenient::number")]
    pub duration: u32,
    #[serde(rename = "ART_ID", default, deserialize_with = "lenient::string")]
    pub artist_id: String,
    #[serde(rename = "ART_NAME", default, deserialize_with = "lenient::string")]
    pub artist_name: String,
    #[serde(rename = "ARTISTS", default, deserialize_with = "lenient::seq")]
    pub artists: Vec<ArtistRef>,
    #[serde(rename = "ALB_ID", default, deserialize_with = "lenient::string")]
    pub album_id: String,
    #[serde(rename = "ALB_TITLE", default, deserialize_with = "lenient::string")]
    pub album_title: String,
    #[serde(
        rename = "ALB_RELEASE_DATE",
        default,
        deserialize_with = "lenient::string"
    )]
    pub release_date: String,
    #[serde(rename = "DISK_NUMBER", default, deserialize_with = "lenient::number")]
    pub disk_number: u32,
    #[serde(rename = "TRACK_NUMBER", default, deserialize_with = "lenient::number")]
    pub track_number: u32,
    #[serde(rename = "MD5_ORIGIN", default, deserialize_with = "lenient::string")]
    pub checksum: String,
    #[serde(
        rename = "MEDIA_VERSION",
        default,
        deserialize_with = "lenient::string"
    )]
    pub media_version: String,
    #[serde(rename = "GAIN", default, deserialize_with = "lenient::string")]
    pub gain: String,
    #[serde(rename = "RIGHTS", default)]
    pub rights: Option<Value>,
    #[serde(rename = "AVAILABLE_COUNTRIES", default)]
    pub available_countries: Option<Value>,
    #[serde(rename = "FALLBACK", default)]
    pub fallback: Option<Value>,
    #[serde(
        rename = "FILESIZE_MP3_128",
        default,
        deserialize_with = "lenient::number"
    )]
    pub filesize_mp3_128: u64,
    #[serde(
        rename = "FILESIZE_MP3_320",
        default,
        deserialize_with = "lenient::number"
    )]
    pub filesize_mp3_320: u64,
    #[serde(
        rename = "FILESIZE_FLAC",
        default,
        deserialize_with = "lenient::number"
    )]
    pub filesize_flac: u64,
    #[serde(rename = "FILESIZE", default, deserialize_with = "lenient::number")]
    pub filesize: u64,
    #[serde(rename = "LYRICS", default)]
    pub lyrics: Option<Lyrics>,
}

impl TrackRecord {
    /// Title with the version suffix appended, e.g. `Song (Live)`.
    pub fn display_title(&self) -> String {
        if self.version.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.version)
                .trim()
                .to_string()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        crate::utils::is_placeholder_id(&self.id)
    }

    /// Id of the catalog's own replacement for this track, if it names one.
    pub fn fallback_id(&self) -> Option<String> {
        let id = match self.fallback.as_ref()?.get("SNG_ID")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty() && id != "0").then_some(id)
    }

    /// True when the track carries explicit distribution rights or may be
    /// streamed with ads. Such tracks get a larger 403 retry budget.
    pub fn has_distribution_rights(&self) -> bool {
        let rights = match &self.rights {
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            _ => false,
        };

        let stream_ads = self
            .available_countries
            .as_ref()
            .and_then(|countries| countries.get("STREAM_ADS"))
            .and_then(Value::as_array)
            .is_some_and(|countries| !countries.is_empty());

        rights || stream_ads
    }

    pub fn lyrics_text(&self) -> Option<String> {
        self.lyrics
            .as_ref()
            .map(|l| l.text.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn advertised_size(&self, quality: Quality) -> u64 {
        match quality {
            Quality::Mp3_128 => self.filesize_mp3_128,
            Quality::Mp3_320 => self.filesize_mp3_320,
            Quality::Flac => self.filesize_flac,
            Quality::Mp3Misc => self.filesize,
        }
    }

    fn advertises_any_size(&self) -> bool {
        self.filesize_mp3_128 > 0
            || self.filesize_mp3_320 > 0
            || self.filesize_flac > 0
            || self.filesize > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongList {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub data: Vec<TrackRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumRecord {
    #[serde(rename = "ALB_ID", default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(rename = "ALB_TITLE", default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(rename = "ART_NAME", default, deserialize_with = "lenient::string")]
    pub artist_name: String,
    #[serde(rename = "LABEL_NAME", default, deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(rename = "UPC", default, deserialize_with = "lenient::string")]
    pub upc: String,
    #[serde(
        rename = "PHYSICAL_RELEASE_DATE",
        default,
        deserialize_with = "lenient::string"
    )]
    pub release_date: String,
    #[serde(rename = "SONGS", default)]
    pub songs: Option<SongList>,
    #[serde(skip)]
    pub release_type: Option<String>,
    #[serde(skip)]
    pub genres: Vec<String>,
}

impl AlbumRecord {
    pub fn songs(&self) -> &[TrackRecord] {
        self.songs
            .as_ref()
            .map(|s| s.data.as_slice())
            .unwrap_or(&[])
    }

    /// Disc count as the disc number of the album's last song.
    pub fn disc_count(&self) -> u32 {
        self.songs().last().map(|s| s.disk_number).unwrap_or(0)
    }

    pub fn track_count(&self) -> u32 {
        u32::try_from(self.songs().len()).unwrap_or(u32::MAX)
    }

    pub fn has_release_info(&self) -> bool {
        self.release_type.is_some() || !self.genres.is_empty()
    }
}

/// Release type and genres from the public catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseInfo {
    pub record_type: Option<String>,
    pub genres: Vec<String>,
}

/// Everything known about a track after enrichment. The file name, the tags
/// and the status messages are all derived from this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub track: TrackRecord,
    pub title: String,
    pub album_artist: String,
    pub artists: Vec<String>,
    pub album_title: String,
    pub label: String,
    pub upc: String,
    pub release_date: String,
    pub disc_count: u32,
    pub track_count: u32,
    pub release_type: Option<String>,
    pub genres: Vec<String>,
    pub lyrics: Option<String>,
}

impl TrackMetadata {
    /// `ARTIST - title`, the prefix of every status line for this track.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.album_artist, self.title)
    }

    /// Release type as used in the album folder name: `EP`, `Single`, `Album`...
    pub fn album_type_label(&self) -> String {
        let Some(kind) = self.release_type.as_deref().map(str::trim) else {
            return "Album".to_string();
        };
        if kind.is_empty() {
            return "Album".to_string();
        }

        let lower = kind.to_lowercase();
        if lower == "ep" {
            return "EP".to_string();
        }

        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Album".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Quality {
    #[value(name = "MP3_128")]
    Mp3_128,
    #[value(name = "MP3_320")]
    Mp3_320,
    #[value(name = "FLAC")]
    Flac,
    /// User uploaded file of unknown bitrate.
    #[value(skip)]
    Mp3Misc,
}

impl Quality {
    pub fn id(&self) -> u8 {
        match self {
            Quality::Mp3Misc => 0,
            Quality::Mp3_128 => 1,
            Quality::Mp3_320 => 3,
            Quality::Flac => 9,
        }
    }

    /// Approximate upper bound of a payload in this tier, in megabytes.
    pub fn approx_max_mb(&self) -> u64 {
        match self {
            Quality::Mp3Misc | Quality::Mp3_128 => 100,
            Quality::Mp3_320 => 200,
            Quality::Flac => 700,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Quality::Flac => "flac",
            _ => "mp3",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Quality::Mp3_128 => "MP3_128",
            Quality::Mp3_320 => "MP3_320",
            Quality::Flac => "FLAC",
            Quality::Mp3Misc => "MP3_MISC",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Quality::Mp3Misc => 0,
            Quality::Mp3_128 => 1,
            Quality::Mp3_320 => 2,
            Quality::Flac => 3,
        }
    }

    /// Best tier not above `self` that the track advertises a payload for.
    pub fn effective_for(&self, track: &TrackRecord) -> Quality {
        if !track.advertises_any_size() {
            return *self;
        }

        [Quality::Flac, Quality::Mp3_320, Quality::Mp3_128]
            .into_iter()
            .filter(|q| q.rank() <= self.rank())
            .find(|q| track.advertised_size(*q) > 0)
            .unwrap_or(if track.filesize > 0 {
                Quality::Mp3Misc
            } else {
                *self
            })
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub duration: u32,
    pub artist: String,
    pub title: String,
    /// Path relative to the working directory, written as `../<path>`.
    pub path: PathBuf,
}

/// Snapshot of the tracker for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub label: String,
    pub finished: usize,
    pub total: usize,
    pub in_flight: Vec<String>,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.finished as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Downloading {} [{}/{} - {:.2}%]:",
            self.label,
            self.finished,
            self.total,
            self.percent()
        )?;

        if self.in_flight.is_empty() {
            write!(f, "  › Fetching infos...")
        } else {
            write!(f, "  › {}", self.in_flight.join("\n  › "))
        }
    }
}

#[derive(Tabled)]
pub struct SummaryTableRow {
    pub collection: String,
    pub downloaded: usize,
    pub warnings: usize,
    pub failures: usize,
    pub elapsed: String,
}
