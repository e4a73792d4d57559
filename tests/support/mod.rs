#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};

use dzload::{
    config::{DownloadSettings, SessionSettings},
    deezer::{Session, Transport},
    download::{DownloadContext, NamingScheme, PassthroughCodec, Tagger},
    error::{TagError, TransportError},
    management::DownloadTracker,
    types::{Quality, TrackMetadata},
};

pub const SITE: &str = "https://www.deezer.com";
pub const MEDIA: &str = "http://media.test";
pub const PUBLIC_API: &str = "http://public.test";

/// In-memory catalog answering gateway calls by method (optionally narrowed by
/// the primary id of the body), public lookups by path and payloads by URL.
pub struct MockCatalog {
    user_id: u64,
    tokens_issued: AtomicUsize,
    gateway: Mutex<HashMap<String, VecDeque<Value>>>,
    public: Mutex<HashMap<String, Value>>,
    payloads: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, u16>>>>,
    calls: Mutex<Vec<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::with_user_id(4242)
    }

    pub fn with_user_id(user_id: u64) -> Self {
        Self {
            user_id,
            tokens_issued: AtomicUsize::new(0),
            gateway: Mutex::new(HashMap::new()),
            public: Mutex::new(HashMap::new()),
            payloads: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Scripts `results` for `key` (`method` or `method:id`). Responses are
    /// consumed in order, the last one repeats.
    pub fn on(&self, key: &str, results: Value) -> &Self {
        self.on_raw(key, json!({ "error": [], "results": results }))
    }

    pub fn on_raw(&self, key: &str, response: Value) -> &Self {
        self.gateway
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn on_public(&self, path: &str, response: Value) -> &Self {
        self.public
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
        self
    }

    /// Scripts payload responses for `url`: `Ok(bytes)` or `Err(status)`.
    pub fn on_payload(&self, url: &str, script: Vec<Result<Vec<u8>, u16>>) -> &Self {
        self.payloads
            .lock()
            .unwrap()
            .insert(url.to_string(), script.into());
        self
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn user_data(&self) -> Value {
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        json!({
            "error": [],
            "results": {
                "USER": { "USER_ID": self.user_id },
                "checkForm": format!("token-{n}")
            }
        })
    }

    fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// Body fields naming the primary id of a gateway call, by precedence.
const KEY_FIELDS: [&str; 6] = [
    "sng_id",
    "alb_id",
    "playlist_id",
    "user_id",
    "art_id",
    "QUERY",
];

fn request_key(method: &str, body: &Value) -> Option<String> {
    KEY_FIELDS
        .iter()
        .find_map(|field| match &body[*field] {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .map(|id| format!("{method}:{id}"))
}

#[async_trait]
impl Transport for MockCatalog {
    async fn post_json(
        &self,
        _url: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value, TransportError> {
        let method = query
            .iter()
            .find(|(k, _)| k == "method")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let keyed = request_key(&method, body);
        self.calls
            .lock()
            .unwrap()
            .push(keyed.clone().unwrap_or_else(|| method.clone()));

        let mut gateway = self.gateway.lock().unwrap();
        let scripted = [keyed.as_deref(), Some(method.as_str())]
            .into_iter()
            .flatten()
            .find_map(|key| gateway.get_mut(key).and_then(Self::next));

        match scripted {
            Some(response) => Ok(response),
            None if method == "deezer.getUserData" => Ok(self.user_data()),
            None => Ok(json!({ "error": { "DATA_ERROR": "no data" }, "results": {} })),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        let public = self.public.lock().unwrap();
        Ok(public
            .iter()
            .find(|(path, _)| url.ends_with(path.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| json!({ "error": { "type": "DataException" } })))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut payloads = self.payloads.lock().unwrap();
        match payloads.get_mut(url).and_then(Self::next) {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(status)) => Err(TransportError::Status(status)),
            None => Err(TransportError::Status(404)),
        }
    }
}

/// Tagger that records calls and optionally fails.
#[derive(Default)]
pub struct StubTagger {
    pub fail: bool,
    pub tagged: Mutex<Vec<TrackMetadata>>,
}

#[async_trait]
impl Tagger for StubTagger {
    async fn embed_tags(&self, _path: &Path, meta: &TrackMetadata) -> Result<(), TagError> {
        self.tagged.lock().unwrap().push(meta.clone());
        if self.fail {
            Err(TagError("stub failure".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn session_settings() -> SessionSettings {
    SessionSettings {
        gateway_url: "http://gateway.test".to_string(),
        public_api_url: PUBLIC_API.to_string(),
        cache_ttl: Duration::from_secs(60),
        cache_capacity: 100,
        transport_retries: Some(1),
        retry_delay: Duration::ZERO,
        token_refresh_limit: 3,
    }
}

pub fn download_settings(dir: &Path) -> DownloadSettings {
    DownloadSettings {
        download_root: dir.join("DOWNLOADS"),
        quality: Quality::Mp3_320,
        site_url: SITE.to_string(),
        media_url: MEDIA.to_string(),
        ledger_dir: dir.to_path_buf(),
        playlist_dir: dir.join("PLAYLISTS"),
        retry_delay: Duration::ZERO,
        max_restarts: 4,
        concurrency: Some(2),
    }
}

pub fn context(catalog: Arc<MockCatalog>, tagger: Arc<StubTagger>, dir: &Path) -> DownloadContext {
    let settings = download_settings(dir);
    DownloadContext {
        session: Arc::new(Session::new(catalog, session_settings())),
        tracker: Arc::new(DownloadTracker::new(SITE, dir)),
        codec: Arc::new(PassthroughCodec::new(MEDIA)),
        tagger,
        naming: NamingScheme::default(),
        settings,
    }
}

/// Gateway track record with every size advertised for MP3_320.
pub fn track_json(id: &str, title: &str, artist: &str, album_id: &str) -> Value {
    json!({
        "SNG_ID": id,
        "SNG_TITLE": title,
        "VERSION": "",
        "DURATION": "180",
        "ART_ID": "27",
        "ART_NAME": artist,
        "ARTISTS": [{ "ART_ID": "27", "ART_NAME": artist }],
        "ALB_ID": album_id,
        "ALB_TITLE": "Discovery",
        "DISK_NUMBER": "1",
        "TRACK_NUMBER": "1",
        "MD5_ORIGIN": format!("md5{id}"),
        "MEDIA_VERSION": "4",
        "FILESIZE_MP3_320": "7000000"
    })
}

/// URL the passthrough codec derives for a [`track_json`] record at MP3_320.
pub fn payload_url(id: &str) -> String {
    format!("{MEDIA}/md5{id}/3/4")
}

/// Public release info that keeps enrichment from looking further.
pub fn release_info(record_type: &str) -> Value {
    json!({ "record_type": record_type, "genres": { "data": [{ "name": "Electro" }] } })
}

pub fn read_ledger(dir: &Path, name: &str) -> Option<String> {
    std::fs::read_to_string(dir.join(name)).ok()
}
