mod support;

use std::sync::Arc;

use dzload::download::run_collection;
use dzload::types::{CollectionRef, CollectionType};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::support::{
    MEDIA, MockCatalog, StubTagger, context, payload_url, read_ledger, release_info, track_json,
};

const SUCCEEDED: &str = "downloadedSuccessfully.txt";
const FAILED: &str = "downloadedUnsuccessfully.txt";
const WARNED: &str = "downloadedWithWarning.txt";

fn album_json(tracks: Vec<Value>) -> Value {
    json!({
        "DATA": { "ALB_ID": "302127", "ALB_TITLE": "Discovery", "ART_NAME": "Daft Punk" },
        "SONGS": { "data": tracks }
    })
}

fn numbered(id: &str, title: &str, number: u32) -> Value {
    let mut track = track_json(id, title, "Daft Punk", "302127");
    track["TRACK_NUMBER"] = json!(number.to_string());
    track
}

fn discovery_catalog(tracks: Vec<Value>) -> Arc<MockCatalog> {
    let catalog = Arc::new(MockCatalog::new());
    catalog
        .on("deezer.pageAlbum:302127", album_json(tracks))
        .on_public("album/302127", release_info("album"));
    catalog
}

#[tokio::test]
async fn test_playlist_keeps_order_through_forbidden_retries() {
    let dir = TempDir::new().unwrap();

    let first = numbered("1", "One More Time", 1);
    let mut second = numbered("2", "Aerodynamic", 2);
    second["AVAILABLE_COUNTRIES"] = json!({ "STREAM_ADS": ["FR", "DE"] });

    let catalog = discovery_catalog(vec![first.clone(), second.clone()]);
    catalog
        .on(
            "deezer.pagePlaylist:908622995",
            json!({
                "DATA": { "TITLE": "Mix", "DURATION": 532 },
                "SONGS": { "data": [first, second] }
            }),
        )
        .on_payload(&payload_url("1"), vec![Ok(b"first".to_vec())])
        .on_payload(
            &payload_url("2"),
            vec![Err(403), Err(403), Ok(b"second".to_vec())],
        );

    let ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    let playlist = CollectionRef::new(CollectionType::Playlist, "908622995");
    let summary = run_collection(&ctx, playlist, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.warned, 0);
    assert_eq!(catalog.call_count(&payload_url("2")), 3);

    let album_dir = dir.path().join("DOWNLOADS/Daft Punk/Discovery (Album)");
    assert_eq!(
        std::fs::read(album_dir.join("02 Aerodynamic.mp3")).unwrap(),
        b"second"
    );

    let manifest =
        std::fs::read_to_string(dir.path().join("PLAYLISTS").join("Mix.m3u8")).unwrap();
    assert_eq!(manifest.matches("#EXTINF:").count(), 2);
    let first_at = manifest.find("Daft Punk - One More Time").unwrap();
    let second_at = manifest.find("Daft Punk - Aerodynamic").unwrap();
    assert!(first_at < second_at);
    let first_entry = "#EXTINF:180,Daft Punk - One More Time\r\n";
    assert!(manifest.contains(first_entry));

    assert_eq!(
        read_ledger(dir.path(), SUCCEEDED).unwrap(),
        "https://www.deezer.com/playlist/908622995\r\n"
    );
    assert!(read_ledger(dir.path(), FAILED).is_none());
    assert!(read_ledger(dir.path(), WARNED).is_none());
}

#[tokio::test]
async fn test_forbidden_beyond_budget_fails_track() {
    let dir = TempDir::new().unwrap();

    // No rights: a single 403 retry
    let track = numbered("1", "One More Time", 1);
    let catalog = discovery_catalog(vec![track]);
    catalog.on_payload(
        &payload_url("1"),
        vec![Err(403), Err(403), Ok(b"never".to_vec())],
    );

    let ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(catalog.call_count(&payload_url("1")), 2);
    assert_eq!(
        read_ledger(dir.path(), FAILED).unwrap(),
        "https://www.deezer.com/track/1\r\n"
    );
}

#[tokio::test]
async fn test_placeholder_without_alternative_fails_with_track_url() {
    let dir = TempDir::new().unwrap();

    let mut upload = track_json("-123456", "Bedroom Demo", "Me", "0");
    upload["FILESIZE"] = json!("4000000");

    let catalog = Arc::new(MockCatalog::new());
    catalog.on(
        "deezer.pagePlaylist:5",
        json!({
            "DATA": { "TITLE": "Uploads", "DURATION": 180 },
            "SONGS": { "data": [upload] }
        }),
    );

    let ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    let playlist = CollectionRef::new(CollectionType::Playlist, "5");
    let summary = run_collection(&ctx, playlist, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded + summary.warned + summary.failed, 1);
    assert_eq!(
        read_ledger(dir.path(), FAILED).unwrap(),
        "https://www.deezer.com/track/-123456\r\n"
    );

    // Nothing was fetched for it
    assert_eq!(catalog.call_count(MEDIA), 0);

    // The failed track has no manifest entry
    let manifest =
        std::fs::read_to_string(dir.path().join("PLAYLISTS").join("Uploads.m3u8")).unwrap();
    assert!(manifest.is_empty());
}

#[tokio::test]
async fn test_placeholder_is_replaced_by_searched_track() {
    let dir = TempDir::new().unwrap();

    let upload = track_json("-123456", "Bedroom Demo", "Me", "0");
    let catalog = Arc::new(MockCatalog::new());
    catalog
        .on(
            "deezer.pagePlaylist:5",
            json!({
                "DATA": { "TITLE": "Uploads", "DURATION": 180 },
                "SONGS": { "data": [upload] }
            }),
        )
        .on(
            "search.music:artist:'Me' track:'Bedroom Demo'",
            json!({ "data": [{
                "SNG_ID": "55",
                "SNG_TITLE": "Bedroom Demo",
                "MD5_ORIGIN": "md5-123456",
                "DURATION": "180"
            }] }),
        )
        .on(
            "deezer.pageTrack:55",
            json!({ "DATA": track_json("55", "Bedroom Demo", "Me", "0") }),
        )
        .on_payload(&payload_url("55"), vec![Ok(b"demo".to_vec())]);

    let ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    let playlist = CollectionRef::new(CollectionType::Playlist, "5");
    let summary = run_collection(&ctx, playlist, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.warned, 0);
    assert!(read_ledger(dir.path(), FAILED).is_none());
    assert_eq!(catalog.call_count(MEDIA), 1);

    let file = dir
        .path()
        .join("DOWNLOADS/Me/Discovery (Album)/01 Bedroom Demo.mp3");
    assert_eq!(std::fs::read(file).unwrap(), b"demo");

    // The entry stays keyed by the placeholder's position in the playlist
    let manifest =
        std::fs::read_to_string(dir.path().join("PLAYLISTS").join("Uploads.m3u8")).unwrap();
    assert_eq!(manifest.matches("#EXTINF:").count(), 1);
    assert!(manifest.contains("#EXTINF:180,Me - Bedroom Demo\r\n"));
}

#[tokio::test]
async fn test_empty_playlist_writes_no_manifest() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(MockCatalog::new());
    catalog.on(
        "deezer.pagePlaylist:7",
        json!({ "DATA": { "TITLE": "Empty", "DURATION": 0 }, "SONGS": { "data": [] } }),
    );

    let ctx = context(catalog, Arc::new(StubTagger::default()), dir.path());
    let playlist = CollectionRef::new(CollectionType::Playlist, "7");
    let summary = run_collection(&ctx, playlist, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.succeeded + summary.warned + summary.failed, 0);
    assert!(!dir.path().join("PLAYLISTS").join("Empty.m3u8").exists());
    assert_eq!(
        read_ledger(dir.path(), SUCCEEDED).unwrap(),
        "https://www.deezer.com/playlist/7\r\n"
    );
}

#[tokio::test]
async fn test_identical_paths_are_fetched_once() {
    let dir = TempDir::new().unwrap();

    // Two catalog entries that name the same file
    let a = numbered("1", "One More Time", 1);
    let b = numbered("2", "One More Time", 1);

    let catalog = discovery_catalog(vec![a, b]);
    catalog
        .on_payload(&payload_url("1"), vec![Ok(b"a".to_vec())])
        .on_payload(&payload_url("2"), vec![Ok(b"b".to_vec())]);

    let ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(catalog.call_count(MEDIA), 1);
}

#[tokio::test]
async fn test_existing_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let album_dir = dir.path().join("DOWNLOADS/Daft Punk/Discovery (Album)");
    std::fs::create_dir_all(&album_dir).unwrap();
    std::fs::write(album_dir.join("01 One More Time.mp3"), b"old").unwrap();

    let catalog = discovery_catalog(vec![numbered("1", "One More Time", 1)]);
    let tagger = Arc::new(StubTagger::default());
    let ctx = context(catalog.clone(), tagger.clone(), dir.path());

    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(catalog.call_count(MEDIA), 0);
    assert!(tagger.tagged.lock().unwrap().is_empty());
    assert_eq!(
        std::fs::read(album_dir.join("01 One More Time.mp3")).unwrap(),
        b"old"
    );
}

#[tokio::test]
async fn test_fallback_id_keeps_original_identity() {
    let dir = TempDir::new().unwrap();

    let mut original = numbered("1", "One More Time", 1);
    original["FALLBACK"] = json!({ "SNG_ID": "900" });

    let catalog = discovery_catalog(vec![original]);
    let mut replacement = track_json("900", "One More Time", "Daft Punk", "302127");
    replacement["DURATION"] = json!("321");
    catalog
        .on("deezer.pageTrack:900", json!({ "DATA": replacement }))
        .on_payload(&payload_url("900"), vec![Ok(b"fallback".to_vec())]);

    let tagger = Arc::new(StubTagger::default());
    let ctx = context(catalog.clone(), tagger.clone(), dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    // The hop itself is not an outcome
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert!(read_ledger(dir.path(), FAILED).is_none());

    let file = dir
        .path()
        .join("DOWNLOADS/Daft Punk/Discovery (Album)/01 One More Time.mp3");
    assert_eq!(std::fs::read(file).unwrap(), b"fallback");

    let tagged = tagger.tagged.lock().unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].track.id, "1");
    assert_eq!(tagged[0].track.duration, 321);
}

#[tokio::test]
async fn test_searched_alternative_is_named_as_original() {
    let dir = TempDir::new().unwrap();

    let catalog = discovery_catalog(vec![numbered("1", "Voyager", 1)]);
    catalog
        .on(
            "search.music:artist:'Daft Punk' track:'Voyager'",
            json!({ "data": [{
                "SNG_ID": "77",
                "SNG_TITLE": "Voyager",
                "VERSION": "(Remastered)",
                "MD5_ORIGIN": "md51",
                "DURATION": "182"
            }] }),
        )
        .on(
            "deezer.pageTrack:77",
            json!({ "DATA": track_json("77", "Voyager (Remastered)", "Daft Punk", "302127") }),
        )
        .on_payload(&payload_url("77"), vec![Ok(b"alt".to_vec())]);

    let tagger = Arc::new(StubTagger::default());
    let ctx = context(catalog.clone(), tagger.clone(), dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 1);
    let file = dir
        .path()
        .join("DOWNLOADS/Daft Punk/Discovery (Album)/01 Voyager.mp3");
    assert_eq!(std::fs::read(file).unwrap(), b"alt");
    assert_eq!(tagger.tagged.lock().unwrap()[0].title, "Voyager");
}

#[tokio::test]
async fn test_restart_limit_stops_fallback_hops() {
    let dir = TempDir::new().unwrap();

    let mut original = numbered("1", "One More Time", 1);
    original["FALLBACK"] = json!({ "SNG_ID": "900" });

    let catalog = discovery_catalog(vec![original]);
    catalog
        .on(
            "deezer.pageTrack:900",
            json!({ "DATA": track_json("900", "One More Time", "Daft Punk", "302127") }),
        )
        .on_payload(&payload_url("900"), vec![Ok(b"fallback".to_vec())]);

    let mut ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    ctx.settings.max_restarts = 0;
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(catalog.call_count(&payload_url("900")), 0);
    assert_eq!(
        read_ledger(dir.path(), FAILED).unwrap(),
        "https://www.deezer.com/track/1\r\n"
    );
}

#[tokio::test]
async fn test_unavailable_everywhere_fails_once() {
    let dir = TempDir::new().unwrap();

    // Fallback ids pointing at each other
    let mut original = numbered("1", "Digital Love", 1);
    original["FALLBACK"] = json!({ "SNG_ID": "900" });
    let mut replacement = track_json("900", "Digital Love", "Daft Punk", "302127");
    replacement["FALLBACK"] = json!({ "SNG_ID": "1" });

    let catalog = discovery_catalog(vec![original]);
    catalog.on("deezer.pageTrack:900", json!({ "DATA": replacement }));

    let ctx = context(catalog.clone(), Arc::new(StubTagger::default()), dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(
        read_ledger(dir.path(), FAILED).unwrap(),
        "https://www.deezer.com/track/1\r\n"
    );
}

#[tokio::test]
async fn test_tagging_failure_is_a_warning() {
    let dir = TempDir::new().unwrap();

    let catalog = discovery_catalog(vec![numbered("1", "Crescendolls", 1)]);
    catalog.on_payload(&payload_url("1"), vec![Ok(b"raw".to_vec())]);

    let tagger = Arc::new(StubTagger {
        fail: true,
        ..StubTagger::default()
    });
    let ctx = context(catalog, tagger, dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");
    let summary = run_collection(&ctx, album, false).await.unwrap().unwrap();

    assert_eq!(summary.warned, 1);
    assert_eq!(
        read_ledger(dir.path(), WARNED).unwrap(),
        "https://www.deezer.com/track/1\r\n"
    );

    // The file is kept
    assert!(
        dir.path()
            .join("DOWNLOADS/Daft Punk/Discovery (Album)/01 Crescendolls.mp3")
            .is_file()
    );
}

#[tokio::test]
async fn test_single_track_from_batch_skips_collection_ledger() {
    let dir = TempDir::new().unwrap();

    let catalog = discovery_catalog(vec![numbered("1", "Harder, Better, Faster, Stronger", 4)]);
    catalog
        .on(
            "deezer.pageTrack:1",
            json!({ "DATA": numbered("1", "Harder, Better, Faster, Stronger", 4) }),
        )
        .on_payload(&payload_url("1"), vec![Ok(b"hbfs".to_vec())]);

    let ctx = context(catalog, Arc::new(StubTagger::default()), dir.path());
    let track = CollectionRef::new(CollectionType::Track, "1");
    let summary = run_collection(&ctx, track, true).await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(read_ledger(dir.path(), SUCCEEDED).is_none());

    // Separators in titles collapse to single spaces
    assert!(
        dir.path()
            .join("DOWNLOADS/Daft Punk/Discovery (Album)/04 Harder Better Faster Stronger.mp3")
            .is_file()
    );
}

#[tokio::test]
async fn test_unknown_track_fails() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(MockCatalog::new());

    let ctx = context(catalog, Arc::new(StubTagger::default()), dir.path());
    let track = CollectionRef::new(CollectionType::Track, "31337");
    let summary = run_collection(&ctx, track, false).await.unwrap().unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(
        read_ledger(dir.path(), FAILED).unwrap(),
        "https://www.deezer.com/track/31337\r\n"
    );
}

#[tokio::test]
async fn test_private_playlist_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(MockCatalog::new());
    catalog.on(
        "deezer.pagePlaylist:6",
        json!({ "DATA": { "TITLE": "Theirs", "DURATION": 100 }, "SONGS": { "data": [] } }),
    );

    let ctx = context(catalog, Arc::new(StubTagger::default()), dir.path());
    let playlist = CollectionRef::new(CollectionType::Playlist, "6");

    assert_eq!(run_collection(&ctx, playlist, false).await, Ok(None));
    assert!(read_ledger(dir.path(), SUCCEEDED).is_none());
    assert!(!ctx.tracker.is_active().await);
}

#[tokio::test]
async fn test_rejected_credential_is_fatal() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(MockCatalog::with_user_id(0));

    let ctx = context(catalog, Arc::new(StubTagger::default()), dir.path());
    let album = CollectionRef::new(CollectionType::Album, "302127");

    let err = run_collection(&ctx, album, false).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(!ctx.tracker.is_active().await);
}
