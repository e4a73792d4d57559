use std::{path::PathBuf, sync::Arc};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{self, Settings},
    deezer::{HttpTransport, Session},
    download::{DownloadContext, LoftyTagger, NamingScheme, PassthroughCodec},
    error,
    error::AuthError,
    management::{CredentialStore, DownloadTracker},
    success,
    types::Quality,
};

/// Authenticates against the catalog and assembles the download context.
///
/// Exits the process when no usable session secret is available. A secret the
/// catalog rejects is cleared from the credential store first.
pub async fn connect(download_root: PathBuf, quality: Quality) -> DownloadContext {
    let settings = Settings::from_env(download_root, quality);

    let mut store = match CredentialStore::load().await {
        Ok(store) => store,
        Err(e) => error!("Cannot load credentials. Err: {}", e),
    };

    let Some(arl) = store
        .arl()
        .map(str::to_string)
        .or_else(config::fallback_arl)
    else {
        error!("No session secret found. Run `dzload login <ARL>` or set DZ_ARL.");
    };

    let transport = match HttpTransport::new(&settings.download.site_url, &arl) {
        Ok(transport) => transport,
        Err(e) => error!("Cannot create HTTP client. Err: {}", e),
    };
    let session = Arc::new(Session::new(Arc::new(transport), settings.session.clone()));

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message("Connecting to the catalog...");

    let result = session.authenticate().await;
    pb.finish_and_clear();

    match result {
        Ok(_) => success!("Connected to the catalog"),
        Err(AuthError::InvalidCredential) => {
            store.set_arl(None);
            if let Err(e) = store.persist().await {
                log::error!("cannot clear stored credential: {e}");
            }
            error!("Wrong session secret, it has been removed. Run `dzload login` again.");
        }
        Err(e) => error!("Cannot connect to the catalog. Err: {}", e),
    }

    let tracker = DownloadTracker::new(
        settings.download.site_url.clone(),
        settings.download.ledger_dir.clone(),
    )
    .with_spinner();

    DownloadContext {
        session,
        tracker: Arc::new(tracker),
        codec: Arc::new(PassthroughCodec::new(settings.download.media_url.clone())),
        tagger: Arc::new(LoftyTagger),
        naming: NamingScheme::new(store.naming().clone()),
        settings: settings.download,
    }
}
