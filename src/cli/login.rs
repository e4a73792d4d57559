use crate::{error, management::CredentialStore, success};

pub async fn login(arl: String) {
    let arl = arl.trim().to_string();
    if arl.is_empty() {
        error!("The session secret must not be empty");
    }

    let mut store = match CredentialStore::load().await {
        Ok(store) => store,
        Err(e) => error!("Cannot load credentials. Err: {}", e),
    };

    store.set_arl(Some(arl));
    match store.persist().await {
        Ok(()) => success!("Stored session secret in {}", store.path().display()),
        Err(e) => error!("Cannot store credentials. Err: {}", e),
    }
}
