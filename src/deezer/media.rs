use std::time::Duration;

use tokio::time::sleep;

use crate::{deezer::session::Session, error::TransportError, types::TrackRecord};

/// Number of times a 403 on the payload is retried for `track`.
pub fn forbidden_retry_budget(track: &TrackRecord) -> u32 {
    if track.has_distribution_rights() {
        2
    } else {
        1
    }
}

/// Fetches the raw, still encrypted payload of `track` from `url`.
///
/// Other transport failures are already retried by the session. A 403 is
/// retried here, after `delay`, up to [`forbidden_retry_budget`] times.
pub async fn fetch_payload(
    session: &Session,
    url: &str,
    track: &TrackRecord,
    delay: Duration,
) -> Result<Vec<u8>, TransportError> {
    let budget = forbidden_retry_budget(track);
    let mut retries = 0u32;

    loop {
        match session.fetch_bytes(url).await {
            Ok(bytes) => return Ok(bytes),
            Err(err) if err.is_forbidden() && retries < budget => {
                retries += 1;
                log::debug!(
                    "payload of {} forbidden, retry {retries}/{budget}",
                    track.id
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
