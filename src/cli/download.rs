use std::time::Duration;

use chrono::TimeDelta;
use tabled::Table;

use crate::{
    download::{DownloadContext, run_collection},
    error::ApiError,
    failure, info,
    management::CollectionSummary,
    types::SummaryTableRow,
    utils::parse_catalog_url,
};

/// Downloads everything behind one catalog URL.
///
/// Unrecognized URLs and unresolvable collections are reported and skipped.
/// Only fatal errors are returned.
pub async fn download(ctx: &DownloadContext, url: &str, from_batch: bool) -> Result<(), ApiError> {
    let collection = match parse_catalog_url(url) {
        Ok(collection) => collection,
        Err(e) => {
            failure!("{}", e);
            return Ok(());
        }
    };

    info!("Downloading {} {}", collection.kind, collection.id);
    if let Some(summary) = run_collection(ctx, collection, from_batch).await? {
        print_summary(&summary);
    }

    Ok(())
}

pub fn print_summary(summary: &CollectionSummary) {
    let row = SummaryTableRow {
        collection: summary.label.clone(),
        downloaded: summary.succeeded,
        warnings: summary.warned,
        failures: summary.failed,
        elapsed: format_elapsed(summary.elapsed),
    };

    let table = Table::new(vec![row]);
    println!("{}", table);
}

fn format_elapsed(elapsed: Duration) -> String {
    let delta = TimeDelta::from_std(elapsed).unwrap_or_else(|_| TimeDelta::zero());
    format!("{}m {:02}s", delta.num_minutes(), delta.num_seconds() % 60)
}
