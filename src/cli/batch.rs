use crate::{
    cli::download, download::DownloadContext, error::ApiError, failure, management::BatchFile,
    success, warning,
};

/// Downloads every URL of the batch file, one collection at a time.
///
/// A line is removed once its collection has settled, so an interrupted run
/// starts over with the collection it was working on.
pub async fn batch(ctx: &DownloadContext, file: BatchFile) -> Result<(), ApiError> {
    if let Err(e) = file.ensure_exists().await {
        failure!("Cannot create {}. Err: {}", file.path().display(), e);
        return Ok(());
    }

    let mut dispatched = 0usize;
    loop {
        let url = match file.peek().await {
            Ok(Some(url)) => url,
            Ok(None) => break,
            Err(e) => {
                failure!("Cannot read {}. Err: {}", file.path().display(), e);
                break;
            }
        };

        download(ctx, &url, true).await?;
        dispatched += 1;

        if let Err(e) = file.pop().await {
            failure!("Cannot update {}. Err: {}", file.path().display(), e);
            break;
        }
    }

    if dispatched == 0 {
        warning!(
            "No URLs in {}. Add one catalog URL per line.",
            file.path().display()
        );
    } else {
        success!(
            "Finished downloading {} URLs from {}",
            dispatched,
            file.path().display()
        );
    }

    Ok(())
}
