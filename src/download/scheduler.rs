use futures::{StreamExt, stream};
use sysinfo::System;

use crate::{
    config::DownloadSettings,
    download::{
        DownloadContext,
        pipeline::{self, ItemRequest},
    },
    error::ApiError,
    utils::concurrency_width,
};

/// Currently available memory in megabytes, 0 when it cannot be read.
pub fn free_memory_mb() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory() / 1024 / 1024
}

/// Pool width for one collection. Memory is sampled once, here.
pub fn pool_width(settings: &DownloadSettings) -> usize {
    settings.concurrency.unwrap_or_else(|| {
        let free = free_memory_mb();
        let width = concurrency_width(free, settings.quality.approx_max_mb());
        log::debug!(
            "{free} MB free, {} MB per {} payload: {width} parallel downloads",
            settings.quality.approx_max_mb(),
            settings.quality
        );
        width
    })
}

/// Runs every item through the pipeline with bounded parallelism.
///
/// Items start in list order and settle in any order. Per-item failures are
/// already recorded by the pipeline; only a fatal error is returned, after all
/// items have settled.
pub async fn run(ctx: &DownloadContext, items: Vec<ItemRequest>) -> Result<(), ApiError> {
    let width = pool_width(&ctx.settings).max(1);

    let results: Vec<Result<(), ApiError>> = stream::iter(items)
        .map(|item| pipeline::run_item(ctx, item))
        .buffer_unordered(width)
        .collect()
        .await;

    results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
}
