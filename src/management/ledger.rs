use std::{
    io,
    path::{Path, PathBuf},
};

use futures::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Succeeded,
    Failed,
    Warned,
}

impl LedgerKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            LedgerKind::Succeeded => "downloadedSuccessfully.txt",
            LedgerKind::Failed => "downloadedUnsuccessfully.txt",
            LedgerKind::Warned => "downloadedWithWarning.txt",
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Append-only list of canonical URLs, one per CRLF-terminated line.
///
/// Existing content is preserved across runs. Closing a ledger that holds no
/// content deletes its file.
pub struct Ledger {
    path: PathBuf,
    file: Option<async_fs::File>,
}

impl Ledger {
    pub async fn open(path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }

        let file = async_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub async fn append(&mut self, url: &str) -> io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            log::warn!("dropping {url}: {} is closed", self.path.display());
            return Ok(());
        };

        file.write_all(format!("{url}\r\n").as_bytes()).await?;
        file.flush().await
    }

    /// Closes the stream and removes the file if it is empty. Safe to call twice.
    pub async fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            drop(file);
        }

        remove_if_empty(&self.path).await
    }
}

async fn remove_if_empty(path: &Path) -> io::Result<()> {
    match async_fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => async_fs::remove_file(path).await,
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// The three outcome ledgers of one collection download.
pub struct Ledgers {
    succeeded: Ledger,
    failed: Ledger,
    warned: Ledger,
}

impl Ledgers {
    pub async fn open(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            succeeded: Ledger::open(LedgerKind::Succeeded.path_in(dir)).await?,
            failed: Ledger::open(LedgerKind::Failed.path_in(dir)).await?,
            warned: Ledger::open(LedgerKind::Warned.path_in(dir)).await?,
        })
    }

    pub async fn append(&mut self, kind: LedgerKind, url: &str) -> io::Result<()> {
        match kind {
            LedgerKind::Succeeded => self.succeeded.append(url).await,
            LedgerKind::Failed => self.failed.append(url).await,
            LedgerKind::Warned => self.warned.append(url).await,
        }
    }

    pub async fn close(&mut self) -> io::Result<()> {
        self.succeeded.close().await?;
        self.failed.close().await?;
        self.warned.close().await
    }
}
