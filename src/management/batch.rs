use std::{io, path::PathBuf};

/// Newline-delimited list of catalog URLs, consumed from the head.
///
/// The caller removes a line once its collection has settled, so an
/// interrupted run resumes with the collection it was working on.
pub struct BatchFile {
    path: PathBuf,
}

impl BatchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Creates an empty batch file if none exists yet.
    pub async fn ensure_exists(&self) -> io::Result<()> {
        if async_fs::metadata(&self.path).await.is_ok() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(&self.path, "").await
    }

    /// First non-blank line, trimmed.
    pub async fn peek(&self) -> io::Result<Option<String>> {
        let content = read_or_empty(&self.path).await?;
        Ok(content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string))
    }

    /// Removes the first non-blank line and any blank lines before it.
    pub async fn pop(&self) -> io::Result<()> {
        let content = read_or_empty(&self.path).await?;
        let remaining: Vec<&str> = content
            .lines()
            .skip_while(|line| line.trim().is_empty())
            .skip(1)
            .collect();

        let mut rewritten = remaining.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        async_fs::write(&self.path, rewritten).await
    }
}

async fn read_or_empty(path: &PathBuf) -> io::Result<String> {
    match async_fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err),
    }
}
