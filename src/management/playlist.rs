use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use crate::{
    types::PlaylistEntry,
    utils::{clean_component, to_slash_path},
};

/// Renders an extended M3U manifest, following `order` and skipping ids that
/// never produced an entry.
pub fn render_manifest(order: &[String], entries: &HashMap<String, PlaylistEntry>) -> String {
    let mut content = String::new();

    for id in order {
        let Some(entry) = entries.get(id) else {
            continue;
        };

        content.push_str(&format!(
            "#EXTINF:{},{} - {}\r\n",
            entry.duration, entry.artist, entry.title
        ));
        if entry.path.is_absolute() {
            content.push_str(&format!("{}\r\n", entry.path.display()));
        } else {
            content.push_str(&format!("../{}\r\n", to_slash_path(&entry.path)));
        }
    }

    content
}

/// Writes `<dir>/<title>.m3u8` and returns its path.
pub async fn write_manifest(
    dir: &Path,
    title: &str,
    order: &[String],
    entries: &HashMap<String, PlaylistEntry>,
) -> io::Result<PathBuf> {
    let name = clean_component(title, "Unknown playlist");
    let path = dir.join(format!("{name}.m3u8"));

    async_fs::create_dir_all(dir).await?;
    async_fs::write(&path, render_manifest(order, entries)).await?;

    log::debug!("wrote playlist manifest {}", path.display());
    Ok(path)
}
