use std::path::{Path, PathBuf};

use crate::{
    management::NamingTemplates,
    types::{Quality, TrackMetadata},
    utils::{clean_component, collapse_separators, sanitize_filename, two_digits},
};

/// Computes destination paths from naming templates.
///
/// Values are sanitized before substitution, so only the slashes written in a
/// template create directories.
#[derive(Debug, Clone, Default)]
pub struct NamingScheme {
    templates: NamingTemplates,
}

impl NamingScheme {
    pub fn new(templates: NamingTemplates) -> Self {
        Self { templates }
    }

    /// `root/<artist>/<album> (<type>)/[Disc NN/][NN ]<title>.<ext>` with the
    /// default templates.
    pub fn destination(&self, root: &Path, meta: &TrackMetadata, quality: Quality) -> PathBuf {
        let artist = clean_component(&meta.album_artist, "Unknown artist");
        let album = clean_component(&meta.album_title, "Unknown album");
        let kind = meta.album_type_label();

        let album_name = expand(
            &self.templates.album_name,
            &[("album", &album), ("type", &kind)],
        );
        let mut dir = expand(
            &self.templates.path,
            &[
                ("artist", &artist),
                ("albumName", &album_name),
                ("album", &album),
                ("type", &kind),
            ],
        );

        if meta.disc_count > 1 {
            let disc = two_digits(meta.track.disk_number);
            dir = expand(
                &self.templates.disc_path,
                &[("path", &dir), ("disc", &disc)],
            );
        }

        let number = if meta.track.track_number > 0 {
            two_digits(meta.track.track_number)
        } else {
            String::new()
        };
        let title = collapse_separators(&sanitize_filename(&meta.title));
        let file_name = expand(
            &self.templates.file_name,
            &[("number", &number), ("title", &title)],
        );
        let file_name = match file_name.trim() {
            "" => meta.track.id.clone(),
            name => name.to_string(),
        };

        let mut path = root.to_path_buf();
        for part in dir.split('/').map(str::trim).filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path.push(format!("{file_name}.{}", quality.extension()));
        path
    }
}

/// Replaces `%name%` tokens in one pass. Unknown tokens are kept verbatim.
fn expand(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find('%') {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => {
                        out.push_str(value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        out.push('%');
                        rest = after;
                    }
                }
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
