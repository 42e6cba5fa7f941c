//! Badge and game icon cache
//!
//! Images live under the configured cache directory. Missing files are
//! downloaded in the background and written when the request completes.

use crate::engine::{Engine, RequestKind};
use cheevos_net::HttpResponse;
use std::path::{Path, PathBuf};

/// Replace characters that are not safe in a file name.
///
/// Badge names come from the server, so path separators and relative
/// components must not survive.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

/// `<cache>/achievement_badge/<name>[_lock].png`
pub fn badge_cache_path(cache_dir: &Path, badge_name: &str, locked: bool) -> PathBuf {
    let suffix = if locked { "_lock" } else { "" };
    cache_dir
        .join("achievement_badge")
        .join(format!("{}{}.png", sanitize_file_name(badge_name), suffix))
}

/// `<cache>/achievement_gameicon/<game id>.png`
pub fn game_icon_path(cache_dir: &Path, game_id: u32) -> PathBuf {
    cache_dir
        .join("achievement_gameicon")
        .join(format!("{}.png", game_id))
}

impl Engine {
    /// Local path of a badge, downloading it if it is not cached yet.
    /// Without a cache directory the bare badge file name is returned.
    pub(crate) fn resolve_badge(&self, badge_name: &str, locked: bool) -> String {
        let Some(cache_dir) = self.config.cache_dir.as_deref() else {
            let suffix = if locked { "_lock" } else { "" };
            return format!("{}{}.png", badge_name, suffix);
        };

        let path = badge_cache_path(cache_dir, badge_name, locked);
        if !path.exists() {
            let request = self.urls.badge_image(badge_name, locked);
            self.send(request, RequestKind::Image { path: path.clone() });
        }
        path.to_string_lossy().into_owned()
    }

    pub(crate) fn resolve_game_icon(&self, game_id: u32, image_icon: &str) -> String {
        let Some(cache_dir) = self.config.cache_dir.as_deref() else {
            return image_icon.to_string();
        };

        let path = game_icon_path(cache_dir, game_id);
        if !path.exists() {
            let request = self.urls.media(image_icon);
            self.send(request, RequestKind::Image { path: path.clone() });
        }
        path.to_string_lossy().into_owned()
    }

    pub(crate) fn handle_image(&mut self, path: &Path, response: &HttpResponse) {
        if !response.is_success() || response.body.is_empty() {
            tracing::warn!("Failed to download {:?} (status {})", path, response.status);
            return;
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("Failed to create {:?}: {}", parent, e);
                return;
            }
        }

        match std::fs::write(path, &response.body) {
            Ok(()) => tracing::debug!("Cached {:?}", path),
            Err(e) => tracing::error!("Failed to write badge image to {:?}: {}", path, e),
        }
    }
}
