//! Product image files under the media root.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};

const IMAGE_DIR: &str = "images";

#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    /// Writes an uploaded image and returns its path relative to the root.
    /// An existing file with the same name gets a random suffix instead of being replaced.
    pub async fn save_image(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        let dir = self.root.join(IMAGE_DIR);
        fs::create_dir_all(&dir).await?;

        let mut name = sanitize(file_name);
        if fs::try_exists(dir.join(&name)).await? {
            name = with_suffix(&name, &uuid::Uuid::new_v4().simple().to_string()[..7]);
        }
        fs::write(dir.join(&name), bytes).await?;
        debug!(file = %name, size = bytes.len(), "stored image");
        Ok(format!("{IMAGE_DIR}/{name}"))
    }

    /// Best effort: a missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() { return; }
        if let Err(e) = fs::remove_file(self.root.join(relative)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(file = %relative, error = %e, "could not remove image");
            }
        }
    }
}

/// Keeps the base name only, with anything outside `[A-Za-z0-9._-]` replaced.
fn sanitize(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() { "image".to_string() } else { cleaned.to_string() }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{name}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\photos\\my phone.png"), "my_phone.png");
        assert_eq!(sanitize(".hidden"), "hidden");
        assert_eq!(sanitize(""), "image");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path());

        let first = media.save_image("phone.png", b"one").await.unwrap();
        assert_eq!(first, "images/phone.png");
        let second = media.save_image("phone.png", b"two").await.unwrap();
        assert_ne!(first, second);
        assert!(second.starts_with("images/phone_") && second.ends_with(".png"));
        assert_eq!(std::fs::read(dir.path().join(&first)).unwrap(), b"one");

        media.remove(&second).await;
        assert!(!dir.path().join(&second).exists());
        media.remove("images/never-there.png").await;
    }
}
