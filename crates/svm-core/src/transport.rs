use std::path::Path;

use anyhow::Result;

/// Network collaborator shared by catalogs and the installer.
pub trait Transport {
    /// Small responses such as JSON catalogs and directory listings.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// `true` when a HEAD request answers 200.
    fn exists(&self, url: &str) -> Result<bool>;

    /// Streams `url` to `dest`, which only appears once the body is complete.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;

    fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
