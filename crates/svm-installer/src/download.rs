use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use svm_core::Transport;
use tracing::debug;

use crate::fs_utils::remove_file_if_exists;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP transport used for catalogs and archives.
pub struct HttpTransport {
    client: Client,
    show_progress: bool,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("svm/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            show_progress: io::stderr().is_terminal(),
        })
    }

    fn progress_bar(&self, total: Option<u64>, label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        let template = if total.is_some() {
            "{msg:<24} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}"
        } else {
            "{spinner:.cyan.bold} {msg:<24} {bytes} {bytes_per_sec}"
        };
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message(label.to_string());
        bar
    }
}

impl Transport for HttpTransport {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("failed reading response body: {url}"))?;
        Ok(bytes.to_vec())
    }

    fn exists(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .head(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        Ok(response.status() == StatusCode::OK)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache dir: {}", parent.display()))?;
        }
        let part_path = part_path_for(dest);

        let result = self.download_to(url, &part_path);
        if let Err(err) = result {
            let _ = remove_file_if_exists(&part_path);
            return Err(err);
        }

        remove_file_if_exists(dest)
            .with_context(|| format!("failed to replace {}", dest.display()))?;
        fs::rename(&part_path, dest).with_context(|| {
            format!(
                "failed to move downloaded file into place: {}",
                dest.display()
            )
        })
    }
}

impl HttpTransport {
    fn download_to(&self, url: &str, part_path: &Path) -> Result<()> {
        debug!(url, dest = %part_path.display(), "downloading");
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }

        let label = crate::layout::file_name_from_url(url);
        let bar = self.progress_bar(response.content_length(), &label);
        let file = File::create(part_path)
            .with_context(|| format!("failed to create {}", part_path.display()))?;
        let mut writer = bar.wrap_write(file);
        io::copy(&mut response, &mut writer)
            .with_context(|| format!("failed writing download: {}", part_path.display()))?;
        bar.finish_and_clear();
        Ok(())
    }
}

fn part_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download");
    dest.with_file_name(format!("{name}.part"))
}
