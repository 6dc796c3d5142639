use std::collections::BTreeMap;

use anyhow::Result;
use serde::de::DeserializeOwned;
use svm_core::{compare_versions, sort_versions_desc, ParsedVersion, SvmError, Transport};

pub(crate) fn catalog_error(toolchain: &str, err: impl std::fmt::Display) -> anyhow::Error {
    SvmError::CatalogFetch {
        toolchain: toolchain.to_string(),
        message: err.to_string(),
    }
    .into()
}

pub(crate) fn fetch_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    toolchain: &str,
    url: &str,
) -> Result<T> {
    let bytes = transport
        .fetch_bytes(url)
        .map_err(|err| catalog_error(toolchain, format!("{err:#}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| catalog_error(toolchain, format!("failed parsing {url}: {err}")))
}

pub(crate) fn fetch_text(transport: &dyn Transport, toolchain: &str, url: &str) -> Result<String> {
    transport
        .fetch_text(url)
        .map_err(|err| catalog_error(toolchain, format!("{err:#}")))
}

/// Newest first, duplicates removed.
pub(crate) fn sorted_desc(versions: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut versions: Vec<String> = versions.into_iter().collect();
    sort_versions_desc(&mut versions);
    versions.dedup();
    versions
}

/// Keeps the newest version of every release line, where a line is the
/// first `depth` numeric components. Unparsable versions are dropped.
pub(crate) fn newest_per_line(
    versions: impl IntoIterator<Item = String>,
    depth: usize,
) -> Vec<String> {
    let mut lines: BTreeMap<String, String> = BTreeMap::new();
    for version in versions {
        let Ok(parsed) = ParsedVersion::parse(&version) else {
            continue;
        };
        let line = parsed.line(depth);
        match lines.get(&line) {
            Some(best) if compare_versions(&version, best).is_le() => {}
            _ => {
                lines.insert(line, version);
            }
        }
    }
    sorted_desc(lines.into_values())
}
