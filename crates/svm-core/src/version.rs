use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// A dotted version split into numeric components.
///
/// Ordering is lexicographic over the shared prefix; when one version is a
/// prefix of the other the longer one is greater (`1.2 < 1.2.0`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParsedVersion {
    components: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{input}': component '{component}' is not a non-negative integer")]
pub struct VersionParseError {
    pub input: String,
    pub component: String,
}

impl ParsedVersion {
    /// Strict parse: every dot-separated component must be decimal digits.
    /// A single leading `v` is tolerated.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let mut components = Vec::new();
        for part in body.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionParseError {
                    input: input.to_string(),
                    component: part.to_string(),
                });
            }
            let value = part.parse::<u64>().map_err(|_| VersionParseError {
                input: input.to_string(),
                component: part.to_string(),
            })?;
            components.push(value);
        }

        Ok(Self { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// `major.minor` line key, or just `major` for single-component versions.
    pub fn line(&self, depth: usize) -> String {
        self.components
            .iter()
            .take(depth.max(1))
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line(self.components.len()))
    }
}

/// Orders two version strings, oldest first.
///
/// Catalogs mix release and pre-release strings, so every component is
/// reduced to its leading digits (`0-preview` is `0`) and ties are broken on
/// the raw string. Strictly parsable versions order exactly as
/// [`ParsedVersion`] does; the order stays total over arbitrary input.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    version_key(left).cmp(&version_key(right))
}

/// Sorts newest first, in [`compare_versions`] order.
pub fn sort_versions_desc(versions: &mut [String]) {
    versions.sort_by_cached_key(|version| std::cmp::Reverse(version_key(version)));
}

fn version_key(version: &str) -> (Vec<u64>, String) {
    let trimmed = version.trim();
    let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let components = body
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u64>().unwrap_or(0)
        })
        .collect();
    (components, version.to_string())
}

/// Per-ecosystem version prefix policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPrefix {
    /// Versions are bare numbers (`17.0.2`).
    #[default]
    Bare,
    /// Versions carry a leading letter upstream (`v16.20.2`).
    Letter(char),
}

impl VersionPrefix {
    pub fn add(self, version: &str) -> String {
        match self {
            Self::Bare => version.to_string(),
            Self::Letter(letter) if version.starts_with(letter) => version.to_string(),
            Self::Letter(letter) => format!("{letter}{version}"),
        }
    }

    pub fn remove(self, version: &str) -> &str {
        match self {
            Self::Bare => version,
            Self::Letter(letter) => version.strip_prefix(letter).unwrap_or(version),
        }
    }

    pub fn has(self, version: &str) -> bool {
        match self {
            Self::Bare => true,
            Self::Letter(letter) => version.starts_with(letter),
        }
    }

    /// Prefix the resolver strips from both sides before comparing.
    pub fn strip_token(self, requested: &str) -> String {
        match self {
            Self::Bare => String::new(),
            Self::Letter(letter) if self.has(requested) => letter.to_string(),
            Self::Letter(_) => String::new(),
        }
    }
}
