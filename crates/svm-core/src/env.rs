use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const PATH_KEY: &str = "PATH";
pub const EXCLUDE_KEYWORDS_KEY: &str = "EXCLUDE_KEYWORDS";
pub const HOME_SUFFIX: &str = "_HOME";

#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn path(dirs: &[PathBuf]) -> Self {
        let joined = dirs
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(&PATH_LIST_SEPARATOR.to_string());
        Self::new(PATH_KEY, joined)
    }

    pub fn exclude_keywords(keywords: &[&str]) -> Self {
        Self::new(EXCLUDE_KEYWORDS_KEY, keywords.join(","))
    }

    pub fn is_home(&self) -> bool {
        self.key.ends_with(HOME_SUFFIX)
    }
}
