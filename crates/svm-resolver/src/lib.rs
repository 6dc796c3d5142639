mod resolve;

pub use resolve::{
    is_prerelease, next_older_candidate, resolve_latest_matching, resolve_version, MatchRule,
    Resolution,
};
