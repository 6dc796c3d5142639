use svm_core::ParsedVersion;

/// Which rule picked the version, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    ShortPrefix,
    ExactIgnoringV,
    /// Request did not parse; first stable candidate returned.
    Wildcard,
    ClosestBelow,
    /// Request parsed but is below every candidate.
    StableFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: String,
    pub rule: MatchRule,
}

impl Resolution {
    fn new(version: &str, rule: MatchRule) -> Self {
        Self {
            version: version.to_string(),
            rule,
        }
    }
}

/// Picks the best candidate for `requested`.
///
/// `candidates` must already be sorted newest first: the wildcard and
/// fallback rules return the first stable entry by position.
/// `strip_prefix` is removed from both sides before comparison.
pub fn resolve_version(
    requested: &str,
    candidates: &[String],
    strip_prefix: &str,
) -> Option<Resolution> {
    if candidates.is_empty() {
        return None;
    }

    let request = strip(requested.trim(), strip_prefix);

    if let Some(found) = candidates
        .iter()
        .find(|candidate| strip(candidate, strip_prefix) == request)
    {
        return Some(Resolution::new(found, MatchRule::Exact));
    }

    if request.len() <= 2 {
        let dotted = format!("{request}.");
        if let Some(found) = candidates.iter().find(|candidate| {
            let normalized = strip(candidate, strip_prefix);
            normalized == request || normalized.starts_with(&dotted)
        }) {
            return Some(Resolution::new(found, MatchRule::ShortPrefix));
        }
    }

    if let Some(without_v) = request.strip_prefix('v') {
        if let Some(found) = candidates.iter().find(|candidate| {
            let normalized = strip(candidate, strip_prefix);
            normalized.strip_prefix('v').unwrap_or(normalized) == without_v
        }) {
            return Some(Resolution::new(found, MatchRule::ExactIgnoringV));
        }
    }

    let Ok(wanted) = ParsedVersion::parse(request) else {
        return Some(Resolution::new(
            first_stable(candidates),
            MatchRule::Wildcard,
        ));
    };

    let closest = candidates
        .iter()
        .filter_map(|candidate| {
            ParsedVersion::parse(strip(candidate, strip_prefix))
                .ok()
                .map(|parsed| (candidate, parsed))
        })
        .filter(|(_, parsed)| *parsed <= wanted)
        .max_by(|(_, a), (_, b)| a.cmp(b));

    if let Some((found, _)) = closest {
        return Some(Resolution::new(found, MatchRule::ClosestBelow));
    }

    Some(Resolution::new(
        first_stable(candidates),
        MatchRule::StableFallback,
    ))
}

/// Latest candidate on the requested line: an exact entry, or the first one
/// continuing `requested` with a dot, before falling back to
/// [`resolve_version`]. An empty request selects the newest candidate.
pub fn resolve_latest_matching(
    requested: &str,
    candidates: &[String],
    strip_prefix: &str,
) -> Option<Resolution> {
    let request = strip(requested.trim(), strip_prefix);
    if request.is_empty() {
        return candidates
            .first()
            .map(|first| Resolution::new(first, MatchRule::ShortPrefix));
    }

    let dotted = format!("{request}.");
    if let Some(found) = candidates.iter().find(|candidate| {
        let normalized = strip(candidate, strip_prefix);
        normalized == request || normalized.starts_with(&dotted)
    }) {
        let rule = if strip(found, strip_prefix) == request {
            MatchRule::Exact
        } else {
            MatchRule::ShortPrefix
        };
        return Some(Resolution::new(found, rule));
    }

    resolve_version(requested, candidates, strip_prefix)
}

/// The entry following `current` in the newest-first list.
pub fn next_older_candidate<'a>(current: &str, candidates: &'a [String]) -> Option<&'a str> {
    let position = candidates.iter().position(|candidate| candidate == current)?;
    candidates.get(position + 1).map(String::as_str)
}

pub fn is_prerelease(version: &str) -> bool {
    let lower = version.to_ascii_lowercase();
    lower.contains("rc") || lower.contains("alpha") || lower.contains("beta")
}

fn first_stable(candidates: &[String]) -> &str {
    candidates
        .iter()
        .find(|candidate| !is_prerelease(candidate))
        .or_else(|| candidates.first())
        .map(String::as_str)
        .unwrap_or_default()
}

fn strip<'a>(value: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return value;
    }
    value.strip_prefix(prefix).unwrap_or(value)
}
