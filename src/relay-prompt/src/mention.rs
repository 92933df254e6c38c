//! `@` mention extraction and resolution.
//!
//! Mentions come in two syntaxes: a braced form (`@{src/main.rs}`) for paths
//! containing spaces, and a bare-token form (`@README`). Tokens are
//! normalized before resolution, and resolution scores project-search hits
//! with fixed constants so behavior stays stable and testable.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use futures::future::join_all;
use regex::Regex;

use crate::search::{MAX_SEARCH_RESULTS, ProjectSearcher, SearchHit};

/// Exact relative-path match.
pub const SCORE_EXACT_REL_PATH: i32 = 500;
/// Relative path ends with `/` + mention.
pub const SCORE_PATH_SUFFIX: i32 = 320;
/// Bare filename equals the mention.
pub const SCORE_FILENAME: i32 = 220;
/// Relative path contains the mention as a substring.
pub const SCORE_SUBSTRING: i32 = 100;
/// Recency bonus: `max(0, RECENCY_WINDOW - result_index)`.
pub const RECENCY_WINDOW: i32 = 30;

/// Braced form first so `@{a b}` is not split by the bare-token form.
static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:\{([^{}]+)\}|([A-Za-z0-9_][A-Za-z0-9_./\\-]*))")
        .expect("invalid mention regex")
});

/// A mention that resolved to a concrete project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMention {
    /// Normalized mention token.
    pub mention: String,

    /// Absolute path of the chosen file.
    pub path: PathBuf,

    /// Path relative to the project root, as reported by the searcher.
    pub rel_path: String,
}

/// Outcome of resolving a token list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionResolution {
    pub resolved: Vec<ResolvedMention>,
    pub unresolved: Vec<String>,
}

/// Normalize one raw mention: trim, backslashes to slashes, strip a leading
/// `./` and a leading `/`, lowercase. Empty results are discarded.
pub fn normalize_mention(raw: &str) -> Option<String> {
    let mut token = raw.trim().replace('\\', "/");
    if let Some(rest) = token.strip_prefix("./") {
        token = rest.to_string();
    }
    if let Some(rest) = token.strip_prefix('/') {
        token = rest.to_string();
    }
    let token = token.trim().to_lowercase();
    if token.is_empty() { None } else { Some(token) }
}

/// Extract normalized mention tokens from a message, deduplicated in
/// first-seen order.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for captures in MENTION_REGEX.captures_iter(text) {
        let raw = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if let Some(token) = normalize_mention(raw) {
            if seen.insert(token.clone()) {
                tokens.push(token);
            }
        }
    }
    tokens
}

/// Score one search hit for a mention. Zero means ineligible; the recency
/// bonus only applies on top of a positive path match.
fn score_hit(mention: &str, hit: &SearchHit, index: usize) -> i32 {
    if hit.is_dir {
        return 0;
    }
    let rel = hit.rel_path.replace('\\', "/").to_lowercase();
    let mut score = 0;
    if rel == mention {
        score += SCORE_EXACT_REL_PATH;
    }
    if rel.ends_with(&format!("/{mention}")) {
        score += SCORE_PATH_SUFFIX;
    }
    if rel.rsplit('/').next().unwrap_or(&rel) == mention {
        score += SCORE_FILENAME;
    }
    if rel.contains(mention) {
        score += SCORE_SUBSTRING;
    }
    if score == 0 {
        return 0;
    }
    score + (RECENCY_WINDOW - index as i32).max(0)
}

/// Resolve mention tokens against the project searcher.
///
/// One search runs per distinct token, concurrently; results are rejoined in
/// token order so the outcome is deterministic. The first mention to claim
/// an absolute path wins; later mentions resolving to the same path are
/// dropped from the resolved set. Searcher failures are logged and leave the
/// token unresolved.
pub async fn resolve_mentions(
    searcher: &dyn ProjectSearcher,
    tokens: &[String],
) -> MentionResolution {
    if tokens.is_empty() {
        return MentionResolution::default();
    }

    let searches = tokens
        .iter()
        .map(|token| searcher.search(token, MAX_SEARCH_RESULTS));
    let hit_lists = join_all(searches).await;

    let mut resolution = MentionResolution::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for (token, hits) in tokens.iter().zip(hit_lists) {
        let hits = match hits {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(mention = %token, error = %e, "mention search failed");
                resolution.unresolved.push(token.clone());
                continue;
            }
        };

        let best = hits
            .iter()
            .enumerate()
            .map(|(index, hit)| (score_hit(token, hit, index), hit))
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, hit)| hit);

        match best {
            Some(hit) if !claimed.contains(&hit.path) => {
                claimed.insert(hit.path.clone());
                resolution.resolved.push(ResolvedMention {
                    mention: token.clone(),
                    path: hit.path.clone(),
                    rel_path: hit.rel_path.clone(),
                });
            }
            // Already claimed by an earlier mention; not unresolved, just
            // dropped from the resolved set.
            Some(_) => {}
            None => resolution.unresolved.push(token.clone()),
        }
    }
    resolution
}
