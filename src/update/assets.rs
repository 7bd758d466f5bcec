//! Release asset selection.
//!
//! Patterns are tried in priority order. An exact filename match on any
//! pattern wins over every substring match; substring matching never
//! crosses the installer / non-installer boundary.

use super::release::ReleaseAsset;

/// Extensions stripped from a pattern to form its substring token.
const STRIPPED_EXTENSIONS: [&str; 3] = [".exe", ".zip", ".tar.gz"];

const INSTALLER_MARKER: &str = "installer";

fn base_token(pattern: &str) -> &str {
    STRIPPED_EXTENSIONS
        .iter()
        .fold(pattern, |acc, ext| acc.strip_suffix(ext).unwrap_or(acc))
}

/// Whether a file name denotes an installer artifact.
pub fn is_installer_name(name: &str) -> bool {
    name.to_lowercase().contains(INSTALLER_MARKER)
}

/// Pick the artifact for this platform.
///
/// Pass 1 scans for an exact name match, pattern by pattern. Pass 2 looks
/// for a case-insensitive substring match of each pattern's extension-less
/// token among artifacts of the same installer kind.
pub fn select_asset<'a>(patterns: &[String], assets: &'a [ReleaseAsset]) -> Option<&'a ReleaseAsset> {
    exact_match(patterns, assets).or_else(|| substring_match(patterns, assets))
}

fn exact_match<'a>(patterns: &[String], assets: &'a [ReleaseAsset]) -> Option<&'a ReleaseAsset> {
    patterns
        .iter()
        .find_map(|pattern| assets.iter().find(|asset| asset.name == *pattern))
}

fn substring_match<'a>(
    patterns: &[String],
    assets: &'a [ReleaseAsset],
) -> Option<&'a ReleaseAsset> {
    patterns.iter().find_map(|pattern| {
        let wants_installer = is_installer_name(pattern);
        let token = base_token(pattern).to_lowercase();
        assets.iter().find(|asset| {
            let name = asset.name.to_lowercase();
            name.contains(INSTALLER_MARKER) == wants_installer && name.contains(&token)
        })
    })
}
