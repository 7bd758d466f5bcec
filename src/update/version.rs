//! Release tag comparison.
//!
//! Tags are compared component by component as *strings*, not numbers, on
//! up to three dot-separated components. `"1.10.0"` is therefore older than
//! `"1.9.0"`. Release tags are expected to keep components within a single
//! digit width (or zero-pad them) for this to order correctly.

/// Placeholder version of unreleased builds.
pub const DEV_VERSION: &str = "dev";

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// Whether `latest` is newer than `current`.
///
/// A leading `v` is ignored on both sides. A `dev` current version is always
/// outdated. Missing trailing components compare as the empty string.
pub fn is_newer(latest: &str, current: &str) -> bool {
    let latest = strip_v(latest);
    let current = strip_v(current);

    if current == DEV_VERSION {
        return true;
    }

    let latest_parts: Vec<&str> = latest.split('.').collect();
    let current_parts: Vec<&str> = current.split('.').collect();

    for i in 0..3 {
        let lp = latest_parts.get(i).copied().unwrap_or("");
        let cp = current_parts.get(i).copied().unwrap_or("");
        match lp.cmp(cp) {
            std::cmp::Ordering::Greater => return true,
            std::cmp::Ordering::Less => return false,
            std::cmp::Ordering::Equal => {}
        }
    }
    false
}

/// Whether `version` names an unreleased build.
pub fn is_dev(version: &str) -> bool {
    strip_v(version) == DEV_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_is_always_outdated() {
        for latest in ["v2.0.0", "0.0.1", "", "dev", "garbage"] {
            assert!(is_newer(latest, "dev"), "latest={latest}");
        }
    }

    #[test]
    fn v_prefix_is_ignored() {
        assert!(!is_newer("v1.2.3", "1.2.3"));
        assert!(!is_newer("1.2.3", "v1.2.3"));
        assert!(!is_newer("v1.2.3", "v1.2.3"));
    }

    #[test]
    fn first_differing_component_decides() {
        assert!(is_newer("v2.0.0", "1.5.0"));
        assert!(is_newer("1.3.0", "1.2.9"));
        assert!(is_newer("1.2.4", "1.2.3"));
        assert!(!is_newer("1.5.0", "v2.0.0"));
        assert!(!is_newer("1.2.3", "1.2.4"));
    }

    #[test]
    fn missing_components_compare_smallest() {
        assert!(is_newer("1.2.1", "1.2"));
        assert!(!is_newer("1.2", "1.2.1"));
        assert!(!is_newer("1.2", "1.2.0"));
        assert!(is_newer("1.2.0", "1.2"));
    }

    #[test]
    fn components_compare_as_strings() {
        // Lexicographic: "10" < "9".
        assert!(!is_newer("1.10.0", "1.9.0"));
        assert!(is_newer("1.9.0", "1.10.0"));
    }

    #[test]
    fn only_three_components_count() {
        assert!(!is_newer("1.2.3.9", "1.2.3.1"));
    }

    #[test]
    fn is_dev_accepts_prefixed_placeholder() {
        assert!(is_dev("dev"));
        assert!(is_dev("vdev"));
        assert!(!is_dev("1.0.0"));
    }
}
