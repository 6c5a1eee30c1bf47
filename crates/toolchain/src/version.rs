//! Version String Ordering
//!
//! Orders dotted revision directory names such as "10.0.1" when resolving
//! versioned SDK tool locations.

use std::cmp::Ordering;

/// Parse a dotted version string into its numeric components.
///
/// Returns `None` when any component is empty or non-numeric.
pub fn parse(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Compare two version-like strings.
///
/// Components compare numerically left to right; a strict prefix ranks
/// below the longer token that extends it. A string that fails to parse
/// ranks below any parseable one. When both fail to parse, the first
/// argument ranks lower; callers depend on that tie-break staying put.
pub fn compare(a: &str, b: &str) -> Ordering {
    let Some(a_parts) = parse(a) else {
        return Ordering::Less;
    };
    let Some(b_parts) = parse(b) else {
        return Ordering::Greater;
    };
    a_parts.cmp(&b_parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ordering() {
        assert_eq!(compare("1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare("1.2", "1.2"), Ordering::Equal);
        assert_eq!(compare("1.2.4", "1.2.3.4"), Ordering::Greater);
        assert_eq!(compare("2.0", "10.0"), Ordering::Less);
        assert_eq!(compare("3", "10.0.1"), Ordering::Less);
    }

    #[test]
    fn test_prefix_ranks_lower() {
        assert_eq!(compare("1.2.3", "1.2.3.4"), Ordering::Less);
        assert_eq!(compare("1.2.3.4", "1.2.3"), Ordering::Greater);
        assert_eq!(compare("1", "1.0"), Ordering::Less);
    }

    #[test]
    fn test_invalid_ranks_below_valid() {
        assert_eq!(compare("latest", "0"), Ordering::Less);
        assert_eq!(compare("0", "latest"), Ordering::Greater);
        assert_eq!(compare("1.x.3", "1.2"), Ordering::Less);
        assert_eq!(compare("", "1"), Ordering::Less);
        assert_eq!(compare("1..2", "1"), Ordering::Less);
        assert_eq!(compare("-1", "0"), Ordering::Less);
    }

    #[test]
    fn test_invalid_pair_first_argument_ranks_lower() {
        assert_eq!(compare("latest", "tools"), Ordering::Less);
        assert_eq!(compare("tools", "latest"), Ordering::Less);
        assert_eq!(compare("latest", "latest"), Ordering::Less);
    }

    #[test]
    fn test_transitive_spot_check() {
        let a = "1.9";
        let b = "1.10";
        let c = "2";
        assert_eq!(compare(a, b), Ordering::Less);
        assert_eq!(compare(b, c), Ordering::Less);
        assert_eq!(compare(a, c), Ordering::Less);
    }
}
