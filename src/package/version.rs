//! Version ordering for manifest versions.
//!
//! Versions are compared component by component after splitting on `.`.
//! This is not semver: pre-release and build suffixes are compared as plain
//! strings, so `"0-beta"` sorts above `"0"`.

use std::cmp::Ordering;

use super::Package;

/// Check whether `a` is higher than or equal to `b`.
///
/// The first position where both versions have a component and the components
/// differ decides (see [`compare_component`]). A position missing on either
/// side counts as equal, so `"1.2"` and `"1.2.0"` are higher-or-equal to each other.
pub fn is_higher_or_equal(a: &str, b: &str) -> bool {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();
    let longest = a_parts.len().max(b_parts.len());

    for n in 0..longest {
        match (a_parts.get(n), b_parts.get(n)) {
            (Some(x), Some(y)) if x != y => return compare_component(x, y) == Ordering::Greater,
            _ => continue,
        }
    }
    true
}

/// Order two version components.
///
/// Two all-digit components compare by value (`"9" < "10"`); anything else
/// compares as strings.
pub fn compare_component(x: &str, y: &str) -> Ordering {
    match (x.parse::<u64>(), y.parse::<u64>()) {
        (Ok(a), Ok(b)) if is_digits(x) && is_digits(y) => a.cmp(&b).then_with(|| x.cmp(y)),
        _ => x.cmp(y),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Fold step keeping one package per name, the one with the highest version.
///
/// An existing entry wins ties. A missing version compares as the empty string,
/// so any declared version beats an undeclared one.
pub fn keep_highest(mut accumulated: Vec<Package>, candidate: Package) -> Vec<Package> {
    let Some(index) = accumulated.iter().position(|p| p.name == candidate.name) else {
        accumulated.push(candidate);
        return accumulated;
    };

    let existing = accumulated[index].version.as_deref().unwrap_or_default();
    let incoming = candidate.version.as_deref().unwrap_or_default();

    if !is_higher_or_equal(existing, incoming) {
        accumulated.remove(index);
        accumulated.push(candidate);
    }
    accumulated
}
