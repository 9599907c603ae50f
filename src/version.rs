//! Total-order version comparison for candidate selection.
//!
//! Version strings are parsed with the `semver` crate. Real manifest trees
//! carry plenty of versions that are not strict semver (`1.2`, `2026`,
//! `1.2.3.4`), so purely numeric dotted forms are accepted too, keeping
//! every component: the first three map onto major/minor/patch and any
//! remainder stays significant for ordering. Anything else maps to an
//! unparseable sentinel that ranks strictly below every well-formed
//! version, so an invalid string can never win a comparison and never
//! makes the comparator fail.

use semver::Version;
use std::cmp::Ordering;

/// A version string parsed into a totally ordered form.
///
/// Ordering compares well-formedness first (any parsed version strictly
/// beats the sentinel, including a genuine `0.0.0`), then the semver
/// triple with pre-release rules, then the numeric components past the
/// third.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    well_formed: bool,
    version: Version,
    extra: Vec<u64>,
}

impl ParsedVersion {
    /// Sentinel for strings that cannot be parsed at all.
    fn sentinel() -> Self {
        Self {
            well_formed: false,
            version: Version::new(0, 0, 0),
            extra: Vec::new(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.well_formed
            .cmp(&other.well_formed)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.extra.cmp(&other.extra))
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses a version string, best effort, always producing a comparable value.
pub fn parse_lenient(raw: &str) -> ParsedVersion {
    let trimmed = raw.trim();
    if let Ok(version) = Version::parse(trimmed) {
        return ParsedVersion {
            well_formed: true,
            version,
            extra: Vec::new(),
        };
    }
    numeric_dotted(trimmed).unwrap_or_else(ParsedVersion::sentinel)
}

/// Accepts purely numeric dotted forms (`1`, `1.2`, `1.2.3.4`), padding
/// missing components with zero. Components past the third are kept and
/// remain significant for ordering.
fn numeric_dotted(raw: &str) -> Option<ParsedVersion> {
    let mut nums = [0u64; 3];
    let mut extra = Vec::new();
    let mut count = 0;
    for part in raw.split('.') {
        let value = part.parse::<u64>().ok()?;
        if count < 3 {
            nums[count] = value;
        } else {
            extra.push(value);
        }
        count += 1;
    }
    Some(ParsedVersion {
        well_formed: true,
        version: Version::new(nums[0], nums[1], nums[2]),
        extra,
    })
}

/// Total ordering over raw version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    parse_lenient(a).cmp(&parse_lenient(b))
}
