use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// An `[epoch:]version[-release]` triple.
///
/// This class implements the order relation used everywhere a package version is
/// compared: epochs compare numerically, then the version and release strings are
/// compared with the segment-wise comparator of [`vercmp`]. A missing epoch is 0 and
/// a missing release is the empty string, which sorts below any non-empty release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Evr {
    /// The epoch, 0 when not present in the rendered form.
    pub epoch: u64,
    /// The upstream version.
    pub version: String,
    /// The distribution release, possibly empty.
    pub release: String,
}

impl Evr {
    /// Constructs an [`Evr`] from its parts.
    pub fn new(epoch: u64, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.into(),
        }
    }

    /// Parses an `[epoch:]version[-release]` string. Parsing never fails: a
    /// non-numeric prefix before `:` is kept as part of the version, matching how
    /// the id pool treats malformed interned EVR strings.
    pub fn parse(s: &str) -> Evr {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) if e.chars().all(|c| c.is_ascii_digit()) => {
                (e.parse().unwrap_or(0), rest)
            }
            _ => (0, s),
        };
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => (v, r),
            None => (rest, ""),
        };
        Evr::new(epoch, version, release)
    }
}

impl Display for Evr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| vercmp(&self.version, &other.version))
            .then_with(|| vercmp(&self.release, &other.release))
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compares two rendered EVR strings.
pub fn compare_evr(a: &str, b: &str) -> Ordering {
    Evr::parse(a).cmp(&Evr::parse(b))
}

/// The rpm version segment comparator.
///
/// Strings are walked as alternating runs of digits and letters; everything else
/// separates segments. Numeric segments compare numerically (leading zeros
/// stripped), alphabetic segments lexically, and a numeric segment sorts above an
/// alphabetic one. `~` sorts before everything including the end of the string;
/// `^` sorts after the base version but before any longer segment.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() || j < b.len() {
        while i < a.len() && !a[i].is_ascii_alphanumeric() && a[i] != b'~' && a[i] != b'^' {
            i += 1;
        }
        while j < b.len() && !b[j].is_ascii_alphanumeric() && b[j] != b'~' && b[j] != b'^' {
            j += 1;
        }

        let ca = a.get(i).copied();
        let cb = b.get(j).copied();

        if ca == Some(b'~') || cb == Some(b'~') {
            if ca != Some(b'~') {
                return Ordering::Greater;
            }
            if cb != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if ca == Some(b'^') || cb == Some(b'^') {
            if ca.is_none() {
                return Ordering::Less;
            }
            if cb.is_none() {
                return Ordering::Greater;
            }
            if ca != Some(b'^') {
                return Ordering::Greater;
            }
            if cb != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if ca.is_none() || cb.is_none() {
            break;
        }

        let numeric = a[i].is_ascii_digit();
        let sa = take_run(a, &mut i, numeric);
        let sb = take_run(b, &mut j, numeric);

        if sb.is_empty() {
            // segments of different kinds: the numeric one is newer
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let sa = strip_leading_zeros(sa);
            let sb = strip_leading_zeros(sb);
            sa.len().cmp(&sb.len()).then_with(|| sa.cmp(sb))
        } else {
            sa.cmp(sb)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    if i >= a.len() && j >= b.len() {
        Ordering::Equal
    } else if i < a.len() {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn take_run<'s>(s: &'s [u8], pos: &mut usize, numeric: bool) -> &'s [u8] {
    let start = *pos;
    while *pos < s.len()
        && if numeric {
            s[*pos].is_ascii_digit()
        } else {
            s[*pos].is_ascii_alphabetic()
        }
    {
        *pos += 1;
    }
    &s[start..*pos]
}

fn strip_leading_zeros(s: &[u8]) -> &[u8] {
    let first = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[first..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0", "1.0", Ordering::Equal)]
    #[case("1.0", "1.1", Ordering::Less)]
    #[case("2.0", "1.9", Ordering::Greater)]
    #[case("1.05", "1.5", Ordering::Equal)]
    #[case("1.0010", "1.9", Ordering::Greater)]
    #[case("2a", "2.0", Ordering::Less)]
    #[case("fc4", "fc.4", Ordering::Equal)]
    #[case("1.0", "1.0.1", Ordering::Less)]
    #[case("5.16.1", "5.16", Ordering::Greater)]
    fn vercmp_basics(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(vercmp(a, b), expected);
        assert_eq!(vercmp(b, a), expected.reverse());
    }

    #[rstest]
    #[case("1.0~rc1", "1.0", Ordering::Less)]
    #[case("1.0~rc1", "1.0~rc2", Ordering::Less)]
    #[case("1.0~rc1~git123", "1.0~rc1", Ordering::Less)]
    #[case("1.0^", "1.0", Ordering::Greater)]
    #[case("1.0^git1", "1.0", Ordering::Greater)]
    #[case("1.0^git1", "1.0.1", Ordering::Less)]
    #[case("1.0^git1", "1.0^git2", Ordering::Less)]
    #[case("1.0~rc1^git1", "1.0~rc1", Ordering::Greater)]
    fn vercmp_tilde_caret(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(vercmp(a, b), expected);
        assert_eq!(vercmp(b, a), expected.reverse());
    }

    #[test]
    fn parse_full() {
        let evr = Evr::parse("3:1.2-4.fc34");
        assert_eq!(evr, Evr::new(3, "1.2", "4.fc34"));
        assert_eq!(evr.to_string(), "3:1.2-4.fc34");
    }

    #[test]
    fn parse_without_epoch_or_release() {
        assert_eq!(Evr::parse("1.2-4"), Evr::new(0, "1.2", "4"));
        assert_eq!(Evr::parse("1.2"), Evr::new(0, "1.2", ""));
        assert_eq!(Evr::parse("1.2").to_string(), "1.2");
    }

    #[test]
    fn epoch_dominates() {
        assert_eq!(compare_evr("1:1.0-1", "2.0-1"), Ordering::Greater);
        assert_eq!(compare_evr("0:2.0-1", "2.0-1"), Ordering::Equal);
    }

    #[test]
    fn release_breaks_ties() {
        assert_eq!(compare_evr("2.0-1", "2.0-2"), Ordering::Less);
        assert_eq!(compare_evr("2.0", "2.0-1"), Ordering::Less);
    }

    #[test]
    fn order_is_antisymmetric() {
        let samples = ["1-0", "1-1", "2-0", "2-1", "1:0.5-1", "1.0~rc1-1"];
        for a in samples {
            for b in samples {
                assert_eq!(compare_evr(a, b), compare_evr(b, a).reverse());
            }
        }
    }
}
