use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Evr;

/// Error emitted when a string cannot be split into NEVRA fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseNevraError {
    /// The trailing `.arch` part is missing.
    #[error("missing architecture in '{0}'")]
    MissingArch(String),
    /// The `-release` part is missing.
    #[error("missing release in '{0}'")]
    MissingRelease(String),
    /// The `-version` part is missing.
    #[error("missing version in '{0}'")]
    MissingVersion(String),
    /// The epoch before `:` is not a number.
    #[error("invalid epoch in '{0}'")]
    InvalidEpoch(String),
    /// The name part is empty.
    #[error("empty package name in '{0}'")]
    EmptyName(String),
}

/// A `name-[epoch:]version-release.arch` package identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nevra {
    /// Package name.
    pub name: String,
    /// Epoch, 0 when omitted from the rendered form.
    pub epoch: u64,
    /// Upstream version.
    pub version: String,
    /// Distribution release.
    pub release: String,
    /// Architecture.
    pub arch: String,
}

impl Nevra {
    /// Constructs a [`Nevra`] from its parts.
    pub fn new(
        name: impl Into<String>,
        epoch: u64,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            epoch,
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
        }
    }

    /// Parses the full `name-[epoch:]version-release.arch` form.
    ///
    /// The string is split from the right: the last `.` delimits the arch and the
    /// two rightmost `-` delimit release and version, so names containing dashes
    /// parse the way rpm renders them.
    pub fn parse(s: &str) -> Result<Nevra, ParseNevraError> {
        let (rest, arch) = s
            .rsplit_once('.')
            .filter(|(_, arch)| !arch.is_empty() && !arch.contains('-'))
            .ok_or_else(|| ParseNevraError::MissingArch(s.to_owned()))?;
        let (rest, release) = rest
            .rsplit_once('-')
            .filter(|(_, release)| !release.is_empty())
            .ok_or_else(|| ParseNevraError::MissingRelease(s.to_owned()))?;
        let (name, evr) = rest
            .rsplit_once('-')
            .filter(|(_, version)| !version.is_empty())
            .ok_or_else(|| ParseNevraError::MissingVersion(s.to_owned()))?;
        if name.is_empty() {
            return Err(ParseNevraError::EmptyName(s.to_owned()));
        }
        let (epoch, version) = match evr.split_once(':') {
            Some((e, v)) => (
                e.parse()
                    .map_err(|_| ParseNevraError::InvalidEpoch(s.to_owned()))?,
                v,
            ),
            None => (0, evr),
        };
        Ok(Nevra::new(name, epoch, version, release, arch))
    }

    /// The EVR part of this identifier.
    pub fn evr(&self) -> Evr {
        Evr::new(self.epoch, self.version.clone(), self.release.clone())
    }

    /// Renders with the epoch always present, even when it is 0.
    pub fn to_string_with_epoch(&self) -> String {
        format!(
            "{}-{}:{}-{}.{}",
            self.name, self.epoch, self.version, self.release, self.arch
        )
    }
}

impl Display for Nevra {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-", self.name)?;
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}-{}.{}", self.version, self.release, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain() {
        let nevra = Nevra::parse("walrus-2-5.noarch").unwrap();
        assert_eq!(nevra, Nevra::new("walrus", 0, "2", "5", "noarch"));
        assert_eq!(nevra.to_string(), "walrus-2-5.noarch");
    }

    #[test]
    fn parse_with_epoch_and_dashed_name() {
        let nevra = Nevra::parse("perl-DBI-1:1.2-3.fc34.x86_64").unwrap();
        assert_eq!(nevra.name, "perl-DBI");
        assert_eq!(nevra.epoch, 1);
        assert_eq!(nevra.version, "1.2");
        assert_eq!(nevra.release, "3.fc34");
        assert_eq!(nevra.arch, "x86_64");
        assert_eq!(nevra.to_string(), "perl-DBI-1:1.2-3.fc34.x86_64");
    }

    #[test]
    fn release_may_contain_dots() {
        // the arch split must take the last dot only
        let nevra = Nevra::parse("k-1-0.x86_64").unwrap();
        assert_eq!(nevra.release, "0");
        assert_eq!(nevra.arch, "x86_64");
    }

    #[test]
    fn rejects_incomplete_forms() {
        assert!(matches!(
            Nevra::parse("walrus"),
            Err(ParseNevraError::MissingArch(_))
        ));
        assert!(matches!(
            Nevra::parse("walrus.noarch"),
            Err(ParseNevraError::MissingRelease(_))
        ));
        assert!(matches!(
            Nevra::parse("walrus-5.noarch"),
            Err(ParseNevraError::MissingVersion(_))
        ));
        assert!(matches!(
            Nevra::parse("walrus-x:2-5.noarch"),
            Err(ParseNevraError::InvalidEpoch(_))
        ));
    }

    #[test]
    fn epoch_rendering_round_trips() {
        let nevra = Nevra::new("k", 0, "1", "1", "x86_64");
        assert_eq!(nevra.to_string_with_epoch(), "k-0:1-1.x86_64");
        assert_eq!(Nevra::parse(&nevra.to_string_with_epoch()).unwrap(), nevra);
    }
}
