use serde::{Deserialize, Serialize};

use crate::{Evr, Nevra};

/// A single package record decoded from primary repository metadata.
///
/// Loader collaborators (rpmdb readers, repodata decoders, `.rpm` header readers)
/// produce these; the sack turns them into pool solvables. Dependency strings use
/// the rpm rendering: a bare name, `name OP evr` with `OP` one of `< <= = >= >`,
/// a `/path` file dependency, or a parenthesised rich dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmRecord {
    /// Package name.
    pub name: String,
    /// Epoch, 0 when absent.
    #[serde(default)]
    pub epoch: u64,
    /// Upstream version.
    pub version: String,
    /// Distribution release.
    pub release: String,
    /// Architecture.
    pub arch: String,

    /// One-line summary.
    #[serde(default)]
    pub summary: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Upstream URL.
    #[serde(default)]
    pub url: String,
    /// Vendor string.
    #[serde(default)]
    pub vendor: String,
    /// Location of the payload relative to the repository root.
    #[serde(default)]
    pub location: String,
    /// Name of the source rpm this package was built from.
    #[serde(default)]
    pub sourcerpm: String,
    /// Build time, seconds since the epoch.
    #[serde(default)]
    pub buildtime: i64,
    /// Installed size in bytes.
    #[serde(default)]
    pub install_size: u64,
    /// Download size in bytes.
    #[serde(default)]
    pub download_size: u64,
    /// Hex rendering of the package header digest, when the source knows it.
    #[serde(default)]
    pub header_checksum: Option<String>,

    /// Capabilities this package provides.
    #[serde(default)]
    pub provides: Vec<String>,
    /// Capabilities this package requires.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Pre-install requirements.
    #[serde(default)]
    pub prereq: Vec<String>,
    /// Capabilities this package conflicts with.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Packages this package obsoletes.
    #[serde(default)]
    pub obsoletes: Vec<String>,
    /// Weak forward dependencies.
    #[serde(default)]
    pub recommends: Vec<String>,
    /// Very weak forward dependencies.
    #[serde(default)]
    pub suggests: Vec<String>,
    /// Weak reverse dependencies.
    #[serde(default)]
    pub supplements: Vec<String>,
    /// Very weak reverse dependencies.
    #[serde(default)]
    pub enhances: Vec<String>,
    /// Files owned by the package (subset listed in primary metadata, completed
    /// by the filelists extension).
    #[serde(default)]
    pub files: Vec<String>,
}

impl RpmRecord {
    /// The EVR triple of this record.
    pub fn evr(&self) -> Evr {
        Evr::new(self.epoch, self.version.clone(), self.release.clone())
    }

    /// The full NEVRA of this record.
    pub fn nevra(&self) -> Nevra {
        Nevra::new(
            self.name.clone(),
            self.epoch,
            self.version.clone(),
            self.release.clone(),
            self.arch.clone(),
        )
    }
}

/// Classification of an advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryKind {
    /// Security errata.
    Security,
    /// Bug fix errata.
    Bugfix,
    /// Enhancement errata.
    Enhancement,
    /// New package errata.
    Newpackage,
    /// Anything else.
    Unknown,
}

impl AdvisoryKind {
    /// Parses the updateinfo `type` attribute.
    pub fn parse(s: &str) -> AdvisoryKind {
        match s {
            "security" => AdvisoryKind::Security,
            "bugfix" => AdvisoryKind::Bugfix,
            "enhancement" => AdvisoryKind::Enhancement,
            "newpackage" => AdvisoryKind::Newpackage,
            _ => AdvisoryKind::Unknown,
        }
    }

    /// The updateinfo rendering.
    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryKind::Security => "security",
            AdvisoryKind::Bugfix => "bugfix",
            AdvisoryKind::Enhancement => "enhancement",
            AdvisoryKind::Newpackage => "newpackage",
            AdvisoryKind::Unknown => "unknown",
        }
    }
}

/// Kind of an advisory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryReferenceKind {
    /// A bug tracker entry.
    Bugzilla,
    /// A CVE identifier.
    Cve,
    /// A vendor advisory page.
    Vendor,
    /// Anything else.
    Unknown,
}

/// One reference attached to an advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryReference {
    /// Reference kind.
    pub kind: AdvisoryReferenceKind,
    /// The tracker-specific id (bug number, CVE id).
    pub id: String,
    /// Human readable title.
    #[serde(default)]
    pub title: String,
    /// Link target.
    #[serde(default)]
    pub url: String,
}

/// One package version an advisory ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryPackage {
    /// Package name.
    pub name: String,
    /// Rendered EVR the advisory lists.
    pub evr: String,
    /// Architecture.
    pub arch: String,
    /// Payload filename, when listed.
    #[serde(default)]
    pub filename: String,
}

/// A collection of advisory packages, optionally gated on a module stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryCollection {
    /// `name:stream` of the module gating this collection, empty when ungated.
    #[serde(default)]
    pub module: String,
    /// Packages the collection ships.
    pub packages: Vec<AdvisoryPackage>,
}

/// An errata record from the updateinfo metadata extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    /// Advisory id, e.g. `FEDORA-2021-abcdef`.
    pub id: String,
    /// Title line.
    #[serde(default)]
    pub title: String,
    /// Advisory classification.
    pub kind: AdvisoryKind,
    /// Severity string (`Critical`, `Important`, ...), empty when unrated.
    #[serde(default)]
    pub severity: String,
    /// Issue time, seconds since the epoch.
    #[serde(default)]
    pub issued: i64,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Bug/CVE/vendor references.
    #[serde(default)]
    pub references: Vec<AdvisoryReference>,
    /// Package collections.
    #[serde(default)]
    pub collections: Vec<AdvisoryCollection>,
}

/// Delta-rpm metadata from the presto extension: how to reconstruct a package
/// from an older installed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRecord {
    /// Target package NEVRA fields.
    pub name: String,
    /// Target epoch.
    #[serde(default)]
    pub epoch: u64,
    /// Target version.
    pub version: String,
    /// Target release.
    pub release: String,
    /// Target arch.
    pub arch: String,
    /// Rendered EVR of the installed base the delta applies to.
    pub base_evr: String,
    /// Reconstruction sequence id.
    #[serde(default)]
    pub sequence: String,
    /// Location of the delta payload relative to the repository root.
    pub location: String,
    /// Download size of the delta in bytes.
    #[serde(default)]
    pub download_size: u64,
}

impl DeltaRecord {
    /// The NEVRA of the package the delta reconstructs.
    pub fn nevra(&self) -> Nevra {
        Nevra::new(
            self.name.clone(),
            self.epoch,
            self.version.clone(),
            self.release.clone(),
            self.arch.clone(),
        )
    }
}
