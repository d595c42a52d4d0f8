use crate::id::{ReldepId, RepoId, StringId};

/// The catalogue record for one package version in one repo. All strings are
/// interned in the owning pool.
#[derive(Debug, Clone)]
pub struct Solvable {
    /// Package name.
    pub name: StringId,
    /// Rendered `[epoch:]version-release`.
    pub evr: StringId,
    /// Architecture.
    pub arch: StringId,
    /// Vendor string.
    pub vendor: StringId,
    /// The repo this solvable belongs to; `None` only for the reserved ids.
    pub repo: Option<RepoId>,

    /// Capabilities provided, including the implicit `name = evr` self-provide.
    pub provides: Vec<ReldepId>,
    /// Hard requirements.
    pub requires: Vec<ReldepId>,
    /// Pre-install requirements.
    pub prereq: Vec<ReldepId>,
    /// Conflicting capabilities.
    pub conflicts: Vec<ReldepId>,
    /// Obsoleted package names.
    pub obsoletes: Vec<ReldepId>,
    /// Weak forward dependencies.
    pub recommends: Vec<ReldepId>,
    /// Very weak forward dependencies.
    pub suggests: Vec<ReldepId>,
    /// Weak reverse dependencies.
    pub supplements: Vec<ReldepId>,
    /// Very weak reverse dependencies.
    pub enhances: Vec<ReldepId>,
    /// Owned file paths.
    pub files: Vec<StringId>,

    /// Build time, seconds since the epoch.
    pub buildtime: i64,
    /// Payload location relative to the repo root.
    pub location: StringId,
    /// Source rpm file name.
    pub sourcerpm: StringId,
    /// One-line summary.
    pub summary: StringId,
    /// Long description.
    pub description: StringId,
    /// Upstream URL.
    pub url: StringId,
    /// Installed size in bytes.
    pub install_size: u64,
    /// Download size in bytes.
    pub download_size: u64,
}

impl Solvable {
    /// A zeroed-out solvable with no interned strings, used as a filler slot.
    pub fn placeholder() -> Self {
        Self {
            name: StringId::none(),
            evr: StringId::none(),
            arch: StringId::none(),
            vendor: StringId::none(),
            repo: None,
            provides: Vec::new(),
            requires: Vec::new(),
            prereq: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
            supplements: Vec::new(),
            enhances: Vec::new(),
            files: Vec::new(),
            buildtime: 0,
            location: StringId::none(),
            sourcerpm: StringId::none(),
            summary: StringId::none(),
            description: StringId::none(),
            url: StringId::none(),
            install_size: 0,
            download_size: 0,
        }
    }
}
