use kestrel_rpm_types::{AdvisoryRecord, DeltaRecord, Nevra, RpmRecord};
use kestrel_solve::RepoId;

use crate::cache::CHECKSUM_BYTES;

/// The pseudo repo holding ad-hoc packages handed in from the command line.
pub const CMDLINE_REPO_NAME: &str = "@commandline";
/// The repo holding what is installed on the system.
pub const SYSTEM_REPO_NAME: &str = "@System";

bitflags::bitflags! {
    /// What to load besides the primary metadata of a repo.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoadFlags: u32 {
        /// Load the filelists extension.
        const USE_FILELISTS = 1 << 1;
        /// Load the updateinfo (advisory) extension.
        const USE_UPDATEINFO = 1 << 2;
        /// Load the presto (delta rpm) extension.
        const USE_PRESTO = 1 << 3;
    }
}

/// Decoded metadata of one repository, as handed over by the fetching and
/// parsing collaborators. The checksum identifies the metadata revision and
/// validates cache files.
#[derive(Debug, Clone)]
pub struct RepoMetadata {
    /// Repository name.
    pub name: String,
    /// Repository priority; a higher value is preferred.
    pub priority: i32,
    /// Repository cost; a lower value is cheaper to download from. Purely
    /// informational to this core.
    pub cost: i32,
    /// Checksum of the metadata revision.
    pub checksum: [u8; CHECKSUM_BYTES],
    /// Primary package records.
    pub primary: Vec<RpmRecord>,
    /// Complete per-package file lists, when the filelists metadata was
    /// fetched.
    pub filelists: Option<Vec<(Nevra, Vec<String>)>>,
    /// Advisory records, when the updateinfo metadata was fetched.
    pub updateinfo: Option<Vec<AdvisoryRecord>>,
    /// Delta rpm records, when the presto metadata was fetched.
    pub presto: Option<Vec<DeltaRecord>>,
}

impl RepoMetadata {
    /// Starts a metadata description with just primary records.
    pub fn new(name: impl Into<String>, checksum: [u8; CHECKSUM_BYTES], primary: Vec<RpmRecord>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            cost: 1000,
            checksum,
            primary,
            filelists: None,
            updateinfo: None,
            presto: None,
        }
    }
}

/// The installed-package view of the system, as read from the rpm database by
/// the loading collaborator. `header_checksum` of each record feeds the rpmdb
/// fingerprint.
#[derive(Debug, Clone, Default)]
pub struct SystemState {
    /// One record per installed package.
    pub records: Vec<RpmRecord>,
}

/// Mutable attributes of a loaded repository.
#[derive(Debug)]
pub(crate) struct RepoHandle {
    pub(crate) name: String,
    pub(crate) pool_repo: RepoId,
    pub(crate) enabled: bool,
    pub(crate) use_includes: bool,
    pub(crate) cost: i32,
    pub(crate) deltas: Vec<DeltaRecord>,
}

/// Read-only information about a loaded repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Repository name.
    pub name: String,
    /// Repository priority.
    pub priority: i32,
    /// Repository cost.
    pub cost: i32,
    /// Whether the repo currently contributes solvables.
    pub enabled: bool,
    /// Whether include lists constrain this repo.
    pub use_includes: bool,
    /// How many packages the repo holds.
    pub size: usize,
}
