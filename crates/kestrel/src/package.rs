use std::fmt;

use kestrel_rpm_types::{Evr, Nevra};
use kestrel_solve::SolvableId;

use crate::sack::Sack;

/// A read-only view of one solvable in a sack.
#[derive(Clone, Copy)]
pub struct Package<'a> {
    sack: &'a Sack,
    id: SolvableId,
}

impl<'a> Package<'a> {
    pub(crate) fn new(sack: &'a Sack, id: SolvableId) -> Self {
        Self { sack, id }
    }

    /// The solvable id of this package.
    pub fn id(&self) -> SolvableId {
        self.id
    }

    /// The owning sack.
    pub fn sack(&self) -> &'a Sack {
        self.sack
    }

    /// Package name.
    pub fn name(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).name).to_owned()
    }

    /// Rendered `[epoch:]version-release`.
    pub fn evr_string(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).evr).to_owned()
    }

    /// The parsed EVR triple.
    pub fn evr(&self) -> Evr {
        Evr::parse(&self.evr_string())
    }

    /// Epoch, 0 when absent.
    pub fn epoch(&self) -> u64 {
        self.evr().epoch
    }

    /// Upstream version.
    pub fn version(&self) -> String {
        self.evr().version
    }

    /// Distribution release.
    pub fn release(&self) -> String {
        self.evr().release
    }

    /// Architecture.
    pub fn arch(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).arch).to_owned()
    }

    /// The full NEVRA.
    pub fn nevra(&self) -> Nevra {
        let evr = self.evr();
        Nevra::new(self.name(), evr.epoch, evr.version, evr.release, self.arch())
    }

    /// The name of the repo this package belongs to.
    pub fn reponame(&self) -> String {
        let pool = self.sack.pool();
        match pool.solvable(self.id).repo {
            Some(repo) => pool.repo(repo).name.clone(),
            None => String::new(),
        }
    }

    /// Whether the package comes from the system repo.
    pub fn is_installed(&self) -> bool {
        self.sack.pool().is_installed(self.id)
    }

    /// Payload location relative to the repo root.
    pub fn location(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).location).to_owned()
    }

    /// Source rpm file name.
    pub fn sourcerpm(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).sourcerpm).to_owned()
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).summary).to_owned()
    }

    /// Long description.
    pub fn description(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).description).to_owned()
    }

    /// Upstream URL.
    pub fn url(&self) -> String {
        let pool = self.sack.pool();
        pool.str_of(pool.solvable(self.id).url).to_owned()
    }

    /// Build time, seconds since the epoch.
    pub fn buildtime(&self) -> i64 {
        self.sack.pool().solvable(self.id).buildtime
    }

    /// Installed size in bytes.
    pub fn install_size(&self) -> u64 {
        self.sack.pool().solvable(self.id).install_size
    }

    /// Owned file paths known to the sack.
    pub fn files(&self) -> Vec<String> {
        let pool = self.sack.pool();
        pool.solvable(self.id)
            .files
            .iter()
            .map(|&f| pool.str_of(f).to_owned())
            .collect()
    }

    /// Rendered provides.
    pub fn provides(&self) -> Vec<String> {
        let pool = self.sack.pool();
        pool.solvable(self.id)
            .provides
            .iter()
            .map(|&dep| pool.dep_to_string(dep))
            .collect()
    }

    /// Rendered requires (without pre-install requirements).
    pub fn requires(&self) -> Vec<String> {
        let pool = self.sack.pool();
        pool.solvable(self.id)
            .requires
            .iter()
            .map(|&dep| pool.dep_to_string(dep))
            .collect()
    }
}

impl fmt::Debug for Package<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package({})", self.nevra())
    }
}

impl fmt::Display for Package<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nevra())
    }
}

impl PartialEq for Package<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.sack, other.sack) && self.id == other.id
    }
}

impl Eq for Package<'_> {}
