use kestrel_rpm_types::{compare_evr, Evr, Nevra};
use kestrel_solve::{Job, JobFlags, JobTarget, ReldepId, SolvableId};

use crate::errors::{Error, Result};
use crate::package_set::PackageSet;
use crate::query::CmpFlags;
use crate::sack::Sack;

/// A narrowed query describing the target of a goal action.
///
/// Only the filter subset that translates into solver jobs is accepted: name,
/// provides, file, nevra or an explicit package set select the candidates;
/// arch, evr, version, release and reponame constrain them. Setting anything
/// else is a [`Error::BadSelector`].
pub struct Selector<'a> {
    sack: &'a Sack,
    name: Option<(CmpFlags, String)>,
    provides: Option<ReldepId>,
    file: Option<(CmpFlags, String)>,
    nevra: Option<(CmpFlags, String)>,
    pkg_set: Option<PackageSet>,
    arch: Option<String>,
    evr: Option<String>,
    version: Option<String>,
    release: Option<String>,
    reponame: Option<String>,
}

impl<'a> Selector<'a> {
    /// An empty selector over the sack.
    pub fn new(sack: &'a Sack) -> Self {
        Self {
            sack,
            name: None,
            provides: None,
            file: None,
            nevra: None,
            pkg_set: None,
            arch: None,
            evr: None,
            version: None,
            release: None,
            reponame: None,
        }
    }

    /// Selects by package name; `EQ` and `GLOB` comparisons are accepted.
    pub fn set_name(mut self, cmp: CmpFlags, name: &str) -> Result<Self> {
        if !(cmp == CmpFlags::EQ || cmp == CmpFlags::GLOB) {
            return Err(Error::BadSelector("name accepts EQ or GLOB".into()));
        }
        self.name = Some((cmp, name.to_owned()));
        Ok(self)
    }

    /// Selects by a provided capability, `name [op evr]`.
    pub fn set_provides(mut self, dep: &str) -> Result<Self> {
        self.provides = Some(self.sack.intern_dep(dep));
        Ok(self)
    }

    /// Selects by an owned file path; `EQ` and `GLOB` are accepted.
    pub fn set_file(mut self, cmp: CmpFlags, path: &str) -> Result<Self> {
        if !(cmp == CmpFlags::EQ || cmp == CmpFlags::GLOB) {
            return Err(Error::BadSelector("file accepts EQ or GLOB".into()));
        }
        self.file = Some((cmp, path.to_owned()));
        Ok(self)
    }

    /// Selects by NEVRA; `EQ` and `GLOB` are accepted.
    pub fn set_nevra(mut self, cmp: CmpFlags, nevra: &str) -> Result<Self> {
        if !(cmp == CmpFlags::EQ || cmp == CmpFlags::GLOB) {
            return Err(Error::BadSelector("nevra accepts EQ or GLOB".into()));
        }
        self.nevra = Some((cmp, nevra.to_owned()));
        Ok(self)
    }

    /// Selects from an explicit package set.
    pub fn set_pkg_set(mut self, set: PackageSet) -> Self {
        self.pkg_set = Some(set);
        self
    }

    /// Constrains the architecture (exact match).
    pub fn set_arch(mut self, arch: &str) -> Result<Self> {
        if arch.is_empty() {
            return Err(Error::BadSelector("empty arch".into()));
        }
        self.arch = Some(arch.to_owned());
        Ok(self)
    }

    /// Constrains the full EVR (exact match).
    pub fn set_evr(mut self, evr: &str) -> Result<Self> {
        self.evr = Some(evr.to_owned());
        Ok(self)
    }

    /// Constrains the upstream version (exact match).
    pub fn set_version(mut self, version: &str) -> Result<Self> {
        self.version = Some(version.to_owned());
        Ok(self)
    }

    /// Constrains the release (exact match).
    pub fn set_release(mut self, release: &str) -> Result<Self> {
        self.release = Some(release.to_owned());
        Ok(self)
    }

    /// Constrains the repository.
    pub fn set_reponame(mut self, reponame: &str) -> Result<Self> {
        self.reponame = Some(reponame.to_owned());
        Ok(self)
    }

    /// Whether the selector pins a concrete version.
    pub(crate) fn is_versioned(&self) -> bool {
        self.evr.is_some()
            || self.version.is_some()
            || self
                .nevra
                .as_ref()
                .is_some_and(|(cmp, _)| *cmp == CmpFlags::EQ)
    }

    pub(crate) fn has_arch(&self) -> bool {
        self.arch.is_some()
    }

    /// Resolves the selector to concrete solvable ids. A selector without a
    /// selecting constraint is a `BadSelector`.
    pub fn matches(&self) -> Result<Vec<SolvableId>> {
        if self.name.is_none()
            && self.provides.is_none()
            && self.file.is_none()
            && self.nevra.is_none()
            && self.pkg_set.is_none()
        {
            return Err(Error::BadSelector(
                "selector needs a name, provides, file, nevra or package set".into(),
            ));
        }
        self.sack.make_provides_ready();
        let pool = self.sack.pool();
        let mut ids: Vec<SolvableId> = pool
            .pkg_ids()
            .filter(|&id| pool.is_visible(id))
            .collect();

        if let Some(set) = &self.pkg_set {
            ids.retain(|&id| set.contains_id(id));
        }
        if let Some((cmp, name)) = &self.name {
            ids.retain(|&id| {
                let value = pool.str_of(pool.solvable(id).name);
                if *cmp == CmpFlags::GLOB {
                    glob::Pattern::new(name)
                        .map(|p| p.matches(value))
                        .unwrap_or(false)
                } else {
                    value == name
                }
            });
        }
        if let Some(dep) = self.provides {
            let providers = pool.providers_of_dep(dep);
            ids.retain(|id| providers.contains(id));
        }
        if let Some((cmp, path)) = &self.file {
            let path = path.strip_suffix('/').unwrap_or(path);
            ids.retain(|&id| {
                pool.solvable(id).files.iter().any(|&file| {
                    let value = pool.str_of(file);
                    if *cmp == CmpFlags::GLOB {
                        glob::Pattern::new(path)
                            .map(|p| p.matches(value))
                            .unwrap_or(false)
                    } else {
                        value == path
                    }
                })
            });
        }
        if let Some((cmp, pattern)) = &self.nevra {
            ids.retain(|&id| {
                let solvable = pool.solvable(id);
                let evr = Evr::parse(pool.str_of(solvable.evr));
                let nevra = Nevra::new(
                    pool.str_of(solvable.name),
                    evr.epoch,
                    evr.version.clone(),
                    evr.release.clone(),
                    pool.str_of(solvable.arch),
                );
                let plain = nevra.to_string();
                let forced = nevra.to_string_with_epoch();
                if *cmp == CmpFlags::GLOB {
                    glob::Pattern::new(pattern)
                        .map(|p| p.matches(&plain) || p.matches(&forced))
                        .unwrap_or(false)
                } else {
                    plain == *pattern || forced == *pattern
                }
            });
        }
        if let Some(arch) = &self.arch {
            ids.retain(|&id| pool.str_of(pool.solvable(id).arch) == arch);
        }
        if let Some(evr) = &self.evr {
            ids.retain(|&id| {
                compare_evr(pool.str_of(pool.solvable(id).evr), evr) == std::cmp::Ordering::Equal
            });
        }
        if let Some(version) = &self.version {
            ids.retain(|&id| {
                Evr::parse(pool.str_of(pool.solvable(id).evr)).version == *version
            });
        }
        if let Some(release) = &self.release {
            ids.retain(|&id| {
                Evr::parse(pool.str_of(pool.solvable(id).evr)).release == *release
            });
        }
        if let Some(reponame) = &self.reponame {
            ids.retain(|&id| match pool.solvable(id).repo {
                Some(repo) => pool.repo(repo).name == *reponame,
                None => false,
            });
        }
        Ok(ids)
    }

    /// Translates the selector into one solver job. An empty match set is a
    /// `BadSelector`.
    pub(crate) fn to_job(&self, mut flags: JobFlags) -> Result<Job> {
        let ids = self.matches()?;
        if ids.is_empty() {
            return Err(Error::BadSelector("no package matches the selector".into()));
        }
        if self.is_versioned() {
            flags |= JobFlags::SET_EVR;
        }
        if self.has_arch() {
            flags |= JobFlags::SET_ARCH;
        }
        Ok(Job::new(flags, JobTarget::OneOf(ids)))
    }
}
