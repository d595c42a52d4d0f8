use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::path::Path;

use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use kestrel_rpm_types::{
    is_arch_compatible, AdvisoryRecord, DeltaRecord, Nevra, RpmRecord, SRC_ARCHES,
};
use kestrel_solve::{Map, Pool, ReldepId, RepoId, Solvable, SolvableId};

use crate::cache::{ext_cache_path, main_cache_path, read_cache, write_cache};
use crate::config::SackConfig;
use crate::errors::{Error, Result};
use crate::package::Package;
use crate::package_set::PackageSet;
use crate::repo::{
    LoadFlags, RepoHandle, RepoInfo, RepoMetadata, SystemState, CMDLINE_REPO_NAME,
    SYSTEM_REPO_NAME,
};

/// Resolves the currently booted kernel to a solvable; injected because kernel
/// detection touches the running system.
pub type KernelResolver = Box<dyn Fn(&Pool) -> Option<SolvableId>>;

pub(crate) struct SackState {
    pub(crate) repos: Vec<RepoHandle>,
    pkg_excludes: Option<Map>,
    pkg_includes: Option<Map>,
    module_excludes: Option<Map>,
    repo_excludes: Option<Map>,
    considered_uptodate: bool,
    pub(crate) advisories: Vec<AdvisoryRecord>,
    module_state: BTreeMap<String, bool>,
    kernel_resolver: Option<KernelResolver>,
    running_kernel_memo: Option<Option<SolvableId>>,
    rpmdb_version: Option<String>,
    cmdline_repo: Option<RepoId>,
    system_repo: Option<RepoId>,
}

/// The in-memory catalogue of every known package.
///
/// The sack owns the pool; queries, goals, package sets and packages borrow
/// the sack. Repository loading and overlay mutation take `&mut self`; the
/// considered bitmap and the provides index are caches recomputed on demand
/// behind `&self`. All access is single-threaded.
pub struct Sack {
    config: SackConfig,
    pool: RefCell<Pool>,
    state: RefCell<SackState>,
}

impl Sack {
    /// Creates an empty sack under the given configuration.
    pub fn new(config: SackConfig) -> Self {
        Self {
            config,
            pool: RefCell::new(Pool::new()),
            state: RefCell::new(SackState {
                repos: Vec::new(),
                pkg_excludes: None,
                pkg_includes: None,
                module_excludes: None,
                repo_excludes: None,
                considered_uptodate: true,
                advisories: Vec::new(),
                module_state: BTreeMap::new(),
                kernel_resolver: None,
                running_kernel_memo: None,
                rpmdb_version: None,
                cmdline_repo: None,
                system_repo: None,
            }),
        }
    }

    /// The sack configuration.
    pub fn config(&self) -> &SackConfig {
        &self.config
    }

    /// The number of package solvables, visible or not.
    pub fn package_count(&self) -> usize {
        self.pool.borrow().pkg_ids().count()
    }

    // --- loading ----------------------------------------------------------

    /// Imports the installed packages and marks their repo as the system
    /// repo. Computes the rpmdb fingerprint used for cache validation.
    pub fn load_system_repo(&mut self, system: SystemState) -> Result<()> {
        let state = self.state.get_mut();
        if state.system_repo.is_some() {
            return Err(Error::Internal("system repo already loaded".into()));
        }
        let pool = self.pool.get_mut();
        let repo = pool.add_repo(SYSTEM_REPO_NAME, 0);
        for record in &system.records {
            add_record(pool, repo, record);
        }
        pool.set_installed_repo(repo);
        let fingerprint = rpmdb_fingerprint(&system.records);
        debug!(
            "loaded system repo: {} packages, fingerprint {fingerprint}",
            system.records.len()
        );
        state.rpmdb_version = Some(fingerprint);
        state.system_repo = Some(repo);
        state.repos.push(RepoHandle {
            name: SYSTEM_REPO_NAME.to_owned(),
            pool_repo: repo,
            enabled: true,
            use_includes: false,
            cost: 0,
            deltas: Vec::new(),
        });
        state.considered_uptodate = false;
        state.running_kernel_memo = None;
        Ok(())
    }

    /// Adds a named repository. Primary records come from the metadata cache
    /// when its trailing checksum matches, otherwise from the metadata itself
    /// (refreshing the cache). Optional extensions are loaded per `flags`;
    /// a missing optional extension degrades to a warning.
    pub fn load_repo(&mut self, metadata: RepoMetadata, flags: LoadFlags) -> Result<()> {
        {
            let state = self.state.get_mut();
            if state.repos.iter().any(|r| r.name == metadata.name) {
                return Err(Error::Internal(format!(
                    "repo '{}' already loaded",
                    metadata.name
                )));
            }
        }
        let cachedir = self.config.cachedir.clone();
        let main_path = main_cache_path(&cachedir, &metadata.name);
        let records: Vec<RpmRecord> = match read_cache(&main_path, &metadata.checksum)? {
            Some(records) => {
                debug!("repo '{}' loaded from cache", metadata.name);
                records
            }
            None => {
                if let Err(err) = write_cache(&main_path, &metadata.primary, &metadata.checksum) {
                    warn!("cannot refresh cache for '{}': {err}", metadata.name);
                }
                metadata.primary.clone()
            }
        };

        let arch = self.config.arch.clone();
        let all_arch = self.config.all_arch;
        let pool = self.pool.get_mut();
        let repo = pool.add_repo(&metadata.name, metadata.priority);
        let mut loaded = 0usize;
        for record in &records {
            if !all_arch
                && record.arch != kestrel_rpm_types::NOARCH
                && !SRC_ARCHES.contains(&record.arch.as_str())
                && !is_arch_compatible(&record.arch, &arch)
            {
                continue;
            }
            add_record(pool, repo, record);
            loaded += 1;
        }
        debug!("loaded repo '{}': {loaded} packages", metadata.name);

        let use_includes = self
            .config
            .use_includes_per_repo
            .get(&metadata.name)
            .copied()
            .unwrap_or(true);
        let mut handle = RepoHandle {
            name: metadata.name.clone(),
            pool_repo: repo,
            enabled: true,
            use_includes,
            cost: metadata.cost,
            deltas: Vec::new(),
        };

        if flags.contains(LoadFlags::USE_FILELISTS) {
            let path = ext_cache_path(&cachedir, &metadata.name, "filenames");
            let filelists: Option<Vec<(Nevra, Vec<String>)>> = match &metadata.filelists {
                Some(lists) => {
                    if let Err(err) = write_cache(&path, lists, &metadata.checksum) {
                        warn!("cannot cache filelists for '{}': {err}", metadata.name);
                    }
                    Some(lists.clone())
                }
                None => read_cache(&path, &metadata.checksum)?,
            };
            match filelists {
                Some(lists) => apply_filelists(pool, repo, &lists),
                None => warn!("no filelists metadata for repo '{}'", metadata.name),
            }
        }
        if flags.contains(LoadFlags::USE_UPDATEINFO) {
            let path = ext_cache_path(&cachedir, &metadata.name, "updateinfo");
            let updateinfo: Option<Vec<AdvisoryRecord>> = match &metadata.updateinfo {
                Some(advisories) => {
                    if let Err(err) = write_cache(&path, advisories, &metadata.checksum) {
                        warn!("cannot cache updateinfo for '{}': {err}", metadata.name);
                    }
                    Some(advisories.clone())
                }
                None => read_cache(&path, &metadata.checksum)?,
            };
            match updateinfo {
                Some(advisories) => {
                    let state = self.state.get_mut();
                    state.advisories.extend(advisories);
                }
                None => warn!("no updateinfo metadata for repo '{}'", metadata.name),
            }
        }
        if flags.contains(LoadFlags::USE_PRESTO) {
            let path = ext_cache_path(&cachedir, &metadata.name, "presto");
            let presto: Option<Vec<DeltaRecord>> = match &metadata.presto {
                Some(deltas) => {
                    if let Err(err) = write_cache(&path, deltas, &metadata.checksum) {
                        warn!("cannot cache presto for '{}': {err}", metadata.name);
                    }
                    Some(deltas.clone())
                }
                None => read_cache(&path, &metadata.checksum)?,
            };
            match presto {
                Some(deltas) => handle.deltas = deltas,
                None => warn!("no presto metadata for repo '{}'", metadata.name),
            }
        }

        let state = self.state.get_mut();
        state.repos.push(handle);
        state.considered_uptodate = false;
        Ok(())
    }

    /// Ingests one decoded `.rpm` record into the command-line pseudo repo.
    pub fn add_cmdline_package(&mut self, record: RpmRecord) -> Result<Package<'_>> {
        let repo = match self.state.get_mut().cmdline_repo {
            Some(repo) => repo,
            None => {
                let repo = self.pool.get_mut().add_repo(CMDLINE_REPO_NAME, 0);
                let state = self.state.get_mut();
                state.cmdline_repo = Some(repo);
                state.repos.push(RepoHandle {
                    name: CMDLINE_REPO_NAME.to_owned(),
                    pool_repo: repo,
                    enabled: true,
                    use_includes: false,
                    cost: 0,
                    deltas: Vec::new(),
                });
                repo
            }
        };
        let id = add_record(self.pool.get_mut(), repo, &record);
        self.state.get_mut().considered_uptodate = false;
        Ok(Package::new(self, id))
    }

    /// Reads a decoded `.rpm` record (JSON, produced by the header-reading
    /// collaborator) from disk and ingests it.
    pub fn add_cmdline_package_from_file(&mut self, path: &Path) -> Result<Package<'_>> {
        let data = std::fs::read(path)
            .map_err(|err| Error::FileInvalid(format!("cannot read {}: {err}", path.display())))?;
        let record: RpmRecord = serde_json::from_slice(&data)
            .map_err(|err| Error::FileInvalid(format!("invalid package {}: {err}", path.display())))?;
        self.add_cmdline_package(record)
    }

    // --- repos ------------------------------------------------------------

    /// Read-only info about every loaded repo.
    pub fn repos(&self) -> Vec<RepoInfo> {
        let state = self.state.borrow();
        let pool = self.pool.borrow();
        state
            .repos
            .iter()
            .map(|handle| {
                let repo = pool.repo(handle.pool_repo);
                RepoInfo {
                    name: handle.name.clone(),
                    priority: repo.priority,
                    cost: handle.cost,
                    enabled: handle.enabled,
                    use_includes: handle.use_includes,
                    size: repo.len(),
                }
            })
            .collect()
    }

    /// Enables or disables a repo; a disabled repo stops contributing
    /// solvables.
    pub fn set_repo_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let state = self.state.get_mut();
        let handle = state
            .repos
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::Internal(format!("no repo '{name}'")))?;
        handle.enabled = enabled;
        state.considered_uptodate = false;
        Ok(())
    }

    /// Changes a repo priority.
    pub fn set_repo_priority(&mut self, name: &str, priority: i32) -> Result<()> {
        let state = self.state.get_mut();
        let handle = state
            .repos
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::Internal(format!("no repo '{name}'")))?;
        self.pool.get_mut().set_repo_priority(handle.pool_repo, priority);
        Ok(())
    }

    /// Whether include lists constrain the given repo.
    pub fn set_use_includes(&mut self, name: &str, enabled: bool) -> Result<()> {
        let state = self.state.get_mut();
        let handle = state
            .repos
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::Internal(format!("no repo '{name}'")))?;
        handle.use_includes = enabled;
        state.considered_uptodate = false;
        Ok(())
    }

    /// The delta records of a repo, when presto metadata was loaded.
    pub fn repo_deltas(&self, name: &str) -> Vec<DeltaRecord> {
        let state = self.state.borrow();
        state
            .repos
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.deltas.clone())
            .unwrap_or_default()
    }

    /// The rpmdb fingerprint captured when the system repo was loaded:
    /// `"<count>:<sha1>"` over the ASCII-sorted per-package header hashes.
    pub fn rpmdb_version(&self) -> Option<String> {
        self.state.borrow().rpmdb_version.clone()
    }

    // --- excludes and includes --------------------------------------------

    /// Replaces the package excludes.
    pub fn set_pkg_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| state.pkg_excludes = Some(set.as_map().clone()));
    }

    /// Adds to the package excludes.
    pub fn add_pkg_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| merge_overlay(&mut state.pkg_excludes, set.as_map()));
    }

    /// Removes from the package excludes.
    pub fn remove_pkg_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| subtract_overlay(&mut state.pkg_excludes, set.as_map()));
    }

    /// Drops the package excludes entirely.
    pub fn reset_pkg_excludes(&mut self) {
        self.mutate_overlay(|state| state.pkg_excludes = None);
    }

    /// The current package excludes.
    pub fn pkg_excludes(&self) -> Option<PackageSet> {
        self.state.borrow().pkg_excludes.clone().map(PackageSet::from_map)
    }

    /// Replaces the package includes.
    pub fn set_pkg_includes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| state.pkg_includes = Some(set.as_map().clone()));
    }

    /// Adds to the package includes.
    pub fn add_pkg_includes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| merge_overlay(&mut state.pkg_includes, set.as_map()));
    }

    /// Removes from the package includes.
    pub fn remove_pkg_includes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| subtract_overlay(&mut state.pkg_includes, set.as_map()));
    }

    /// Drops the package includes entirely.
    pub fn reset_pkg_includes(&mut self) {
        self.mutate_overlay(|state| state.pkg_includes = None);
    }

    /// The current package includes.
    pub fn pkg_includes(&self) -> Option<PackageSet> {
        self.state.borrow().pkg_includes.clone().map(PackageSet::from_map)
    }

    /// Replaces the modular excludes.
    pub fn set_module_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| state.module_excludes = Some(set.as_map().clone()));
    }

    /// Adds to the modular excludes.
    pub fn add_module_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| merge_overlay(&mut state.module_excludes, set.as_map()));
    }

    /// Removes from the modular excludes.
    pub fn remove_module_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| subtract_overlay(&mut state.module_excludes, set.as_map()));
    }

    /// Drops the modular excludes.
    pub fn reset_module_excludes(&mut self) {
        self.mutate_overlay(|state| state.module_excludes = None);
    }

    /// The current modular excludes.
    pub fn module_excludes(&self) -> Option<PackageSet> {
        self.state.borrow().module_excludes.clone().map(PackageSet::from_map)
    }

    /// Replaces the repo-level excludes.
    pub fn set_repo_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| state.repo_excludes = Some(set.as_map().clone()));
    }

    /// Adds to the repo-level excludes.
    pub fn add_repo_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| merge_overlay(&mut state.repo_excludes, set.as_map()));
    }

    /// Removes from the repo-level excludes.
    pub fn remove_repo_excludes(&mut self, set: &PackageSet) {
        self.mutate_overlay(|state| subtract_overlay(&mut state.repo_excludes, set.as_map()));
    }

    /// Drops the repo-level excludes.
    pub fn reset_repo_excludes(&mut self) {
        self.mutate_overlay(|state| state.repo_excludes = None);
    }

    /// The current repo-level excludes.
    pub fn repo_excludes(&self) -> Option<PackageSet> {
        self.state.borrow().repo_excludes.clone().map(PackageSet::from_map)
    }

    fn mutate_overlay(&mut self, f: impl FnOnce(&mut SackState)) {
        let state = self.state.get_mut();
        f(state);
        state.considered_uptodate = false;
    }

    // --- modules ----------------------------------------------------------

    /// Marks a `name:stream` module as enabled or disabled. A module the sack
    /// has never heard of counts as applicable; an explicitly disabled one
    /// stops its advisory collections from applying.
    pub fn set_module_enabled(&mut self, name_stream: &str, enabled: bool) {
        self.state
            .get_mut()
            .module_state
            .insert(name_stream.to_owned(), enabled);
    }

    /// Forgets the recorded state of a module.
    pub fn reset_module_state(&mut self, name_stream: &str) {
        self.state.get_mut().module_state.remove(name_stream);
    }

    /// Whether an advisory collection gated on `name_stream` applies.
    pub(crate) fn is_module_applicable(&self, name_stream: &str) -> bool {
        if name_stream.is_empty() {
            return true;
        }
        *self
            .state
            .borrow()
            .module_state
            .get(name_stream)
            .unwrap_or(&true)
    }

    // --- visibility -------------------------------------------------------

    /// Recomputes the considered bitmap if any overlay changed and rebuilds
    /// the provides index if needed. Idempotent; every visibility-sensitive
    /// read goes through here.
    pub fn make_provides_ready(&self) {
        let mut state = self.state.borrow_mut();
        let mut pool = self.pool.borrow_mut();
        if !state.considered_uptodate {
            let considered = compute_considered(&state, &pool);
            pool.set_considered(considered);
            state.considered_uptodate = true;
            debug!("considered map recomputed");
        }
        pool.make_provides_ready();
    }

    /// A visibility map with selectable overlay handling, for queries that
    /// ignore some or all excludes.
    pub(crate) fn visibility_map(&self, ignore_regular: bool, ignore_modular: bool) -> Map {
        self.make_provides_ready();
        let state = self.state.borrow();
        let pool = self.pool.borrow();
        if !ignore_regular && !ignore_modular {
            if let Some(considered) = pool.considered() {
                return considered.clone();
            }
        }
        let mut map = Map::new(pool.nsolvables());
        for id in pool.pkg_ids() {
            map.set(id);
        }
        // disabled repos are hidden from every flavour
        for handle in state.repos.iter().filter(|r| !r.enabled) {
            for id in pool.repo(handle.pool_repo).solvables() {
                map.clear(id);
            }
        }
        if !ignore_regular {
            if let Some(excludes) = &state.repo_excludes {
                map.subtract(excludes);
            }
            if let Some(excludes) = &state.pkg_excludes {
                map.subtract(excludes);
            }
            if let Some(includes) = &state.pkg_includes {
                apply_includes(&mut map, includes, &state, &pool);
            }
        }
        if !ignore_modular {
            if let Some(excludes) = &state.module_excludes {
                map.subtract(excludes);
            }
        }
        map
    }

    // --- running kernel ---------------------------------------------------

    /// Installs the resolver used to find the booted kernel.
    pub fn set_running_kernel_resolver(&mut self, resolver: KernelResolver) {
        let state = self.state.get_mut();
        state.kernel_resolver = Some(resolver);
        state.running_kernel_memo = None;
    }

    /// The solvable of the currently booted kernel; memoised, disabled when
    /// the install root is not `/`.
    pub fn running_kernel_id(&self) -> Option<SolvableId> {
        if !self.config.running_kernel_enabled() {
            return None;
        }
        if let Some(memo) = self.state.borrow().running_kernel_memo {
            return memo;
        }
        self.make_provides_ready();
        let resolved = {
            let state = self.state.borrow();
            let pool = self.pool.borrow();
            state
                .kernel_resolver
                .as_ref()
                .and_then(|resolver| resolver(&pool))
        };
        match resolved {
            Some(_) => debug!("running kernel resolved"),
            None => debug!("running kernel not matched to a package"),
        }
        self.state.borrow_mut().running_kernel_memo = Some(resolved);
        resolved
    }

    /// The currently booted kernel as a package.
    pub fn running_kernel(&self) -> Option<Package<'_>> {
        self.running_kernel_id().map(|id| Package::new(self, id))
    }

    // --- internal accessors ------------------------------------------------

    pub(crate) fn pool(&self) -> Ref<'_, Pool> {
        self.pool.borrow()
    }

    pub(crate) fn state(&self) -> Ref<'_, SackState> {
        self.state.borrow()
    }

    /// Interns a rendered dependency string.
    pub(crate) fn intern_dep(&self, dep: &str) -> ReldepId {
        self.pool.borrow_mut().parse_dep(dep)
    }

    /// Restricts a set to packages whose most recent history reason is
    /// `User`.
    pub fn filter_user_installed(
        &self,
        set: &mut PackageSet,
        history: &kestrel_history::History,
    ) -> crate::errors::Result<()> {
        let pool = self.pool.borrow();
        let mut drop_ids = Vec::new();
        for id in set.ids() {
            let solvable = pool.solvable(id);
            let name = pool.str_of(solvable.name);
            let arch = pool.str_of(solvable.arch);
            if !history.user_installed(name, arch)? {
                drop_ids.push(id);
            }
        }
        drop(pool);
        for id in drop_ids {
            set.remove_id(id);
        }
        Ok(())
    }
}

fn merge_overlay(slot: &mut Option<Map>, set: &Map) {
    match slot {
        Some(map) => {
            map.grow(set.len());
            map.union_with(set);
        }
        None => *slot = Some(set.clone()),
    }
}

fn subtract_overlay(slot: &mut Option<Map>, set: &Map) {
    if let Some(map) = slot {
        map.subtract(set);
    }
}

fn compute_considered(state: &SackState, pool: &Pool) -> Option<Map> {
    let any_overlay = state.pkg_excludes.is_some()
        || state.pkg_includes.is_some()
        || state.module_excludes.is_some()
        || state.repo_excludes.is_some()
        || state.repos.iter().any(|r| !r.enabled);
    if !any_overlay {
        return None;
    }
    let mut map = Map::new(pool.nsolvables());
    for id in pool.pkg_ids() {
        map.set(id);
    }
    for handle in state.repos.iter().filter(|r| !r.enabled) {
        for id in pool.repo(handle.pool_repo).solvables() {
            map.clear(id);
        }
    }
    if let Some(excludes) = &state.repo_excludes {
        map.subtract(excludes);
    }
    if let Some(excludes) = &state.pkg_excludes {
        map.subtract(excludes);
    }
    if let Some(excludes) = &state.module_excludes {
        map.subtract(excludes);
    }
    if let Some(includes) = &state.pkg_includes {
        apply_includes(&mut map, includes, state, pool);
    }
    Some(map)
}

// with includes set, a repo that honours includes only contributes included
// solvables; repos with use_includes off contribute everything
fn apply_includes(map: &mut Map, includes: &Map, state: &SackState, pool: &Pool) {
    let mut allowed = includes.clone();
    allowed.grow(pool.nsolvables());
    for handle in state.repos.iter().filter(|r| !r.use_includes) {
        for id in pool.repo(handle.pool_repo).solvables() {
            allowed.set(id);
        }
    }
    map.intersect_with(&allowed);
}

fn add_record(pool: &mut Pool, repo: RepoId, record: &RpmRecord) -> SolvableId {
    let mut solvable = Solvable::placeholder();
    solvable.name = pool.intern_str(&record.name);
    solvable.evr = pool.intern_str(&record.evr().to_string());
    solvable.arch = pool.intern_str(&record.arch);
    solvable.vendor = pool.intern_str(&record.vendor);
    solvable.buildtime = record.buildtime;
    solvable.location = pool.intern_str(&record.location);
    solvable.sourcerpm = pool.intern_str(&record.sourcerpm);
    solvable.summary = pool.intern_str(&record.summary);
    solvable.description = pool.intern_str(&record.description);
    solvable.url = pool.intern_str(&record.url);
    solvable.install_size = record.install_size;
    solvable.download_size = record.download_size;

    // the self-provide comes first; primary metadata usually repeats it
    let self_provide = format!("{} = {}", record.name, record.evr());
    solvable.provides.push(pool.parse_dep(&self_provide));
    for dep in &record.provides {
        if dep != &self_provide {
            solvable.provides.push(pool.parse_dep(dep));
        }
    }
    solvable.requires = record.requires.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.prereq = record.prereq.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.conflicts = record.conflicts.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.obsoletes = record.obsoletes.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.recommends = record.recommends.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.suggests = record.suggests.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.supplements = record
        .supplements
        .iter()
        .map(|d| pool.parse_dep(d))
        .collect();
    solvable.enhances = record.enhances.iter().map(|d| pool.parse_dep(d)).collect();
    solvable.files = record.files.iter().map(|f| pool.intern_str(f)).collect();
    pool.add_solvable(repo, solvable)
}

fn apply_filelists(pool: &mut Pool, repo: RepoId, lists: &[(Nevra, Vec<String>)]) {
    let ids: Vec<SolvableId> = pool.repo(repo).solvables().collect();
    for (nevra, files) in lists {
        let name = nevra.name.as_str();
        let evr = nevra.evr().to_string();
        let arch = nevra.arch.as_str();
        let found = ids.iter().copied().find(|&id| {
            let solvable = pool.solvable(id);
            pool.str_of(solvable.name) == name
                && pool.str_of(solvable.evr) == evr
                && pool.str_of(solvable.arch) == arch
        });
        if let Some(id) = found {
            let interned: Vec<_> = files.iter().map(|f| pool.intern_str(f)).collect();
            pool.add_solvable_files(id, interned);
        }
    }
}

/// `"<count>:<sha1>"` over the ASCII-sorted header hashes of the installed
/// packages, `gpg-pubkey` pseudo packages excluded.
pub(crate) fn rpmdb_fingerprint(records: &[RpmRecord]) -> String {
    let relevant: Vec<&RpmRecord> = records.iter().filter(|r| r.name != "gpg-pubkey").collect();
    let mut hashes: Vec<&str> = relevant
        .iter()
        .filter_map(|r| r.header_checksum.as_deref())
        .collect();
    hashes.sort_unstable();
    let mut hasher = Sha1::new();
    for hash in hashes {
        hasher.update(hash.as_bytes());
    }
    format!("{}:{}", relevant.len(), hex::encode(hasher.finalize()))
}
