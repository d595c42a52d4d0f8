use std::cmp::Ordering;

use ahash::AHashMap;
use kestrel_rpm_types::{compare_evr, Evr};

use crate::id::{ReldepId, RepoId, SolvableId, StringId};
use crate::map::Map;
use crate::reldep::{DepFlags, Reldep};
use crate::solvable::Solvable;

/// A repository registered in a pool. Solvable ids of one repo are ascending;
/// repos loaded in one go occupy one dense block.
#[derive(Debug, Clone)]
pub struct PoolRepo {
    /// Repository name.
    pub name: String,
    /// Repository priority; a higher value is preferred.
    pub priority: i32,
    pub(crate) ids: Vec<SolvableId>,
}

impl PoolRepo {
    /// Iterates over the solvable ids of this repo, ascending.
    pub fn solvables(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.ids.iter().copied()
    }

    /// The number of solvables in this repo.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the repo holds no solvables.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The arena everything else borrows from: interned strings, interned
/// relations, the solvable array and the repo list.
///
/// Id 0 of every arena is reserved for "none"; solvable 1 is the distinguished
/// system solvable. One repo may be marked installed. The pool also carries the
/// optional `considered` bitmap of currently visible solvables and the lazily
/// built "who provides" index.
pub struct Pool {
    strings: Vec<String>,
    string_ids: AHashMap<String, StringId>,

    reldeps: Vec<Reldep>,
    reldep_ids: AHashMap<Reldep, ReldepId>,

    solvables: Vec<Solvable>,
    repos: Vec<PoolRepo>,
    installed: Option<RepoId>,

    considered: Option<Map>,

    whatprovides: AHashMap<StringId, Vec<SolvableId>>,
    whatprovides_files: AHashMap<StringId, Vec<SolvableId>>,
    packages_by_name: AHashMap<StringId, Vec<SolvableId>>,
    provides_ready: bool,
}

impl Default for Pool {
    fn default() -> Self {
        let mut pool = Self {
            strings: vec![String::new()],
            string_ids: AHashMap::new(),
            reldeps: vec![Reldep {
                name: StringId::none(),
                flags: DepFlags::empty(),
                evr: StringId::none(),
            }],
            reldep_ids: AHashMap::new(),
            solvables: vec![Solvable::placeholder()],
            repos: Vec::new(),
            installed: None,
            considered: None,
            whatprovides: AHashMap::new(),
            whatprovides_files: AHashMap::new(),
            packages_by_name: AHashMap::new(),
            provides_ready: false,
        };
        let mut system = Solvable::placeholder();
        system.name = pool.intern_str("system:system");
        pool.solvables.push(system);
        pool
    }
}

impl Pool {
    /// Creates an empty pool holding only the reserved solvables.
    pub fn new() -> Self {
        Self::default()
    }

    /// The total number of solvables, reserved ids included.
    pub fn nsolvables(&self) -> usize {
        self.solvables.len()
    }

    /// Iterates over the package solvable ids (reserved ids excluded).
    pub fn pkg_ids(&self) -> impl Iterator<Item = SolvableId> {
        (2..self.solvables.len() as u32).map(SolvableId::from_raw)
    }

    // --- strings ---------------------------------------------------------

    /// Interns a string, returning its id.
    pub fn intern_str(&mut self, s: &str) -> StringId {
        if s.is_empty() {
            return StringId::none();
        }
        if let Some(&id) = self.string_ids.get(s) {
            return id;
        }
        let id = StringId::new(self.strings.len());
        self.strings.push(s.to_owned());
        self.string_ids.insert(s.to_owned(), id);
        id
    }

    /// Looks a string up without interning it.
    pub fn find_str(&self, s: &str) -> Option<StringId> {
        if s.is_empty() {
            return Some(StringId::none());
        }
        self.string_ids.get(s).copied()
    }

    /// Resolves an interned string.
    pub fn str_of(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    // --- reldeps ---------------------------------------------------------

    /// Interns a relation from its parts.
    pub fn intern_reldep(&mut self, name: StringId, flags: DepFlags, evr: StringId) -> ReldepId {
        let reldep = Reldep { name, flags, evr };
        if let Some(&id) = self.reldep_ids.get(&reldep) {
            return id;
        }
        let id = ReldepId::new(self.reldeps.len());
        self.reldeps.push(reldep);
        self.reldep_ids.insert(reldep, id);
        id
    }

    /// Parses a rendered dependency: a bare name, `name OP evr`, a `/path`
    /// file dependency, or a parenthesised rich dependency (interned opaquely).
    /// Malformed strings degrade to a bare-name relation on the whole string.
    pub fn parse_dep(&mut self, s: &str) -> ReldepId {
        let s = s.trim();
        if s.starts_with('(') {
            let name = self.intern_str(s);
            return self.intern_reldep(name, DepFlags::RICH, StringId::none());
        }
        let mut parts = s.splitn(3, char::is_whitespace).filter(|p| !p.is_empty());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(op), Some(evr)) => match DepFlags::from_operator(op) {
                Some(flags) => {
                    let name = self.intern_str(name);
                    let evr = self.intern_str(evr);
                    self.intern_reldep(name, flags, evr)
                }
                None => {
                    let name = self.intern_str(s);
                    self.intern_reldep(name, DepFlags::empty(), StringId::none())
                }
            },
            (Some(name), None, _) => {
                let name = self.intern_str(name);
                self.intern_reldep(name, DepFlags::empty(), StringId::none())
            }
            _ => ReldepId::none(),
        }
    }

    /// Resolves an interned relation.
    pub fn reldep(&self, id: ReldepId) -> &Reldep {
        &self.reldeps[id.index()]
    }

    /// Renders a relation the way rpm spells it.
    pub fn dep_to_string(&self, id: ReldepId) -> String {
        let reldep = self.reldep(id);
        if reldep.is_versioned() {
            format!(
                "{} {} {}",
                self.str_of(reldep.name),
                reldep.flags.as_operator(),
                self.str_of(reldep.evr)
            )
        } else {
            self.str_of(reldep.name).to_owned()
        }
    }

    // --- repos and solvables ---------------------------------------------

    /// Registers a repo.
    pub fn add_repo(&mut self, name: &str, priority: i32) -> RepoId {
        let id = RepoId::new(self.repos.len());
        self.repos.push(PoolRepo {
            name: name.to_owned(),
            priority,
            ids: Vec::new(),
        });
        id
    }

    /// Resolves a repo id.
    pub fn repo(&self, id: RepoId) -> &PoolRepo {
        &self.repos[id.index()]
    }

    /// Finds a repo by name.
    pub fn find_repo(&self, name: &str) -> Option<RepoId> {
        self.repos
            .iter()
            .position(|r| r.name == name)
            .map(RepoId::new)
    }

    /// All registered repo ids.
    pub fn repo_ids(&self) -> impl Iterator<Item = RepoId> {
        (0..self.repos.len()).map(RepoId::new)
    }

    /// Updates a repo priority.
    pub fn set_repo_priority(&mut self, id: RepoId, priority: i32) {
        self.repos[id.index()].priority = priority;
    }

    /// Marks a repo as the installed system repo.
    pub fn set_installed_repo(&mut self, id: RepoId) {
        self.installed = Some(id);
    }

    /// The installed system repo, when one was loaded.
    pub fn installed_repo(&self) -> Option<RepoId> {
        self.installed
    }

    /// Whether a solvable comes from the installed repo.
    pub fn is_installed(&self, id: SolvableId) -> bool {
        self.installed.is_some() && self.solvables[id.index()].repo == self.installed
    }

    /// Appends a solvable to `repo`.
    pub fn add_solvable(&mut self, repo: RepoId, mut solvable: Solvable) -> SolvableId {
        let id = SolvableId::new(self.solvables.len());
        solvable.repo = Some(repo);
        self.solvables.push(solvable);
        self.repos[repo.index()].ids.push(id);
        self.provides_ready = false;
        id
    }

    /// Resolves a solvable id.
    pub fn solvable(&self, id: SolvableId) -> &Solvable {
        &self.solvables[id.index()]
    }

    /// Appends file entries to a solvable (filelists extension); invalidates
    /// the provides index.
    pub fn add_solvable_files(&mut self, id: SolvableId, files: impl IntoIterator<Item = StringId>) {
        self.solvables[id.index()].files.extend(files);
        self.provides_ready = false;
    }

    /// Renders `name-[epoch:]version-release.arch` for diagnostics and problem
    /// strings.
    pub fn solvable_str(&self, id: SolvableId) -> String {
        let solvable = self.solvable(id);
        format!(
            "{}-{}.{}",
            self.str_of(solvable.name),
            self.str_of(solvable.evr),
            self.str_of(solvable.arch)
        )
    }

    // --- visibility -------------------------------------------------------

    /// Installs the considered bitmap; `None` makes every solvable visible.
    pub fn set_considered(&mut self, considered: Option<Map>) {
        self.considered = considered;
        // the provides index only lists visible solvables
        self.provides_ready = false;
    }

    /// The considered bitmap, when one is installed.
    pub fn considered(&self) -> Option<&Map> {
        self.considered.as_ref()
    }

    /// Whether a solvable is currently visible.
    pub fn is_visible(&self, id: SolvableId) -> bool {
        match &self.considered {
            Some(map) => map.contains(id),
            None => true,
        }
    }

    // --- provides index ---------------------------------------------------

    /// (Re)builds the "who provides" index if needed. Idempotent.
    pub fn make_provides_ready(&mut self) {
        if self.provides_ready {
            return;
        }
        self.whatprovides.clear();
        self.whatprovides_files.clear();
        self.packages_by_name.clear();
        for raw in 2..self.solvables.len() as u32 {
            let id = SolvableId::from_raw(raw);
            let solvable = &self.solvables[id.index()];
            self.packages_by_name
                .entry(solvable.name)
                .or_default()
                .push(id);
            if !self.is_visible(id) {
                continue;
            }
            for &dep in &solvable.provides {
                let name = self.reldeps[dep.index()].name;
                let entry = self.whatprovides.entry(name).or_default();
                if entry.last() != Some(&id) {
                    entry.push(id);
                }
            }
            for &file in &solvable.files {
                let entry = self.whatprovides_files.entry(file).or_default();
                if entry.last() != Some(&id) {
                    entry.push(id);
                }
            }
        }
        self.provides_ready = true;
    }

    /// Whether the provides index is current.
    pub fn provides_ready(&self) -> bool {
        self.provides_ready
    }

    /// All solvables sharing a name, visible or not.
    pub fn packages_by_name(&self, name: StringId) -> &[SolvableId] {
        debug_assert!(self.provides_ready);
        self.packages_by_name
            .get(&name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Visible solvables with a provide of the given capability name.
    pub fn whatprovides_name(&self, name: StringId) -> &[SolvableId] {
        debug_assert!(self.provides_ready);
        self.whatprovides
            .get(&name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Visible solvables satisfying a relation: provide-range overlap for
    /// capability deps, ownership for `/path` deps. Rich deps match nothing.
    pub fn providers_of_dep(&self, dep: ReldepId) -> Vec<SolvableId> {
        let reldep = *self.reldep(dep);
        if reldep.is_rich() {
            return Vec::new();
        }
        let name_str = self.str_of(reldep.name);
        if name_str.starts_with('/') {
            let mut owners: Vec<SolvableId> = self
                .whatprovides_files
                .get(&reldep.name)
                .cloned()
                .unwrap_or_default();
            // some packages provide file paths explicitly
            for &id in self.whatprovides_name(reldep.name) {
                if !owners.contains(&id) {
                    owners.push(id);
                }
            }
            owners.sort_unstable();
            return owners;
        }
        self.whatprovides_name(reldep.name)
            .iter()
            .copied()
            .filter(|&id| self.solvable_matches_dep(id, dep))
            .collect()
    }

    /// Whether two interned relations overlap (share a satisfying version).
    pub fn deps_match(&self, a: ReldepId, b: ReldepId) -> bool {
        self.deps_overlap(*self.reldep(a), *self.reldep(b))
    }

    /// Whether one of the solvable's provides satisfies the relation.
    pub fn solvable_matches_dep(&self, id: SolvableId, dep: ReldepId) -> bool {
        let want = self.reldep(dep);
        if want.is_rich() {
            return false;
        }
        self.solvable(id)
            .provides
            .iter()
            .any(|&prov| self.deps_overlap(*self.reldep(prov), *want))
    }

    /// Whether a solvable's obsoletes cover the given package name and EVR.
    /// Obsoletes match package names, never provides.
    pub fn obsoletes_covers(&self, by: SolvableId, name: StringId, evr: StringId) -> bool {
        self.solvable(by).obsoletes.iter().any(|&dep| {
            let reldep = self.reldep(dep);
            if reldep.name != name || reldep.is_rich() {
                return false;
            }
            if !reldep.is_versioned() {
                return true;
            }
            self.deps_overlap(
                Reldep {
                    name,
                    flags: DepFlags::EQ,
                    evr,
                },
                *reldep,
            )
        })
    }

    /// The rpm range-overlap relation between a provide and a requirement.
    fn deps_overlap(&self, prov: Reldep, want: Reldep) -> bool {
        if prov.name != want.name || prov.is_rich() || want.is_rich() {
            return false;
        }
        if !prov.is_versioned() || !want.is_versioned() {
            return true;
        }
        let sense = self.evrcmp_match(prov.evr, want.evr);
        match sense {
            Ordering::Less => {
                prov.flags.contains(DepFlags::GT) || want.flags.contains(DepFlags::LT)
            }
            Ordering::Greater => {
                prov.flags.contains(DepFlags::LT) || want.flags.contains(DepFlags::GT)
            }
            Ordering::Equal => {
                (prov.flags.contains(DepFlags::EQ) && want.flags.contains(DepFlags::EQ))
                    || (prov.flags.contains(DepFlags::LT) && want.flags.contains(DepFlags::LT))
                    || (prov.flags.contains(DepFlags::GT) && want.flags.contains(DepFlags::GT))
            }
        }
    }

    /// EVR comparison on interned strings.
    pub fn evrcmp(&self, a: StringId, b: StringId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        compare_evr(self.str_of(a), self.str_of(b))
    }

    /// EVR comparison for dependency matching: the release is only compared
    /// when both sides carry one, so `foo = 2` matches a provide of `foo = 2-5`.
    pub fn evrcmp_match(&self, a: StringId, b: StringId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let ea = Evr::parse(self.str_of(a));
        let eb = Evr::parse(self.str_of(b));
        let base = ea
            .epoch
            .cmp(&eb.epoch)
            .then_with(|| kestrel_rpm_types::vercmp(&ea.version, &eb.version));
        if base != Ordering::Equal || ea.release.is_empty() || eb.release.is_empty() {
            return base;
        }
        kestrel_rpm_types::vercmp(&ea.release, &eb.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(pool: &mut Pool, repo: RepoId, name: &str, evr: &str, arch: &str) -> SolvableId {
        let mut solvable = Solvable::placeholder();
        solvable.name = pool.intern_str(name);
        solvable.evr = pool.intern_str(evr);
        solvable.arch = pool.intern_str(arch);
        let self_provide = format!("{name} = {evr}");
        let dep = pool.parse_dep(&self_provide);
        solvable.provides.push(dep);
        pool.add_solvable(repo, solvable)
    }

    #[test]
    fn interning_is_stable() {
        let mut pool = Pool::new();
        let a = pool.intern_str("walrus");
        let b = pool.intern_str("walrus");
        assert_eq!(a, b);
        assert_eq!(pool.str_of(a), "walrus");
        assert_eq!(pool.find_str("nope"), None);
    }

    #[test]
    fn repo_ids_are_ascending() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("main", 0);
        let a = minimal(&mut pool, repo, "a", "1-1", "noarch");
        let b = minimal(&mut pool, repo, "b", "1-1", "noarch");
        let ids: Vec<_> = pool.repo(repo).solvables().collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn parse_dep_forms() {
        let mut pool = Pool::new();
        let bare = pool.parse_dep("walrus");
        assert!(!pool.reldep(bare).is_versioned());

        let versioned = pool.parse_dep("walrus >= 2-5");
        let reldep = *pool.reldep(versioned);
        assert_eq!(reldep.flags, DepFlags::GT | DepFlags::EQ);
        assert_eq!(pool.dep_to_string(versioned), "walrus >= 2-5");

        let rich = pool.parse_dep("(a if b)");
        assert!(pool.reldep(rich).is_rich());
    }

    #[test]
    fn providers_respect_version_ranges() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("main", 0);
        let old = minimal(&mut pool, repo, "semolina", "1-0", "i686");
        let new = minimal(&mut pool, repo, "semolina", "2-0", "i686");
        pool.make_provides_ready();

        let any = pool.parse_dep("semolina");
        assert_eq!(pool.providers_of_dep(any), vec![old, new]);

        let ge2 = pool.parse_dep("semolina >= 2");
        assert_eq!(pool.providers_of_dep(ge2), vec![new]);

        let lt2 = pool.parse_dep("semolina < 2");
        assert_eq!(pool.providers_of_dep(lt2), vec![old]);
    }

    #[test]
    fn file_deps_match_owners() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("main", 0);
        let owner = minimal(&mut pool, repo, "coreutils", "9-1", "x86_64");
        let path = pool.intern_str("/usr/bin/env");
        pool.add_solvable_files(owner, [path]);
        pool.make_provides_ready();

        let dep = pool.parse_dep("/usr/bin/env");
        assert_eq!(pool.providers_of_dep(dep), vec![owner]);
    }

    #[test]
    fn considered_hides_providers() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("main", 0);
        let id = minimal(&mut pool, repo, "walrus", "2-5", "noarch");
        let mut considered = Map::new(pool.nsolvables());
        pool.set_considered(Some(considered.clone()));
        let dep = pool.parse_dep("walrus");
        pool.make_provides_ready();
        assert!(pool.providers_of_dep(dep).is_empty());

        considered.grow(pool.nsolvables());
        considered.set(id);
        pool.set_considered(Some(considered));
        pool.make_provides_ready();
        assert_eq!(pool.providers_of_dep(dep), vec![id]);
    }
}
