use std::cmp::Ordering;

use glob::{MatchOptions, Pattern};
use kestrel_history::History;
use kestrel_rpm_types::{compare_evr, is_arch_compatible, vercmp, Evr, Nevra};
use kestrel_solve::{
    Job, JobFlags, JobTarget, Map, Pool, ReldepId, SolvableId, Solver, SolverFlags,
};

use crate::advisory::{advisory_applicable, applicable_packages};
use crate::errors::{Error, Result};
use crate::package::Package;
use crate::package_set::PackageSet;
use crate::sack::Sack;

bitflags::bitflags! {
    /// Comparison flags of a filter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CmpFlags: u32 {
        /// Exact (or version-equal) match.
        const EQ = 1 << 0;
        /// Version greater than the pattern.
        const GT = 1 << 1;
        /// Version lower than the pattern.
        const LT = 1 << 2;
        /// Substring match.
        const SUBSTR = 1 << 3;
        /// Shell glob match.
        const GLOB = 1 << 4;
        /// Case-insensitive match.
        const ICASE = 1 << 5;
        /// Invert: remove matches from the result instead of keeping them.
        const NOT = 1 << 6;
    }
}

bitflags::bitflags! {
    /// How a query treats the exclude overlays.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueryFlags: u32 {
        /// Ignore every exclude overlay.
        const IGNORE_EXCLUDES = 1 << 0;
        /// Ignore package/repo excludes and includes, keep modular excludes.
        const IGNORE_REGULAR_EXCLUDES = 1 << 1;
        /// Ignore modular excludes, keep the rest.
        const IGNORE_MODULAR_EXCLUDES = 1 << 2;
    }
}

/// The attribute or derived predicate a filter matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    /// Concrete package set.
    Pkg,
    /// Always-empty predicate, zeroes the result.
    Empty,
    /// Package name.
    Name,
    /// Epoch.
    Epoch,
    /// Upstream version.
    Version,
    /// Release.
    Release,
    /// Full EVR.
    Evr,
    /// Architecture.
    Arch,
    /// Rendered NEVRA, lenient (glob allowed, both epoch forms).
    Nevra,
    /// Exact NEVRA, parsed once.
    NevraStrict,
    /// Source rpm file name.
    Sourcerpm,
    /// Payload location.
    Location,
    /// One-line summary.
    Summary,
    /// Long description.
    Description,
    /// Upstream URL.
    Url,
    /// Provides relations.
    Provides,
    /// Requires relations.
    Requires,
    /// Conflicts relations.
    Conflicts,
    /// Obsoletes relations (or obsoleting a package set).
    Obsoletes,
    /// Recommends relations.
    Recommends,
    /// Suggests relations.
    Suggests,
    /// Supplements relations.
    Supplements,
    /// Enhances relations.
    Enhances,
    /// Owned file path.
    File,
    /// Repository name.
    Reponame,
    /// Top versions per name.
    Latest,
    /// Top versions per name and arch.
    LatestPerArch,
    /// Installed packages with a newer available candidate.
    Upgradable,
    /// Installed packages with an older available candidate.
    Downgradable,
    /// Available packages upgrading something installed.
    Upgrades,
    /// Available packages downgrading something installed.
    Downgrades,
    /// Upgrades restricted to the best-priority repo per name.
    UpgradesByPriority,
    /// Obsoleters restricted to the best-priority repo per name.
    ObsoletesByPriority,
    /// Packages listed by advisories matching an id.
    Advisory,
    /// Packages listed by advisories referencing a bug.
    AdvisoryBug,
    /// Packages listed by advisories referencing a CVE.
    AdvisoryCve,
    /// Packages listed by advisories of a type.
    AdvisoryType,
    /// Packages listed by advisories of a severity.
    AdvisorySeverity,
}

/// The homogeneous match payload of a filter.
#[derive(Debug, Clone)]
pub enum FilterMatch {
    /// Integer matches.
    Num(Vec<i64>),
    /// String matches.
    Str(Vec<String>),
    /// A package set match.
    Pkg(PackageSet),
    /// Interned relation matches.
    Reldep(Vec<ReldepId>),
}

#[derive(Debug, Clone)]
struct Filter {
    key: QueryKey,
    cmp: CmpFlags,
    matches: FilterMatch,
}

/// A composable filter pipeline over a sack.
///
/// Filters accumulate until [`Query::apply`] materialises the result;
/// afterwards new filters re-open the pipeline and refine the existing result
/// set on the next apply.
pub struct Query<'a> {
    sack: &'a Sack,
    flags: QueryFlags,
    filters: Vec<Filter>,
    result: Option<Map>,
    applied: bool,
}

impl Clone for Query<'_> {
    fn clone(&self) -> Self {
        Self {
            sack: self.sack,
            flags: self.flags,
            filters: self.filters.clone(),
            result: self.result.clone(),
            applied: self.applied,
        }
    }
}

impl<'a> Query<'a> {
    /// A query over everything visible in the sack.
    pub fn new(sack: &'a Sack) -> Self {
        Self::with_flags(sack, QueryFlags::empty())
    }

    /// A query with explicit exclude handling.
    pub fn with_flags(sack: &'a Sack, flags: QueryFlags) -> Self {
        Self {
            sack,
            flags,
            filters: Vec::new(),
            result: None,
            applied: false,
        }
    }

    /// The owning sack.
    pub fn sack(&self) -> &'a Sack {
        self.sack
    }

    /// Adds one filter. Returns `BadQuery` when the key, comparison and match
    /// type do not form a valid triple.
    pub fn add_filter(
        &mut self,
        key: QueryKey,
        cmp: CmpFlags,
        matches: FilterMatch,
    ) -> Result<()> {
        validate_filter(key, cmp, &matches)?;
        let matches = self.preprocess(key, matches);
        self.filters.push(Filter { key, cmp, matches });
        self.applied = false;
        Ok(())
    }

    /// Adds a string filter.
    pub fn filter_str(&mut self, key: QueryKey, cmp: CmpFlags, matches: &[&str]) -> Result<()> {
        self.add_filter(
            key,
            cmp,
            FilterMatch::Str(matches.iter().map(|s| (*s).to_owned()).collect()),
        )
    }

    /// Adds an integer filter.
    pub fn filter_num(&mut self, key: QueryKey, cmp: CmpFlags, matches: &[i64]) -> Result<()> {
        self.add_filter(key, cmp, FilterMatch::Num(matches.to_vec()))
    }

    /// Adds a package-set filter.
    pub fn filter_pkg_set(
        &mut self,
        key: QueryKey,
        cmp: CmpFlags,
        set: &PackageSet,
    ) -> Result<()> {
        self.add_filter(key, cmp, FilterMatch::Pkg(set.clone()))
    }

    /// Adds an interned-relation filter.
    pub fn filter_reldeps(
        &mut self,
        key: QueryKey,
        cmp: CmpFlags,
        matches: &[ReldepId],
    ) -> Result<()> {
        self.add_filter(key, cmp, FilterMatch::Reldep(matches.to_vec()))
    }

    /// Keeps the top `n` versions per name (`n < 0` drops them instead).
    pub fn filter_latest(&mut self, n: i64) -> Result<()> {
        self.filter_num(QueryKey::Latest, CmpFlags::EQ, &[n])
    }

    /// Keeps the top `n` versions per name and arch.
    pub fn filter_latest_per_arch(&mut self, n: i64) -> Result<()> {
        self.filter_num(QueryKey::LatestPerArch, CmpFlags::EQ, &[n])
    }

    // strings without glob characters carry full `name op evr` semantics and
    // are interned up front; glob patterns stay strings and match dep names
    fn preprocess(&self, key: QueryKey, matches: FilterMatch) -> FilterMatch {
        if !is_dep_key(key) {
            return matches;
        }
        match matches {
            FilterMatch::Str(patterns) if !patterns.iter().any(|p| is_glob(p)) => {
                FilterMatch::Reldep(
                    patterns
                        .iter()
                        .map(|p| self.sack.intern_dep(p))
                        .collect(),
                )
            }
            other => other,
        }
    }

    /// Materialises the result. Idempotent; filters are consumed.
    pub fn apply(&mut self) {
        if self.applied && self.filters.is_empty() {
            return;
        }
        self.sack.make_provides_ready();
        let initial = match self.result.take() {
            Some(map) => map,
            None => self.initial_map(),
        };
        let filters = std::mem::take(&mut self.filters);
        let pool = self.sack.pool();
        let mut result = initial;
        for filter in &filters {
            let matched = self.eval(&pool, &result, filter);
            if filter.cmp.contains(CmpFlags::NOT) {
                result.subtract(&matched);
            } else {
                result.intersect_with(&matched);
            }
        }
        drop(pool);
        self.result = Some(result);
        self.applied = true;
    }

    fn initial_map(&self) -> Map {
        let ignore_regular = self
            .flags
            .intersects(QueryFlags::IGNORE_EXCLUDES | QueryFlags::IGNORE_REGULAR_EXCLUDES);
        let ignore_modular = self
            .flags
            .intersects(QueryFlags::IGNORE_EXCLUDES | QueryFlags::IGNORE_MODULAR_EXCLUDES);
        self.sack.visibility_map(ignore_regular, ignore_modular)
    }

    /// The matching packages.
    pub fn run(&mut self) -> Vec<Package<'a>> {
        self.apply();
        let sack = self.sack;
        self.result
            .as_ref()
            .map(|map| map.iter().map(|id| Package::new(sack, id)).collect())
            .unwrap_or_default()
    }

    /// The matching packages as a set.
    pub fn run_set(&mut self) -> PackageSet {
        self.apply();
        self.result
            .clone()
            .map(PackageSet::from_map)
            .unwrap_or_default()
    }

    /// The number of matching packages.
    pub fn size(&mut self) -> usize {
        self.apply();
        self.result.as_ref().map(Map::count).unwrap_or(0)
    }

    /// Whether nothing matches.
    pub fn is_empty(&mut self) -> bool {
        self.size() == 0
    }

    /// The `idx`-th matching package in id order.
    pub fn get(&mut self, idx: usize) -> Option<Package<'a>> {
        self.apply();
        let sack = self.sack;
        self.result
            .as_ref()
            .and_then(|map| map.iter().nth(idx))
            .map(|id| Package::new(sack, id))
    }

    /// `self ∪ other`; both queries must belong to the same sack.
    pub fn union(&mut self, other: &mut Query<'a>) -> Result<()> {
        self.check_same_sack(other)?;
        self.apply();
        other.apply();
        if let (Some(a), Some(b)) = (self.result.as_mut(), other.result.as_ref()) {
            a.union_with(b);
        }
        Ok(())
    }

    /// `self ∩ other`; both queries must belong to the same sack.
    pub fn intersection(&mut self, other: &mut Query<'a>) -> Result<()> {
        self.check_same_sack(other)?;
        self.apply();
        other.apply();
        if let (Some(a), Some(b)) = (self.result.as_mut(), other.result.as_ref()) {
            a.intersect_with(b);
        }
        Ok(())
    }

    /// `self ∖ other`; both queries must belong to the same sack.
    pub fn difference(&mut self, other: &mut Query<'a>) -> Result<()> {
        self.check_same_sack(other)?;
        self.apply();
        other.apply();
        if let (Some(a), Some(b)) = (self.result.as_mut(), other.result.as_ref()) {
            a.subtract(b);
        }
        Ok(())
    }

    fn check_same_sack(&self, other: &Query<'a>) -> Result<()> {
        if std::ptr::eq(self.sack, other.sack) {
            Ok(())
        } else {
            Err(Error::BadQuery(
                "set operations need queries over the same sack".into(),
            ))
        }
    }

    // --- derived filters ---------------------------------------------------

    /// Keeps installed packages without an available counterpart of equal
    /// `(name, arch)`.
    pub fn filter_extras(&mut self) {
        self.apply();
        let pool = self.sack.pool();
        let Some(result) = self.result.as_mut() else {
            return;
        };
        let mut keep = Map::new(pool.nsolvables());
        for id in result.iter() {
            if !pool.is_installed(id) {
                continue;
            }
            let solvable = pool.solvable(id);
            let counterpart = pool
                .packages_by_name(solvable.name)
                .iter()
                .any(|&other| {
                    !pool.is_installed(other)
                        && pool.is_visible(other)
                        && pool.solvable(other).arch == solvable.arch
                });
            if !counterpart {
                keep.set(id);
            }
        }
        result.intersect_with(&keep);
    }

    /// Keeps packages built after the cutoff.
    pub fn filter_recent(&mut self, cutoff: i64) {
        self.apply();
        let pool = self.sack.pool();
        let Some(result) = self.result.as_mut() else {
            return;
        };
        let mut keep = Map::new(pool.nsolvables());
        for id in result.iter() {
            if pool.solvable(id).buildtime > cutoff {
                keep.set(id);
            }
        }
        result.intersect_with(&keep);
    }

    /// Keeps installed packages sharing a name with another installed package
    /// of a different EVR.
    pub fn filter_duplicated(&mut self) {
        self.apply();
        let pool = self.sack.pool();
        let Some(result) = self.result.as_mut() else {
            return;
        };
        let installed: Vec<SolvableId> = result
            .iter()
            .filter(|&id| pool.is_installed(id))
            .collect();
        let mut keep = Map::new(pool.nsolvables());
        for &id in &installed {
            let solvable = pool.solvable(id);
            let duplicated = installed.iter().any(|&other| {
                other != id
                    && pool.solvable(other).name == solvable.name
                    && pool.solvable(other).evr != solvable.evr
            });
            if duplicated {
                keep.set(id);
            }
        }
        result.intersect_with(&keep);
    }

    /// Keeps installed packages that no user-installed package needs.
    pub fn filter_unneeded(&mut self, history: &History) -> Result<()> {
        self.filter_unneeded_or_safe_to_remove(history, false)
    }

    /// Like [`Query::filter_unneeded`], but packages in the current result do
    /// not count as user-installed roots, so removing the result set is safe.
    pub fn filter_safe_to_remove(&mut self, history: &History) -> Result<()> {
        self.filter_unneeded_or_safe_to_remove(history, true)
    }

    fn filter_unneeded_or_safe_to_remove(
        &mut self,
        history: &History,
        safe_to_remove: bool,
    ) -> Result<()> {
        self.apply();
        let mut user_installed = user_installed_ids(self.sack, history)?;
        if safe_to_remove {
            if let Some(result) = &self.result {
                user_installed.retain(|id| !result.contains(*id));
            }
        }
        let unneeded = compute_unneeded(self.sack, user_installed)?;
        let pool = self.sack.pool();
        let mut keep = Map::new(pool.nsolvables());
        for id in unneeded {
            keep.set(id);
        }
        drop(pool);
        if let Some(result) = self.result.as_mut() {
            result.intersect_with(&keep);
        }
        Ok(())
    }

    // --- evaluation --------------------------------------------------------

    fn eval(&self, pool: &Pool, result: &Map, filter: &Filter) -> Map {
        let mut m = Map::new(pool.nsolvables());
        match filter.key {
            QueryKey::Empty => {}
            QueryKey::Pkg => {
                if let FilterMatch::Pkg(set) = &filter.matches {
                    let mut map = set.as_map().clone();
                    map.grow(pool.nsolvables());
                    m = map;
                }
            }
            QueryKey::Name => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).name).to_owned()
                });
            }
            QueryKey::Arch => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).arch).to_owned()
                });
            }
            QueryKey::Sourcerpm => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).sourcerpm).to_owned()
                });
            }
            QueryKey::Location => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).location).to_owned()
                });
            }
            QueryKey::Summary => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).summary).to_owned()
                });
            }
            QueryKey::Description => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).description).to_owned()
                });
            }
            QueryKey::Url => {
                self.eval_str_attr(pool, result, filter, &mut m, |pool, id| {
                    pool.str_of(pool.solvable(id).url).to_owned()
                });
            }
            QueryKey::Epoch => self.eval_epoch(pool, result, filter, &mut m),
            QueryKey::Version => self.eval_version_part(pool, result, filter, &mut m, 0),
            QueryKey::Release => self.eval_version_part(pool, result, filter, &mut m, 1),
            QueryKey::Evr => self.eval_evr(pool, result, filter, &mut m),
            QueryKey::Nevra => self.eval_nevra(pool, result, filter, &mut m),
            QueryKey::NevraStrict => self.eval_nevra_strict(pool, result, filter, &mut m),
            QueryKey::File => self.eval_file(pool, result, filter, &mut m),
            QueryKey::Reponame => self.eval_reponame(pool, result, filter, &mut m),
            QueryKey::Provides
            | QueryKey::Requires
            | QueryKey::Conflicts
            | QueryKey::Obsoletes
            | QueryKey::Recommends
            | QueryKey::Suggests
            | QueryKey::Supplements
            | QueryKey::Enhances => self.eval_dep_key(pool, result, filter, &mut m),
            QueryKey::Latest => self.eval_latest(pool, result, filter, &mut m, false),
            QueryKey::LatestPerArch => self.eval_latest(pool, result, filter, &mut m, true),
            QueryKey::Upgradable => self.eval_updown_installed(pool, result, &mut m, true),
            QueryKey::Downgradable => self.eval_updown_installed(pool, result, &mut m, false),
            QueryKey::Upgrades => self.eval_updown_available(pool, result, &mut m, true, false),
            QueryKey::Downgrades => self.eval_updown_available(pool, result, &mut m, false, false),
            QueryKey::UpgradesByPriority => {
                self.eval_updown_available(pool, result, &mut m, true, true)
            }
            QueryKey::ObsoletesByPriority => {
                self.eval_obsoletes_pkg(pool, result, filter, &mut m, true)
            }
            QueryKey::Advisory
            | QueryKey::AdvisoryBug
            | QueryKey::AdvisoryCve
            | QueryKey::AdvisoryType
            | QueryKey::AdvisorySeverity => self.eval_advisory(pool, result, filter, &mut m),
        }
        m
    }

    fn eval_str_attr(
        &self,
        pool: &Pool,
        result: &Map,
        filter: &Filter,
        m: &mut Map,
        attr: impl Fn(&Pool, SolvableId) -> String,
    ) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            let value = attr(pool, id);
            if patterns
                .iter()
                .any(|pattern| str_match(&value, pattern, filter.cmp))
            {
                m.set(id);
            }
        }
    }

    fn eval_epoch(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Num(numbers) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            let epoch = Evr::parse(pool.str_of(pool.solvable(id).evr)).epoch as i64;
            if numbers
                .iter()
                .any(|&n| num_cmp_matches(epoch.cmp(&n), filter.cmp))
            {
                m.set(id);
            }
        }
    }

    // part 0 is the version, part 1 the release
    fn eval_version_part(
        &self,
        pool: &Pool,
        result: &Map,
        filter: &Filter,
        m: &mut Map,
        part: usize,
    ) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            let evr = Evr::parse(pool.str_of(pool.solvable(id).evr));
            let value = if part == 0 { &evr.version } else { &evr.release };
            let matched = patterns.iter().any(|pattern| {
                if filter.cmp.contains(CmpFlags::GLOB) {
                    glob_match(value, pattern, filter.cmp)
                } else {
                    num_cmp_matches(vercmp(value, pattern), filter.cmp)
                }
            });
            if matched {
                m.set(id);
            }
        }
    }

    fn eval_evr(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            let value = pool.str_of(pool.solvable(id).evr);
            let matched = patterns.iter().any(|pattern| {
                if filter.cmp.contains(CmpFlags::GLOB) {
                    glob_match(value, pattern, filter.cmp)
                } else {
                    num_cmp_matches(compare_evr(value, pattern), filter.cmp)
                }
            });
            if matched {
                m.set(id);
            }
        }
    }

    fn eval_nevra(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            let solvable = pool.solvable(id);
            let name = pool.str_of(solvable.name);
            let evr = Evr::parse(pool.str_of(solvable.evr));
            let arch = pool.str_of(solvable.arch);
            let nevra = Nevra::new(name, evr.epoch, evr.version.clone(), evr.release.clone(), arch);
            let plain = nevra.to_string();
            let forced = nevra.to_string_with_epoch();
            if patterns.iter().any(|pattern| {
                str_match(&plain, pattern, filter.cmp) || str_match(&forced, pattern, filter.cmp)
            }) {
                m.set(id);
            }
        }
    }

    fn eval_nevra_strict(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        let parsed: Vec<Nevra> = patterns
            .iter()
            .filter_map(|pattern| Nevra::parse(pattern).ok())
            .collect();
        for id in result.iter() {
            let solvable = pool.solvable(id);
            let name = pool.str_of(solvable.name);
            let arch = pool.str_of(solvable.arch);
            let evr = Evr::parse(pool.str_of(solvable.evr));
            if parsed.iter().any(|nevra| {
                nevra.name == name
                    && nevra.arch == arch
                    && nevra.epoch == evr.epoch
                    && nevra.version == evr.version
                    && nevra.release == evr.release
            }) {
                m.set(id);
            }
        }
    }

    fn eval_file(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        let patterns: Vec<&str> = patterns
            .iter()
            .map(|p| p.strip_suffix('/').unwrap_or(p))
            .collect();
        for id in result.iter() {
            let matched = pool.solvable(id).files.iter().any(|&file| {
                let path = pool.str_of(file);
                patterns
                    .iter()
                    .any(|pattern| str_match(path, pattern, filter.cmp))
            });
            if matched {
                m.set(id);
            }
        }
    }

    fn eval_reponame(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            let reponame = match pool.solvable(id).repo {
                Some(repo) => pool.repo(repo).name.as_str(),
                None => "",
            };
            if patterns.iter().any(|pattern| pattern == reponame) {
                m.set(id);
            }
        }
    }

    fn eval_dep_key(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        if filter.key == QueryKey::Obsoletes {
            if let FilterMatch::Pkg(_) = &filter.matches {
                self.eval_obsoletes_pkg(pool, result, filter, m, false);
                return;
            }
        }
        for id in result.iter() {
            let solvable = pool.solvable(id);
            let deps = match filter.key {
                QueryKey::Provides => &solvable.provides,
                QueryKey::Requires => &solvable.requires,
                QueryKey::Conflicts => &solvable.conflicts,
                QueryKey::Obsoletes => &solvable.obsoletes,
                QueryKey::Recommends => &solvable.recommends,
                QueryKey::Suggests => &solvable.suggests,
                QueryKey::Supplements => &solvable.supplements,
                QueryKey::Enhances => &solvable.enhances,
                _ => unreachable!("not a dependency key"),
            };
            let matched = match &filter.matches {
                FilterMatch::Reldep(wanted) => deps
                    .iter()
                    .any(|&dep| wanted.iter().any(|&want| pool.deps_match(dep, want))),
                FilterMatch::Str(patterns) => deps.iter().any(|&dep| {
                    let name = pool.str_of(pool.reldep(dep).name);
                    patterns
                        .iter()
                        .any(|pattern| glob_match(name, pattern, filter.cmp))
                }),
                _ => false,
            };
            if matched {
                m.set(id);
            }
        }
    }

    fn eval_obsoletes_pkg(
        &self,
        pool: &Pool,
        result: &Map,
        filter: &Filter,
        m: &mut Map,
        by_priority: bool,
    ) {
        let FilterMatch::Pkg(targets) = &filter.matches else {
            return;
        };
        for id in result.iter() {
            if by_priority && !self.best_priority_for_name(pool, id) {
                continue;
            }
            let covers = targets.ids().any(|target| {
                let solvable = pool.solvable(target);
                pool.obsoletes_covers(id, solvable.name, solvable.evr)
            });
            if covers {
                m.set(id);
            }
        }
    }

    fn eval_latest(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map, per_arch: bool) {
        let FilterMatch::Num(numbers) = &filter.matches else {
            return;
        };
        for &latest in numbers {
            if latest == 0 {
                continue;
            }
            let mut ids: Vec<SolvableId> = result.iter().collect();
            ids.sort_by(|&a, &b| {
                let sa = pool.solvable(a);
                let sb = pool.solvable(b);
                sa.name
                    .cmp(&sb.name)
                    .then_with(|| {
                        if per_arch {
                            sa.arch.cmp(&sb.arch)
                        } else {
                            Ordering::Equal
                        }
                    })
                    .then_with(|| pool.evrcmp(sb.evr, sa.evr))
                    .then_with(|| a.cmp(&b))
            });
            let mut start = 0;
            while start < ids.len() {
                let head = pool.solvable(ids[start]);
                let mut end = start + 1;
                while end < ids.len() {
                    let other = pool.solvable(ids[end]);
                    if other.name != head.name || (per_arch && other.arch != head.arch) {
                        break;
                    }
                    end += 1;
                }
                add_latest_block(pool, m, &ids[start..end], latest);
                start = end;
            }
        }
    }

    // keeps installed packages with a newer (or older) visible candidate
    fn eval_updown_installed(&self, pool: &Pool, result: &Map, m: &mut Map, up: bool) {
        for id in result.iter() {
            if !pool.is_installed(id) {
                continue;
            }
            let solvable = pool.solvable(id);
            let arch = pool.str_of(solvable.arch);
            let exists = pool.packages_by_name(solvable.name).iter().any(|&other| {
                !pool.is_installed(other)
                    && pool.is_visible(other)
                    && is_arch_compatible(pool.str_of(pool.solvable(other).arch), arch)
                    && matches_direction(pool.evrcmp(pool.solvable(other).evr, solvable.evr), up)
            });
            if exists {
                m.set(id);
            }
        }
    }

    // keeps available packages upgrading (or downgrading) something installed
    fn eval_updown_available(
        &self,
        pool: &Pool,
        result: &Map,
        m: &mut Map,
        up: bool,
        by_priority: bool,
    ) {
        if pool.installed_repo().is_none() {
            return;
        }
        for id in result.iter() {
            if pool.is_installed(id) {
                continue;
            }
            if by_priority && !self.best_priority_for_name(pool, id) {
                continue;
            }
            let solvable = pool.solvable(id);
            let arch = pool.str_of(solvable.arch);
            let applies = pool.packages_by_name(solvable.name).iter().any(|&other| {
                pool.is_installed(other)
                    && is_arch_compatible(pool.str_of(pool.solvable(other).arch), arch)
                    && matches_direction(pool.evrcmp(solvable.evr, pool.solvable(other).evr), up)
            });
            if applies {
                m.set(id);
            }
        }
    }

    // among the visible non-installed candidates of this package's name, is
    // this one from the best-priority repo? Ties break by ascending id, which
    // keeps both priority paths deterministic.
    fn best_priority_for_name(&self, pool: &Pool, id: SolvableId) -> bool {
        let name = pool.solvable(id).name;
        let best = pool
            .packages_by_name(name)
            .iter()
            .filter(|&&other| !pool.is_installed(other) && pool.is_visible(other))
            .filter_map(|&other| pool.solvable(other).repo)
            .map(|repo| pool.repo(repo).priority)
            .max();
        match (best, pool.solvable(id).repo) {
            (Some(best), Some(repo)) => pool.repo(repo).priority >= best,
            _ => true,
        }
    }

    fn eval_advisory(&self, pool: &Pool, result: &Map, filter: &Filter, m: &mut Map) {
        let FilterMatch::Str(patterns) = &filter.matches else {
            return;
        };
        let state = self.sack.state();
        let mut listed: Vec<kestrel_rpm_types::AdvisoryPackage> = Vec::new();
        for record in state.advisories.iter() {
            let matched = patterns.iter().any(|pattern| match filter.key {
                QueryKey::Advisory => glob_match(&record.id, pattern, filter.cmp),
                QueryKey::AdvisoryType => record.kind.as_str() == pattern,
                QueryKey::AdvisorySeverity => record.severity.eq_ignore_ascii_case(pattern),
                QueryKey::AdvisoryBug => record.references.iter().any(|r| {
                    r.kind == kestrel_rpm_types::AdvisoryReferenceKind::Bugzilla && &r.id == pattern
                }),
                QueryKey::AdvisoryCve => record.references.iter().any(|r| {
                    r.kind == kestrel_rpm_types::AdvisoryReferenceKind::Cve && &r.id == pattern
                }),
                _ => false,
            });
            if matched && advisory_applicable(self.sack, record) {
                listed.extend(applicable_packages(self.sack, record));
            }
        }
        drop(state);
        if listed.is_empty() {
            return;
        }
        // EQ keeps packages at the advisory-listed EVR; GT/LT compare the
        // package EVR against the listed one
        let cmp = if filter.cmp.intersects(CmpFlags::GT | CmpFlags::LT) {
            filter.cmp
        } else {
            filter.cmp | CmpFlags::EQ
        };
        for id in result.iter() {
            let solvable = pool.solvable(id);
            let name = pool.str_of(solvable.name);
            let arch = pool.str_of(solvable.arch);
            let evr = pool.str_of(solvable.evr);
            let matched = listed.iter().any(|pkg| {
                pkg.name == name
                    && pkg.arch == arch
                    && num_cmp_matches(compare_evr(evr, &pkg.evr), cmp)
            });
            if matched {
                m.set(id);
            }
        }
    }
}

fn add_latest_block(pool: &Pool, m: &mut Map, block: &[SolvableId], latest: i64) {
    let mut version_counter: i64 = 0;
    let mut previous_evr = pool.solvable(block[0]).evr;
    for &id in block {
        let evr = pool.solvable(id).evr;
        if evr != previous_evr {
            version_counter += 1;
            previous_evr = evr;
        }
        if latest > 0 {
            if version_counter >= latest {
                return;
            }
        } else if version_counter < -latest {
            continue;
        }
        m.set(id);
    }
}

fn matches_direction(ord: Ordering, up: bool) -> bool {
    if up {
        ord == Ordering::Greater
    } else {
        ord == Ordering::Less
    }
}

fn num_cmp_matches(ord: Ordering, cmp: CmpFlags) -> bool {
    (cmp.contains(CmpFlags::EQ) && ord == Ordering::Equal)
        || (cmp.contains(CmpFlags::GT) && ord == Ordering::Greater)
        || (cmp.contains(CmpFlags::LT) && ord == Ordering::Less)
}

fn str_match(value: &str, pattern: &str, cmp: CmpFlags) -> bool {
    if cmp.contains(CmpFlags::GLOB) {
        glob_match(value, pattern, cmp)
    } else if cmp.contains(CmpFlags::SUBSTR) {
        if cmp.contains(CmpFlags::ICASE) {
            value.to_lowercase().contains(&pattern.to_lowercase())
        } else {
            value.contains(pattern)
        }
    } else if cmp.contains(CmpFlags::ICASE) {
        value.eq_ignore_ascii_case(pattern)
    } else {
        value == pattern
    }
}

fn glob_match(value: &str, pattern: &str, cmp: CmpFlags) -> bool {
    if !is_glob(pattern) && !cmp.contains(CmpFlags::GLOB) {
        return value == pattern;
    }
    match Pattern::new(pattern) {
        Ok(pattern) => pattern.matches_with(
            value,
            MatchOptions {
                case_sensitive: !cmp.contains(CmpFlags::ICASE),
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        ),
        Err(_) => false,
    }
}

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn is_dep_key(key: QueryKey) -> bool {
    matches!(
        key,
        QueryKey::Provides
            | QueryKey::Requires
            | QueryKey::Conflicts
            | QueryKey::Obsoletes
            | QueryKey::Recommends
            | QueryKey::Suggests
            | QueryKey::Supplements
            | QueryKey::Enhances
    )
}

fn validate_filter(key: QueryKey, cmp: CmpFlags, matches: &FilterMatch) -> Result<()> {
    let bad = |why: &str| Err(Error::BadQuery(format!("{why} (key {key:?})")));
    let relational = CmpFlags::GT | CmpFlags::LT;
    match key {
        QueryKey::Pkg => {
            if !matches!(matches, FilterMatch::Pkg(_)) {
                return bad("expects a package set");
            }
        }
        QueryKey::Empty => {}
        QueryKey::Name
        | QueryKey::Arch
        | QueryKey::Nevra
        | QueryKey::Summary
        | QueryKey::Description
        | QueryKey::Url
        | QueryKey::File => {
            if !matches!(matches, FilterMatch::Str(_)) {
                return bad("expects strings");
            }
            if cmp.intersects(relational) {
                return bad("does not support ordered comparison");
            }
        }
        QueryKey::Version | QueryKey::Release | QueryKey::Evr => {
            if !matches!(matches, FilterMatch::Str(_)) {
                return bad("expects strings");
            }
        }
        QueryKey::Sourcerpm | QueryKey::Location | QueryKey::NevraStrict => {
            if !matches!(matches, FilterMatch::Str(_)) {
                return bad("expects strings");
            }
            if cmp != CmpFlags::EQ {
                return bad("accepts only exact matches");
            }
        }
        QueryKey::Reponame => {
            if !matches!(matches, FilterMatch::Str(_)) {
                return bad("expects strings");
            }
            if !(cmp == CmpFlags::EQ || cmp == CmpFlags::EQ | CmpFlags::NOT) {
                return bad("accepts only exact matches");
            }
        }
        QueryKey::Epoch
        | QueryKey::Latest
        | QueryKey::LatestPerArch
        | QueryKey::Upgradable
        | QueryKey::Downgradable
        | QueryKey::Upgrades
        | QueryKey::Downgrades
        | QueryKey::UpgradesByPriority => {
            if !matches!(matches, FilterMatch::Num(_)) {
                return bad("expects numbers");
            }
        }
        QueryKey::Provides
        | QueryKey::Requires
        | QueryKey::Conflicts
        | QueryKey::Recommends
        | QueryKey::Suggests
        | QueryKey::Supplements
        | QueryKey::Enhances => {
            if !matches!(matches, FilterMatch::Str(_) | FilterMatch::Reldep(_)) {
                return bad("expects relations or strings");
            }
        }
        QueryKey::Obsoletes | QueryKey::ObsoletesByPriority => {
            if !matches!(
                matches,
                FilterMatch::Str(_) | FilterMatch::Reldep(_) | FilterMatch::Pkg(_)
            ) {
                return bad("expects relations, strings or a package set");
            }
        }
        QueryKey::Advisory
        | QueryKey::AdvisoryBug
        | QueryKey::AdvisoryCve
        | QueryKey::AdvisoryType
        | QueryKey::AdvisorySeverity => {
            if !matches!(matches, FilterMatch::Str(_)) {
                return bad("expects strings");
            }
        }
    }
    Ok(())
}

/// Installed ids whose most recent history reason is `User`.
pub(crate) fn user_installed_ids(sack: &Sack, history: &History) -> Result<Vec<SolvableId>> {
    sack.make_provides_ready();
    let pool = sack.pool();
    let Some(repo) = pool.installed_repo() else {
        return Ok(Vec::new());
    };
    let mut ids = Vec::new();
    for id in pool.repo(repo).solvables() {
        let solvable = pool.solvable(id);
        let name = pool.str_of(solvable.name);
        let arch = pool.str_of(solvable.arch);
        if history.user_installed(name, arch)? {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Runs a throwaway resolution marking `user_installed` as the roots and
/// returns the installed packages nothing reachable needs.
pub(crate) fn compute_unneeded(
    sack: &Sack,
    user_installed: Vec<SolvableId>,
) -> Result<Vec<SolvableId>> {
    sack.make_provides_ready();
    let pool = sack.pool();
    let mut solver = Solver::new(&pool, SolverFlags::default());
    let jobs = vec![Job::new(
        JobFlags::USERINSTALLED,
        JobTarget::OneOf(user_installed),
    )];
    if solver.solve(&jobs) > 0 {
        return Err(Error::Internal(
            "unneeded computation failed to resolve".into(),
        ));
    }
    Ok(solver.unneeded())
}
