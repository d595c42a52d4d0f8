//! The dependency resolver.
//!
//! A deterministic, rule-driven resolver over the pool: jobs come in, a plan or
//! a list of typed problems comes out. Decisions carry the reason they were
//! made, the cleandeps and unneeded sets are exposed for the goal layer, and
//! every choice point follows one fixed candidate policy so identical inputs
//! produce identical plans.

use std::cmp::Ordering;

use ahash::AHashMap;
use tracing::{debug, trace};

use crate::id::{ReldepId, SolvableId, StringId};
use crate::jobs::{Job, JobFlags, JobTarget};
use crate::map::Map;
use crate::pool::Pool;
use crate::problem::{Problem, RuleInfo, RuleKind};
use crate::transaction::{Plan, PlanStep};
use kestrel_rpm_types::{is_arch_compatible, TransactionItemAction};

/// Behaviour switches of one solver run.
#[derive(Debug, Clone)]
pub struct SolverFlags {
    /// Replacements may change the package vendor.
    pub allow_vendor_change: bool,
    /// Updates may go to a lower EVR.
    pub allow_downgrade: bool,
    /// Installed packages may be removed to reach a solution even without an
    /// explicit erase job.
    pub allow_uninstall: bool,
    /// Do not pull in weak dependencies.
    pub ignore_recommended: bool,
    /// Installed packages without an available counterpart survive a
    /// distupgrade.
    pub keep_orphans: bool,
    /// Best candidates must respect arch and policy ordering.
    pub best_obey_policy: bool,
    /// Available packages may replace installed ones through their obsoletes.
    pub yum_obsoletes: bool,
}

impl Default for SolverFlags {
    fn default() -> Self {
        Self {
            allow_vendor_change: true,
            allow_downgrade: false,
            allow_uninstall: false,
            ignore_recommended: false,
            keep_orphans: true,
            best_obey_policy: true,
            yum_obsoletes: true,
        }
    }
}

/// Why the solver decided a solvable's fate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// An install/update job selected it.
    Job {
        /// Index of the job in the solved queue.
        index: usize,
    },
    /// An erase job removed it.
    JobErase {
        /// Index of the job in the solved queue.
        index: usize,
    },
    /// Pulled in to satisfy a hard dependency.
    Depend {
        /// The relation that needed satisfying.
        dep: ReldepId,
        /// The package that required it.
        required_by: SolvableId,
    },
    /// Pulled in to satisfy a weak dependency.
    WeakDep {
        /// The recommends relation.
        dep: ReldepId,
        /// The package that recommended it.
        required_by: SolvableId,
    },
    /// Installed as the update of an installed package.
    Update {
        /// The installed package this updates.
        replaces: SolvableId,
    },
    /// Removed because a newer (or targeted) same-name package replaced it.
    Replaced {
        /// The incoming package.
        by: SolvableId,
    },
    /// Removed because another package obsoletes it.
    Obsoleted {
        /// The obsoleting package.
        by: SolvableId,
    },
    /// Removed because a package it required went away.
    BrokenDependency {
        /// The unsatisfied relation.
        dep: ReldepId,
    },
    /// Removed by dependency cleanup of an erase job.
    CleandepsErase,
    /// Pinned by a lock job.
    Lock,
}

/// One decision: whether the solvable ends up on the system, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// `true` keeps or installs the solvable, `false` removes or rejects it.
    pub value: bool,
    /// Why the decision was made.
    pub reason: DecisionReason,
}

/// Everything the goal layer needs after a solve, detached from the pool
/// borrow: the plan, the problems and the per-solvable decision bookkeeping.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// The problems; empty means the solve succeeded.
    pub problems: Vec<Problem>,
    /// The plan; meaningful only when `problems` is empty.
    pub plan: Plan,
    /// Per-solvable decisions, indexed by solvable id.
    pub decisions: Vec<Option<Decision>>,
    /// Packages removed by dependency cleanup.
    pub cleandeps: Map,
    /// Installed packages no user-installed package needs.
    pub unneeded: Vec<SolvableId>,
}

impl SolveOutcome {
    /// The recorded decision for a solvable.
    pub fn decision(&self, id: SolvableId) -> Option<Decision> {
        self.decisions.get(id.index()).copied().flatten()
    }
}

struct Snapshot {
    decisions: Vec<Option<Decision>>,
    replaced_len: usize,
    obsoleted_len: usize,
}

/// The resolver. Borrows the pool immutably; every relation a job refers to
/// must already be interned and `make_provides_ready` must have run.
pub struct Solver<'pool> {
    pool: &'pool Pool,
    flags: SolverFlags,

    decisions: Vec<Option<Decision>>,
    multiversion: Map,
    userinstalled: Map,
    allow_uninstall_ids: Map,
    disfavored: Map,
    favored: AHashMap<StringId, SolvableId>,
    cleandeps: Map,
    cleandeps_seeds: Vec<SolvableId>,

    problems: Vec<Problem>,
    // (old, incoming) pairs
    replaced_by: Vec<(SolvableId, SolvableId)>,
    obsoleted_by: Vec<(SolvableId, SolvableId)>,
}

impl<'pool> Solver<'pool> {
    /// Creates a solver over a pool whose provides index is ready.
    pub fn new(pool: &'pool Pool, flags: SolverFlags) -> Self {
        debug_assert!(pool.provides_ready());
        let n = pool.nsolvables();
        Self {
            pool,
            flags,
            decisions: vec![None; n],
            multiversion: Map::new(n),
            userinstalled: Map::new(n),
            allow_uninstall_ids: Map::new(n),
            disfavored: Map::new(n),
            favored: AHashMap::new(),
            cleandeps: Map::new(n),
            cleandeps_seeds: Vec::new(),
            problems: Vec::new(),
            replaced_by: Vec::new(),
            obsoleted_by: Vec::new(),
        }
    }

    /// Runs the jobs. Returns the number of problems; a plan is only
    /// meaningful when this returns 0.
    pub fn solve(&mut self, jobs: &[Job]) -> usize {
        let n = self.pool.nsolvables();
        self.decisions = vec![None; n];
        self.multiversion = Map::new(n);
        self.userinstalled = Map::new(n);
        self.allow_uninstall_ids = Map::new(n);
        self.disfavored = Map::new(n);
        self.favored.clear();
        self.cleandeps = Map::new(n);
        self.cleandeps_seeds.clear();
        self.problems.clear();
        self.replaced_by.clear();
        self.obsoleted_by.clear();

        self.collect_modifier_jobs(jobs);
        self.run_erase_jobs(jobs);
        self.run_install_jobs(jobs);
        self.run_update_jobs(jobs);
        self.run_verify_jobs(jobs);
        self.propagate_removals();
        self.run_cleandeps();

        debug!(
            problems = self.problems.len(),
            "solver finished; {} decisions",
            self.decisions.iter().filter(|d| d.is_some()).count()
        );
        self.problems.len()
    }

    /// The problems of the last solve.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Whether the solvable ends up on the system.
    pub fn present(&self, id: SolvableId) -> bool {
        match self.decisions[id.index()] {
            Some(decision) => decision.value,
            None => self.pool.is_installed(id),
        }
    }

    /// The recorded decision for a solvable.
    pub fn decision(&self, id: SolvableId) -> Option<Decision> {
        self.decisions[id.index()]
    }

    /// Ids erased by dependency cleanup.
    pub fn cleandeps(&self) -> &Map {
        &self.cleandeps
    }

    /// Installed packages that no user-installed package (transitively)
    /// requires or recommends.
    pub fn unneeded(&self) -> Vec<SolvableId> {
        let mut needed = Map::new(self.pool.nsolvables());
        let mut queue: Vec<SolvableId> = Vec::new();
        for id in self.pool.pkg_ids().filter(|&id| self.present(id)) {
            let root = self.userinstalled.contains(id)
                || matches!(
                    self.decisions[id.index()],
                    Some(Decision {
                        value: true,
                        reason: DecisionReason::Job { .. } | DecisionReason::Lock,
                    })
                );
            if root {
                needed.set(id);
                queue.push(id);
            }
        }
        while let Some(id) = queue.pop() {
            let solvable = self.pool.solvable(id);
            let deps = solvable
                .requires
                .iter()
                .chain(&solvable.prereq)
                .chain(&solvable.recommends);
            for &dep in deps {
                if self.skip_dep(dep) {
                    continue;
                }
                for provider in self.pool.providers_of_dep(dep) {
                    if self.present(provider) && !needed.contains(provider) {
                        needed.set(provider);
                        queue.push(provider);
                    }
                }
            }
        }
        self.pool
            .pkg_ids()
            .filter(|&id| {
                self.pool.is_installed(id) && self.present(id) && !needed.contains(id)
            })
            .collect()
    }

    /// Builds the plan from the current decisions.
    pub fn create_plan(&self) -> Plan {
        let mut incoming: Vec<SolvableId> = Vec::new();
        let mut outgoing: Vec<SolvableId> = Vec::new();
        for id in self.pool.pkg_ids() {
            match self.decisions[id.index()] {
                Some(Decision { value: true, .. }) if !self.pool.is_installed(id) => {
                    incoming.push(id);
                }
                Some(Decision { value: false, .. }) if self.pool.is_installed(id) => {
                    outgoing.push(id);
                }
                _ => {}
            }
        }

        let replaced_of = |new: SolvableId| -> Vec<SolvableId> {
            let mut old: Vec<_> = self
                .replaced_by
                .iter()
                .filter(|(_, by)| *by == new)
                .map(|(old, _)| *old)
                .collect();
            old.sort_unstable();
            old
        };
        let obsoleted_of = |new: SolvableId| -> Vec<SolvableId> {
            let mut old: Vec<_> = self
                .obsoleted_by
                .iter()
                .filter(|(_, by)| *by == new)
                .map(|(old, _)| *old)
                .collect();
            old.sort_unstable();
            old
        };

        let outgoing_action = |id: SolvableId| -> TransactionItemAction {
            if self.obsoleted_by.iter().any(|(old, _)| *old == id) {
                return TransactionItemAction::Obsoleted;
            }
            if let Some(&(_, by)) = self.replaced_by.iter().find(|(old, _)| *old == id) {
                let old_evr = self.pool.solvable(id).evr;
                let new_evr = self.pool.solvable(by).evr;
                return match self.pool.evrcmp(new_evr, old_evr) {
                    Ordering::Greater => TransactionItemAction::Upgraded,
                    Ordering::Less => TransactionItemAction::Downgraded,
                    Ordering::Equal => TransactionItemAction::Reinstalled,
                };
            }
            TransactionItemAction::Remove
        };

        let mut steps = Vec::new();
        let mut standalone: Vec<_> = outgoing
            .iter()
            .copied()
            .filter(|&old| {
                !self.replaced_by.iter().any(|(o, _)| *o == old)
                    && !self.obsoleted_by.iter().any(|(o, _)| *o == old)
            })
            .collect();
        standalone.sort_unstable();
        for old in standalone {
            steps.push(PlanStep {
                id: old,
                action: outgoing_action(old),
            });
        }

        incoming.sort_unstable();
        for new in incoming {
            let replaced = replaced_of(new);
            let obsoleted = obsoleted_of(new);
            let action = if let Some(&old) = replaced.first() {
                let cmp = self
                    .pool
                    .evrcmp(self.pool.solvable(new).evr, self.pool.solvable(old).evr);
                match cmp {
                    Ordering::Greater => TransactionItemAction::Upgrade,
                    Ordering::Less => TransactionItemAction::Downgrade,
                    Ordering::Equal => TransactionItemAction::Reinstall,
                }
            } else if !obsoleted.is_empty() {
                TransactionItemAction::Obsolete
            } else {
                TransactionItemAction::Install
            };
            steps.push(PlanStep { id: new, action });
            for old in replaced.into_iter().chain(obsoleted) {
                steps.push(PlanStep {
                    id: old,
                    action: outgoing_action(old),
                });
            }
        }

        let mut obsoleted_pairs = self.obsoleted_by.clone();
        obsoleted_pairs.sort_unstable();
        obsoleted_pairs.dedup();
        Plan::new(steps, obsoleted_pairs)
    }

    /// Detaches the results of the last solve from the pool borrow.
    pub fn into_outcome(self) -> SolveOutcome {
        let plan = if self.problems.is_empty() {
            self.create_plan()
        } else {
            Plan::default()
        };
        let unneeded = self.unneeded();
        SolveOutcome {
            plan,
            unneeded,
            problems: self.problems,
            decisions: self.decisions,
            cleandeps: self.cleandeps,
        }
    }

    // --- job passes -------------------------------------------------------

    fn collect_modifier_jobs(&mut self, jobs: &[Job]) {
        for job in jobs {
            let action = job.action();
            let targets = self.select(&job.target);
            if action == JobFlags::MULTIVERSION {
                for id in targets {
                    self.multiversion.set(id);
                }
            } else if action == JobFlags::USERINSTALLED {
                for id in targets {
                    self.userinstalled.set(id);
                }
            } else if action == JobFlags::ALLOWUNINSTALL {
                for id in targets {
                    self.allow_uninstall_ids.set(id);
                }
            } else if action == JobFlags::LOCK {
                for id in targets {
                    let value = self.pool.is_installed(id);
                    self.decisions[id.index()] = Some(Decision {
                        value,
                        reason: DecisionReason::Lock,
                    });
                }
            } else if action == JobFlags::FAVOR {
                for id in targets {
                    self.favored.insert(self.pool.solvable(id).name, id);
                }
            } else if action == JobFlags::DISFAVOR {
                for id in targets {
                    self.disfavored.set(id);
                }
            }
        }
    }

    fn run_erase_jobs(&mut self, jobs: &[Job]) {
        for (index, job) in jobs.iter().enumerate() {
            if job.action() != JobFlags::ERASE {
                continue;
            }
            let targets: Vec<_> = self
                .select(&job.target)
                .into_iter()
                .filter(|&id| self.present(id))
                .collect();
            for id in targets {
                match self.decisions[id.index()] {
                    Some(Decision { value: true, .. }) => {
                        let mut problem = Problem::new();
                        problem.push(RuleInfo::job());
                        problem.push(RuleInfo::with_source(RuleKind::Pkg, id));
                        self.problems.push(problem);
                    }
                    _ => {
                        self.decisions[id.index()] = Some(Decision {
                            value: false,
                            reason: DecisionReason::JobErase { index },
                        });
                        if job.flags.contains(JobFlags::CLEANDEPS) {
                            self.cleandeps_seeds.push(id);
                        }
                    }
                }
            }
        }
    }

    fn run_install_jobs(&mut self, jobs: &[Job]) {
        for (index, job) in jobs.iter().enumerate() {
            if job.action() != JobFlags::INSTALL {
                continue;
            }
            let raw = self.select(&job.target);
            if raw.is_empty() {
                if !job.flags.contains(JobFlags::WEAK) {
                    self.push_job_problem(&job.target, Vec::new());
                }
                continue;
            }
            let mut candidates: Vec<_> = raw
                .iter()
                .copied()
                .filter(|&id| self.installable(id))
                .collect();
            self.order_candidates(&mut candidates);

            if candidates.is_empty() {
                if !job.flags.contains(JobFlags::WEAK) {
                    let rules = raw
                        .iter()
                        .map(|&id| RuleInfo::with_source(RuleKind::PkgNotInstallable, id))
                        .collect();
                    self.push_job_problem(&job.target, rules);
                }
                continue;
            }

            // already satisfied: pin the present candidate so it survives
            if let Some(&present) = candidates.iter().find(|&&id| self.present(id)) {
                if self.decisions[present.index()].is_none() {
                    self.decisions[present.index()] = Some(Decision {
                        value: true,
                        reason: DecisionReason::Job { index },
                    });
                }
                continue;
            }

            let mut failure: Vec<RuleInfo> = Vec::new();
            let mut installed_one = false;
            for &candidate in &candidates {
                let snapshot = self.snapshot();
                match self.try_install(candidate, DecisionReason::Job { index }) {
                    Ok(()) => {
                        installed_one = true;
                        break;
                    }
                    Err(rules) => {
                        if failure.is_empty() {
                            failure = rules;
                        }
                        self.restore(snapshot);
                    }
                }
            }
            if !installed_one && !job.flags.contains(JobFlags::WEAK) {
                self.push_job_problem(&job.target, failure);
            }
            if installed_one && job.flags.contains(JobFlags::FORCEBEST) {
                let best = candidates[0];
                if !self.present(best) {
                    let mut problem = Problem::new();
                    problem.push(RuleInfo::job());
                    problem.push(RuleInfo::with_source(RuleKind::BestJob, best));
                    self.problems.push(problem);
                }
            }
        }
    }

    fn run_update_jobs(&mut self, jobs: &[Job]) {
        for job in jobs {
            let action = job.action();
            if action != JobFlags::UPDATE && action != JobFlags::DISTUPGRADE {
                continue;
            }
            let dist = action == JobFlags::DISTUPGRADE;
            let forcebest = job.flags.contains(JobFlags::FORCEBEST);

            let installed: Vec<SolvableId> = match &job.target {
                JobTarget::All => self
                    .pool
                    .installed_repo()
                    .map(|repo| {
                        self.pool
                            .repo(repo)
                            .solvables()
                            .filter(|&id| self.pool.is_visible(id))
                            .collect()
                    })
                    .unwrap_or_default(),
                target => {
                    // a targeted update names the incoming side; map it back to
                    // the installed packages it would replace
                    let targets = self.select(target);
                    let mut result: Vec<SolvableId> = Vec::new();
                    for &id in &targets {
                        if self.pool.is_installed(id) {
                            result.push(id);
                            continue;
                        }
                        let name = self.pool.solvable(id).name;
                        for &inst in self.pool.packages_by_name(name) {
                            if self.pool.is_installed(inst) && !result.contains(&inst) {
                                result.push(inst);
                            }
                        }
                        for inst in self.obsoletable_installed(id) {
                            if !result.contains(&inst) {
                                result.push(inst);
                            }
                        }
                    }
                    result.sort_unstable();
                    result
                }
            };

            let targeted: Option<Vec<SolvableId>> = match &job.target {
                JobTarget::All => None,
                target if job.flags.contains(JobFlags::TARGETED) => Some(self.select(target)),
                _ => None,
            };

            for id in installed {
                self.update_one(id, targeted.as_deref(), dist, forcebest);
            }
        }
    }

    fn update_one(
        &mut self,
        installed_id: SolvableId,
        targeted: Option<&[SolvableId]>,
        dist: bool,
        forcebest: bool,
    ) {
        if matches!(self.decisions[installed_id.index()], Some(d) if !d.value) {
            return;
        }
        let solvable = self.pool.solvable(installed_id);
        let name = solvable.name;
        let evr = solvable.evr;
        let arch = self.pool.str_of(solvable.arch).to_owned();

        let mut candidates: Vec<SolvableId> = self
            .pool
            .packages_by_name(name)
            .iter()
            .copied()
            .filter(|&id| {
                !self.pool.is_installed(id)
                    && self.installable(id)
                    && is_arch_compatible(self.pool.str_of(self.pool.solvable(id).arch), &arch)
            })
            .collect();
        if self.flags.yum_obsoletes {
            for id in self.pool.pkg_ids() {
                if !self.pool.is_installed(id)
                    && self.installable(id)
                    && self.pool.obsoletes_covers(id, name, evr)
                    && !candidates.contains(&id)
                {
                    candidates.push(id);
                }
            }
        }
        if let Some(targeted) = targeted {
            candidates.retain(|id| targeted.contains(id));
        }
        if candidates.is_empty() {
            return;
        }
        // prefer obsoleters over plain version candidates, then best first
        self.order_candidates(&mut candidates);
        candidates.sort_by_key(|&id| !self.pool.obsoletes_covers(id, name, evr) as u8);

        let multiversion = self.multiversion.contains(installed_id);
        let mut succeeded = false;
        for &candidate in &candidates {
            let candidate_name = self.pool.solvable(candidate).name;
            if candidate_name == name {
                let cmp = self
                    .pool
                    .evrcmp(self.pool.solvable(candidate).evr, evr);
                let going_up = cmp == Ordering::Greater;
                let targeted_this = targeted.is_some_and(|t| t.contains(&candidate));
                if cmp == Ordering::Equal && !targeted_this {
                    // already at this version
                    succeeded = true;
                    break;
                }
                if !going_up && !(dist || self.flags.allow_downgrade || targeted_this) {
                    continue;
                }
                if multiversion || self.multiversion.contains(candidate) {
                    if !going_up && !dist {
                        continue;
                    }
                    if self.present(candidate) {
                        succeeded = true;
                        break;
                    }
                    let snapshot = self.snapshot();
                    match self.try_install(
                        candidate,
                        DecisionReason::Update {
                            replaces: installed_id,
                        },
                    ) {
                        Ok(()) => {
                            succeeded = true;
                            break;
                        }
                        Err(_) => self.restore(snapshot),
                    }
                    continue;
                }
            }
            if self.present(candidate) {
                succeeded = true;
                break;
            }
            let snapshot = self.snapshot();
            match self.try_install(
                candidate,
                DecisionReason::Update {
                    replaces: installed_id,
                },
            ) {
                Ok(()) => {
                    succeeded = true;
                    break;
                }
                Err(_) => self.restore(snapshot),
            }
        }

        if forcebest {
            let best = candidates[0];
            if !succeeded || !self.present(best) {
                let mut problem = Problem::new();
                problem.push(RuleInfo::with_source(RuleKind::BestUpdate, installed_id));
                self.problems.push(problem);
            }
        }
    }

    fn run_verify_jobs(&mut self, jobs: &[Job]) {
        if !jobs.iter().any(|job| job.action() == JobFlags::VERIFY) {
            return;
        }
        let Some(repo) = self.pool.installed_repo() else {
            return;
        };
        for id in self.pool.repo(repo).solvables() {
            if !self.pool.is_visible(id) {
                continue;
            }
            let solvable = self.pool.solvable(id);
            for &dep in solvable.requires.iter().chain(&solvable.prereq) {
                if self.skip_dep(dep) || self.dep_satisfied(dep) {
                    continue;
                }
                let mut problem = Problem::new();
                problem.push(RuleInfo::with_source(RuleKind::Update, id));
                let kind = if self.pool.providers_of_dep(dep).is_empty() {
                    RuleKind::PkgNothingProvidesDep
                } else {
                    RuleKind::PkgRequires
                };
                problem.push(RuleInfo::full(kind, id, SolvableId::none(), dep));
                self.problems.push(problem);
            }
        }
    }

    // --- propagation ------------------------------------------------------

    fn propagate_removals(&mut self) {
        let mut reported: Vec<(SolvableId, ReldepId)> = Vec::new();
        loop {
            let mut changed = false;
            let survivors: Vec<SolvableId> = self
                .pool
                .pkg_ids()
                .filter(|&id| self.pool.is_installed(id) && self.present(id))
                .collect();
            for id in survivors {
                let solvable = self.pool.solvable(id);
                let deps: Vec<ReldepId> = solvable
                    .requires
                    .iter()
                    .chain(&solvable.prereq)
                    .copied()
                    .collect();
                for dep in deps {
                    if self.skip_dep(dep) || self.dep_satisfied(dep) {
                        continue;
                    }
                    // breakage that predates this transaction is left to
                    // verify; only deps that lost an installed provider
                    // propagate
                    if !self
                        .pool
                        .providers_of_dep(dep)
                        .iter()
                        .any(|&p| self.pool.is_installed(p))
                    {
                        continue;
                    }
                    if self.removal_was_erase_chain(dep) {
                        trace!(
                            "erasing {} (needs {})",
                            self.pool.solvable_str(id),
                            self.pool.dep_to_string(dep)
                        );
                        self.decisions[id.index()] = Some(Decision {
                            value: false,
                            reason: DecisionReason::BrokenDependency { dep },
                        });
                        changed = true;
                        break;
                    }
                    // try following the update chain before giving up
                    if self.try_update_for_broken_dep(id) {
                        changed = true;
                        break;
                    }
                    if self.flags.allow_uninstall || self.allow_uninstall_ids.contains(id) {
                        self.decisions[id.index()] = Some(Decision {
                            value: false,
                            reason: DecisionReason::BrokenDependency { dep },
                        });
                        changed = true;
                        break;
                    }
                    if !reported.contains(&(id, dep)) {
                        reported.push((id, dep));
                        let mut problem = Problem::new();
                        problem.push(RuleInfo::full(
                            RuleKind::PkgRequires,
                            id,
                            SolvableId::none(),
                            dep,
                        ));
                        self.problems.push(problem);
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn removal_was_erase_chain(&self, dep: ReldepId) -> bool {
        // the providers this dependency lost: any of them erased by an erase
        // job or its cascade means the dependent follows the erase
        self.pool.providers_of_dep(dep).iter().any(|&provider| {
            matches!(
                self.decisions[provider.index()],
                Some(Decision {
                    value: false,
                    reason: DecisionReason::JobErase { .. }
                        | DecisionReason::BrokenDependency { .. }
                        | DecisionReason::CleandepsErase,
                })
            )
        })
    }

    fn try_update_for_broken_dep(&mut self, id: SolvableId) -> bool {
        let solvable = self.pool.solvable(id);
        let name = solvable.name;
        let evr = solvable.evr;
        let arch = self.pool.str_of(solvable.arch).to_owned();
        let mut candidates: Vec<SolvableId> = self
            .pool
            .packages_by_name(name)
            .iter()
            .copied()
            .filter(|&cand| {
                !self.pool.is_installed(cand)
                    && self.installable(cand)
                    && self.pool.evrcmp(self.pool.solvable(cand).evr, evr) == Ordering::Greater
                    && is_arch_compatible(self.pool.str_of(self.pool.solvable(cand).arch), &arch)
            })
            .collect();
        if candidates.is_empty() {
            return false;
        }
        self.order_candidates(&mut candidates);
        for &candidate in &candidates {
            let snapshot = self.snapshot();
            if self
                .try_install(candidate, DecisionReason::Update { replaces: id })
                .is_ok()
            {
                return true;
            }
            self.restore(snapshot);
        }
        false
    }

    fn run_cleandeps(&mut self) {
        if self.cleandeps_seeds.is_empty() {
            return;
        }
        let mut frontier = std::mem::take(&mut self.cleandeps_seeds);
        while let Some(erased) = frontier.pop() {
            let solvable = self.pool.solvable(erased);
            let deps: Vec<ReldepId> = solvable
                .requires
                .iter()
                .chain(&solvable.prereq)
                .chain(&solvable.recommends)
                .copied()
                .collect();
            for dep in deps {
                if self.skip_dep(dep) {
                    continue;
                }
                for candidate in self.pool.providers_of_dep(dep) {
                    if !self.pool.is_installed(candidate)
                        || !self.present(candidate)
                        || self.userinstalled.contains(candidate)
                        || matches!(
                            self.decisions[candidate.index()],
                            Some(Decision {
                                reason: DecisionReason::Job { .. } | DecisionReason::Lock,
                                ..
                            })
                        )
                    {
                        continue;
                    }
                    if self.needed_by_present(candidate) {
                        continue;
                    }
                    trace!("cleandeps erases {}", self.pool.solvable_str(candidate));
                    self.decisions[candidate.index()] = Some(Decision {
                        value: false,
                        reason: DecisionReason::CleandepsErase,
                    });
                    self.cleandeps.set(candidate);
                    frontier.push(candidate);
                }
            }
        }
    }

    /// Whether some other present package needs `id` (no alternative present
    /// provider for one of its required relations).
    fn needed_by_present(&self, id: SolvableId) -> bool {
        for other in self.pool.pkg_ids() {
            if other == id || !self.present(other) {
                continue;
            }
            let solvable = self.pool.solvable(other);
            for &dep in solvable.requires.iter().chain(&solvable.prereq) {
                if self.skip_dep(dep) {
                    continue;
                }
                let providers = self.pool.providers_of_dep(dep);
                if !providers.contains(&id) {
                    continue;
                }
                let alternative = providers
                    .iter()
                    .any(|&p| p != id && self.present(p));
                if !alternative {
                    return true;
                }
            }
        }
        false
    }

    // --- install machinery ------------------------------------------------

    fn try_install(
        &mut self,
        id: SolvableId,
        reason: DecisionReason,
    ) -> Result<(), Vec<RuleInfo>> {
        match self.decisions[id.index()] {
            Some(Decision { value: true, .. }) => return Ok(()),
            Some(Decision { value: false, .. }) => {
                return Err(vec![RuleInfo::with_source(RuleKind::PkgNotInstallable, id)]);
            }
            None => {}
        }

        if let Some(rule) = self.conflict_with_present(id) {
            return Err(vec![rule]);
        }

        // same-name replacement (implicit obsoletes)
        let name = self.pool.solvable(id).name;
        let arch = self.pool.str_of(self.pool.solvable(id).arch).to_owned();
        if !self.multiversion.contains(id) {
            let peers: Vec<SolvableId> = self
                .pool
                .packages_by_name(name)
                .iter()
                .copied()
                .filter(|&peer| peer != id && self.present(peer))
                .collect();
            for peer in peers {
                let peer_arch = self.pool.str_of(self.pool.solvable(peer).arch);
                let same_slot = peer_arch == arch || peer_arch == "noarch" || arch == "noarch";
                if !same_slot || self.multiversion.contains(peer) {
                    continue;
                }
                if self.pool.is_installed(peer) {
                    if self.set_false(peer, DecisionReason::Replaced { by: id }).is_err() {
                        return Err(vec![RuleInfo::full(
                            RuleKind::PkgSameName,
                            id,
                            peer,
                            ReldepId::none(),
                        )]);
                    }
                    self.replaced_by.push((peer, id));
                } else {
                    return Err(vec![RuleInfo::full(
                        RuleKind::PkgSameName,
                        id,
                        peer,
                        ReldepId::none(),
                    )]);
                }
            }
        }

        // explicit obsoletes
        if self.flags.yum_obsoletes {
            let evr_of = |solver: &Self, sid: SolvableId| solver.pool.solvable(sid).evr;
            let obsoletes: Vec<ReldepId> = self.pool.solvable(id).obsoletes.clone();
            for dep in obsoletes {
                let target_name = self.pool.reldep(dep).name;
                let targets: Vec<SolvableId> = self
                    .pool
                    .packages_by_name(target_name)
                    .iter()
                    .copied()
                    .filter(|&t| {
                        t != id
                            && self.present(t)
                            && !self.multiversion.contains(t)
                            && self
                                .pool
                                .obsoletes_covers(id, target_name, evr_of(self, t))
                    })
                    .collect();
                for target in targets {
                    if self
                        .set_false(target, DecisionReason::Obsoleted { by: id })
                        .is_err()
                    {
                        return Err(vec![RuleInfo::full(RuleKind::PkgObsoletes, id, target, dep)]);
                    }
                    self.obsoleted_by.push((target, id));
                }
            }
            // an installed package obsoleting the candidate blocks it
            for holder in self.pool.pkg_ids() {
                if holder != id
                    && self.pool.is_installed(holder)
                    && self.present(holder)
                    && self
                        .pool
                        .obsoletes_covers(holder, name, self.pool.solvable(id).evr)
                {
                    return Err(vec![RuleInfo::full(
                        RuleKind::PkgInstalledObsoletes,
                        holder,
                        id,
                        ReldepId::none(),
                    )]);
                }
            }
        }

        self.decisions[id.index()] = Some(Decision { value: true, reason });

        // hard dependencies
        let solvable = self.pool.solvable(id);
        let requires: Vec<ReldepId> = solvable
            .requires
            .iter()
            .chain(&solvable.prereq)
            .copied()
            .collect();
        for dep in requires {
            if self.skip_dep(dep) || self.dep_satisfied(dep) {
                continue;
            }
            let providers = self.pool.providers_of_dep(dep);
            if providers.is_empty() {
                return Err(vec![RuleInfo::full(
                    RuleKind::PkgNothingProvidesDep,
                    id,
                    SolvableId::none(),
                    dep,
                )]);
            }
            let mut candidates: Vec<SolvableId> = providers
                .iter()
                .copied()
                .filter(|&p| self.installable(p))
                .collect();
            self.order_candidates(&mut candidates);
            let mut satisfied = false;
            for &candidate in &candidates {
                let snapshot = self.snapshot();
                if self
                    .try_install(
                        candidate,
                        DecisionReason::Depend {
                            dep,
                            required_by: id,
                        },
                    )
                    .is_ok()
                {
                    satisfied = true;
                    break;
                }
                self.restore(snapshot);
            }
            if !satisfied {
                return Err(vec![RuleInfo::full(
                    RuleKind::PkgRequires,
                    id,
                    SolvableId::none(),
                    dep,
                )]);
            }
        }

        // weak dependencies, failures are silent
        if !self.flags.ignore_recommended && !self.pool.is_installed(id) {
            let recommends: Vec<ReldepId> = self.pool.solvable(id).recommends.clone();
            for dep in recommends {
                if self.skip_dep(dep) || self.dep_satisfied(dep) {
                    continue;
                }
                let mut candidates: Vec<SolvableId> = self
                    .pool
                    .providers_of_dep(dep)
                    .into_iter()
                    .filter(|&p| self.installable(p) && !self.disfavored.contains(p))
                    .collect();
                self.order_candidates(&mut candidates);
                if let Some(&candidate) = candidates.first() {
                    let snapshot = self.snapshot();
                    if self
                        .try_install(
                            candidate,
                            DecisionReason::WeakDep {
                                dep,
                                required_by: id,
                            },
                        )
                        .is_err()
                    {
                        self.restore(snapshot);
                    }
                }
            }
        }

        Ok(())
    }

    fn set_false(&mut self, id: SolvableId, reason: DecisionReason) -> Result<(), ()> {
        match self.decisions[id.index()] {
            Some(Decision { value: true, .. }) => Err(()),
            Some(Decision { value: false, .. }) => Ok(()),
            None => {
                self.decisions[id.index()] = Some(Decision {
                    value: false,
                    reason,
                });
                Ok(())
            }
        }
    }

    fn conflict_with_present(&self, id: SolvableId) -> Option<RuleInfo> {
        // forward: the candidate conflicts with something present
        for &dep in &self.pool.solvable(id).conflicts {
            if self.skip_dep(dep) {
                continue;
            }
            for provider in self.pool.providers_of_dep(dep) {
                if provider != id && self.present(provider) {
                    return Some(RuleInfo::full(RuleKind::PkgConflicts, id, provider, dep));
                }
            }
        }
        // reverse: something present conflicts with the candidate
        for holder in self.pool.pkg_ids() {
            if holder == id || !self.present(holder) {
                continue;
            }
            for &dep in &self.pool.solvable(holder).conflicts {
                if self.skip_dep(dep) {
                    continue;
                }
                if self.pool.solvable_matches_dep(id, dep) {
                    return Some(RuleInfo::full(RuleKind::PkgConflicts, holder, id, dep));
                }
            }
        }
        None
    }

    // --- helpers ----------------------------------------------------------

    fn select(&self, target: &JobTarget) -> Vec<SolvableId> {
        match target {
            JobTarget::Solvable(id) => vec![*id],
            JobTarget::Name(name) => self.pool.packages_by_name(*name).to_vec(),
            JobTarget::Provides(dep) => self.pool.providers_of_dep(*dep),
            JobTarget::OneOf(ids) => ids.clone(),
            JobTarget::All => self.pool.pkg_ids().collect(),
        }
    }

    fn installable(&self, id: SolvableId) -> bool {
        if !self.pool.is_visible(id) {
            return false;
        }
        if matches!(self.decisions[id.index()], Some(d) if !d.value) {
            return false;
        }
        let arch = self.pool.str_of(self.pool.solvable(id).arch);
        !kestrel_rpm_types::SRC_ARCHES.contains(&arch)
    }

    /// Best candidate first: favored, then not disfavored, then highest EVR,
    /// then highest repo priority, then lowest id.
    fn order_candidates(&self, candidates: &mut [SolvableId]) {
        candidates.sort_by(|&a, &b| {
            let sa = self.pool.solvable(a);
            let sb = self.pool.solvable(b);
            let favored_a = self.favored.get(&sa.name) == Some(&a);
            let favored_b = self.favored.get(&sb.name) == Some(&b);
            favored_b
                .cmp(&favored_a)
                .then_with(|| self.disfavored.contains(a).cmp(&self.disfavored.contains(b)))
                .then_with(|| self.pool.evrcmp(sb.evr, sa.evr))
                .then_with(|| {
                    let pa = sa.repo.map_or(0, |r| self.pool.repo(r).priority);
                    let pb = sb.repo.map_or(0, |r| self.pool.repo(r).priority);
                    pb.cmp(&pa)
                })
                .then_with(|| a.cmp(&b))
        });
    }

    fn obsoletable_installed(&self, by: SolvableId) -> Vec<SolvableId> {
        let Some(repo) = self.pool.installed_repo() else {
            return Vec::new();
        };
        self.pool
            .repo(repo)
            .solvables()
            .filter(|&inst| {
                let solvable = self.pool.solvable(inst);
                self.pool.obsoletes_covers(by, solvable.name, solvable.evr)
            })
            .collect()
    }

    fn dep_satisfied(&self, dep: ReldepId) -> bool {
        self.pool
            .providers_of_dep(dep)
            .iter()
            .any(|&p| self.present(p))
    }

    fn skip_dep(&self, dep: ReldepId) -> bool {
        let reldep = self.pool.reldep(dep);
        if reldep.is_rich() {
            return true;
        }
        // rpmlib() capabilities are satisfied by rpm itself
        self.pool.str_of(reldep.name).starts_with("rpmlib(")
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            decisions: self.decisions.clone(),
            replaced_len: self.replaced_by.len(),
            obsoleted_len: self.obsoleted_by.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.decisions = snapshot.decisions;
        self.replaced_by.truncate(snapshot.replaced_len);
        self.obsoleted_by.truncate(snapshot.obsoleted_len);
    }

    fn push_job_problem(&mut self, target: &JobTarget, rules: Vec<RuleInfo>) {
        let mut problem = Problem::new();
        problem.push(RuleInfo::job());
        if rules.is_empty() {
            match target {
                JobTarget::Provides(dep) => {
                    problem.push(RuleInfo::with_dep(RuleKind::JobNothingProvidesDep, *dep));
                }
                _ => {
                    problem.push(RuleInfo::with_dep(
                        RuleKind::JobUnknownPackage,
                        ReldepId::none(),
                    ));
                }
            }
        }
        for rule in rules {
            problem.push(rule);
        }
        self.problems.push(problem);
    }
}
