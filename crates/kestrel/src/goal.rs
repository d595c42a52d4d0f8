use tracing::debug;

use kestrel_history::History;
use kestrel_rpm_types::{TransactionItemAction, TransactionItemReason};
use kestrel_solve::{
    Decision, DecisionReason, Job, JobFlags, JobTarget, Pool, RuleInfo, RuleKind, SolvableId,
    SolveOutcome, Solver, SolverFlags, StringId,
};

use crate::errors::{Error, Result};
use crate::package::Package;
use crate::package_set::PackageSet;
use crate::sack::Sack;
use crate::selector::Selector;

bitflags::bitflags! {
    /// Flags of one [`Goal::run`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GoalRunFlags: u32 {
        /// Installed packages may be removed to reach a solution, except
        /// protected ones and the running kernel.
        const ALLOW_UNINSTALL = 1 << 0;
        /// Fail instead of settling for a non-best candidate.
        const FORCE_BEST = 1 << 1;
        /// Do not pull in weak dependencies.
        const IGNORE_WEAK_DEPS = 1 << 2;
        /// Strip the weak marker from staged jobs so their failures surface.
        const IGNORE_WEAK = 1 << 3;
        /// Updates may go to a lower EVR.
        const ALLOW_DOWNGRADE = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Flags of an erase request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EraseFlags: u32 {
        /// Also erase dependencies that nothing else needs anymore.
        const CLEAN_DEPS = 1 << 0;
    }
}

/// The dependency-resolution driver: accumulates user intents as solver jobs,
/// runs the solver with the sack's policy (installonly, protected packages,
/// running kernel), and exposes the resulting plan, reasons and problem
/// descriptions.
pub struct Goal<'a> {
    sack: &'a Sack,
    staged: Vec<Job>,
    protected: Option<PackageSet>,
    protect_running_kernel: bool,
    outcome: Option<SolveOutcome>,
    removal_of_protected: Vec<SolvableId>,
}

impl<'a> Goal<'a> {
    /// A fresh goal over the sack.
    pub fn new(sack: &'a Sack) -> Self {
        Self {
            sack,
            staged: Vec::new(),
            protected: None,
            protect_running_kernel: true,
            outcome: None,
            removal_of_protected: Vec::new(),
        }
    }

    /// The owning sack.
    pub fn sack(&self) -> &'a Sack {
        self.sack
    }

    // --- staging ----------------------------------------------------------

    /// Requests installation of one concrete package.
    pub fn install(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::INSTALL | JobFlags::SET_ARCH | JobFlags::SET_EVR,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Requests installation that may be dropped if unsatisfiable.
    pub fn install_optional(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::INSTALL | JobFlags::SET_ARCH | JobFlags::SET_EVR | JobFlags::WEAK,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Requests installation of whatever a selector picks.
    pub fn install_selector(&mut self, selector: &Selector<'_>) -> Result<()> {
        let job = selector.to_job(JobFlags::INSTALL)?;
        self.staged.push(job);
        Ok(())
    }

    /// Weak form of [`Goal::install_selector`].
    pub fn install_selector_optional(&mut self, selector: &Selector<'_>) -> Result<()> {
        let job = selector.to_job(JobFlags::INSTALL | JobFlags::WEAK)?;
        self.staged.push(job);
        Ok(())
    }

    /// Requests removal of a package.
    pub fn erase(&mut self, package: &Package<'_>) {
        self.erase_flags(package, EraseFlags::empty());
    }

    /// Requests removal with explicit flags.
    pub fn erase_flags(&mut self, package: &Package<'_>, flags: EraseFlags) {
        let mut job_flags = JobFlags::ERASE;
        if flags.contains(EraseFlags::CLEAN_DEPS) {
            job_flags |= JobFlags::CLEANDEPS;
        }
        self.staged
            .push(Job::new(job_flags, JobTarget::OneOf(vec![package.id()])));
    }

    /// Requests removal of whatever a selector picks.
    pub fn erase_selector_flags(
        &mut self,
        selector: &Selector<'_>,
        flags: EraseFlags,
    ) -> Result<()> {
        let mut job_flags = JobFlags::ERASE;
        if flags.contains(EraseFlags::CLEAN_DEPS) {
            job_flags |= JobFlags::CLEANDEPS;
        }
        let job = selector.to_job(job_flags)?;
        self.staged.push(job);
        Ok(())
    }

    /// Requests an upgrade of everything installed.
    pub fn upgrade_all(&mut self) {
        self.staged
            .push(Job::new(JobFlags::UPDATE, JobTarget::All));
    }

    /// Requests an upgrade to one concrete package.
    pub fn upgrade_to(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::UPDATE | JobFlags::TARGETED,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Requests an upgrade of whatever a selector picks.
    pub fn upgrade_selector(&mut self, selector: &Selector<'_>) -> Result<()> {
        let mut flags = JobFlags::UPDATE;
        if selector.is_versioned() {
            flags |= JobFlags::TARGETED;
        }
        let job = selector.to_job(flags)?;
        self.staged.push(job);
        Ok(())
    }

    /// Requests a downgrade to one concrete package.
    pub fn downgrade_to(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::UPDATE | JobFlags::TARGETED,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Requests a distribution upgrade of everything installed.
    pub fn distupgrade_all(&mut self) {
        self.staged
            .push(Job::new(JobFlags::DISTUPGRADE, JobTarget::All));
    }

    /// Requests a distribution upgrade of one package.
    pub fn distupgrade(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::DISTUPGRADE,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Requests a distribution upgrade of whatever a selector picks.
    pub fn distupgrade_selector(&mut self, selector: &Selector<'_>) -> Result<()> {
        let job = selector.to_job(JobFlags::DISTUPGRADE)?;
        self.staged.push(job);
        Ok(())
    }

    /// Requests a consistency check of the installed packages.
    pub fn verify(&mut self) {
        self.staged.push(Job::new(JobFlags::VERIFY, JobTarget::All));
    }

    /// Marks one package as user-installed for unneeded computation.
    pub fn userinstalled(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::USERINSTALLED,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Marks a whole set as user-installed.
    pub fn userinstalled_set(&mut self, set: &PackageSet) {
        self.staged.push(Job::new(
            JobFlags::USERINSTALLED,
            JobTarget::OneOf(set.ids().collect()),
        ));
    }

    /// Freezes the current state of a package.
    pub fn lock(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::LOCK,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Prefers a solvable among its name peers.
    pub fn favor(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::FAVOR,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    /// Avoids a solvable unless it is the only option.
    pub fn disfavor(&mut self, package: &Package<'_>) {
        self.staged.push(Job::new(
            JobFlags::DISFAVOR,
            JobTarget::OneOf(vec![package.id()]),
        ));
    }

    // --- protected packages -----------------------------------------------

    /// Adds to the set of packages that must never be removed.
    pub fn add_protected(&mut self, set: &PackageSet) {
        match &mut self.protected {
            Some(existing) => existing.union_with(set),
            None => self.protected = Some(set.clone()),
        }
    }

    /// Replaces the protected set.
    pub fn set_protected(&mut self, set: &PackageSet) {
        self.protected = Some(set.clone());
    }

    /// Whether the running kernel is implicitly protected. On by default.
    pub fn set_protect_running_kernel(&mut self, protect: bool) {
        self.protect_running_kernel = protect;
    }

    // --- solving ----------------------------------------------------------

    /// Resolves the staged requests into a plan.
    ///
    /// On failure the error carries the rendered problems;
    /// [`Goal::count_problems`] and [`Goal::describe_problem_rules`] stay
    /// available for structured inspection.
    pub fn run(&mut self, flags: GoalRunFlags) -> Result<()> {
        self.outcome = None;
        self.removal_of_protected.clear();

        let mut jobs = self.staged.clone();
        if flags.contains(GoalRunFlags::IGNORE_WEAK) {
            for job in &mut jobs {
                job.flags.remove(JobFlags::WEAK);
            }
        }
        if flags.contains(GoalRunFlags::FORCE_BEST) {
            for job in &mut jobs {
                let action = job.action();
                if action == JobFlags::INSTALL
                    || action == JobFlags::UPDATE
                    || action == JobFlags::DISTUPGRADE
                {
                    job.flags |= JobFlags::FORCEBEST;
                }
            }
        }
        // installonly names must never be implicitly obsoleted
        for name in &self.sack.config().installonly {
            let dep = self.sack.intern_dep(name);
            jobs.push(Job::new(JobFlags::MULTIVERSION, JobTarget::Provides(dep)));
        }

        self.sack.make_provides_ready();
        let kernel = self.protected_running_kernel();

        if flags.contains(GoalRunFlags::ALLOW_UNINSTALL) {
            let removable = self.removable_installed(kernel);
            jobs.push(Job::new(
                JobFlags::ALLOWUNINSTALL,
                JobTarget::OneOf(removable),
            ));
        }

        let solver_flags = SolverFlags {
            allow_vendor_change: self.sack.config().allow_vendor_change,
            allow_downgrade: flags.contains(GoalRunFlags::ALLOW_DOWNGRADE),
            ignore_recommended: flags.contains(GoalRunFlags::IGNORE_WEAK_DEPS),
            ..SolverFlags::default()
        };

        let nproblems;
        {
            let pool = self.sack.pool();
            let mut solver = Solver::new(&pool, solver_flags.clone());
            let mut count = solver.solve(&jobs);
            debug!(problems = count, "goal solved");
            if count == 0 {
                let extra = self.limit_installonly_packages(&pool, &solver, kernel);
                if !extra.is_empty() {
                    // re-resolve with the keep/erase split and permission to
                    // drop whatever depended on the erased versions
                    let mut jobs = jobs.clone();
                    jobs.extend(extra);
                    jobs.push(Job::new(
                        JobFlags::ALLOWUNINSTALL,
                        JobTarget::OneOf(self.removable_installed(kernel)),
                    ));
                    let mut solver = Solver::new(&pool, solver_flags);
                    count = solver.solve(&jobs);
                    debug!(problems = count, "installonly limit re-solve");
                    self.outcome = Some(solver.into_outcome());
                    nproblems = count;
                } else {
                    self.outcome = Some(solver.into_outcome());
                    nproblems = count;
                }
            } else {
                self.outcome = Some(solver.into_outcome());
                nproblems = count;
            }
        }

        if nproblems > 0 {
            let descriptions = self.describe_all_problems(true);
            return Err(Error::NoSolution(Self::format_all_problem_rules(
                &descriptions,
            )));
        }

        self.check_protected_in_removals(kernel)
    }

    fn protected_running_kernel(&self) -> Option<SolvableId> {
        if self.protect_running_kernel {
            self.sack.running_kernel_id()
        } else {
            None
        }
    }

    // every visible installed package except the protected ones and the
    // running kernel
    fn removable_installed(&self, kernel: Option<SolvableId>) -> Vec<SolvableId> {
        let pool = self.sack.pool();
        let Some(repo) = pool.installed_repo() else {
            return Vec::new();
        };
        pool.repo(repo)
            .solvables()
            .filter(|&id| {
                pool.is_visible(id)
                    && Some(id) != kernel
                    && !self
                        .protected
                        .as_ref()
                        .is_some_and(|set| set.contains_id(id))
            })
            .collect()
    }

    /// The keep/erase job split enforcing the installonly limit, empty when
    /// nothing exceeds it.
    fn limit_installonly_packages(
        &self,
        pool: &Pool,
        solver: &Solver<'_>,
        kernel: Option<SolvableId>,
    ) -> Vec<Job> {
        let limit = self.sack.config().installonly_limit as usize;
        if limit == 0 {
            return Vec::new();
        }
        let mut jobs = Vec::new();
        for name in &self.sack.config().installonly {
            let Some(name_id) = pool.find_str(name) else {
                continue;
            };
            let present: Vec<SolvableId> = pool
                .whatprovides_name(name_id)
                .iter()
                .copied()
                .filter(|&id| solver.present(id))
                .collect();
            if present.len() <= limit {
                continue;
            }
            if !present.iter().any(|&id| !pool.is_installed(id)) {
                continue;
            }

            let mut groups: Vec<(StringId, Vec<SolvableId>)> = Vec::new();
            for id in present {
                let pkg_name = pool.solvable(id).name;
                match groups.iter_mut().find(|(name, _)| *name == pkg_name) {
                    Some((_, ids)) => ids.push(id),
                    None => groups.push((pkg_name, vec![id])),
                }
            }
            for (_, mut ids) in groups {
                if ids.len() <= limit {
                    continue;
                }
                ids.sort_by(|&a, &b| {
                    keep_rank(pool, a, kernel)
                        .cmp(&keep_rank(pool, b, kernel))
                        .then_with(|| {
                            pool.evrcmp(pool.solvable(b).evr, pool.solvable(a).evr)
                        })
                        .then_with(|| a.cmp(&b))
                });
                for (position, id) in ids.into_iter().enumerate() {
                    let action = if position < limit {
                        JobFlags::INSTALL
                    } else {
                        JobFlags::ERASE
                    };
                    jobs.push(Job::new(action, JobTarget::OneOf(vec![id])));
                }
            }
        }
        jobs
    }

    fn check_protected_in_removals(&mut self, kernel: Option<SolvableId>) -> Result<()> {
        if self.protected.is_none() && kernel.is_none() {
            return Ok(());
        }
        let Some(outcome) = &self.outcome else {
            return Ok(());
        };
        let mut removed: Vec<SolvableId> = outcome
            .plan
            .steps()
            .iter()
            .filter(|step| {
                matches!(
                    step.action,
                    TransactionItemAction::Remove | TransactionItemAction::Obsoleted
                )
            })
            .map(|step| step.id)
            .filter(|&id| {
                Some(id) == kernel
                    || self
                        .protected
                        .as_ref()
                        .is_some_and(|set| set.contains_id(id))
            })
            .collect();
        removed.sort_unstable();
        if removed.is_empty() {
            return Ok(());
        }
        self.removal_of_protected = removed;
        Err(Error::RemovalOfProtected(
            self.describe_protected_removal()
                .unwrap_or_else(|| "protected packages would be removed".into()),
        ))
    }

    /// The message of the synthetic protected-removal problem, when present.
    fn describe_protected_removal(&self) -> Option<String> {
        if self.removal_of_protected.is_empty() {
            return None;
        }
        let pool = self.sack.pool();
        let mut names: Vec<String> = Vec::new();
        for &id in &self.removal_of_protected {
            let name = pool.str_of(pool.solvable(id).name).to_owned();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Some(format!(
            "The operation would result in removing the following protected packages: {}",
            names.join(", ")
        ))
    }

    // --- results ----------------------------------------------------------

    fn plan_packages(&self, actions: &[TransactionItemAction]) -> Vec<Package<'a>> {
        let Some(outcome) = &self.outcome else {
            return Vec::new();
        };
        outcome
            .plan
            .steps()
            .iter()
            .filter(|step| actions.contains(&step.action))
            .map(|step| Package::new(self.sack, step.id))
            .collect()
    }

    /// Freshly installed packages, obsoleting installs included.
    pub fn list_installs(&self) -> Vec<Package<'a>> {
        self.plan_packages(&[
            TransactionItemAction::Install,
            TransactionItemAction::Obsolete,
        ])
    }

    /// Incoming halves of upgrades.
    pub fn list_upgrades(&self) -> Vec<Package<'a>> {
        self.plan_packages(&[TransactionItemAction::Upgrade])
    }

    /// Incoming halves of downgrades.
    pub fn list_downgrades(&self) -> Vec<Package<'a>> {
        self.plan_packages(&[TransactionItemAction::Downgrade])
    }

    /// Reinstalled packages.
    pub fn list_reinstalls(&self) -> Vec<Package<'a>> {
        self.plan_packages(&[TransactionItemAction::Reinstall])
    }

    /// Plain removals.
    pub fn list_erasures(&self) -> Vec<Package<'a>> {
        self.plan_packages(&[TransactionItemAction::Remove])
    }

    /// Packages leaving the system because something obsoletes them.
    pub fn list_obsoleted(&self) -> Vec<Package<'a>> {
        self.plan_packages(&[TransactionItemAction::Obsoleted])
    }

    /// The packages recorded as obsoleted by one incoming package.
    pub fn list_obsoleted_by_package(&self, package: &Package<'_>) -> Vec<Package<'a>> {
        let Some(outcome) = &self.outcome else {
            return Vec::new();
        };
        outcome
            .plan
            .obsoleted_by(package.id())
            .into_iter()
            .map(|id| Package::new(self.sack, id))
            .collect()
    }

    /// Every step of the plan, for execution and history recording.
    pub fn transaction_steps(&self) -> Vec<(Package<'a>, TransactionItemAction)> {
        let Some(outcome) = &self.outcome else {
            return Vec::new();
        };
        outcome
            .plan
            .steps()
            .iter()
            .map(|step| (Package::new(self.sack, step.id), step.action))
            .collect()
    }

    /// Why a package ends up in (or stays out of) the plan. `User` before the
    /// solver has run.
    pub fn get_reason(&self, package: &Package<'_>) -> TransactionItemReason {
        let Some(outcome) = &self.outcome else {
            return TransactionItemReason::User;
        };
        if outcome.cleandeps.contains(package.id()) {
            return TransactionItemReason::Clean;
        }
        match outcome.decision(package.id()) {
            Some(Decision {
                reason:
                    DecisionReason::Job { .. } | DecisionReason::JobErase { .. } | DecisionReason::Lock,
                ..
            }) => TransactionItemReason::User,
            Some(Decision {
                reason: DecisionReason::CleandepsErase,
                ..
            }) => TransactionItemReason::Clean,
            Some(Decision {
                reason: DecisionReason::WeakDep { .. },
                ..
            }) => TransactionItemReason::WeakDependency,
            _ => TransactionItemReason::Dependency,
        }
    }

    /// Installed packages that nothing user-installed (per the history store)
    /// needs.
    pub fn list_unneeded(&self, history: &History) -> Result<Vec<Package<'a>>> {
        let user_installed = crate::query::user_installed_ids(self.sack, history)?;
        let unneeded = crate::query::compute_unneeded(self.sack, user_installed)?;
        Ok(unneeded
            .into_iter()
            .map(|id| Package::new(self.sack, id))
            .collect())
    }

    /// Packages that can be removed without breaking anything user-installed.
    pub fn list_safe_to_remove(&self, history: &History) -> Result<Vec<Package<'a>>> {
        self.list_unneeded(history)
    }

    // --- problems ---------------------------------------------------------

    /// Solver problems plus the synthetic protected-removal problem.
    pub fn count_problems(&self) -> usize {
        let solver_problems = self
            .outcome
            .as_ref()
            .map(|outcome| outcome.problems.len())
            .unwrap_or(0);
        solver_problems + usize::from(!self.removal_of_protected.is_empty())
    }

    /// The deduplicated rule descriptions of one problem. `pkgs` selects the
    /// package wording over the module wording.
    pub fn describe_problem_rules(&self, index: usize, pkgs: bool) -> Vec<String> {
        if index >= self.count_problems() {
            return Vec::new();
        }
        if let Some(message) = self.describe_protected_removal() {
            return vec![message];
        }
        let Some(outcome) = &self.outcome else {
            return Vec::new();
        };
        let Some(problem) = outcome.problems.get(index) else {
            return Vec::new();
        };
        let pool = self.sack.pool();
        let module_excludes = self.sack.module_excludes();
        let mut output: Vec<String> = Vec::new();
        for rule in problem.rules() {
            let rendered = rule_to_string(&pool, rule, pkgs, module_excludes.as_ref());
            if !output.contains(&rendered) {
                output.push(rendered);
            }
        }
        output
    }

    /// All problems, rendered and deduplicated across problems.
    pub fn describe_all_problems(&self, pkgs: bool) -> Vec<Vec<String>> {
        let mut seen: Vec<Vec<String>> = Vec::new();
        for index in 0..self.count_problems() {
            let rules = self.describe_problem_rules(index, pkgs);
            if !rules.is_empty() && !seen.contains(&rules) {
                seen.push(rules);
            }
        }
        seen
    }

    /// Joins rendered problems into one report: a single problem gets the
    /// `Problem: ` prefix, several get numbered.
    pub fn format_all_problem_rules(problems: &[Vec<String>]) -> String {
        if problems.is_empty() {
            return String::new();
        }
        if problems.len() == 1 {
            return format!("Problem: {}", problems[0].join("\n  - "));
        }
        let mut output = String::new();
        for (index, problem) in problems.iter().enumerate() {
            if index > 0 {
                output.push_str("\n ");
            }
            output.push_str(&format!(
                "Problem {}: {}",
                index + 1,
                problem.join("\n  - ")
            ));
        }
        output
    }
}

fn keep_rank(pool: &Pool, id: SolvableId, kernel: Option<SolvableId>) -> u8 {
    if !pool.is_installed(id) {
        return 0;
    }
    if let Some(kernel) = kernel {
        if id == kernel
            || pool.solvable(id).evr == pool.solvable(kernel).evr
            || depends_on(pool, id, kernel)
        {
            return 1;
        }
    }
    2
}

// direct dependency only, the way kernel-devel style packages tie themselves
// to one kernel build
fn depends_on(pool: &Pool, id: SolvableId, target: SolvableId) -> bool {
    let solvable = pool.solvable(id);
    solvable
        .requires
        .iter()
        .chain(&solvable.prereq)
        .any(|&dep| {
            !pool.reldep(dep).is_rich() && pool.solvable_matches_dep(target, dep)
        })
}

fn rule_to_string(
    pool: &Pool,
    rule: &RuleInfo,
    pkgs: bool,
    module_excludes: Option<&PackageSet>,
) -> String {
    let unit = if pkgs { "package" } else { "module" };
    let solv = |id: SolvableId| pool.solvable_str(id);
    let dep = |id| pool.dep_to_string(id);
    match rule.kind {
        RuleKind::Distupgrade => format!(
            "{} does not belong to a distupgrade repository",
            solv(rule.source)
        ),
        RuleKind::Infarch => format!("{} has inferior architecture", solv(rule.source)),
        RuleKind::Update => format!("problem with installed {unit} {}", solv(rule.source)),
        RuleKind::Job => "conflicting requests".to_owned(),
        RuleKind::JobUnsupported => "unsupported request".to_owned(),
        RuleKind::JobNothingProvidesDep => {
            format!("nothing provides requested {}", dep(rule.dep))
        }
        RuleKind::JobUnknownPackage => format!("{unit} {} does not exist", dep(rule.dep)),
        RuleKind::JobProvidedBySystem => format!("{} is provided by the system", dep(rule.dep)),
        RuleKind::Pkg => "some dependency problem".to_owned(),
        RuleKind::BestUpdate => format!(
            "cannot install the best update candidate for {unit} {}",
            solv(rule.source)
        ),
        RuleKind::BestJob => "cannot install the best candidate for the job".to_owned(),
        RuleKind::PkgNotInstallableModular => {
            if pkgs {
                format!(
                    "package {} is filtered out by modular filtering",
                    solv(rule.source)
                )
            } else {
                format!("module {} is disabled", solv(rule.source))
            }
        }
        RuleKind::PkgNotInstallableArch => format!(
            "{unit} {} does not have a compatible architecture",
            solv(rule.source)
        ),
        RuleKind::PkgNotInstallableExcluded => {
            if pkgs {
                format!(
                    "package {} is filtered out by exclude filtering",
                    solv(rule.source)
                )
            } else {
                format!("module {} is disabled", solv(rule.source))
            }
        }
        RuleKind::PkgNotInstallable => {
            // refine: hidden by modular filtering, by excludes, or plainly
            // not installable
            let kind = if module_excludes.is_some_and(|set| set.contains_id(rule.source)) {
                RuleKind::PkgNotInstallableModular
            } else if !pool.is_visible(rule.source) {
                RuleKind::PkgNotInstallableExcluded
            } else {
                return format!("{unit} {} is not installable", solv(rule.source));
            };
            rule_to_string(
                pool,
                &RuleInfo {
                    kind,
                    ..*rule
                },
                pkgs,
                module_excludes,
            )
        }
        RuleKind::PkgNothingProvidesDep => format!(
            "nothing provides {} needed by {}",
            dep(rule.dep),
            solv(rule.source)
        ),
        RuleKind::PkgSameName => format!(
            "cannot install both {} and {}",
            solv(rule.source),
            solv(rule.target)
        ),
        RuleKind::PkgConflicts => format!(
            "{unit} {} conflicts with {} provided by {}",
            solv(rule.source),
            dep(rule.dep),
            solv(rule.target)
        ),
        RuleKind::PkgObsoletes => format!(
            "{unit} {} obsoletes {} provided by {}",
            solv(rule.source),
            dep(rule.dep),
            solv(rule.target)
        ),
        RuleKind::PkgInstalledObsoletes => format!(
            "installed {unit} {} obsoletes {} provided by {}",
            solv(rule.source),
            dep(rule.dep),
            solv(rule.target)
        ),
        RuleKind::PkgImplicitObsoletes => format!(
            "{unit} {} implicitly obsoletes {} provided by {}",
            solv(rule.source),
            dep(rule.dep),
            solv(rule.target)
        ),
        RuleKind::PkgRequires => format!(
            "{unit} {} requires {}, but none of the providers can be installed",
            solv(rule.source),
            dep(rule.dep)
        ),
        RuleKind::PkgSelfConflict => format!(
            "{unit} {} conflicts with {} provided by itself",
            solv(rule.source),
            dep(rule.dep)
        ),
        RuleKind::Yumobs => format!(
            "both {unit} {} and {} obsolete {}",
            solv(rule.source),
            solv(rule.target),
            dep(rule.dep)
        ),
    }
}

impl std::fmt::Debug for Goal<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Goal")
            .field("staged_jobs", &self.staged.len())
            .field("solved", &self.outcome.is_some())
            .finish()
    }
}
