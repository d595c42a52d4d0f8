//! Typed descriptions of why a solve failed. The goal layer renders these
//! through its string tables; nothing here formats user-visible text beyond
//! package and dependency names.

use crate::id::{ReldepId, SolvableId};

/// The rule behind one line of a problem description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Conflicting requests between jobs.
    Job,
    /// A request that the solver does not support.
    JobUnsupported,
    /// Nothing provides the requested relation.
    JobNothingProvidesDep,
    /// The requested package name does not exist.
    JobUnknownPackage,
    /// The requested relation is provided by the system solvable.
    JobProvidedBySystem,
    /// Generic dependency problem marker.
    Pkg,
    /// The package is masked by exclude filtering.
    PkgNotInstallableExcluded,
    /// The package is masked by modular filtering.
    PkgNotInstallableModular,
    /// The package arch is not installable on this system.
    PkgNotInstallableArch,
    /// The package is not installable for another reason.
    PkgNotInstallable,
    /// Nothing provides a dependency of the package.
    PkgNothingProvidesDep,
    /// Providers exist but none can be installed.
    PkgRequires,
    /// Two packages of the same name cannot be installed together.
    PkgSameName,
    /// The package conflicts with something present.
    PkgConflicts,
    /// The package obsoletes something present.
    PkgObsoletes,
    /// An installed package obsoletes the candidate.
    PkgInstalledObsoletes,
    /// Same-name implicit obsolete.
    PkgImplicitObsoletes,
    /// The package conflicts with one of its own provides.
    PkgSelfConflict,
    /// A problem with an installed package's update path.
    Update,
    /// The package does not belong to a distupgrade repository.
    Distupgrade,
    /// The package has inferior architecture.
    Infarch,
    /// The best candidate for an update cannot be installed.
    BestUpdate,
    /// The best candidate for a job cannot be installed.
    BestJob,
    /// Two packages obsolete the same relation.
    Yumobs,
}

/// One `(type, source, target, dep)` quadruple of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleInfo {
    /// What kind of rule fired.
    pub kind: RuleKind,
    /// The solvable the rule is about, when any.
    pub source: SolvableId,
    /// The other solvable involved, when any.
    pub target: SolvableId,
    /// The relation involved, when any.
    pub dep: ReldepId,
}

impl RuleInfo {
    pub(crate) fn job() -> Self {
        Self {
            kind: RuleKind::Job,
            source: SolvableId::none(),
            target: SolvableId::none(),
            dep: ReldepId::none(),
        }
    }

    pub(crate) fn with_dep(kind: RuleKind, dep: ReldepId) -> Self {
        Self {
            kind,
            source: SolvableId::none(),
            target: SolvableId::none(),
            dep,
        }
    }

    pub(crate) fn with_source(kind: RuleKind, source: SolvableId) -> Self {
        Self {
            kind,
            source,
            target: SolvableId::none(),
            dep: ReldepId::none(),
        }
    }

    pub(crate) fn full(
        kind: RuleKind,
        source: SolvableId,
        target: SolvableId,
        dep: ReldepId,
    ) -> Self {
        Self {
            kind,
            source,
            target,
            dep,
        }
    }
}

/// One unsatisfiable part of a solve: the set of rules that together cannot
/// hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problem {
    rules: Vec<RuleInfo>,
}

impl Problem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, rule: RuleInfo) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// The rules of this problem, in discovery order, deduplicated.
    pub fn rules(&self) -> &[RuleInfo] {
        &self.rules
    }
}
