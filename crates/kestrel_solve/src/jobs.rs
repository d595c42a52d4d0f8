//! The job queue handed to the solver: what the caller wants to happen.

use bitflags::bitflags;

use crate::id::{ReldepId, SolvableId, StringId};

bitflags! {
    /// Action and modifier bits of a [`Job`]. Exactly one action bit is set per
    /// job; modifiers refine it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JobFlags: u32 {
        /// Install the selected packages (or one of them).
        const INSTALL = 1 << 0;
        /// Erase the selected packages.
        const ERASE = 1 << 1;
        /// Update the installed packages the selection covers.
        const UPDATE = 1 << 2;
        /// Follow the repository even onto lower versions.
        const DISTUPGRADE = 1 << 3;
        /// Check installed dependency closure and report breakage.
        const VERIFY = 1 << 4;
        /// Freeze the current state of the selected packages.
        const LOCK = 1 << 5;
        /// Prefer the selected solvable among its name peers.
        const FAVOR = 1 << 6;
        /// Prefer any other candidate over the selected solvable.
        const DISFAVOR = 1 << 7;
        /// Allow the selection to be installed next to other versions of the
        /// same name instead of implicitly obsoleting them.
        const MULTIVERSION = 1 << 8;
        /// The selected installed packages may be removed to reach a solution.
        const ALLOWUNINSTALL = 1 << 9;
        /// Mark the selection as user-installed for unneeded computation.
        const USERINSTALLED = 1 << 10;

        /// The job may be dropped if it cannot be satisfied.
        const WEAK = 1 << 16;
        /// Fail instead of settling for a non-best candidate.
        const FORCEBEST = 1 << 17;
        /// Erase no-longer-needed dependencies along with the selection.
        const CLEANDEPS = 1 << 18;
        /// The selection names an explicit version (no implicit updates).
        const TARGETED = 1 << 19;
        /// The selection pins the EVR.
        const SET_EVR = 1 << 20;
        /// The selection pins the arch.
        const SET_ARCH = 1 << 21;
    }
}

impl JobFlags {
    const ACTION_MASK: JobFlags = JobFlags::INSTALL
        .union(JobFlags::ERASE)
        .union(JobFlags::UPDATE)
        .union(JobFlags::DISTUPGRADE)
        .union(JobFlags::VERIFY)
        .union(JobFlags::LOCK)
        .union(JobFlags::FAVOR)
        .union(JobFlags::DISFAVOR)
        .union(JobFlags::MULTIVERSION)
        .union(JobFlags::ALLOWUNINSTALL)
        .union(JobFlags::USERINSTALLED);

    /// The action bits of this flag set.
    pub fn action(self) -> JobFlags {
        self & Self::ACTION_MASK
    }
}

/// What a job applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    /// A single concrete solvable.
    Solvable(SolvableId),
    /// Every solvable with the given name.
    Name(StringId),
    /// Every solvable providing the relation.
    Provides(ReldepId),
    /// An explicit candidate set; the action applies to one (install) or all
    /// (erase, lock, ...) of them.
    OneOf(Vec<SolvableId>),
    /// Every package solvable.
    All,
}

/// One solver job: an action, its modifiers and a target selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Action and modifier bits.
    pub flags: JobFlags,
    /// Target selection.
    pub target: JobTarget,
}

impl Job {
    /// Constructs a job.
    pub fn new(flags: JobFlags, target: JobTarget) -> Self {
        Self { flags, target }
    }

    /// The action bits of this job.
    pub fn action(&self) -> JobFlags {
        self.flags.action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_extraction_ignores_modifiers() {
        let job = Job::new(
            JobFlags::INSTALL | JobFlags::WEAK | JobFlags::SET_EVR,
            JobTarget::Solvable(SolvableId::none()),
        );
        assert_eq!(job.action(), JobFlags::INSTALL);
    }
}
