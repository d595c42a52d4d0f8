#![deny(missing_docs)]

//! `kestrel_solve` is the solver layer of the kestrel package-management core:
//! the id pool with its interned strings, relations and solvables, the dense
//! bitmap used for package sets, the job vocabulary of the goal layer, and a
//! deterministic dependency resolver that turns jobs into a plan or a list of
//! typed problems.
//!
//! The resolver is a substitutable backend: the goal layer in the `kestrel`
//! crate only consumes the job/plan/problem/decision contract exposed here.

mod id;
mod jobs;
mod map;
mod pool;
mod problem;
mod reldep;
mod solvable;
mod solver;
mod transaction;

pub use id::{ReldepId, RepoId, SolvableId, StringId};
pub use jobs::{Job, JobFlags, JobTarget};
pub use map::Map;
pub use pool::{Pool, PoolRepo};
pub use problem::{Problem, RuleInfo, RuleKind};
pub use reldep::{DepFlags, Reldep};
pub use solvable::Solvable;
pub use solver::{Decision, DecisionReason, SolveOutcome, Solver, SolverFlags};
pub use transaction::{Plan, PlanStep};
