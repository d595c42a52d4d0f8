#![deny(missing_docs)]

//! `kestrel` is the core of a package-management library for RPM-based
//! distributions: an in-memory catalogue of package solvables (the sack) with
//! exclude/include overlays and repository layering, a composable query
//! engine over it, selectors that narrow queries into goal targets, and a
//! goal driver that resolves user intents into a concrete transaction plan
//! honouring dependencies, obsoletes, conflicts, protected packages and
//! installonly limits.
//!
//! Repository metadata decoding, fetching, signature checking and rpm file
//! I/O are external collaborators: they hand decoded records to
//! [`Sack::load_repo`], [`Sack::load_system_repo`] and
//! [`Sack::add_cmdline_package`]. The transaction history lives in the
//! `kestrel_history` crate; the resolver lives in `kestrel_solve`.
//!
//! Everything around one sack is single-threaded: queries, goals and package
//! views borrow the sack and must not outlive it.

mod advisory;
mod cache;
mod config;
mod errors;
mod goal;
mod package;
mod package_set;
mod query;
mod repo;
mod sack;
mod selector;

pub use advisory::Advisory;
pub use cache::{checksum_bytes, ext_cache_path, main_cache_path, CHECKSUM_BYTES};
pub use config::SackConfig;
pub use errors::{Error, Result};
pub use goal::{EraseFlags, Goal, GoalRunFlags};
pub use package::Package;
pub use package_set::PackageSet;
pub use query::{CmpFlags, FilterMatch, Query, QueryFlags, QueryKey};
pub use repo::{LoadFlags, RepoInfo, RepoMetadata, SystemState, CMDLINE_REPO_NAME, SYSTEM_REPO_NAME};
pub use sack::{KernelResolver, Sack};
pub use selector::Selector;

pub use kestrel_history as history;
pub use kestrel_rpm_types as rpm_types;
pub use kestrel_solve as solve;
