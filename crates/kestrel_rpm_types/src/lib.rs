#![deny(missing_docs)]

//! `kestrel_rpm_types` is a crate that provides data types for common concepts of the
//! RPM ecosystem: EVR version triples and their total order, NEVRA package
//! identifiers, architecture compatibility, decoded repository metadata records and
//! the transaction vocabulary shared between the resolver and the history store.
//!
//! The crate is dependency-light on purpose; the heavier machinery (package sack,
//! query engine, goal driver) lives in the `kestrel` crate and builds on these
//! types.

mod arch;
mod evr;
mod nevra;
mod record;
mod transaction;

pub use arch::{basearch, is_arch_compatible, NOARCH, SRC_ARCHES};
pub use evr::{compare_evr, vercmp, Evr};
pub use nevra::{Nevra, ParseNevraError};
pub use record::{
    AdvisoryCollection, AdvisoryKind, AdvisoryPackage, AdvisoryRecord, AdvisoryReference,
    AdvisoryReferenceKind, DeltaRecord, RpmRecord,
};
pub use transaction::{TransactionItemAction, TransactionItemReason, TransactionState};
