use kestrel_rpm_types::{
    AdvisoryKind, AdvisoryPackage, AdvisoryRecord, AdvisoryReference, AdvisoryReferenceKind,
};

use crate::sack::Sack;

/// A read-only advisory view bound to a sack, so module gating can be
/// evaluated against the sack's module state.
pub struct Advisory<'a> {
    sack: &'a Sack,
    record: AdvisoryRecord,
}

impl<'a> Advisory<'a> {
    pub(crate) fn new(sack: &'a Sack, record: AdvisoryRecord) -> Self {
        Self { sack, record }
    }

    /// Advisory id, e.g. `FEDORA-2021-abcdef`.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Title line.
    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// Advisory classification.
    pub fn kind(&self) -> AdvisoryKind {
        self.record.kind
    }

    /// Severity string, empty when unrated.
    pub fn severity(&self) -> &str {
        &self.record.severity
    }

    /// Issue time, seconds since the epoch.
    pub fn issued(&self) -> i64 {
        self.record.issued
    }

    /// Bug, CVE and vendor references.
    pub fn references(&self) -> &[AdvisoryReference] {
        &self.record.references
    }

    /// Bug ids referenced by the advisory.
    pub fn bugs(&self) -> Vec<&str> {
        self.record
            .references
            .iter()
            .filter(|r| r.kind == AdvisoryReferenceKind::Bugzilla)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// CVE ids referenced by the advisory.
    pub fn cves(&self) -> Vec<&str> {
        self.record
            .references
            .iter()
            .filter(|r| r.kind == AdvisoryReferenceKind::Cve)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Whether at least one collection applies under the sack's module state.
    pub fn is_applicable(&self) -> bool {
        advisory_applicable(self.sack, &self.record)
    }

    /// The packages of all applicable collections.
    pub fn applicable_packages(&self) -> Vec<AdvisoryPackage> {
        applicable_packages(self.sack, &self.record)
    }
}

impl Sack {
    /// All advisories loaded from updateinfo extensions.
    pub fn advisories(&self) -> Vec<Advisory<'_>> {
        let records: Vec<AdvisoryRecord> = self.state().advisories.clone();
        records
            .into_iter()
            .map(|record| Advisory::new(self, record))
            .collect()
    }
}

pub(crate) fn advisory_applicable(sack: &Sack, record: &AdvisoryRecord) -> bool {
    record
        .collections
        .iter()
        .any(|collection| sack.is_module_applicable(&collection.module))
}

pub(crate) fn applicable_packages(sack: &Sack, record: &AdvisoryRecord) -> Vec<AdvisoryPackage> {
    record
        .collections
        .iter()
        .filter(|collection| sack.is_module_applicable(&collection.module))
        .flat_map(|collection| collection.packages.iter().cloned())
        .collect()
}
