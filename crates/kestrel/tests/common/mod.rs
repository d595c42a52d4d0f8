#![allow(dead_code)]

use kestrel::rpm_types::{Nevra, RpmRecord};
use kestrel::{checksum_bytes, LoadFlags, RepoMetadata, Sack, SackConfig, SystemState};

/// Builds a record from a NEVRA string and `(kind, dep)` pairs, where kind is
/// one of requires/provides/conflicts/obsoletes/recommends.
pub fn record(nevra: &str, deps: &[(&str, &str)]) -> RpmRecord {
    let nevra = Nevra::parse(nevra).expect("fixture nevra");
    let mut record = RpmRecord {
        name: nevra.name,
        epoch: nevra.epoch,
        version: nevra.version,
        release: nevra.release,
        arch: nevra.arch,
        ..RpmRecord::default()
    };
    for (kind, dep) in deps {
        let dep = (*dep).to_owned();
        match *kind {
            "requires" => record.requires.push(dep),
            "provides" => record.provides.push(dep),
            "conflicts" => record.conflicts.push(dep),
            "obsoletes" => record.obsoletes.push(dep),
            "recommends" => record.recommends.push(dep),
            other => panic!("unknown dep kind {other}"),
        }
    }
    record
}

pub fn test_config() -> SackConfig {
    SackConfig::new()
        .cachedir(tempfile::tempdir().expect("tempdir").keep())
        .all_arch(true)
}

/// A sack with a system repo (when `installed` is non-empty) and a `main`
/// repo (when `available` is non-empty).
pub fn sack_with(installed: &[RpmRecord], available: &[RpmRecord]) -> Sack {
    sack_with_config(test_config(), installed, available)
}

pub fn sack_with_config(
    config: SackConfig,
    installed: &[RpmRecord],
    available: &[RpmRecord],
) -> Sack {
    let mut sack = Sack::new(config);
    if !installed.is_empty() {
        sack.load_system_repo(SystemState {
            records: installed.to_vec(),
        })
        .expect("system repo");
    }
    if !available.is_empty() {
        sack.load_repo(
            RepoMetadata::new("main", checksum_bytes(b"main fixture"), available.to_vec()),
            LoadFlags::empty(),
        )
        .expect("main repo");
    }
    sack
}

/// Sorted package names of a result list.
pub fn names(packages: &[kestrel::Package<'_>]) -> Vec<String> {
    let mut names: Vec<String> = packages.iter().map(|p| p.name()).collect();
    names.sort();
    names
}

/// Sorted NEVRA renderings of a result list.
pub fn nevras(packages: &[kestrel::Package<'_>]) -> Vec<String> {
    let mut nevras: Vec<String> = packages.iter().map(|p| p.to_string()).collect();
    nevras.sort();
    nevras
}
