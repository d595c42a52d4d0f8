mod common;

use common::{names, record, sack_with, sack_with_config, test_config};
use kestrel::rpm_types::{DeltaRecord, Nevra, RpmRecord};
use kestrel::{
    checksum_bytes, CmpFlags, LoadFlags, PackageSet, Query, QueryKey, RepoMetadata, Sack,
    SackConfig, SystemState,
};

fn with_checksum(mut record: RpmRecord, checksum: &str) -> RpmRecord {
    record.header_checksum = Some(checksum.to_owned());
    record
}

#[test]
fn fingerprint_counts_packages_and_ignores_order() {
    let a = with_checksum(record("a-1-1.x86_64", &[]), "aaaa");
    let b = with_checksum(record("b-1-1.x86_64", &[]), "bbbb");

    let mut sack1 = Sack::new(test_config());
    sack1
        .load_system_repo(SystemState {
            records: vec![a.clone(), b.clone()],
        })
        .unwrap();
    let mut sack2 = Sack::new(test_config());
    sack2
        .load_system_repo(SystemState {
            records: vec![b, a],
        })
        .unwrap();

    let fp1 = sack1.rpmdb_version().unwrap();
    let fp2 = sack2.rpmdb_version().unwrap();
    assert_eq!(fp1, fp2);
    assert!(fp1.starts_with("2:"));
    // sha1 renders as 40 hex characters
    assert_eq!(fp1.len(), 2 + 40);
}

#[test]
fn fingerprint_skips_gpg_pubkey() {
    let mut sack = Sack::new(test_config());
    sack.load_system_repo(SystemState {
        records: vec![
            with_checksum(record("a-1-1.x86_64", &[]), "aaaa"),
            with_checksum(record("gpg-pubkey-1-1.noarch", &[]), "cccc"),
        ],
    })
    .unwrap();
    assert!(sack.rpmdb_version().unwrap().starts_with("1:"));
}

#[test]
fn valid_cache_is_used_instead_of_primary_records() {
    let cachedir = tempfile::tempdir().unwrap().keep();
    let checksum = checksum_bytes(b"metadata revision 1");
    let records = vec![record("walrus-2-5.noarch", &[])];

    let config = SackConfig::new().cachedir(cachedir.clone()).all_arch(true);
    let mut sack = Sack::new(config.clone());
    sack.load_repo(
        RepoMetadata::new("fedora", checksum, records),
        LoadFlags::empty(),
    )
    .unwrap();
    assert_eq!(sack.package_count(), 1);

    // same checksum, no primary records: the cache must provide them
    let mut sack = Sack::new(config.clone());
    sack.load_repo(
        RepoMetadata::new("fedora", checksum, Vec::new()),
        LoadFlags::empty(),
    )
    .unwrap();
    assert_eq!(sack.package_count(), 1);

    // a new metadata revision invalidates the cache
    let mut sack = Sack::new(config);
    sack.load_repo(
        RepoMetadata::new("fedora", checksum_bytes(b"metadata revision 2"), Vec::new()),
        LoadFlags::empty(),
    )
    .unwrap();
    assert_eq!(sack.package_count(), 0);
}

#[test]
fn loading_the_same_repo_twice_fails() {
    let mut sack = sack_with(&[], &[record("a-1-1.noarch", &[])]);
    let err = sack
        .load_repo(
            RepoMetadata::new("main", checksum_bytes(b"main fixture"), Vec::new()),
            LoadFlags::empty(),
        )
        .unwrap_err();
    assert!(matches!(err, kestrel::Error::Internal(_)));
}

#[test]
fn disabled_repo_stops_contributing() {
    let mut sack = sack_with(&[], &[record("walrus-2-5.noarch", &[])]);
    sack.set_repo_enabled("main", false).unwrap();
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
        .unwrap();
    assert!(query.is_empty());

    sack.set_repo_enabled("main", true).unwrap();
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
        .unwrap();
    assert_eq!(query.size(), 1);
}

#[test]
fn includes_constrain_only_repos_that_honour_them() {
    let mut sack = sack_with(
        &[record("inst-1-1.x86_64", &[])],
        &[record("allowed-1-1.noarch", &[]), record("hidden-1-1.noarch", &[])],
    );
    let allowed_id = {
        let mut query = Query::new(&sack);
        query
            .filter_str(QueryKey::Name, CmpFlags::EQ, &["allowed"])
            .unwrap();
        query.run()[0].id()
    };
    let mut includes = PackageSet::new(&sack);
    includes.add_id(allowed_id);
    sack.set_pkg_includes(&includes);

    let mut query = Query::new(&sack);
    // the system repo ignores include lists, the main repo honours them
    assert_eq!(names(&query.run()), vec!["allowed", "inst"]);

    sack.set_use_includes("main", false).unwrap();
    let mut query = Query::new(&sack);
    assert_eq!(names(&query.run()), vec!["allowed", "hidden", "inst"]);
}

#[test]
fn cmdline_packages_land_in_their_own_repo() {
    let mut sack = sack_with(&[], &[record("other-1-1.noarch", &[])]);
    let package = sack
        .add_cmdline_package(record("adhoc-3-1.x86_64", &[]))
        .unwrap();
    assert_eq!(package.reponame(), "@commandline");

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Reponame, CmpFlags::EQ, &["@commandline"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["adhoc"]);
}

#[test]
fn filelists_extension_backs_file_queries() {
    let mut sack = Sack::new(test_config());
    let mut metadata = RepoMetadata::new(
        "main",
        checksum_bytes(b"main fixture"),
        vec![record("coreutils-9-1.x86_64", &[])],
    );
    metadata.filelists = Some(vec![(
        Nevra::parse("coreutils-9-1.x86_64").unwrap(),
        vec!["/usr/bin/env".into(), "/usr/bin/true".into()],
    )]);
    sack.load_repo(metadata, LoadFlags::USE_FILELISTS).unwrap();

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::File, CmpFlags::EQ, &["/usr/bin/env"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["coreutils"]);

    // trailing slashes are stripped before matching
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::File, CmpFlags::EQ, &["/usr/bin/true/"])
        .unwrap();
    assert_eq!(query.size(), 1);
}

#[test]
fn presto_extension_is_kept_per_repo() {
    let mut sack = Sack::new(test_config());
    let mut metadata = RepoMetadata::new(
        "main",
        checksum_bytes(b"main fixture"),
        vec![record("foo-2-1.x86_64", &[])],
    );
    metadata.presto = Some(vec![DeltaRecord {
        name: "foo".into(),
        epoch: 0,
        version: "2".into(),
        release: "1".into(),
        arch: "x86_64".into(),
        base_evr: "1-1".into(),
        sequence: "foo-1-1-to-2-1".into(),
        location: "drpms/foo.drpm".into(),
        download_size: 1024,
    }]);
    sack.load_repo(metadata, LoadFlags::USE_PRESTO).unwrap();

    let deltas = sack.repo_deltas("main");
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].nevra().to_string(), "foo-2-1.x86_64");
}

#[test]
fn missing_optional_extension_degrades_to_a_warning() {
    let mut sack = Sack::new(test_config());
    let metadata = RepoMetadata::new(
        "main",
        checksum_bytes(b"main fixture"),
        vec![record("a-1-1.noarch", &[])],
    );
    // no filelists anywhere: the load must still succeed
    sack.load_repo(metadata, LoadFlags::USE_FILELISTS).unwrap();
    assert_eq!(sack.package_count(), 1);
}

#[test]
fn arch_filtering_skips_foreign_arches() {
    let config = SackConfig::new()
        .cachedir(tempfile::tempdir().unwrap().keep())
        .arch("x86_64");
    let mut sack = Sack::new(config);
    sack.load_repo(
        RepoMetadata::new(
            "main",
            checksum_bytes(b"main fixture"),
            vec![
                record("native-1-1.x86_64", &[]),
                record("everywhere-1-1.noarch", &[]),
                record("foreign-1-1.s390x", &[]),
            ],
        ),
        LoadFlags::empty(),
    )
    .unwrap();
    let mut query = Query::new(&sack);
    assert_eq!(names(&query.run()), vec!["everywhere", "native"]);
}

#[test]
fn running_kernel_is_disabled_outside_the_root() {
    let config = sack_config_with_root("/mnt/sysroot");
    let mut sack = sack_with_config(config, &[record("k-1-1.x86_64", &[])], &[]);
    sack.set_running_kernel_resolver(Box::new(|pool: &kestrel::solve::Pool| {
        pool.pkg_ids().next()
    }));
    assert!(sack.running_kernel().is_none());
}

fn sack_config_with_root(root: &str) -> SackConfig {
    test_config().rootdir(root)
}
