mod common;

use common::{names, nevras, record, sack_with};
use kestrel::rpm_types::{
    AdvisoryCollection, AdvisoryKind, AdvisoryPackage, AdvisoryRecord, RpmRecord,
};
use kestrel::{
    checksum_bytes, CmpFlags, Error, LoadFlags, PackageSet, Query, QueryFlags, QueryKey,
    RepoMetadata,
};

fn foo_versions() -> Vec<RpmRecord> {
    vec![
        record("foo-1-1.i686", &[]),
        record("foo-2-1.i686", &[]),
        record("foo-1-1.x86_64", &[]),
        record("foo-2-1.x86_64", &[]),
        record("foo-3-1.x86_64", &[]),
    ]
}

#[test]
fn name_filters_exact_glob_and_icase() {
    let sack = sack_with(
        &[],
        &[
            record("walrus-2-5.noarch", &[]),
            record("walnut-1-1.noarch", &[]),
            record("penny-4-1.noarch", &[]),
        ],
    );

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["walrus"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::GLOB, &["wal*"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["walnut", "walrus"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ | CmpFlags::ICASE, &["WALRUS"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["walrus"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ | CmpFlags::NOT, &["penny"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["walnut", "walrus"]);
}

#[test]
fn filters_apply_in_insertion_order_and_reopen() {
    let sack = sack_with(
        &[],
        &[
            record("walrus-2-5.noarch", &[]),
            record("walrus-3-1.noarch", &[]),
            record("walnut-1-1.noarch", &[]),
        ],
    );
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::GLOB, &["wal*"])
        .unwrap();
    query.apply();
    assert_eq!(query.size(), 3);

    // refining an applied query intersects with the previous result
    query
        .filter_str(QueryKey::Evr, CmpFlags::GT, &["2-5"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["walrus-3-1.noarch"]);

    // apply is idempotent
    query.apply();
    query.apply();
    assert_eq!(query.size(), 1);
}

#[test]
fn evr_version_and_epoch_comparisons() {
    let sack = sack_with(
        &[],
        &[
            record("a-1:1.0-1.noarch", &[]),
            record("a-2.0-1.noarch", &[]),
            record("a-2.5-1.noarch", &[]),
        ],
    );
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Version, CmpFlags::GT, &["2.0"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["a-2.5-1.noarch"]);

    let mut query = Query::new(&sack);
    query.filter_num(QueryKey::Epoch, CmpFlags::GT, &[0]).unwrap();
    assert_eq!(nevras(&query.run()), vec!["a-1:1.0-1.noarch"]);

    // the epoch dominates the EVR order
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Evr, CmpFlags::GT, &["2.5-1"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["a-1:1.0-1.noarch"]);
}

#[test]
fn nevra_filters() {
    let sack = sack_with(&[], &foo_versions());
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Nevra, CmpFlags::EQ, &["foo-2-1.x86_64"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["foo-2-1.x86_64"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Nevra, CmpFlags::GLOB, &["foo-?-1.i686"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["foo-1-1.i686", "foo-2-1.i686"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::NevraStrict, CmpFlags::EQ, &["foo-3-1.x86_64"])
        .unwrap();
    assert_eq!(query.size(), 1);
}

#[test]
fn provides_and_requires_reldep_filters() {
    let sack = sack_with(
        &[],
        &[
            record(
                "server-1-1.x86_64",
                &[("provides", "webserver = 1"), ("requires", "libhttp >= 2")],
            ),
            record("libhttp-3-1.x86_64", &[]),
            record("other-1-1.x86_64", &[]),
        ],
    );
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Provides, CmpFlags::EQ, &["webserver"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["server"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Requires, CmpFlags::EQ, &["libhttp >= 2"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["server"]);

    // glob patterns match capability names
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Provides, CmpFlags::GLOB, &["web*"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["server"]);
}

#[test]
fn latest_per_arch_keeps_the_top_version_of_each_arch() {
    let sack = sack_with(&[], &foo_versions());
    let mut query = Query::new(&sack);
    query.filter_latest_per_arch(1).unwrap();
    assert_eq!(
        nevras(&query.run()),
        vec!["foo-2-1.i686", "foo-3-1.x86_64"]
    );
}

#[test]
fn latest_with_negative_count_drops_the_top_versions() {
    let sack = sack_with(&[], &foo_versions());
    let mut query = Query::new(&sack);
    query.filter_latest(-1).unwrap();
    // everything but the newest version per name
    assert_eq!(
        nevras(&query.run()),
        vec![
            "foo-1-1.i686",
            "foo-1-1.x86_64",
            "foo-2-1.i686",
            "foo-2-1.x86_64"
        ]
    );
}

#[test]
fn upgradable_and_upgrades() {
    let sack = sack_with(
        &[record("foo-1-1.x86_64", &[]), record("bar-1-1.x86_64", &[])],
        &[record("foo-2-1.x86_64", &[])],
    );
    let mut query = Query::new(&sack);
    query
        .filter_num(QueryKey::Upgradable, CmpFlags::EQ, &[1])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["foo-1-1.x86_64"]);

    let mut query = Query::new(&sack);
    query
        .filter_num(QueryKey::Upgrades, CmpFlags::EQ, &[1])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["foo-2-1.x86_64"]);
}

#[test]
fn downgradable_and_downgrades() {
    let sack = sack_with(
        &[record("foo-2-1.x86_64", &[])],
        &[record("foo-1-1.x86_64", &[])],
    );
    let mut query = Query::new(&sack);
    query
        .filter_num(QueryKey::Downgradable, CmpFlags::EQ, &[1])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["foo-2-1.x86_64"]);

    let mut query = Query::new(&sack);
    query
        .filter_num(QueryKey::Downgrades, CmpFlags::EQ, &[1])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["foo-1-1.x86_64"]);
}

#[test]
fn reponame_filter_selects_a_repo() {
    let sack = sack_with(
        &[record("inst-1-1.x86_64", &[])],
        &[record("avail-1-1.x86_64", &[])],
    );
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Reponame, CmpFlags::EQ, &["@System"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["inst"]);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Reponame, CmpFlags::EQ | CmpFlags::NOT, &["@System"])
        .unwrap();
    assert_eq!(names(&query.run()), vec!["avail"]);
}

#[test]
fn extras_and_duplicated() {
    let sack = sack_with(
        &[
            record("kept-1-1.x86_64", &[]),
            record("gone-1-1.x86_64", &[]),
            record("dup-1-1.x86_64", &[]),
            record("dup-2-1.x86_64", &[]),
        ],
        &[record("kept-1-1.x86_64", &[])],
    );
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Reponame, CmpFlags::EQ, &["@System"])
        .unwrap();
    query.filter_extras();
    assert_eq!(names(&query.run()), vec!["dup", "dup", "gone"]);

    let mut query = Query::new(&sack);
    query.filter_duplicated();
    assert_eq!(
        nevras(&query.run()),
        vec!["dup-1-1.x86_64", "dup-2-1.x86_64"]
    );
}

#[test]
fn excludes_hide_packages_and_can_be_ignored() {
    let mut sack = sack_with(&[], &[record("walrus-2-5.noarch", &[])]);
    let walrus_id = {
        let mut query = Query::new(&sack);
        query
            .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
            .unwrap();
        query.run()[0].id()
    };
    let mut excludes = PackageSet::new(&sack);
    excludes.add_id(walrus_id);
    sack.add_pkg_excludes(&excludes);

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
        .unwrap();
    assert!(query.is_empty());

    // ignoring excludes still sees it
    let mut query = Query::with_flags(&sack, QueryFlags::IGNORE_EXCLUDES);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
        .unwrap();
    assert_eq!(query.size(), 1);

    // removing the exclude restores visibility
    sack.remove_pkg_excludes(&excludes);
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &["walrus"])
        .unwrap();
    assert_eq!(query.size(), 1);
}

#[test]
fn module_and_repo_excludes_can_be_lifted_individually() {
    let mut sack = sack_with(
        &[],
        &[
            record("walrus-2-5.noarch", &[]),
            record("walnut-1-1.noarch", &[]),
        ],
    );
    let (walrus_id, walnut_id) = {
        let mut query = Query::new(&sack);
        query
            .filter_str(QueryKey::Name, CmpFlags::GLOB, &["wal*"])
            .unwrap();
        let packages = query.run();
        (packages[0].id(), packages[1].id())
    };
    let mut both = PackageSet::new(&sack);
    both.add_id(walrus_id);
    both.add_id(walnut_id);
    let mut walrus_only = PackageSet::new(&sack);
    walrus_only.add_id(walrus_id);

    sack.set_module_excludes(&both);
    let mut query = Query::new(&sack);
    assert!(query.is_empty());

    // lifting one modular exclusion leaves the other in place
    sack.remove_module_excludes(&walrus_only);
    assert_eq!(sack.module_excludes().unwrap().len(), 1);
    let mut query = Query::new(&sack);
    assert_eq!(names(&query.run()), vec!["walrus"]);
    sack.reset_module_excludes();

    // repo-level excludes behave the same way
    sack.set_repo_excludes(&both);
    assert_eq!(sack.repo_excludes().unwrap().len(), 2);
    let mut query = Query::new(&sack);
    assert!(query.is_empty());

    sack.remove_repo_excludes(&walrus_only);
    assert_eq!(sack.repo_excludes().unwrap().len(), 1);
    let mut query = Query::new(&sack);
    assert_eq!(names(&query.run()), vec!["walrus"]);
}

#[test]
fn set_algebra_laws() {
    let sack = sack_with(&[], &foo_versions());
    let mut all = Query::new(&sack);
    all.apply();
    let size = all.size();

    let mut a = all.clone();
    let mut b = all.clone();
    a.union(&mut b).unwrap();
    assert_eq!(a.size(), size);

    let mut complement = Query::new(&sack);
    complement
        .filter_str(QueryKey::Name, CmpFlags::EQ | CmpFlags::NOT, &["foo"])
        .unwrap();
    let mut intersection = all.clone();
    intersection.union(&mut complement).unwrap();
    let mut empty = all.clone();
    let mut complement2 = complement.clone();
    empty.intersection(&mut complement2).unwrap();
    let _ = intersection;
    assert_eq!(empty.size(), 0);
}

#[test]
fn invalid_triples_are_bad_queries() {
    let sack = sack_with(&[], &[record("a-1-1.noarch", &[])]);
    let mut query = Query::new(&sack);
    assert!(matches!(
        query.filter_str(QueryKey::Location, CmpFlags::GLOB, &["/x*"]),
        Err(Error::BadQuery(_))
    ));
    assert!(matches!(
        query.filter_num(QueryKey::Name, CmpFlags::EQ, &[1]),
        Err(Error::BadQuery(_))
    ));
    assert!(matches!(
        query.filter_str(QueryKey::Name, CmpFlags::GT, &["a"]),
        Err(Error::BadQuery(_))
    ));
}

fn advisory_fixture(module: &str) -> AdvisoryRecord {
    AdvisoryRecord {
        id: "FEDORA-2021-db1".into(),
        title: "perl-DBI enhancement".into(),
        kind: AdvisoryKind::Enhancement,
        severity: "None".into(),
        issued: 1620000000,
        description: String::new(),
        references: Vec::new(),
        collections: vec![AdvisoryCollection {
            module: module.to_owned(),
            packages: vec![AdvisoryPackage {
                name: "perl-DBI".into(),
                evr: "1-2".into(),
                arch: "x86_64".into(),
                filename: String::new(),
            }],
        }],
    }
}

#[test]
fn advisory_type_filter_honours_module_gating() {
    let mut sack = sack_with(&[], &[]);
    let mut metadata = RepoMetadata::new(
        "updates",
        checksum_bytes(b"updates fixture"),
        vec![record("perl-DBI-1-2.x86_64", &[])],
    );
    metadata.updateinfo = Some(vec![advisory_fixture("perl-DBI:master")]);
    sack.load_repo(metadata, LoadFlags::USE_UPDATEINFO).unwrap();

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::AdvisoryType, CmpFlags::EQ, &["enhancement"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["perl-DBI-1-2.x86_64"]);

    // disabling the gating module empties the result
    sack.set_module_enabled("perl-DBI:master", false);
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::AdvisoryType, CmpFlags::EQ, &["enhancement"])
        .unwrap();
    assert!(query.is_empty());
}

#[test]
fn advisory_id_and_evr_comparison() {
    let mut sack = sack_with(&[], &[]);
    let mut metadata = RepoMetadata::new(
        "updates",
        checksum_bytes(b"updates fixture"),
        vec![
            record("perl-DBI-1-1.x86_64", &[]),
            record("perl-DBI-1-2.x86_64", &[]),
        ],
    );
    metadata.updateinfo = Some(vec![advisory_fixture("")]);
    sack.load_repo(metadata, LoadFlags::USE_UPDATEINFO).unwrap();

    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Advisory, CmpFlags::EQ, &["FEDORA-2021-db1"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["perl-DBI-1-2.x86_64"]);

    // packages older than the advisory-listed EVR
    let mut query = Query::new(&sack);
    query
        .filter_str(QueryKey::Advisory, CmpFlags::LT, &["FEDORA-2021-db1"])
        .unwrap();
    assert_eq!(nevras(&query.run()), vec!["perl-DBI-1-1.x86_64"]);
}

#[test]
fn empty_filter_zeroes_the_result() {
    let sack = sack_with(&[], &[record("a-1-1.noarch", &[])]);
    let mut query = Query::new(&sack);
    query
        .add_filter(QueryKey::Empty, CmpFlags::EQ, kestrel::FilterMatch::Num(vec![]))
        .unwrap();
    assert!(query.is_empty());
}

#[test]
fn obsoletes_against_a_package_set() {
    let sack = sack_with(
        &[record("bar-1-0.x86_64", &[])],
        &[
            record("baz-1-0.x86_64", &[("obsoletes", "bar")]),
            record("unrelated-1-0.x86_64", &[]),
        ],
    );
    let mut installed = Query::new(&sack);
    installed
        .filter_str(QueryKey::Reponame, CmpFlags::EQ, &["@System"])
        .unwrap();
    let installed_set = installed.run_set();

    let mut query = Query::new(&sack);
    query
        .filter_pkg_set(QueryKey::Obsoletes, CmpFlags::EQ, &installed_set)
        .unwrap();
    assert_eq!(names(&query.run()), vec!["baz"]);
}
