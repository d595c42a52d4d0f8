mod common;

use common::{names, nevras, record, sack_with, sack_with_config, test_config};
use kestrel::rpm_types::TransactionItemReason;
use kestrel::solve::Pool;
use kestrel::{
    CmpFlags, EraseFlags, Error, Goal, GoalRunFlags, PackageSet, Query, QueryKey, Selector,
};

fn find<'a>(sack: &'a kestrel::Sack, name: &str) -> kestrel::Package<'a> {
    let mut query = Query::new(sack);
    query
        .filter_str(QueryKey::Name, CmpFlags::EQ, &[name])
        .unwrap();
    let packages = query.run();
    assert!(!packages.is_empty(), "fixture package {name} not found");
    packages[0]
}

fn find_nevra<'a>(sack: &'a kestrel::Sack, nevra: &str) -> kestrel::Package<'a> {
    let mut query = Query::new(sack);
    query
        .filter_str(QueryKey::NevraStrict, CmpFlags::EQ, &[nevra])
        .unwrap();
    let packages = query.run();
    assert!(!packages.is_empty(), "fixture package {nevra} not found");
    packages[0]
}

#[test]
fn simple_install_pulls_dependency() {
    let sack = sack_with(
        &[],
        &[
            record("walrus-2-5.noarch", &[("requires", "semolina = 2")]),
            record("semolina-2-0.i686", &[]),
        ],
    );
    let walrus = find(&sack, "walrus");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);
    goal.run(GoalRunFlags::empty()).unwrap();

    assert_eq!(
        nevras(&goal.list_installs()),
        vec!["semolina-2-0.i686", "walrus-2-5.noarch"]
    );
    assert!(goal.list_upgrades().is_empty());
    assert!(goal.list_erasures().is_empty());
    assert!(goal.list_obsoleted().is_empty());
}

#[test]
fn install_reasons_distinguish_user_and_dependency() {
    let sack = sack_with(
        &[],
        &[
            record("walrus-2-5.noarch", &[("requires", "semolina = 2")]),
            record("semolina-2-0.i686", &[]),
        ],
    );
    let walrus = find(&sack, "walrus");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);
    goal.run(GoalRunFlags::empty()).unwrap();

    assert_eq!(goal.get_reason(&walrus), TransactionItemReason::User);
    let semolina = find(&sack, "semolina");
    assert_eq!(goal.get_reason(&semolina), TransactionItemReason::Dependency);
}

#[test]
fn erase_with_clean_deps_removes_the_leftover_dependency() {
    let sack = sack_with(
        &[
            record("flying-2-9.x86_64", &[("requires", "penny-lib")]),
            record("penny-lib-4-1.x86_64", &[]),
        ],
        &[],
    );
    let flying = find(&sack, "flying");
    let mut goal = Goal::new(&sack);
    goal.erase_flags(&flying, EraseFlags::CLEAN_DEPS);
    goal.run(GoalRunFlags::empty()).unwrap();
    assert_eq!(
        nevras(&goal.list_erasures()),
        vec!["flying-2-9.x86_64", "penny-lib-4-1.x86_64"]
    );
    let penny = find(&sack, "penny-lib");
    assert_eq!(goal.get_reason(&penny), TransactionItemReason::Clean);

    let mut goal = Goal::new(&sack);
    goal.erase(&flying);
    goal.run(GoalRunFlags::empty()).unwrap();
    assert_eq!(nevras(&goal.list_erasures()), vec!["flying-2-9.x86_64"]);
}

#[test]
fn installonly_limit_keeps_the_running_kernel() {
    let mut sack = sack_with_config(
        test_config().installonly(&["k"], 3),
        &[
            record("k-1-0.x86_64", &[]),
            record("k-1-1.x86_64", &[]),
            record("k-2-0.x86_64", &[]),
        ],
        &[record("k-2-1.x86_64", &[])],
    );
    sack.set_running_kernel_resolver(Box::new(|pool: &Pool| {
        pool.pkg_ids().find(|&id| {
            pool.is_installed(id)
                && pool.str_of(pool.solvable(id).name) == "k"
                && pool.str_of(pool.solvable(id).evr) == "1-1"
        })
    }));

    let mut goal = Goal::new(&sack);
    goal.upgrade_all();
    goal.run(GoalRunFlags::empty()).unwrap();

    assert_eq!(nevras(&goal.list_installs()), vec!["k-2-1.x86_64"]);
    let erased = nevras(&goal.list_erasures());
    assert_eq!(erased, vec!["k-1-0.x86_64"]);
    assert!(!erased.contains(&"k-1-1.x86_64".to_owned()));
    // three kernels remain: the two kept plus the new one
    assert_eq!(goal.list_upgrades().len(), 0);
}

#[test]
fn removing_a_protected_package_is_refused() {
    let sack = sack_with(
        &[
            record("flying-2-9.x86_64", &[("requires", "penny-lib")]),
            record("penny-lib-4-1.x86_64", &[]),
        ],
        &[],
    );
    let flying = find(&sack, "flying");
    let penny = find(&sack, "penny-lib");

    let mut protected = PackageSet::new(&sack);
    protected.add(&flying);

    let mut goal = Goal::new(&sack);
    goal.set_protected(&protected);
    goal.erase(&penny);
    let err = goal.run(GoalRunFlags::ALLOW_UNINSTALL).unwrap_err();
    assert!(matches!(err, Error::RemovalOfProtected(_)));

    assert_eq!(goal.count_problems(), 1);
    assert_eq!(
        goal.describe_problem_rules(0, true),
        vec![
            "The operation would result in removing the following protected packages: flying"
                .to_owned()
        ]
    );
}

#[test]
fn upgrade_all_upgrades_and_obsoletes() {
    let sack = sack_with(
        &[
            record("foo-1-1.x86_64", &[]),
            record("bar-1-0.x86_64", &[]),
        ],
        &[
            record("foo-2-1.x86_64", &[]),
            record("baz-1-0.x86_64", &[("obsoletes", "bar")]),
        ],
    );
    let mut goal = Goal::new(&sack);
    goal.upgrade_all();
    goal.run(GoalRunFlags::empty()).unwrap();

    assert_eq!(nevras(&goal.list_upgrades()), vec!["foo-2-1.x86_64"]);
    assert_eq!(nevras(&goal.list_obsoleted()), vec!["bar-1-0.x86_64"]);
    let baz = find(&sack, "baz");
    assert_eq!(
        nevras(&goal.list_obsoleted_by_package(&baz)),
        vec!["bar-1-0.x86_64"]
    );
}

#[test]
fn upgrade_to_a_concrete_version() {
    let sack = sack_with(
        &[record("g-1-1.x86_64", &[])],
        &[record("g-2-1.x86_64", &[]), record("g-3-1.x86_64", &[])],
    );
    let target = find_nevra(&sack, "g-2-1.x86_64");
    let mut goal = Goal::new(&sack);
    goal.upgrade_to(&target);
    goal.run(GoalRunFlags::empty()).unwrap();
    assert_eq!(nevras(&goal.list_upgrades()), vec!["g-2-1.x86_64"]);
}

#[test]
fn downgrade_to_an_older_version() {
    let sack = sack_with(
        &[record("g-2-1.x86_64", &[])],
        &[record("g-1-1.x86_64", &[])],
    );
    let target = find_nevra(&sack, "g-1-1.x86_64");
    let mut goal = Goal::new(&sack);
    goal.downgrade_to(&target);
    goal.run(GoalRunFlags::empty()).unwrap();
    assert_eq!(nevras(&goal.list_downgrades()), vec!["g-1-1.x86_64"]);
}

#[test]
fn distupgrade_follows_the_repo_downwards() {
    let sack = sack_with(
        &[record("g-2-1.x86_64", &[])],
        &[record("g-1-1.x86_64", &[])],
    );
    let mut goal = Goal::new(&sack);
    goal.distupgrade_all();
    goal.run(GoalRunFlags::empty()).unwrap();
    assert_eq!(nevras(&goal.list_downgrades()), vec!["g-1-1.x86_64"]);
}

#[test]
fn install_selector_by_glob() {
    let sack = sack_with(
        &[],
        &[
            record("walrus-2-5.noarch", &[]),
            record("walnut-1-1.noarch", &[]),
        ],
    );
    let selector = Selector::new(&sack)
        .set_name(CmpFlags::GLOB, "wal*")
        .unwrap();
    let mut goal = Goal::new(&sack);
    goal.install_selector(&selector).unwrap();
    goal.run(GoalRunFlags::empty()).unwrap();
    // one of the matches satisfies an install request
    assert_eq!(goal.list_installs().len(), 1);
}

#[test]
fn selector_without_constraints_is_rejected() {
    let sack = sack_with(&[], &[record("walrus-2-5.noarch", &[])]);
    let selector = Selector::new(&sack);
    let mut goal = Goal::new(&sack);
    let err = goal.install_selector(&selector).unwrap_err();
    assert!(matches!(err, Error::BadSelector(_)));

    let selector = Selector::new(&sack)
        .set_name(CmpFlags::EQ, "no-such-package")
        .unwrap();
    let err = goal.install_selector(&selector).unwrap_err();
    assert!(matches!(err, Error::BadSelector(_)));
}

#[test]
fn missing_dependency_renders_a_problem_report() {
    let sack = sack_with(
        &[],
        &[record("w-1-1.x86_64", &[("requires", "missing-lib")])],
    );
    let w = find(&sack, "w");
    let mut goal = Goal::new(&sack);
    goal.install(&w);
    let err = goal.run(GoalRunFlags::empty()).unwrap_err();
    let Error::NoSolution(report) = err else {
        panic!("expected NoSolution");
    };
    assert!(report.starts_with("Problem: "));
    assert!(report.contains("nothing provides missing-lib needed by w-1-1.x86_64"));

    assert_eq!(goal.count_problems(), 1);
    let rules = goal.describe_problem_rules(0, true);
    assert!(rules.contains(&"conflicting requests".to_owned()));
}

#[test]
fn verify_reports_broken_installed_dependencies() {
    let sack = sack_with(
        &[record("broken-1-1.x86_64", &[("requires", "gone-lib")])],
        &[],
    );
    let mut goal = Goal::new(&sack);
    goal.verify();
    let err = goal.run(GoalRunFlags::empty()).unwrap_err();
    assert!(matches!(err, Error::NoSolution(_)));
    let rules = goal.describe_problem_rules(0, true);
    assert!(rules
        .iter()
        .any(|rule| rule.contains("problem with installed package broken-1-1.x86_64")));
}

#[test]
fn format_numbers_multiple_problems() {
    let formatted = Goal::format_all_problem_rules(&[
        vec!["conflicting requests".to_owned(), "detail one".to_owned()],
        vec!["some dependency problem".to_owned()],
    ]);
    assert_eq!(
        formatted,
        "Problem 1: conflicting requests\n  - detail one\n Problem 2: some dependency problem"
    );
    let single = Goal::format_all_problem_rules(&[vec!["conflicting requests".to_owned()]]);
    assert_eq!(single, "Problem: conflicting requests");
}

#[test]
fn unneeded_follows_history_reasons() {
    use kestrel::history::{History, ItemPayload};
    use kestrel::rpm_types::{Nevra, TransactionItemAction, TransactionState};

    let sack = sack_with(
        &[
            record("app-1-1.x86_64", &[("requires", "lib")]),
            record("lib-1-1.x86_64", &[]),
            record("orphan-1-1.x86_64", &[]),
        ],
        &[],
    );
    let mut history = History::open_in_memory().unwrap();
    let mut active = history
        .begin_transaction(100, "v0", "34", 0, "install app")
        .unwrap();
    active.add_item(
        ItemPayload::Rpm(Nevra::parse("app-1-1.x86_64").unwrap()),
        "main",
        TransactionItemAction::Install,
        TransactionItemReason::User,
    );
    active.add_item(
        ItemPayload::Rpm(Nevra::parse("lib-1-1.x86_64").unwrap()),
        "main",
        TransactionItemAction::Install,
        TransactionItemReason::Dependency,
    );
    active.add_item(
        ItemPayload::Rpm(Nevra::parse("orphan-1-1.x86_64").unwrap()),
        "main",
        TransactionItemAction::Install,
        TransactionItemReason::Dependency,
    );
    active.finish(110, "v1", TransactionState::Done).unwrap();

    let goal = Goal::new(&sack);
    let unneeded = goal.list_unneeded(&history).unwrap();
    assert_eq!(names(&unneeded), vec!["orphan"]);
}

#[test]
fn lock_keeps_a_package_in_place() {
    let sack = sack_with(&[record("pinned-1-1.x86_64", &[])], &[]);
    let pinned = find(&sack, "pinned");
    let mut goal = Goal::new(&sack);
    goal.lock(&pinned);
    goal.erase(&pinned);
    assert!(goal.run(GoalRunFlags::empty()).is_err());
}
