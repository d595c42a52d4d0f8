use std::cmp::Ordering;

use kestrel_rpm_types::{Evr, Nevra, TransactionItemAction, TransactionItemReason};

use crate::item::TransactionItem;
use crate::transaction::TransactionRecord;

/// The net effect of a merged range on one `(name, arch)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedItem {
    /// The package the effect is about: the final incoming version for
    /// installs and upgrades, the pre-range version for removals.
    pub nevra: Nevra,
    /// The collapsed action.
    pub action: TransactionItemAction,
    /// The reason of the newest contributing item.
    pub reason: TransactionItemReason,
    /// The repository of the newest contributing item.
    pub repoid: String,
}

struct Member {
    record: TransactionRecord,
    items: Vec<TransactionItem>,
    console: Vec<(i64, String)>,
}

/// A read-only view over a run of transactions, ordered ascending by id.
///
/// Scalar accessors take the first transaction's begin side and the last
/// transaction's end side; list accessors preserve member order; item
/// resolution collapses per-package action sequences to their net effect.
#[derive(Default)]
pub struct MergedTransaction {
    members: Vec<Member>,
    software: Vec<Nevra>,
}

impl MergedTransaction {
    /// Adds one transaction to the view, keeping members sorted by id.
    pub fn merge(
        &mut self,
        record: TransactionRecord,
        items: Vec<TransactionItem>,
        console: Vec<(i64, String)>,
        software: Vec<Nevra>,
    ) {
        let position = self
            .members
            .iter()
            .position(|member| member.record.id > record.id)
            .unwrap_or(self.members.len());
        self.members.insert(
            position,
            Member {
                record,
                items,
                console,
            },
        );
        for nevra in software {
            if !self.software.contains(&nevra) {
                self.software.push(nevra);
            }
        }
    }

    /// Member transaction ids, ascending.
    pub fn list_ids(&self) -> Vec<i64> {
        self.members.iter().map(|m| m.record.id).collect()
    }

    /// Member user ids, in id order.
    pub fn list_user_ids(&self) -> Vec<i64> {
        self.members.iter().map(|m| m.record.user_id).collect()
    }

    /// Member command lines, in id order.
    pub fn list_cmdlines(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.record.cmdline.clone())
            .collect()
    }

    /// Member completion flags, in id order.
    pub fn list_done(&self) -> Vec<bool> {
        self.members.iter().map(|m| m.record.done()).collect()
    }

    /// Begin time of the first member.
    pub fn dt_begin(&self) -> Option<i64> {
        self.members.first().map(|m| m.record.dt_begin)
    }

    /// End time of the last member.
    pub fn dt_end(&self) -> Option<i64> {
        self.members.last().map(|m| m.record.dt_end)
    }

    /// Rpmdb fingerprint before the first member.
    pub fn rpmdb_version_begin(&self) -> Option<&str> {
        self.members
            .first()
            .map(|m| m.record.rpmdb_version_begin.as_str())
    }

    /// Rpmdb fingerprint after the last member.
    pub fn rpmdb_version_end(&self) -> Option<&str> {
        self.members
            .last()
            .map(|m| m.record.rpmdb_version_end.as_str())
    }

    /// Concatenated console output, member id order.
    pub fn console_output(&self) -> Vec<(i64, String)> {
        self.members
            .iter()
            .flat_map(|m| m.console.iter().cloned())
            .collect()
    }

    /// Union of the performing software of all members.
    pub fn software_performed_with(&self) -> &[Nevra] {
        &self.software
    }

    /// Collapses the per-package action sequences of the whole range into net
    /// effects, ordered by package name then arch.
    pub fn items(&self) -> Vec<MergedItem> {
        let mut slots: Vec<((String, String), MergeSlot)> = Vec::new();
        for member in &self.members {
            for item in &member.items {
                let Some(nevra) = item.payload.as_rpm() else {
                    continue;
                };
                let key = (nevra.name.clone(), nevra.arch.clone());
                let merged = MergedItem {
                    nevra: nevra.clone(),
                    action: item.action,
                    reason: item.reason,
                    repoid: item.repoid.clone(),
                };
                let slot = match slots.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, slot)) => slot,
                    None => {
                        slots.push((key, MergeSlot::default()));
                        &mut slots.last_mut().expect("just pushed").1
                    }
                };
                slot.step(merged, item.action.is_forward());
            }
        }

        let mut result: Vec<MergedItem> = slots
            .into_iter()
            .flat_map(|(_, slot)| slot.net_effect())
            .collect();
        result.sort_by(|a, b| {
            (&a.nevra.name, &a.nevra.arch, a.action.code())
                .cmp(&(&b.nevra.name, &b.nevra.arch, b.action.code()))
        });
        result
    }
}

/// Merge state of one `(name, arch)` pair: what was there when the range
/// started, what is there now, and which versions the range itself brought in.
#[derive(Default)]
struct MergeSlot {
    initial: Option<MergedItem>,
    current: Option<MergedItem>,
    added_in_range: Vec<Evr>,
}

impl MergeSlot {
    fn step(&mut self, item: MergedItem, forward: bool) {
        let evr = item.nevra.evr();
        if forward {
            self.added_in_range.push(evr);
            self.current = Some(item);
        } else if self
            .current
            .as_ref()
            .is_some_and(|current| current.nevra.evr() == evr)
        {
            // the version currently present leaves the system
            self.current = None;
        } else if self.initial.is_none() && !self.added_in_range.contains(&evr) {
            // the outgoing half of a replacement reveals the pre-range version
            self.initial = Some(item);
        }
    }

    fn net_effect(self) -> Vec<MergedItem> {
        match (self.initial, self.current) {
            (None, None) => Vec::new(),
            (None, Some(current)) => vec![MergedItem {
                action: TransactionItemAction::Install,
                ..current
            }],
            (Some(initial), None) => vec![MergedItem {
                action: TransactionItemAction::Remove,
                ..initial
            }],
            (Some(initial), Some(current)) => {
                match current.nevra.evr().cmp(&initial.nevra.evr()) {
                    Ordering::Greater => vec![
                        MergedItem {
                            action: TransactionItemAction::Upgrade,
                            ..current
                        },
                        MergedItem {
                            action: TransactionItemAction::Upgraded,
                            ..initial
                        },
                    ],
                    Ordering::Less => vec![
                        MergedItem {
                            action: TransactionItemAction::Downgrade,
                            ..current
                        },
                        MergedItem {
                            action: TransactionItemAction::Downgraded,
                            ..initial
                        },
                    ],
                    // back where the range started
                    Ordering::Equal => Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{History, ItemPayload};
    use kestrel_rpm_types::TransactionState;

    fn nevra(s: &str) -> Nevra {
        Nevra::parse(s).unwrap()
    }

    fn record(
        history: &mut History,
        dt: i64,
        cmdline: &str,
        items: &[(&str, TransactionItemAction)],
    ) -> i64 {
        let mut active = history
            .begin_transaction(dt, &format!("v{dt}"), "34", 0, cmdline)
            .unwrap();
        for (pkg, action) in items {
            active.add_item(
                ItemPayload::Rpm(nevra(pkg)),
                "main",
                *action,
                TransactionItemReason::User,
            );
        }
        active
            .finish(dt + 1, &format!("v{}", dt + 1), TransactionState::Done)
            .unwrap()
    }

    #[test]
    fn scalar_accessors_span_the_range() {
        let mut history = History::open_in_memory().unwrap();
        let a = record(
            &mut history,
            100,
            "install foo",
            &[("foo-1-1.x86_64", TransactionItemAction::Install)],
        );
        let b = record(
            &mut history,
            200,
            "upgrade foo",
            &[
                ("foo-2-1.x86_64", TransactionItemAction::Upgrade),
                ("foo-1-1.x86_64", TransactionItemAction::Upgraded),
            ],
        );
        let merged = history.merged(&[b, a]).unwrap();
        assert_eq!(merged.list_ids(), vec![a, b]);
        assert_eq!(merged.dt_begin(), Some(100));
        assert_eq!(merged.dt_end(), Some(201));
        assert_eq!(merged.rpmdb_version_begin(), Some("v100"));
        assert_eq!(merged.rpmdb_version_end(), Some("v201"));
        assert_eq!(merged.list_cmdlines(), vec!["install foo", "upgrade foo"]);
        assert_eq!(merged.list_done(), vec![true, true]);
    }

    #[test]
    fn install_then_upgrade_collapses_to_install() {
        let mut history = History::open_in_memory().unwrap();
        let a = record(
            &mut history,
            100,
            "install",
            &[("foo-1-1.x86_64", TransactionItemAction::Install)],
        );
        let b = record(
            &mut history,
            200,
            "upgrade",
            &[
                ("foo-2-1.x86_64", TransactionItemAction::Upgrade),
                ("foo-1-1.x86_64", TransactionItemAction::Upgraded),
            ],
        );
        let merged = history.merged(&[a, b]).unwrap();
        let items = merged.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].action, TransactionItemAction::Install);
        assert_eq!(items[0].nevra, nevra("foo-2-1.x86_64"));
    }

    #[test]
    fn install_then_remove_nets_out() {
        let mut history = History::open_in_memory().unwrap();
        let a = record(
            &mut history,
            100,
            "install",
            &[("foo-1-1.x86_64", TransactionItemAction::Install)],
        );
        let b = record(
            &mut history,
            200,
            "remove",
            &[("foo-1-1.x86_64", TransactionItemAction::Remove)],
        );
        let merged = history.merged(&[a, b]).unwrap();
        assert!(merged.items().is_empty());
    }

    #[test]
    fn upgrade_then_remove_is_a_remove_of_the_original() {
        let mut history = History::open_in_memory().unwrap();
        let a = record(
            &mut history,
            100,
            "upgrade",
            &[
                ("foo-2-1.x86_64", TransactionItemAction::Upgrade),
                ("foo-1-1.x86_64", TransactionItemAction::Upgraded),
            ],
        );
        let b = record(
            &mut history,
            200,
            "remove",
            &[("foo-2-1.x86_64", TransactionItemAction::Remove)],
        );
        let merged = history.merged(&[a, b]).unwrap();
        let items = merged.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].action, TransactionItemAction::Remove);
        assert_eq!(items[0].nevra, nevra("foo-1-1.x86_64"));
    }

    #[test]
    fn upgrade_alone_stays_an_upgrade() {
        let mut history = History::open_in_memory().unwrap();
        let a = record(
            &mut history,
            100,
            "upgrade",
            &[
                ("foo-2-1.x86_64", TransactionItemAction::Upgrade),
                ("foo-1-1.x86_64", TransactionItemAction::Upgraded),
            ],
        );
        let merged = history.merged(&[a]).unwrap();
        let items = merged.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].action, TransactionItemAction::Upgrade);
        assert_eq!(items[0].nevra, nevra("foo-2-1.x86_64"));
        assert_eq!(items[1].action, TransactionItemAction::Upgraded);
        assert_eq!(items[1].nevra, nevra("foo-1-1.x86_64"));
    }

    #[test]
    fn downgrade_then_upgrade_back_nets_out() {
        let mut history = History::open_in_memory().unwrap();
        let a = record(
            &mut history,
            100,
            "downgrade",
            &[
                ("foo-1-1.x86_64", TransactionItemAction::Downgrade),
                ("foo-2-1.x86_64", TransactionItemAction::Downgraded),
            ],
        );
        let b = record(
            &mut history,
            200,
            "upgrade",
            &[
                ("foo-2-1.x86_64", TransactionItemAction::Upgrade),
                ("foo-1-1.x86_64", TransactionItemAction::Upgraded),
            ],
        );
        let merged = history.merged(&[a, b]).unwrap();
        assert!(merged.items().is_empty());
    }

    #[test]
    fn console_output_concatenates_in_id_order() {
        let mut history = History::open_in_memory().unwrap();
        let mut active = history.begin_transaction(100, "a", "34", 0, "one").unwrap();
        let first = active.id();
        active.add_console_output(1, "first").unwrap();
        active.finish(101, "b", TransactionState::Done).unwrap();
        let mut active = history.begin_transaction(200, "b", "34", 0, "two").unwrap();
        let second = active.id();
        active.add_console_output(1, "second").unwrap();
        active.finish(201, "c", TransactionState::Done).unwrap();

        let merged = history.merged(&[second, first]).unwrap();
        assert_eq!(
            merged.console_output(),
            vec![(1, "first".into()), (1, "second".into())]
        );
    }
}
