use rusqlite::{params, Connection, Transaction};
use tracing::debug;

use kestrel_rpm_types::{
    Nevra, TransactionItemAction, TransactionItemReason, TransactionState,
};

use crate::item::{ItemPayload, ItemState};
use crate::{HistoryError, Result};

/// One persisted transaction row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Monotonic transaction id.
    pub id: i64,
    /// Start time, seconds since the epoch.
    pub dt_begin: i64,
    /// End time; 0 while in progress.
    pub dt_end: i64,
    /// Rpmdb fingerprint before the transaction.
    pub rpmdb_version_begin: String,
    /// Rpmdb fingerprint after the transaction; empty while in progress.
    pub rpmdb_version_end: String,
    /// The release version the transaction ran under.
    pub releasever: String,
    /// Uid of the requesting user.
    pub user_id: i64,
    /// The command line that triggered the transaction.
    pub cmdline: String,
    /// Lifecycle state.
    pub state: TransactionState,
}

impl TransactionRecord {
    /// Whether the transaction finished successfully.
    pub fn done(&self) -> bool {
        self.state == TransactionState::Done
    }
}

struct PendingItem {
    payload: ItemPayload,
    repoid: String,
    action: TransactionItemAction,
    reason: TransactionItemReason,
    state: ItemState,
}

/// An open history transaction.
///
/// Created by [`crate::History::begin_transaction`]; the `trans` row exists
/// inside an uncommitted database transaction and items are buffered until
/// [`ActiveTransaction::finish`] writes and commits everything at once.
/// Dropping the handle without finishing rolls the whole record back.
pub struct ActiveTransaction<'h> {
    tx: Transaction<'h>,
    id: i64,
    pending: Vec<PendingItem>,
}

impl<'h> ActiveTransaction<'h> {
    pub(crate) fn begin(
        conn: &'h mut Connection,
        dt_begin: i64,
        rpmdb_version_begin: &str,
        releasever: &str,
        user_id: i64,
        cmdline: &str,
    ) -> Result<Self> {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO trans (dt_begin, rpmdb_version_begin, releasever, user_id, cmdline, state) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                dt_begin,
                rpmdb_version_begin,
                releasever,
                user_id,
                cmdline,
                TransactionState::InProgress.code()
            ],
        )?;
        let id = tx.last_insert_rowid();
        debug!(trans_id = id, "history transaction begun");
        Ok(Self {
            tx,
            id,
            pending: Vec::new(),
        })
    }

    /// The allocated transaction id.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Appends a pending item; it is written when the transaction finishes.
    pub fn add_item(
        &mut self,
        payload: ItemPayload,
        repoid: &str,
        action: TransactionItemAction,
        reason: TransactionItemReason,
    ) {
        self.pending.push(PendingItem {
            payload,
            repoid: repoid.to_owned(),
            action,
            reason,
            state: ItemState::Pending,
        });
    }

    /// Marks the rpm item for `nevra` as processed.
    pub fn set_item_done(&mut self, nevra: &str) -> Result<()> {
        let found = self.pending.iter_mut().find(|item| {
            item.payload
                .as_rpm()
                .is_some_and(|n| n.to_string() == nevra || n.to_string_with_epoch() == nevra)
        });
        match found {
            Some(item) => {
                item.state = ItemState::Done;
                Ok(())
            }
            None => Err(HistoryError::ItemNotFound(nevra.to_owned())),
        }
    }

    /// Captures one line of console output.
    pub fn add_console_output(&mut self, file_descriptor: i64, line: &str) -> Result<()> {
        self.tx.execute(
            "INSERT INTO console_output (trans_id, file_descriptor, line) VALUES (?1, ?2, ?3)",
            params![self.id, file_descriptor, line],
        )?;
        Ok(())
    }

    /// Records one package of the software stack that performed this
    /// transaction.
    pub fn add_software_performed_with(&mut self, nevra: &Nevra) -> Result<()> {
        let item_id = rpm_item_id(&self.tx, nevra)?;
        self.tx.execute(
            "INSERT OR IGNORE INTO trans_with (trans_id, item_id) VALUES (?1, ?2)",
            params![self.id, item_id],
        )?;
        Ok(())
    }

    /// Writes all pending items, closes the transaction with the given state
    /// and commits. Only `Done` and `Error` are valid closing states.
    pub fn finish(
        self,
        dt_end: i64,
        rpmdb_version_end: &str,
        state: TransactionState,
    ) -> Result<i64> {
        if !matches!(state, TransactionState::Done | TransactionState::Error) {
            return Err(HistoryError::InvalidFinishState(state));
        }
        for item in &self.pending {
            let item_id = match &item.payload {
                ItemPayload::Rpm(nevra) => rpm_item_id(&self.tx, nevra)?,
                ItemPayload::CompsGroup(group) => {
                    let item_id = new_item(&self.tx, item.payload.type_code())?;
                    self.tx.execute(
                        "INSERT INTO comps_group (item_id, groupid, name, translated_name, pkg_types) \
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            item_id,
                            group.groupid,
                            group.name,
                            group.translated_name,
                            group.pkg_types
                        ],
                    )?;
                    for package in &group.packages {
                        self.tx.execute(
                            "INSERT INTO comps_group_package (group_id, name, installed, pkg_type) \
                             VALUES (?1, ?2, ?3, ?4)",
                            params![
                                item_id,
                                package.name,
                                package.installed as i64,
                                package.pkg_type
                            ],
                        )?;
                    }
                    item_id
                }
                ItemPayload::CompsEnvironment(environment) => {
                    let item_id = new_item(&self.tx, item.payload.type_code())?;
                    self.tx.execute(
                        "INSERT INTO comps_environment \
                         (item_id, environmentid, name, translated_name, pkg_types) \
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            item_id,
                            environment.environmentid,
                            environment.name,
                            environment.translated_name,
                            environment.pkg_types
                        ],
                    )?;
                    for group in &environment.groups {
                        self.tx.execute(
                            "INSERT INTO comps_environment_group \
                             (environment_id, groupid, installed, group_type) \
                             VALUES (?1, ?2, ?3, ?4)",
                            params![
                                item_id,
                                group.groupid,
                                group.installed as i64,
                                group.group_type
                            ],
                        )?;
                    }
                    item_id
                }
            };
            let repo_id = repo_id(&self.tx, &item.repoid)?;
            self.tx.execute(
                "INSERT INTO trans_item (trans_id, item_id, repo_id, action, reason, state) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    self.id,
                    item_id,
                    repo_id,
                    item.action.code(),
                    item.reason.code(),
                    item.state.code()
                ],
            )?;
        }
        self.tx.execute(
            "UPDATE trans SET dt_end = ?2, rpmdb_version_end = ?3, state = ?4 WHERE id = ?1",
            params![self.id, dt_end, rpmdb_version_end, state.code()],
        )?;
        self.tx.commit()?;
        debug!(trans_id = self.id, ?state, "history transaction finished");
        Ok(self.id)
    }
}

fn new_item(conn: &Connection, item_type: i64) -> Result<i64> {
    conn.execute("INSERT INTO item (item_type) VALUES (?1)", params![item_type])?;
    Ok(conn.last_insert_rowid())
}

/// Finds or creates the shared rpm item row for a NEVRA.
fn rpm_item_id(conn: &Connection, nevra: &Nevra) -> Result<i64> {
    use rusqlite::OptionalExtension;
    let existing = conn
        .query_row(
            "SELECT item_id FROM rpm WHERE name = ?1 AND epoch = ?2 AND version = ?3 \
             AND release = ?4 AND arch = ?5",
            params![
                nevra.name,
                nevra.epoch as i64,
                nevra.version,
                nevra.release,
                nevra.arch
            ],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let item_id = new_item(conn, 1)?;
    conn.execute(
        "INSERT INTO rpm (item_id, name, epoch, version, release, arch) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            item_id,
            nevra.name,
            nevra.epoch as i64,
            nevra.version,
            nevra.release,
            nevra.arch
        ],
    )?;
    Ok(item_id)
}

fn repo_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT OR IGNORE INTO repo (name) VALUES (?1)", params![name])?;
    let id = conn.query_row(
        "SELECT id FROM repo WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::History;

    fn nevra(s: &str) -> Nevra {
        Nevra::parse(s).unwrap()
    }

    fn record_install(history: &mut History, dt: i64, name: &str, reason: TransactionItemReason) {
        let mut active = history
            .begin_transaction(dt, "begin", "34", 0, "install")
            .unwrap();
        active.add_item(
            ItemPayload::Rpm(nevra(name)),
            "main",
            TransactionItemAction::Install,
            reason,
        );
        active
            .finish(dt + 1, "end", TransactionState::Done)
            .unwrap();
    }

    #[test]
    fn begin_finish_persists_row_and_items() {
        let mut history = History::open_in_memory().unwrap();
        let mut active = history
            .begin_transaction(100, "74:abcd", "34", 1000, "dnf install walrus")
            .unwrap();
        let id = active.id();
        active.add_item(
            ItemPayload::Rpm(nevra("walrus-2-5.noarch")),
            "main",
            TransactionItemAction::Install,
            TransactionItemReason::User,
        );
        active.add_item(
            ItemPayload::Rpm(nevra("semolina-2-0.i686")),
            "main",
            TransactionItemAction::Install,
            TransactionItemReason::Dependency,
        );
        active.set_item_done("walrus-2-5.noarch").unwrap();
        assert_eq!(active.finish(110, "75:ef01", TransactionState::Done).unwrap(), id);

        let record = history.last_transaction().unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.dt_begin, 100);
        assert_eq!(record.dt_end, 110);
        assert_eq!(record.rpmdb_version_end, "75:ef01");
        assert!(record.done());

        let items = history.transaction_items(id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].payload.as_rpm().unwrap().name, "walrus");
        assert_eq!(items[0].state, ItemState::Done);
        assert_eq!(items[1].state, ItemState::Pending);
        assert_eq!(items[1].reason, TransactionItemReason::Dependency);
        assert!(items[0].id < items[1].id);
    }

    #[test]
    fn interrupted_transaction_is_invisible_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.sqlite");
        {
            let mut history = History::open(&path).unwrap();
            let mut active = history
                .begin_transaction(100, "74:abcd", "34", 0, "interrupted")
                .unwrap();
            active.add_item(
                ItemPayload::Rpm(nevra("walrus-2-5.noarch")),
                "main",
                TransactionItemAction::Install,
                TransactionItemReason::User,
            );
            // the process dies here; nothing was committed
        }
        let history = History::open(&path).unwrap();
        assert!(history.last_transaction().unwrap().is_none());
    }

    #[test]
    fn dropped_transaction_leaves_no_trace() {
        let mut history = History::open_in_memory().unwrap();
        {
            let mut active = history
                .begin_transaction(100, "74:abcd", "34", 0, "interrupted")
                .unwrap();
            active.add_item(
                ItemPayload::Rpm(nevra("walrus-2-5.noarch")),
                "main",
                TransactionItemAction::Install,
                TransactionItemReason::User,
            );
            // dropped without finish
        }
        assert!(history.last_transaction().unwrap().is_none());
        assert!(history.list_transaction_ids().unwrap().is_empty());
    }

    #[test]
    fn finish_rejects_non_terminal_states() {
        let mut history = History::open_in_memory().unwrap();
        let active = history
            .begin_transaction(100, "74:abcd", "34", 0, "oops")
            .unwrap();
        let err = active
            .finish(110, "", TransactionState::InProgress)
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidFinishState(_)));
    }

    #[test]
    fn set_item_done_requires_known_nevra() {
        let mut history = History::open_in_memory().unwrap();
        let mut active = history
            .begin_transaction(100, "74:abcd", "34", 0, "x")
            .unwrap();
        let err = active.set_item_done("missing-1-1.noarch").unwrap_err();
        assert!(matches!(err, HistoryError::ItemNotFound(_)));
    }

    #[test]
    fn list_ids_descending_and_last_transaction() {
        let mut history = History::open_in_memory().unwrap();
        record_install(&mut history, 100, "a-1-1.noarch", TransactionItemReason::User);
        record_install(&mut history, 200, "b-1-1.noarch", TransactionItemReason::User);
        record_install(&mut history, 300, "c-1-1.noarch", TransactionItemReason::User);
        assert_eq!(history.list_transaction_ids().unwrap(), vec![3, 2, 1]);
        assert_eq!(history.last_transaction().unwrap().unwrap().id, 3);
    }

    #[test]
    fn reason_resolution_follows_most_recent_item() {
        let mut history = History::open_in_memory().unwrap();
        record_install(
            &mut history,
            100,
            "semolina-2-0.i686",
            TransactionItemReason::Dependency,
        );
        // later the user asks for it explicitly
        record_install(
            &mut history,
            200,
            "semolina-2-0.i686",
            TransactionItemReason::User,
        );

        assert_eq!(
            history.resolve_rpm_reason("semolina", "i686", None).unwrap(),
            TransactionItemReason::User
        );
        assert_eq!(
            history.resolve_rpm_reason("semolina", "i686", Some(1)).unwrap(),
            TransactionItemReason::Dependency
        );
        assert_eq!(
            history.resolve_rpm_reason("nope", "i686", None).unwrap(),
            TransactionItemReason::Unknown
        );
        assert!(history.user_installed("semolina", "i686").unwrap());
    }

    #[test]
    fn outgoing_halves_are_skipped_by_item_lookup() {
        let mut history = History::open_in_memory().unwrap();
        let mut active = history
            .begin_transaction(100, "b", "34", 0, "upgrade")
            .unwrap();
        active.add_item(
            ItemPayload::Rpm(nevra("foo-2-1.x86_64")),
            "main",
            TransactionItemAction::Upgrade,
            TransactionItemReason::User,
        );
        active.add_item(
            ItemPayload::Rpm(nevra("foo-1-1.x86_64")),
            "@System",
            TransactionItemAction::Upgraded,
            TransactionItemReason::User,
        );
        active.finish(110, "e", TransactionState::Done).unwrap();

        assert!(history
            .rpm_transaction_item(&nevra("foo-1-1.x86_64"))
            .unwrap()
            .is_none());
        let item = history
            .rpm_transaction_item(&nevra("foo-2-1.x86_64"))
            .unwrap()
            .unwrap();
        assert_eq!(item.action, TransactionItemAction::Upgrade);

        // the outgoing half points at its replacement through an item id
        let items = history.transaction_items(item.trans_id).unwrap();
        history.mark_item_replaced(items[1].id, items[0].id).unwrap();
        let items = history.transaction_items(item.trans_id).unwrap();
        assert_eq!(items[1].replaced_by, Some(items[0].id));
    }

    #[test]
    fn search_by_rpm_name_and_nevra() {
        let mut history = History::open_in_memory().unwrap();
        record_install(&mut history, 100, "a-1-1.noarch", TransactionItemReason::User);
        record_install(&mut history, 200, "b-2-2.noarch", TransactionItemReason::User);
        assert_eq!(history.search_transactions_by_rpm(&["a"]).unwrap(), vec![1]);
        assert_eq!(
            history
                .search_transactions_by_rpm(&["b-2-2.noarch"])
                .unwrap(),
            vec![2]
        );
        assert_eq!(
            history.search_transactions_by_rpm(&["a", "b"]).unwrap(),
            vec![2, 1]
        );
        assert!(history.search_transactions_by_rpm(&["zzz"]).unwrap().is_empty());
    }

    #[test]
    fn console_output_and_software_round_trip() {
        let mut history = History::open_in_memory().unwrap();
        let mut active = history
            .begin_transaction(100, "b", "34", 0, "install")
            .unwrap();
        let id = active.id();
        active.add_console_output(1, "Installing: walrus").unwrap();
        active.add_console_output(2, "warning: key").unwrap();
        active
            .add_software_performed_with(&nevra("kestrel-0.1-1.x86_64"))
            .unwrap();
        active.finish(110, "e", TransactionState::Done).unwrap();

        assert_eq!(
            history.console_output(id).unwrap(),
            vec![(1, "Installing: walrus".into()), (2, "warning: key".into())]
        );
        assert_eq!(
            history.software_performed_with(id).unwrap(),
            vec![nevra("kestrel-0.1-1.x86_64")]
        );
    }

    #[test]
    fn comps_items_round_trip() {
        let mut history = History::open_in_memory().unwrap();
        let mut active = history
            .begin_transaction(100, "b", "34", 0, "group install")
            .unwrap();
        let id = active.id();
        active.add_item(
            ItemPayload::CompsGroup(crate::CompsGroupItem {
                groupid: "core".into(),
                name: "Core".into(),
                translated_name: "Kern".into(),
                pkg_types: 6,
                packages: vec![crate::CompsGroupPackage {
                    name: "walrus".into(),
                    installed: true,
                    pkg_type: 2,
                }],
            }),
            "",
            TransactionItemAction::Install,
            TransactionItemReason::Group,
        );
        active.add_item(
            ItemPayload::CompsEnvironment(crate::CompsEnvironmentItem {
                environmentid: "minimal".into(),
                name: "Minimal".into(),
                translated_name: "Minimal".into(),
                pkg_types: 6,
                groups: vec![crate::CompsEnvironmentGroup {
                    groupid: "core".into(),
                    installed: true,
                    group_type: 1,
                }],
            }),
            "",
            TransactionItemAction::Install,
            TransactionItemReason::User,
        );
        active.finish(110, "e", TransactionState::Done).unwrap();

        let items = history.transaction_items(id).unwrap();
        assert_eq!(items.len(), 2);
        match &items[0].payload {
            ItemPayload::CompsGroup(group) => {
                assert_eq!(group.groupid, "core");
                assert_eq!(group.packages.len(), 1);
                assert!(group.packages[0].installed);
            }
            other => panic!("expected comps group, got {other:?}"),
        }
        match &items[1].payload {
            ItemPayload::CompsEnvironment(environment) => {
                assert_eq!(environment.environmentid, "minimal");
                assert_eq!(environment.groups[0].groupid, "core");
            }
            other => panic!("expected comps environment, got {other:?}"),
        }
    }
}
