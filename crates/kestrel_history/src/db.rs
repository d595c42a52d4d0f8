use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use kestrel_rpm_types::{Nevra, TransactionItemAction, TransactionItemReason, TransactionState};

use crate::item::{
    CompsEnvironmentGroup, CompsEnvironmentItem, CompsGroupItem, CompsGroupPackage, ItemPayload,
    ItemState, TransactionItem,
};
use crate::merged::MergedTransaction;
use crate::transaction::{ActiveTransaction, TransactionRecord};
use crate::{HistoryError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dt_begin INTEGER NOT NULL,
    dt_end INTEGER NOT NULL DEFAULT 0,
    rpmdb_version_begin TEXT NOT NULL,
    rpmdb_version_end TEXT NOT NULL DEFAULT '',
    releasever TEXT NOT NULL,
    user_id INTEGER NOT NULL,
    cmdline TEXT NOT NULL,
    state INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS repo (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS trans_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trans_id INTEGER NOT NULL REFERENCES trans(id),
    item_id INTEGER NOT NULL REFERENCES item(id),
    repo_id INTEGER NOT NULL REFERENCES repo(id),
    replaced_by INTEGER REFERENCES trans_item(id),
    action INTEGER NOT NULL,
    reason INTEGER NOT NULL,
    state INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS rpm (
    item_id INTEGER PRIMARY KEY REFERENCES item(id),
    name TEXT NOT NULL,
    epoch INTEGER NOT NULL,
    version TEXT NOT NULL,
    release TEXT NOT NULL,
    arch TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comps_group (
    item_id INTEGER PRIMARY KEY REFERENCES item(id),
    groupid TEXT NOT NULL,
    name TEXT NOT NULL,
    translated_name TEXT NOT NULL,
    pkg_types INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS comps_group_package (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES comps_group(item_id),
    name TEXT NOT NULL,
    installed INTEGER NOT NULL,
    pkg_type INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS comps_environment (
    item_id INTEGER PRIMARY KEY REFERENCES item(id),
    environmentid TEXT NOT NULL,
    name TEXT NOT NULL,
    translated_name TEXT NOT NULL,
    pkg_types INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS comps_environment_group (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    environment_id INTEGER NOT NULL REFERENCES comps_environment(item_id),
    groupid TEXT NOT NULL,
    installed INTEGER NOT NULL,
    group_type INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS trans_with (
    trans_id INTEGER NOT NULL REFERENCES trans(id),
    item_id INTEGER NOT NULL REFERENCES item(id),
    UNIQUE (trans_id, item_id)
);

CREATE TABLE IF NOT EXISTS console_output (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trans_id INTEGER NOT NULL REFERENCES trans(id),
    file_descriptor INTEGER NOT NULL,
    line TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS rpm_name_arch ON rpm (name, arch);
CREATE INDEX IF NOT EXISTS trans_item_trans ON trans_item (trans_id);
"#;

/// The transaction history store: one SQLite connection, serialised access.
pub struct History {
    conn: Connection,
}

impl History {
    /// Opens (creating if needed) a history database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let history = Self { conn };
        history.initialize()?;
        debug!("opened history database at {}", path.display());
        Ok(history)
    }

    /// Opens a private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let history = Self { conn };
        history.initialize()?;
        Ok(history)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Starts a new history transaction. The returned handle buffers items;
    /// nothing becomes visible until [`ActiveTransaction::finish`] commits.
    /// Dropping the handle rolls everything back.
    pub fn begin_transaction(
        &mut self,
        dt_begin: i64,
        rpmdb_version_begin: &str,
        releasever: &str,
        user_id: i64,
        cmdline: &str,
    ) -> Result<ActiveTransaction<'_>> {
        ActiveTransaction::begin(
            &mut self.conn,
            dt_begin,
            rpmdb_version_begin,
            releasever,
            user_id,
            cmdline,
        )
    }

    /// Loads one transaction record.
    pub fn transaction(&self, id: i64) -> Result<Option<TransactionRecord>> {
        self.conn
            .query_row(
                "SELECT id, dt_begin, dt_end, rpmdb_version_begin, rpmdb_version_end, \
                 releasever, user_id, cmdline, state FROM trans WHERE id = ?1",
                params![id],
                TransactionRecord::from_row,
            )
            .optional()
            .map_err(Into::into)
            .and_then(|row| row.transpose())
    }

    /// The transaction with the largest id.
    pub fn last_transaction(&self) -> Result<Option<TransactionRecord>> {
        self.conn
            .query_row(
                "SELECT id, dt_begin, dt_end, rpmdb_version_begin, rpmdb_version_end, \
                 releasever, user_id, cmdline, state FROM trans ORDER BY id DESC LIMIT 1",
                [],
                TransactionRecord::from_row,
            )
            .optional()
            .map_err(Into::into)
            .and_then(|row| row.transpose())
    }

    /// All transaction ids, descending.
    pub fn list_transaction_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM trans ORDER BY id DESC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// All items of a transaction, ascending by item id.
    pub fn transaction_items(&self, trans_id: i64) -> Result<Vec<TransactionItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT ti.id, ti.trans_id, ti.item_id, i.item_type, r.name, ti.replaced_by, \
             ti.action, ti.reason, ti.state \
             FROM trans_item ti \
             JOIN item i ON i.id = ti.item_id \
             JOIN repo r ON r.id = ti.repo_id \
             WHERE ti.trans_id = ?1 ORDER BY ti.id",
            )?;
        let rows = stmt
            .query_map(params![trans_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (id, trans_id, item_id, item_type, repoid, replaced_by, action, reason, state) in rows {
            items.push(TransactionItem {
                id,
                trans_id,
                payload: self.load_payload(item_id, item_type)?,
                repoid,
                action: TransactionItemAction::from_code(action).ok_or(
                    HistoryError::UnknownCode {
                        what: "action",
                        code: action,
                    },
                )?,
                reason: TransactionItemReason::from_code(reason).ok_or(
                    HistoryError::UnknownCode {
                        what: "reason",
                        code: reason,
                    },
                )?,
                state: ItemState::from_code(state).ok_or(HistoryError::UnknownCode {
                    what: "item state",
                    code: state,
                })?,
                replaced_by,
            });
        }
        Ok(items)
    }

    fn load_payload(&self, item_id: i64, item_type: i64) -> Result<ItemPayload> {
        match item_type {
            1 => {
                let nevra = self.conn.query_row(
                    "SELECT name, epoch, version, release, arch FROM rpm WHERE item_id = ?1",
                    params![item_id],
                    |row| {
                        Ok(Nevra::new(
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)? as u64,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )?;
                Ok(ItemPayload::Rpm(nevra))
            }
            2 => {
                let mut group = self.conn.query_row(
                    "SELECT groupid, name, translated_name, pkg_types \
                     FROM comps_group WHERE item_id = ?1",
                    params![item_id],
                    |row| {
                        Ok(CompsGroupItem {
                            groupid: row.get(0)?,
                            name: row.get(1)?,
                            translated_name: row.get(2)?,
                            pkg_types: row.get(3)?,
                            packages: Vec::new(),
                        })
                    },
                )?;
                let mut stmt = self.conn.prepare(
                    "SELECT name, installed, pkg_type FROM comps_group_package \
                     WHERE group_id = ?1 ORDER BY id",
                )?;
                group.packages = stmt
                    .query_map(params![item_id], |row| {
                        Ok(CompsGroupPackage {
                            name: row.get(0)?,
                            installed: row.get::<_, i64>(1)? != 0,
                            pkg_type: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<_>>()?;
                Ok(ItemPayload::CompsGroup(group))
            }
            3 => {
                let mut environment = self.conn.query_row(
                    "SELECT environmentid, name, translated_name, pkg_types \
                     FROM comps_environment WHERE item_id = ?1",
                    params![item_id],
                    |row| {
                        Ok(CompsEnvironmentItem {
                            environmentid: row.get(0)?,
                            name: row.get(1)?,
                            translated_name: row.get(2)?,
                            pkg_types: row.get(3)?,
                            groups: Vec::new(),
                        })
                    },
                )?;
                let mut stmt = self.conn.prepare(
                    "SELECT groupid, installed, group_type FROM comps_environment_group \
                     WHERE environment_id = ?1 ORDER BY id",
                )?;
                environment.groups = stmt
                    .query_map(params![item_id], |row| {
                        Ok(CompsEnvironmentGroup {
                            groupid: row.get(0)?,
                            installed: row.get::<_, i64>(1)? != 0,
                            group_type: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<_>>()?;
                Ok(ItemPayload::CompsEnvironment(environment))
            }
            other => Err(HistoryError::UnknownCode {
                what: "item type",
                code: other,
            }),
        }
    }

    /// The most recent item for `nevra` in a `Done` transaction, excluding the
    /// outgoing halves of replacements (`Downgraded`, `Obsoleted`, `Upgraded`).
    pub fn rpm_transaction_item(&self, nevra: &Nevra) -> Result<Option<TransactionItem>> {
        let row = self
            .conn
            .query_row(
                "SELECT ti.id FROM trans_item ti \
                 JOIN rpm r ON r.item_id = ti.item_id \
                 JOIN trans t ON t.id = ti.trans_id \
                 WHERE r.name = ?1 AND r.epoch = ?2 AND r.version = ?3 \
                   AND r.release = ?4 AND r.arch = ?5 \
                   AND t.state = 2 AND ti.action NOT IN (3, 5, 7) \
                 ORDER BY ti.trans_id DESC, ti.id DESC LIMIT 1",
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
        let Some(item_row) = row else {
            return Ok(None);
        };
        let trans_id: i64 = self.conn.query_row(
            "SELECT trans_id FROM trans_item WHERE id = ?1",
            params![item_row],
            |row| row.get(0),
        )?;
        Ok(self
            .transaction_items(trans_id)?
            .into_iter()
            .find(|item| item.id == item_row))
    }

    /// The most recent explicit reason recorded for `(name, arch)` in
    /// transactions with `id <= max_trans_id` (all of them when `None`).
    /// Defaults to `Unknown`.
    pub fn resolve_rpm_reason(
        &self,
        name: &str,
        arch: &str,
        max_trans_id: Option<i64>,
    ) -> Result<TransactionItemReason> {
        let max = max_trans_id.unwrap_or(i64::MAX);
        let reason = self
            .conn
            .query_row(
                "SELECT ti.reason FROM trans_item ti \
                 JOIN rpm r ON r.item_id = ti.item_id \
                 JOIN trans t ON t.id = ti.trans_id \
                 WHERE r.name = ?1 AND r.arch = ?2 AND t.state = 2 \
                   AND ti.trans_id <= ?3 AND ti.action NOT IN (3, 5, 7) \
                 ORDER BY ti.trans_id DESC, ti.id DESC LIMIT 1",
                params![name, arch, max],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match reason {
            Some(code) => TransactionItemReason::from_code(code).ok_or(HistoryError::UnknownCode {
                what: "reason",
                code,
            }),
            None => Ok(TransactionItemReason::Unknown),
        }
    }

    /// Whether the most recent reason for `(name, arch)` is `User`.
    pub fn user_installed(&self, name: &str, arch: &str) -> Result<bool> {
        Ok(self.resolve_rpm_reason(name, arch, None)? == TransactionItemReason::User)
    }

    /// Ids of transactions containing a package matching any pattern. A
    /// pattern is either a package name or a full NEVRA.
    pub fn search_transactions_by_rpm(&self, patterns: &[&str]) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = Vec::new();
        for pattern in patterns {
            let matched: Vec<i64> = if let Ok(nevra) = Nevra::parse(pattern) {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT ti.trans_id FROM trans_item ti \
                     JOIN rpm r ON r.item_id = ti.item_id \
                     WHERE r.name = ?1 AND r.epoch = ?2 AND r.version = ?3 \
                       AND r.release = ?4 AND r.arch = ?5",
                )?;
                let rows = stmt
                    .query_map(
                        params![
                            nevra.name,
                            nevra.epoch as i64,
                            nevra.version,
                            nevra.release,
                            nevra.arch
                        ],
                        |row| row.get(0),
                    )?
                    .collect::<rusqlite::Result<_>>()?;
                rows
            } else {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT ti.trans_id FROM trans_item ti \
                     JOIN rpm r ON r.item_id = ti.item_id WHERE r.name = ?1",
                )?;
                let rows = stmt
                    .query_map(params![pattern], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                rows
            };
            for id in matched {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Console output lines of a transaction: `(file_descriptor, line)` in
    /// capture order.
    pub fn console_output(&self, trans_id: i64) -> Result<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_descriptor, line FROM console_output WHERE trans_id = ?1 ORDER BY id",
        )?;
        let lines = stmt
            .query_map(params![trans_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(lines)
    }

    /// Appends a console output line to an existing transaction.
    pub fn add_console_output_line(
        &self,
        trans_id: i64,
        file_descriptor: i64,
        line: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO console_output (trans_id, file_descriptor, line) VALUES (?1, ?2, ?3)",
            params![trans_id, file_descriptor, line],
        )?;
        Ok(())
    }

    /// The software that performed a transaction.
    pub fn software_performed_with(&self, trans_id: i64) -> Result<Vec<Nevra>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.name, r.epoch, r.version, r.release, r.arch \
             FROM trans_with tw JOIN rpm r ON r.item_id = tw.item_id \
             WHERE tw.trans_id = ?1 ORDER BY r.name",
        )?;
        let software = stmt
            .query_map(params![trans_id], |row| {
                Ok(Nevra::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(software)
    }

    /// Records that a later item supersedes an earlier one.
    pub fn mark_item_replaced(&self, item_id: i64, replaced_by: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE trans_item SET replaced_by = ?2 WHERE id = ?1",
            params![item_id, replaced_by],
        )?;
        Ok(())
    }

    /// Builds the merged view over a range of transactions. Unknown ids are
    /// skipped; members are ordered ascending by id.
    pub fn merged(&self, ids: &[i64]) -> Result<MergedTransaction> {
        let mut merged = MergedTransaction::default();
        let mut sorted: Vec<i64> = ids.to_vec();
        sorted.sort_unstable();
        for id in sorted {
            if let Some(record) = self.transaction(id)? {
                let items = self.transaction_items(id)?;
                let console = self.console_output(id)?;
                let software = self.software_performed_with(id)?;
                merged.merge(record, items, console, software);
            }
        }
        Ok(merged)
    }
}

impl TransactionRecord {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<TransactionRecord>> {
        let state_code: i64 = row.get(8)?;
        Ok(match TransactionState::from_code(state_code) {
            Some(state) => Ok(TransactionRecord {
                id: row.get(0)?,
                dt_begin: row.get(1)?,
                dt_end: row.get(2)?,
                rpmdb_version_begin: row.get(3)?,
                rpmdb_version_end: row.get(4)?,
                releasever: row.get(5)?,
                user_id: row.get(6)?,
                cmdline: row.get(7)?,
                state,
            }),
            None => Err(HistoryError::UnknownCode {
                what: "transaction state",
                code: state_code,
            }),
        })
    }
}
