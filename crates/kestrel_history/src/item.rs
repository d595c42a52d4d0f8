use kestrel_rpm_types::{Nevra, TransactionItemAction, TransactionItemReason};

/// Per-item progress state within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ItemState {
    /// Not yet processed by the executor.
    Pending = 0,
    /// Processed successfully.
    Done = 1,
    /// Processing failed.
    Error = 2,
}

impl ItemState {
    /// Decodes the persisted integer form.
    pub fn from_code(code: i64) -> Option<ItemState> {
        match code {
            0 => Some(ItemState::Pending),
            1 => Some(ItemState::Done),
            2 => Some(ItemState::Error),
            _ => None,
        }
    }

    /// The persisted integer form.
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// One package of a comps group item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompsGroupPackage {
    /// Package name.
    pub name: String,
    /// Whether the package was installed when the group was recorded.
    pub installed: bool,
    /// Comps package type bits.
    pub pkg_type: i64,
}

/// A comps group whose membership changed in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompsGroupItem {
    /// The comps group id.
    pub groupid: String,
    /// Untranslated name.
    pub name: String,
    /// Translated name.
    pub translated_name: String,
    /// Comps package type bits of the group.
    pub pkg_types: i64,
    /// Group members.
    pub packages: Vec<CompsGroupPackage>,
}

/// One group of a comps environment item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompsEnvironmentGroup {
    /// The comps group id.
    pub groupid: String,
    /// Whether the group was installed when the environment was recorded.
    pub installed: bool,
    /// Comps group type bits.
    pub group_type: i64,
}

/// A comps environment whose membership changed in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompsEnvironmentItem {
    /// The comps environment id.
    pub environmentid: String,
    /// Untranslated name.
    pub name: String,
    /// Translated name.
    pub translated_name: String,
    /// Comps package type bits of the environment.
    pub pkg_types: i64,
    /// Environment members.
    pub groups: Vec<CompsEnvironmentGroup>,
}

/// What a transaction item is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPayload {
    /// An rpm package.
    Rpm(Nevra),
    /// A comps group.
    CompsGroup(CompsGroupItem),
    /// A comps environment.
    CompsEnvironment(CompsEnvironmentItem),
}

impl ItemPayload {
    pub(crate) fn type_code(&self) -> i64 {
        match self {
            ItemPayload::Rpm(_) => 1,
            ItemPayload::CompsGroup(_) => 2,
            ItemPayload::CompsEnvironment(_) => 3,
        }
    }

    /// The rpm NEVRA, when this is an rpm item.
    pub fn as_rpm(&self) -> Option<&Nevra> {
        match self {
            ItemPayload::Rpm(nevra) => Some(nevra),
            _ => None,
        }
    }
}

/// One item of a persisted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionItem {
    /// The `trans_item` row id; monotonically increasing within a transaction.
    pub id: i64,
    /// The transaction this item belongs to.
    pub trans_id: i64,
    /// What the item is about.
    pub payload: ItemPayload,
    /// The repository the package came from.
    pub repoid: String,
    /// What happened.
    pub action: TransactionItemAction,
    /// Why it happened.
    pub reason: TransactionItemReason,
    /// Progress state.
    pub state: ItemState,
    /// The item that replaced this one, when a later transaction superseded
    /// it. An arena id into `trans_item`, never a pointer.
    pub replaced_by: Option<i64>,
}
