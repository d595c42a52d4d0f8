use serde::{Deserialize, Serialize};

/// What a transaction did (or plans to do) with one package.
///
/// The discriminants are stable: they are the integers persisted in the history
/// database `action` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum TransactionItemAction {
    /// A fresh install of a package not present before.
    Install = 1,
    /// The incoming package of a downgrade.
    Downgrade = 2,
    /// The outgoing package of a downgrade.
    Downgraded = 3,
    /// The incoming package whose obsoletes removed another package.
    Obsolete = 4,
    /// A package removed because something else obsoletes it.
    Obsoleted = 5,
    /// The incoming package of an upgrade.
    Upgrade = 6,
    /// The outgoing package of an upgrade.
    Upgraded = 7,
    /// A plain removal.
    Remove = 8,
    /// The incoming package of a reinstall.
    Reinstall = 9,
    /// The outgoing package of a reinstall.
    Reinstalled = 10,
}

impl TransactionItemAction {
    /// All actions, in discriminant order.
    pub const ALL: &'static [TransactionItemAction] = &[
        TransactionItemAction::Install,
        TransactionItemAction::Downgrade,
        TransactionItemAction::Downgraded,
        TransactionItemAction::Obsolete,
        TransactionItemAction::Obsoleted,
        TransactionItemAction::Upgrade,
        TransactionItemAction::Upgraded,
        TransactionItemAction::Remove,
        TransactionItemAction::Reinstall,
        TransactionItemAction::Reinstalled,
    ];

    /// Decodes the persisted integer form.
    pub fn from_code(code: i64) -> Option<TransactionItemAction> {
        Self::ALL.iter().copied().find(|a| a.code() == code)
    }

    /// The persisted integer form.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Whether the package ends up present on the system.
    pub fn is_forward(self) -> bool {
        matches!(
            self,
            TransactionItemAction::Install
                | TransactionItemAction::Downgrade
                | TransactionItemAction::Obsolete
                | TransactionItemAction::Upgrade
                | TransactionItemAction::Reinstall
        )
    }

    /// Whether the package leaves the system (including being replaced).
    pub fn is_backward(self) -> bool {
        !self.is_forward()
    }
}

/// Why a package is on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum TransactionItemReason {
    /// No recorded reason.
    Unknown = 0,
    /// Pulled in to satisfy a dependency.
    Dependency = 1,
    /// Explicitly requested by the user.
    User = 2,
    /// Removed by dependency cleanup.
    Clean = 3,
    /// Pulled in by a weak dependency.
    WeakDependency = 4,
    /// Installed as a member of a comps group.
    Group = 5,
}

impl TransactionItemReason {
    /// Decodes the persisted integer form.
    pub fn from_code(code: i64) -> Option<TransactionItemReason> {
        [
            TransactionItemReason::Unknown,
            TransactionItemReason::Dependency,
            TransactionItemReason::User,
            TransactionItemReason::Clean,
            TransactionItemReason::WeakDependency,
            TransactionItemReason::Group,
        ]
        .into_iter()
        .find(|r| r.code() == code)
    }

    /// The persisted integer form.
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Lifecycle state of a history transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum TransactionState {
    /// Never started or not recorded.
    Unknown = 0,
    /// `begin` was called, `finish` was not.
    InProgress = 1,
    /// Finished successfully.
    Done = 2,
    /// Finished with an error.
    Error = 3,
}

impl TransactionState {
    /// Decodes the persisted integer form.
    pub fn from_code(code: i64) -> Option<TransactionState> {
        [
            TransactionState::Unknown,
            TransactionState::InProgress,
            TransactionState::Done,
            TransactionState::Error,
        ]
        .into_iter()
        .find(|s| s.code() == code)
    }

    /// The persisted integer form.
    pub fn code(self) -> i64 {
        self as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_round_trip() {
        for action in TransactionItemAction::ALL {
            assert_eq!(TransactionItemAction::from_code(action.code()), Some(*action));
        }
        assert_eq!(TransactionItemAction::from_code(11), None);
    }

    #[test]
    fn forward_backward_partition() {
        use TransactionItemAction::*;
        assert!(Install.is_forward());
        assert!(Upgrade.is_forward());
        assert!(Upgraded.is_backward());
        assert!(Obsoleted.is_backward());
        assert!(Remove.is_backward());
    }

    #[test]
    fn state_codes_match_schema() {
        assert_eq!(TransactionState::Unknown.code(), 0);
        assert_eq!(TransactionState::InProgress.code(), 1);
        assert_eq!(TransactionState::Done.code(), 2);
        assert_eq!(TransactionState::Error.code(), 3);
    }
}
