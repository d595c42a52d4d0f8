//! The plan that results from a successful solve.

use kestrel_rpm_types::TransactionItemAction;

use crate::id::SolvableId;

/// One step of a plan: a solvable and what happens to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanStep {
    /// The solvable the step is about.
    pub id: SolvableId,
    /// What happens to it.
    pub action: TransactionItemAction,
}

/// The ordered list of steps the solver decided on. Steps that leave the
/// system (`Upgraded`, `Obsoleted`, ...) directly follow the incoming step
/// that displaced them; standalone removals come first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<PlanStep>,
    obsoleted: Vec<(SolvableId, SolvableId)>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<PlanStep>, obsoleted: Vec<(SolvableId, SolvableId)>) -> Self {
        Self { steps, obsoleted }
    }

    /// All steps in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Whether the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The ids whose step has the given action.
    pub fn ids_with_action(&self, action: TransactionItemAction) -> Vec<SolvableId> {
        self.steps
            .iter()
            .filter(|step| step.action == action)
            .map(|step| step.id)
            .collect()
    }

    /// The action recorded for a solvable, when the plan touches it.
    pub fn action_of(&self, id: SolvableId) -> Option<TransactionItemAction> {
        self.steps
            .iter()
            .find(|step| step.id == id)
            .map(|step| step.action)
    }

    /// The packages recorded as obsoleted by the given incoming package.
    pub fn obsoleted_by(&self, by: SolvableId) -> Vec<SolvableId> {
        self.obsoleted
            .iter()
            .filter(|(_, obsoleter)| *obsoleter == by)
            .map(|(old, _)| *old)
            .collect()
    }
}
