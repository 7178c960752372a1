//! # Management Policies
//!
//! `spec.managementPolicies` limits what the engine may do. Empty or `["*"]`
//! allows everything.

use crate::crd::ManagementAction;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ManagementPolicies {
    actions: HashSet<ManagementAction>,
}

impl ManagementPolicies {
    pub fn new(actions: &[ManagementAction]) -> Self {
        let mut actions: HashSet<ManagementAction> = actions.iter().copied().collect();
        if actions.is_empty() {
            actions.insert(ManagementAction::All);
        }
        Self { actions }
    }

    fn allows(&self, action: ManagementAction) -> bool {
        self.actions.contains(&ManagementAction::All) || self.actions.contains(&action)
    }

    pub fn should_observe(&self) -> bool {
        self.allows(ManagementAction::Observe)
    }

    pub fn should_create(&self) -> bool {
        self.allows(ManagementAction::Create)
    }

    pub fn should_update(&self) -> bool {
        self.allows(ManagementAction::Update)
    }

    pub fn should_delete(&self) -> bool {
        self.allows(ManagementAction::Delete)
    }

    pub fn should_late_initialize(&self) -> bool {
        self.allows(ManagementAction::LateInitialize)
    }
}
