//! Step log for multi-step remote protocols that cannot be rolled back.
//!
//! A class and its group are written with separate calls, as are a user and
//! its activation state. When a later call fails, the log tells a repair pass
//! exactly which earlier calls landed.

use std::fmt;

/// A single remote mutation that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    UserUpdated { user_id: i64 },
    /// `class_id` is `None` when the create response carried no usable id.
    ClassCreated { class_id: Option<i64> },
    ClassUpdated { class_id: i64 },
    ClassDeleted { class_id: i64 },
    GroupCreated { class_id: i64 },
    GroupUpdated { group_id: i64 },
    GroupDeleted { group_id: i64 },
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserUpdated { user_id } => write!(f, "user {user_id} updated"),
            Self::ClassCreated { class_id: Some(id) } => write!(f, "class {id} created"),
            Self::ClassCreated { class_id: None } => write!(f, "class created (id unknown)"),
            Self::ClassUpdated { class_id } => write!(f, "class {class_id} updated"),
            Self::ClassDeleted { class_id } => write!(f, "class {class_id} deleted"),
            Self::GroupCreated { class_id } => write!(f, "group for class {class_id} created"),
            Self::GroupUpdated { group_id } => write!(f, "group {group_id} updated"),
            Self::GroupDeleted { group_id } => write!(f, "group {group_id} deleted"),
        }
    }
}

/// Ordered record of the steps a protocol has completed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaLog {
    steps: Vec<SagaStep>,
}

impl SagaLog {
    pub fn record(&mut self, step: SagaStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[SagaStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&SagaStep> {
        self.steps.last()
    }
}

impl fmt::Display for SagaLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "nothing");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
