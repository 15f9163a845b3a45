//! The module contains the errors the engine can return.
//!
//! The main ones are:
//!
//! - [`InvalidSplit`] returned when an expense cannot be split as declared
//!   (user-correctable input).
//! - [`SplitIntegrity`] returned when a computed split does not sum to zero.
//!   It signals a bug in the engine and is never corrected silently.
//!
//! Rounding drift in externally supplied balances is not an error: see
//! [`BalanceDriftWarning`].
//!
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`SplitIntegrity`]: EngineError::SplitIntegrity
//!  [`BalanceDriftWarning`]: super::settlement::BalanceDriftWarning
use thiserror::Error;

use crate::{Currency, Member, Money};

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid split for expense \"{expense}\": {reason}")]
    InvalidSplit {
        expense: String,
        member: Option<Member>,
        reason: String,
    },
    #[error("Split integrity violated for expense \"{expense}\": residual {residual}")]
    SplitIntegrity { expense: String, residual: Money },
    #[error("Amount overflow in expense \"{expense}\"")]
    AmountOverflow { expense: String },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Currency mismatch for expense \"{expense}\": group uses {expected}, expense uses {found}")]
    ExpenseCurrency {
        expense: String,
        expected: Currency,
        found: Currency,
    },
    #[error("Invalid member: {0}")]
    InvalidMember(String),
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl EngineError {
    pub(crate) fn invalid_split(expense: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSplit {
            expense: expense.to_string(),
            member: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(expense: &str) -> Self {
        Self::AmountOverflow {
            expense: expense.to_string(),
        }
    }

    pub(crate) fn invalid_split_for(
        expense: &str,
        member: &Member,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSplit {
            expense: expense.to_string(),
            member: Some(member.clone()),
            reason: reason.into(),
        }
    }

    /// Id of the expense the error refers to, if any.
    #[must_use]
    pub fn expense_id(&self) -> Option<&str> {
        match self {
            Self::InvalidSplit { expense, .. }
            | Self::SplitIntegrity { expense, .. }
            | Self::AmountOverflow { expense }
            | Self::ExpenseCurrency { expense, .. } => Some(expense.as_str()),
            _ => None,
        }
    }

    /// Returns `true` for errors the user can fix by editing the input.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, Self::SplitIntegrity { .. })
    }
}
