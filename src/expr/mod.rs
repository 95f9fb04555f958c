//! Expression evaluation.
//!
//! Two small languages live here:
//! - `$(NAME)` references inside string fields ([`expand`])
//! - boolean condition expressions selecting conditional blocks
//!   ([`condition`])
//!
//! Both are pure functions of (scope, raw text).

pub mod condition;
pub mod expand;

use thiserror::Error;

pub use condition::{evaluate, Condition};
pub use expand::{contains_reference, escape_literal, expand_list, expand_str, unescape};

/// Errors produced while evaluating expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// A referenced variable is not in scope and has no default.
    #[error("undefined variable `{name}`")]
    UnresolvedVariable { name: String },

    /// The expression text is not well formed.
    #[error("invalid expression `{expr}`: {message}")]
    Syntax { expr: String, message: String },
}

impl ExprError {
    pub(crate) fn syntax(expr: &str, message: impl Into<String>) -> Self {
        ExprError::Syntax {
            expr: expr.to_string(),
            message: message.into(),
        }
    }
}
