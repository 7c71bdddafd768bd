//! Boolean evaluation of sanitized assertion expressions.

use evalexpr::Value;

/// Per-combination failures; always recovered by counting the combination
/// as evaluated but not matched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("unbalanced {quote} quote in assertion {template:?}")]
    UnbalancedQuote { template: String, quote: char },

    #[error("placeholder ${index} has no bound value ({bound} probes)")]
    UnboundPlaceholder { index: usize, bound: usize },

    #[error("failed to build expression {expr:?}: {message}")]
    Build { expr: String, message: String },

    #[error("failed to evaluate expression {expr:?}: {message}")]
    Evaluate { expr: String, message: String },

    #[error("expression {expr:?} evaluated to {value}, not a boolean")]
    NotBoolean { expr: String, value: String },
}

/// Capability that turns a literal expression into a boolean.
pub trait ExpressionEvaluator {
    fn evaluate(&self, expr: &str) -> Result<bool, ExpressionError>;
}

/// `evalexpr`-backed evaluator. Expressions carry no variables; every value
/// has already been bound by the sanitizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvalexprEvaluator;

impl ExpressionEvaluator for EvalexprEvaluator {
    fn evaluate(&self, expr: &str) -> Result<bool, ExpressionError> {
        let tree = evalexpr::build_operator_tree(expr).map_err(|err| ExpressionError::Build {
            expr: expr.to_string(),
            message: err.to_string(),
        })?;
        match tree.eval() {
            Ok(Value::Boolean(value)) => Ok(value),
            Ok(other) => Err(ExpressionError::NotBoolean {
                expr: expr.to_string(),
                value: other.to_string(),
            }),
            Err(err) => Err(ExpressionError::Evaluate {
                expr: expr.to_string(),
                message: err.to_string(),
            }),
        }
    }
}
