use thiserror::Error;

use crate::parser::Rule;

/// Errors raised while tokenizing, parsing or interpreting a single expression.
#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("syntax error in expression `{expression}` at position {position}: {message}")]
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },
    #[error("failed to parse expression `{expression}`: {source}")]
    Grammar {
        expression: String,
        #[source]
        source: Box<pest::error::Error<Rule>>,
    },
    #[error("cannot read `{property}` of {target}")]
    Reference { target: String, property: String },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("cannot extend non-container value: {0}")]
    NonExtendableType(String),
    #[error("undefined function `{0}`")]
    UndefinedFunction(String),
    #[error("invalid arguments for `{0}`: {1}")]
    FunctionArgs(String, String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExpressionError {
    pub fn syntax(expression: &str, position: usize, message: impl Into<String>) -> Self {
        ExpressionError::Syntax {
            expression: expression.to_string(),
            position,
            message: message.into(),
        }
    }
}

/// Errors surfaced by the engine to callers of `process`, `evaluate` and friends.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error("unknown modifier `{name}` in expression `{expression}`")]
    UnknownModifier { name: String, expression: String },
    #[error("expression `{0}` resolved to nothing")]
    UndefinedValue(String),
    #[error("failed to load template `{name}`: {reason}")]
    TemplateLoad { name: String, reason: String },
    #[error("markup error at position {position}: {message}")]
    Markup { position: usize, message: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl TemplateError {
    /// Fatal errors abort an alternation chain instead of falling through
    /// to the next alternative.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TemplateError::UnknownModifier { .. }
                | TemplateError::Expression(ExpressionError::Syntax { .. })
                | TemplateError::Expression(ExpressionError::Grammar { .. })
        )
    }
}
