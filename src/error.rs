use arcstr::ArcStr;
use thiserror::Error;

use crate::geometry::Int;

#[derive(Debug, Error)]
pub enum CellError {
    #[error("invalid sizing: {0}")]
    InvalidSizing(String),

    #[error("malformed topology: {0}")]
    MalformedTopology(String),

    #[error("legalization failure: rule `{rule}` requires {required}, but only {available} is available")]
    LegalizationFailure {
        rule: String,
        required: Int,
        available: Int,
    },

    #[error("routing infeasible for net `{net}`: {reason}")]
    RoutingInfeasible { net: ArcStr, reason: String },

    #[error("missing technology rule: {0}")]
    MissingRule(String),

    #[error("invalid technology rule: {0}")]
    InvalidRule(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse technology file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("could not serialize cell: {0}")]
    Json(#[from] serde_json::Error),
}

impl CellError {
    pub(crate) fn routing(net: impl Into<ArcStr>, reason: impl Into<String>) -> Self {
        Self::RoutingInfeasible {
            net: net.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn topology(reason: impl Into<String>) -> Self {
        Self::MalformedTopology(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, CellError>;
