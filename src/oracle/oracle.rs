use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use crate::hash::codec::GrayImage;
use crate::model::action::ActionDescriptor;
use crate::model::ui_tree::UiNode;

/// Everything a decision oracle may look at for one step.
pub struct OracleRequest<'a> {
    pub ui_tree: &'a UiNode,
    pub screenshot: &'a GrayImage,
    /// Descriptions of actions previously attempted from this screen.
    pub previous_actions: &'a [String],
    /// How many times this screen has been visited this run.
    pub visit_count: u32,
    /// Outcome feedback for the last step ("no change", execution error...).
    pub last_feedback: Option<&'a str>,
}

/// The oracle could not produce a usable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Provider unreachable or refused the request.
    Unavailable(String),
    /// Provider answered but the response was not a valid action.
    InvalidResponse(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Unavailable(msg) => write!(f, "oracle unavailable: {}", msg),
            OracleError::InvalidResponse(msg) => write!(f, "invalid oracle response: {}", msg),
        }
    }
}

impl Error for OracleError {}

/// Decision-making capability that proposes the next action. The engine
/// never branches on provider identity; every provider lives behind this
/// trait.
pub trait DecisionOracle {
    fn suggest(&mut self, request: &OracleRequest) -> Result<ActionDescriptor, OracleError>;
}

/// Oracle that replays a fixed script of results; for tests and demos.
pub struct ScriptedOracle {
    script: VecDeque<Result<ActionDescriptor, OracleError>>,
    /// Returned once the script runs out.
    exhausted: Result<ActionDescriptor, OracleError>,
}

impl ScriptedOracle {
    pub fn new(script: impl IntoIterator<Item = Result<ActionDescriptor, OracleError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            exhausted: Err(OracleError::Unavailable("script exhausted".into())),
        }
    }

    pub fn with_exhausted(mut self, result: Result<ActionDescriptor, OracleError>) -> Self {
        self.exhausted = result;
        self
    }
}

impl DecisionOracle for ScriptedOracle {
    fn suggest(&mut self, _request: &OracleRequest) -> Result<ActionDescriptor, OracleError> {
        self.script.pop_front().unwrap_or_else(|| self.exhausted.clone())
    }
}
