/// The outcome of evaluating one event against the loaded rule set.
#[derive(Debug, Clone)]
pub struct Decision {
    /// The resolved action to take.
    pub action: DecisionAction,
    /// The matched rule's message body, present for warn/block.
    pub reason: Option<String>,
    /// Non-fatal errors recovered during loading, compilation, or matching.
    /// Never cause the decision itself to change from allow.
    pub diagnostics: Vec<String>,
}

/// The action the host should take after rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionAction {
    /// Let the tool action proceed silently.
    Allow,
    /// Let the tool action proceed but surface an advisory message.
    Warn,
    /// Deny the tool action.
    Block,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            action: DecisionAction::Allow,
            reason: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn warn(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Warn,
            reason: Some(reason.into()),
            diagnostics: Vec::new(),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Block,
            reason: Some(reason.into()),
            diagnostics: Vec::new(),
        }
    }

    /// Attach accumulated diagnostics to this decision.
    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
