use caseflow_audit_spec::{ActionKind, Actor, Decision, Disposition, Role, Satisfaction, Visibility};
use serde::{Deserialize, Serialize};

/// Inputs an actor submits with an action. Which fields are required depends on
/// the transition rule being applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<Satisfaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    /// Only honoured by rules that let the author choose (case notes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_satisfaction(mut self, s: Satisfaction) -> Self {
        self.satisfaction = Some(s);
        self
    }

    pub fn with_decision(mut self, d: Decision) -> Self {
        self.decision = Some(d);
        self
    }

    pub fn with_disposition(mut self, d: Disposition) -> Self {
        self.disposition = Some(d);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_visibility(mut self, v: Visibility) -> Self {
        self.visibility = Some(v);
        self
    }

    /// Trimmed text, `None` when absent or blank.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor: Actor,
    pub action: ActionKind,
    #[serde(default)]
    pub payload: Payload,
    /// Trail length the caller last observed; a mismatch is a conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_trail_len: Option<usize>,
}

impl ActionRequest {
    pub fn new(actor: Actor, action: ActionKind, payload: Payload) -> Self {
        Self { actor, action, payload, expected_trail_len: None }
    }

    pub fn expecting(mut self, trail_len: usize) -> Self {
        self.expected_trail_len = Some(trail_len);
        self
    }
}
