//! Declarative transition tables.
//!
//! A table maps `(status, action)` to a single `TransitionRule`; the rule names the
//! roles allowed to fire it, the fields it needs, the event it emits and where the
//! case goes next. Undefined keys are hard errors for callers, never no-ops.

use crate::status::{Closure, Status};
use caseflow_audit_spec::{
    ActionKind, AssignmentChange, CaseKind, Disposition, Outcome, Role, Visibility,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Acting role must currently be assigned.
    Assignee,
    /// Role match is enough (ICC head oversight, complainant requests).
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Text,
    Satisfaction,
    Decision,
    Disposition,
    Roles,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Text => "text",
            Field::Satisfaction => "satisfaction",
            Field::Decision => "decision",
            Field::Disposition => "disposition",
            Field::Roles => "roles",
        }
    }
}

/// Denormalized response caches on a case record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseField {
    SupervisorResponse,
    SupervisorRetry,
    AmNotes,
    ManagerResolution,
    HrResolution,
    Acknowledgement,
    DeclineReason,
    ReviewNotes,
    Resolution,
    FinalDisposition,
    ComplainantRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assign {
    Keep,
    Only(Role),
    Clear,
    Add(Role),
    Remove(Role),
    AddFromPayload,
    RemoveFromPayload,
}

impl Assign {
    fn change(&self, payload_roles: &[Role]) -> Option<AssignmentChange> {
        match self {
            Assign::Keep => None,
            Assign::Only(r) => Some(AssignmentChange::Set(vec![*r])),
            Assign::Clear => Some(AssignmentChange::Set(vec![])),
            Assign::Add(r) => Some(AssignmentChange::Add(vec![*r])),
            Assign::Remove(r) => Some(AssignmentChange::Remove(vec![*r])),
            Assign::AddFromPayload => Some(AssignmentChange::Add(payload_roles.to_vec())),
            Assign::RemoveFromPayload => Some(AssignmentChange::Remove(payload_roles.to_vec())),
        }
    }

    fn uses_payload_roles(&self) -> bool {
        matches!(self, Assign::AddFromPayload | Assign::RemoveFromPayload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub status: Status,
    pub assign: Assign,
}

impl Target {
    pub const fn new(status: Status, assign: Assign) -> Self {
        Self { status, assign }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    To(Target),
    /// Routed by the recorded satisfaction; event name gets the satisfaction label.
    Acknowledgement { accepted: Target, escalated: Target },
    /// Routed by the recorded decision; each branch names its own event.
    Approval {
        approved: (Target, &'static str),
        denied: (Target, &'static str),
    },
    /// Closes with the recorded disposition and clears assignees.
    Disposition,
    /// Status unchanged (notes, retaliation links).
    Stay,
}

/// What the caller should do once the transition is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectHint {
    None,
    NotifyAssignees,
    NotifyParties,
    SpawnRetaliationCase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: Status,
    pub action: ActionKind,
    pub roles: Vec<Role>,
    pub gate: Gate,
    pub required: Vec<Field>,
    pub event: &'static str,
    pub next: Next,
    pub visibility: Visibility,
    /// Payload may override `visibility`.
    pub author_visibility: bool,
    pub cache: Option<ResponseField>,
    pub side_effect: SideEffectHint,
}

impl TransitionRule {
    pub fn new(from: Status, action: ActionKind, roles: &[Role], event: &'static str, next: Next) -> Self {
        Self {
            from,
            action,
            roles: roles.to_vec(),
            gate: Gate::Assignee,
            required: Vec::new(),
            event,
            next,
            visibility: Visibility::External,
            author_visibility: false,
            cache: None,
            side_effect: SideEffectHint::NotifyAssignees,
        }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    pub fn requires(mut self, fields: &[Field]) -> Self {
        self.required = fields.to_vec();
        self
    }

    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    pub fn author_visibility(mut self) -> Self {
        self.author_visibility = true;
        self
    }

    pub fn caches(mut self, field: ResponseField) -> Self {
        self.cache = Some(field);
        self
    }

    pub fn with_side_effect(mut self, hint: SideEffectHint) -> Self {
        self.side_effect = hint;
        self
    }

    pub fn requires_field(&self, field: Field) -> bool {
        self.required.contains(&field)
    }

    fn assigns(&self) -> Vec<Assign> {
        match &self.next {
            Next::To(t) => vec![t.assign],
            Next::Acknowledgement { accepted, escalated } => vec![accepted.assign, escalated.assign],
            Next::Approval { approved, denied } => vec![approved.0.assign, denied.0.assign],
            Next::Disposition => vec![Assign::Clear],
            Next::Stay => vec![Assign::Keep],
        }
    }
}

/// Fully resolved effect of a rule for one recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: Status,
    pub assignment: Option<AssignmentChange>,
    pub event: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub from: String,
    pub action: ActionKind,
    pub roles: Vec<Role>,
    pub gate: Gate,
    pub required: Vec<Field>,
    pub event: &'static str,
    pub next: Vec<String>,
    pub visibility: Visibility,
}

// ----------------------------
// Table
// ----------------------------

#[derive(Debug, Clone)]
pub struct TransitionTable {
    kind: CaseKind,
    initial: Status,
    initial_assignees: Vec<Role>,
    pinned: Vec<Role>,
    origin_event: &'static str,
    origin_cache: Option<ResponseField>,
    required_parties: Vec<Role>,
    dispositions: Vec<Disposition>,
    assignable: Vec<Role>,
    terminal_labels: BTreeMap<Status, &'static str>,
    rules: BTreeMap<(Status, ActionKind), TransitionRule>,
    duplicates: Vec<(Status, ActionKind)>,
}

impl TransitionTable {
    pub fn new(kind: CaseKind, initial: Status, origin_event: &'static str) -> Self {
        Self {
            kind,
            initial,
            initial_assignees: Vec::new(),
            pinned: Vec::new(),
            origin_event,
            origin_cache: None,
            required_parties: Vec::new(),
            dispositions: Vec::new(),
            assignable: Vec::new(),
            terminal_labels: BTreeMap::new(),
            rules: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn with_assignees(mut self, roles: &[Role]) -> Self {
        self.initial_assignees = roles.to_vec();
        self
    }

    /// Roles that stay assigned until the case closes; unassigning them is refused.
    pub fn with_pinned(mut self, roles: &[Role]) -> Self {
        self.pinned = roles.to_vec();
        self
    }

    pub fn with_origin_cache(mut self, field: ResponseField) -> Self {
        self.origin_cache = Some(field);
        self
    }

    pub fn with_parties(mut self, roles: &[Role]) -> Self {
        self.required_parties = roles.to_vec();
        self
    }

    pub fn with_dispositions(mut self, ds: &[Disposition]) -> Self {
        self.dispositions = ds.to_vec();
        self
    }

    pub fn with_assignable(mut self, roles: &[Role]) -> Self {
        self.assignable = roles.to_vec();
        self
    }

    pub fn with_terminal_label(mut self, status: Status, label: &'static str) -> Self {
        self.terminal_labels.insert(status, label);
        self
    }

    pub fn with_rule(mut self, rule: TransitionRule) -> Self {
        let key = (rule.from, rule.action);
        if self.rules.insert(key, rule).is_some() {
            self.duplicates.push(key);
        }
        self
    }

    pub fn with_rules(self, rules: impl IntoIterator<Item = TransitionRule>) -> Self {
        rules.into_iter().fold(self, |t, r| t.with_rule(r))
    }

    pub fn kind(&self) -> CaseKind {
        self.kind
    }

    pub fn initial(&self) -> Status {
        self.initial
    }

    pub fn initial_assignees(&self) -> &[Role] {
        &self.initial_assignees
    }

    pub fn is_pinned(&self, role: Role) -> bool {
        self.pinned.contains(&role)
    }

    pub fn origin_event(&self) -> &'static str {
        self.origin_event
    }

    pub fn origin_cache(&self) -> Option<ResponseField> {
        self.origin_cache
    }

    pub fn required_parties(&self) -> &[Role] {
        &self.required_parties
    }

    pub fn allowed_dispositions(&self) -> &[Disposition] {
        &self.dispositions
    }

    pub fn allows_disposition(&self, d: Disposition) -> bool {
        self.dispositions.contains(&d)
    }

    pub fn assignable_roles(&self) -> &[Role] {
        &self.assignable
    }

    pub fn lookup(&self, status: Status, action: ActionKind) -> Option<&TransitionRule> {
        self.rules.get(&(status, action))
    }

    pub fn rules(&self) -> impl Iterator<Item = &TransitionRule> {
        self.rules.values()
    }

    /// Rules that can fire from `status`, in action order.
    pub fn actions_from(&self, status: Status) -> impl Iterator<Item = &TransitionRule> {
        self.rules.values().filter(move |r| r.from == status)
    }

    pub fn status_label(&self, status: Status) -> String {
        match self.terminal_labels.get(&status) {
            Some(l) => (*l).to_string(),
            None => status.label(),
        }
    }

    /// Resolve a rule against a recorded outcome. Shared by `apply` and replay so
    /// both derive the same status and assignment.
    pub fn resolve(&self, rule: &TransitionRule, outcome: &Outcome) -> Result<Resolution, String> {
        let (target, event) = match &rule.next {
            Next::To(t) => (*t, rule.event.to_string()),
            Next::Stay => (Target::new(rule.from, Assign::Keep), rule.event.to_string()),
            Next::Acknowledgement { accepted, escalated } => {
                let s = outcome.satisfaction.ok_or("acknowledgement without satisfaction")?;
                let t = if s.escalates() { *escalated } else { *accepted };
                (t, format!("{} ({})", rule.event, s.label()))
            }
            Next::Approval { approved, denied } => {
                let d = outcome.decision.ok_or("approval without decision")?;
                let (t, name) = match d {
                    caseflow_audit_spec::Decision::Approve => approved,
                    caseflow_audit_spec::Decision::Deny => denied,
                };
                (*t, (*name).to_string())
            }
            Next::Disposition => {
                let d = outcome.disposition.ok_or("final decision without disposition")?;
                if !self.allows_disposition(d) {
                    return Err(format!("disposition {} is not allowed for {} cases", d.slug(), self.kind));
                }
                (
                    Target::new(Status::Closed(Closure::Disposition(d)), Assign::Clear),
                    format!("{}: {}", rule.event, d.label()),
                )
            }
        };
        Ok(Resolution {
            status: target.status,
            assignment: target.assign.change(&outcome.roles),
            event,
        })
    }

    pub fn successors(&self, rule: &TransitionRule) -> Vec<Status> {
        match &rule.next {
            Next::To(t) => vec![t.status],
            Next::Stay => vec![rule.from],
            Next::Acknowledgement { accepted, escalated } => vec![accepted.status, escalated.status],
            Next::Approval { approved, denied } => vec![approved.0.status, denied.0.status],
            Next::Disposition => self
                .dispositions
                .iter()
                .map(|d| Status::Closed(Closure::Disposition(*d)))
                .collect(),
        }
    }

    /// Every status the table can reach from its initial status.
    pub fn reachable(&self) -> BTreeSet<Status> {
        let mut seen = BTreeSet::from([self.initial]);
        let mut queue = VecDeque::from([self.initial]);
        while let Some(s) = queue.pop_front() {
            for rule in self.actions_from(s) {
                for next in self.successors(rule) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Structural problems in the table. Empty means well formed.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (status, action) in &self.duplicates {
            issues.push(format!("duplicate rule for ({status}, {action})"));
        }
        if self.initial.is_terminal() {
            issues.push(format!("initial status {} is terminal", self.initial));
        }
        for role in &self.initial_assignees {
            if *role == Role::System {
                issues.push("system may not be assigned".to_string());
            }
        }
        for role in &self.pinned {
            if !self.initial_assignees.contains(role) {
                issues.push(format!("pinned role {role} is not an initial assignee"));
            }
        }

        for rule in self.rules() {
            let at = format!("({}, {})", rule.from, rule.action);
            if rule.from.is_terminal() {
                issues.push(format!("{at}: rule leaves terminal status"));
            }
            if rule.roles.is_empty() || rule.roles.contains(&Role::System) {
                issues.push(format!("{at}: rule must name acting roles other than system"));
            }
            let needs = match &rule.next {
                Next::Acknowledgement { .. } => Some(Field::Satisfaction),
                Next::Approval { .. } => Some(Field::Decision),
                Next::Disposition => Some(Field::Disposition),
                _ => None,
            };
            if let Some(f) = needs {
                if !rule.requires_field(f) {
                    issues.push(format!("{at}: routing depends on {} but it is not required", f.name()));
                }
            }
            if matches!(rule.next, Next::Disposition) && self.dispositions.is_empty() {
                issues.push(format!("{at}: disposition rule without allowed dispositions"));
            }
            if rule.assigns().iter().any(Assign::uses_payload_roles) && !rule.requires_field(Field::Roles) {
                issues.push(format!("{at}: payload assignment without required roles"));
            }
        }

        let reachable = self.reachable();
        for rule in self.rules() {
            if !reachable.contains(&rule.from) {
                issues.push(format!("({}, {}): rule is unreachable", rule.from, rule.action));
            }
        }

        // Every live status must lead somewhere, and eventually to a terminal status.
        let mut can_finish: BTreeSet<Status> = reachable.iter().copied().filter(Status::is_terminal).collect();
        loop {
            let before = can_finish.len();
            for rule in self.rules() {
                if self.successors(rule).iter().any(|s| can_finish.contains(s)) {
                    can_finish.insert(rule.from);
                }
            }
            if can_finish.len() == before {
                break;
            }
        }
        for s in &reachable {
            if !s.is_terminal() && !can_finish.contains(s) {
                issues.push(format!("status {s} cannot reach a terminal status"));
            }
        }

        issues
    }

    pub fn describe(&self) -> Vec<RuleSummary> {
        self.rules()
            .map(|r| RuleSummary {
                from: r.from.code(),
                action: r.action,
                roles: r.roles.clone(),
                gate: r.gate,
                required: r.required.clone(),
                event: r.event,
                next: self.successors(r).iter().map(Status::code).collect(),
                visibility: r.visibility,
            })
            .collect()
    }
}
