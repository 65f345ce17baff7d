//! Employee form state and the pure transition function that drives it.

use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{parse_flag, EmployeeRecord, Field},
    protocol::{action_types, ActionEnvelope, StatusMessage},
};
use tokio::sync::watch;
use tracing::debug;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOutcome {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

impl UpdateOutcome {
    /// Only the exact `ok` the API sends counts as success.
    pub fn from_status(status: &str) -> Self {
        if status == "ok" {
            UpdateOutcome::Ok
        } else {
            UpdateOutcome::Error
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOutcome::Ok => "OK",
            UpdateOutcome::Error => "ERROR",
        }
    }
}

impl From<&StatusMessage> for UpdateOutcome {
    fn from(body: &StatusMessage) -> Self {
        if body.is_ok() {
            UpdateOutcome::Ok
        } else {
            UpdateOutcome::Error
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Change { field: Field, value: String },
    PhotoChange(String),
    FulltimeChange(bool),
    Error(GatewayError),
    EmployeeReceived(EmployeeRecord),
    /// Carries the `status` field of the hire response.
    EmployeeHired(String),
    /// Carries the record the API returned for the deleted employee.
    EmployeeFired(EmployeeRecord),
    EmployeeUpdated(UpdateOutcome),
    EmployeesListed(Vec<EmployeeRecord>),
    Unknown(String),
}

impl Action {
    pub fn kind(&self) -> &str {
        match self {
            Action::Change { .. } => action_types::ON_CHANGE,
            Action::PhotoChange(_) => action_types::ON_PHOTO_CHANGE,
            Action::FulltimeChange(_) => action_types::ON_FULLTIME_CHANGE,
            Action::Error(_) => action_types::ON_ERROR,
            Action::EmployeeReceived(_) => action_types::ON_EMPLOYEE_RECEIVED,
            Action::EmployeeHired(_) => action_types::ON_EMPLOYEE_HIRED,
            Action::EmployeeFired(_) => action_types::ON_EMPLOYEE_FIRED,
            Action::EmployeeUpdated(_) => action_types::ON_EMPLOYEE_UPDATED,
            Action::EmployeesListed(_) => action_types::ON_EMPLOYEES_LISTED,
            Action::Unknown(kind) => kind.as_str(),
        }
    }

    /// Decodes a wire envelope. Anything that does not fit a known action,
    /// including `ON_CHANGE` for a field the record does not have, becomes
    /// `Action::Unknown` and is ignored by [`transition`].
    pub fn from_envelope(envelope: ActionEnvelope) -> Action {
        let ActionEnvelope { kind, value, name } = envelope;
        let decoded = match kind.as_str() {
            action_types::ON_CHANGE => name
                .as_deref()
                .and_then(|name| name.parse::<Field>().ok())
                .map(|field| Action::Change {
                    field,
                    value: value_text(&value),
                }),
            action_types::ON_PHOTO_CHANGE => Some(Action::PhotoChange(value_text(&value))),
            action_types::ON_FULLTIME_CHANGE => Some(Action::FulltimeChange(value_flag(&value))),
            action_types::ON_ERROR => Some(Action::Error(value_error(value))),
            action_types::ON_EMPLOYEE_RECEIVED => serde_json::from_value(value)
                .ok()
                .map(Action::EmployeeReceived),
            action_types::ON_EMPLOYEE_HIRED => match value {
                Value::String(status) => Some(Action::EmployeeHired(status)),
                other => serde_json::from_value::<StatusMessage>(other)
                    .ok()
                    .map(|body| Action::EmployeeHired(body.status)),
            },
            action_types::ON_EMPLOYEE_FIRED => serde_json::from_value(value)
                .ok()
                .map(Action::EmployeeFired),
            action_types::ON_EMPLOYEE_UPDATED => match value {
                Value::String(status) => Some(Action::EmployeeUpdated(match status.as_str() {
                    "OK" => UpdateOutcome::Ok,
                    "ERROR" => UpdateOutcome::Error,
                    raw => UpdateOutcome::from_status(raw),
                })),
                other => serde_json::from_value::<StatusMessage>(other)
                    .ok()
                    .map(|body| Action::EmployeeUpdated(UpdateOutcome::from(&body))),
            },
            action_types::ON_EMPLOYEES_LISTED => serde_json::from_value(value)
                .ok()
                .map(Action::EmployeesListed),
            _ => None,
        };
        decoded.unwrap_or(Action::Unknown(kind))
    }

    pub fn to_envelope(&self) -> ActionEnvelope {
        let value = match self {
            Action::Change { value, .. } | Action::PhotoChange(value) => {
                Value::String(value.clone())
            }
            Action::FulltimeChange(flag) => Value::Bool(*flag),
            Action::Error(err) => serde_json::to_value(err).unwrap_or(Value::Null),
            Action::EmployeeReceived(record) | Action::EmployeeFired(record) => {
                serde_json::to_value(record).unwrap_or(Value::Null)
            }
            Action::EmployeeHired(status) => Value::String(status.clone()),
            Action::EmployeeUpdated(outcome) => Value::String(outcome.as_str().to_string()),
            Action::EmployeesListed(records) => {
                serde_json::to_value(records).unwrap_or(Value::Null)
            }
            Action::Unknown(_) => Value::Null,
        };
        let envelope = ActionEnvelope::new(self.kind(), value);
        match self {
            Action::Change { field, .. } => envelope.with_name(field.as_str()),
            Action::PhotoChange(_) => envelope.with_name(Field::Photo.as_str()),
            Action::FulltimeChange(_) => envelope.with_name(Field::Fulltime.as_str()),
            _ => envelope,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => parse_flag(text),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn value_error(value: Value) -> GatewayError {
    match value {
        Value::String(message) => GatewayError::transport(message),
        other => serde_json::from_value(other.clone())
            .unwrap_or_else(|_| GatewayError::transport(other.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Hire,
    Update,
    Fire,
}

/// Outcome of the last hire/update/fire call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlot {
    pub operation: Operation,
    pub value: String,
}

impl StatusSlot {
    pub fn new(operation: Operation, value: impl Into<String>) -> Self {
        Self {
            operation,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmployeeState {
    pub employee: EmployeeRecord,
    pub error: Option<GatewayError>,
    pub status: Option<StatusSlot>,
    pub last_fired: Option<EmployeeRecord>,
    pub directory: Vec<EmployeeRecord>,
}

impl EmployeeState {
    pub fn status_value(&self) -> Option<&str> {
        self.status.as_ref().map(|slot| slot.value.as_str())
    }
}

pub fn transition(state: &EmployeeState, action: Action) -> EmployeeState {
    let mut next = state.clone();
    match action {
        Action::Change { field, value } => {
            next.employee = state.employee.with_field(field, &value);
        }
        Action::PhotoChange(photo) => next.employee.photo = photo,
        Action::FulltimeChange(fulltime) => next.employee.fulltime = fulltime,
        Action::Error(err) => next.error = Some(err),
        Action::EmployeeReceived(record) => {
            next.employee = record;
            next.error = None;
        }
        Action::EmployeeHired(status) => {
            next.status = Some(StatusSlot::new(Operation::Hire, status));
            next.error = None;
        }
        Action::EmployeeFired(record) => {
            next.last_fired = Some(record);
            next.status = Some(StatusSlot::new(Operation::Fire, UpdateOutcome::Ok.as_str()));
            next.error = None;
        }
        Action::EmployeeUpdated(outcome) => {
            next.status = Some(StatusSlot::new(Operation::Update, outcome.as_str()));
            next.error = None;
        }
        Action::EmployeesListed(records) => {
            next.directory = records;
            next.error = None;
        }
        Action::Unknown(_) => {}
    }
    next
}

/// Owner of the live [`EmployeeState`]. Actions are applied one at a time.
pub struct Store {
    state: watch::Sender<EmployeeState>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(EmployeeState::default())
    }

    pub fn with_state(state: EmployeeState) -> Self {
        let (state, _) = watch::channel(state);
        Self { state }
    }

    pub fn dispatch(&self, action: Action) -> EmployeeState {
        debug!(action = action.kind(), "applying employee action");
        let mut applied = None;
        self.state.send_modify(|state| {
            *state = transition(state, action);
            applied = Some(state.clone());
        });
        applied.unwrap_or_else(|| self.snapshot())
    }

    pub fn dispatch_envelope(&self, envelope: ActionEnvelope) -> EmployeeState {
        self.dispatch(Action::from_envelope(envelope))
    }

    pub fn snapshot(&self) -> EmployeeState {
        self.state.borrow().clone()
    }

    pub fn employee(&self) -> EmployeeRecord {
        self.state.borrow().employee.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EmployeeState> {
        self.state.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
