//! Dispatch surface: one gateway call, then exactly one state transition.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{strip_data_uri, EmployeeRecord, Field},
    error::UnknownField,
    protocol::StatusMessage,
};
use tracing::{info, warn};

use crate::{
    error::GatewayError,
    gateway::{EmployeeGateway, RequestOptions},
    store::{Action, EmployeeState, Store, UpdateOutcome},
};

pub struct EmployeeActions<G: EmployeeGateway> {
    store: Arc<Store>,
    gateway: G,
}

impl<G: EmployeeGateway> EmployeeActions<G> {
    pub fn new(store: Arc<Store>, gateway: G) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Applies a `{name, value}` form edit.
    pub fn change_field(&self, name: &str, value: &str) -> Result<EmployeeState, UnknownField> {
        let field: Field = name.parse()?;
        Ok(self.store.dispatch(Action::Change {
            field,
            value: value.to_string(),
        }))
    }

    pub fn change_photo(&self, value: &str) -> EmployeeState {
        self.store
            .dispatch(Action::PhotoChange(strip_data_uri(value).to_string()))
    }

    pub fn change_fulltime(&self, fulltime: bool) -> EmployeeState {
        self.store.dispatch(Action::FulltimeChange(fulltime))
    }

    pub async fn find_employee_by_id(&self) -> EmployeeState {
        let identity = self.store.employee().identity;
        let result = self
            .request::<EmployeeRecord>(&identity_path(&identity), RequestOptions::get())
            .await;
        self.settle("find_employee_by_id", result.map(Action::EmployeeReceived))
    }

    pub async fn hire_employee(&self) -> EmployeeState {
        let result = match serde_json::to_value(self.store.employee()) {
            Ok(body) => {
                self.request::<StatusMessage>("", RequestOptions::post(body))
                    .await
            }
            Err(err) => Err(err.into()),
        };
        self.settle(
            "hire_employee",
            result.map(|body| Action::EmployeeHired(body.status)),
        )
    }

    pub async fn fire_employee(&self) -> EmployeeState {
        let identity = self.store.employee().identity;
        let result = self
            .request::<EmployeeRecord>(&identity_path(&identity), RequestOptions::delete())
            .await;
        self.settle("fire_employee", result.map(Action::EmployeeFired))
    }

    pub async fn update_employee(&self) -> EmployeeState {
        let employee = self.store.employee();
        let path = identity_path(&employee.identity);
        let result = match serde_json::to_value(&employee) {
            Ok(body) => {
                self.request::<StatusMessage>(&path, RequestOptions::put(body))
                    .await
            }
            Err(err) => Err(err.into()),
        };
        self.settle(
            "update_employee",
            result.map(|body| Action::EmployeeUpdated(UpdateOutcome::from(&body))),
        )
    }

    pub async fn list_employees(&self) -> EmployeeState {
        let result = self
            .request::<Vec<EmployeeRecord>>("", RequestOptions::get())
            .await;
        self.settle("list_employees", result.map(Action::EmployeesListed))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, GatewayError> {
        let body: Value = self.gateway.call(path, options).await?;
        Ok(serde_json::from_value(body)?)
    }

    fn settle(&self, operation: &str, result: Result<Action, GatewayError>) -> EmployeeState {
        let action = match result {
            Ok(action) => {
                info!(operation, action = action.kind(), "employee operation succeeded");
                action
            }
            Err(err) => {
                warn!(operation, error = %err, "employee operation failed");
                Action::Error(err)
            }
        };
        self.store.dispatch(action)
    }
}

/// RFC 3986 path-segment encoding: everything but unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `/{identity}` with the identity percent-encoded as a single path segment.
pub fn identity_path(identity: &str) -> String {
    format!("/{}", utf8_percent_encode(identity, PATH_SEGMENT))
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
