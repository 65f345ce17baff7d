use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::EmployeeRecord,
    error::{ApiError, ErrorCode},
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::store::{Operation, StatusSlot};

#[derive(Clone, Default)]
struct HrServerState {
    employees: Arc<Mutex<HashMap<String, Value>>>,
    last_put: Arc<Mutex<Option<Value>>>,
}

fn status_body(status: StatusCode, label: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "status": label, "message": message })),
    )
        .into_response()
}

async fn list_employees(State(state): State<HrServerState>) -> Json<Vec<Value>> {
    let employees = state.employees.lock().await;
    let mut list: Vec<Value> = employees.values().cloned().collect();
    list.sort_by_key(|value| value["identity"].as_str().unwrap_or_default().to_string());
    Json(list)
}

async fn hire_employee(State(state): State<HrServerState>, Json(body): Json<Value>) -> Response {
    let identity = body["identity"].as_str().unwrap_or_default().to_string();
    let mut employees = state.employees.lock().await;
    if employees.contains_key(&identity) {
        return status_body(
            StatusCode::CONFLICT,
            "error",
            &format!("Employee with identity {identity} already exists"),
        );
    }
    employees.insert(identity, body);
    status_body(StatusCode::CREATED, "ok", "Employee hired")
}

async fn find_employee(
    State(state): State<HrServerState>,
    Path(identity): Path<String>,
) -> Response {
    if identity == "garbage" {
        return (StatusCode::OK, "definitely not json").into_response();
    }
    match state.employees.lock().await.get(&identity) {
        Some(employee) => Json(employee.clone()).into_response(),
        None => status_body(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("Employee with identity {identity} not found"),
        ),
    }
}

async fn update_employee(
    State(state): State<HrServerState>,
    Path(identity): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    *state.last_put.lock().await = Some(body.clone());
    let mut employees = state.employees.lock().await;
    match employees.get_mut(&identity) {
        Some(employee) => {
            *employee = body;
            status_body(StatusCode::OK, "ok", "Employee updated")
        }
        None => status_body(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("Employee with identity {identity} not found"),
        ),
    }
}

async fn fire_employee(
    State(state): State<HrServerState>,
    Path(identity): Path<String>,
) -> Response {
    match state.employees.lock().await.remove(&identity) {
        Some(employee) => Json(employee).into_response(),
        None => status_body(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("Employee with identity {identity} not found"),
        ),
    }
}

async fn spawn_hr_server() -> (String, HrServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = HrServerState::default();
    let app = Router::new()
        .route(
            "/hr/api/v1/employees",
            get(list_employees).post(hire_employee),
        )
        .route(
            "/hr/api/v1/employees/:identity",
            get(find_employee).put(update_employee).delete(fire_employee),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn jack() -> Value {
    json!({
        "identity": "11111111110",
        "fullname": "jack bauer",
        "salary": 100000.0,
        "iban": "TR12345",
        "birth_year": 1986,
        "department": "SALES",
        "photo": "QUJD",
        "fulltime": true
    })
}

fn actions_for(server_url: &str) -> EmployeeActions<HttpGateway> {
    EmployeeActions::new(Arc::new(Store::new()), HttpGateway::new(server_url))
}

#[test]
fn http_gateway_joins_base_resource_path() {
    let gateway = HttpGateway::new("http://localhost:7001/");
    assert_eq!(
        gateway.base_url(),
        "http://localhost:7001/hr/api/v1/employees"
    );
}

#[tokio::test]
async fn find_loads_existing_employee_over_http() {
    let (server_url, server) = spawn_hr_server().await;
    server
        .employees
        .lock()
        .await
        .insert("11111111110".to_string(), jack());

    let actions = actions_for(&server_url);
    actions
        .change_field("identity", "11111111110")
        .expect("identity field");
    let state = actions.find_employee_by_id().await;

    let expected: EmployeeRecord = serde_json::from_value(jack()).expect("record");
    assert_eq!(state.employee, expected);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn find_missing_employee_records_not_found_error() {
    let (server_url, _server) = spawn_hr_server().await;
    let actions = actions_for(&server_url);
    actions.change_field("identity", "404").expect("identity");
    actions.change_field("fullname", "kept").expect("fullname");

    let state = actions.find_employee_by_id().await;

    let err = state.error.expect("error stored");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(
        err,
        GatewayError::status(404, Some("Employee with identity 404 not found".to_string()))
    );
    assert_eq!(state.employee.fullname, "kept");
    assert_eq!(
        err.to_api_error(),
        ApiError::new(
            ErrorCode::NotFound,
            "server responded with status 404: Employee with identity 404 not found"
        )
    );
}

#[tokio::test]
async fn find_accepts_record_updated_after_hire_with_null_photo() {
    let (server_url, server) = spawn_hr_server().await;
    server.employees.lock().await.insert(
        "33333333330".to_string(),
        json!({
            "identity": "33333333330",
            "fullname": "kim bauer",
            "salary": 40000,
            "iban": "TR3",
            "birth_year": 1999,
            "department": "HR",
            "photo": null,
            "full_time": true,
            "fulltime": false
        }),
    );
    let actions = actions_for(&server_url);
    actions.change_field("identity", "33333333330").expect("identity");

    let state = actions.find_employee_by_id().await;

    assert_eq!(state.error, None);
    assert_eq!(state.employee.fullname, "kim bauer");
    assert_eq!(state.employee.photo, "");
    assert!(!state.employee.fulltime);
}

#[tokio::test]
async fn undecodable_body_becomes_decode_error() {
    let (server_url, _server) = spawn_hr_server().await;
    let actions = actions_for(&server_url);
    actions.change_field("identity", "garbage").expect("identity");

    let state = actions.find_employee_by_id().await;
    assert!(matches!(state.error, Some(GatewayError::Decode { .. })));
}

#[tokio::test]
async fn unreachable_server_becomes_transport_error() {
    let actions = actions_for("http://127.0.0.1:1");
    actions.change_field("identity", "1").expect("identity");

    let state = actions.find_employee_by_id().await;
    assert!(matches!(state.error, Some(GatewayError::Transport { .. })));
}

#[tokio::test]
async fn hire_update_list_and_fire_round_trip_against_api() {
    let (server_url, server) = spawn_hr_server().await;
    let actions = actions_for(&server_url);

    actions.change_field("identity", "22222222220").expect("identity");
    actions.change_field("fullname", "chloe o'brian").expect("fullname");
    actions.change_field("salary", "90000").expect("salary");
    actions.change_field("department", "IT").expect("department");
    actions.change_fulltime(true);

    let hired = actions.hire_employee().await;
    assert_eq!(hired.status, Some(StatusSlot::new(Operation::Hire, "ok")));
    assert!(server.employees.lock().await.contains_key("22222222220"));

    let duplicate = actions.hire_employee().await;
    assert_eq!(
        duplicate.error.as_ref().map(GatewayError::code),
        Some(ErrorCode::Conflict)
    );

    actions.change_field("salary", "95000").expect("salary");
    let updated = actions.update_employee().await;
    assert_eq!(updated.status_value(), Some("OK"));
    assert_eq!(updated.error, None);
    let put_body = server.last_put.lock().await.clone().expect("put body");
    assert_eq!(put_body["salary"], json!("95000"));
    assert_eq!(put_body["fulltime"], json!(true));

    let listed = actions.list_employees().await;
    assert_eq!(listed.directory.len(), 1);
    assert_eq!(listed.directory[0].fullname, "chloe o'brian");

    let fired = actions.fire_employee().await;
    assert_eq!(fired.status, Some(StatusSlot::new(Operation::Fire, "OK")));
    assert_eq!(
        fired.last_fired.as_ref().map(|record| record.identity.as_str()),
        Some("22222222220")
    );
    assert_eq!(fired.employee.identity, "22222222220");
    assert!(server.employees.lock().await.is_empty());
}

#[tokio::test]
async fn update_of_unknown_employee_is_an_error_not_a_status() {
    let (server_url, _server) = spawn_hr_server().await;
    let actions = actions_for(&server_url);
    actions.change_field("identity", "nobody").expect("identity");

    let state = actions.update_employee().await;
    assert_eq!(state.status, None);
    assert_eq!(
        state.error.map(|err| err.code()),
        Some(ErrorCode::NotFound)
    );
}
