pub mod actions;
pub mod error;
pub mod event_stream;
pub mod gateway;
pub mod store;
pub mod transport;

pub use actions::EmployeeActions;
pub use error::{GatewayError, StreamError};
pub use event_stream::{EventHandlers, EventStreamClient};
pub use gateway::{EmployeeGateway, HttpGateway, RequestOptions};
pub use store::{transition, Action, EmployeeState, Store};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
