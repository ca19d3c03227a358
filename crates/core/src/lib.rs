//! Employee records and the persistence gateway that maps them onto
//! server-side procedures.

pub mod application;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

pub use application::EmployeeGateway;
pub use domain::{Department, Employee};
pub use error::{GatewayError, StoreError, StoreErrorKind};
pub use ports::{ConnectionProvider, Procedure, Row, SqlValue, StoreConnection};
