// Application layer - use cases and orchestration over a `DataAccess` backend.

pub mod data_access;
pub mod error;
pub mod service;

pub use data_access::*;
pub use error::*;
pub use service::*;
