// Application layer - use cases and orchestration
// Every client (CLI, export, tests) goes through OfficeService.

pub mod error;
pub mod records;
pub mod requests;
pub mod service;
pub mod views;

pub use error::*;
pub use requests::*;
pub use service::*;
pub use views::*;
