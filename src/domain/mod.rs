mod access;
mod fleet_report;
mod fuel;
mod leave;
mod odometer;
mod permit;
mod records;
mod units;
mod vehicle;

pub use access::*;
pub use fleet_report::*;
pub use fuel::*;
pub use leave::*;
pub use odometer::*;
pub use permit::*;
pub use records::*;
pub use units::*;
pub use vehicle::*;
