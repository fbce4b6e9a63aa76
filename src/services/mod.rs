//! GitHub API service implementations.

mod copilot;
mod rate_limit;
mod repositories;
mod search;
mod users;

pub use copilot::*;
pub use rate_limit::*;
pub use repositories::*;
pub use search::*;
pub use users::*;
