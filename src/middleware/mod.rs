pub mod auth;
pub mod json;
pub mod path;
pub mod response;

pub use auth::{admin_auth_middleware, AuthUser};
pub use json::JsonBody;
pub use path::PathParam;
pub use response::{ApiResponse, ApiResult};
