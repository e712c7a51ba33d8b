// handlers/admin/mod.rs - Back-office handlers under /api/admin
//
// Every route here sits behind `admin_auth_middleware`, so handlers can take
// `AuthUser` knowing the token is valid and the role is admin or editor.

pub mod blog;
pub mod cache;
pub mod categories;
pub mod portfolio;
pub mod settings;
pub mod technologies;
pub mod upload;
