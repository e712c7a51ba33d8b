// handlers/public/auth/mod.rs - Session endpoints
//
// Login issues an access token (`jwt_token` cookie) and a refresh token
// (`refresh_token` cookie); refresh trades the latter for a new access token.

pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;

pub use login::login;
pub use logout::logout;
pub use me::me;
pub use refresh::refresh;
