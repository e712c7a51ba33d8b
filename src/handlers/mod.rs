// handlers/mod.rs - Two handler tiers
//
// Public (no auth, cached reads) → Admin (access token with an admin role, /api/admin/*)
pub mod admin;
pub mod public;
