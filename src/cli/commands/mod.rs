pub mod migrate;
pub mod revalidate;
pub mod schema;
pub mod slug;
pub mod user;
