pub mod auth;
pub mod board;
pub mod confirm;
pub mod money;
pub mod oracle;
pub mod schema;
