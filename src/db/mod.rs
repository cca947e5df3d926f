pub mod pool;
pub mod users;
pub mod verifications;

pub use pool::{open_database, Db};
