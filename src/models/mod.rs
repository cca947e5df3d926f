pub mod user;
pub mod verification;

pub use user::{Account, Role, User};
pub use verification::{Purpose, VerificationPayload, VerificationRecord};
