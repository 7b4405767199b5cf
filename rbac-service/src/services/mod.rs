pub mod database;
pub mod invitations;
pub mod metrics;
pub mod tokens;

pub use database::MongoDb;
pub use invitations::InvitationClient;
pub use metrics::{get_metrics, init_metrics};
pub use tokens::{SessionClaims, TokenVerifier};
