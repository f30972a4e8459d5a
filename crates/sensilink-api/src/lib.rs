// sensilink-api: Async Rust client for the Sensi thermostat cloud

pub mod account;
pub mod auth;
pub mod error;
pub mod realtime;
pub mod session;
pub mod transport;

pub use account::Thermostat;
pub use auth::Credentials;
pub use error::{Error, Step};
pub use realtime::{DEFAULT_BASE_URL, Envelope, SessionClient};
pub use session::Session;
pub use transport::{TlsMode, TransportConfig};
