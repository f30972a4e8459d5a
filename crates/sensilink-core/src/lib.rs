// sensilink-core: Status polling, parsing, and delivery for Sensi thermostats
//
// Sits on top of sensilink-api. Owns the session lifecycle policies, the
// status message parser, credential caching, and the sinks events are
// relayed to.

pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod parser;
pub mod relay;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{PollerConfig, TlsVerification};
pub use credentials::{CommandDecryptor, CredentialCache, DecryptError, Decryptor, PasswordSource};
pub use discovery::{discover_thermostats, discover_with_config};
pub use error::CoreError;
pub use lifecycle::{LifecyclePolicy, StatusPoller};
pub use model::{InvocationContext, ProjectionRecord, StatusEvent, StoredRecord};
pub use relay::{ingest_message, relay_status, stream_records};
pub use sink::{BatchSink, EventSink, FsRecordStore, SinkError, WebhookSink};

// Types callers need alongside the poller.
pub use sensilink_api::{Session, Step, Thermostat};
