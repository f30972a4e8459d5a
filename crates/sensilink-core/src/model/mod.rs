// ── Domain model ──
//
// Values that leave the poller: the status event itself and the two
// shapes it takes once stored and projected for analytics.

mod record;
mod status;

pub use record::{ProjectionRecord, StoredRecord};
pub use status::{InvocationContext, StatusEvent};
