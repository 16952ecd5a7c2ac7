pub mod job;
pub mod pending;
pub mod record;

pub use job::{JobKind, JobPhase, JobRecord, JobState};
pub use pending::{OrderStatus, PendingOrder};
pub use record::{ExtractedRecord, FieldInfo, RecordUpdate, DEFAULT_CURRENCY, EDITABLE_FIELDS};
