//! Event persistence (best-effort)

pub mod events;
pub mod supabase;

pub use events::{EventKind, EventSink, MatchEventRecord, MemorySink, NullSink, RestEventSink};
pub use supabase::SupabaseClient;
