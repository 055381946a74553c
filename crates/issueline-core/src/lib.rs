//! issueline core - resumable fetch infrastructure for issue-tracker corpora
//!
//! Provider-independent pieces: the backoff policy and retry loop, the HTTP
//! transport, durable checkpoints and raw storage, the document extractor,
//! and the per-project resume state machine that ties them together.

pub mod backoff;
pub mod checkpoint;
pub mod error;
pub mod extract;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod raw_store;
pub mod retry;
pub mod shutdown;

// Re-exports for convenience
pub use backoff::{BackoffPolicy, parse_retry_after};
pub use checkpoint::{
    Checkpoint, CheckpointBackend, CheckpointError, CheckpointStore, JsonFileBackend,
    MemoryBackend,
};
pub use error::{Condition, FetchError, TransportError, TransportErrorKind};
pub use extract::{Extracted, extract_field, extract_plain_text, strip_markup};
pub use http::{HttpConfig, HttpResponse, ReqwestTransport, SHARED_RUNTIME, Transport, TransportFailure};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use pipeline::{
    ItemSource, Page, PipelineError, PipelineOptions, ProjectOutcome, ProjectRun, ProjectStatus,
    run_project,
};
pub use progress::{ProgressContext, fmt_num};
pub use raw_store::{RawStore, RawStoreError};
pub use retry::{Attempt, RetryPolicy, Sleeper, ThreadSleeper, retry_with_backoff};
pub use shutdown::{is_shutdown_requested, shutdown_flag};
