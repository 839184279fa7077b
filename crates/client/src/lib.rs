pub mod clock;
pub mod config;
pub mod error;
pub mod interval;
pub mod lookup;
pub mod orchestration;
pub mod templates;
pub mod transport;
pub mod version;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, ConfigError};
pub use error::{OrchestrationError, UnsupportedOperation, ValidationError};
pub use orchestration::{ExecutionOutcome, JobPoller, Orchestrator, WaitOptions};
pub use transport::{HttpTransport, Transport, TransportError, TransportErrorKind};
