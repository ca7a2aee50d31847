//! Test utilities and mock implementations.
//!
//! In-memory stand-ins for the repository and event ports, used by unit
//! tests and by the integration tests under `tests/`.

pub mod mocks;

pub use mocks::{MockConfig, MockProvider, RecordingEventPublisher, mock_repos};
