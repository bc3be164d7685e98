//! Shared helpers for devsync integration tests.
//!
//! - `TestHarness`: a throwaway source tree plus a matching config
//! - `FakeCluster`: scripted reconciler objects on virtual time
//! - `FlakyStore`: an in-memory store that fails chosen uploads

pub mod fakes;
pub mod harness;

pub use fakes::{FakeCluster, FakeObject, FlakyStore};
pub use harness::TestHarness;
