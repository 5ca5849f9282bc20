//! Store module - Remote object storage backends.
//!
//! This module contains:
//! - RemoteStore trait for abstraction
//! - OSS store (Aliyun Object Storage Service over HTTP)
//! - Local store (mirror into a directory)
//! - Memory store (in-process, for tests)

pub mod local;
pub mod memory;
pub mod oss;
pub mod provider;

pub use local::LocalStore;
pub use memory::{MemoryStore, StoreCall};
pub use oss::OssStore;
pub use provider::{ListPage, RemoteStore, MAX_PAGE_SIZE};
