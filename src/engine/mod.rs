//! Long-running and interactive actions built on the API client and the store.

pub mod inspector;
pub mod poller;
