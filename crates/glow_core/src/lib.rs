pub mod calendar;
pub mod date;
pub mod error;
pub mod playback;
pub mod record;
pub mod service;
pub mod storage;
pub mod store;
pub mod streak;
pub mod timeline;
pub mod tip;

pub use crate::error::{GlowError, StorageError};
pub use crate::service::{CheckInService, CheckInServiceBuilder};
