//! Background cleanup of expired verification sessions

mod scheduler;


pub use scheduler::{CleanupReport, CleanupScheduler};
