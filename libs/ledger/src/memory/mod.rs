//! In-process adapters for the store, queue and mailer ports.

mod mailer;
mod queue;
mod store;

pub use mailer::RecordingMailer;
pub use queue::InMemoryQueue;
pub use store::{FailPoint, InMemoryStore};

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
