//! State module for tracking crawl progress
//!
//! A crawl task is created `Running` when its worker starts and ends in
//! exactly one terminal state. Terminal tasks are never re-queued.

mod task_state;

pub use task_state::TaskState;
