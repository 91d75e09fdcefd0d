/*!
# Staging

Moves raw exported attempts into the processed layout and groups the
processed submissions by task.
*/

pub mod extract;
pub mod tasks;

pub use extract::{Stager, StagingSummary};
pub use tasks::{discover_tasks, load_submissions, TaskSet};
