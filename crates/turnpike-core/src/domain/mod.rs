//! Domain model (ids, challenge, task state, errors).

pub mod challenge;
pub mod errors;
pub mod ids;
pub mod state;
pub mod task;

pub use self::challenge::Challenge;
pub use self::errors::{SolveError, StoreError};
pub use self::ids::{ParseIdError, TaskId, WorkerId};
pub use self::state::TaskStatus;
pub use self::task::{FAILURE_SENTINEL, TaskRecord};
