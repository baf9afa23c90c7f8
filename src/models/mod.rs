pub mod person;
pub mod session;
pub mod task;

pub use person::{normalize_email, NewPerson, Person};
pub use session::Session;
pub use task::{Ownership, Task, TaskPatch};
