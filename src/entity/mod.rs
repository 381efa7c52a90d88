pub mod agent;
pub mod jobs;
pub mod needs;
pub mod tasks;

pub use agent::{Agent, AgentKind, Job};
pub use needs::{NeedKind, Needs};
pub use tasks::{Task, TaskKind, TaskState};
