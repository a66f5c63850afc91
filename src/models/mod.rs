pub mod task;
pub mod user;

pub use task::{NewTaskRequest, Task, TaskListQuery, TaskPriority, TaskStatus, UpdateTaskRequest};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, User, UserProfile};
