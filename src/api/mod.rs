// HTTP API surface

pub mod oauth;
pub mod tasks;
pub mod token_middleware;

pub use oauth::{create_auth_router, AppError, OauthAppState};
pub use tasks::{create_tasks_router, Task, TaskList, TasksAppState};
pub use token_middleware::{require_token, CurrentToken, TokenLayerState};
