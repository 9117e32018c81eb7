/// Wire name of the connection handshake event.
pub const EVENT_CONNECTION_ESTABLISHED: &str = "CONNECTION_ESTABLISHED";
/// Wire name of the per-move event.
pub const EVENT_GAME_MOVE_COMPLETED: &str = "GAME_MOVE_COMPLETED";
/// Wire name of the asynchronous solver result event.
pub const EVENT_OPTIMAL_PATHS_UPDATED: &str = "OPTIMAL_PATHS_UPDATED";
/// Wire name of the terminal per-game event.
pub const EVENT_GAME_ENDED: &str = "GAME_ENDED";
/// Wire name of the task-level terminal event.
pub const EVENT_TASK_ENDED: &str = "TASK_ENDED";

/// Step budget used by the server when a task request does not name one.
pub const DEFAULT_MAX_STEPS: u32 = 30;
