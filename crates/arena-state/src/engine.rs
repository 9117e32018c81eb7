//! The task state engine a host drives.
//!
//! Owns the single active [`Task`], routes events into its history, moves
//! the viewport, and tells subscribers that something changed. Nothing in
//! here fails outward: unreconcilable events come back as
//! [`EventOutcome::Ignored`] with the reason, and the task is untouched.

use arena_protocol::{GameEvent, GameEventKind};

use crate::graph::{build_page_graph, GraphOptions, PageGraphData};
use crate::history::HistoryStore;
use crate::progress::{game_progress, GameProgress};
use crate::task::{GameConfig, Task};
use crate::StateError;

/// Handle returned by [`TaskStateEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What became of one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// No task has been created, or it was reset.
    NoActiveTask,
    /// Not one of the current task's games; usually a previous task's
    /// stream that has not torn down yet.
    UnknownGame,
    Malformed,
    /// Solver output for a page this game never visited.
    UnresolvedAttachment,
    /// A task-wide event routed through a per-game path.
    TaskLevel,
}

impl From<&StateError> for IgnoreReason {
    fn from(err: &StateError) -> Self {
        match err {
            StateError::UnknownGame(_) => Self::UnknownGame,
            StateError::UnresolvedAttachment { .. } => Self::UnresolvedAttachment,
            StateError::Malformed(_) | StateError::Protocol(_) => Self::Malformed,
            StateError::NotAGameEvent(_) => Self::TaskLevel,
        }
    }
}

type Listener = Box<dyn FnMut(&TaskStateEngine)>;

pub struct TaskStateEngine {
    task: Option<Task>,
    options: GraphOptions,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for TaskStateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskStateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStateEngine")
            .field("task", &self.task)
            .field("options", &self.options)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TaskStateEngine {
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            task: None,
            options,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Replace the active task with a fresh one for `configs`.
    ///
    /// Returns false, leaving no task, when `configs` is empty.
    pub fn create_task(&mut self, configs: &[GameConfig]) -> bool {
        let created = match HistoryStore::from_configs(configs) {
            Some(history) => {
                let task = Task::new(history);
                tracing::info!(
                    generation = %task.generation,
                    start = %task.start_page(),
                    target = %task.target_page(),
                    games = configs.len(),
                    "Created task"
                );
                self.task = Some(task);
                true
            }
            None => {
                tracing::warn!("create_task called without games; no task is active");
                self.task = None;
                false
            }
        };
        self.notify();
        created
    }

    /// Drop the active task.
    pub fn reset(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::info!(generation = %task.generation, "Task reset");
        }
        self.notify();
    }

    /// Route one event to the game it belongs to.
    pub fn handle_game_event(&mut self, game_id: &str, event: &GameEvent) -> EventOutcome {
        let Some(task) = self.task.as_mut() else {
            tracing::debug!(game_id, event_type = event.event_type(), "No active task; event dropped");
            return EventOutcome::Ignored(IgnoreReason::NoActiveTask);
        };

        if let GameEventKind::TaskEnded { .. } = event.kind {
            task.task_ended = true;
            tracing::info!(generation = %task.generation, "Task ended");
            self.notify();
            return EventOutcome::Applied;
        }

        match task.history.apply_event(game_id, &event.kind) {
            Ok(()) => {
                let current = task.history.current_page_index();
                task.viewport.follow(current);
                self.notify();
                EventOutcome::Applied
            }
            Err(err) => {
                let reason = IgnoreReason::from(&err);
                match reason {
                    IgnoreReason::UnknownGame => tracing::warn!(
                        game_id,
                        generation = %task.generation,
                        event_type = event.event_type(),
                        "Event for a game outside the current task dropped as stale"
                    ),
                    IgnoreReason::UnresolvedAttachment => tracing::debug!(
                        game_id,
                        error = %err,
                        "Solver result matches no visited page; dropped"
                    ),
                    _ => tracing::warn!(
                        game_id,
                        event_type = event.event_type(),
                        error = %err,
                        "Event dropped"
                    ),
                }
                EventOutcome::Ignored(reason)
            }
        }
    }

    /// Decode one wire message and route it to `game_id`.
    pub fn handle_raw_event(&mut self, game_id: &str, raw: &str) -> EventOutcome {
        match GameEvent::from_json(raw) {
            Ok(event) => self.handle_game_event(game_id, &event),
            Err(e) => {
                tracing::warn!(game_id, error = %e, "Undecodable event dropped");
                EventOutcome::Ignored(IgnoreReason::Malformed)
            }
        }
    }

    pub fn step_forward(&mut self) -> bool {
        self.move_viewport(|viewport, current| viewport.step_forward(current))
    }

    pub fn step_backward(&mut self) -> bool {
        self.move_viewport(|viewport, current| viewport.step_backward(current))
    }

    pub fn enter_live_mode(&mut self) -> bool {
        self.move_viewport(|viewport, current| viewport.enter_live_mode(current))
    }

    pub fn set_global_viewing_page_index(&mut self, index: usize) -> bool {
        self.move_viewport(|viewport, current| viewport.set_viewing_index(index, current))
    }

    pub fn can_step_forward(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| t.viewport.can_step_forward(t.current_page_index()))
    }

    pub fn can_step_backward(&self) -> bool {
        self.task.as_ref().is_some_and(|t| t.viewport.can_step_backward())
    }

    pub fn get_task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Page graph at the viewed index; empty without a task.
    pub fn get_visualization_data(&self) -> PageGraphData {
        match &self.task {
            Some(task) => build_page_graph(&task.history, task.viewing_page_index(), &self.options),
            None => PageGraphData::default(),
        }
    }

    pub fn get_game_progress(&self) -> Vec<GameProgress> {
        match &self.task {
            Some(task) => game_progress(&task.history, task.viewing_page_index()),
            None => Vec::new(),
        }
    }

    /// Register a change listener. It is called with the engine after every
    /// state change and pulls whatever it needs from there.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TaskStateEngine) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn move_viewport<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut crate::viewport::Viewport, usize) -> bool,
    {
        let Some(task) = self.task.as_mut() else {
            return false;
        };
        let current = task.history.current_page_index();
        let changed = op(&mut task.viewport, current);
        if changed {
            tracing::debug!(
                mode = %task.viewport.mode(),
                viewing = task.viewport.viewing_page_index(),
                current,
                "Viewport moved"
            );
            self.notify();
        }
        changed
    }

    fn notify(&mut self) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(self);
        }
        self.listeners = listeners;
    }
}
