//! Task management commands for CLI.

use clap::Subcommand;
use pomodojo_core::{Priority, TaskId, TaskPatch};

use super::open_app;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task
    Add {
        /// Task text
        text: String,
        /// Priority: low, medium or high
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Estimated focus sessions
        #[arg(long, default_value = "1")]
        estimate: u32,
        /// Make the new task the active one
        #[arg(long)]
        activate: bool,
    },
    /// List tasks
    List {
        /// Only tasks still open
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        /// Only finished tasks
        #[arg(long)]
        completed: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: TaskId,
    },
    /// Update a task
    Update {
        /// Task ID
        id: TaskId,
        /// New text
        #[arg(long)]
        text: Option<String>,
        /// New priority
        #[arg(long)]
        priority: Option<Priority>,
        /// New estimate
        #[arg(long)]
        estimate: Option<u32>,
        /// Overwrite the completed unit count
        #[arg(long)]
        units: Option<u32>,
        /// Set completed status
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Mark a task done, crediting its full estimate
    Done {
        /// Task ID
        id: TaskId,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },
    /// Make a task the one focus sessions are credited to
    Activate {
        /// Task ID
        id: TaskId,
    },
    /// Activate a task, or clear it if it is already active
    Toggle {
        /// Task ID
        id: TaskId,
    },
    /// Credit one focus session to a task by hand
    Credit {
        /// Task ID
        id: TaskId,
    },
    /// Clear the active task
    Deactivate,
    /// Show the active task
    Active,
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut app, _) = open_app()?;

    match action {
        TaskAction::Add {
            text,
            priority,
            estimate,
            activate,
        } => {
            let id = app.add_task(&text, priority, estimate)?;
            if activate {
                app.set_active_task(Some(id))?;
            }
            eprintln!("Task added: {id}");
            println!("{}", serde_json::to_string_pretty(&app.task(id))?);
        }
        TaskAction::List { pending, completed } => {
            let tasks = if pending {
                app.pending_tasks()
            } else if completed {
                app.completed_tasks()
            } else {
                app.ledger().tasks().to_vec()
            };
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Get { id } => match app.task(id) {
            Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
            None => return Err(format!("task not found: {id}").into()),
        },
        TaskAction::Update {
            id,
            text,
            priority,
            estimate,
            units,
            completed,
        } => {
            let patch = TaskPatch {
                text,
                completed,
                priority,
                estimated_units: estimate,
                completed_units: units,
            };
            let task = app.update_task(id, patch)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Done { id } => {
            let task = app.complete_task(id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Delete { id } => match app.delete_task(id)? {
            Some(_) => println!("Task deleted: {id}"),
            None => println!("No task with id {id}; nothing deleted"),
        },
        TaskAction::Activate { id } => {
            app.set_active_task(Some(id))?;
            println!("Active task: {id}");
        }
        TaskAction::Toggle { id } => match app.toggle_active_task(id)? {
            Some(active) => println!("Active task: {active}"),
            None => println!("No active task"),
        },
        TaskAction::Credit { id } => {
            let units = app.increment_task_units(id)?;
            println!("{}", serde_json::json!({ "id": id, "completed_units": units }));
        }
        TaskAction::Deactivate => {
            app.set_active_task(None)?;
            println!("No active task");
        }
        TaskAction::Active => {
            println!("{}", serde_json::to_string_pretty(&app.active_task())?);
        }
    }
    Ok(())
}
