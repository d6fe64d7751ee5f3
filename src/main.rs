use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::process;
use taskpad::{FileStorage, StoragePort, Task, TaskFilter, TaskSort, TaskStore};

#[derive(Parser)]
#[command(name = "taskpad")]
#[command(about = "Taskpad CLI - Single-user task list with local JSON persistence")]
#[command(version)]
struct Cli {
    /// Data directory (default: per-user data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        title: String,

        /// Optional longer description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List tasks using the saved filter and sort
    List,

    /// Toggle completion for a task
    Toggle {
        /// Task id or unambiguous id prefix
        id: String,
    },

    /// Rename a task
    Rename {
        /// Task id or unambiguous id prefix
        id: String,
        title: String,
    },

    /// Set (or clear, with "") a task's description
    Describe {
        /// Task id or unambiguous id prefix
        id: String,
        text: String,
    },

    /// Delete a task
    Delete {
        /// Task id or unambiguous id prefix
        id: String,
    },

    /// Remove all completed tasks
    ClearCompleted,

    /// Set the saved filter preference
    Filter { value: FilterArg },

    /// Set the saved sort preference
    Sort { value: SortArg },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Active,
    Completed,
}

impl From<FilterArg> for TaskFilter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::All => TaskFilter::All,
            FilterArg::Active => TaskFilter::Active,
            FilterArg::Completed => TaskFilter::Completed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
    Alpha,
    AlphaDesc,
}

impl From<SortArg> for TaskSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Newest => TaskSort::Newest,
            SortArg::Oldest => TaskSort::Oldest,
            SortArg::Alpha => TaskSort::Alpha,
            SortArg::AlphaDesc => TaskSort::AlphaDesc,
        }
    }
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(FileStorage::default_dir);
    let storage = FileStorage::open(&data_dir)?;
    let mut store = TaskStore::open(storage);

    match cli.command {
        Commands::Add { title, description } => {
            if store.add(&title, description.as_deref()) {
                println!("Added {}", store.tasks()[0].title.bold());
            } else {
                eprintln!("Not added: title is empty or duplicates an existing task");
                process::exit(1);
            }
        }
        Commands::List => {
            print_list(&store);
        }
        Commands::Toggle { id } => {
            let id = resolve_id(&store, &id)?;
            store.toggle(&id);
            let task = store.tasks().iter().find(|t| t.id == id);
            if let Some(task) = task {
                let state = if task.completed { "done" } else { "active" };
                println!("{} is now {}", task.title.bold(), state);
            }
        }
        Commands::Rename { id, title } => {
            let id = resolve_id(&store, &id)?;
            if store.rename(&id, &title) {
                println!("Renamed to {}", title.trim().bold());
            } else {
                eprintln!("Not renamed: title is empty");
                process::exit(1);
            }
        }
        Commands::Describe { id, text } => {
            let id = resolve_id(&store, &id)?;
            store.set_description(&id, &text);
            println!("Description updated");
        }
        Commands::Delete { id } => {
            let id = resolve_id(&store, &id)?;
            store.delete(&id);
            println!("Deleted");
        }
        Commands::ClearCompleted => {
            let before = store.total_count();
            store.clear_completed();
            println!("Removed {} completed task(s)", before - store.total_count());
        }
        Commands::Filter { value } => {
            store.set_filter(value.into());
            println!("Filter set");
        }
        Commands::Sort { value } => {
            store.set_sort(value.into());
            println!("Sort set");
        }
    }

    Ok(())
}

/// Resolve a user-supplied task reference to an exact id.
///
/// Accepts a full id or a prefix that matches exactly one task. The store
/// itself only ever sees exact ids.
fn resolve_id<P: StoragePort>(store: &TaskStore<P>, reference: &str) -> Result<String> {
    if let Some(task) = store.tasks().iter().find(|t| t.id == reference) {
        return Ok(task.id.clone());
    }

    let matches: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(reference))
        .collect();

    match matches.len() {
        0 => Err(eyre!("No task matches '{}'", reference)),
        1 => Ok(matches[0].id.clone()),
        n => Err(eyre!(
            "Task reference '{}' is ambiguous ({} matches); use a longer prefix",
            reference,
            n
        )),
    }
}

fn print_list<P: StoragePort>(store: &TaskStore<P>) {
    let view = store.visible();

    if view.is_empty() {
        println!("No tasks to show.");
    } else {
        for task in &view {
            let marker = if task.completed {
                "[x]".green()
            } else {
                "[ ]".normal()
            };
            let title = if task.completed {
                task.title.strikethrough().dimmed()
            } else {
                task.title.normal()
            };
            let short_id = task.id.get(..8).unwrap_or(&task.id);
            print!(
                "{} {} {} {}",
                marker,
                short_id.dimmed(),
                title,
                format_created(task.created_at).dimmed()
            );
            if !task.description.is_empty() {
                print!("  {}", task.description.italic().dimmed());
            }
            println!();
        }
    }

    println!(
        "\n{} of {} completed  (filter: {:?}, sort: {:?})",
        store.completed_count(),
        store.total_count(),
        store.filter(),
        store.sort()
    );
}

fn format_created(created_at: i64) -> String {
    match Local.timestamp_millis_opt(created_at).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}
