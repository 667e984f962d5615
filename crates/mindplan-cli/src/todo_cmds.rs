use anyhow::{Context, Result};

use mindplan_core::{RpcClient, TodoApi};
use mindplan_db::models::Todo;

use crate::TodoCommands;

pub async fn run_todo_command(command: &TodoCommands, client: &RpcClient) -> Result<()> {
    match command {
        TodoCommands::List => {
            let todos = client.list_todos().await?;
            print!("{}", format_todo_list(&todos));
        }
        TodoCommands::Add { text } => {
            let todo = client.create_todo(text).await?;
            println!("Added todo {}: {}", todo.id, todo.text);
        }
        TodoCommands::Toggle { id } => {
            let id = *id;
            let todos = client.list_todos().await?;
            let current = todos
                .iter()
                .find(|t| t.id == id)
                .with_context(|| format!("todo {id} not found"))?;
            let todo = client.toggle_todo(id, !current.completed).await?;
            let state = if todo.completed { "done" } else { "open" };
            println!("Todo {} is now {state}.", todo.id);
        }
        TodoCommands::Delete { id } => {
            client.delete_todo(*id).await?;
            println!("Deleted todo {id}.");
        }
    }
    Ok(())
}

pub fn format_todo_list(todos: &[Todo]) -> String {
    if todos.is_empty() {
        return "No todos.\n".to_string();
    }

    let id_width = todos
        .iter()
        .map(|t| t.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);

    let mut out = String::new();
    for todo in todos {
        let mark = if todo.completed { "x" } else { " " };
        out.push_str(&format!(
            "{:<id_width$}  [{mark}] {}\n",
            todo.id, todo.text
        ));
    }
    let done = todos.iter().filter(|t| t.completed).count();
    out.push_str(&format!("\n{done}/{} done\n", todos.len()));
    out
}
