use anyhow::{Result, bail};
use tracing::warn;

use mindplan_core::{Board, BoardError, LayoutConfig, PlanApi, SelectionKey, TodoApi};

use crate::graph_cmd::render_graph;

pub struct SmartOptions<'a> {
    pub goal: &'a str,
    /// Node ids to uncheck before committing.
    pub exclude: &'a [String],
    pub by_id: bool,
    /// Commit the selection instead of only showing it.
    pub yes: bool,
}

/// Generate a plan for a goal, show it for review and optionally add the
/// selected nodes as todos. Returns the number of todos created.
pub async fn run_smart<C>(client: &C, options: &SmartOptions<'_>) -> Result<usize>
where
    C: TodoApi + PlanApi,
{
    let key = if options.by_id {
        SelectionKey::NodeId
    } else {
        SelectionKey::Label
    };
    let mut board = Board::new(key, LayoutConfig::default());
    board.enter_smart_mode();
    board.set_goal(options.goal);

    println!("Generating plan for {:?}...", options.goal.trim());
    board.generate(client).await?;

    for id in options.exclude {
        if !board.toggle_node(id, false)? {
            warn!(node = %id, "no such node in plan; ignoring exclusion");
        }
    }

    println!();
    print!("{}", render_graph(&board.nodes_view(), board.edges()));
    println!();

    let count = board.selected_count();
    if !options.yes {
        println!("{count} item(s) selected. Re-run with --yes to add them as todos.");
        return Ok(0);
    }
    if count == 0 {
        println!("Nothing selected.");
        return Ok(0);
    }

    match board.confirm(client).await {
        Ok(created) => {
            println!("Added {} todo(s).", created.len());
            Ok(created.len())
        }
        Err(BoardError::Commit(e)) => {
            println!("Added {} todo(s) before a failure:", e.created.len());
            for todo in &e.created {
                println!("  {}  {}", todo.id, todo.text);
            }
            let not_added: Vec<&String> = std::iter::once(&e.failed).chain(&e.remaining).collect();
            println!("Not added: {not_added:?}");
            bail!("commit stopped at {:?}: {}", e.failed, e.source)
        }
        Err(e) => Err(e.into()),
    }
}
