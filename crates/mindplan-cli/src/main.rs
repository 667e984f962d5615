mod config;
mod graph_cmd;
mod serve_cmd;
mod smart_cmd;
mod todo_cmds;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mindplan_core::llm::OpenAiClient;
use mindplan_core::{PlanGenerator, RpcClient, TreeValidation};
use mindplan_db::config::DbConfig;
use mindplan_db::pool;

use config::MindplanConfig;

#[derive(Parser)]
#[command(name = "mindplan", about = "Todo list with AI-generated mind-map plans")]
struct Cli {
    /// Database URL (overrides MINDPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Server URL used by client commands (overrides MINDPLAN_SERVER_URL env var)
    #[arg(long, global = true)]
    server_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a mindplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the mindplan database (requires config file or env vars)
    DbInit,
    /// Run the RPC server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Todo management (talks to a running server)
    Todo {
        #[command(subcommand)]
        command: TodoCommands,
    },
    /// Show existing todos as a mind-map
    Graph,
    /// Break a goal down into a plan and add it as todos
    Smart {
        /// What you want to achieve
        goal: String,
        /// Node id to leave out of the plan (repeatable)
        #[arg(long = "exclude", value_name = "NODE_ID")]
        exclude: Vec<String>,
        /// Select nodes individually even when labels repeat
        #[arg(long)]
        by_id: bool,
        /// Add the selected nodes without asking
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum TodoCommands {
    /// List all todos
    List,
    /// Add a todo
    Add {
        /// Todo text
        text: String,
    },
    /// Flip a todo between open and done
    Toggle {
        /// Todo ID
        id: i32,
    },
    /// Delete a todo
    Delete {
        /// Todo ID
        id: i32,
    },
}

/// Execute the `mindplan init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        ai: config::AiSection::default(),
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!(
        "Set ai.api_key in that file (or {}) to enable plan generation.",
        config::API_KEY_ENV
    );
    println!("Next: run `mindplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `mindplan db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &MindplanConfig) -> anyhow::Result<()> {
    println!("Initializing mindplan database...");

    if pool::ensure_database_exists(&resolved.db_config).await? == pool::Bootstrap::Created {
        println!("Created database.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    print!("{}", pool::status(&db_pool).await?);

    db_pool.close().await;

    println!("mindplan db-init complete.");
    Ok(())
}

async fn cmd_serve(resolved: MindplanConfig, bind: &str, port: u16) -> anyhow::Result<()> {
    if resolved.llm_config.api_key.is_none() {
        tracing::warn!(
            "no AI API key configured; ai.generatePlan will fail until {} is set",
            config::API_KEY_ENV
        );
    }

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let planner = PlanGenerator::new(
        Arc::new(OpenAiClient::new(resolved.llm_config)),
        resolved.validation,
    );
    tracing::info!(?planner, "plan generator ready");
    if planner.validation() == TreeValidation::Strict {
        tracing::info!("strict plan validation on; malformed model output is reported as 502");
    }

    let state = serve_cmd::AppState {
        pool: db_pool.clone(),
        planner: Arc::new(planner),
    };
    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

/// Client for a running server. Fails fast when nothing answers at `server_url`.
async fn connect(server_url: String) -> anyhow::Result<RpcClient> {
    let client = RpcClient::new(server_url);
    client.health_check().await.with_context(|| {
        format!(
            "no mindplan server at {} (start one with `mindplan serve`)",
            client.base_url()
        )
    })?;
    Ok(client)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let resolve =
        || MindplanConfig::resolve(cli.database_url.as_deref(), cli.server_url.as_deref());

    match &cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(db_url, *force)?;
        }
        Commands::DbInit => {
            cmd_db_init(&resolve()?).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(resolve()?, bind, *port).await?;
        }
        Commands::Todo { command } => {
            let client = connect(resolve()?.server_url).await?;
            todo_cmds::run_todo_command(command, &client).await?;
        }
        Commands::Graph => {
            let client = connect(resolve()?.server_url).await?;
            graph_cmd::run_graph(&client).await?;
        }
        Commands::Smart {
            goal,
            exclude,
            by_id,
            yes,
        } => {
            let client = connect(resolve()?.server_url).await?;
            let options = smart_cmd::SmartOptions {
                goal,
                exclude,
                by_id: *by_id,
                yes: *yes,
            };
            smart_cmd::run_smart(&client, &options).await?;
        }
    }

    Ok(())
}
