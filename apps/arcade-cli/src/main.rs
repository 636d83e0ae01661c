mod config;

use std::env;
use std::process;

use arcade::adapters::deadline::DeadlineAdapter;
use arcade::adapters::memory::InMemoryAdapter;
use arcade::{Adapter, Comparison, Expression, FetchOptions, Query, Sort, Storable, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

const SEED_NAMES: [&str; 3] = ["Test", "Foo", "Bar"];

struct WidgetTable;

impl Table for WidgetTable {
    fn name(&self) -> &str {
        "widget"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Widget {
    uuid: Uuid,
    name: String,
    size: i64,
}

impl Storable for Widget {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn table_name(&self) -> &str {
        "widget"
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Fetch {
        query: Option<Query>,
        options: FetchOptions,
    },
    Count {
        query: Option<Query>,
    },
    Find {
        uuid: Uuid,
    },
}

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  arcade-cli fetch [<field> <op> <value>] [--sort <field>] [--desc] [--limit <n>] [--offset <n>]\n  arcade-cli count [<field> <op> <value>]\n  arcade-cli find <uuid>\n\nOperators: = != > >= < <=\n\nNotes:\n  - Uses an in-memory adapter seeded with ARCADE_SEED widgets; data is not persisted across runs.",
        arcade::about()
    );
}

/// Integers, floats and booleans parse as such; anything else is a string.
fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Consume an optional `<field> <op> <value>` triple from the front of `args`.
fn parse_query(args: &[String]) -> Result<(Option<Query>, &[String]), String> {
    match args {
        [field, op, value, rest @ ..] if !field.starts_with("--") => {
            let comparison =
                Comparison::parse(op).ok_or_else(|| format!("unknown operator '{}'", op))?;
            let expression = Expression::new(field.as_str(), comparison, parse_value(value));
            expression.validate().map_err(|e| e.to_string())?;
            Ok((Some(Query::expression(expression)), rest))
        }
        [first, ..] if !first.starts_with("--") => {
            Err("expected <field> <op> <value>".to_string())
        }
        _ => Ok((None, args)),
    }
}

fn parse_fetch_options(args: &[String]) -> Result<FetchOptions, String> {
    let mut options = FetchOptions::new();
    let mut descending = false;
    let mut sort_field: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--desc" => descending = true,
            flag @ ("--sort" | "--limit" | "--offset") => {
                let Some(val) = args.get(i + 1) else {
                    return Err(format!("{} requires a value", flag));
                };
                match flag {
                    "--sort" => sort_field = Some(val.clone()),
                    "--limit" => {
                        options = options.limit(
                            val.parse()
                                .map_err(|_| format!("invalid --limit '{}'", val))?,
                        )
                    }
                    _ => {
                        options = options.offset(
                            val.parse()
                                .map_err(|_| format!("invalid --offset '{}'", val))?,
                        )
                    }
                }
                i += 1;
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    if let Some(field) = sort_field {
        options = options.sort(if descending {
            Sort::descending(field)
        } else {
            Sort::ascending(field)
        });
    } else if descending {
        return Err("--desc requires --sort".into());
    }
    Ok(options)
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some((cmd, rest)) = args.split_first() else {
        return Err("missing command".into());
    };
    match cmd.as_str() {
        "fetch" => {
            let (query, rest) = parse_query(rest)?;
            let options = parse_fetch_options(rest)?;
            Ok(Command::Fetch { query, options })
        }
        "count" => {
            let (query, rest) = parse_query(rest)?;
            if let Some(extra) = rest.first() {
                return Err(format!("unknown argument: {}", extra));
            }
            Ok(Command::Count { query })
        }
        "find" => {
            let [raw] = rest else {
                return Err("find expects exactly one <uuid>".into());
            };
            let uuid = Uuid::parse_str(raw).map_err(|e| format!("invalid uuid '{}': {}", raw, e))?;
            Ok(Command::Find { uuid })
        }
        other => Err(format!("unknown command: {}", other)),
    }
}

async fn seed<A: Adapter>(adapter: &A, count: usize) -> Result<(), String> {
    for i in 0..count {
        let widget = Widget {
            uuid: Uuid::new_v4(),
            name: SEED_NAMES[i % SEED_NAMES.len()].to_string(),
            size: i as i64,
        };
        adapter
            .insert(&WidgetTable, &widget)
            .await
            .map_err(|e| e.to_string())?;
        debug!(uuid = %widget.uuid, name = %widget.name, "seeded widget");
    }
    Ok(())
}

async fn execute<A: Adapter>(adapter: &A, command: Command) -> Result<Value, String> {
    let output = match command {
        Command::Fetch { query, options } => {
            let widgets: Vec<Widget> = adapter
                .fetch_with(&WidgetTable, query.as_ref(), &options)
                .await
                .map_err(|e| e.to_string())?;
            info!(matched = widgets.len(), "fetch complete");
            serde_json::to_value(widgets)
        }
        Command::Count { query } => {
            let count = adapter
                .count(&WidgetTable, query.as_ref())
                .await
                .map_err(|e| e.to_string())?;
            Ok(Value::from(count))
        }
        Command::Find { uuid } => {
            let widget: Option<Widget> = adapter
                .find(&WidgetTable, uuid)
                .await
                .map_err(|e| e.to_string())?;
            serde_json::to_value(widget)
        }
    };
    output.map_err(|e| e.to_string())
}

async fn run(cfg: &config::Config, args: &[String]) -> Result<(), String> {
    let command = parse_command(args)?;

    let adapter = DeadlineAdapter::new(InMemoryAdapter::new(), cfg.op_timeout);
    adapter.connect().await.map_err(|e| e.to_string())?;
    seed(&adapter, cfg.seed).await?;

    let output = execute(&adapter, command).await?;
    adapter.disconnect().await.map_err(|e| e.to_string())?;

    let rendered = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    init_tracing(&cfg);

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return;
    }

    if let Err(e) = run(&cfg, &args).await {
        eprintln!("Error: {}", e);
        print_usage();
        process::exit(2);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so stdout stays machine-readable
    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}
