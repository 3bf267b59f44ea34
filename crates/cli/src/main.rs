mod config;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map as JsonMap, Value};
use stepflow_engine::{
    ActivityInvoker, CanvasDocument, Interpreter, TimeoutInvoker, parse_canvas_file, parse_workflow_file, validate_workflow,
    workflow_to_yaml,
};
use stepflow_registry::{ActivityRegistry, SampleActivityOptions, register_builtin_activities};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{StepflowConfig, default_config_path};

#[derive(Debug, Parser)]
#[command(name = "stepflow", version, about = "Run and inspect declarative workflows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect the activity catalogue
    #[command(subcommand)]
    Activities(ActivitiesCommand),
    /// Validate, run, and convert workflow documents
    #[command(subcommand)]
    Workflow(WorkflowCommand),
    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ActivitiesCommand {
    /// List registered activities
    List,
    /// Print the parameter schema of one activity
    Schema { name: String },
}

#[derive(Debug, Subcommand)]
enum WorkflowCommand {
    /// Check a workflow for structural and argument errors
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Run a workflow and print its final state
    Run(RunArgs),
    /// Convert an editor canvas (JSON) into a workflow (YAML)
    Export {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a workflow (YAML or JSON) into an editor canvas (JSON)
    Canvas {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the workflow YAML/JSON
    #[arg(short, long)]
    file: PathBuf,
    /// Initial state as a JSON object
    #[arg(long, conflicts_with = "input_file")]
    input: Option<String>,
    /// File holding the initial state (JSON or YAML object)
    #[arg(long)]
    input_file: Option<PathBuf>,
    /// Stream run events to stderr as JSON lines
    #[arg(long)]
    events: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = StepflowConfig::load().context("failed to load stepflow configuration")?;
    init_tracing(&config);

    match cli.command {
        Command::Activities(command) => activities_cmd(&config, command),
        Command::Workflow(command) => workflow_cmd(&config, command).await,
        Command::Config(command) => config_cmd(command),
    }
}

fn init_tracing(config: &StepflowConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| config.log_filter.clone())
        .unwrap_or_else(|| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_registry(config: &StepflowConfig) -> ActivityRegistry {
    let options = if config.sample_activity_delays {
        SampleActivityOptions::default()
    } else {
        SampleActivityOptions::instant()
    };
    let mut registry = ActivityRegistry::new();
    register_builtin_activities(&mut registry, options);
    registry
}

fn activities_cmd(config: &StepflowConfig, command: ActivitiesCommand) -> Result<()> {
    let registry = build_registry(config);
    match command {
        ActivitiesCommand::List => {
            let summaries: Vec<Value> = registry
                .list_schemas()
                .into_iter()
                .map(|schema| {
                    serde_json::json!({
                        "name": schema.name,
                        "label": schema.label,
                        "category": schema.category,
                        "description": schema.description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        ActivitiesCommand::Schema { name } => {
            let schema = registry
                .get_schema(&name)
                .with_context(|| format!("Activity '{name}' not found"))?;
            println!("{}", serde_json::to_string_pretty(schema)?);
        }
    }
    Ok(())
}

async fn workflow_cmd(config: &StepflowConfig, command: WorkflowCommand) -> Result<()> {
    match command {
        WorkflowCommand::Validate { file } => {
            let definition = parse_workflow_file(&file)?;
            let registry = build_registry(config);
            let issues = validate_workflow(&definition, &registry);
            if issues.is_empty() {
                println!("workflow '{}' is valid", definition.name);
                return Ok(());
            }
            for issue in &issues {
                println!("{issue}");
            }
            let errors = issues.iter().filter(|issue| issue.is_error()).count();
            if errors > 0 {
                bail!("workflow '{}' has {errors} error(s)", definition.name);
            }
        }
        WorkflowCommand::Run(args) => run_workflow_cmd(config, args).await?,
        WorkflowCommand::Export { file, output } => {
            let definition = parse_canvas_file(&file)?.to_definition();
            write_output(output.as_deref(), &workflow_to_yaml(&definition)?)?;
        }
        WorkflowCommand::Canvas { file, output } => {
            let definition = parse_workflow_file(&file)?;
            let canvas = CanvasDocument::from_definition(&definition);
            write_output(output.as_deref(), &serde_json::to_string_pretty(&canvas)?)?;
        }
    }
    Ok(())
}

async fn run_workflow_cmd(config: &StepflowConfig, args: RunArgs) -> Result<()> {
    let definition = parse_workflow_file(&args.file)?;
    let input = read_input(args.input.as_deref(), args.input_file.as_deref())?;

    let registry = Arc::new(build_registry(config));
    let invoker: Arc<dyn ActivityInvoker> = Arc::new(TimeoutInvoker::new(registry, config.activity_timeout()));
    let mut interpreter = Interpreter::new(invoker);

    let printer = if args.events {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        interpreter = interpreter.with_events(sender);
        Some(tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match serde_json::to_string(&event) {
                    Ok(line) => eprintln!("{line}"),
                    Err(error) => debug!(error = %error, "failed to encode run event"),
                }
            }
        }))
    } else {
        None
    };

    let outcome = interpreter.run(definition, input).await;
    drop(interpreter);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let state = outcome.context("workflow run failed")?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn config_cmd(command: ConfigCommand) -> Result<()> {
    let path = default_config_path();
    match command {
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!("config file already exists: {} (use --force to overwrite)", path.display());
            }
            StepflowConfig::default()
                .save_to_path(&path)
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Initial run state from `--input` or `--input-file`; empty when neither is given.
fn read_input(inline: Option<&str>, file: Option<&Path>) -> Result<JsonMap<String, Value>> {
    let value: Value = match (inline, file) {
        (Some(text), _) => serde_json::from_str(text).context("--input is not valid JSON")?,
        (None, Some(path)) => {
            let content = fs::read_to_string(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse input file: {}", path.display()))?
        }
        (None, None) => return Ok(JsonMap::new()),
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonMap::new()),
        other => bail!("workflow input must be an object, got {other}"),
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content).with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn command_definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::try_parse_from(["stepflow", "workflow", "run", "-f", "greet.yaml", "--input", r#"{"name":"Ada"}"#, "--events"])
            .unwrap();
        let Command::Workflow(WorkflowCommand::Run(args)) = cli.command else {
            panic!("expected workflow run");
        };
        assert_eq!(args.file, PathBuf::from("greet.yaml"));
        assert_eq!(args.input.as_deref(), Some(r#"{"name":"Ada"}"#));
        assert!(args.events);
    }

    #[test]
    fn input_and_input_file_conflict() {
        let parsed = Cli::try_parse_from(["stepflow", "workflow", "run", "-f", "w.yaml", "--input", "{}", "--input-file", "in.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn reads_inline_and_file_input() {
        assert_eq!(read_input(None, None).unwrap(), JsonMap::new());

        let inline = read_input(Some(r#"{"count": 2}"#), None).unwrap();
        assert_eq!(inline.get("count"), Some(&json!(2)));

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("input.yaml");
        fs::write(&path, "user:\n  name: Ada\n").unwrap();
        let from_file = read_input(None, Some(&path)).unwrap();
        assert_eq!(from_file.get("user"), Some(&json!({"name": "Ada"})));
    }

    #[test]
    fn rejects_non_object_input() {
        let error = read_input(Some("[1, 2]"), None).unwrap_err();
        assert!(error.to_string().contains("workflow input must be an object"), "{error}");
    }

    #[test]
    fn registry_honours_sample_delay_setting() {
        let config = StepflowConfig {
            sample_activity_delays: false,
            ..StepflowConfig::default()
        };
        let registry = build_registry(&config);
        assert_eq!(registry.len(), 6);
        assert!(registry.has("wait"));
    }

    #[tokio::test]
    async fn runs_a_workflow_file_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("shout.yaml");
        fs::write(
            &path,
            r#"
name: shout
root: upper
steps:
  - id: upper
    type: activity
    activityName: transformData
    arguments: { input: "${word}", operation: uppercase }
"#,
        )
        .unwrap();
        let config = StepflowConfig {
            sample_activity_delays: false,
            ..StepflowConfig::default()
        };
        let args = RunArgs {
            file: path,
            input: Some(r#"{"word": "hey"}"#.into()),
            input_file: None,
            events: true,
        };

        run_workflow_cmd(&config, args).await.unwrap();
    }

    #[test]
    fn converts_between_workflow_and_canvas_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workflow_path = temp_dir.path().join("greet.yaml");
        let canvas_path = temp_dir.path().join("greet.canvas.json");
        let exported_path = temp_dir.path().join("greet.exported.yaml");
        fs::write(
            &workflow_path,
            "name: greet\nroot: hello\nsteps:\n  - id: hello\n    name: Hello\n    type: activity\n    activityName: echo\n",
        )
        .unwrap();

        let definition = parse_workflow_file(&workflow_path).unwrap();
        let canvas = CanvasDocument::from_definition(&definition);
        write_output(Some(&canvas_path), &serde_json::to_string_pretty(&canvas).unwrap()).unwrap();

        let restored = parse_canvas_file(&canvas_path).unwrap().to_definition();
        write_output(Some(&exported_path), &workflow_to_yaml(&restored).unwrap()).unwrap();

        assert_eq!(parse_workflow_file(&exported_path).unwrap(), definition);
    }
}
