use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use sitedesk::resource::SpecError;
use sitedesk::{ClientConfig, ControllerError, HttpApi, LocalFile, Mode, RecordId, ResourceController, ResourceSpec};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("unknown resource `{0}`; run `sitedesk resources` to see the configured ones")]
    UnknownResource(String),
    #[error("expected NAME=VALUE, got `{0}`")]
    InvalidAssignment(String),
    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sitedesk", about = "Manage portfolio, about and testimonial content")]
struct Cli {
    /// API origin. Overrides `SITEDESK_API_BASE_URL` and `.env`.
    #[arg(long, env = "SITEDESK_API_BASE_URL")]
    base_url: Option<String>,

    /// JSON resource description to manage alongside the built-in ones.
    #[arg(long)]
    spec: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the configured resources and their endpoints.
    Resources,
    /// Print every record of a resource as JSON.
    List { resource: String },
    /// Create a record.
    Create {
        resource: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Update a record. Fields not given keep their current values;
    /// attachments are only replaced when files are given.
    Update {
        resource: String,
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Delete a record.
    Delete { resource: String, id: String },
}

#[derive(Args, Debug)]
struct DraftArgs {
    /// Field value as NAME=VALUE. Repeatable.
    #[arg(long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,

    /// File for an attachment role as ROLE=PATH. Repeat a role to select
    /// several files for it.
    #[arg(long = "file", value_name = "ROLE=PATH")]
    files: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let max_level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(max_level)
        .init();

    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url.as_deref() {
        config = ClientConfig { timeouts: config.timeouts, ..ClientConfig::new(base_url) };
    }

    let mut specs = ResourceSpec::presets();
    if let Some(path) = &cli.spec {
        let custom = ResourceSpec::from_json_file(path)?;
        specs.retain(|s| s.name != custom.name);
        specs.push(custom);
    }

    match cli.command {
        Command::Resources => run_resources(&config, &specs),
        Command::List { resource } => {
            let controller = controller_for(&config, &specs, &resource)?;
            controller.load().await?;
            let records: Vec<Value> = controller.records().iter().map(sitedesk::Record::to_value).collect();
            print_json(&Value::Array(records))
        }
        Command::Create { resource, draft } => {
            let controller = controller_for(&config, &specs, &resource)?;
            controller.begin_create();
            apply_draft(&controller, draft).await?;
            controller.submit().await?;
            report(&controller);
            Ok(())
        }
        Command::Update { resource, id, draft } => {
            let controller = controller_for(&config, &specs, &resource)?;
            controller.load().await?;
            controller.begin_edit_by_id(&RecordId::new(id))?;
            apply_draft(&controller, draft).await?;
            controller.submit().await?;
            report(&controller);
            Ok(())
        }
        Command::Delete { resource, id } => {
            let controller = controller_for(&config, &specs, &resource)?;
            controller.load().await?;
            controller.delete(Some(&RecordId::new(id))).await?;
            report(&controller);
            Ok(())
        }
    }
}

fn controller_for(config: &ClientConfig, specs: &[ResourceSpec], name: &str) -> Result<ResourceController, CliError> {
    let spec = specs
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| CliError::UnknownResource(name.to_owned()))?;
    let api = HttpApi::new(config.clone())?;
    Ok(ResourceController::new(spec, Arc::new(api)))
}

async fn apply_draft(controller: &ResourceController, args: DraftArgs) -> Result<(), CliError> {
    for raw in &args.fields {
        let (name, value) = split_assignment(raw)?;
        controller.set_draft_field(name, value)?;
    }

    // Group repeated roles into one selection each, keeping first-seen order.
    let mut selections: Vec<(String, Vec<LocalFile>)> = Vec::new();
    for raw in &args.files {
        let (role, path) = split_assignment(raw)?;
        let path = PathBuf::from(path);
        let file = LocalFile::read(&path)
            .await
            .map_err(|source| CliError::ReadFile { path: path.clone(), source })?;
        match selections.iter_mut().find(|(r, _)| r == role) {
            Some((_, files)) => files.push(file),
            None => selections.push((role.to_owned(), vec![file])),
        }
    }
    for (role, files) in selections {
        controller.attach_files(&role, files)?;
    }
    Ok(())
}

fn split_assignment(raw: &str) -> Result<(&str, &str), CliError> {
    raw.split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| (name.trim(), value))
        .ok_or_else(|| CliError::InvalidAssignment(raw.to_owned()))
}

fn run_resources(config: &ClientConfig, specs: &[ResourceSpec]) -> Result<(), CliError> {
    for spec in specs {
        println!("{}", spec.name);
        println!("  list:    GET  {}", config.url(&spec.list_path));
        println!("  upsert:  POST {}", config.url(&spec.upsert_path));
        println!("  delete:  {}", describe_delete(config, spec));
        let required = spec.required_names();
        if !required.is_empty() {
            println!("  required: {}", required.join(", "));
        }
    }
    Ok(())
}

fn describe_delete(config: &ClientConfig, spec: &ResourceSpec) -> String {
    match &spec.delete {
        sitedesk::DeleteContract::ById { path } => format!("DELETE {} ({:?})", config.url(path), spec.delete_policy),
        sitedesk::DeleteContract::Resubmit { path, list_field } => {
            format!("POST {} with remaining `{list_field}` ({:?})", config.url(path), spec.delete_policy)
        }
    }
}

fn report(controller: &ResourceController) {
    let snapshot = controller.snapshot();
    if let Some(notice) = snapshot.last_notice {
        println!("{}", notice.message);
    }
    if let Some(err) = snapshot.last_error {
        eprintln!("warning: {err}");
    }
    if snapshot.mode != Mode::Create {
        eprintln!("warning: draft still in edit mode");
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
