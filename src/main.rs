//! Form Studio CLI
//!
//! Opens a form from the file store, optionally applies a batch of edit
//! commands, saves it and prints the resolved view as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use form_studio::schema::FormId;
use form_studio::store::FormSummary;
use form_studio::validation::ValidationIssue;
use form_studio::{
    EditCommand, EditorSession, FileFormStore, FormRef, FormStore, ResolvedView, StudioConfig,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "form-studio", version, about = "Appraisal form schema and rule engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// List stored forms
    List,
    /// Open a form, apply edits, save it and print the resolved view
    Run {
        /// JSON array of edit commands to apply before saving
        #[arg(long)]
        commands: Option<PathBuf>,
        /// Title for a new form when no id is given
        #[arg(long, default_value = "Untitled form")]
        title: String,
        /// Stored form to open; a new form is created when omitted
        form_id: Option<FormId>,
    },
}

impl Cli {
    fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run {
            commands: None,
            title: "Untitled form".to_string(),
            form_id: None,
        })
    }
}

fn read_commands(path: &Path) -> Result<Vec<EditCommand>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read commands {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse commands {}", path.display()))
}

#[derive(Serialize)]
struct Report<'a> {
    form_id: FormId,
    title: &'a str,
    revision: u64,
    view: Option<&'a ResolvedView>,
    issues: Vec<ValidationIssue>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = StudioConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let command = Cli::parse().into_command();
    let store = FileFormStore::new(config.store_dir()?);
    tracing::debug!(dir = %store.dir().display(), "using file store");

    match command {
        Command::List => {
            let summaries: Vec<FormSummary> = store.list().await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Run {
            commands,
            title,
            form_id,
        } => {
            let form = match form_id {
                Some(id) => FormRef::Existing(id),
                None => FormRef::New { title },
            };
            let mut session = EditorSession::open(&store, form, config.evaluation_options())
                .await?
                .with_default_width(config.default_field_width());
            if let Some(path) = commands {
                for (index, command) in read_commands(&path)?.into_iter().enumerate() {
                    let name = command.name();
                    session
                        .apply(command)
                        .with_context(|| format!("command {index} ({name}) failed"))?;
                }
            }
            let receipt = session.save(&store).await?;
            let issues = session.validate().unwrap_or_default();
            let report = Report {
                form_id: receipt.form_id,
                title: session.form().title(),
                revision: receipt.revision,
                view: session.view(),
                issues,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
