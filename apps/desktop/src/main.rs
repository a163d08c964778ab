use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, AppContext};
use shared::{
    domain::{BlockType, DraftId, TemplateCategory},
    protocol::CreateDraftRequest,
};

#[derive(Parser, Debug)]
#[command(name = "editor", about = "Admin client for the scenario editor backend")]
struct Args {
    /// Backend base URL; overrides editor.toml and environment settings.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session locally.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and persist the session locally.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Sign out; local session state is cleared even if the server call fails.
    Logout,
    /// List scenario drafts.
    Drafts,
    /// Show one draft in full.
    Draft { id: DraftId },
    /// Create a new draft from the standard skeleton.
    CreateDraft {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "anxiety")]
        category: String,
    },
    /// Delete a draft.
    DeleteDraft { id: DraftId },
    /// Ask the backend for a validation verdict.
    Validate { id: DraftId },
    /// Publish a validated draft under a course slug.
    Publish { id: DraftId, slug: String },
    /// Show a draft's version history.
    Versions { id: DraftId },
    /// List block templates, optionally filtered.
    Templates {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        block_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let context = AppContext::new(&settings).await?;

    match args.command {
        Command::Login { email, password } => {
            let user = context.auth.login(&email, &password).await?;
            println!("Signed in as {} ({:?})", user.email, user.role);
        }
        Command::Register {
            email,
            password,
            full_name,
        } => {
            let user = context.auth.register(&email, &password, full_name).await?;
            println!("Registered {} ({:?})", user.email, user.role);
        }
        Command::Logout => {
            context.auth.logout().await?;
            println!("Signed out");
        }
        Command::Drafts => {
            context.drafts.fetch_drafts().await;
            let snapshot = context.drafts.snapshot().await;
            if let Some(error) = snapshot.error {
                bail!(error);
            }
            if snapshot.drafts.is_empty() {
                println!("No drafts");
                if context.auth.is_editor().await {
                    println!("Use `editor create-draft --name <name>` to start one.");
                }
            }
            for draft in snapshot.drafts {
                println!(
                    "{}  {:<12?} v{:<8} {}",
                    draft.id, draft.status, draft.version, draft.name
                );
            }
        }
        Command::Draft { id } => {
            context.drafts.fetch_draft_by_id(id).await;
            let snapshot = context.drafts.snapshot().await;
            if let Some(error) = snapshot.error {
                bail!(error);
            }
            let draft = snapshot
                .current_draft
                .ok_or_else(|| anyhow!("draft {id} not loaded"))?;
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
        Command::CreateDraft { name, category } => {
            if name.trim().is_empty() {
                bail!("draft name must not be empty");
            }
            let draft = context
                .drafts
                .create_draft(CreateDraftRequest::skeleton(name, category))
                .await?;
            println!("Created draft {} ({})", draft.id, draft.name);
        }
        Command::DeleteDraft { id } => {
            context.drafts.delete_draft(id).await?;
            println!("Deleted draft {id}");
        }
        Command::Validate { id } => {
            let result = context.drafts.validate_draft(id).await?;
            if result.is_valid {
                println!("Draft is ready to publish");
            } else {
                println!("Draft is not publishable:");
                for issue in &result.errors {
                    println!("  {:?} {}: {}", issue.severity, issue.field, issue.message);
                }
            }
            for warning in &result.warnings {
                println!("  {:?} {}: {}", warning.severity, warning.field, warning.message);
            }
        }
        Command::Publish { id, slug } => {
            if slug.trim().is_empty() {
                bail!("course slug must not be empty");
            }
            if !context.drafts.snapshot().await.publish_allowed() {
                bail!("last validation verdict was negative; re-validate before publishing");
            }
            context.drafts.publish_draft(id, &slug).await?;
            println!("Published draft {id} as course '{slug}'");
        }
        Command::Versions { id } => {
            let versions = context.drafts.service().versions(id).await?;
            for version in versions {
                println!(
                    "#{:<4} {}  {}",
                    version.version_number,
                    version.created_at,
                    version.change_description.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Templates {
            category,
            block_type,
        } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let block_type = block_type.as_deref().map(parse_block_type).transpose()?;
            context.templates.fetch_templates(category, block_type).await;
            let snapshot = context.templates.snapshot().await;
            if let Some(error) = snapshot.error {
                bail!(error);
            }
            for template in snapshot.templates {
                println!(
                    "{}  {:<14?} {:<16?} {}",
                    template.id, template.category, template.block_type, template.name
                );
            }
        }
    }

    Ok(())
}

fn parse_category(raw: &str) -> Result<TemplateCategory> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| anyhow!("unknown template category '{raw}'"))
}

fn parse_block_type(raw: &str) -> Result<BlockType> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| anyhow!("unknown block type '{raw}'"))
}
