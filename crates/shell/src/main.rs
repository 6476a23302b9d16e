mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use providers::{Dispatcher, FileStore, SessionContext};
use shared::settings::DispatcherSettings;
use shared::ProviderKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigAction, ConfigFields};

fn default_store_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Zeeks", "ZeeksAI")
        .map(|proj| proj.data_dir().join("settings.json"))
}

fn parse_kind(name: &str) -> Result<ProviderKind> {
    ProviderKind::from_name(name).ok_or_else(|| anyhow!("Unknown provider: {}", name.trim()))
}

fn mask(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", tail)
    }
}

/// Overlay `fields` onto the stored record and report what is still missing.
fn update_config(session: &SessionContext, fields: ConfigFields) -> Result<String> {
    let kind = parse_kind(&fields.provider)?;
    let existing = session.load_config(kind)?.unwrap_or_default();
    session.save_config(kind.display_name(), fields.apply(existing))?;
    let missing = session
        .load_config(kind)?
        .unwrap_or_default()
        .missing_fields(kind);
    Ok(if missing.is_empty() {
        format!("Saved {}", kind)
    } else {
        providers::payload::missing_fields_message(kind, &missing)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store_path = match cli.store.clone().or_else(default_store_path) {
        Some(path) => path,
        None => return Err(anyhow!("no data directory; pass --store <path>")),
    };
    let store = FileStore::open(&store_path)
        .with_context(|| format!("opening settings at {}", store_path.display()))?;
    tracing::debug!(path = %store.path().display(), "settings store opened");
    let session = SessionContext::new(Arc::new(store));

    let mut settings = DispatcherSettings::from_env();
    if let Some(url) = cli.backend.clone() {
        settings.backend_url = url;
    }
    let dispatcher = Dispatcher::new(session.clone(), settings, None);

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show { provider } => {
                let kind = parse_kind(&provider)?;
                let mut config = session.load_config(kind)?.unwrap_or_default();
                config.api_key = config.api_key.as_deref().map(mask);
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Set(fields) => println!("{}", update_config(&session, fields)?),
        },

        Commands::Select { provider } => {
            let kind = parse_kind(&provider)?;
            session.select_provider(kind)?;
            println!("{}", session.badge()?);
        }

        Commands::Pick { provider, model } => {
            let kind = parse_kind(&provider)?;
            session.pick_model(kind, &model)?;
            println!("{}", session.badge()?);
        }

        Commands::Unselect => {
            session.clear_selection()?;
            println!("{}", session.badge()?);
        }

        Commands::Send { prompt } => {
            let result = dispatcher.send(&prompt.join(" ")).await;
            if cli.json {
                let out = serde_json::json!({
                    "ok": result.is_reply(),
                    "phase": format!("{:?}", result.phase()),
                    "text": result.text(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", result.text());
            }
        }

        Commands::Test { provider } => {
            let kind = parse_kind(&provider)?;
            let report = dispatcher.test_connection(kind).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}: {}", kind, report.summary());
                for line in &report.diagnostics {
                    println!("  {}", line);
                }
            }
        }

        Commands::Models { provider } => {
            let kind = parse_kind(&provider)?;
            let models = dispatcher.list_models(kind).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else if models.is_empty() {
                println!("No models listed for {}", kind);
            } else {
                for model in models {
                    println!("{}", model);
                }
            }
        }

        Commands::Health => {
            let up = dispatcher.health().await;
            println!("{}", if up { "backend: up" } else { "backend: down" });
            if !up {
                std::process::exit(1);
            }
        }

        Commands::Badge => println!("{}", session.badge()?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_last_four() {
        assert_eq!(mask("sk-abcdef1234"), "****1234");
        assert_eq!(mask("abc"), "****");
    }

    fn fields(args: &[&str]) -> ConfigFields {
        let argv: Vec<&str> = ["zeeks", "config", "set"]
            .into_iter()
            .chain(args.iter().copied())
            .collect();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Config {
                action: ConfigAction::Set(fields),
            } => fields,
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn test_config_set_then_badge_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let session = SessionContext::new(Arc::new(FileStore::open(&path).unwrap()));
        let msg = update_config(&session, fields(&["lm studio", "--model", "llama3"])).unwrap();
        assert_eq!(msg, "Please set Ollama Base URL in Model Hub.");
        let msg = update_config(
            &session,
            fields(&["Ollama", "--base-url", "http://localhost:11434/"]),
        )
        .unwrap();
        assert_eq!(msg, "Saved Ollama");

        let reopened = SessionContext::new(Arc::new(FileStore::open(&path).unwrap()));
        reopened.select_provider(ProviderKind::Ollama).unwrap();
        assert_eq!(reopened.badge().unwrap(), "Ollama • llama3");
        let cfg = reopened.load_config(ProviderKind::Ollama).unwrap().unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:11434"));
    }

    #[test]
    fn test_parse_kind_aliases() {
        assert_eq!(parse_kind("gemini").unwrap(), ProviderKind::GoogleAi);
        assert!(parse_kind("nope").is_err());
    }
}
