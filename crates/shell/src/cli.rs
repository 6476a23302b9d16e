use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Configure chat providers and send prompts through the local backend.
#[derive(Parser)]
#[command(name = "zeeks", version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the platform data dir).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Backend base URL; overrides ZEEK_BACKEND_URL.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// -v for debug, -vv for trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show or change a provider's saved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Make a provider the active selection.
    Select { provider: String },

    /// Pick the model used for a provider (also selects the provider).
    Pick { provider: String, model: String },

    /// Forget the active selection.
    Unselect,

    /// Send a prompt and print the reply.
    Send {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Test a provider's saved connection; selects it on success.
    Test { provider: String },

    /// List the models a provider offers.
    Models { provider: String },

    /// Check whether the backend is up.
    Health,

    /// Print the "Provider • model" badge.
    Badge,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the stored configuration (keys masked).
    Show { provider: String },

    /// Update fields of the stored configuration.
    Set(ConfigFields),
}

#[derive(Args, Default)]
pub struct ConfigFields {
    pub provider: String,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long = "model")]
    pub default_model: Option<String>,

    #[arg(long)]
    pub api_version: Option<String>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub top_p: Option<f64>,
}

impl ConfigFields {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(self, mut config: shared::ProviderConfig) -> shared::ProviderConfig {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        overlay(&mut config.base_url, self.base_url);
        overlay(&mut config.api_key, self.api_key);
        overlay(&mut config.default_model, self.default_model);
        overlay(&mut config.api_version, self.api_version);
        overlay(&mut config.temperature, self.temperature);
        overlay(&mut config.max_tokens, self.max_tokens);
        overlay(&mut config.top_p, self.top_p);
        config
    }
}
