use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use cityweather_core::{
    Config, FetchState, Snapshot, WeatherSession, client_from_config, fetcher_from_config,
};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use tracing::info;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "Current weather for any city")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// API key to use instead of the configured one.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Provider base URL, e.g. for a local mock.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com API key.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name.
        city: String,

        /// Write the decoded icon to this file (format from the extension).
        #[arg(long, value_name = "PATH")]
        save_icon: Option<PathBuf>,

        /// Print the weather as JSON instead of a card.
        #[arg(long)]
        json: bool,
    },

    /// Prompt for cities until Esc or Ctrl-C.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(self.api_key, self.base_url).await,
            Command::Show { ref city, ref save_icon, json } => {
                let session = self.session()?;
                show(&session, city, save_icon.as_deref(), json).await
            }
            Command::Interactive => {
                let session = self.session()?;
                interactive(&session).await
            }
        }
    }

    /// Stored config, then environment, then command-line flags.
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load()?.with_process_env();

        if let Some(key) = &self.api_key {
            config.set_api_key(key.clone());
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }

        Ok(config)
    }

    fn session(&self) -> anyhow::Result<WeatherSession> {
        let config = self.config()?;
        Ok(WeatherSession::new(client_from_config(&config)?, fetcher_from_config(&config)?))
    }
}

async fn configure(api_key: Option<String>, base_url: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = match api_key {
        Some(key) => key,
        None => blocking_prompt(|| {
            Password::new("WeatherAPI.com API key:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .with_help_message("Get a free key at https://www.weatherapi.com")
                .prompt()
        })
        .await?
        .context("Failed to read API key")?,
    };

    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.set_api_key(api_key);
    if let Some(url) = base_url {
        config.base_url = url;
    }
    config.validated_base_url()?;

    let path = config.save()?;
    info!(path = %path.display(), "Configuration saved");
    println!("Saved configuration to {}", path.display());

    Ok(())
}

async fn show(
    session: &WeatherSession,
    city: &str,
    save_icon: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let snapshot = search(session, city).await?;

    let weather = match &snapshot.weather {
        Some(FetchState::Content(weather)) => weather,
        Some(FetchState::Error(err)) => return Err(anyhow!(err.clone())),
        Some(FetchState::Loading) | None => return Err(anyhow!("Lookup did not complete")),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(weather)?);
    } else {
        println!("{}", render::card(&snapshot));
    }

    if let Some(path) = save_icon {
        match &snapshot.icon {
            Some(FetchState::Content(image)) => {
                image.save(path)?;
                println!("Saved icon to {}", path.display());
            }
            Some(FetchState::Error(err)) => return Err(anyhow!(err.clone())),
            _ => return Err(anyhow!("The provider sent no icon for {city}")),
        }
    }

    Ok(())
}

async fn interactive(session: &WeatherSession) -> anyhow::Result<()> {
    loop {
        let answer = blocking_prompt(|| {
            Text::new("Search for a city").with_placeholder("Any city, really...").prompt()
        })
        .await?;

        let Some(city) = city_from_answer(answer)? else {
            return Ok(());
        };

        let snapshot = search(session, &city).await?;
        println!("{}\n", render::card(&snapshot));
    }
}

/// Runs a terminal prompt on the blocking pool so it never parks a runtime worker.
async fn blocking_prompt<T, F>(prompt: F) -> anyhow::Result<Result<T, InquireError>>
where
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(prompt).await.context("Prompt task failed")
}

/// `None` when the user dismissed the prompt with Esc or Ctrl-C.
fn city_from_answer(answer: Result<String, InquireError>) -> anyhow::Result<Option<String>> {
    match answer {
        Ok(city) => Ok(Some(city)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err).context("Failed to read city"),
    }
}

async fn search(session: &WeatherSession, city: &str) -> anyhow::Result<Snapshot> {
    session.search(city).await.context("Weather lookup task failed")?;
    Ok(session.snapshot())
}
