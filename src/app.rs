use crate::cli::{CharacterAction, Cli, Command, LocationAction};
use ainovel::core::config::Config;
use ainovel::core::io::FileStorage;
use ainovel::core::state::{Character, Episode};
use ainovel::services::api::{create_backend, StoryRequest};
use ainovel::services::catalog::CatalogClient;
use ainovel::services::handoff::SelectionHandoff;
use ainovel::services::store::StoryStore;
use ainovel::services::workflow::StoryWorkflow;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Select, Text};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const FONT_CHOICES: [&str; 2] = ["default", "serif"];
const GENDER_CHOICES: [&str; 2] = ["male", "female"];

pub async fn run(cli: Cli) -> Result<()> {
    if let Command::Init { force } = cli.command {
        return init_config(&cli.config, force);
    }

    let mut config = Config::load(&cli.config)?;
    if cli.demo {
        config.api.demo = true;
    }
    if cli.local {
        config.api.use_local = true;
    }

    let data_folder = Path::new(&config.storage.data_folder);
    let store = StoryStore::new(Arc::new(FileStorage::new(data_folder)?));
    let handoff = SelectionHandoff::new(Arc::new(FileStorage::new(data_folder.join("transient"))?));
    let base_url = config.api.base_url().to_string();

    match cli.command {
        Command::Init { force } => init_config(&cli.config, force)?,
        Command::Ideas { genre, model } => {
            let workflow = build_workflow(&config, &base_url, store)?;
            let genre = match genre {
                Some(genre) => genre,
                None => Text::new("Genre:").prompt()?,
            };
            let model = match model {
                Some(model) => model,
                None => select_model(&config)?,
            };
            let ideas = with_spinner("Generating ideas...", workflow.ideas(&genre, &model)).await?;
            println!("{}", ideas);
        }
        Command::New => {
            let workflow = build_workflow(&config, &base_url, store)?;
            if workflow.has_story()? {
                let discard = Confirm::new("A story is already stored. Discard it and start over?")
                    .with_default(false)
                    .prompt()?;
                if !discard {
                    println!("Keeping the current story. Use `continue` to extend it.");
                    return Ok(());
                }
            }

            let request = prompt_story_request(&config, &handoff)?;
            let episodes = with_spinner("Generating story...", workflow.start(&request)).await?;
            if let Some(latest) = episodes.last() {
                print_episode(latest);
            }
        }
        Command::Continue => {
            let workflow = build_workflow(&config, &base_url, store)?;
            let episodes = with_spinner("Generating next episode...", workflow.continue_story()).await?;
            if let Some(latest) = episodes.last() {
                print_episode(latest);
            }
        }
        Command::List => {
            let episodes = store.episodes()?;
            if episodes.is_empty() {
                println!("No episodes stored.");
            }
            let last = episodes.len().saturating_sub(1);
            for (i, episode) in episodes.iter().enumerate() {
                let marker = if i == last { "*" } else { " " };
                println!(
                    "{} {:>3}. {}: {} [{}]",
                    marker,
                    i + 1,
                    episode.title,
                    episode.summary,
                    episode.model
                );
            }
        }
        Command::Show { number } => {
            let episode = number
                .checked_sub(1)
                .map(|index| store.episode(index))
                .transpose()?
                .flatten();
            match episode {
                Some(episode) => print_episode(&episode),
                None => bail!("No episode {}", number),
            }
        }
        Command::Export { output } => {
            let snapshot = store.export_snapshot()?;
            let content = serde_json::to_string_pretty(&snapshot)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported {} episodes to {}", snapshot.episodes.len(), path.display());
                }
                None => println!("{}", content),
            }
        }
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if !store.import_snapshot_str(&content) {
                bail!("Import failed: {} is not a valid story export", file.display());
            }
            println!("Imported {} episodes.", store.episodes()?.len());
        }
        Command::Clear { yes } => {
            if yes || Confirm::new("Delete the stored story and session?").with_default(false).prompt()? {
                store.clear_all()?;
                println!("Cleared.");
            }
        }
        Command::Character { action } => {
            let catalog = CatalogClient::new(&base_url, config.api.timeout_seconds)?;
            run_character(action, &catalog, &handoff).await?;
        }
        Command::Location { action } => {
            let catalog = CatalogClient::new(&base_url, config.api.timeout_seconds)?;
            run_location(action, &catalog, &handoff).await?;
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    Config::init(path, force)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn build_workflow(config: &Config, base_url: &str, store: StoryStore) -> Result<StoryWorkflow> {
    let backend = create_backend(config, base_url)?;
    Ok(StoryWorkflow::new(backend, store).with_default_model(&config.story.default_model))
}

async fn run_character(action: CharacterAction, catalog: &CatalogClient, handoff: &SelectionHandoff) -> Result<()> {
    match action {
        CharacterAction::Show { id } => {
            let profile = with_spinner("Fetching character...", catalog.character(&id)).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        CharacterAction::Delete { id, yes } => {
            if yes || confirm_delete("character", &id)? {
                catalog.delete_character(&id).await?;
                println!("Deleted character {}.", id);
            }
        }
        CharacterAction::Random { gender } => {
            let gender = match gender {
                Some(gender) => gender,
                None => Select::new("Gender:", GENDER_CHOICES.to_vec()).prompt()?.to_string(),
            };
            let profile = with_spinner("Generating character...", catalog.random_character(&gender)).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        CharacterAction::Use { id } => {
            let profile = with_spinner("Fetching character...", catalog.character(&id)).await?;
            handoff.stash_character(&profile)?;
            println!(
                "Selected {}. It will prefill the next `new`.",
                profile.name.as_deref().unwrap_or(&id)
            );
        }
    }
    Ok(())
}

async fn run_location(action: LocationAction, catalog: &CatalogClient, handoff: &SelectionHandoff) -> Result<()> {
    match action {
        LocationAction::Show { id } => {
            let profile = with_spinner("Fetching location...", catalog.location(&id)).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        LocationAction::Delete { id, yes } => {
            if yes || confirm_delete("location", &id)? {
                catalog.delete_location(&id).await?;
                println!("Deleted location {}.", id);
            }
        }
        LocationAction::Random => {
            let profile = with_spinner("Generating location...", catalog.random_location()).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        LocationAction::Use { id } => {
            let profile = with_spinner("Fetching location...", catalog.location(&id)).await?;
            handoff.stash_location(&profile)?;
            println!(
                "Selected {}. It will prefill the next `new`.",
                profile.name.as_deref().unwrap_or(&id)
            );
        }
    }
    Ok(())
}

fn confirm_delete(kind: &str, id: &str) -> Result<bool> {
    Ok(Confirm::new(&format!("Delete {} {}? This cannot be undone.", kind, id))
        .with_default(false)
        .prompt()?)
}

fn select_model(config: &Config) -> Result<String> {
    let models = config.story.models.clone();
    let cursor = models
        .iter()
        .position(|m| *m == config.story.default_model)
        .unwrap_or(0);
    Ok(Select::new("Model:", models).with_starting_cursor(cursor).prompt()?)
}

fn prompt_story_request(config: &Config, handoff: &SelectionHandoff) -> Result<StoryRequest> {
    let selected_character = handoff.take_character()?.and_then(|p| p.to_character());
    let setting_note = handoff.take_location()?.and_then(|p| p.setting_note());

    let genre = Text::new("Genre:").prompt()?;
    let prompt = Text::new("Premise:").prompt()?;
    let instructions = Text::new("Instructions:")
        .with_default(setting_note.as_deref().unwrap_or(""))
        .prompt()?;
    let story_request = Text::new("Story request:").prompt()?;
    let model_choice = select_model(config)?;

    let font_cursor = FONT_CHOICES
        .iter()
        .position(|f| *f == config.story.default_font)
        .unwrap_or(0);
    let font_choice = Select::new("Font:", FONT_CHOICES.to_vec())
        .with_starting_cursor(font_cursor)
        .prompt()?
        .to_string();

    let (default_name, default_description) = selected_character
        .map(|c| (c.name, c.description))
        .unwrap_or_default();
    let name = Text::new("Main character name (blank to skip):")
        .with_default(&default_name)
        .prompt()?;
    let characters = if name.trim().is_empty() {
        Vec::new()
    } else {
        let description = Text::new("Main character description:")
            .with_default(&default_description)
            .prompt()?;
        Character::from_input(&name, &description).into_iter().collect()
    };

    Ok(StoryRequest {
        prompt,
        genre,
        instructions,
        story_request,
        font_choice,
        model_choice,
        characters,
    })
}

async fn with_spinner<T, F>(message: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    let result = fut.await;
    pb.finish_and_clear();
    result
}

fn print_episode(episode: &Episode) {
    println!("{} [{}]", episode.title, episode.model);
    println!();
    println!("{}", episode.text);
}
