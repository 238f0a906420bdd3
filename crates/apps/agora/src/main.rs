//! Agora - Replay tool for the forum index
//!
//! Loads a forum scenario into in-memory providers and drives a forum index
//! through its steps, printing the resulting list and navigation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forum::{
    EventBus, ForumIndex, ForumSettings, InMemoryForumProvider, Layout, Providers,
    RecordingNavigator, RouteParams, SortOrder,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

mod render;
mod scenario;

use scenario::{Scenario, Step};

#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Replay forum index scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file
    Replay {
        scenario: PathBuf,
        /// Override the layout of the settings and the scenario
        #[arg(long, value_name = "narrow|wide")]
        layout: Option<Layout>,
        /// Print a JSON snapshot instead of the list
        #[arg(long)]
        json: bool,
    },
    /// Show the effective forum settings
    Settings {
        /// Write the settings to the config directory
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            scenario,
            layout,
            json,
        } => replay(&scenario, layout, json).await,
        Commands::Settings { save } => {
            let settings = ForumSettings::load()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if save {
                settings.save()?;
                if let Some(path) = config::config_path("forum.json") {
                    info!("Saved settings to {}", path.display());
                }
            }
            Ok(())
        }
    }
}

async fn replay(path: &std::path::Path, layout: Option<Layout>, json: bool) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    info!(
        "Replaying {} ({} steps)",
        scenario.name.as_deref().unwrap_or("scenario"),
        scenario.steps.len()
    );

    let mut settings = ForumSettings::load().unwrap_or_else(|e| {
        warn!("Using default forum settings: {:#}", e);
        ForumSettings::default()
    });
    if let Some(layout) = layout.or(scenario.layout) {
        settings.layout = layout;
    }

    let provider = Arc::new(scenario.provider()?);
    let navigator = Arc::new(RecordingNavigator::new());
    let bus = EventBus::new();

    let mut index = ForumIndex::new(
        settings,
        Providers::in_memory(provider.clone(), navigator.clone()),
        scenario.course_id,
        scenario.cm_id,
    );
    if let Some(user_id) = scenario.user_id {
        index = index.with_user(user_id);
    }
    index.attach(&bus);

    for (number, step) in scenario.steps.iter().enumerate() {
        if let Err(e) = run_step(&mut index, &provider, &bus, step, json).await {
            warn!("Step {} ({:?}) failed: {:#}", number + 1, step, e);
        }
    }

    if json {
        let snapshot = render::Snapshot::capture(&index, navigator.paths());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        render::print_index(&index);
        println!("navigation: {}", navigator.paths().join(" -> "));
    }

    index.teardown();
    info!("Replay finished, {} subscribers left", bus.subscriber_count());
    Ok(())
}

async fn run_step(
    index: &mut ForumIndex,
    provider: &InMemoryForumProvider,
    bus: &EventBus,
    step: &Step,
    json: bool,
) -> Result<()> {
    let forum_id = index.forum().map(|forum| forum.id);

    match step {
        Step::Load => index.load_content(false).await?,
        Step::Refresh => index.refresh_content().await?,
        Step::LoadMore => {
            let outcome = index.load_more().await?;
            info!("Load more: {:?}", outcome);
        }
        Step::RetryLoadMore => {
            let outcome = index.retry_load_more().await?;
            info!("Retry load more: {:?}", outcome);
        }
        Step::SetSortOrder { order } => {
            let order = SortOrder::from_value(*order)
                .with_context(|| format!("Unknown sort order {}", order))?;
            index.set_sort_order(order).await?;
        }
        Step::Select {
            discussion_id,
            time_created,
        } => {
            let params = RouteParams {
                discussion_id: *discussion_id,
                time_created: *time_created,
            };
            let key = index
                .paths()
                .key_for_params(&params)
                .context("Select needs a discussion_id or time_created")?;
            index.select(key)?;
        }
        Step::SelectFirst => {
            if !index.select_first()? {
                info!("Nothing to select, the list is empty");
            }
        }
        Step::OpenNewDiscussion => index.open_new_discussion()?,
        Step::Route {
            discussion_id,
            time_created,
        } => {
            let params = RouteParams {
                discussion_id: *discussion_id,
                time_created: *time_created,
            };
            let path = index.enter_route(&params);
            info!("Entered route {:?}", path);
        }
        Step::Event { event } => {
            bus.publish(event.clone());
            let processed = index.process_events().await?;
            info!(
                "Processed {} events, refresh {:?}, selected {:?}",
                processed.handled, processed.refresh, processed.selected
            );
        }
        Step::AddDiscussion { discussion } => {
            let forum_id = forum_id.context("Forum not loaded yet")?;
            provider.add_discussion(forum_id, discussion.clone())?;
        }
        Step::RemoveDiscussion { id } => {
            let forum_id = forum_id.context("Forum not loaded yet")?;
            provider.remove_discussion(forum_id, *id)?;
        }
        Step::AddOfflineDiscussion { discussion } => {
            let forum_id = forum_id.context("Forum not loaded yet")?;
            provider.add_offline_discussion(forum_id, discussion.clone())?;
        }
        Step::Fail { operation, times } => match times {
            Some(times) => provider.fail_times(*operation, *times),
            None => provider.fail(*operation),
        },
        Step::Recover { operation } => provider.recover(*operation),
        Step::Show => {
            if !json {
                render::print_index(index);
            }
        }
    }
    Ok(())
}
