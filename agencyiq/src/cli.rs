/// # agencyiq CLI Interface (Module)
///
/// Command parsing and user-facing output for the agencyiq content scheduler.
///
/// All scheduling decisions (calendar, quota, approval state machine, video
/// workflow) live in [`agencyiq-core`]. This module loads the config, builds an
/// [`AgencyClient`], hands it to the core and prints what comes back.
///
/// ## How To Use
/// - Command-line users: `agencyiq --help`.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`agencyiq-core`]: ../../agencyiq-core/
/// [`AgencyClient`]: crate::client::AgencyClient
use crate::client::AgencyClient;
use crate::load_config::{load_config, CliConfig};
use agencyiq_core::calendar::{build_calendar, business_time, EventCatalog};
use agencyiq_core::contract::ContentApi;
use agencyiq_core::lifecycle::{ApproveOutcome, PostLifecycleController};
use agencyiq_core::post::{Platform, PostStatus};
use agencyiq_core::publish::auto_post_schedule;
use agencyiq_core::quota::allocate_generation_size;
use agencyiq_core::schedule::ScheduleOrchestrator;
use agencyiq_core::store::PostStore;
use agencyiq_core::video::VideoWorkflow;
use agencyiq_core::SchedulerError;
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for agencyiq: plan, approve and publish social media content.
#[derive(Parser)]
#[clap(
    name = "agencyiq",
    version,
    about = "Plan, approve and publish social media content for a small business"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, default_value = "agencyiq.yaml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the 30-day content calendar in Brisbane time
    Calendar {
        /// Print the calendar as JSON
        #[clap(long)]
        json: bool,
    },
    /// Show subscription usage and the size of the next generation
    Quota,
    /// Generate a schedule within the remaining quota
    Generate {
        /// Platforms to target; defaults to the configured list
        #[clap(long = "platform")]
        platforms: Vec<Platform>,
    },
    /// Approve a post for publishing
    Approve {
        #[clap(long)]
        post_id: String,
    },
    /// Replace a post's content
    Edit {
        #[clap(long)]
        post_id: String,
        #[clap(long)]
        content: String,
    },
    /// Generate, preview and optionally approve a video for a post
    Video {
        #[clap(long)]
        post_id: String,
        /// Which suggested prompt to render
        #[clap(long, default_value_t = 0)]
        prompt_index: usize,
        /// Re-render once with this custom prompt
        #[clap(long)]
        regenerate: Option<String>,
        /// Attach the previewed video to the post
        #[clap(long)]
        approve: bool,
    },
    /// Publish every approved post now
    Publish,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config(&cli.config)?;
    let client = Arc::new(AgencyClient::new(&config.api, &config.session_cookie)?);

    let result = execute(cli.command, &config, client).await;
    if let Err(e) = &result {
        if let Some(scheduler_error) = e.downcast_ref::<SchedulerError>() {
            if scheduler_error.requires_redirect() {
                println!("Set up your brand purpose before generating content.");
            }
            tracing::error!(error = %scheduler_error, "Command failed");
            return Err(anyhow::anyhow!(scheduler_error.user_message()));
        }
    }
    result
}

async fn execute(command: Commands, config: &CliConfig, client: Arc<AgencyClient>) -> Result<()> {
    let store = PostStore::new();

    match command {
        Commands::Calendar { json } => {
            tracing::info!(command = "calendar", "Building content calendar");
            let (refreshed, events) =
                futures::join!(store.refresh(client.as_ref()), client.fetch_local_events());
            if let Err(e) = refreshed {
                return Err(SchedulerError::transport("fetch posts", &e).into());
            }
            let catalog = match events {
                Ok(events) => EventCatalog::new(events),
                Err(e) => {
                    tracing::warn!(error = ?e, "Local events unavailable; using Queensland defaults");
                    EventCatalog::queensland_defaults()
                }
            };
            let days = build_calendar(
                &Utc::now(),
                &store.snapshot(),
                &catalog,
                config.calendar.window_days,
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&days)?);
            } else {
                for day in &days {
                    let marker = if day.is_optimal_day { "*" } else { " " };
                    println!("{} {}", marker, day.date.format("%a %d %b %Y"));
                    for event in &day.local_events {
                        println!("    [event] {event}");
                    }
                    for post in &day.posts {
                        println!(
                            "    {} {:<9} {:<10} {}",
                            business_time(&post.scheduled_for).format("%H:%M"),
                            post.platform,
                            post.status,
                            post.id
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Quota => {
            tracing::info!(command = "quota", "Fetching subscription usage");
            let quota = client
                .fetch_quota()
                .await
                .map_err(|e| SchedulerError::transport("fetch quota", &e))?;
            println!(
                "Plan: {:?}  used {} of {}  ({} remaining)",
                quota.plan, quota.used_posts, quota.total_allocation, quota.remaining_posts
            );
            match allocate_generation_size(quota.remaining_posts, config.schedule.ceiling) {
                Ok(size) => println!("Next generation: {size} posts"),
                Err(e) => println!("{}", e.user_message()),
            }
            Ok(())
        }
        Commands::Generate { platforms } => {
            let platforms = if platforms.is_empty() {
                config.schedule.platforms.clone()
            } else {
                platforms
            };
            tracing::info!(command = "generate", platforms = ?platforms, "Generating schedule");
            if let Err(e) = store.refresh(client.as_ref()).await {
                tracing::warn!(error = ?e, "Could not load existing posts before generating");
            }
            let orchestrator = ScheduleOrchestrator::new(Arc::clone(&client), store.clone())
                .with_ceiling(config.schedule.ceiling);
            let generated = orchestrator.generate_for_current_user(&platforms).await?;

            println!("Generated {} posts", generated.posts.len());
            for post in &generated.posts {
                println!(
                    "  {} {:<9} {}",
                    business_time(&post.scheduled_for).format("%a %d %b %H:%M"),
                    post.platform,
                    post.id
                );
            }
            if let Some(score) = generated.analysis.jtbd_score {
                println!("Job-to-be-done alignment: {score:.0}");
            }
            for suggestion in &generated.analysis.suggestions {
                println!("  - {suggestion}");
            }
            Ok(())
        }
        Commands::Approve { post_id } => {
            tracing::info!(command = "approve", post_id = %post_id, "Approving post");
            store
                .refresh(client.as_ref())
                .await
                .map_err(|e| SchedulerError::transport("fetch posts", &e))?;
            let controller = PostLifecycleController::new(client, store);
            match controller.approve(&post_id).await? {
                ApproveOutcome::Approved(confirmation) => println!("{confirmation}"),
                ApproveOutcome::AlreadyApproved => println!("Post {post_id} is already approved"),
                ApproveOutcome::Suppressed => println!("Post {post_id} is already being approved"),
            }
            Ok(())
        }
        Commands::Edit { post_id, content } => {
            tracing::info!(command = "edit", post_id = %post_id, "Editing post content");
            store
                .refresh(client.as_ref())
                .await
                .map_err(|e| SchedulerError::transport("fetch posts", &e))?;
            let controller = PostLifecycleController::new(client, store);
            controller.edit_content(&post_id, &content).await?;
            println!("Post {post_id} updated");
            Ok(())
        }
        Commands::Video {
            post_id,
            prompt_index,
            regenerate,
            approve,
        } => {
            tracing::info!(command = "video", post_id = %post_id, "Starting video workflow");
            store
                .refresh(client.as_ref())
                .await
                .map_err(|e| SchedulerError::transport("fetch posts", &e))?;
            let workflow = VideoWorkflow::new(client, store);
            let mut session = workflow.open_for_current_user(&post_id).await?;

            for (i, prompt) in session.candidate_prompts().iter().enumerate() {
                let marker = if i == prompt_index { ">" } else { " " };
                println!("{marker} [{i}] {prompt}");
            }
            workflow.select_prompt(&mut session, prompt_index).await?;
            print_preview(session.asset().map(|a| a.url.as_str()));

            if let Some(custom_prompt) = regenerate {
                workflow.begin_regeneration(&mut session)?;
                workflow.regenerate(&mut session, &custom_prompt).await?;
                print_preview(session.asset().map(|a| a.url.as_str()));
            }

            if approve {
                let post = workflow.approve(session).await.map_err(|e| e.error)?;
                println!("Video attached to post {}", post.id);
            } else {
                workflow.close(session).map_err(|e| e.error)?;
                println!("Video not approved; run again with --approve to attach it");
            }
            Ok(())
        }
        Commands::Publish => {
            tracing::info!(command = "publish", "Publishing approved posts");
            store
                .refresh(client.as_ref())
                .await
                .map_err(|e| SchedulerError::transport("fetch posts", &e))?;
            let summary = auto_post_schedule(client.as_ref(), &store).await?;
            println!(
                "Published {} of {} approved posts",
                summary.success_count, summary.total_posts
            );
            for post in store
                .snapshot()
                .iter()
                .filter(|p| p.status == PostStatus::Failed)
            {
                println!(
                    "  {} {} failed: {}",
                    post.platform,
                    post.id,
                    post.error_log.as_deref().unwrap_or("no reason given")
                );
            }
            Ok(())
        }
    }
}

fn print_preview(url: Option<&str>) {
    match url {
        Some(url) => println!("Preview: {url}"),
        None => println!("Preview not ready yet"),
    }
}
