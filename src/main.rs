//! Main entry point for vidq CLI

use anyhow::{bail, Context};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidq::app::{Action, App, Outcome, View};
use vidq::cli::output::create_progress_callback;
use vidq::cli::{Args, Command, LineInput, OutputFormatter, TerminalDialog};
use vidq::config::ClientConfig;
use vidq::core::progress::format_duration;
use vidq::core::{MetaStore, QueueSubmitter, SearchPager, Suggestions, TaskPoller, VideoLookup};
use vidq::download::{DownloadTrigger, SaveCapability, SaveOutcome};
use vidq::{ApiClient, VideoService};

/// Components shared by every subcommand
struct Session {
    config: ClientConfig,
    service: Arc<dyn VideoService>,
    store: Arc<MetaStore>,
    poller: Arc<TaskPoller>,
    formatter: Arc<OutputFormatter>,
    input: Arc<LineInput>,
}

impl Session {
    async fn open(config: ClientConfig, formatter: Arc<OutputFormatter>) -> anyhow::Result<Self> {
        let client = ApiClient::with_config(&config.server, config.http.clone())
            .with_context(|| format!("invalid server address {}", config.server))?;
        let service: Arc<dyn VideoService> = Arc::new(client);
        let store = Arc::new(
            MetaStore::open(&config.meta_path)
                .await
                .with_context(|| format!("cannot open {}", config.meta_path.display()))?,
        );
        let poller = Arc::new(
            TaskPoller::new(service.clone(), store.clone()).with_interval(config.poll_interval),
        );

        Ok(Self {
            config,
            service,
            store,
            poller,
            formatter,
            input: Arc::new(LineInput::stdin()),
        })
    }

    fn trigger(&self) -> DownloadTrigger {
        let capability = if self.config.save_dialog {
            SaveCapability::Dialog(Arc::new(TerminalDialog::new(
                self.input.clone(),
                self.config.output_dir.clone(),
            )))
        } else {
            SaveCapability::Fallback {
                dir: self.config.output_dir.clone(),
            }
        };
        DownloadTrigger::new(self.service.clone(), capability)
            .with_progress_callback(create_progress_callback(self.formatter.clone()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose)?;
    info!("Starting vidq with args: {:?}", args);

    // Initialize output formatter
    let formatter = Arc::new(OutputFormatter::new(args.verbosity_level()));
    let session = Session::open(args.client_config(), formatter).await?;

    match args.command() {
        Command::Info { url } => handle_info(&session, &url).await,
        Command::Get { url, quality, save } => {
            handle_get(&session, &url, quality.as_deref(), save).await
        }
        Command::Search { query, pages } => {
            handle_search(&session, &vidq::cli::args::join_query(&query), pages).await
        }
        Command::Suggest { query } => {
            handle_suggest(&session, &vidq::cli::args::join_query(&query)).await
        }
        Command::Tasks { watch } => handle_tasks(&session, watch).await,
        Command::Save { task_id } => handle_save(&session, &task_id).await,
        Command::Forget { task_id } => handle_forget(&session, &task_id).await,
        Command::Shell => run_shell(&session).await,
    }
}

/// Look up a video and print its formats
async fn handle_info(session: &Session, url: &str) -> anyhow::Result<()> {
    let mut lookup = VideoLookup::new(session.service.clone());
    let preview = lookup.fetch(url).await?;
    session.formatter.print_preview(preview);
    Ok(())
}

/// Queue a video, optionally waiting for it and saving the file
async fn handle_get(
    session: &Session,
    url: &str,
    quality: Option<&str>,
    save: bool,
) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let formatter = &session.formatter;

    let mut lookup = VideoLookup::new(session.service.clone());
    lookup.fetch(url).await?;
    if let Some(quality) = quality {
        lookup.select(quality)?;
    }
    let Some(preview) = lookup.preview() else {
        bail!("lookup returned no preview");
    };
    formatter.print_preview(preview);

    let submitter = QueueSubmitter::new(session.service.clone(), session.store.clone());
    let task_id = submitter
        .submit(preview)
        .await
        .context("Failed to start download")?;
    formatter.success(&format!("Task added: {}", task_id));

    if !save {
        return Ok(());
    }

    let wait = session.poller.wait_settled(&task_id, |card| {
        debug!("Task {} {} {:.1}%", card.task_id, card.status.as_str(), card.progress);
    });
    let card = tokio::select! {
        card = wait => card?,
        _ = tokio::signal::ctrl_c() => {
            formatter.warning(&format!("Stopped waiting; task {} keeps running on the server", task_id));
            return Ok(());
        }
    };

    save_card(session, &card).await?;
    formatter.info(&format!("Done in {}", format_duration(start_time.elapsed())));
    Ok(())
}

/// Print one or more pages of search results
async fn handle_search(session: &Session, query: &str, pages: usize) -> anyhow::Result<()> {
    let pager = SearchPager::new(session.service.clone());
    pager.search(query).await?;
    for _ in 1..pages {
        if !pager.has_more() {
            break;
        }
        pager.load_more().await;
    }
    session
        .formatter
        .print_search_entries(&pager.query(), &pager.entries());
    Ok(())
}

async fn handle_suggest(session: &Session, query: &str) -> anyhow::Result<()> {
    let suggestions = Suggestions::new(session.service.clone()).complete(query).await?;
    session.formatter.print_suggestions(&suggestions);
    Ok(())
}

/// Print the task list once, or keep printing it as it changes
async fn handle_tasks(session: &Session, watch: bool) -> anyhow::Result<()> {
    let formatter = &session.formatter;
    if !watch {
        session.poller.poll_once().await?;
        formatter.print_task_cards(session.poller.snapshot().await.cards());
        return Ok(());
    }

    let mut updates = session.poller.subscribe();
    let mut connectivity = session.poller.connectivity();
    let handle = session.poller.start();
    loop {
        tokio::select! {
            Ok(()) = connectivity.changed() => {
                if *connectivity.borrow_and_update() {
                    formatter.success("Back online");
                } else {
                    formatter.warning("Server unreachable; task progress may be out of date");
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let cards = updates.borrow_and_update().clone();
                formatter.print_view_header(View::Tasks);
                formatter.print_task_cards(&cards);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.stop().await;
    Ok(())
}

/// Save the file of a finished task
async fn handle_save(session: &Session, id_or_prefix: &str) -> anyhow::Result<()> {
    session.poller.poll_once().await?;
    let board = session.poller.snapshot().await;
    let card = board.ready_card(id_or_prefix)?;
    save_card(session, card).await
}

async fn save_card(session: &Session, card: &vidq::core::TaskCard) -> anyhow::Result<()> {
    let formatter = &session.formatter;
    let outcome = session.trigger().save_card(card).await;
    formatter.finish_progress("");
    match outcome.context("Download failed")? {
        SaveOutcome::Saved { path, bytes, .. } => formatter.print_saved(&path, bytes),
        SaveOutcome::Cancelled => formatter.info("Save cancelled"),
    }
    Ok(())
}

async fn handle_forget(session: &Session, task_id: &str) -> anyhow::Result<()> {
    match session.store.remove(task_id).await? {
        Some(_) => session.formatter.success(&format!("Forgot task {}", task_id)),
        None => session.formatter.warning(&format!("No cached metadata for {}", task_id)),
    }
    Ok(())
}

/// Interactive shell; the task poller runs for its whole lifetime
async fn run_shell(session: &Session) -> anyhow::Result<()> {
    let formatter = session.formatter.clone();
    let mut app = App::new(
        session.service.clone(),
        session.store.clone(),
        session.poller.clone(),
        session.trigger(),
    );
    let poller = session.poller.start();

    formatter.info(&format!("Connected to {} (type 'help' for commands)", session.config.server));
    loop {
        let prompt = format!("vidq:{}> ", app.view().name());
        let Some(line) = session.input.read_line(&prompt).await? else {
            break;
        };
        let action = match Action::parse(&line) {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(e) => {
                formatter.error(&e.to_string());
                continue;
            }
        };

        let outcome = app.dispatch(action).await;
        formatter.finish_progress("");
        for notice in app.take_notices() {
            formatter.notice(&notice);
        }
        match outcome {
            Outcome::Show(view) => render_view(&app, &formatter, view).await,
            Outcome::Suggestions(list) => formatter.print_suggestions(&list),
            Outcome::Help => formatter.print_help(),
            Outcome::Nothing => {}
            Outcome::Quit => break,
        }
    }

    poller.stop().await;
    Ok(())
}

async fn render_view(app: &App, formatter: &OutputFormatter, view: View) {
    formatter.print_view_header(view);
    match view {
        View::Home => match app.lookup().preview() {
            Some(preview) => formatter.print_preview(preview),
            None => formatter.info("Paste a video URL to look it up"),
        },
        View::Search => {
            formatter.print_search_entries(&app.pager().query(), &app.pager().entries())
        }
        View::Tasks => {
            let board = app.poller().snapshot().await;
            formatter.print_task_cards(board.cards());
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    // Default to warnings so log lines don't interleave with the shell
    let log_level = if verbose { "debug" } else { "warn" };

    // RUST_LOG takes precedence when set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
