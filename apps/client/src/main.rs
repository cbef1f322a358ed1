use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prompt_client::api::SidebarData;
use prompt_client::content::{LoginForm, TemplateContent};
use prompt_client::feed::{
    FeedBuckets, FetchOutcome, Filter, FilterState, FilterUpdate, OptimisticActionCoordinator,
    PaginatedFeedFetcher, VisibilityFilter,
};
use prompt_client::models::{SocialKind, TemplateItem};
use prompt_client::{Config, FeedBackend, HttpApi, Session, SessionStore};

/// Command-line driver for the prompt library backend.
#[derive(Parser, Debug)]
#[command(name = "prompt-client", version, about = "Awesome Prompt command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and persist the session.
    Login {
        /// Email address or user ID.
        #[arg(long)]
        user: String,
        #[arg(long, env = "PROMPT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session.
    Logout,

    /// List templates page by page.
    Feed {
        #[arg(long, value_enum, default_value_t = VisibilityArg::Public)]
        visibility: VisibilityArg,
        #[arg(long, conflicts_with = "tag")]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, conflicts_with_all = ["category", "tag", "my_favorites"])]
        my_likes: bool,
        #[arg(long, conflicts_with_all = ["category", "tag"])]
        my_favorites: bool,
        /// How many pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Toggle the like on a template.
    Like { id: String },

    /// Toggle the favorite on a template.
    Favorite { id: String },

    /// Show category and tag counts.
    Categories {
        /// List every category instead of the top ten.
        #[arg(long)]
        all: bool,
    },

    /// Fill a template's `$$` placeholders and print the result.
    Render {
        id: String,
        values: Vec<String>,
        /// Also save the values as a prompt.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum VisibilityArg {
    Public,
    Private,
    /// Public and private side by side (requires login).
    Mixed,
}

impl From<VisibilityArg> for VisibilityFilter {
    fn from(v: VisibilityArg) -> Self {
        match v {
            VisibilityArg::Public => VisibilityFilter::Public,
            VisibilityArg::Private => VisibilityFilter::Private,
            VisibilityArg::Mixed => VisibilityFilter::Unset,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let session = match &config.session_file {
        Some(path) => SessionStore::open(path),
        None => SessionStore::in_memory(Session::anonymous()),
    };
    let api = HttpApi::from_config(&config, session.clone()).context("failed to build HTTP client")?;
    info!("Using backend {}", config.api_url);

    match cli.command {
        Commands::Login { user, password } => {
            let request = LoginForm {
                identifier: user,
                password,
            }
            .validate()?;
            let profile = api.login(&request).await?;
            println!("Logged in as {} ({})", profile.display_name, profile.id);
            if config.session_file.is_none() {
                println!("SESSION_FILE is not set; the session will not outlive this process");
            }
        }
        Commands::Logout => {
            api.logout()?;
            println!("Logged out");
        }
        Commands::Feed {
            visibility,
            category,
            tag,
            my_likes,
            my_favorites,
            pages,
        } => {
            let mut filters = FilterState::default();
            filters.set(FilterUpdate::category(category.as_deref(), visibility.into()));
            if let Some(tag) = &tag {
                filters.set(FilterUpdate::tag(tag));
            }
            if my_likes {
                filters.set(FilterUpdate::my_likes());
            } else if my_favorites {
                filters.set(FilterUpdate::my_favorites());
            }
            run_feed(&api, &config, filters.get().clone(), pages).await?;
        }
        Commands::Like { id } => toggle(&api, &id, SocialKind::Like).await?,
        Commands::Favorite { id } => toggle(&api, &id, SocialKind::Favorite).await?,
        Commands::Categories { all } => {
            let sidebar = api.sidebar().await?;
            print_sidebar(&sidebar, all);
        }
        Commands::Render { id, values, save } => {
            let details = api.get_template(&id).await?;
            let version = details
                .current_version()
                .with_context(|| format!("template {id} has no content"))?;
            let content = TemplateContent::parse(&version.content);
            if values.len() != content.variable_count() {
                eprintln!(
                    "warning: template has {} placeholders, {} values given",
                    content.variable_count(),
                    values.len()
                );
            }
            println!("{}", content.render(&values));

            if save {
                let owner = session.user().context("log in to save prompts")?;
                let request = content.prompt_request(&id, version.id, &owner.id, &values);
                let prompt = api.create_prompt(&request).await?;
                println!("Saved prompt {}", prompt.id);
            }
        }
    }

    Ok(())
}

async fn run_feed(api: &HttpApi, config: &Config, filter: Filter, pages: usize) -> Result<()> {
    let backend: Arc<dyn FeedBackend> = Arc::new(api.clone());
    let fetcher = PaginatedFeedFetcher::new(backend, api.session().clone(), config.page_size);

    let mut outcome = fetcher.reset(filter).await?;
    for _ in 1..pages {
        if !fetcher.has_more() {
            break;
        }
        outcome = fetcher.load_more().await?;
    }

    let feed = fetcher.snapshot();
    print_bucket("Public", &feed.public_items);
    print_bucket("Private", &feed.private_items);
    if let FetchOutcome::Applied { has_more: true, .. } = outcome {
        println!("(more available, next token {:?})", fetcher.token().as_str());
    }
    Ok(())
}

async fn toggle(api: &HttpApi, id: &str, kind: SocialKind) -> Result<()> {
    let details = api.get_template(id).await?;
    let mut buckets = FeedBuckets::default();
    buckets.extend(details.template.visibility.into(), [details.template]);

    let backend: Arc<dyn FeedBackend> = Arc::new(api.clone());
    let coordinator = OptimisticActionCoordinator::new(backend, api.session().clone(), Arc::new(Mutex::new(buckets)));
    let pending = coordinator.toggle(id, kind)?;
    let state = pending.settle().await?;
    let label = match kind {
        SocialKind::Like => "liked",
        SocialKind::Favorite => "favorited",
    };
    println!("{id}: {label}={} count={}", state.active, state.count);
    Ok(())
}

fn print_bucket(title: &str, items: &[TemplateItem]) {
    if items.is_empty() {
        return;
    }
    println!("== {title} ({}) ==", items.len());
    for item in items {
        println!(
            "{:<24} {:<40} likes={:<4} favs={:<4} {}",
            item.id,
            item.title,
            item.like_count,
            item.favorite_count,
            item.category.as_deref().unwrap_or("-")
        );
    }
}

fn print_sidebar(sidebar: &SidebarData, all: bool) {
    println!("Categories:");
    for category in sidebar.visible_categories(all) {
        println!("  {:<30} {}", category.name, category.count);
    }
    if !all && sidebar.has_more_categories() {
        println!("  ... (--all for the rest)");
    }
    println!("Tags:");
    for tag in &sidebar.tags {
        println!("  {:<30} {}", tag.name, tag.count);
    }
}
