use std::io::{self, BufRead, Write};

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{
    ApiClient, ApiError, NewTicket, ProfileUpdate, SignupRequest,
};
use crate::assets::{AssetError, AssetSource};
use crate::auth::{AuthError, AuthService};
use crate::catalog;
use crate::choice::{ChoiceError, ChoiceListManager};
use crate::cli::args::{
    BrowseArgs, CliArgs, Command, DatasetKind, ListsCommand, PredictorKind, ProfileCommand,
    SignupArgs, TicketsCommand,
};
use crate::cli::validation;
use crate::config::{self, ConfigError, ConfigFile, Settings};
use crate::dataset::{
    Allotments, ClosingRanks, Colleges, Dataset, DatasetView, Facets, FeeStipendBond, Page,
    RecordOrigin, RemoteSource, SeatMatrix, Selection, SortOrder,
};
use crate::output::{self, OutputFormat, Tabular};
use crate::records::{ExamLevel, Ownership};
use crate::session::{FileTokenStore, Session, SessionStatus};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Choice(#[from] ChoiceError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("not signed in, run `counsel login` first")]
    NotSignedIn,

    #[error("session expired")]
    SessionExpired,

    #[error("failed to read input: {source}")]
    Input {
        #[source]
        source: io::Error,
    },

    #[error("failed to build runtime: {source}")]
    Runtime {
        #[source]
        source: io::Error,
    },
}

impl AppError {
    /// Whether the command failed because the server rejected the session.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::SessionExpired => true,
            Self::Api(e) => e.is_unauthorized(),
            Self::Auth(AuthError::Api(e)) => e.is_unauthorized(),
            Self::Choice(e) => e.is_unauthorized(),
            _ => false,
        }
    }
}

/// Everything a command needs, resolved from flags, environment and file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub settings: Settings,
    pub format: OutputFormat,
    pub no_color: bool,
    pub command: Command,
}

pub fn build_run_config(
    args: CliArgs,
    cfg: ConfigFile,
    api_url_env: Option<String>,
) -> Result<RunConfig, AppError> {
    validation::validate(&args).map_err(AppError::Usage)?;

    let mut settings = Settings::resolve(&cfg, api_url_env)?;
    if let Some(url) = args.api_url {
        settings.api_url = url;
    }
    if let Some(assets) = args.assets {
        settings.assets = assets;
    }
    if let Some(timeout) = args.timeout {
        settings.timeout = std::time::Duration::from_secs(timeout);
    }
    if let Some(path) = args.token_path.as_deref() {
        settings.token_path = config::expand_tilde(path);
    }

    let format_raw = args.format.or_else(|| settings.output_format.clone());
    let format = match format_raw.as_deref() {
        None => OutputFormat::Text,
        Some(raw) => OutputFormat::parse(raw)
            .ok_or_else(|| AppError::Usage(format!("invalid output_format '{raw}'")))?,
    };

    let no_color = if args.color {
        false
    } else {
        args.no_color || settings.no_color
    };

    Ok(RunConfig {
        settings,
        format,
        no_color,
        command: args.command,
    })
}

/// The client stack shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    source: RemoteSource,
    format: OutputFormat,
    selection: Selection,
}

impl Context {
    pub fn build(settings: &Settings, format: OutputFormat) -> Result<Self, AppError> {
        let session = Session::new(Box::new(FileTokenStore::new(settings.token_path.clone())));
        let api = ApiClient::new(&settings.api_url, settings.timeout, session)?;
        let assets = AssetSource::from_location(&settings.assets, settings.timeout)?;
        Ok(Self {
            source: RemoteSource::new(api, assets),
            format,
            selection: Selection::new(&settings.counselling, settings.exam_level),
        })
    }

    pub fn api(&self) -> &ApiClient {
        self.source.api()
    }

    pub fn session(&self) -> &Session {
        self.api().session()
    }

    fn selection_for(&self, args: &BrowseArgs) -> Result<Selection, AppError> {
        let mut selection = self.selection.clone();
        if let Some(raw) = args.counselling.as_deref() {
            let entry = catalog::find(raw)
                .ok_or_else(|| AppError::Usage(format!("unknown counselling '{raw}'")))?;
            selection.counselling = entry.label.to_string();
            if args.level.is_none() {
                selection.level = entry.level;
            }
        }
        if let Some(raw) = args.level.as_deref() {
            selection.level = validation::parse_level(raw).map_err(AppError::Usage)?;
        }
        Ok(selection)
    }
}

pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("counsel={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Runs one command and returns what should be printed to stdout.
pub async fn execute(ctx: &Context, command: Command) -> Result<String, AppError> {
    let mut status = ctx.session().subscribe();
    let result = dispatch(ctx, command).await;
    let expired = status.has_changed().unwrap_or(false)
        && *status.borrow_and_update() == SessionStatus::Expired;
    match result {
        Err(e) if expired && !e.is_unauthorized() => {
            debug!(error = %e, "command failed after session expiry");
            Err(AppError::SessionExpired)
        }
        other => other,
    }
}

async fn dispatch(ctx: &Context, command: Command) -> Result<String, AppError> {
    match command {
        Command::Browse(args) => match args.dataset {
            DatasetKind::Allotments => browse::<Allotments>(ctx, &args).await,
            DatasetKind::ClosingRanks => browse::<ClosingRanks>(ctx, &args).await,
            DatasetKind::SeatMatrix => browse::<SeatMatrix>(ctx, &args).await,
            DatasetKind::Fees => browse::<FeeStipendBond>(ctx, &args).await,
            DatasetKind::Colleges => browse::<Colleges>(ctx, &args).await,
        },
        Command::Counselling { search } => {
            let hits = catalog::search(search.as_deref().unwrap_or(""));
            Ok(match ctx.format {
                OutputFormat::Json => output::render_json(&hits) + "\n",
                OutputFormat::Text => output::render_table(&hits),
            })
        }
        Command::Quotas { level } => {
            let level = validation::parse_level(&level).map_err(AppError::Usage)?;
            let quotas = catalog::quotas(level);
            Ok(match ctx.format {
                OutputFormat::Json => output::render_json(quotas) + "\n",
                OutputFormat::Text => quotas.iter().map(|q| format!("{q}\n")).collect(),
            })
        }
        Command::Lists { action } => lists(ctx, action).await,
        Command::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let user = AuthService::new(ctx.api().clone())
                .login(&email, &password)
                .await?;
            Ok(format!(":: Signed in as {} <{}>\n", user.name, user.email))
        }
        Command::Signup(args) => signup(ctx, args).await,
        Command::Logout => {
            AuthService::new(ctx.api().clone()).logout().await;
            Ok(":: Signed out\n".to_string())
        }
        Command::Profile { action } => profile(ctx, action).await,
        Command::Faq { category } => {
            let faqs = ctx.api().faqs(category.as_deref()).await?.into_data();
            Ok(match ctx.format {
                OutputFormat::Json => output::render_json(&faqs) + "\n",
                OutputFormat::Text => output::render_faqs(&faqs),
            })
        }
        Command::Timeline => {
            let timeline = ctx.api().counselling_timeline().await?.into_data();
            Ok(output::render_json(&timeline) + "\n")
        }
        Command::Tickets { action } => tickets(ctx, action).await,
        Command::Predict { kind, input } => {
            let input: serde_json::Value = serde_json::from_str(&input)
                .map_err(|e| AppError::Usage(format!("invalid --input: {e}")))?;
            let api = ctx.api();
            let resp = match kind {
                PredictorKind::Ug => api.predict_ug_colleges(&input).await?,
                PredictorKind::Pg => api.predict_pg_specialties(&input).await?,
                PredictorKind::Rank => api.predict_rank(&input).await?,
            };
            Ok(output::render_json(&resp.into_data()) + "\n")
        }
    }
}

#[derive(Serialize)]
struct BrowseReport<'a, R: Serialize> {
    dataset: &'static str,
    counselling: &'a str,
    level: ExamLevel,
    origin: Option<RecordOrigin>,
    page: Page<&'a R>,
}

async fn browse<D: Dataset>(ctx: &Context, args: &BrowseArgs) -> Result<String, AppError>
where
    D::Record: Tabular,
{
    let mut view: DatasetView<D> = DatasetView::new(ctx.selection_for(args)?);
    view.set_search(args.search.as_deref().unwrap_or(""));
    view.set_sort(args.sort.as_deref().and_then(SortOrder::parse));
    view.set_facets(Facets {
        state: args.state.clone(),
        ownership: args.ownership.as_deref().and_then(Ownership::parse),
    });

    let pb = output::spinner(format!("Loading {} for {}", D::NAME, view.selection()));
    let loaded = view.load(&ctx.source).await;
    pb.finish_and_clear();
    loaded?;

    view.set_page(args.page);
    let page = view.current_page();

    if ctx.format == OutputFormat::Json {
        let report = BrowseReport {
            dataset: D::NAME,
            counselling: &view.selection().counselling,
            level: view.selection().level,
            origin: view.origin(),
            page,
        };
        return Ok(output::render_json(&report) + "\n");
    }

    let mut out = format!(
        ":: {} :: {} :: {}\n",
        D::NAME.bold(),
        view.selection(),
        view.origin().map(|o| o.to_string()).unwrap_or_default()
    );
    if view.origin() == Some(RecordOrigin::Sample) {
        out.push_str(&format!(
            "{}\n",
            ":: Showing built-in sample rows, live data is unavailable".yellow()
        ));
    }
    if page.items.is_empty() {
        out.push_str(":: No rows match\n");
        return Ok(out);
    }
    out.push_str(&output::render_table(&page.items));
    out.push_str(&format!(
        ":: Rows {}-{} of {} :: Page {}/{}\n",
        page.first, page.last, page.total_items, page.number, page.total_pages
    ));
    Ok(out)
}

async fn lists(ctx: &Context, action: ListsCommand) -> Result<String, AppError> {
    let mut manager = ChoiceListManager::new(ctx.api().clone());
    match action {
        ListsCommand::Show => {
            manager.load().await?;
            if ctx.format == OutputFormat::Json {
                return Ok(output::render_json(manager.lists()) + "\n");
            }
            let mut out = output::render_table(manager.lists());
            if manager.is_sample() {
                out.push_str(&format!(
                    "{}\n",
                    ":: Server unavailable, showing example lists".yellow()
                ));
            }
            Ok(out)
        }
        ListsCommand::Create { counselling } => {
            let created = manager.create(&counselling).await?;
            Ok(match ctx.format {
                OutputFormat::Json => output::render_json(created) + "\n",
                OutputFormat::Text => format!(
                    ":: Created list {} for {}\n",
                    created.id, created.counselling_type
                ),
            })
        }
        ListsCommand::Delete { id } => {
            manager.delete(&id).await?;
            Ok(format!(":: Deleted list {id}\n"))
        }
        ListsCommand::Add { list, college } => {
            manager.add_item(&list, &college).await?;
            Ok(format!(":: Added {college} to list {list}\n"))
        }
        ListsCommand::Remove { list, college } => {
            manager.remove_item(&list, &college).await?;
            Ok(format!(":: Removed {college} from list {list}\n"))
        }
    }
}

async fn signup(ctx: &Context, args: SignupArgs) -> Result<String, AppError> {
    let request = SignupRequest {
        name: args.name.trim().to_string(),
        email: args.email.trim().to_string(),
        phone: args.phone.trim().to_string(),
        password: password_or_prompt(args.password)?,
        neet_rank: args.neet_rank,
        category: args.category,
        state: args.state,
    };
    let user = AuthService::new(ctx.api().clone()).signup(&request).await?;
    Ok(format!(":: Welcome, {} <{}>\n", user.name, user.email))
}

async fn profile(ctx: &Context, action: ProfileCommand) -> Result<String, AppError> {
    let auth = AuthService::new(ctx.api().clone());
    let user = match action {
        ProfileCommand::Show => auth.restore().await.ok_or(AppError::NotSignedIn)?,
        ProfileCommand::Update {
            name,
            phone,
            neet_rank,
            category,
            state,
        } => {
            if !ctx.session().has_token() {
                return Err(AppError::NotSignedIn);
            }
            let update = ProfileUpdate {
                name,
                phone,
                neet_rank,
                category,
                state,
                avatar: None,
            };
            auth.update_profile(&update).await?
        }
    };
    Ok(match ctx.format {
        OutputFormat::Json => output::render_json(&user) + "\n",
        OutputFormat::Text => output::render_user(&user),
    })
}

async fn tickets(ctx: &Context, action: TicketsCommand) -> Result<String, AppError> {
    match action {
        TicketsCommand::List => {
            let tickets = ctx.api().tickets().await?.into_data();
            Ok(match ctx.format {
                OutputFormat::Json => output::render_json(&tickets) + "\n",
                OutputFormat::Text => output::render_table(&tickets),
            })
        }
        TicketsCommand::Create { subject, message } => {
            let ticket = ctx
                .api()
                .create_ticket(&NewTicket { subject, message })
                .await?
                .into_data();
            Ok(format!(":: Opened ticket {}\n", ticket.id))
        }
    }
}

fn password_or_prompt(password: Option<String>) -> Result<String, AppError> {
    if let Some(p) = password {
        return Ok(p);
    }
    eprint!("Password: ");
    io::stderr().flush().map_err(|source| AppError::Input { source })?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|source| AppError::Input { source })?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn load_config_file(explicit: Option<&str>) -> Result<ConfigFile, AppError> {
    if let Some(path) = explicit {
        return Ok(config::load_config(&config::expand_tilde(path), false)?);
    }
    let Some(path) = config::default_config_path() else {
        return Ok(ConfigFile::default());
    };
    if let Err(e) = config::ensure_default_config_file(&path) {
        warn!(error = %e, "could not create default config file");
    }
    Ok(config::load_config(&path, true)?)
}

pub fn run_cli() -> Result<(), AppError> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(AppError::Usage(e.to_string())),
        },
    };
    init_tracing(args.verbose);

    let cfg = load_config_file(args.config.as_deref())?;
    let run = build_run_config(args, cfg, std::env::var(config::API_URL_ENV).ok())?;
    if run.no_color {
        colored::control::set_override(false);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppError::Runtime { source })?;

    let out = rt.block_on(async {
        let ctx = Context::build(&run.settings, run.format)?;
        execute(&ctx, run.command).await
    })?;
    print!("{out}");
    Ok(())
}
