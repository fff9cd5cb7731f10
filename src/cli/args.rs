use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "counsel",
    version,
    about = "counselling data browser and choice-list client",
    long_about = "counsel browses medical counselling datasets (allotments, closing ranks, seat matrix, fees, colleges) and manages counselling-scoped choice lists.\n\nExamples:\n  counsel browse allotments --counselling \"Goa - PG Medical\" --search surgery\n  counsel browse colleges --state Karnataka --type private --format json\n  counsel lists create \"Maharashtra - UG Medical\"\n\nTip: Use --config to persist the API URL and initial selection."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv). RUST_LOG overrides."
    )]
    pub verbose: u8,

    #[arg(
        long = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        long = "color",
        global = true,
        help_heading = "Output",
        help = "Force colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'o',
        long = "format",
        value_name = "FORMAT",
        global = true,
        help_heading = "Output",
        help = "Output format: text or json."
    )]
    pub format: Option<String>,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Connection",
        help = "Path to config file (defaults to ~/.counsel/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "api-url",
        value_name = "URL",
        global = true,
        help_heading = "Connection",
        help = "Base URL of the counselling API."
    )]
    pub api_url: Option<String>,

    #[arg(
        long = "assets",
        value_name = "DIR|URL",
        global = true,
        help_heading = "Connection",
        help = "Directory or base URL holding the fallback CSV files."
    )]
    pub assets: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "Connection",
        help = "Connection timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "token-path",
        value_name = "FILE",
        global = true,
        help_heading = "Connection",
        help = "Where the session token is stored."
    )]
    pub token_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Browse a dataset for one counselling authority.
    Browse(BrowseArgs),

    /// List counselling authorities.
    Counselling {
        #[arg(short = 's', long = "search", value_name = "TEXT")]
        search: Option<String>,
    },

    /// List the quota labels for an exam level.
    Quotas {
        #[arg(short = 'l', long = "level", value_name = "UG|PG")]
        level: String,
    },

    /// Manage choice lists.
    Lists {
        #[command(subcommand)]
        action: ListsCommand,
    },

    /// Sign in and store the session token.
    Login {
        #[arg(short = 'e', long = "email")]
        email: String,
        #[arg(short = 'p', long = "password", help = "Read from stdin when omitted.")]
        password: Option<String>,
    },

    /// Create an account and sign in.
    Signup(SignupArgs),

    /// Sign out and forget the stored token.
    Logout,

    /// Show or update the signed-in profile.
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Frequently asked questions.
    Faq {
        #[arg(long = "category")]
        category: Option<String>,
    },

    /// Counselling schedule.
    Timeline,

    /// Support tickets.
    Tickets {
        #[command(subcommand)]
        action: TicketsCommand,
    },

    /// Forward a predictor request to the server.
    Predict {
        #[arg(value_enum)]
        kind: PredictorKind,
        #[arg(long = "input", value_name = "JSON")]
        input: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Allotments,
    ClosingRanks,
    SeatMatrix,
    Fees,
    Colleges,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    Ug,
    Pg,
    Rank,
}

#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    #[arg(value_enum)]
    pub dataset: DatasetKind,

    #[arg(
        short = 'c',
        long = "counselling",
        value_name = "LABEL",
        help_heading = "Selection",
        help = "Counselling authority (see `counsel counselling`)."
    )]
    pub counselling: Option<String>,

    #[arg(
        short = 'l',
        long = "level",
        value_name = "UG|PG",
        help_heading = "Selection",
        help = "Exam level."
    )]
    pub level: Option<String>,

    #[arg(
        short = 's',
        long = "search",
        value_name = "TEXT",
        help_heading = "Filtering",
        help = "Case-insensitive text search."
    )]
    pub search: Option<String>,

    #[arg(
        long = "sort",
        value_name = "asc|desc",
        help_heading = "Filtering",
        help = "Sort by rank."
    )]
    pub sort: Option<String>,

    #[arg(
        long = "state",
        value_name = "STATE",
        help_heading = "Filtering",
        help = "Only rows from this state."
    )]
    pub state: Option<String>,

    #[arg(
        long = "type",
        value_name = "government|private",
        help_heading = "Filtering",
        help = "College ownership (colleges only)."
    )]
    pub ownership: Option<String>,

    #[arg(
        short = 'p',
        long = "page",
        value_name = "N",
        default_value_t = 1,
        help_heading = "Filtering",
        help = "1-based page number."
    )]
    pub page: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SignupArgs {
    #[arg(long = "name")]
    pub name: String,
    #[arg(short = 'e', long = "email")]
    pub email: String,
    #[arg(long = "phone")]
    pub phone: String,
    #[arg(short = 'p', long = "password", help = "Read from stdin when omitted.")]
    pub password: Option<String>,
    #[arg(long = "neet-rank")]
    pub neet_rank: Option<String>,
    #[arg(long = "category")]
    pub category: Option<String>,
    #[arg(long = "state")]
    pub state: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ListsCommand {
    /// Show all lists.
    Show,
    /// Create a list scoped to a counselling authority.
    Create { counselling: String },
    /// Delete a list.
    Delete { id: String },
    /// Add a college to a list.
    Add { list: String, college: String },
    /// Remove a college from a list.
    Remove { list: String, college: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    Show,
    Update {
        #[arg(long = "name")]
        name: Option<String>,
        #[arg(long = "phone")]
        phone: Option<String>,
        #[arg(long = "neet-rank")]
        neet_rank: Option<String>,
        #[arg(long = "category")]
        category: Option<String>,
        #[arg(long = "state")]
        state: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TicketsCommand {
    List,
    Create {
        #[arg(long = "subject")]
        subject: String,
        #[arg(long = "message")]
        message: String,
    },
}
