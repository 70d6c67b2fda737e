use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::{DiscussionOrder, OrderDirection, OrderField, OutputFormat};

pub mod render;

#[derive(Parser)]
#[command(name = "gh-discussions")]
#[command(about = "A command-line client for GitHub Discussions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List discussions in a repository
    List {
        /// Repository in owner/name format
        repo: Option<String>,

        /// Number of discussions to fetch
        #[arg(short, long, default_value_t = 20)]
        first: u32,

        /// Cursor to continue from
        #[arg(long)]
        after: Option<String>,

        /// Sort field
        #[arg(long, value_enum, default_value_t = SortField::Updated)]
        sort: SortField,

        /// Sort direction
        #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
        order: SortOrder,

        /// Output format (table, json, markdown)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Show a discussion with its comments
    Show {
        /// Discussion number
        number: String,

        /// Repository in owner/name format
        repo: Option<String>,

        /// Maximum comments to fetch (at most 100)
        #[arg(long)]
        comments: Option<u32>,

        /// Output format (table, json, markdown)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Add a comment to a discussion
    Comment {
        /// Discussion number
        number: String,

        /// Comment text
        message: String,

        /// Repository in owner/name format
        repo: Option<String>,
    },

    /// Start a new discussion
    Create {
        /// Discussion title
        title: String,

        /// Discussion body
        body: String,

        /// Repository in owner/name format
        repo: Option<String>,

        /// Category id (defaults to "General" or the first category)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Search discussion titles
    Search {
        /// Text to look for in titles
        query: String,

        /// Repository in owner/name format
        repo: Option<String>,

        /// Only discussions started by this user
        #[arg(long)]
        author: Option<String>,

        /// Only discussions in this category (by name)
        #[arg(long)]
        category: Option<String>,

        /// Maximum results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (table, json, markdown)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Manage credentials and defaults
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Store a GitHub token
    SetToken {
        /// Personal access token
        token: String,

        /// Skip checking the token against GitHub
        #[arg(long)]
        no_verify: bool,
    },

    /// Set the default repository
    SetRepo {
        /// Repository in owner/name format
        repo: String,
    },

    /// Set the default output format
    SetFormat {
        /// table, json or markdown
        format: OutputFormat,
    },

    /// Show current configuration
    Show,

    /// Remove the stored token
    ClearToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    Asc,
    Desc,
}

pub fn order_from(sort: SortField, order: SortOrder) -> DiscussionOrder {
    DiscussionOrder {
        field: match sort {
            SortField::Created => OrderField::CreatedAt,
            SortField::Updated => OrderField::UpdatedAt,
        },
        direction: match order {
            SortOrder::Asc => OrderDirection::Asc,
            SortOrder::Desc => OrderDirection::Desc,
        },
    }
}
