use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shapewatch",
    about = "Shapewatch: boolean subscription filters stored as SHACL shapes in an RDF graph",
    version
)]
pub struct Cli {
    /// Path to shapewatch.toml (default: ./shapewatch.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Graph JSONL path for the file backend (overrides the config file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the filterable fields and comparison operators
    Vocab {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage leaf constraints
    Constraint {
        #[command(subcommand)]
        command: ConstraintCommands,
    },

    /// Manage filter nodes
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// Manage subscribers and their subscriptions
    Subscriber {
        #[command(subcommand)]
        command: SubscriberCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConstraintCommands {
    /// Create a constraint
    Add {
        /// Field name (e.g. title, publisher)
        subject: String,

        /// Operator name (e.g. textContains, exists)
        predicate: String,

        /// Value the operator compares against
        #[arg(default_value = "")]
        object: String,

        /// Optional explicit constraint ID
        #[arg(long)]
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one constraint
    Show {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a constraint's field, operator and value
    Replace {
        id: String,
        subject: String,
        predicate: String,
        #[arg(default_value = "")]
        object: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a constraint (filters referencing it are left as they are)
    Delete {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum FilterCommands {
    /// Create a filter node
    Add {
        /// Combine children with ALL (default is ANY)
        #[arg(long)]
        require_all: bool,

        /// Constraint ID to include (repeatable, order is kept)
        #[arg(long = "constraint")]
        constraints: Vec<String>,

        /// Sub-filter ID to include (repeatable, order is kept)
        #[arg(long = "sub-filter")]
        sub_filters: Vec<String>,

        /// Subscribe this email to the new filter
        #[arg(long)]
        email: Option<String>,

        /// Optional explicit filter ID
        #[arg(long)]
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a filter node
    Show {
        id: String,

        /// Load the whole sub-tree instead of one level
        #[arg(long)]
        tree: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a filter node's combinator and children
    Replace {
        id: String,

        #[arg(long)]
        require_all: bool,

        #[arg(long = "constraint")]
        constraints: Vec<String>,

        #[arg(long = "sub-filter")]
        sub_filters: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a filter node (its children are left as they are)
    Delete {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SubscriberCommands {
    /// Subscribe an email to an existing filter
    Subscribe {
        email: String,
        filter: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the filters of the subscriber holding a token
    Filters {
        token: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove one subscription, authenticated by token
    Unsubscribe {
        token: String,
        filter: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
