use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "covgrid",
    about = "covgrid: spatial assignment validation and option-state canonicalization for benefits grids",
    version
)]
pub struct Cli {
    /// Path to a covgrid.toml with [audit] and [canon] tables
    /// (defaults to ./covgrid.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a page's spatial map and assignments and emit an audit package
    Audit {
        /// Path to the spatial map JSON
        spatial_map: String,

        /// Path to the assignments JSON array
        assignments: String,

        /// Source document recorded in the package metadata
        #[arg(long, default_value = "")]
        source_document: String,

        /// Page number recorded in the package metadata
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// RFC 3339 timestamp for the package metadata (defaults to now)
        #[arg(long)]
        timestamp: Option<String>,

        /// Exit 0 even when the package needs review
        #[arg(long)]
        allow_review: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run only the structural checks over a spatial map
    Geometer {
        /// Path to the spatial map JSON
        spatial_map: String,

        /// Exit 0 even when the map needs review
        #[arg(long)]
        allow_review: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse raw evidence text into typed atoms
    Normalize {
        /// Raw token, e.g. "16,0 UF" or "Sin Tope"
        text: String,

        /// Atom key recorded on every produced atom
        #[arg(long, default_value = "")]
        key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Canonicalize row blocks into option states
    Canonize {
        /// Path to a JSON array of blocks ({id, text, column, row_id, segment_id})
        blocks: String,

        /// Only canonize this row
        #[arg(long)]
        row: Option<String>,

        /// Path to a JSON array of option nodes that replaces the graph
        /// built from the row's blocks
        #[arg(long, requires = "row")]
        options: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
