use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nasdb")]
#[command(about = "Semantic search over a NAS file tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List a directory under the source root")]
    Ls {
        #[arg(default_value = "/", help = "Root-relative directory, e.g. /docs")]
        path: String,
    },

    #[command(about = "Index every text file under a folder")]
    Index {
        #[arg(help = "Root-relative folder to index")]
        folder: String,
    },

    #[command(about = "Remove a folder (and everything under it) from the index")]
    Delete {
        #[arg(help = "Root-relative folder prefix")]
        folder: String,
    },

    #[command(about = "Find the files that best match a query")]
    Search {
        #[arg(help = "Natural-language query")]
        query: String,

        #[arg(short = 'n', long = "results", help = "Number of distinct files to return")]
        n_results: Option<usize>,

        #[arg(long = "candidates", help = "Nearest chunks to fetch before grouping by file")]
        candidates: Option<usize>,
    },

    #[command(about = "List indexed files")]
    Files,

    #[command(about = "Delete every indexed chunk")]
    Reset {
        #[arg(long, help = "Confirm the reset")]
        yes: bool,
    },
}
