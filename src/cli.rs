// Copyright 2026 Wikisearch Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use wikisearch::merge::ScoreMerge;

#[derive(Parser, Debug)]
#[command(
    name = "wikisearch",
    version,
    about = "Boolean search over term-frequency indexes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new store
    Init {
        /// Directory to create the store in
        path: Option<PathBuf>,
    },

    /// Load term counts from a JSONL file
    Import(ImportArgs),

    /// Write all term counts as JSONL
    Export(ExportArgs),

    /// Run a boolean query (AND, OR, NOT, parentheses)
    Search(SearchArgs),

    /// Show stats
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Run integrity checks
    Doctor {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text, e.g. "java AND programming NOT coffee"
    pub query: String,

    /// Maximum number of results
    #[arg(long)]
    pub k: Option<usize>,

    /// Score merge policy: sum, max, min or weighted:L:R
    #[arg(long)]
    pub merge: Option<ScoreMerge>,

    /// List least relevant first
    #[arg(long)]
    pub asc: bool,

    /// Include per-term hit counts
    #[arg(long)]
    pub explain: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (defaults to stdout)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output JSON stats (requires --out)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Input file (JSONL, one {"term", "doc", "count"} object per line)
    pub path: PathBuf,

    /// Output JSON stats
    #[arg(long)]
    pub json: bool,
}
