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


mod cli;

use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;

use wikisearch::config;
use wikisearch::config::ConfigCtx;
use wikisearch::output::JsonResponse;
use wikisearch::output::QueryOut;
use wikisearch::output::StatsOut;
use wikisearch::output::print_json;
use wikisearch::query;
use wikisearch::store;
use wikisearch::store::Store;
use wikisearch::store::StoreMode;
use wikisearch::transfer;

use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::SearchArgs;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Import(args) => handle_result(cmd_import(args.path, args.json), args.json),
        Commands::Export(args) => handle_result(cmd_export(args.out, args.json), args.json),
        Commands::Search(args) => {
            let json = args.json;
            handle_result(cmd_search(args), json)
        }
        Commands::Stats { json } => handle_result(cmd_stats(json), json),
        Commands::Doctor { json } => handle_result(cmd_doctor(json), json),
    }
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let resp = JsonResponse::error("error", &err.to_string());
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn open_store(mode: StoreMode) -> Result<(ConfigCtx, Store)> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), mode)?;
    Ok((ctx, store))
}

fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&root).with_context(|| format!("create dir {root:?}"))?;

    let config = config::load_global_config()?;
    let store_path = if config.store_path.is_absolute() {
        config.store_path.clone()
    } else {
        root.join(&config.store_path)
    };
    Store::init(&store_path)?;

    println!("Initialized wikisearch store at {}", store_path.display());
    Ok(())
}

fn cmd_import(path: PathBuf, json: bool) -> Result<()> {
    let (_ctx, store) = open_store(StoreMode::ReadWrite)?;
    let file = std::fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let stats = transfer::import_store(&store, file)?;

    let mut warnings = Vec::new();
    if stats.skipped > 0 {
        warnings.push(format!("skipped {} rows with zero count", stats.skipped));
    }

    if json {
        let resp = JsonResponse::ok()
            .with_stats(StatsOut {
                total_hits: stats.rows as i64,
                snapshot: store.snapshot_token().ok(),
                ..Default::default()
            })
            .with_warnings(warnings);
        print_json(&resp)?;
    } else {
        println!("Imported {} term counts", stats.rows);
        for warn in warnings {
            eprintln!("warning: {warn}");
        }
    }
    Ok(())
}

fn cmd_export(out: Option<PathBuf>, json: bool) -> Result<()> {
    if json && out.is_none() {
        anyhow::bail!("--json requires --out for export");
    }
    let (_ctx, store) = open_store(StoreMode::ReadOnly)?;

    let stats = if let Some(path) = out {
        let file =
            std::fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
        transfer::export_store(&store, file)?
    } else {
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        transfer::export_store(&store, handle)?
    };

    if json {
        let resp = JsonResponse::ok().with_stats(StatsOut {
            total_hits: stats.rows as i64,
            snapshot: store.snapshot_token().ok(),
            ..Default::default()
        });
        print_json(&resp)?;
    }
    Ok(())
}

fn cmd_search(args: SearchArgs) -> Result<()> {
    let (ctx, store) = open_store(StoreMode::ReadOnly)?;

    let opts = query::SearchOptions {
        k: ctx.config.limit(args.k),
        ascending: args.asc,
        merge: args.merge.unwrap_or(ctx.config.merge),
    };

    let outcome = query::run_search(&store, &args.query, opts)?;

    if args.json {
        let mut resp = JsonResponse::ok()
            .with_query(QueryOut {
                text: outcome.query.clone(),
                parsed: outcome.parsed.clone(),
                merge: outcome.merge.to_string(),
                limit: outcome.limit as i64,
                order: if args.asc { "asc" } else { "desc" }.to_string(),
            })
            .with_results(outcome.to_json_results())
            .with_stats(StatsOut {
                snapshot: store.snapshot_token().ok(),
                ..outcome.stats.clone()
            })
            .with_warnings(outcome.warnings.clone());
        if args.explain {
            resp = resp.with_explain(outcome.explain_json());
        }
        print_json(&resp)?;
    } else {
        query::print_table(&outcome, args.explain);
        for warn in &outcome.warnings {
            eprintln!("warning: {warn}");
        }
    }
    Ok(())
}

fn store_stats_out(stats: &store::StoreStats, snapshot: Option<String>) -> StatsOut {
    StatsOut {
        took_ms: 0,
        total_hits: 0,
        term_count: Some(stats.term_count),
        doc_count: Some(stats.doc_count),
        row_count: Some(stats.row_count),
        db_size_bytes: Some(stats.db_size_bytes),
        snapshot,
    }
}

fn cmd_stats(json: bool) -> Result<()> {
    let (ctx, store) = open_store(StoreMode::ReadOnly)?;
    let stats = store.stats()?;

    if json {
        let resp =
            JsonResponse::ok().with_stats(store_stats_out(&stats, store.snapshot_token().ok()));
        print_json(&resp)?;
    } else {
        println!("Terms: {}", stats.term_count);
        println!("Docs: {}", stats.doc_count);
        println!("Rows: {}", stats.row_count);
        println!("DB size: {} bytes", stats.db_size_bytes);
        println!("Merge: {}", ctx.config.merge);
        match &ctx.source {
            Some(path) => println!("Config: {}", path.display()),
            None => println!("Config: defaults"),
        }
    }
    Ok(())
}

fn cmd_doctor(json: bool) -> Result<()> {
    let (_ctx, store) = open_store(StoreMode::ReadOnly)?;
    let report = store.integrity_check()?;

    if json {
        let mut resp = JsonResponse::ok()
            .with_stats(store_stats_out(&report.stats, store.snapshot_token().ok()));
        if report.status != "ok" {
            resp = resp.with_warnings(vec![format!("integrity: {}", report.status)]);
        }
        print_json(&resp)?;
    } else {
        println!("Integrity: {}", report.status);
    }
    Ok(())
}
