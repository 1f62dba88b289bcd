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


use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;

use anyhow::Context;
use anyhow::Result;

use crate::model::TermCount;
use crate::store::Store;

#[derive(Debug, Default)]
pub struct TransferStats {
    pub rows: usize,
    pub skipped: usize,
}

pub fn export_store(store: &Store, mut writer: impl Write) -> Result<TransferStats> {
    let mut stats = TransferStats::default();
    for row in store.all_counts()? {
        let line = serde_json::to_string(&row)?;
        writeln!(writer, "{}", line)?;
        stats.rows += 1;
    }
    writer.flush()?;
    Ok(stats)
}

pub fn import_store(store: &Store, reader: impl std::io::Read) -> Result<TransferStats> {
    let mut buf = BufReader::new(reader);
    let mut rows = Vec::new();
    let mut line = String::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        let bytes = buf.read_line(&mut line)?;
        if bytes == 0 {
            break;
        }
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: TermCount = serde_json::from_str(trimmed)
            .with_context(|| format!("parse import line {line_no}: {trimmed}"))?;
        rows.push(parsed);
    }

    store.conn.execute_batch("BEGIN IMMEDIATE")?;
    let report = match store.put_counts(&rows) {
        Ok(report) => report,
        Err(err) => {
            store.conn.execute_batch("ROLLBACK")?;
            return Err(err);
        }
    };
    store.conn.execute_batch("COMMIT")?;

    Ok(TransferStats {
        rows: report.written,
        skipped: report.skipped,
    })
}
