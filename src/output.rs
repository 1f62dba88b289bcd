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


use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsOut {
    pub took_ms: i64,
    pub total_hits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOut {
    pub text: String,
    pub parsed: String,
    pub merge: String,
    pub limit: i64,
    pub order: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: QueryOut) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_results(mut self, results: Vec<Value>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_explain(mut self, explain: Value) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn with_stats(mut self, stats: StatsOut) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}
