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


//! Shared domain types used across the result algebra, the store, and output.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Document identifier -> relevance score.
pub type Scores = BTreeMap<String, u64>;

/// One `(doc, score)` pair as produced by ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub doc: String,
    pub score: u64,
}

impl RankedEntry {
    pub fn new(doc: impl Into<String>, score: u64) -> Self {
        Self {
            doc: doc.into(),
            score,
        }
    }
}

/// One row of the term-count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub doc: String,
    pub count: u64,
}
