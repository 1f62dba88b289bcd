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


use std::collections::BTreeMap;

use anyhow::Result;

use crate::model::Scores;
use crate::model::TermCount;

/// Source of per-term document counts.
pub trait Index {
    /// Documents containing `term`, with the number of occurrences in each.
    fn counts(&self, term: &str) -> Result<Scores>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    terms: BTreeMap<String, Scores>,
}

impl MemoryIndex {
    pub fn insert(&mut self, term: &str, doc: &str, count: u64) {
        if count == 0 {
            return;
        }
        self.terms
            .entry(term.to_string())
            .or_default()
            .insert(doc.to_string(), count);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = TermCount>) {
        for row in rows {
            self.insert(&row.term, &row.doc, row.count);
        }
    }
}

impl Index for MemoryIndex {
    fn counts(&self, term: &str) -> Result<Scores> {
        Ok(self.terms.get(term).cloned().unwrap_or_default())
    }
}
