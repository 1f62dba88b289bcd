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


//! Scored result sets and the boolean algebra over them.
//!
//! A [`SearchResult`] maps document identifiers to relevance scores. Results
//! are never mutated after construction: `or`, `and` and `minus` read two
//! inputs and build a fresh mapping. Overlapping scores are combined by the
//! left operand's [`MergePolicy`].

use anyhow::Result;

use crate::index::Index;
use crate::merge::MergePolicy;
use crate::merge::Sum;
use crate::model::RankedEntry;
use crate::model::Scores;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<M = Sum> {
    scores: Scores,
    merge: M,
}

impl SearchResult {
    pub fn new(scores: Scores) -> Self {
        Self::with_merge(scores, Sum)
    }

    /// Looks `term` up in `index` and wraps the counts unchanged.
    ///
    /// Index failures are returned as-is; there is no retry.
    pub fn search<I: Index + ?Sized>(term: &str, index: &I) -> Result<Self> {
        Self::search_with(term, index, Sum)
    }
}

impl<M: MergePolicy> SearchResult<M> {
    pub fn with_merge(scores: Scores, merge: M) -> Self {
        Self { scores, merge }
    }

    pub fn search_with<I: Index + ?Sized>(term: &str, index: &I, merge: M) -> Result<Self> {
        let scores = index.counts(term)?;
        Ok(Self::with_merge(scores, merge))
    }

    /// Stored score for `doc`, or 0 when the document is not in the set.
    pub fn relevance(&self, doc: &str) -> u64 {
        self.scores.get(doc).copied().unwrap_or(0)
    }

    pub fn contains(&self, doc: &str) -> bool {
        self.scores.contains_key(doc)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.scores.iter().map(|(doc, score)| (doc.as_str(), *score))
    }

    /// Union. Documents found by only one side keep that side's score.
    pub fn or(&self, other: &Self) -> Self
    where
        M: Clone,
    {
        let mut scores = Scores::new();
        for (doc, &score) in &self.scores {
            let combined = if other.contains(doc) {
                self.merge.merge(score, other.relevance(doc))
            } else {
                score
            };
            scores.insert(doc.clone(), combined);
        }
        for (doc, &score) in &other.scores {
            if !self.contains(doc) {
                scores.insert(doc.clone(), score);
            }
        }
        Self::with_merge(scores, self.merge.clone())
    }

    /// Intersection.
    pub fn and(&self, other: &Self) -> Self
    where
        M: Clone,
    {
        let scores = self
            .scores
            .iter()
            .filter(|(doc, _)| other.contains(doc))
            .map(|(doc, &score)| (doc.clone(), self.merge.merge(score, other.relevance(doc))))
            .collect();
        Self::with_merge(scores, self.merge.clone())
    }

    /// Difference. Survivors still pass through the merge policy, paired with
    /// the excluded side's relevance (always 0 here).
    pub fn minus(&self, other: &Self) -> Self
    where
        M: Clone,
    {
        let scores = self
            .scores
            .iter()
            .filter(|(doc, _)| !other.contains(doc))
            .map(|(doc, &score)| (doc.clone(), self.merge.merge(score, other.relevance(doc))))
            .collect();
        Self::with_merge(scores, self.merge.clone())
    }

    /// Entries in ascending score order. Equal scores keep document-id order.
    pub fn sort(&self) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = self
            .scores
            .iter()
            .map(|(doc, &score)| RankedEntry::new(doc.clone(), score))
            .collect();
        entries.sort_by_key(|entry| entry.score);
        entries
    }
}
