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


//! Scored search results and boolean query evaluation over term-count indexes.
//!
//! A single-term lookup yields a [`SearchResult`]; results combine with
//! [`SearchResult::or`], [`SearchResult::and`] and [`SearchResult::minus`],
//! merging the scores of shared documents through a [`MergePolicy`], and
//! [`SearchResult::sort`] ranks them.
//!
//! ```
//! use wikisearch::index::MemoryIndex;
//! use wikisearch::SearchResult;
//!
//! let mut index = MemoryIndex::default();
//! index.insert("java", "u1", 2);
//! index.insert("java", "u2", 5);
//! index.insert("programming", "u2", 3);
//!
//! let java = SearchResult::search("java", &index)?;
//! let programming = SearchResult::search("programming", &index)?;
//! assert_eq!(java.and(&programming).relevance("u2"), 8);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod index;
pub mod merge;
pub mod model;
pub mod output;
pub mod query;
pub mod result;
pub mod store;
pub mod transfer;

pub use crate::index::Index;
pub use crate::merge::MergePolicy;
pub use crate::merge::ScoreMerge;
pub use crate::model::RankedEntry;
pub use crate::result::SearchResult;
