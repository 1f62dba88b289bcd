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


//! Relevance merge policies.
//!
//! When two result sets both contain a document, its scores are combined by a
//! [`MergePolicy`]. Every combinator in [`crate::result`] goes through this
//! trait, so swapping the policy changes scoring without touching set logic.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

pub trait MergePolicy {
    fn merge(&self, left: u64, right: u64) -> u64;
}

/// Arithmetic sum of both scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum;

impl MergePolicy for Sum {
    fn merge(&self, left: u64, right: u64) -> u64 {
        left.saturating_add(right)
    }
}

impl<F> MergePolicy for F
where
    F: Fn(u64, u64) -> u64,
{
    fn merge(&self, left: u64, right: u64) -> u64 {
        self(left, right)
    }
}

/// Policy chosen at runtime from config or the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScoreMerge {
    #[default]
    Sum,
    Max,
    Min,
    Weighted {
        left: u64,
        right: u64,
    },
}

impl MergePolicy for ScoreMerge {
    fn merge(&self, left: u64, right: u64) -> u64 {
        match *self {
            ScoreMerge::Sum => Sum.merge(left, right),
            ScoreMerge::Max => left.max(right),
            ScoreMerge::Min => left.min(right),
            ScoreMerge::Weighted {
                left: wl,
                right: wr,
            } => left
                .saturating_mul(wl)
                .saturating_add(right.saturating_mul(wr)),
        }
    }
}

impl fmt::Display for ScoreMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMerge::Sum => f.write_str("sum"),
            ScoreMerge::Max => f.write_str("max"),
            ScoreMerge::Min => f.write_str("min"),
            ScoreMerge::Weighted { left, right } => write!(f, "weighted:{left}:{right}"),
        }
    }
}

impl TryFrom<String> for ScoreMerge {
    type Error = anyhow::Error;

    fn try_from(value: String) -> anyhow::Result<Self> {
        value.parse()
    }
}

impl From<ScoreMerge> for String {
    fn from(value: ScoreMerge) -> Self {
        value.to_string()
    }
}

impl FromStr for ScoreMerge {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> anyhow::Result<Self> {
        let lowered = input.trim().to_lowercase();
        match lowered.as_str() {
            "sum" => return Ok(ScoreMerge::Sum),
            "max" => return Ok(ScoreMerge::Max),
            "min" => return Ok(ScoreMerge::Min),
            _ => {}
        }
        if let Some(rest) = lowered.strip_prefix("weighted:")
            && let Some((left, right)) = rest.split_once(':')
        {
            let left: u64 = left
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid left weight in {input:?}"))?;
            let right: u64 = right
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid right weight in {input:?}"))?;
            return Ok(ScoreMerge::Weighted { left, right });
        }
        anyhow::bail!("unknown merge policy {input:?}; expected sum, max, min or weighted:L:R")
    }
}
