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


//! Boolean queries over single-term results.
//!
//! `java AND (python OR rust) NOT snake` parses into a [`QueryExpr`] tree.
//! Evaluation looks each distinct term up once and folds the tree with
//! [`SearchResult::and`], [`SearchResult::or`] and [`SearchResult::minus`].
//! Adjacent terms without an operator are ANDed. `OR` binds loosest; `AND`
//! and `NOT` share a level and associate left.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use anyhow::Result;
use serde_json::json;

use crate::index::Index;
use crate::merge::MergePolicy;
use crate::merge::ScoreMerge;
use crate::model::RankedEntry;
use crate::model::Scores;
use crate::output::StatsOut;
use crate::result::SearchResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    Term(String),
    And(Box<QueryExpr>, Box<QueryExpr>),
    Or(Box<QueryExpr>, Box<QueryExpr>),
    Minus(Box<QueryExpr>, Box<QueryExpr>),
}

impl QueryExpr {
    /// Distinct terms in first-seen order.
    pub fn terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryExpr::Term(term) => {
                if !out.contains(&term.as_str()) {
                    out.push(term);
                }
            }
            QueryExpr::And(l, r) | QueryExpr::Or(l, r) | QueryExpr::Minus(l, r) => {
                l.collect_terms(out);
                r.collect_terms(out);
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Term(term) => {
                let needs_quotes = term.is_empty()
                    || term.starts_with(is_quote)
                    || term.chars().any(|c| !is_word_char(c))
                    || keyword(term).is_some();
                if needs_quotes {
                    write!(f, "{term:?}")
                } else {
                    f.write_str(term)
                }
            }
            QueryExpr::And(l, r) => write!(f, "({l} AND {r})"),
            QueryExpr::Or(l, r) => write!(f, "({l} OR {r})"),
            QueryExpr::Minus(l, r) => write!(f, "({l} NOT {r})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Term(String),
    LParen,
    RParen,
    And,
    Or,
    Not,
}

pub fn parse_query(input: &str) -> Result<QueryExpr> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        anyhow::bail!("empty query");
    }
    let mut p = Parser::new(tokens);
    let expr = p.parse_or()?;
    if let Some(tok) = p.next() {
        anyhow::bail!("unexpected {} after end of query", describe(&tok));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_or(&mut self) -> Result<QueryExpr> {
        let mut left = self.parse_and()?;
        while self.peek(&Token::Or) {
            self.next();
            let right = self.parse_and()?;
            left = QueryExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<QueryExpr> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek_token() {
                Some(Token::And) => {
                    self.next();
                    let right = self.parse_unary()?;
                    left = QueryExpr::And(Box::new(left), Box::new(right));
                }
                Some(Token::Not) => {
                    self.next();
                    let right = self.parse_unary()?;
                    left = QueryExpr::Minus(Box::new(left), Box::new(right));
                }
                Some(Token::Term(_)) | Some(Token::LParen) => {
                    let right = self.parse_unary()?;
                    left = QueryExpr::And(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<QueryExpr> {
        match self.next() {
            Some(Token::Term(term)) => Ok(QueryExpr::Term(term)),
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Not) => anyhow::bail!("NOT needs a left operand, e.g. `java NOT coffee`"),
            Some(tok) => anyhow::bail!("expected term, got {}", describe(&tok)),
            None => anyhow::bail!("expected term, got end of query"),
        }
    }

    fn peek(&self, token: &Token) -> bool {
        self.tokens.get(self.pos) == Some(token)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.next() {
            Some(tok) if tok == token => Ok(()),
            Some(tok) => anyhow::bail!("expected {}, got {}", describe(&token), describe(&tok)),
            None => anyhow::bail!("expected {}, got end of query", describe(&token)),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Term(term) => format!("term {term:?}"),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Not => "NOT".to_string(),
    }
}

/// Quotes only delimit a term when they open a token; `o'reilly` is one word.
fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'')
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')')
}

fn keyword(word: &str) -> Option<Token> {
    match word.to_lowercase().as_str() {
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        _ => None,
    }
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        match ch {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
                continue;
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
                continue;
            }
            '"' | '\'' => {
                let quote = ch;
                chars.next();
                let mut buf = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        if let Some(esc) = chars.next() {
                            buf.push(esc);
                        }
                    } else {
                        buf.push(c);
                    }
                }
                if !closed {
                    anyhow::bail!("unterminated quoted term");
                }
                tokens.push(Token::Term(buf.to_lowercase()));
                continue;
            }
            _ => {}
        }
        let mut buf = String::new();
        while let Some(c) = chars.peek().copied() {
            if is_word_char(c) {
                buf.push(c);
                chars.next();
            } else {
                break;
            }
        }
        match keyword(&buf) {
            Some(kw) => tokens.push(kw),
            None => tokens.push(Token::Term(buf.to_lowercase())),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermHits {
    pub term: String,
    pub hits: usize,
}

pub struct Evaluation<M> {
    pub result: SearchResult<M>,
    pub terms: Vec<TermHits>,
}

/// Evaluates `expr` against `index`, merging overlapping scores with `merge`.
pub fn evaluate<M, I>(expr: &QueryExpr, index: &I, merge: M) -> Result<Evaluation<M>>
where
    M: MergePolicy + Clone,
    I: Index + ?Sized,
{
    let mut cache: BTreeMap<String, SearchResult<M>> = BTreeMap::new();
    let mut terms = Vec::new();
    for term in expr.terms() {
        let found = SearchResult::search_with(term, index, merge.clone())?;
        terms.push(TermHits {
            term: term.to_string(),
            hits: found.len(),
        });
        cache.insert(term.to_string(), found);
    }
    let result = fold(expr, &cache, &merge);
    Ok(Evaluation { result, terms })
}

fn fold<M: MergePolicy + Clone>(
    expr: &QueryExpr,
    cache: &BTreeMap<String, SearchResult<M>>,
    merge: &M,
) -> SearchResult<M> {
    match expr {
        QueryExpr::Term(term) => cache
            .get(term)
            .cloned()
            .unwrap_or_else(|| SearchResult::with_merge(Scores::new(), merge.clone())),
        QueryExpr::And(l, r) => fold(l, cache, merge).and(&fold(r, cache, merge)),
        QueryExpr::Or(l, r) => fold(l, cache, merge).or(&fold(r, cache, merge)),
        QueryExpr::Minus(l, r) => fold(l, cache, merge).minus(&fold(r, cache, merge)),
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub k: usize,
    pub ascending: bool,
    pub merge: ScoreMerge,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub query: String,
    pub parsed: String,
    pub merge: ScoreMerge,
    pub ranked: Vec<RankedEntry>,
    pub terms: Vec<TermHits>,
    pub stats: StatsOut,
    pub warnings: Vec<String>,
    pub limit: usize,
}

impl SearchOutcome {
    pub fn to_json_results(&self) -> Vec<serde_json::Value> {
        self.ranked
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                json!({
                    "rank": idx + 1,
                    "doc": entry.doc,
                    "score": entry.score,
                })
            })
            .collect()
    }

    pub fn explain_json(&self) -> serde_json::Value {
        json!({
            "parsed": self.parsed,
            "merge": self.merge.to_string(),
            "terms": self
                .terms
                .iter()
                .map(|t| json!({ "term": t.term, "hits": t.hits }))
                .collect::<Vec<_>>(),
        })
    }
}

pub fn run_search<I: Index + ?Sized>(
    index: &I,
    query: &str,
    opts: SearchOptions,
) -> Result<SearchOutcome> {
    let started = Instant::now();
    let expr = parse_query(query)?;
    let evaluation = evaluate(&expr, index, opts.merge)?;

    let mut warnings = Vec::new();
    for t in &evaluation.terms {
        if t.hits == 0 {
            warnings.push(format!("term {:?} matched no documents", t.term));
        }
    }

    let total_hits = evaluation.result.len();
    let mut ranked = evaluation.result.sort();
    if !opts.ascending {
        ranked.reverse();
    }
    ranked.truncate(opts.k);

    let stats = StatsOut {
        took_ms: started.elapsed().as_millis() as i64,
        total_hits: total_hits as i64,
        ..Default::default()
    };

    Ok(SearchOutcome {
        query: query.to_string(),
        parsed: expr.to_string(),
        merge: opts.merge,
        ranked,
        terms: evaluation.terms,
        stats,
        warnings,
        limit: opts.k,
    })
}

pub fn render_table(outcome: &SearchOutcome, explain: bool) -> String {
    let mut out = format!("Query: {}\n", outcome.parsed);
    if explain {
        for t in &outcome.terms {
            out.push_str(&format!("# {}: {} docs\n", t.term, t.hits));
        }
    }
    for entry in &outcome.ranked {
        out.push_str(&format!("{}\t{}\n", entry.score, entry.doc));
    }
    out
}

pub fn print_table(outcome: &SearchOutcome, explain: bool) {
    print!("{}", render_table(outcome, explain));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::merge::Sum;

    fn term(t: &str) -> Box<QueryExpr> {
        Box::new(QueryExpr::Term(t.to_string()))
    }

    fn index() -> MemoryIndex {
        let mut index = MemoryIndex::default();
        index.insert("java", "u1", 2);
        index.insert("java", "u2", 5);
        index.insert("programming", "u2", 3);
        index.insert("programming", "u3", 1);
        index.insert("coffee", "u1", 4);
        index
    }

    fn opts() -> SearchOptions {
        SearchOptions {
            k: 10,
            ascending: false,
            merge: ScoreMerge::Sum,
        }
    }

    #[test]
    fn parse_precedence() -> Result<()> {
        let q = parse_query("java OR programming AND coffee")?;
        assert_eq!(
            q,
            QueryExpr::Or(
                term("java"),
                Box::new(QueryExpr::And(term("programming"), term("coffee")))
            )
        );
        Ok(())
    }

    #[test]
    fn parse_not_and_adjacency() -> Result<()> {
        let q = parse_query("Java programming not COFFEE")?;
        assert_eq!(q.to_string(), "((java AND programming) NOT coffee)");
        let q = parse_query("java and (programming or 'hot coffee')")?;
        assert_eq!(q.to_string(), "(java AND (programming OR \"hot coffee\"))");
        assert_eq!(q.terms(), vec!["java", "programming", "hot coffee"]);
        Ok(())
    }

    #[test]
    fn apostrophes_inside_words_are_literal() -> Result<()> {
        let q = parse_query("o'reilly AND rock'n'roll")?;
        assert_eq!(
            q,
            QueryExpr::And(term("o'reilly"), term("rock'n'roll"))
        );
        assert_eq!(q.to_string(), "(o'reilly AND rock'n'roll)");

        let q = parse_query("\"it's\" OR 'say \"hi\"'")?;
        assert_eq!(q.terms(), vec!["it's", "say \"hi\""]);
        let reparsed = parse_query(&q.to_string())?;
        assert_eq!(reparsed, q);

        let leading = QueryExpr::Term("'quoted".to_string());
        assert_eq!(parse_query(&leading.to_string())?, leading);
        Ok(())
    }

    #[test]
    fn parse_errors() {
        for bad in ["", "   ", "NOT java", "java AND", "(java", "java )", "'java"] {
            assert!(parse_query(bad).is_err(), "expected error for {bad:?}");
        }
        let err = parse_query("NOT java").unwrap_err();
        assert!(err.to_string().contains("left operand"));
    }

    #[test]
    fn evaluate_matches_combinators() -> Result<()> {
        let idx = index();
        let expected: Scores = [("u2".to_string(), 8)].into_iter().collect();
        let eval = evaluate(&parse_query("java AND programming")?, &idx, Sum)?;
        assert_eq!(eval.result.scores(), &expected);

        let eval = evaluate(&parse_query("java OR programming")?, &idx, Sum)?;
        assert_eq!(eval.result.relevance("u1"), 2);
        assert_eq!(eval.result.relevance("u2"), 8);
        assert_eq!(eval.result.relevance("u3"), 1);

        let eval = evaluate(&parse_query("java NOT programming")?, &idx, Sum)?;
        assert_eq!(eval.result.len(), 1);
        assert_eq!(eval.result.relevance("u1"), 2);
        Ok(())
    }

    #[test]
    fn repeated_terms_are_looked_up_once() -> Result<()> {
        let eval = evaluate(&parse_query("java AND java")?, &index(), Sum)?;
        assert_eq!(eval.terms.len(), 1);
        assert_eq!(eval.result.relevance("u2"), 10);
        Ok(())
    }

    #[test]
    fn run_search_ranks_most_relevant_first() -> Result<()> {
        let outcome = run_search(&index(), "java OR programming", opts())?;
        let docs: Vec<&str> = outcome.ranked.iter().map(|e| e.doc.as_str()).collect();
        assert_eq!(docs, vec!["u2", "u1", "u3"]);
        assert_eq!(outcome.stats.total_hits, 3);
        assert!(outcome.warnings.is_empty());

        let asc = run_search(
            &index(),
            "java OR programming",
            SearchOptions {
                ascending: true,
                k: 2,
                ..opts()
            },
        )?;
        let docs: Vec<&str> = asc.ranked.iter().map(|e| e.doc.as_str()).collect();
        assert_eq!(docs, vec!["u3", "u1"]);
        assert_eq!(asc.stats.total_hits, 3);
        Ok(())
    }

    #[test]
    fn run_search_warns_on_unknown_terms() -> Result<()> {
        let outcome = run_search(&index(), "java OR kotlin", opts())?;
        assert_eq!(outcome.warnings, vec!["term \"kotlin\" matched no documents"]);
        assert_eq!(outcome.ranked.len(), 2);
        Ok(())
    }

    #[test]
    fn run_search_honors_merge_policy() -> Result<()> {
        let outcome = run_search(
            &index(),
            "java AND programming",
            SearchOptions {
                merge: ScoreMerge::Max,
                ..opts()
            },
        )?;
        assert_eq!(outcome.ranked, vec![RankedEntry::new("u2", 5)]);
        Ok(())
    }

    #[test]
    fn table_rendering() -> Result<()> {
        let outcome = run_search(&index(), "java programming", opts())?;
        insta::assert_snapshot!(render_table(&outcome, true), @r"
        Query: (java AND programming)
        # java: 2 docs
        # programming: 2 docs
        8	u2
        ");
        Ok(())
    }
}
