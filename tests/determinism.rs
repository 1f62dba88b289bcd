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


use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

fn wikisearch_cmd(config_root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wikisearch"));
    cmd.env("XDG_CONFIG_HOME", config_root);
    cmd.env("HOME", config_root);
    cmd.env("APPDATA", config_root);
    cmd
}

fn normalize_json(mut value: Value) -> Value {
    if let Some(stats) = value.get_mut("stats")
        && let Some(obj) = stats.as_object_mut()
    {
        obj.insert("took_ms".to_string(), json!(0));
    }
    value
}

fn run_json(cmd: &mut Command, cwd: &Path) -> Value {
    let output = cmd.current_dir(cwd).output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("parse json")
}

fn assert_repeatable(config_root: &Path, args: &[&str], runs: usize, cwd: &Path) -> Value {
    let mut baseline: Option<Value> = None;
    for _ in 0..runs {
        let mut cmd = wikisearch_cmd(config_root);
        cmd.args(args);
        let json = normalize_json(run_json(&mut cmd, cwd));
        if let Some(ref expected) = baseline {
            assert_eq!(&json, expected);
        } else {
            baseline = Some(json);
        }
    }
    baseline.expect("at least one run")
}

fn docs(value: &Value) -> Vec<String> {
    value["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|item| item["doc"].as_str().expect("doc").to_string())
        .collect()
}

#[test]
fn tied_scores_rank_deterministically() {
    let config_temp = TempDir::new().expect("config tempdir");
    let config_root = config_temp.path();
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();

    let mut corpus = String::new();
    for doc in ["delta", "alpha", "echo", "charlie", "bravo"] {
        corpus.push_str(&format!(
            "{{\"term\":\"gamma\",\"doc\":\"{doc}\",\"count\":2}}\n"
        ));
    }
    corpus.push_str("{\"term\":\"gamma\",\"doc\":\"zulu\",\"count\":1}\n");
    corpus.push_str("{\"term\":\"beta\",\"doc\":\"echo\",\"count\":1}\n");
    fs::write(root.join("corpus.jsonl"), corpus).expect("write corpus");

    let mut cmd = wikisearch_cmd(config_root);
    cmd.args(["init", "."]);
    assert!(cmd.current_dir(root).output().unwrap().status.success());
    let mut cmd = wikisearch_cmd(config_root);
    cmd.args(["import", "corpus.jsonl"]);
    assert!(cmd.current_dir(root).output().unwrap().status.success());

    let asc = assert_repeatable(
        config_root,
        &["search", "gamma", "--asc", "--json"],
        20,
        root,
    );
    assert_eq!(
        docs(&asc),
        vec!["zulu", "alpha", "bravo", "charlie", "delta", "echo"]
    );

    let desc = assert_repeatable(config_root, &["search", "gamma", "--json"], 20, root);
    assert_eq!(
        docs(&desc),
        vec!["echo", "delta", "charlie", "bravo", "alpha", "zulu"]
    );

    let combined = assert_repeatable(
        config_root,
        &["search", "gamma OR beta", "--k", "3", "--json"],
        20,
        root,
    );
    assert_eq!(docs(&combined), vec!["echo", "delta", "charlie"]);
}
