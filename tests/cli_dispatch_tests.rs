//! CLI dispatch: exit codes and file handling for each subcommand.

use std::fs;
use std::path::PathBuf;

use serde_json::json;

fn args(parts: &[&str]) -> Vec<String> {
    std::iter::once("mendel")
        .chain(parts.iter().copied())
        .map(String::from)
        .collect()
}

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("mendel-cli-test-{}-{name}", std::process::id()));
    fs::write(&path, contents).expect("write temp file");
    path
}

fn catalog_json() -> String {
    json!({
        "berry": { "name": "Berry", "size": "1x1", "tier": 2,
                   "conditions": { "wheat": 1 } },
        "oak": { "name": "Oak", "size": "2x2", "conditions": {} }
    })
    .to_string()
}

#[test]
fn unknown_command_prints_usage_and_exits_2() {
    assert_eq!(mendel::cli::run_with_args(&args(&[])), 2);
    assert_eq!(mendel::cli::run_with_args(&args(&["serve"])), 2);
}

#[test]
fn optimize_requires_both_file_arguments() {
    assert_eq!(mendel::cli::run_with_args(&args(&["optimize"])), 2);
    let catalog = write_temp("cat-only.json", &catalog_json());
    assert_eq!(
        mendel::cli::run_with_args(&args(&["optimize", catalog.to_str().unwrap()])),
        2
    );
}

#[test]
fn optimize_runs_end_to_end_from_files() {
    let catalog = write_temp("cat.json", &catalog_json());
    let workload = write_temp("work.json", &json!({ "berry": 2 }).to_string());
    let code = mendel::cli::run_with_args(&args(&[
        "optimize",
        catalog.to_str().unwrap(),
        workload.to_str().unwrap(),
        "--seed",
        "7",
    ]));
    assert_eq!(code, 0);
}

#[test]
fn optimize_rejects_negative_quantities() {
    let catalog = write_temp("cat-neg.json", &catalog_json());
    let workload = write_temp("work-neg.json", &json!({ "berry": -1 }).to_string());
    let code = mendel::cli::run_with_args(&args(&[
        "optimize",
        catalog.to_str().unwrap(),
        workload.to_str().unwrap(),
    ]));
    assert_eq!(code, 1);
}

#[test]
fn optimize_rejects_missing_files() {
    let code = mendel::cli::run_with_args(&args(&[
        "optimize",
        "/nonexistent/catalog.json",
        "/nonexistent/workload.json",
    ]));
    assert_eq!(code, 1);
}

#[test]
fn validate_flags_broken_catalogs() {
    let good = write_temp("cat-good.json", &catalog_json());
    assert_eq!(
        mendel::cli::run_with_args(&args(&["validate", good.to_str().unwrap()])),
        0
    );

    let broken = write_temp(
        "cat-broken.json",
        &json!({
            "bad": { "name": "Bad", "size": "9x9", "conditions": {} }
        })
        .to_string(),
    );
    assert_eq!(
        mendel::cli::run_with_args(&args(&["validate", broken.to_str().unwrap()])),
        1
    );
}

#[test]
fn describe_resolves_by_display_name() {
    let catalog = write_temp("cat-desc.json", &catalog_json());
    assert_eq!(
        mendel::cli::run_with_args(&args(&["describe", catalog.to_str().unwrap(), "Berry"])),
        0
    );
    assert_eq!(
        mendel::cli::run_with_args(&args(&["describe", catalog.to_str().unwrap(), "nothing"])),
        1
    );
}

#[test]
fn objective_runs_from_files() {
    let catalog = write_temp("cat-obj.json", &catalog_json());
    let allowed = write_temp("allowed.json", &json!(["berry"]).to_string());
    let code = mendel::cli::run_with_args(&args(&[
        "objective",
        catalog.to_str().unwrap(),
        allowed.to_str().unwrap(),
        "--preset",
        "quick",
        "--seed",
        "3",
    ]));
    assert_eq!(code, 0);
}
