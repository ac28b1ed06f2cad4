//! Snapshot tests for CLI output using insta.
//!
//! These tests capture compiled output and error messages as inline
//! snapshots, making it easy to review changes to user-facing output.
//!
//! To update snapshots after intentional changes:
//! ```bash
//! cargo insta test --accept
//! ```

#[allow(dead_code)]
mod common;
use common::prelude::*;

/// Strip trailing whitespace from each line
fn normalize_output(output: &[u8]) -> String {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_compiled_releases_snapshot() {
    let output = compile_cmd()
        .write_stdin(packages::both())
        .output()
        .expect("Failed to execute command");

    insta::assert_snapshot!(normalize_output(&output.stdout), @r###"
    {"tag":["compiled"],"id":"ocds-1-2001-02-05T00:00:00Z","date":"2001-02-05T00:00:00Z","ocid":"ocds-1","tender":{"id":"t1","title":"Pens","status":"complete","documents":[{"id":"d1","title":"Notice"}]}}
    {"tag":["compiled"],"id":"ocds-2-2001-02-04T00:00:00Z","date":"2001-02-04T00:00:00Z","ocid":"ocds-2","buyer":{"name":"Ministerio de Economía"}}
    "###);
}

#[test]
fn test_versioned_release_pretty_ascii_snapshot() {
    let output = compile_cmd()
        .args(["--versioned", "--pretty", "--ascii"])
        .write_stdin(packages::FIRST)
        .output()
        .expect("Failed to execute command");

    let stdout = normalize_output(&output.stdout);
    let second = stdout
        .split_inclusive("\n}")
        .nth(1)
        .expect("two documents")
        .trim_start();

    insta::assert_snapshot!(second, @r###"
    {
      "ocid": "ocds-2",
      "buyer": {
        "name": [
          {
            "releaseID": "ocds-2-01",
            "releaseDate": "2001-02-04T00:00:00Z",
            "releaseTag": [
              "planning"
            ],
            "value": "Ministerio de Econom\u00eda"
          }
        ]
      }
    }
    "###);
}

#[test]
fn test_linked_record_package_snapshot() {
    let output = compile_cmd()
        .args(["--package", "--linked-releases", "--fake"])
        .write_stdin(packages::MINIMAL)
        .output()
        .expect("Failed to execute command");

    insta::assert_snapshot!(normalize_output(&output.stdout), @r###"{"uri":"placeholder:","publisher":{},"publishedDate":"9999-01-01T00:00:00Z","version":"1.0","packages":[],"records":[{"ocid":"x","releases":[{"url":"#x-01","date":"2001-02-03T00:00:00Z","tag":["planning"]}],"compiledRelease":{"tag":["compiled"],"id":"x-2001-02-03T00:00:00Z","date":"2001-02-03T00:00:00Z","ocid":"x"}}]}"###);
}

#[test]
fn test_version_mismatch_error_snapshot() {
    let output = compile_cmd()
        .args(["--package", "--versioned"])
        .write_stdin(packages::both() + packages::VERSION_1_0)
        .output()
        .expect("Failed to execute command");

    assert!(output.stdout.is_empty());
    insta::assert_snapshot!(normalize_output(&output.stderr), @r###"
    Error: item 3: version error: this package uses version 1.0, but earlier packages used version 1.1
    Try first upgrading packages to the same version:
      cat file [file ...] | ocds-toolkit upgrade 1.0:1.1 | ocds-toolkit compile --package --versioned
    "###);
}

#[test]
fn test_invalid_json_error_snapshot() {
    let output = compile_cmd()
        .write_stdin(format!("{}\n{{\n", packages::MINIMAL))
        .output()
        .expect("Failed to execute command");

    assert!(output.stdout.is_empty());
    insta::assert_snapshot!(
        normalize_output(&output.stderr),
        @"Error: JSON error: EOF while parsing an object at line 3 column 0"
    );
}

#[test]
fn test_version_snapshot() {
    let mut cmd = cargo_bin_cmd!("ocds-toolkit");
    let output = cmd
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let re = regex::Regex::new(r"ocds-toolkit \d+\.\d+\.\d+").unwrap();
    let stdout = normalize_output(&output.stdout);
    insta::assert_snapshot!(re.replace_all(&stdout, "ocds-toolkit [VERSION]"), @"ocds-toolkit [VERSION]");
}
