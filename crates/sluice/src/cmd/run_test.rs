use super::*;
use std::str::FromStr;

// =============================================================================
// Source name
// =============================================================================

#[test]
fn test_default_source_name_from_input() {
    let path = Path::new("/var/log/app-2024.log");
    assert_eq!(default_source_name(Some(path)), "app-2024");
}

#[test]
fn test_default_source_name_stdin() {
    assert_eq!(default_source_name(None), "stdin");
}

// =============================================================================
// Run
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_run_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("orders.log");
    std::fs::write(&input, "first\n\nsecond\nhealthcheck\n").unwrap();
    let out = dir.path().join("out");

    let config = Config::from_str(&format!(
        r#"
[[sources]]
name = "orders"
source_regex = "orders"
contains_strings = ["healthcheck"]

[transport]
type = "file"
path = '{}'
"#,
        out.display()
    ))
    .unwrap();

    let args = RunArgs {
        config: dir.path().join("unused.toml"),
        input: Some(input),
        source_name: None,
    };
    run(args, &config).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "first\nsecond\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_missing_input() {
    let config = Config::from_str("[[sources]]\nname = \"app\"").unwrap();
    let args = RunArgs {
        config: PathBuf::from("unused.toml"),
        input: Some(PathBuf::from("/nonexistent/input.log")),
        source_name: None,
    };

    let err = run(args, &config).await.unwrap_err();
    assert!(err.to_string().contains("failed to open input"));
}
