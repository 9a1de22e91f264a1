//! Reading the names list and persisting results.

use std::path::Path;

use tokio::fs::{self, OpenOptions};

use crate::error::SetupError;
use crate::results::{CombinedResult, encode};

/// Read newline-separated names from `path`.
pub async fn load_names(path: &Path) -> Result<Vec<String>, SetupError> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|source| SetupError::ReadNames {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(parse_names(&contents))
}

/// Split `contents` into names. Surrounding whitespace is trimmed and blank
/// lines are skipped; duplicates and order are kept.
pub fn parse_names(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fail early if the results file cannot be opened for writing. Existing
/// contents are left alone until [`write_results`] replaces them.
pub async fn ensure_writable(path: &Path) -> Result<(), SetupError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map(drop)
        .map_err(|source| SetupError::WriteResults {
            path: path.to_path_buf(),
            source,
        })
}

/// Encode `results` and write them to `path` in one step.
pub async fn write_results(path: &Path, results: &[CombinedResult]) -> Result<(), SetupError> {
    let encoded = encode(results)?;
    fs::write(path, encoded)
        .await
        .map_err(|source| SetupError::WriteResults {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PathOutcome;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("block-tester-{}-{}", std::process::id(), name))
    }

    #[test]
    fn parse_names_skips_blank_lines_and_keeps_duplicates() {
        let names = parse_names("example.com\n\n  torproject.org \r\nexample.com\n");

        assert_eq!(names, ["example.com", "torproject.org", "example.com"]);
    }

    #[test]
    fn parse_names_of_empty_file() {
        assert!(parse_names("").is_empty());
        assert!(parse_names("\n\n").is_empty());
    }

    #[tokio::test]
    async fn load_names_reports_missing_file() {
        let err = load_names(&scratch_path("does-not-exist")).await.unwrap_err();

        assert!(matches!(err, SetupError::ReadNames { .. }));
    }

    #[tokio::test]
    async fn write_results_replaces_file_contents() {
        let path = scratch_path("results.json");
        fs::write(&path, "stale contents that are longer than the result")
            .await
            .unwrap();

        ensure_writable(&path).await.unwrap();
        write_results(
            &path,
            &[CombinedResult {
                name: "example.com".to_string(),
                plain: PathOutcome::failed("no addresses found"),
                tor: PathOutcome::failed("no addresses found"),
            }],
        )
        .await
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(written[0]["Name"], "example.com");
        assert_eq!(written.as_array().unwrap().len(), 1);

        fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_writable_rejects_missing_directory() {
        let path = scratch_path("missing-dir").join("results.json");

        let err = ensure_writable(&path).await.unwrap_err();

        assert!(matches!(err, SetupError::WriteResults { .. }));
    }
}
