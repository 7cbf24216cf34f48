//! Locating and reading `.testsmith.toml`.
//!
//! `TESTSMITH_CONFIG` names a file explicitly. Otherwise the nearest
//! `.testsmith.toml` in the working directory or one of its ancestors is used,
//! so a project config applies from any subdirectory. Last comes the user file
//! at `$XDG_CONFIG_HOME/testsmith.toml` (default `~/.config/testsmith.toml`).
//!
//! Relative `policy` and `pytest-dir` values resolve against the directory of
//! the file that set them. A file that exists but does not parse is an error:
//! silently falling back would change which tests get generated.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::debug;

use super::CliConfig;

const CONFIG_ENV: &str = "TESTSMITH_CONFIG";
const PROJECT_FILENAME: &str = ".testsmith.toml";
const USER_FILENAME: &str = "testsmith.toml";

/// Config from the first discovered file, or defaults when there is none.
pub(crate) fn load_cli_config() -> anyhow::Result<CliConfig> {
    let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let path = match explicit {
        Some(path) if !path.is_file() => {
            bail!("{} points to '{}', which is not a file", CONFIG_ENV, path.display())
        }
        Some(path) => Some(path),
        None => {
            let cwd = std::env::current_dir().context("failed to read working directory")?;
            find_project_config(&cwd).or_else(user_config)
        }
    };

    match path {
        Some(path) => read_config(&path),
        None => {
            debug!("No testsmith config found, using defaults");
            Ok(CliConfig::default())
        }
    }
}

/// Nearest `.testsmith.toml` in `start` or its ancestors.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILENAME))
        .find(|candidate| candidate.is_file())
}

fn user_config() -> Option<PathBuf> {
    let dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .or_else(|| home_dir().map(|home| home.join(".config")))?;
    Some(dir.join(USER_FILENAME)).filter(|path| path.is_file())
}

fn read_config(path: &Path) -> anyhow::Result<CliConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let config = parse_config(&contents, base)
        .with_context(|| format!("invalid config '{}'", path.display()))?;
    debug!(
        path = %path.display(),
        profile = ?config.profile,
        ai = config.ai.enabled,
        "Loaded testsmith config"
    );
    Ok(config)
}

/// Parse and validate config text whose relative paths are anchored at `base`.
fn parse_config(contents: &str, base: &Path) -> anyhow::Result<CliConfig> {
    let mut config: CliConfig = toml::from_str(contents)?;

    if config.workers == Some(0) {
        bail!("'workers' must be at least 1");
    }
    if config.profile.as_deref().is_some_and(|p| p.trim().is_empty()) {
        bail!("'profile' must not be empty");
    }
    if config.ai.concurrency == Some(0) {
        bail!("'ai.concurrency' must be at least 1");
    }
    config.ai.categories()?;

    config.policy = config.policy.map(|p| anchor(&p, base));
    config.pytest_dir = config.pytest_dir.map(|p| anchor(&p, base));
    Ok(config)
}

fn anchor(path: &Path, base: &Path) -> PathBuf {
    let expanded = path
        .to_str()
        .map(expand_path)
        .unwrap_or_else(|| path.to_path_buf());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Resolve a leading `~/` to the home directory.
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testsmith_core::policy::Category;

    use super::*;

    #[test]
    fn test_project_config_found_from_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("services/orders/api");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join(PROJECT_FILENAME), "profile = \"quick\"\n").unwrap();

        let found = find_project_config(&nested).unwrap();
        assert_eq!(found, root.path().join(PROJECT_FILENAME));
    }

    #[test]
    fn test_nearest_project_config_wins() {
        let root = tempfile::tempdir().unwrap();
        let service = root.path().join("orders");
        fs::create_dir_all(&service).unwrap();
        fs::write(root.path().join(PROJECT_FILENAME), "").unwrap();
        fs::write(service.join(PROJECT_FILENAME), "").unwrap();

        assert_eq!(
            find_project_config(&service).unwrap(),
            service.join(PROJECT_FILENAME)
        );
    }

    #[test]
    fn test_relative_paths_anchor_at_config_dir() {
        let config = parse_config(
            "policy = \"policies/api.toml\"\npytest-dir = \"/srv/generated\"\n",
            Path::new("/work/orders"),
        )
        .unwrap();
        assert_eq!(config.policy, Some(PathBuf::from("/work/orders/policies/api.toml")));
        assert_eq!(config.pytest_dir, Some(PathBuf::from("/srv/generated")));
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/policies/api.toml");
        assert!(expanded.ends_with("policies/api.toml"));
        assert!(!expanded.to_str().unwrap().starts_with('~'));
        assert_eq!(expand_path("./policy.json"), PathBuf::from("./policy.json"));
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.policy.is_none());
        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(!config.ai.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
policy = "/etc/testsmith/policy.toml"
profile = "security"
pytest-dir = "generated"
workers = 4

[ai]
enabled = true
model = "llama-3.1-8b-instant"
timeout-secs = 10
categories = ["functional", "security"]
"#;
        let config = parse_config(toml_str, Path::new("/work")).unwrap();
        assert_eq!(config.profile.as_deref(), Some("security"));
        assert_eq!(config.pytest_dir, Some(PathBuf::from("/work/generated")));
        assert_eq!(config.workers, Some(4));
        assert!(config.ai.enabled);
        assert_eq!(
            config.ai.categories().unwrap(),
            vec![Category::Functional, Category::Security]
        );

        let http = config.ai.http_config();
        assert_eq!(http.model, "llama-3.1-8b-instant");
        assert_eq!(http.timeout_secs, 10);
        assert_eq!(http.api_key_env, "GROQ_API_KEY");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = Path::new("/work");
        let err = parse_config("workers = 0\n", base).unwrap_err();
        assert!(err.to_string().contains("workers"));

        let err = parse_config("[ai]\ncategories = [\"usability\"]\n", base).unwrap_err();
        assert!(err.to_string().contains("usability"));

        assert!(parse_config("profile = \"\"\n", base).is_err());
        assert!(parse_config("workers = \"many\"\n", base).is_err());
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILENAME);
        fs::write(&path, "profile = [unterminated\n").unwrap();

        let err = read_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains(PROJECT_FILENAME));
    }
}
