use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;

/// Variables whose values never reach the log.
const SECRET_KEYS: &[&str] = &["HF_API_TOKEN"];

pub fn load_env() {
    let Some(path) = [".env", ".env.local", "../.env"]
        .into_iter()
        .find(|p| Path::new(p).exists())
    else {
        info!("No .env file found, using environment variables from system");
        return;
    };
    match load_env_from_file(path) {
        Ok(applied) => info!("Loaded {} environment variables from {}", applied, path),
        Err(e) => warn!("Failed to load environment from {}: {:#}", path, e),
    }
}

/// Parses one `KEY=value` line. Comments and blank lines yield `None`.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.starts_with('#') || trimmed.is_empty() {
        return None;
    }
    let idx = trimmed.find('=')?;
    let key = trimmed[..idx].trim();
    if key.is_empty() {
        return None;
    }
    let value = trimmed[idx + 1..].trim().trim_matches('"');
    Some((key, value))
}

fn load_env_from_file(file_path: &str) -> Result<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open(file_path).with_context(|| format!("Failed to open env file {}", file_path))?;
    let mut applied = 0;
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read line from env file")?;
        let Some((key, value)) = parse_env_line(&line) else {
            continue;
        };
        if std::env::var(key).is_err() {
            std::env::set_var(key, value);
            applied += 1;
            debug!(
                "Set env var from file: {} = {}",
                key,
                if SECRET_KEYS.contains(&key) { "[hidden]" } else { value }
            );
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_values_and_skips_comments() {
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("   "), None);
        assert_eq!(
            parse_env_line("SENTIMENT_MODEL=\"lexicon-en-v1\""),
            Some(("SENTIMENT_MODEL", "lexicon-en-v1"))
        );
        assert_eq!(
            parse_env_line(" DASHBOARD_PORT = 9000 "),
            Some(("DASHBOARD_PORT", "9000"))
        );
        assert_eq!(parse_env_line("=orphan"), None);
        assert_eq!(parse_env_line("NO_EQUALS"), None);
    }

    #[test]
    fn env_file_sets_only_unset_variables() {
        let path = std::env::temp_dir().join(format!("review_sentiment_env_{}", std::process::id()));
        std::fs::write(
            &path,
            "# local overrides\nREVIEW_SENTIMENT_ENV_TEST_A=from-file\nPATH=/nowhere\n",
        )
        .unwrap();
        let applied = load_env_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(std::env::var("REVIEW_SENTIMENT_ENV_TEST_A").unwrap(), "from-file");
        assert_ne!(std::env::var("PATH").unwrap(), "/nowhere");
        let _ = std::fs::remove_file(&path);

        assert!(load_env_from_file("/definitely/not/here/.env").is_err());
    }
}
