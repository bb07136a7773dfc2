use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::key::ApiKey;
use crate::rate_limit::RateLimit;

pub const DEFAULT_KEY_PREFIX: &str = "API_KEY_";

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "key-rotator")]
#[command(about = "Hands out API keys in rotation and enforces per-key usage limits")]
pub struct Args {
    // Address to bind the HTTP server on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Optional .env file read for keys (process environment wins on conflicts)
    #[arg(short, long)]
    pub env_file: Option<PathBuf>,

    // Keys are read from <prefix>1, <prefix>2, ... in numeric order
    #[arg(long, default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,

    // Default window in seconds for requests that carry no limit
    #[arg(long, requires = "max_uses")]
    pub time_window: Option<u64>,

    // Default max uses per key within --time-window
    #[arg(long, requires = "time_window")]
    pub max_uses: Option<u32>,

    // Seconds between history prunes, 0 disables
    #[arg(long, default_value_t = 60)]
    pub prune_interval: u64,

    // Usage history kept at least this many seconds, whatever windows were asked for
    #[arg(long, default_value_t = 3600)]
    pub max_window: u64,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn default_limit(&self) -> Option<RateLimit> {
        match (self.time_window, self.max_uses) {
            (Some(window), Some(max_uses)) => Some(RateLimit::per_secs(window, max_uses)),
            _ => None,
        }
    }

    pub fn prune_every(&self) -> Option<Duration> {
        (self.prune_interval > 0).then(|| Duration::from_secs(self.prune_interval))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.max_window)
    }

    pub fn key_source(&self) -> KeySource {
        KeySource {
            prefix: self.key_prefix.clone(),
            env_file: self.env_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

// Where the key list comes from, read again on every reload
#[derive(Debug, Clone)]
pub struct KeySource {
    pub prefix: String,
    pub env_file: Option<PathBuf>,
}

impl Default for KeySource {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            env_file: None,
        }
    }
}

impl KeySource {
    // Env file entries overlaid with the process environment, which is left untouched
    pub fn collect(&self) -> Result<Vec<ApiKey>, dotenvy::Error> {
        let mut vars = HashMap::new();
        if let Some(path) = &self.env_file {
            for item in dotenvy::from_path_iter(path)? {
                let (name, value) = item?;
                vars.insert(name, value);
            }
        }
        vars.extend(process_vars());

        Ok(keys_from_vars(vars, &self.prefix))
    }
}

// Environment entries that are valid unicode
fn process_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

// Values of `<prefix><n>` variables ordered by n. Gaps are fine; non-digit
// suffixes and blank values are skipped.
pub fn keys_from_vars<I>(vars: I, prefix: &str) -> Vec<ApiKey>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut numbered: Vec<(u64, String)> = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let suffix = name.strip_prefix(prefix)?;
            if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let n = suffix.parse::<u64>().ok()?;
            let value = value.trim();
            (!value.is_empty()).then(|| (n, value.to_string()))
        })
        .collect();

    numbered.sort_by_key(|(n, _)| *n);
    numbered.into_iter().map(|(_, v)| ApiKey::from(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_keys_sorted_numerically() {
        let keys = keys_from_vars(
            vars(&[
                ("API_KEY_10", "ten"),
                ("API_KEY_2", "two"),
                ("API_KEY_1", "one"),
            ]),
            "API_KEY_",
        );
        assert_eq!(keys, vec!["one", "two", "ten"]);
    }

    #[test]
    fn test_keys_skip_noise() {
        let keys = keys_from_vars(
            vars(&[
                ("API_KEY_1", "one"),
                ("API_KEY_", "bare"),
                ("API_KEY_X", "letters"),
                ("API_KEY_+3", "signed"),
                ("API_KEY_4", "   "),
                ("OTHER_KEY_2", "other"),
                ("API_KEY_7", " seven "),
            ]),
            "API_KEY_",
        );
        assert_eq!(keys, vec!["one", "seven"]);
    }

    #[test]
    fn test_custom_prefix() {
        let keys = keys_from_vars(vars(&[("OPENAI_1", "a"), ("API_KEY_1", "b")]), "OPENAI_");
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_key_source_reads_env_file() {
        let path = std::env::temp_dir().join(format!("key-rotator-test-{}.env", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "KRTEST_FILE_2=second").unwrap();
        writeln!(file, "KRTEST_FILE_1=first").unwrap();
        drop(file);

        let source = KeySource {
            prefix: "KRTEST_FILE_".to_string(),
            env_file: Some(path.clone()),
        };
        let keys = source.collect().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(keys, vec!["first", "second"]);
    }

    #[test]
    fn test_key_source_missing_file_is_error() {
        let source = KeySource {
            prefix: "KRTEST_MISSING_".to_string(),
            env_file: Some(PathBuf::from("/nonexistent/key-rotator.env")),
        };
        assert!(source.collect().is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["key-rotator"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(args.default_limit(), None);
        assert_eq!(args.prune_every(), Some(Duration::from_secs(60)));
        assert_eq!(args.retention(), Duration::from_secs(3600));
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_args_default_limit() {
        let args = Args::try_parse_from([
            "key-rotator",
            "--time-window",
            "5",
            "--max-uses",
            "2",
            "--prune-interval",
            "0",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.default_limit(), Some(RateLimit::per_secs(5, 2)));
        assert_eq!(args.prune_every(), None);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_args_max_window() {
        let args = Args::try_parse_from(["key-rotator", "--max-window", "86400"]).unwrap();
        assert_eq!(args.retention(), Duration::from_secs(86400));
    }

    #[test]
    fn test_args_limit_needs_both_parts() {
        assert!(Args::try_parse_from(["key-rotator", "--time-window", "5"]).is_err());
        assert!(Args::try_parse_from(["key-rotator", "--max-uses", "5"]).is_err());
    }
}
