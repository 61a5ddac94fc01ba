//! Sandboxed (Deno-style) TypeScript command builder.
//!
//! The runtime enforces capability flags and does not inherit the server
//! environment. Configured variables are delivered through an env file
//! written to the temp directory and referenced with `--env-file=`. The
//! file is deleted after a fixed grace period whether or not the process is
//! still running; the runtime only reads it during startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::command::{split_args, BuiltCommand};
use super::config::{Permissions, ScriptConfig};
use super::temp_files::TempFile;
use crate::error::RunError;

/// Ambient variables passed through so the runtime itself can start.
const PASSTHROUGH_VARS: [&str; 3] = ["PATH", "HOME", "DENO_DIR"];

/// Build the command for a `.ts` script.
///
/// `--allow-env` is always granted: without it the script could not read
/// the variables delivered through the env file.
pub async fn build(
    deno: &str,
    temp_dir: &Path,
    grace: Duration,
    script: &Path,
    config: &ScriptConfig,
) -> Result<BuiltCommand, RunError> {
    if let Some(key) = config.env.keys().find(|key| !is_valid_env_key(key)) {
        return Err(RunError::Config(format!(
            "invalid environment variable name '{}'",
            key.escape_debug()
        )));
    }
    let env_file = write_env_file(temp_dir, &config.env, grace).await?;

    let mut args = vec!["run".to_string()];
    args.extend(permission_flags(&config.permissions).into_iter().map(String::from));
    args.push(format!("--env-file={}", env_file.path.display()));
    args.push(script.to_string_lossy().into_owned());
    args.extend(split_args(&config.args));

    let env = PASSTHROUGH_VARS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect();

    Ok(BuiltCommand {
        executable: deno.to_string(),
        args,
        env,
        inherit_env: false,
        temp_files: vec![env_file],
    })
}

/// Map permission booleans to CLI flags in a fixed order.
pub fn permission_flags(permissions: &Permissions) -> Vec<&'static str> {
    let env_forced = Permissions {
        allow_env: true,
        ..*permissions
    };

    [
        (env_forced.allow_read, "--allow-read"),
        (env_forced.allow_write, "--allow-write"),
        (env_forced.allow_net, "--allow-net"),
        (env_forced.allow_env, "--allow-env"),
        (env_forced.allow_run, "--allow-run"),
        (env_forced.allow_ffi, "--allow-ffi"),
        (env_forced.allow_hrtime, "--allow-hrtime"),
    ]
    .into_iter()
    .filter_map(|(enabled, flag)| enabled.then_some(flag))
    .collect()
}

/// Render `KEY="value"` lines with `\`, newline, carriage return and `"`
/// escaped.
pub fn render_env_file(env: &BTreeMap<String, String>) -> String {
    env.iter()
        .map(|(key, value)| format!("{key}=\"{}\"\n", escape_value(value)))
        .collect()
}

/// Names must be non-empty and must not contain `=`, whitespace, quotes or
/// control characters; anything else could break the one-line-per-entry
/// format.
fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && c != '=' && c != '"')
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}

async fn write_env_file(
    temp_dir: &Path,
    env: &BTreeMap<String, String>,
    grace: Duration,
) -> Result<TempFile, RunError> {
    let path = temp_dir.join(format!("scriptsui-{}.env", uuid::Uuid::new_v4()));

    tokio::fs::write(&path, render_env_file(env))
        .await
        .map_err(|e| {
            RunError::Runtime(format!(
                "failed to write env file {}: {e}",
                path.display()
            ))
        })?;

    tracing::debug!(path = %path.display(), vars = env.len(), "Env file written");
    Ok(TempFile::new(path, grace))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn net_only_yields_net_and_forced_env() {
        let perms = Permissions {
            allow_net: true,
            ..Permissions::default()
        };
        assert_eq!(permission_flags(&perms), vec!["--allow-net", "--allow-env"]);
    }

    #[test]
    fn all_permissions_in_fixed_order() {
        let perms = Permissions {
            allow_read: true,
            allow_write: true,
            allow_net: true,
            allow_env: true,
            allow_run: true,
            allow_ffi: true,
            allow_hrtime: true,
        };
        assert_eq!(
            permission_flags(&perms),
            vec![
                "--allow-read",
                "--allow-write",
                "--allow-net",
                "--allow-env",
                "--allow-run",
                "--allow-ffi",
                "--allow-hrtime",
            ]
        );
    }

    #[test]
    fn env_values_are_escaped() {
        let env = BTreeMap::from([("A".to_string(), "x\n\"y".to_string())]);
        assert_eq!(render_env_file(&env), "A=\"x\\n\\\"y\"\n");

        let env = BTreeMap::from([("B".to_string(), "c:\\dir\r".to_string())]);
        assert_eq!(render_env_file(&env), "B=\"c:\\\\dir\\r\"\n");
    }

    #[tokio::test]
    async fn build_writes_env_file_and_references_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ScriptConfig {
            env: BTreeMap::from([("A".to_string(), "x\n\"y".to_string())]),
            args: "one two".to_string(),
            ..ScriptConfig::default()
        };

        let cmd = build(
            "deno",
            dir.path(),
            Duration::from_secs(10),
            Path::new("/srv/task.ts"),
            &config,
        )
        .await
        .expect("build");

        assert_eq!(cmd.executable, "deno");
        assert!(!cmd.inherit_env);
        assert_eq!(cmd.temp_files.len(), 1);

        let env_file = &cmd.temp_files[0];
        assert_eq!(env_file.ttl, Duration::from_secs(10));
        let contents = std::fs::read_to_string(&env_file.path).expect("read env file");
        assert!(contents.lines().any(|line| line == r#"A="x\n\"y""#));

        let env_flag = format!("--env-file={}", env_file.path.display());
        assert_eq!(
            cmd.args,
            vec![
                "run".to_string(),
                "--allow-env".to_string(),
                env_flag,
                "/srv/task.ts".to_string(),
                "one".to_string(),
                "two".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn multi_line_env_key_is_rejected_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        for key in ["A\nINJECTED", "A=B", "", "A B"] {
            let config = ScriptConfig {
                env: BTreeMap::from([(key.to_string(), "v".to_string())]),
                ..ScriptConfig::default()
            };
            let result = build(
                "deno",
                dir.path(),
                Duration::from_secs(10),
                Path::new("/srv/task.ts"),
                &config,
            )
            .await;
            assert_matches!(result, Err(RunError::Config(_)), "key {key:?}");
        }
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn ordinary_env_keys_are_accepted() {
        assert!(is_valid_env_key("API_TOKEN"));
        assert!(is_valid_env_key("lower.case-1"));
        assert!(!is_valid_env_key("TAB\tKEY"));
    }

    #[tokio::test]
    async fn only_startup_variables_are_passed_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cmd = build(
            "deno",
            dir.path(),
            Duration::from_secs(10),
            Path::new("/srv/task.ts"),
            &ScriptConfig::default(),
        )
        .await
        .expect("build");

        assert!(cmd
            .env
            .keys()
            .all(|key| PASSTHROUGH_VARS.contains(&key.as_str())));
        assert!(!cmd.env.contains_key("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn unwritable_temp_dir_is_runtime_error() {
        let result = build(
            "deno",
            Path::new("/nonexistent/scriptsui/tmp"),
            Duration::from_secs(10),
            Path::new("/srv/task.ts"),
            &ScriptConfig::default(),
        )
        .await;
        assert_matches!(result, Err(RunError::Runtime(_)));
    }
}
