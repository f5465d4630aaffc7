//! `.env` support: `--env-file <path>` on the command line, else `./.env` when present.
//!
//! Values already set in the process environment are never overwritten.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Pick the env file from `args` (program name already skipped) and load it.
pub fn load_from_args<I>(args: I) -> Result<Option<LoadedEnvFile>, String>
where
    I: IntoIterator<Item = OsString>,
{
    match env_file_arg(args)? {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            apply(&path)?;
            Ok(Some(LoadedEnvFile { path, explicit: true }))
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let path = cwd.join(".env");
            if !path.is_file() {
                return Ok(None);
            }
            apply(&path)?;
            Ok(Some(LoadedEnvFile { path, explicit: false }))
        }
    }
}

fn env_file_arg<I>(args: I) -> Result<Option<PathBuf>, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut found: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        let arg = arg
            .into_string()
            .map_err(|_| "argument contains invalid UTF-8".to_string())?;
        let value = if arg == "--" {
            break;
        } else if arg == "--env-file" {
            args.next()
                .and_then(|v| v.into_string().ok())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| "`--env-file` requires a path argument".to_string())?
        } else if let Some(v) = arg.strip_prefix("--env-file=") {
            if v.is_empty() {
                return Err("`--env-file` requires a path argument".to_string());
            }
            v.to_string()
        } else {
            return Err(format!("unrecognised argument: {}", arg));
        };

        if found.replace(PathBuf::from(value)).is_some() {
            return Err("`--env-file` provided more than once".to_string());
        }
    }

    Ok(found)
}

fn apply(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    for (index, line) in contents.lines().enumerate() {
        let parsed = parse_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?;
        if let Some((key, value)) = parsed
            && std::env::var_os(&key).is_none()
        {
            // Single-threaded at this point: logging and the poll loop start afterwards.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

/// Parse one `KEY=value` line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let (key, raw) = line.split_once('=').ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.contains(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    Ok(Some((key.to_string(), parse_value(raw.trim())?)))
}

fn parse_value(raw: &str) -> Result<String, String> {
    match raw.chars().next() {
        Some(q @ ('"' | '\'')) => parse_quoted(&raw[1..], q),
        // unquoted: an inline comment ends the value
        _ => Ok(raw.split('#').next().unwrap_or_default().trim_end().to_string()),
    }
}

/// Double quotes honour `\n`, `\r`, `\t`, `\\` and `\"`; single quotes are literal.
fn parse_quoted(body: &str, quote: char) -> Result<String, String> {
    let mut out = String::new();
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch == quote {
            let rest = chars.as_str().trim();
            return if rest.is_empty() || rest.starts_with('#') {
                Ok(out)
            } else {
                Err("unexpected characters after closing quote".to_string())
            };
        }
        if ch == '\\' && quote == '"' {
            let escaped = chars
                .next()
                .ok_or_else(|| "unterminated escape sequence in double-quoted value".to_string())?;
            out.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
            continue;
        }
        out.push(ch);
    }

    Err("unterminated quoted value".to_string())
}
