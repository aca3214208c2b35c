use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::KiraError;

/// Runs `program` to completion, logging its output line by line.
///
/// Blocks until the process exits; there is no timeout.
pub fn run_cmd(
    engine: &str,
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    verbose: bool,
) -> Result<(), KiraError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    tracing::debug!(engine, command = %format_command(program, args), "starting engine");
    let output = cmd.output().map_err(|err| KiraError::EngineFailed {
        engine: engine.to_string(),
        message: format!("{}: {err}", program.display()),
    })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if verbose {
            tracing::info!(engine, "{line}");
        } else {
            tracing::debug!(engine, "{line}");
        }
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    for line in stderr.lines() {
        tracing::warn!(engine, "{line}");
    }

    if output.status.success() {
        return Ok(());
    }
    let message = if stderr.is_empty() {
        format!("command failed ({}): {}", output.status, program.display())
    } else {
        stderr
    };
    Err(KiraError::EngineFailed {
        engine: engine.to_string(),
        message,
    })
}

pub fn format_command(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

/// Explicit executable path if it exists, otherwise a `PATH` lookup for bare
/// command names.
pub fn locate_executable(candidate: &Path) -> Option<PathBuf> {
    if candidate.exists() {
        return Some(candidate.to_path_buf());
    }
    if candidate.components().count() == 1 {
        return find_in_path(&candidate.to_string_lossy());
    }
    None
}

pub fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

/// Every file below `root` whose name satisfies `matches`, sorted.
pub fn find_files<F>(root: &Path, matches: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        if let Ok(entries) = fs::read_dir(&path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path
                    .file_name()
                    .and_then(|value| value.to_str())
                    .map(&matches)
                    .unwrap_or(false)
                {
                    out.push(path);
                }
            }
        }
    }
    out.sort();
    out
}
