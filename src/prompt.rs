//! Filling in run inputs that were not given on the command line.

use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};

use crate::cli::Args;
use crate::portal::{Credentials, TargetCourseSet};

/// Print `label` and read one trimmed line.
fn prompt_line<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, label: &str) -> Result<String> {
    write!(writer, "{label}")?;
    writer.flush()?;
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {}", label.trim_end_matches([':', ' '])))?;
    Ok(line.trim().to_string())
}

fn resolve_inputs<R, W, P>(
    args: Args,
    reader: &mut R,
    writer: &mut W,
    read_password: P,
) -> Result<(Credentials, TargetCourseSet)>
where
    R: BufRead,
    W: Write,
    P: FnOnce() -> io::Result<String>,
{
    let username = match args.username {
        Some(username) => username,
        None => prompt_line(reader, writer, "Username: ")?,
    };
    if username.is_empty() {
        bail!("Username must not be empty");
    }

    let password = match args.password {
        Some(password) => password,
        None => read_password().context("Failed to read password")?,
    };

    let targets: TargetCourseSet = if args.courses.is_empty() {
        prompt_line(reader, writer, "Course codes: ")?
            .split_whitespace()
            .map(str::to_string)
            .collect()
    } else {
        args.courses.into_iter().collect()
    };
    if targets.is_empty() {
        bail!("At least one course code is required");
    }

    Ok((Credentials { username, password }, targets))
}

/// Take inputs from `args`, prompting on the terminal for anything missing.
/// The password prompt does not echo.
pub fn collect_inputs(args: Args) -> Result<(Credentials, TargetCourseSet)> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    resolve_inputs(args, &mut reader, &mut writer, || {
        rpassword::prompt_password("Password: ")
    })
}
