use clap::{Parser, ValueEnum};

/// Watch the course-selection system for open seats.
///
/// Any of the positional arguments left out are asked for interactively.
#[derive(Parser, custom_debug_derive::Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Portal username
    pub username: Option<String>,

    /// Portal password (prompted without echo when omitted)
    #[debug(with = "crate::fmt::redacted")]
    pub password: Option<String>,

    /// Course codes to watch
    pub courses: Vec<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Colored, human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}
