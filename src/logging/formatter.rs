//! Compact single-line console output.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatFields, Writer, debug_fn};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::registry::LookupSpan;
use yansi::{Color, Paint};

/// `HH:MM:SS.mmm LEVEL target: message key=value ...`
pub struct CustomPrettyFormatter;

fn level_style(level: &Level) -> (&'static str, Color) {
    match *level {
        Level::ERROR => ("ERROR", Color::Red),
        Level::WARN => (" WARN", Color::Yellow),
        Level::INFO => (" INFO", Color::Green),
        Level::DEBUG => ("DEBUG", Color::Blue),
        Level::TRACE => ("TRACE", Color::Magenta),
    }
}

impl<S, N> FormatEvent<S, N> for CustomPrettyFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        let (label, color) = level_style(meta.level());

        if writer.has_ansi_escapes() {
            write!(
                writer,
                "{} {} {}: ",
                timestamp.dim(),
                label.fg(color).bold(),
                meta.target().dim()
            )?;
        } else {
            write!(writer, "{timestamp} {label} {}: ", meta.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Message first, then ` key=value` pairs.
pub fn compact_fields() -> impl for<'a> FormatFields<'a> + 'static {
    debug_fn(|writer, field, value| {
        if field.name() == "message" {
            write!(writer, "{value:?}")
        } else {
            write!(writer, " {field}={value:?}")
        }
    })
}
