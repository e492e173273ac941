//! Show command for the ranked focus time visualization.
//!
//! The terminal renderer is ready as soon as it opens, so it uses the
//! acknowledged delivery path and receives the data once. `--json` acts as a
//! bridge to a host UI that cannot acknowledge: the `commitData` message is
//! written immediately and again after the configured delay.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use curve_core::{
    AccumulatedTime, CommitData, DeliveryMode, DurableStore, RECORD_KEY, RendererMessage,
    ReportDelivery,
};
use curve_db::Database;

use crate::Config;

/// Something that can display a [`CommitData`] message.
pub trait Renderer {
    /// Opens the view. Returns `Ready` if the renderer can receive data now.
    fn open(&mut self) -> Option<RendererMessage>;

    fn receive(&mut self, message: &CommitData) -> Result<()>;
}

/// Draws a ranked bar chart to a writer.
pub struct TerminalRenderer<W: Write> {
    writer: W,
    top: Option<usize>,
}

impl<W: Write> TerminalRenderer<W> {
    pub const fn new(writer: W, top: Option<usize>) -> Self {
        Self { writer, top }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn open(&mut self) -> Option<RendererMessage> {
        Some(RendererMessage::Ready)
    }

    fn receive(&mut self, message: &CommitData) -> Result<()> {
        let chart = format_chart(&message.data, self.top);
        self.writer.write_all(chart.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Runs the show command.
pub fn run(db: &Database, config: &Config, json: bool, top: usize) -> Result<()> {
    let data = load_snapshot(db)?;

    if json {
        let stdout = std::io::stdout();
        emit_messages(&mut stdout.lock(), data, config.resend_delay())
    } else {
        let stdout = std::io::stdout();
        let mut renderer = TerminalRenderer::new(stdout.lock(), Some(top));
        deliver(&mut renderer, data)
    }
}

/// Reads the committed snapshot. A missing record is an empty mapping.
pub fn load_snapshot(db: &Database) -> Result<AccumulatedTime> {
    Ok(db
        .get(RECORD_KEY)
        .context("failed to read accumulated time")?
        .unwrap_or_default())
}

/// Delivers `data` to a renderer that can acknowledge readiness.
pub fn deliver<R: Renderer>(renderer: &mut R, data: AccumulatedTime) -> Result<()> {
    let mut delivery = ReportDelivery::new(data, DeliveryMode::Acknowledged);
    if let Some(message) = delivery.on_open() {
        renderer.receive(message)?;
    }
    if let Some(ready) = renderer.open() {
        if let Some(message) = delivery.on_renderer_message(ready) {
            renderer.receive(message)?;
        }
    }
    if delivery.sends() == 0 {
        tracing::warn!("renderer never became ready, nothing shown");
    }
    Ok(())
}

/// Writes the `commitData` message now and once more after `delay`.
pub fn emit_messages<W: Write>(
    writer: &mut W,
    data: AccumulatedTime,
    delay: std::time::Duration,
) -> Result<()> {
    let mut delivery = ReportDelivery::new(data, DeliveryMode::DelayedResend { delay });

    if let Some(message) = delivery.on_open() {
        write_message(writer, message)?;
    }
    if let Some(delay) = delivery.resend_delay() {
        std::thread::sleep(delay);
    }
    if let Some(message) = delivery.on_resend_timer() {
        write_message(writer, message)?;
    }
    Ok(())
}

fn write_message<W: Write>(writer: &mut W, message: &CommitData) -> Result<()> {
    serde_json::to_writer(&mut *writer, message).context("failed to serialize commit data")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

// ========== Formatting ==========

/// Rounds milliseconds to the nearest whole minute.
const fn rounded_minutes(ms: u64) -> u64 {
    ms.saturating_add(30_000) / 60_000
}

/// Formats milliseconds as "Xh Ym" if >= 1 hour, "Xm" otherwise.
pub fn format_duration(ms: u64) -> String {
    format_minutes(rounded_minutes(ms))
}

/// Total shown for `data`: the sum of each file's displayed minutes, so the
/// header always agrees with the rows below it.
pub fn displayed_total(data: &AccumulatedTime) -> String {
    let minutes = data
        .iter()
        .fold(0, |acc: u64, (_, ms)| acc.saturating_add(rounded_minutes(ms)));
    format_minutes(minutes)
}

fn format_minutes(total_minutes: u64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Generates a 10-character progress bar.
/// Non-zero values under 5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: u64, max: u64) -> String {
    if max == 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Formats the ranked chart for `data`, optionally limited to the top N files.
pub fn format_chart(data: &AccumulatedTime, top: Option<usize>) -> String {
    let mut output = String::new();
    writeln!(output, "COMMIT CURVE").unwrap();
    writeln!(output).unwrap();

    if data.is_empty() {
        writeln!(output, "No focus time recorded yet.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: pipe editor focus events into 'curve track'.").unwrap();
        return output;
    }

    let ranked = data.ranked();
    let max = ranked.first().map_or(0, |(_, ms)| *ms);

    writeln!(output, "Total time:    {}", displayed_total(data)).unwrap();
    writeln!(output, "Files tracked: {}", data.len()).unwrap();
    if let Some((file, _)) = ranked.first() {
        writeln!(output, "Most focused:  {}", file.display_name()).unwrap();
    }

    let shown: Vec<_> = ranked
        .into_iter()
        .take(top.unwrap_or(usize::MAX))
        .collect();
    let name_width = shown
        .iter()
        .map(|(file, _)| file.display_name().chars().count())
        .max()
        .unwrap_or(0);

    writeln!(output).unwrap();
    writeln!(output, "FILES").unwrap();
    writeln!(output, "─────").unwrap();
    for (file, ms) in &shown {
        writeln!(
            output,
            "{:<name_width$}  {:>7}  {}",
            file.display_name(),
            format_duration(*ms),
            progress_bar(*ms, max),
        )
        .unwrap();
    }

    let hidden = data.len() - shown.len();
    if hidden > 0 {
        writeln!(output, "... and {hidden} more").unwrap();
    }

    output
}
