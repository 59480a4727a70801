use std::io::{self, Write};

use chrono::Local;
use taskboard_core::{AppViewModel, Notification, NotificationKind, RunId};

/// Renders the view model as an append-only terminal transcript.
///
/// Rows already printed are never reprinted; a new run (or a reset) starts a
/// fresh logfile panel.
pub struct TerminalRenderer<W: Write> {
    out: W,
    run_id: Option<RunId>,
    header_printed: bool,
    printed_rows: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            run_id: None,
            header_printed: false,
            printed_rows: 0,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if self.run_id != Some(view.run_id) || view.rows.len() < self.printed_rows {
            self.run_id = Some(view.run_id);
            self.header_printed = false;
            self.printed_rows = 0;
        }

        if let Some(logfile) = view.logfile.as_deref().filter(|_| !self.header_printed) {
            writeln!(self.out, "Logfile")?;
            writeln!(self.out, "{logfile}")?;
            self.header_printed = true;
        }

        for row in &view.rows[self.printed_rows..] {
            writeln!(self.out, "{:>4}  {}", row.index, row.line)?;
        }
        self.printed_rows = view.rows.len();
        self.out.flush()
    }

    pub fn toast(&mut self, notification: &Notification) -> io::Result<()> {
        let label = match notification.kind {
            NotificationKind::Pending => "pending",
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
        };
        writeln!(
            self.out,
            "[{}] {label}: {}",
            Local::now().format("%H:%M:%S"),
            notification.message
        )?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
