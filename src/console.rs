//! Line-oriented annotation console.
//!
//! Drives an [`AnnotationSession`] from any `BufRead`/`Write` pair: the CLI
//! wires it to stdin/stdout, tests to in-memory buffers. Label edits are held
//! as pending until `apply`. The frame is committed (every presented row
//! reconciled, pending edits overlaid) on `apply`, before the cursor moves and
//! before an export is written.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use miette::Diagnostic;

use crate::error::ReidError;
use crate::reconcile::RowEdit;
use crate::record::BodyId;
use crate::session::AnnotationSession;
use crate::suggest::{FrameSuggestion, LabelSource};

const HELP: &str = "\
commands:
  show                 redisplay the current frame
  next | n             commit this frame, go to the next frame
  prev | p             commit this frame, go to the previous frame
  goto <N>             commit this frame, go to frame position N (1-based)
  set <BodyID> <Name>  label a body (name must be in the catalog)
  clear <BodyID>       mark a body as not a person of interest
  apply                commit this frame with pending edits
  export [path]        commit this frame and write the labelled CSV
  ledger               print the identity ledger as JSON
  help                 show this text
  quit | q             leave the console";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Next,
    Prev,
    Goto(usize),
    Set { body_id: BodyId, name: String },
    Clear(BodyId),
    Apply,
    Export(Option<PathBuf>),
    Ledger,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Empty lines parse as `Show`.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        let body = |s: &str| {
            s.parse::<i64>()
                .map(BodyId)
                .map_err(|_| format!("\"{s}\" is not a BodyID"))
        };

        match word {
            "" | "show" | "s" => Ok(Command::Show),
            "next" | "n" => Ok(Command::Next),
            "prev" | "p" => Ok(Command::Prev),
            "goto" | "g" => {
                let n = rest
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| format!("goto expects a frame position >= 1, got \"{rest}\""))?;
                Ok(Command::Goto(n))
            }
            "set" => {
                let (id, name) = rest
                    .split_once(char::is_whitespace)
                    .ok_or("usage: set <BodyID> <Name>")?;
                Ok(Command::Set {
                    body_id: body(id)?,
                    name: name.trim().to_string(),
                })
            }
            "clear" => Ok(Command::Clear(body(rest)?)),
            "apply" | "a" => Ok(Command::Apply),
            "export" => Ok(Command::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "ledger" => Ok(Command::Ledger),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command \"{other}\" (try `help`)")),
        }
    }
}

/// Interactive front end over one session.
pub struct Console<'a> {
    session: &'a mut AnnotationSession,
    output: PathBuf,
    delimiter: u8,
    pending: Vec<RowEdit>,
}

impl<'a> Console<'a> {
    pub fn new(session: &'a mut AnnotationSession, output: PathBuf, delimiter: u8) -> Self {
        Self {
            session,
            output,
            delimiter,
            pending: Vec::new(),
        }
    }

    /// Edits not yet merged into the ledger.
    pub fn pending(&self) -> &[RowEdit] {
        &self.pending
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        self.show(&mut out)?;
        for line in input.lines() {
            let line = line?;
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => self.execute(cmd, &mut out)?,
                Err(msg) => writeln!(out, "error: {msg}")?,
            }
        }
        if !self.pending.is_empty() {
            writeln!(out, "discarding {} pending edit(s)", self.pending.len())?;
        }
        Ok(())
    }

    /// Execute one command, reporting failures to `out`.
    pub fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<()> {
        match cmd {
            Command::Show => self.show(out),
            Command::Next => self.navigate(out, |s| {
                s.next();
            }),
            Command::Prev => self.navigate(out, |s| {
                s.prev();
            }),
            Command::Goto(n) => self.navigate(out, |s| {
                s.seek(n - 1);
            }),
            Command::Set { body_id, name } => {
                self.stage(RowEdit::label(body_id, name));
                writeln!(out, "pending: {} edit(s)", self.pending.len())
            }
            Command::Clear(body_id) => {
                self.stage(RowEdit::clear(body_id));
                writeln!(out, "pending: {} edit(s)", self.pending.len())
            }
            Command::Apply => {
                if self.apply(out)? {
                    self.show(out)?;
                }
                Ok(())
            }
            Command::Export(path) => {
                if !self.apply(out)? {
                    return Ok(());
                }
                let path = path.unwrap_or_else(|| self.output.clone());
                let delimiter = self.delimiter;
                let result = self.session.export_all().and_then(|table| {
                    table.write_to_path(&path, delimiter)?;
                    Ok(table.len())
                });
                match result {
                    Ok(rows) => writeln!(out, "exported {rows} row(s) to {}", path.display()),
                    Err(err) => report(out, &err),
                }
            }
            Command::Ledger => {
                let json = serde_json::to_string_pretty(self.session.ledger())
                    .map_err(io::Error::other)?;
                writeln!(out, "{json}")
            }
            Command::Help => writeln!(out, "{HELP}"),
            Command::Quit => Ok(()),
        }
    }

    fn stage(&mut self, edit: RowEdit) {
        self.pending.retain(|e| e.body_id != edit.body_id);
        self.pending.push(edit);
    }

    /// Commit the current frame with pending edits overlaid on the presented
    /// rows. Returns false (and keeps the edits) if they were rejected.
    fn apply<W: Write>(&mut self, out: &mut W) -> io::Result<bool> {
        match self.session.commit_current(&self.pending) {
            Ok(summary) => {
                if !self.pending.is_empty() {
                    writeln!(
                        out,
                        "applied: {} named, {} cleared",
                        summary.named, summary.cleared
                    )?;
                }
                self.pending.clear();
                Ok(true)
            }
            Err(err) => {
                report(out, &err)?;
                Ok(false)
            }
        }
    }

    fn navigate<W: Write>(
        &mut self,
        out: &mut W,
        step: impl FnOnce(&mut AnnotationSession),
    ) -> io::Result<()> {
        if self.apply(out)? {
            step(&mut *self.session);
        }
        self.show(out)
    }

    fn show<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let suggestion = self.session.suggest_current();
        writeln!(out, "{}", self.session.status_line())?;
        if self.session.current_image().is_none() {
            writeln!(out, "  (no image for this frame)")?;
        }
        render_rows(out, &suggestion, &self.pending)?;
        writeln!(out, "  names: {}", suggestion.options[1..].join(", "))
    }
}

fn render_rows<W: Write>(out: &mut W, suggestion: &FrameSuggestion, pending: &[RowEdit]) -> io::Result<()> {
    writeln!(out, "  {:>8}  {:>10}  {:<20}  note", "BodyID", "Timestamp", "PersonName")?;
    for row in &suggestion.rows {
        let note = match &row.source {
            LabelSource::Ledger => String::new(),
            LabelSource::Suggested { distance } => format!("suggested (d={distance:.1})"),
            LabelSource::Uninterested => "not of interest".into(),
            LabelSource::MissingKey { column } => format!("no {column}, label manually"),
            LabelSource::NoCandidate => "needs a label".into(),
        };
        let staged = pending.iter().find(|e| e.body_id == row.body_id);
        let (label, note) = match staged {
            Some(edit) => (
                edit.person_name.clone().unwrap_or_default(),
                "pending edit".to_string(),
            ),
            None => (row.label().to_string(), note),
        };
        writeln!(
            out,
            "  {:>8}  {:>10}  {:<20}  {}",
            row.body_id.0, row.timestamp, label, note
        )?;
    }
    Ok(())
}

fn report<W: Write>(out: &mut W, err: &ReidError) -> io::Result<()> {
    writeln!(out, "error: {err}")?;
    if let Some(help) = err.help() {
        writeln!(out, "  help: {help}")?;
    }
    Ok(())
}
