//! Interactive rehearsal on the terminal.
//!
//! Three sources feed one loop: keyboard lines, Ctrl-C, and narration
//! completion events from the [`ConsoleNarrator`]. The loop also polls the
//! engine so a counterpart line moves on once its grace interval has passed.

use super::{Output, json, resolve_id};
use crate::models::PracticeScript;
use crate::rehearsal::{
    ConsoleNarrator, NarrationEvent, Narrator, Rehearsal, RehearsalState, Transition,
};
use crate::storage::{SharedStore, Store, lock};
use crate::{Error, Result};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Longest wait for input when no grace interval is running.
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupt,
    Eof,
}

#[derive(Debug, Serialize)]
pub struct RehearsalSummary {
    pub script_id: Uuid,
    pub title: String,
    /// Whether the last run reached the end of the script
    pub completed: bool,
    pub lines: usize,
    pub resets: usize,
    pub practice_count: u32,
}

impl Output for RehearsalSummary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.completed {
            format!(
                "Finished \"{}\". Practiced {} time(s) so far.",
                self.title, self.practice_count
            )
        } else {
            format!(
                "Stopped \"{}\" before the end. Practiced {} time(s) so far.",
                self.title, self.practice_count
            )
        }
    }
}

/// Run a rehearsal on stdin/stdout.
///
/// With `human` unset, the transcript goes to stderr so stdout carries only
/// the JSON summary.
pub fn rehearse(
    data_dir: &Path,
    script: &str,
    grace: Duration,
    human: bool,
) -> Result<RehearsalSummary> {
    let store = Store::open(data_dir)?;
    let script_id = resolve_id::<PracticeScript>(&store, script)?;
    let store = store.into_shared();

    let (input_tx, input_rx) = mpsc::channel();
    let interrupt_tx = input_tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(Input::Interrupt);
    })
    .map_err(|e| Error::Other(format!("Failed to install Ctrl-C handler: {}", e)))?;
    spawn_stdin_reader(input_tx);

    let (events_tx, events_rx) = mpsc::channel();
    let transcript = || -> Box<dyn Write> {
        if human {
            Box::new(io::stdout())
        } else {
            Box::new(io::stderr())
        }
    };
    let narrator = ConsoleNarrator::new(transcript(), events_tx);
    let mut session = Rehearsal::new(store.clone(), narrator).with_grace(grace);

    run_session(
        &mut session,
        &store,
        script_id,
        &input_rx,
        &events_rx,
        &mut transcript(),
    )
}

fn spawn_stdin_reader(tx: Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let input = match line {
                Ok(line) => Input::Line(line),
                Err(_) => break,
            };
            if tx.send(input).is_err() {
                return;
            }
        }
        let _ = tx.send(Input::Eof);
    });
}

/// Drive `session` from `inputs` until the script completes or the user quits.
///
/// Enter says the current line of your own, or skips a counterpart line.
/// `p`, `r`, `s` and `q` pause, resume, skip and quit. An interrupt resets
/// the session to the first line; a second interrupt while reset quits.
pub fn run_session<N: Narrator>(
    session: &mut Rehearsal<N>,
    store: &SharedStore,
    script_id: Uuid,
    inputs: &Receiver<Input>,
    narration: &Receiver<NarrationEvent>,
    out: &mut dyn Write,
) -> Result<RehearsalSummary> {
    let title = lock(store)?.get::<PracticeScript>(script_id)?.title;
    writeln!(
        out,
        "Rehearsing \"{}\". Enter: next line, p: pause, r: resume, s: skip, q: quit, Ctrl-C: start over.",
        title
    )?;

    let mut resets = 0;
    let transition = session.start(script_id)?;
    render(out, session, transition)?;

    loop {
        while let Ok(event) = narration.try_recv() {
            if let Err(e) = session.on_narration(event) {
                writeln!(out, "  ({}; moving on)", e)?;
            }
        }
        if let Some(transition) = session.poll(Instant::now())? {
            render(out, session, transition)?;
        }
        if session.state() == RehearsalState::Completed {
            break;
        }

        let wait = session
            .grace_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_TICK)
            .min(IDLE_TICK);
        let input = match inputs.recv_timeout(wait) {
            Ok(input) => input,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => Input::Eof,
        };

        let command = match input {
            Input::Interrupt if session.state() == RehearsalState::Idle => break,
            Input::Interrupt => {
                resets += 1;
                Ok(session.reset())
            }
            Input::Eof => break,
            Input::Line(line) => match line.trim() {
                "q" | "quit" => break,
                "p" | "pause" => session.pause(),
                "r" | "resume" => session.resume(),
                "s" | "skip" => session.skip(),
                _ => match session.state() {
                    RehearsalState::Idle => session.start(script_id),
                    RehearsalState::Paused => session.resume(),
                    _ => session.advance(),
                },
            },
        };
        match command {
            Ok(transition) => render(out, session, transition)?,
            Err(Error::InvalidState(msg)) => writeln!(out, "  ({})", msg)?,
            Err(e) => return Err(e),
        }
    }

    let completed = session.state() == RehearsalState::Completed;
    let lines = session.snapshot().total;
    if !completed {
        session.reset();
    }
    let practice_count = lock(store)?.get::<PracticeScript>(script_id)?.practice_count;
    Ok(RehearsalSummary {
        script_id,
        title,
        completed,
        lines,
        resets,
        practice_count,
    })
}

fn render<N: Narrator>(
    out: &mut dyn Write,
    session: &Rehearsal<N>,
    transition: Transition,
) -> io::Result<()> {
    let snapshot = session.snapshot();
    let position = format!("[{}/{}]", (snapshot.cursor + 1).min(snapshot.total), snapshot.total);
    match transition.to {
        RehearsalState::AwaitingSelf => {
            if let Some(line) = session.current() {
                writeln!(out, "{} you: {}", position, line.content)?;
            }
        }
        // The narrator prints counterpart lines itself
        RehearsalState::NarratingCounterpart if transition.from == RehearsalState::Paused => {
            writeln!(out, "  (resumed)")?
        }
        RehearsalState::NarratingCounterpart => {}
        RehearsalState::Paused => writeln!(out, "  (paused; r to resume)")?,
        RehearsalState::Idle => writeln!(
            out,
            "Starting over. Press Enter to begin, Ctrl-C again to quit."
        )?,
        RehearsalState::Completed => writeln!(out, "All lines done!")?,
    }
    out.flush()
}
