//! External engine process.
//!
//! The engine is driven over its text protocol: `post` and `cores` once after
//! start, then `setboard` and `analyze` per position. Output is read on a
//! separate thread so the caller can poll without blocking on the pipe.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::task::Poll;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use book_core::cache::LookupRule;
use book_core::level::Level;
use book_core::{Confidence, Evaluation, Position};
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use tracing::{debug, info, trace};

use crate::error::EngineError;
use crate::parser::{OutputParser, SearchLine};

pub type Result<T> = std::result::Result<T, EngineError>;

/// Something that can search a position to a given level.
pub trait Engine {
    /// Searches a position where the side to move has a legal move.
    fn search(&mut self, position: &Position, level: Level) -> Result<Evaluation>;

    /// Evaluates any position.
    ///
    /// Finished games are scored without searching. A forced pass is
    /// searched from the opponent's side and converted back.
    fn evaluate(&mut self, position: &Position, level: Level) -> Result<Evaluation> {
        match LookupRule::of(position) {
            LookupRule::GameEnd => Ok(Evaluation::for_game_end(position)),
            LookupRule::Pass => Ok(self.search(&position.pass(), level)?.for_pass_parent()),
            LookupRule::Stored => self.search(position, level),
        }
    }
}

/// How to start the engine.
#[derive(Clone, Debug)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub cores: usize,
    /// How long one poll waits for output.
    pub poll_interval: Duration,
}

struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    level: Level,
}

impl EngineProcess {
    fn spawn(command: &EngineCommand, level: Level) -> Result<Self> {
        let default_working_dir = Path::new(&command.program)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let working_dir = command.working_dir.clone().unwrap_or(default_working_dir);

        info!(program = %command.program, level, dir = %working_dir.display(), "starting engine");
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .arg("-level")
            .arg(level.to_string())
            .current_dir(&working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or(EngineError::Exited)?;
        let stdout = child.stdout.take().ok_or(EngineError::Exited)?;

        let (sender, lines) = unbounded();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        });

        let mut process = EngineProcess {
            child,
            stdin,
            lines,
            reader: Some(reader),
            level,
        };
        process.send("post")?;
        process.send(&format!("cores {}", command.cores))?;
        Ok(process)
    }

    fn send(&mut self, command: &str) -> Result<()> {
        trace!(command, "engine stdin");
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Waits up to `timeout` for the next output line.
    ///
    /// `Poll::Pending` means the engine is still busy, not that it failed.
    fn poll(&self, timeout: Duration) -> Result<Poll<String>> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Ok(Poll::Ready(line)),
            Err(RecvTimeoutError::Timeout) => Ok(Poll::Pending),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Exited),
        }
    }

    /// Discards output left over from an earlier search.
    fn drain(&self) {
        while self.lines.try_recv().is_ok() {}
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Edax-compatible engine running as a child process.
///
/// The process is started lazily and restarted whenever a different level is
/// requested, since the level is fixed at start.
pub struct EdaxEngine {
    command: EngineCommand,
    process: Option<EngineProcess>,
}

impl EdaxEngine {
    pub fn new(command: EngineCommand) -> Self {
        EdaxEngine {
            command,
            process: None,
        }
    }

    fn process(&mut self, level: Level) -> Result<&mut EngineProcess> {
        if self.process.as_ref().is_some_and(|process| process.level != level) {
            debug!(level, "level changed, restarting engine");
            self.process = None;
        }
        if self.process.is_none() {
            self.process = Some(EngineProcess::spawn(&self.command, level)?);
        }
        self.process.as_mut().ok_or(EngineError::Exited)
    }
}

impl Engine for EdaxEngine {
    fn search(&mut self, position: &Position, level: Level) -> Result<Evaluation> {
        let poll_interval = self.command.poll_interval;
        let result = {
            let process = self.process(level)?;
            process.drain();
            process.send(&format!("setboard {}", position.to_setboard()))?;
            process.send("analyze")?;
            read_result(process, poll_interval)
        };

        let row = match result {
            Ok(row) => row,
            Err(err) => {
                // A process in an unknown state is not reused.
                self.process = None;
                return Err(err);
            }
        };

        Ok(Evaluation::new(
            *position,
            level,
            row.depth,
            Confidence::try_from(row.confidence)?,
            row.score,
            row.best_moves,
        )?)
    }
}

fn read_result(process: &EngineProcess, poll_interval: Duration) -> Result<SearchLine> {
    let started = Instant::now();
    let mut parser = OutputParser::new();
    loop {
        match process.poll(poll_interval)? {
            Poll::Pending => {
                trace!(elapsed = ?started.elapsed(), "engine still searching");
            }
            Poll::Ready(line) => {
                trace!(%line, "engine stdout");
                if let Some(row) = parser.feed(&line)? {
                    debug!(depth = row.depth, score = row.score, elapsed = ?started.elapsed(), "search finished");
                    return Ok(row);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_core::Move;

    /// Answers every search with a fixed score and the first legal move.
    struct FixedEngine {
        searched: Vec<Position>,
    }

    impl Engine for FixedEngine {
        fn search(&mut self, position: &Position, level: Level) -> Result<Evaluation> {
            self.searched.push(*position);
            let best = position.moves().iter().next().map(Move::Play).into_iter().collect();
            Ok(Evaluation::new(*position, level, level, Confidence::P73, 6, best)?)
        }
    }

    #[test]
    fn test_evaluate_searches_playable_positions() {
        let mut engine = FixedEngine { searched: Vec::new() };
        let evaluation = engine.evaluate(&Position::start(), 20).unwrap();
        assert_eq!(evaluation.score(), 6);
        assert_eq!(engine.searched, vec![Position::start()]);
    }

    #[test]
    fn test_evaluate_game_end_without_search() {
        let mut engine = FixedEngine { searched: Vec::new() };
        let full = Position::from_board_string(&format!("{}{}", "X".repeat(40), "O".repeat(24))).unwrap();
        let evaluation = engine.evaluate(&full, 20).unwrap();
        assert_eq!(evaluation.score(), 16);
        assert!(engine.searched.is_empty());
    }

    #[test]
    fn test_evaluate_pass_through_passed_position() {
        let mut engine = FixedEngine { searched: Vec::new() };
        let pass = Position::from_board_string(&format!("-XOOOOOO{}", "-".repeat(56))).unwrap();
        let evaluation = engine.evaluate(&pass, 20).unwrap();
        assert_eq!(engine.searched, vec![pass.pass()]);
        assert_eq!(evaluation.position(), &pass);
        assert_eq!(evaluation.score(), -6);
        assert_eq!(evaluation.best_move(), Some(Move::Pass));
    }

    #[test]
    fn test_missing_program() {
        let mut engine = EdaxEngine::new(EngineCommand {
            program: "/nonexistent/engine".to_string(),
            args: Vec::new(),
            working_dir: Some(PathBuf::from(".")),
            cores: 1,
            poll_interval: Duration::from_millis(10),
        });
        assert!(matches!(
            engine.search(&Position::start(), 20),
            Err(EngineError::Io(_))
        ));
    }
}
