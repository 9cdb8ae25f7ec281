//! Interactive rotation through validated proxies.

use crate::emitter::ConfigEmitter;
use crate::error::Result;
use crate::process::ProxyProcess;
use crate::proxy::{Candidate, ValidatedProxy};

use log::{info, warn};
use std::io::{BufRead, Write};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// The last upstream written to the config and applied.
    pub last_applied: Option<Candidate>,
    /// `true` if the user entered `q`, `false` if input ran out.
    pub quit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Next,
    Quit,
    EndOfInput,
}

/// Applies validated proxies one at a time, driven by user input.
pub struct Session<P> {
    emitter: ConfigEmitter,
    process: P,
    keep_running: bool,
}

impl<P: ProxyProcess> Session<P> {
    /// Create a session writing configs with `emitter` and restarting `process`.
    pub fn new(emitter: ConfigEmitter, process: P) -> Self {
        Self { emitter, process, keep_running: false }
    }

    /// Leave the proxy process running when the session ends.
    pub fn keep_running(mut self, keep: bool) -> Self {
        self.keep_running = keep;
        self
    }

    /// The controlled proxy process.
    pub fn process(&self) -> &P {
        &self.process
    }

    /// Walk through `validated` in order.
    ///
    /// Each proxy is written to the config and the process restarted before
    /// the user is asked to move on, so the prompt always refers to the
    /// upstream that is live. The process is stopped when the session ends,
    /// including on error, unless `keep_running` is set.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        validated: &[ValidatedProxy],
        mut input: R,
        mut output: W,
    ) -> Result<SessionOutcome> {
        let mut outcome = SessionOutcome { last_applied: None, quit: false };

        let mut result = self.rotate(validated, &mut input, &mut output, &mut outcome).await;
        if result.is_ok() && outcome.last_applied.is_some() {
            result = writeln!(output, "Exiting...").map_err(Into::into);
        }

        if !self.keep_running && (outcome.last_applied.is_some() || result.is_err()) {
            if let Err(e) = self.process.stop().await {
                if result.is_ok() {
                    result = Err(e);
                } else {
                    warn!("Failed to stop proxy process: {}", e);
                }
            }
        }

        result.map(|()| outcome)
    }

    async fn rotate<R: BufRead, W: Write>(
        &mut self,
        validated: &[ValidatedProxy],
        input: &mut R,
        output: &mut W,
        outcome: &mut SessionOutcome,
    ) -> Result<()> {
        let total = validated.len();

        for (i, proxy) in validated.iter().enumerate() {
            writeln!(output, "Using proxy [{}/{}]: {}", i + 1, total, proxy)?;
            output.flush()?;

            self.emitter.write(&proxy.candidate)?;
            self.process.restart().await?;
            outcome.last_applied = Some(proxy.candidate.clone());
            info!("Routing through {}", proxy);

            match read_choice(input, output, i + 1 == total)? {
                Choice::Next => writeln!(output, "Switching to the next proxy...")?,
                Choice::Quit => {
                    outcome.quit = true;
                    break;
                }
                Choice::EndOfInput => break,
            }
        }
        Ok(())
    }
}

fn read_choice<R: BufRead, W: Write>(input: &mut R, output: &mut W, is_last: bool) -> Result<Choice> {
    if is_last {
        writeln!(output, "This is the last proxy. Enter 'q' to quit: ")?;
    } else {
        writeln!(output, "Enter 'n' to use the next proxy or 'q' to quit: ")?;
    }

    loop {
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Choice::EndOfInput);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "q" => return Ok(Choice::Quit),
            "n" if !is_last => return Ok(Choice::Next),
            _ if is_last => writeln!(output, "Invalid input, please enter 'q' to quit.")?,
            _ => writeln!(output, "Invalid input, please enter 'n' for next proxy or 'q' to quit.")?,
        }
    }
}
