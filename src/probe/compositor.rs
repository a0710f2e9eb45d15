// SPDX-License-Identifier: MPL-2.0

use std::{
    io::Read,
    process::{Command, Stdio},
    thread,
    time::Duration,
};

use tracing::debug;
use wait_timeout::ChildExt;

use super::ProbeError;
use crate::launcher::unblock_signals;

/// A tool that reports which image the compositor is currently showing.
pub trait CompositorQuery {
    fn query(&mut self) -> Result<String, ProbeError>;
}

/// Runs `<tool> query` and captures its output, killing it after `timeout`.
pub struct CommandQuery {
    tool: String,
    timeout: Duration,
}

impl CommandQuery {
    pub fn new(tool: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }
}

impl CompositorQuery for CommandQuery {
    fn query(&mut self) -> Result<String, ProbeError> {
        let program =
            which::which(&self.tool).map_err(|_| ProbeError::ToolMissing(self.tool.clone()))?;

        let mut command = Command::new(program);
        command
            .arg("query")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        unblock_signals(&mut command);
        let mut child = command.spawn()?;

        // drained concurrently so a long listing cannot fill the pipe and stall the tool
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut output = String::new();
                stdout.read_to_string(&mut output).map(|_| output)
            })
        });

        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            // the reader ends on EOF; a lingering grandchild must not block us here
            drop(reader);
            return Err(ProbeError::Timeout {
                tool: self.tool.clone(),
                timeout: self.timeout,
            });
        };

        let output = match reader {
            Some(reader) => reader.join().map_err(|_| {
                ProbeError::Failed(format!("{} query: output reader panicked", self.tool))
            })??,
            None => String::new(),
        };

        if !status.success() {
            return Err(ProbeError::Failed(format!("{} query: {status}", self.tool)));
        }

        debug!(tool = %self.tool, %output, "compositor query");

        Ok(output)
    }
}
