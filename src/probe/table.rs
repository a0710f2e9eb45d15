// SPDX-License-Identifier: MPL-2.0

use sysinfo::{
    Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, Signal, System, UpdateKind,
};

use super::{ProbeError, ProcessInfo};

/// Access to the operating system process table.
pub trait ProcessTable {
    /// Every live process with its name and argument list.
    fn snapshot(&mut self) -> Result<Vec<ProcessInfo>, ProbeError>;

    /// Asks `pid` to exit. Returns whether the signal was delivered.
    fn terminate(&mut self, pid: u32) -> bool;
}

/// The real process table, read through `sysinfo`.
pub struct SystemTable {
    system: System,
}

impl Default for SystemTable {
    fn default() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl ProcessTable for SystemTable {
    fn snapshot(&mut self) -> Result<Vec<ProcessInfo>, ProbeError> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        let processes: Vec<ProcessInfo> = self
            .system
            .processes()
            .values()
            .filter(|process| process.status() != ProcessStatus::Zombie)
            .map(|process| ProcessInfo {
                pid: process.pid().as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cmd: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect();

        // /proc always lists at least this process
        if processes.is_empty() {
            return Err(ProbeError::Failed(String::from(
                "process table could not be read",
            )));
        }

        Ok(processes)
    }

    fn terminate(&mut self, pid: u32) -> bool {
        self.system
            .process(Pid::from_u32(pid))
            .and_then(|process| process.kill_with(Signal::Term))
            .unwrap_or(false)
    }
}
