// SPDX-License-Identifier: MPL-2.0

//! Scriptable stand-ins for the process table and compositor query.

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use super::{CompositorQuery, Matcher, ProbeError, ProcessInfo, ProcessQuery, ProcessTable};

pub const CONTENT_ROOT: &str = "/home/user/.steam/steam/steamapps/workshop/content/431960";

#[derive(Debug, Default)]
pub struct World {
    pub processes: Vec<ProcessInfo>,
    pub table_error: bool,
    pub compositor_output: Option<String>,
    pub terminated: Vec<u32>,
}

/// Shared handle so a test can inspect and change the world after the
/// probes were handed out.
#[derive(Debug, Default, Clone)]
pub struct FakeWorld(pub Rc<RefCell<World>>);

impl FakeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, pid: u32, name: &str, cmd: &[&str]) {
        self.0.borrow_mut().processes.push(ProcessInfo {
            pid,
            name: name.to_owned(),
            cmd: cmd.iter().map(|arg| (*arg).to_owned()).collect(),
        });
    }

    pub fn spawn_renderer(&self, pid: u32, id: &str) {
        let dir = format!("{CONTENT_ROOT}/{id}");
        self.spawn(
            pid,
            "linux-wallpaper",
            &["/usr/bin/linux-wallpaperengine", "--screen-root", "eDP-1", "--bg", &dir],
        );
    }

    pub fn set_compositor(&self, output: &str) {
        self.0.borrow_mut().compositor_output = Some(output.to_owned());
    }

    pub fn fail_table(&self) {
        self.0.borrow_mut().table_error = true;
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.0.borrow().terminated.clone()
    }

    pub fn query(&self) -> ProcessQuery {
        let mut query = ProcessQuery::new(
            self.clone(),
            FakeCompositor(self.0.clone()),
            Matcher::new(
                Path::new("linux-wallpaperengine"),
                "mpvpaper",
                PathBuf::from(CONTENT_ROOT),
            ),
        );
        // fake pids must never collide with the test runner
        query.own_pid = u32::MAX;
        query
    }
}

impl ProcessTable for FakeWorld {
    fn snapshot(&mut self) -> Result<Vec<ProcessInfo>, ProbeError> {
        let world = self.0.borrow();
        if world.table_error {
            return Err(ProbeError::Failed(String::from("permission denied")));
        }
        Ok(world.processes.clone())
    }

    fn terminate(&mut self, pid: u32) -> bool {
        let mut world = self.0.borrow_mut();
        world.terminated.push(pid);
        let before = world.processes.len();
        world.processes.retain(|process| process.pid != pid);
        world.processes.len() != before
    }
}

pub struct FakeCompositor(Rc<RefCell<World>>);

impl CompositorQuery for FakeCompositor {
    fn query(&mut self) -> Result<String, ProbeError> {
        self.0
            .borrow()
            .compositor_output
            .clone()
            .ok_or_else(|| ProbeError::ToolMissing(String::from("swww")))
    }
}
