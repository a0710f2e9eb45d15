// SPDX-License-Identifier: MPL-2.0

use std::{
    ffi::OsStr,
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use calloop::signals::{Signal, Signals};
use lwe_session_config::{RenderSettings, WallpaperId};

use super::{
    Backend, LaunchError, Launcher,
    detection::{find_media, has_project, is_animated_file, is_gif_file, is_video_file},
};
use crate::probe::{ProcessQuery, ProcessTable, SystemTable, fake::FakeWorld};

fn id(s: &str) -> WallpaperId {
    WallpaperId::new(s).unwrap()
}

fn args(command: &std::process::Command) -> Vec<String> {
    command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

fn scene(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("project.json"), "{}").unwrap();
}

#[test]
fn test_is_gif_file() {
    assert!(is_gif_file(Path::new("test.gif")));
    assert!(is_gif_file(Path::new("test.GIF")));
    assert!(is_gif_file(Path::new("/path/to/animation.gif")));
    assert!(!is_gif_file(Path::new("test.mp4")));
    assert!(!is_gif_file(Path::new("test.png")));
}

#[test]
fn test_is_video_file() {
    assert!(is_video_file(Path::new("test.mp4")));
    assert!(is_video_file(Path::new("test.MP4")));
    assert!(is_video_file(Path::new("test.webm")));
    assert!(is_video_file(Path::new("test.mkv")));
    assert!(is_video_file(Path::new("test.m4v")));
    assert!(is_video_file(Path::new("test.mov")));
    assert!(is_video_file(Path::new("test.ogv")));
    assert!(!is_video_file(Path::new("test.gif")));
    assert!(!is_video_file(Path::new("scene.pkg")));
    assert!(!is_video_file(Path::new("project.json")));
}

#[test]
fn test_animated_extensions() {
    for ext in ["gif", "mp4", "webm", "mkv", "avi", "mov", "m4v", "ogv"] {
        let filename = format!("test.{ext}");
        assert!(is_animated_file(Path::new(&filename)), "{ext}");
        let upper = format!("test.{}", ext.to_uppercase());
        assert!(is_animated_file(Path::new(&upper)), "{ext}");
    }
    assert!(!is_animated_file(Path::new("preview.jpg")));
    assert!(!is_animated_file(Path::new("no_extension")));
}

#[test]
fn backend_follows_directory_contents() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Launcher::new("sh", "sh", "loop=inf", root.path());

    scene(root.path(), "100");
    fs::write(root.path().join("100/preview.gif"), "").unwrap();
    assert!(has_project(&root.path().join("100")));
    assert_eq!(launcher.backend(&root.path().join("100")), Backend::Renderer);

    let media = root.path().join("custom_aa/media");
    fs::create_dir_all(&media).unwrap();
    fs::write(media.join("notes.txt"), "").unwrap();
    fs::write(media.join("clip.webm"), "").unwrap();
    assert_eq!(
        launcher.backend(&root.path().join("custom_aa")),
        Backend::MediaTool(media.join("clip.webm"))
    );

    let bare = root.path().join("200");
    fs::create_dir_all(&bare).unwrap();
    assert_eq!(find_media(&bare), None);
    assert_eq!(launcher.backend(&bare), Backend::Renderer);
}

#[test]
fn renderer_invocation() {
    let root = tempfile::tempdir().unwrap();
    scene(root.path(), "4242");
    let launcher = Launcher::new("sh", "mpvpaper", "loop=inf", root.path());

    let settings = RenderSettings::default()
        .screen("HDMI-A-1")
        .volume(130)
        .fps(2)
        .noautomute(true)
        .disable_mouse(true);
    let command = launcher.command(&id("4242"), &settings).unwrap();

    assert_eq!(
        Path::new(command.get_program()).file_name(),
        Some(OsStr::new("sh"))
    );
    let dir = root.path().join("4242").display().to_string();
    assert_eq!(
        args(&command),
        vec![
            "--screen-root",
            "HDMI-A-1",
            "--bg",
            dir.as_str(),
            "--volume",
            "100",
            "--fps",
            "10",
            "--noautomute",
            "--disable-mouse",
        ]
    );
}

#[test]
fn media_tool_invocation() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("gif_1");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("loop.gif"), "").unwrap();
    let launcher = Launcher::new("linux-wallpaperengine", "sh", "loop=inf --no-audio", root.path());

    let command = launcher
        .command(&id("gif_1"), &RenderSettings::default().screen(""))
        .unwrap();
    let file = dir.join("loop.gif").display().to_string();
    assert_eq!(
        args(&command),
        vec!["-o", "loop=inf --no-audio", "*", file.as_str()]
    );
}

#[test]
fn unknown_wallpaper_fails_closed() {
    let root = tempfile::tempdir().unwrap();
    let launcher = Launcher::new("sh", "sh", "", root.path());
    assert!(matches!(
        launcher.command(&id("999"), &RenderSettings::default()),
        Err(LaunchError::UnknownWallpaper(_))
    ));
}

#[test]
fn missing_binary_leaves_running_wallpaper_alone() {
    let root = tempfile::tempdir().unwrap();
    scene(root.path(), "1");
    let mut launcher = Launcher::new("/nonexistent/linux-wallpaperengine", "sh", "", root.path());

    let world = FakeWorld::new();
    world.spawn_renderer(50, "2");
    let mut query = world.query();

    let result = launcher.launch(&id("1"), &RenderSettings::default(), &mut query);
    assert!(matches!(result, Err(LaunchError::BinaryNotFound(_))));
    assert!(world.terminated().is_empty());
}

#[test]
fn launch_replaces_previous_wallpaper() {
    let root = tempfile::tempdir().unwrap();
    scene(root.path(), "1");
    let mut launcher = Launcher::new("true", "mpvpaper", "", root.path());

    let world = FakeWorld::new();
    world.spawn_renderer(50, "2");
    world.spawn(51, "mpvpaper", &["mpvpaper", "*", "/tmp/a.mp4"]);
    world.spawn(52, "bash", &["bash"]);
    let mut query = world.query();

    let pid = launcher
        .launch(&id("1"), &RenderSettings::default(), &mut query)
        .unwrap();
    assert!(pid > 0);

    let mut terminated = world.terminated();
    terminated.sort_unstable();
    assert_eq!(terminated, vec![50, 51]);
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Retries while a freshly written script is still busy in a forked sibling.
fn launch_script(launcher: &mut Launcher, wallpaper: &WallpaperId, query: &mut ProcessQuery) -> u32 {
    for _ in 0..20 {
        match launcher.launch(wallpaper, &RenderSettings::default(), query) {
            Ok(pid) => return pid,
            Err(LaunchError::Spawn { .. }) => thread::sleep(Duration::from_millis(50)),
            Err(err) => panic!("{err}"),
        }
    }
    panic!("script never became executable");
}

fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..150 {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

fn process_state(pid: u32) -> Option<String> {
    fs::read_to_string(format!("/proc/{pid}/status"))
        .ok()?
        .lines()
        .find_map(|line| line.strip_prefix("State:"))
        .map(|state| state.trim().to_owned())
}

#[test]
fn exited_wallpaper_is_reaped_by_next_launch() {
    let root = tempfile::tempdir().unwrap();
    scene(root.path(), "1");
    scene(root.path(), "2");
    let mut launcher = Launcher::new("true", "mpvpaper", "", root.path());
    let mut query = FakeWorld::new().query();

    let first = launcher
        .launch(&id("1"), &RenderSettings::default(), &mut query)
        .unwrap();
    assert!(eventually(|| process_state(first).is_some_and(|state| state.starts_with('Z'))));

    launcher
        .launch(&id("2"), &RenderSettings::default(), &mut query)
        .unwrap();
    assert_eq!(process_state(first), None);

    assert!(eventually(|| launcher.reap() == 0));
}

#[test]
fn wallpaper_started_under_watched_signals_still_terminates() {
    let _signals = Signals::new(&[
        Signal::SIGINT,
        Signal::SIGTERM,
        Signal::SIGUSR1,
        Signal::SIGUSR2,
    ])
    .unwrap();

    let root = tempfile::tempdir().unwrap();
    scene(root.path(), "1");
    let renderer = script(root.path(), "renderer", "exec sleep 30");
    let mut launcher = Launcher::new(renderer, "mpvpaper", "", root.path());
    let mut query = FakeWorld::new().query();

    let pid = launch_script(&mut launcher, &id("1"), &mut query);

    let mut table = SystemTable::default();
    table.snapshot().unwrap();
    assert!(table.terminate(pid));
    assert!(eventually(|| launcher.reap() == 0), "SIGTERM was ignored");
}
