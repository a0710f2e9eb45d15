// SPDX-License-Identifier: MPL-2.0

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another instance is already running{}", .pid.map(|pid| format!(" (pid {pid})")).unwrap_or_default())]
    Held { pid: Option<u32> },
    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Exclusive advisory lock held for the lifetime of the daemon.
pub struct InstanceLock {
    _file: Flock<File>,
}

/// Takes the instance lock at `path` and writes our pid into it.
pub fn acquire(path: &Path) -> Result<InstanceLock, LockError> {
    let io_err = |source: io::Error| LockError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(io_err)?;

    let mut file = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(file) => file,
        Err((_, Errno::EWOULDBLOCK)) => {
            let pid = fs::read_to_string(path)
                .ok()
                .and_then(|contents| contents.trim().parse().ok());
            return Err(LockError::Held { pid });
        }
        Err((_, errno)) => return Err(io_err(errno.into())),
    };

    file.set_len(0).map_err(io_err)?;
    writeln!(file, "{}", std::process::id()).map_err(io_err)?;

    Ok(InstanceLock { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_instance_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/lwe-session.lock");

        let held = acquire(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            std::process::id().to_string()
        );

        let refused = acquire(&path).err();
        assert!(matches!(
            refused,
            Some(LockError::Held { pid }) if pid == Some(std::process::id())
        ));

        drop(held);
        assert!(acquire(&path).is_ok());
    }
}
