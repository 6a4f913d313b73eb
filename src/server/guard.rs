//! Single-instance guard: a Unix-socket rendezvous bound inside the
//! storage root, so two server processes can never share one tree.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::common::consts::LOCK_SOCKET_FILE;

#[derive(Debug)]
pub struct InstanceGuard {
    path: PathBuf,
    _listener: UnixListener,
}

impl InstanceGuard {
    /// Binds the rendezvous socket under `storage_root`. A live peer on
    /// the socket means another instance owns this root and the bind
    /// fails; a dead socket file (the previous process never got to
    /// clean up) is unlinked and rebound.
    pub fn acquire(storage_root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(storage_root)?;
        let path = storage_root.join(LOCK_SOCKET_FILE);

        match UnixListener::bind(&path) {
            Ok(listener) => {
                info!(lock = %path.display(), "instance lock acquired");
                Ok(Self {
                    path,
                    _listener: listener,
                })
            }
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                if UnixStream::connect(&path).is_ok() {
                    return Err(io::Error::new(
                        io::ErrorKind::AddrInUse,
                        format!(
                            "another instance already serves {}",
                            storage_root.display()
                        ),
                    ));
                }
                warn!(lock = %path.display(), "stale instance lock, rebinding");
                std::fs::remove_file(&path)?;
                let listener = UnixListener::bind(&path)?;
                Ok(Self {
                    path,
                    _listener: listener,
                })
            }
            Err(err) => Err(err),
        }
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        info!(lock = %self.path.display(), "instance lock released");
    }
}
