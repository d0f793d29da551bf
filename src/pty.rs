//! Pseudoterminal plumbing: spawn a child shell on a pty and shuttle
//! bytes to and from it without blocking.

use rustix::fs::{fcntl_setfl, OFlags};
use rustix::io::{read, write, Errno};
use rustix::pty::{grantpt, openpt, ptsname, unlockpt, OpenptFlags};
use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("failed to open pty master: {0}")]
    OpenMaster(#[source] rustix::io::Errno),
    #[error("failed to grant pty: {0}")]
    Grant(#[source] rustix::io::Errno),
    #[error("failed to unlock pty: {0}")]
    Unlock(#[source] rustix::io::Errno),
    #[error("failed to get pts name: {0}")]
    PtsName(#[source] rustix::io::Errno),
    #[error("failed to fork: {0}")]
    Fork(#[source] std::io::Error),
    #[error("child shell hung up")]
    Hangup,
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

/// Bytes queued for the child but not yet written; anything beyond this
/// is dropped rather than blocking the host loop.
const WRITE_BUFFER_LIMIT: usize = 4096;

/// The master side of the pty pair and the child shell behind it.
///
/// Dropping the handle closes the master and delivers SIGHUP to the
/// child, so the shell is torn down on every exit path.
pub struct Pty {
    master: OwnedFd,
    child_pid: rustix::process::Pid,
    write_buffer: Vec<u8>,
}

impl Pty {
    /// Open a pty and spawn a shell on the slave side. The shell comes
    /// from the argument, `$SHELL`, or `/bin/sh`, in that order.
    pub fn spawn(shell: Option<&str>) -> Result<Self, PtyError> {
        // CLOEXEC keeps the child from inheriting the master across
        // exec, so hangup is delivered when the shell exits.
        let master = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY | OpenptFlags::CLOEXEC)
            .map_err(PtyError::OpenMaster)?;

        fcntl_setfl(&master, OFlags::NONBLOCK).map_err(|e| PtyError::Io(e.into()))?;

        grantpt(&master).map_err(PtyError::Grant)?;
        unlockpt(&master).map_err(PtyError::Unlock)?;

        let slave_name = ptsname(&master, Vec::new()).map_err(PtyError::PtsName)?;

        let shell_path = shell
            .map(String::from)
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string());

        // SAFETY: the child branch only calls async-signal-safe
        // functions plus exec.
        let fork_result = unsafe { libc::fork() };

        match fork_result {
            -1 => Err(PtyError::Fork(std::io::Error::last_os_error())),
            0 => Self::exec_child(&slave_name, &shell_path),
            pid => {
                let child_pid = unsafe { rustix::process::Pid::from_raw_unchecked(pid) };
                log::debug!("spawned {} (pid {})", shell_path, pid);
                Ok(Self {
                    master,
                    child_pid,
                    write_buffer: Vec::new(),
                })
            }
        }
    }

    /// Child-side setup: new session, controlling terminal, stdio on
    /// the pts, a scrubbed environment, then exec.
    fn exec_child(slave_name: &CString, shell_path: &str) -> ! {
        unsafe {
            libc::setsid();

            let slave_fd = libc::open(slave_name.as_ptr(), libc::O_RDWR);
            if slave_fd < 0 {
                libc::_exit(1);
            }

            libc::ioctl(slave_fd, libc::TIOCSCTTY, 0);

            libc::dup2(slave_fd, 0);
            libc::dup2(slave_fd, 1);
            libc::dup2(slave_fd, 2);
            if slave_fd > 2 {
                libc::close(slave_fd);
            }
        }

        // Stale size and termcap variables confuse the child; it should
        // learn the truth from the pty and advertise a VT100.
        std::env::remove_var("COLUMNS");
        std::env::remove_var("LINES");
        std::env::remove_var("TERMCAP");
        std::env::set_var("SHELL", shell_path);
        std::env::set_var("TERM", "vt100");

        let shell_cstr = CString::new(shell_path).unwrap_or_else(|_| {
            CString::new("/bin/sh").expect("static path contains no NUL")
        });
        let args = [shell_cstr.as_ptr(), std::ptr::null()];

        unsafe {
            libc::execvp(shell_cstr.as_ptr(), args.as_ptr());
        }

        // exec only returns on failure.
        std::process::exit(1);
    }

    /// The master fd, for registration with a poller.
    pub fn master_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }

    pub fn raw_fd(&self) -> i32 {
        self.master.as_raw_fd()
    }

    /// Non-blocking read. `Ok(0)` means no data right now; `Hangup`
    /// means the child side is gone.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        match read(&self.master, buf) {
            Ok(0) => Err(PtyError::Hangup),
            Ok(n) => Ok(n),
            Err(Errno::AGAIN) => Ok(0),
            // Linux reports EIO on the master once the child exits.
            Err(Errno::IO) => Err(PtyError::Hangup),
            Err(e) => Err(PtyError::Io(e.into())),
        }
    }

    /// Queue bytes for the child and flush as much as the pty accepts.
    /// Bytes the pty refuses (EAGAIN) stay queued for the next call.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), PtyError> {
        if self.write_buffer.len() + bytes.len() > WRITE_BUFFER_LIMIT {
            log::warn!("pty write buffer full; dropping {} bytes", bytes.len());
            return Ok(());
        }
        self.write_buffer.extend_from_slice(bytes);
        self.flush()
    }

    /// Retry any bytes left over from an earlier short write.
    pub fn flush(&mut self) -> Result<(), PtyError> {
        while !self.write_buffer.is_empty() {
            match write(&self.master, &self.write_buffer) {
                Ok(n) => {
                    self.write_buffer.drain(..n);
                }
                Err(Errno::AGAIN) => break,
                Err(e) => return Err(PtyError::Io(e.into())),
            }
        }
        Ok(())
    }

    /// Propagate the cell-grid size to the kernel (TIOCSWINSZ).
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        let winsize = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        let result = unsafe { libc::ioctl(self.raw_fd(), libc::TIOCSWINSZ, &winsize) };
        if result == -1 {
            Err(PtyError::Io(std::io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }

    pub fn child_pid(&self) -> rustix::process::Pid {
        self.child_pid
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        unsafe {
            libc::kill(self.child_pid.as_raw_nonzero().get(), libc::SIGHUP);
        }
    }
}
