use std::{io, net::TcpListener, os::fd::RawFd};

use tokio::process::Command;

use crate::topology::prefork::LISTEN_FD;

/// Make `fd` available to the child as [`LISTEN_FD`].
///
/// Runs between `fork` and `exec`, so the hook only issues raw syscalls.
/// On Linux the worker also gets SIGTERM when the arbiter dies.
pub(super) fn inherit_listener(cmd: &mut Command, fd: RawFd) {
    unsafe {
        cmd.pre_exec(move || {
            if fd == LISTEN_FD {
                // Same number: only the close-on-exec flag has to go.
                if libc::fcntl(fd, libc::F_SETFD, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
            } else if libc::dup2(fd, LISTEN_FD) == -1 {
                return Err(io::Error::last_os_error());
            }

            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Adopt the socket inherited from the arbiter.
pub(crate) fn adopt_listener(fd: RawFd) -> io::Result<TcpListener> {
    use std::os::fd::FromRawFd;

    // Refuse descriptors that are not sockets before taking ownership.
    let mut kind: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_TYPE,
            &mut kind as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    if kind != libc::SOCK_STREAM {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("descriptor {fd} is not a stream socket"),
        ));
    }
    Ok(unsafe { TcpListener::from_raw_fd(fd) })
}

/// Send `signal` to a worker; a worker that already exited is not an error.
pub(super) fn signal_worker(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    if unsafe { libc::kill(pid, signal) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}
