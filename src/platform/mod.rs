//! Platform-specific process plumbing and desktop integration

#[cfg(windows)]
pub mod windows;

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Detach a command from our process group so scripts outlive a closed shell
pub fn detach(cmd: &mut Command) {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(0x00000008); // DETACHED_PROCESS
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }
}

/// Check if a process is running
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // signal 0 probes for existence without delivering anything
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(windows)]
    {
        windows::is_process_running(pid)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        false
    }
}

/// Open the containing folder of `path` (or the folder itself) in the file manager
pub fn reveal(path: &Path) -> Result<()> {
    let target = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    };
    open::that(target).with_context(|| format!("Failed to open {}", target.display()))
}
