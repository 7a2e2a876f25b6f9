use std::io;
use std::process::Command;

use tracing::debug;

/// Restart shim for the relay and engine units. A trait so the apply
/// sequence can be exercised without systemd.
pub trait ServiceControl {
    fn restart(&self, unit: &str) -> io::Result<()>;
}

pub struct Systemctl;

impl ServiceControl for Systemctl {
    fn restart(&self, unit: &str) -> io::Result<()> {
        debug!(unit, "systemctl restart");
        let output = Command::new("systemctl").args(["restart", unit]).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "systemctl restart {unit}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
