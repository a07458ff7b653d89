use std::io;

use nix::errno::Errno;
use nix::unistd::{Gid, Uid, getegid, geteuid, getgid, getuid, setgid, setuid};

use crate::config::SandboxIdentity;
use crate::core::traits::privileges::PrivilegeDropper;

/// Drops to the sandbox uid/gid with `setgid` followed by `setuid`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SetuidDropper;

impl PrivilegeDropper for SetuidDropper {
    fn drop_privileges(&self, identity: SandboxIdentity) -> io::Result<()> {
        let uid = Uid::from_raw(identity.uid);
        let gid = Gid::from_raw(identity.gid);

        // Supplementary groups can only be cleared while still privileged.
        #[cfg(target_os = "linux")]
        if geteuid().is_root() {
            nix::unistd::setgroups(&[gid])?;
        }

        // GID first: once the uid is dropped the gid can no longer change.
        setgid(gid)?;
        setuid(uid)?;

        if getuid() != uid || geteuid() != uid || getgid() != gid || getegid() != gid {
            return Err(Errno::EPERM.into());
        }
        Ok(())
    }
}
