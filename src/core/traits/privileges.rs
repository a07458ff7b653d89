use crate::config::SandboxIdentity;

/// Switches the current process to the sandbox identity.
///
/// Called in a forked child right before `exec`, so implementations must not
/// allocate, lock or log. An error aborts the launch.
pub trait PrivilegeDropper: std::fmt::Debug + Send + Sync + 'static {
    fn drop_privileges(&self, identity: SandboxIdentity) -> std::io::Result<()>;
}
