use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rackpack::app_dirs::CONFIG_HOME_ENV;

static CONFIG_HOME_LOCK: Mutex<()> = Mutex::new(());

/// Holds `RACKPACK_CONFIG_HOME` on a test folder; the variable is unset on drop.
pub struct ConfigHomeGuard {
    _lock: MutexGuard<'static, ()>,
}

impl ConfigHomeGuard {
    pub fn set(path: &Path) -> Self {
        let lock = CONFIG_HOME_LOCK
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        // SAFETY: every writer of the variable holds CONFIG_HOME_LOCK.
        unsafe { std::env::set_var(CONFIG_HOME_ENV, path) };
        Self { _lock: lock }
    }
}

impl Drop for ConfigHomeGuard {
    fn drop(&mut self) {
        // SAFETY: the lock is still held here.
        unsafe { std::env::remove_var(CONFIG_HOME_ENV) };
    }
}
