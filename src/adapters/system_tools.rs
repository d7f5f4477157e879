use std::time::Duration;

use tracing::debug;

use crate::error::{ExecError, YkgpgResult};
use crate::ports::{CommandRunner, HostTools, Invocation};

/// `git config` exits with 1 when the key is not set.
const GIT_CONFIG_UNSET: i32 = 1;

/// `ykman` and `git` through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct SystemTools<R> {
    runner: R,
    inventory_timeout: Duration,
}

impl<R: CommandRunner> SystemTools<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            inventory_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_inventory_timeout(mut self, timeout: Duration) -> Self {
        self.inventory_timeout = timeout;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: CommandRunner> HostTools for SystemTools<R> {
    fn token_inventory(&self) -> YkgpgResult<String> {
        let invocation = Invocation::new("ykman")
            .arg("info")
            .timeout(self.inventory_timeout);
        let output = self.runner.run(&invocation)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn git_config(&self, key: &str) -> YkgpgResult<Option<String>> {
        let invocation = Invocation::new("git").args(["config", "--global", key]);
        match self.runner.run(&invocation) {
            Ok(output) => {
                let value = String::from_utf8_lossy(&output).trim().to_string();
                Ok((!value.is_empty()).then_some(value))
            }
            Err(ExecError::NonZeroExit { code, .. }) if code == GIT_CONFIG_UNSET => {
                debug!(key, "git setting is not set");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
