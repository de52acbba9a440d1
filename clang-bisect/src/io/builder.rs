//! Two-step compiler build: checkout script, then build-and-install.
//!
//! The builder is not parameterized by commit. git has already checked out
//! the revision under test by the time [`Builder::build`] runs.

use tracing::{info, instrument, warn};

use crate::core::env::{EnvMap, build_env_from_process};
use crate::error::{BisectError, BuildStage};
use crate::io::config::BisectConfig;
use crate::io::process::{CommandRunner, CommandSpec};

#[derive(Debug, Clone)]
pub struct Builder {
    checkout: CommandSpec,
    install: CommandSpec,
}

impl Builder {
    /// Builder using the current process environment minus the flag variables.
    pub fn from_config(config: &BisectConfig) -> Self {
        let env = build_env_from_process(&config.sanitized_vars);
        Self::with_env(config, env)
    }

    pub fn with_env(config: &BisectConfig, env: EnvMap) -> Self {
        Self {
            checkout: CommandSpec::new(config.checkout_command.iter().cloned()).env(env.clone()),
            install: CommandSpec::new(config.build_command.iter().cloned()).env(env),
        }
    }

    /// Run checkout then build-install; either exiting nonzero is fatal.
    #[instrument(skip_all)]
    pub fn build<R: CommandRunner>(&self, runner: &R) -> Result<(), BisectError> {
        for (stage, spec) in [
            (BuildStage::Checkout, &self.checkout),
            (BuildStage::Install, &self.install),
        ] {
            info!(%stage, command = %spec.display(), "running build step");
            let output = runner.execute(spec)?;
            if !output.success() {
                warn!(%stage, exit_code = ?output.exit_code, "build step failed");
                return Err(BisectError::BuildFailure {
                    stage,
                    command: spec.display(),
                    exit_code: output.exit_code,
                    commit: None,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::*;
    use crate::io::config::FileConfig;
    use crate::io::process::env_from_pairs;
    use crate::test_support::{ScriptedRunner, exit};

    fn config() -> BisectConfig {
        BisectConfig::resolve(
            Some(PathBuf::from("/src")),
            Some(PathBuf::from("/work")),
            FileConfig::default(),
        )
        .expect("config")
    }

    #[test]
    fn build_runs_checkout_then_install() {
        let runner = ScriptedRunner::new();
        let builder = Builder::with_env(&config(), EnvMap::new());

        builder.build(&runner).expect("build");

        assert_eq!(
            runner.commands(),
            vec![
                vec!["bash", "/src/checkout_llvm.sh"],
                vec!["ninja", "-C", "/work/llvm-stage2", "install"],
            ]
        );
    }

    #[test]
    fn build_issues_two_commands_per_call() {
        let runner = ScriptedRunner::new();
        let builder = Builder::with_env(&config(), EnvMap::new());

        builder.build(&runner).expect("first build");
        builder.build(&runner).expect("second build");

        assert_eq!(runner.commands().len(), 4);
    }

    #[test]
    fn build_passes_sanitized_environment() {
        let runner = ScriptedRunner::new();
        let env = env_from_pairs([("PATH", "/usr/bin")]);
        let builder = Builder::with_env(&config(), env.clone());

        builder.build(&runner).expect("build");

        for spec in runner.specs() {
            let spec_env = spec.env.expect("build env");
            assert_eq!(spec_env, env);
            assert!(!spec_env.contains_key(&OsString::from("CFLAGS")));
        }
    }

    #[test]
    fn checkout_failure_stops_before_install() {
        let runner = ScriptedRunner::new().on_program("bash", exit(1));
        let builder = Builder::with_env(&config(), EnvMap::new());

        let err = builder.build(&runner).expect_err("checkout fails");

        assert!(matches!(
            err,
            BisectError::BuildFailure {
                stage: BuildStage::Checkout,
                ..
            }
        ));
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn install_failure_is_fatal() {
        let runner = ScriptedRunner::new().on_program("ninja", exit(2));
        let builder = Builder::with_env(&config(), EnvMap::new());

        let err = builder.build(&runner).expect_err("install fails");

        assert!(matches!(
            err,
            BisectError::BuildFailure {
                stage: BuildStage::Install,
                exit_code: Some(2),
                ..
            }
        ));
    }
}
