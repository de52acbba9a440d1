//! Session configuration.
//!
//! Locations come from the command line or the `SRC`/`WORK` environment
//! variables; tuning knobs come from an optional TOML file. Everything is
//! resolved once into an immutable [`BisectConfig`] before a session starts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::env::DEFAULT_FLAG_VARS;
use crate::error::BisectError;

/// Tunables loaded from TOML.
///
/// Missing fields default to the LLVM layout used by the base builder image.
/// Relative paths in commands are used verbatim; `{src}` and `{work}` are
/// replaced with the configured locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    /// Repository to bisect, relative to the source location.
    pub repo_subdir: String,

    /// First build step, run before every build.
    pub checkout_command: Vec<String>,

    /// Second build step; installs the compiler for the test command.
    pub build_command: Vec<String>,

    /// Variables stripped from the build environment.
    pub sanitized_vars: Vec<String>,

    /// Upper bound on tested candidates before giving up.
    pub max_steps: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            repo_subdir: "llvm-project".to_string(),
            checkout_command: vec!["bash".to_string(), "{src}/checkout_llvm.sh".to_string()],
            build_command: vec![
                "ninja".to_string(),
                "-C".to_string(),
                "{work}/llvm-stage2".to_string(),
                "install".to_string(),
            ],
            sanitized_vars: DEFAULT_FLAG_VARS.iter().map(|v| v.to_string()).collect(),
            max_steps: 64,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), BisectError> {
        if self.repo_subdir.trim().is_empty() {
            return Err(BisectError::Config("repo_subdir must be non-empty".to_string()));
        }
        if is_blank_argv(&self.checkout_command) {
            return Err(BisectError::Config(
                "checkout_command must be a non-empty array".to_string(),
            ));
        }
        if is_blank_argv(&self.build_command) {
            return Err(BisectError::Config(
                "build_command must be a non-empty array".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(BisectError::Config("max_steps must be > 0".to_string()));
        }
        Ok(())
    }
}

fn is_blank_argv(argv: &[String]) -> bool {
    argv.first().is_none_or(|program| program.trim().is_empty())
}

/// Load tunables from a TOML file, or defaults when no path is given.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, BisectError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let contents = fs::read_to_string(path)
        .map_err(|e| BisectError::io(format!("read {}", path.display()), e))?;
    let cfg: FileConfig = toml::from_str(&contents)
        .map_err(|e| BisectError::Config(format!("parse {}: {e}", path.display())))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Fully resolved, immutable session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectConfig {
    pub src_dir: PathBuf,
    pub work_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub checkout_command: Vec<String>,
    pub build_command: Vec<String>,
    pub sanitized_vars: Vec<String>,
    pub max_steps: u32,
}

impl BisectConfig {
    /// Resolve locations and tunables; a missing location is a configuration error.
    pub fn resolve(
        src_dir: Option<PathBuf>,
        work_dir: Option<PathBuf>,
        file: FileConfig,
    ) -> Result<Self, BisectError> {
        let src_dir = src_dir.ok_or_else(|| {
            BisectError::Config("source location is not set (pass --src or set SRC)".to_string())
        })?;
        let work_dir = work_dir.ok_or_else(|| {
            BisectError::Config("build location is not set (pass --work or set WORK)".to_string())
        })?;
        file.validate()?;

        let expand = |argv: &[String]| -> Vec<String> {
            argv.iter()
                .map(|arg| expand_placeholders(arg, &src_dir, &work_dir))
                .collect()
        };
        let checkout_command = expand(&file.checkout_command);
        let build_command = expand(&file.build_command);

        Ok(Self {
            repo_dir: src_dir.join(&file.repo_subdir),
            checkout_command,
            build_command,
            sanitized_vars: file.sanitized_vars,
            max_steps: file.max_steps,
            src_dir,
            work_dir,
        })
    }
}

fn expand_placeholders(arg: &str, src: &Path, work: &Path) -> String {
    arg.replace("{src}", &src.to_string_lossy())
        .replace("{work}", &work.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_path_returns_default() {
        let cfg = load_file_config(None).expect("load");
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn load_partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bisect.toml");
        fs::write(&path, "max_steps = 5\nsanitized_vars = [\"CFLAGS\"]\n").expect("write");
        let cfg = load_file_config(Some(&path)).expect("load");
        assert_eq!(cfg.max_steps, 5);
        assert_eq!(cfg.sanitized_vars, vec!["CFLAGS".to_string()]);
        assert_eq!(cfg.repo_subdir, "llvm-project");
    }

    #[test]
    fn load_rejects_empty_build_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bisect.toml");
        fs::write(&path, "build_command = []\n").expect("write");
        let err = load_file_config(Some(&path)).expect_err("invalid");
        assert!(matches!(err, BisectError::Config(_)));
    }

    #[test]
    fn resolve_expands_default_layout() {
        let cfg = BisectConfig::resolve(
            Some(PathBuf::from("/src")),
            Some(PathBuf::from("/work")),
            FileConfig::default(),
        )
        .expect("resolve");
        assert_eq!(cfg.repo_dir, PathBuf::from("/src/llvm-project"));
        assert_eq!(cfg.checkout_command, vec!["bash", "/src/checkout_llvm.sh"]);
        assert_eq!(
            cfg.build_command,
            vec!["ninja", "-C", "/work/llvm-stage2", "install"]
        );
    }

    #[test]
    fn resolve_requires_src() {
        let err = BisectConfig::resolve(None, Some(PathBuf::from("/work")), FileConfig::default())
            .expect_err("missing src");
        assert!(err.to_string().contains("SRC"));
    }

    #[test]
    fn resolve_requires_work() {
        let err = BisectConfig::resolve(Some(PathBuf::from("/src")), None, FileConfig::default())
            .expect_err("missing work");
        assert!(err.to_string().contains("WORK"));
    }
}
