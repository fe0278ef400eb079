//! Shared helpers for CLI specs

#![allow(dead_code)]

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

pub const MEMORY: &str = "memory://";

pub const FAST_SETTINGS: &str = r#"
[store]
url = "memory://"

[lock]
retry_interval = "10ms"
wake_fallback = "200ms"

[transport]
stream = "kvl:specs"
block_timeout = "50ms"
"#;

/// Scratch directory the CLI runs in
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root
    pub fn file(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// kvl invocation against the memory store
    pub fn kvl(&self) -> Cli {
        let mut cmd = Command::cargo_bin("kvl").unwrap();
        cmd.current_dir(self.dir.path())
            .env("KVL_STORE", MEMORY)
            .env_remove("KVL_LOG");
        Cli { cmd }
    }

    /// kvl invocation with only what the arguments say
    pub fn kvl_bare(&self) -> Cli {
        let mut cmd = Command::cargo_bin("kvl").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("KVL_STORE")
            .env_remove("KVL_LOG");
        Cli { cmd }
    }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Run {
        Run(self.cmd.assert().success())
    }

    pub fn fails(mut self) -> Run {
        Run(self.cmd.assert().failure())
    }

    pub fn exits_with(mut self, code: i32) -> Run {
        Run(self.cmd.assert().code(code))
    }
}

pub struct Run(Assert);

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stderr).into_owned()
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        Run(self.0.stdout(predicate::str::contains(needle)))
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        Run(self.0.stderr(predicate::str::contains(needle)))
    }
}
