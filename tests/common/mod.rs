use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A throwaway repository; the binary runs with it as working directory.
pub struct Repo {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl Repo {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().canonicalize().expect("canonical temp dir");
        let repo = Self { _tmp: tmp, root };
        for (path, text) in files {
            repo.write(path, text);
        }
        repo
    }

    pub fn write(&self, path: &str, text: &str) {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(full, text).expect("write fixture file");
    }

    pub fn path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// `check-links` in the repository root.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("check-links");
        cmd.current_dir(&self.root).env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--offline`, expect `code`, return stdout.
    pub fn stdout(&self, args: &[&str], code: i32) -> String {
        let out = self
            .cmd()
            .arg("--offline")
            .args(args)
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        String::from_utf8(out).expect("utf-8 stdout")
    }
}
