use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::TempDir;

/// Passphrase used by the CLI tests
#[allow(dead_code)]
pub const PASSPHRASE: &str = "correct horse battery staple";

/// Create a new temporary git repository with user config set.
pub fn create_git_repo() -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");

    git(temp.path(), &["init"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["config", "user.name", "Test User"]);

    temp
}

/// Run git in `dir`, returning stdout. Panics on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> Vec<u8> {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

/// Convenience helper for spawning the grypt binary via assert_cmd.
/// Settings from the environment are cleared so tests are isolated.
#[allow(dead_code)]
pub fn grypt_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("grypt");
    cmd.env_remove("GRYPT_KEYRING")
        .env_remove("GRYPT_SCHEME")
        .env_remove("GRYPT_PASSWORD")
        .env_remove("GRYPT_LOG");
    cmd
}

/// Absolute path to the grypt test binary.
#[allow(dead_code)]
pub fn grypt_bin() -> &'static str {
    env!("CARGO_BIN_EXE_grypt")
}

/// Generate a passphrase key for `keyring` in the repository at `dir`.
#[allow(dead_code)]
pub fn generate_key(dir: &Path, keyring: &str, scheme: &str) {
    grypt_cmd()
        .args(["generate-key", "--keyring", keyring, "--scheme", scheme])
        .args(["--password", PASSPHRASE])
        .current_dir(dir)
        .assert()
        .success();
}
