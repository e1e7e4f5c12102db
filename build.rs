//! Build script stamping the binary with its source revision
//!
//! `GIT_HASH` is the short commit, suffixed `-dirty` when the work tree has
//! uncommitted changes. Builds outside a checkout (release tarballs) can set
//! `PARKING_BUILD_REV` instead; without either the stamp is `unknown`.

use std::process::Command;

const REV_OVERRIDE: &str = "PARKING_BUILD_REV";

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn source_revision() -> String {
    if let Ok(rev) = std::env::var(REV_OVERRIDE) {
        if !rev.trim().is_empty() {
            return rev.trim().to_string();
        }
    }

    match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|status| !status.is_empty());
            if dirty {
                format!("{hash}-dirty")
            } else {
                hash
            }
        }
        None => "unknown".to_string(),
    }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", source_revision());
    println!("cargo:rerun-if-env-changed={REV_OVERRIDE}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
