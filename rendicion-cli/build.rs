use std::env;
use std::path::Path;
use std::process::Command;

const SHA_VAR: &str = "RENDICION_BUILD_SHA";

/// Short commit of the workspace, or None outside a git checkout.
fn git_short_sha(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8(out.stdout).ok()?;
    let sha = sha.trim();
    (!sha.is_empty()).then(|| sha.to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed={SHA_VAR}");

    // Release tarballs have no .git; packagers pass the commit in.
    let sha = match env::var(SHA_VAR) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => {
            let manifest = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
            let workspace = Path::new(&manifest).join("..");
            println!("cargo:rerun-if-changed={}", workspace.join(".git/HEAD").display());
            git_short_sha(&workspace).unwrap_or_else(|| "dev".into())
        }
    };

    println!("cargo:rustc-env={SHA_VAR}={sha}");
}
