//! Build script embedding version information.

use std::process::Command;

fn main() {
    // BOOTI_VERSION wins when set by a release pipeline; local builds fall
    // back to git describe.
    if let Ok(version) = std::env::var("BOOTI_VERSION") {
        println!("cargo:rustc-env=BOOTI_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !version.is_empty() {
            println!("cargo:rustc-env=BOOTI_VERSION={version}");
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=BOOTI_VERSION");
}
