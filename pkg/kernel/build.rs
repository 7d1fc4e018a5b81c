use std::path::Path;

fn main() {
    let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/kernel.ld");
    println!("cargo:rerun-if-changed={}", script.display());

    // host builds (tests) link normally
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("none") || target.starts_with("i686-nucleus") {
        println!("cargo:rustc-link-arg-bins=-T{}", script.display());
    }
}
