use chrono::Datelike;
fn main() {
    let now = chrono::Utc::now().date_naive();
    println!("cargo:rustc-env=BUILD_YEAR={}", now.year());
    println!("cargo:rustc-env=BUILD_MONTH={:02}", now.month());
    println!("cargo:rustc-env=BUILD_DAY={:02}", now.day());
    println!("cargo:rerun-if-changed=build.rs");
}
