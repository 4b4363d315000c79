fn main() {
    println!("cargo:rerun-if-env-changed=POOLPROBE_VERSION");
}
