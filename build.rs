fn main() {
    println!("cargo:rerun-if-env-changed=VNX_DISCOVERY_VERSION");
}
