fn main() {
    println!("cargo:rerun-if-changed=proto/relay.proto");
    println!("cargo:rerun-if-changed=proto/matrix.proto");
    tonic_prost_build::configure()
        .compile_protos(&["proto/relay.proto", "proto/matrix.proto"], &["proto/"])
        .expect("Failed to compile proto/relay.proto and proto/matrix.proto");
}
