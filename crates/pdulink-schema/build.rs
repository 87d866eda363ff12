fn main() {
    let protoc = protoc_bin_vendored::protoc_bin_path().expect("failed to locate protoc");
    std::env::set_var("PROTOC", protoc);

    println!("cargo:rerun-if-changed=proto/pdulink.proto");
    println!("cargo:rerun-if-changed=proto");

    prost_build::Config::new()
        .compile_protos(&["proto/pdulink.proto"], &["proto"])
        .expect("failed to compile protobuf definitions");
}
