fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "server")]
    tonic_build::compile_protos("proto/netplan.proto")?;

    println!("cargo:rerun-if-changed=proto/netplan.proto");
    Ok(())
}
