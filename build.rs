fn main() {
    let mut config = capnpc::CompilerCommand::new();
    config.file("proto/envelope.capnp");

    config.run().expect("Cap'n Proto compilation failed");
}
