//! Protobuf definitions shared by the relay server, the communicator and the
//! matrix strategies.

pub mod relay {
    tonic::include_proto!("relay");
}

pub mod matrix {
    tonic::include_proto!("matrix");
}
