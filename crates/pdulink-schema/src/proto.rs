//! Wire-level protobuf messages, generated from `proto/pdulink.proto`.

include!(concat!(env!("OUT_DIR"), "/pdulink.rs"));
