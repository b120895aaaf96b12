use exception_stream::{ExceptionNode, TaggedValue};
use time::OffsetDateTime;
use uuid::Uuid;

fn fixed_node() -> ExceptionNode {
    let mut node = ExceptionNode::new("E", "M");
    node.add_resolution("R");
    node.add_debug("K", 3i32);
    node.push_stack_frame("S");

    let context = node.context_mut();
    context.pid = 7;
    context.machine_name = "PC".to_owned();
    context.app_name = "App".to_owned();
    context.user_name = "me".to_owned();
    context.app_version = "1.0".to_owned();
    context.exception_id = Uuid::from_bytes_le([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
    context.exception_time = OffsetDateTime::from_unix_timestamp(1_700_000_000).ok();
    context.file_id = 2;
    context.action_id = -1;
    context.database_server = "db".to_owned();
    context.database_name = String::new();
    context.fps_context = "F".to_owned();
    node
}

#[rustfmt::skip]
const FIXED_HEX: &str = concat!(
    "1F000000", "55434C4944457863657074696F6E204F626A6563742056657273696F6E2032",
    "04000000",
    "0100000045", "010000004D",
    "00",
    "01000000", "0100000052",
    "01000000", "010000004B", "03000000", "03000000",
    "01000000", "0100000053",
    "07000000", "020000005043", "03000000417070", "020000006D65", "03000000312E30",
    "000102030405060708090A0B0C0D0E0F", "00F1536500000000",
    "02000000", "FFFFFFFF", "020000006462", "00000000",
    "0100000046",
);

#[test]
fn ensure_compat() {
    let node = fixed_node();
    let hex = node.to_hex().expect("node should serialize");
    assert_eq!(hex, FIXED_HEX);

    let back = ExceptionNode::from_hex(FIXED_HEX).expect("fixed stream should decode");
    assert_eq!(back, node);
    assert_eq!(back.debug_value("K"), Some(&TaggedValue::Int32(3)));
}

#[test]
fn lowercase_hex_decodes() {
    let node = ExceptionNode::from_hex(&FIXED_HEX.to_ascii_lowercase()).expect("should decode");
    assert_eq!(node, fixed_node());
}
