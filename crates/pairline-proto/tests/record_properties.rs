//! Property-based tests for wire record encoding/decoding
//!
//! Verifies that the line codec is lossless for every record it can produce
//! and that the decoder never panics, whatever a peer sends.

use pairline_proto::{CodecError, WireRecord};
use proptest::prelude::*;

/// Strategy for generating arbitrary records (cipher messages are never empty
/// on the wire)
fn arbitrary_record() -> impl Strategy<Value = WireRecord> {
    prop_oneof![
        (any::<i64>(), any::<i64>()).prop_map(|(e, n)| WireRecord::KeyAnnouncement { e, n }),
        prop::collection::vec(any::<i64>(), 1..64)
            .prop_map(|values| WireRecord::CipherMessage { values }),
    ]
}

#[test]
fn prop_record_encode_decode_roundtrip() {
    proptest!(|(record in arbitrary_record())| {
        let line = record.encode();

        let decoded = WireRecord::decode(&line);

        prop_assert_eq!(decoded, Ok(Some(record)));
    });
}

#[test]
fn prop_encoded_record_is_single_line() {
    proptest!(|(record in arbitrary_record())| {
        let line = record.encode();

        prop_assert!(!line.contains('\n'));
        prop_assert!(!line.contains('\r'));
        prop_assert!(!line.contains(' '));
    });
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(line in "\\PC*")| {
        let _ = WireRecord::decode(&line);
    });
}

#[test]
fn prop_decode_tagged_garbage_is_an_error_or_record() {
    proptest!(|(tag in prop_oneof![Just("KEY"), Just("MSG")], body in "[0-9a-z:, -]{0,32}")| {
        let line = format!("{tag}:{body}");

        // Known tags always produce a record or a codec error, never "ignored"
        match WireRecord::decode(&line) {
            Ok(Some(_)) | Err(CodecError::MalformedKey { .. } | CodecError::MalformedMessage { .. }) => {},
            Ok(None) => prop_assert!(false, "known tag ignored: {line:?}"),
        }
    });
}

#[test]
fn prop_unknown_tags_are_ignored() {
    proptest!(|(tag in "[A-Z]{1,6}", body in "[0-9:,]{0,16}")| {
        prop_assume!(tag != "KEY" && tag != "MSG");
        let line = format!("{tag}:{body}");

        prop_assert_eq!(WireRecord::decode(&line), Ok(None));
    });
}
