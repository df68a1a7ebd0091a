//! Wire records and their line encoding.
//!
//! Every record occupies exactly one line of the stream. The first `:`
//! separates the record tag from its body:
//!
//! ```text
//! KEY:<e>:<n>             announce public key (e, n)
//! MSG:<v0>,<v1>,...,<vk>  ciphertext as a list of integers
//! ```
//!
//! Lines with any other tag are ignored so that newer peers can introduce
//! record types without breaking older ones.

use std::fmt;

use crate::errors::{CodecError, Result};

/// Tag of the key announcement record.
pub const KEY_TAG: &str = "KEY";

/// Tag of the encrypted message record.
pub const MSG_TAG: &str = "MSG";

/// One decoded line of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireRecord {
    /// Sender's public key.
    KeyAnnouncement {
        /// Public exponent
        e: i64,
        /// Modulus
        n: i64,
    },

    /// Ciphertext encrypted under the receiver's public key.
    CipherMessage {
        /// Ciphertext values in order
        values: Vec<i64>,
    },
}

impl WireRecord {
    /// Encode into a single line, without the trailing newline.
    ///
    /// The output never contains `\n` or `\r`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode a single line.
    ///
    /// A trailing `\r` is stripped. Returns `Ok(None)` for lines whose tag is
    /// neither `KEY` nor `MSG`.
    ///
    /// # Errors
    ///
    /// - `CodecError::MalformedKey` if a `KEY` line does not carry exactly two
    ///   integer fields
    /// - `CodecError::MalformedMessage` if any `MSG` field fails to parse
    pub fn decode(line: &str) -> Result<Option<Self>> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let Some((tag, body)) = line.split_once(':') else {
            return Ok(None);
        };

        match tag {
            KEY_TAG => decode_key(body).map(Some),
            MSG_TAG => decode_message(body).map(Some),
            _ => Ok(None),
        }
    }
}

fn decode_key(body: &str) -> Result<WireRecord> {
    let fields: Vec<&str> = body.split(':').collect();

    let [e, n] = fields.as_slice() else {
        return Err(CodecError::key(format!("expected 2 fields, got {}", fields.len())));
    };

    let e = e.parse::<i64>().map_err(|err| CodecError::key(format!("exponent {e:?}: {err}")))?;
    let n = n.parse::<i64>().map_err(|err| CodecError::key(format!("modulus {n:?}: {err}")))?;

    Ok(WireRecord::KeyAnnouncement { e, n })
}

fn decode_message(body: &str) -> Result<WireRecord> {
    let values = body
        .split(',')
        .enumerate()
        .map(|(index, field)| {
            let field = field.trim();
            field
                .parse::<i64>()
                .map_err(|err| CodecError::message(format!("field {index} ({field:?}): {err}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(WireRecord::CipherMessage { values })
}

impl fmt::Display for WireRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyAnnouncement { e, n } => write!(f, "{KEY_TAG}:{e}:{n}"),
            Self::CipherMessage { values } => {
                write!(f, "{MSG_TAG}:")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_key_announcement() {
        let record = WireRecord::KeyAnnouncement { e: 17, n: 221 };
        assert_eq!(record.encode(), "KEY:17:221");
    }

    #[test]
    fn encode_cipher_message() {
        let record = WireRecord::CipherMessage { values: vec![104, 0, 93] };
        assert_eq!(record.encode(), "MSG:104,0,93");
    }

    #[test]
    fn encode_single_value_has_no_trailing_comma() {
        let record = WireRecord::CipherMessage { values: vec![7] };
        assert_eq!(record.encode(), "MSG:7");
    }

    #[test]
    fn decode_key_announcement() {
        let record = WireRecord::decode("KEY:19:187").unwrap();
        assert_eq!(record, Some(WireRecord::KeyAnnouncement { e: 19, n: 187 }));
    }

    #[test]
    fn decode_key_keeps_sign_for_state_machine() {
        let record = WireRecord::decode("KEY:0:5").unwrap();
        assert_eq!(record, Some(WireRecord::KeyAnnouncement { e: 0, n: 5 }));

        let record = WireRecord::decode("KEY:-3:5").unwrap();
        assert_eq!(record, Some(WireRecord::KeyAnnouncement { e: -3, n: 5 }));
    }

    #[test]
    fn decode_key_wrong_field_count() {
        for line in ["KEY:", "KEY:1", "KEY:1:2:3", "KEY::"] {
            let result = WireRecord::decode(line);
            assert!(
                matches!(result, Err(CodecError::MalformedKey { .. })),
                "{line:?} should be malformed, got {result:?}"
            );
        }
    }

    #[test]
    fn decode_key_non_integer() {
        let result = WireRecord::decode("KEY:abc:5");
        assert!(matches!(result, Err(CodecError::MalformedKey { .. })));

        let result = WireRecord::decode("KEY:5: 7");
        assert!(matches!(result, Err(CodecError::MalformedKey { .. })));
    }

    #[test]
    fn decode_message_trims_fields() {
        let record = WireRecord::decode("MSG: 1, 2 ,3").unwrap();
        assert_eq!(record, Some(WireRecord::CipherMessage { values: vec![1, 2, 3] }));
    }

    #[test]
    fn decode_message_rejects_bad_field() {
        for line in ["MSG:", "MSG:1,,2", "MSG:1,2,", "MSG:1,x"] {
            let result = WireRecord::decode(line);
            assert!(
                matches!(result, Err(CodecError::MalformedMessage { .. })),
                "{line:?} should be malformed, got {result:?}"
            );
        }
    }

    #[test]
    fn decode_ignores_unknown_tags() {
        assert_eq!(WireRecord::decode("PING:1").unwrap(), None);
        assert_eq!(WireRecord::decode("KEYS:1:2").unwrap(), None);
        assert_eq!(WireRecord::decode("hello there").unwrap(), None);
        assert_eq!(WireRecord::decode("").unwrap(), None);
    }

    #[test]
    fn decode_strips_carriage_return() {
        let record = WireRecord::decode("KEY:3:323\r").unwrap();
        assert_eq!(record, Some(WireRecord::KeyAnnouncement { e: 3, n: 323 }));
    }

    #[test]
    fn tag_is_case_sensitive() {
        assert_eq!(WireRecord::decode("key:3:323").unwrap(), None);
    }
}
