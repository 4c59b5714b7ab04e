//! Payload decoding by response code

use serde::{Deserialize, Serialize};

use super::codes;

/// Number of values in a joint or pose tuple
pub const POSITION_FIELDS: usize = 6;

/// Decoded reply payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Floats(Vec<f64>),
    Ints(Vec<i64>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Value::Floats(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Value::Ints(values) => Some(values),
            _ => None,
        }
    }

    /// True for an empty tuple (malformed numeric payload) or empty text
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(text) => text.is_empty(),
            Value::Floats(values) => values.is_empty(),
            Value::Ints(values) => values.is_empty(),
        }
    }
}

/// How a code's payload is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    /// Status or configuration integers
    Ints,
    /// Six-value joint or pose tuple, optionally preceded by a timestamp
    Position,
    /// Free-length float tuple
    Floats,
    Text,
}

fn payload_kind(code: u32) -> PayloadKind {
    match code {
        codes::ROBOT_STATUS | codes::GRIPPER_STATUS | codes::CONFIGURATION => PayloadKind::Ints,
        codes::JOINTS
        | codes::POSE
        | codes::LEGACY_JOINTS
        | codes::LEGACY_CARTESIAN
        | codes::STREAM_JOINTS
        | codes::STREAM_CARTESIAN
        | codes::STREAM_JOINT_VELOCITY
        | codes::STREAM_TORQUE_RATIO => PayloadKind::Position,
        codes::STREAM_ACCELEROMETER => PayloadKind::Floats,
        _ => PayloadKind::Text,
    }
}

/// Decode a raw bracketed message such as `[2026][1,2,3,4,5,6]\0`
pub fn decode(raw_message: &str, code: u32) -> Value {
    let prefix = format!("[{}][", code);
    let cleaned = raw_message
        .replace(&prefix, "")
        .replace(']', "")
        .replace('\0', "");

    decode_payload(code, &cleaned)
}

/// Decode an already unbracketed payload
pub fn decode_payload(code: u32, payload: &str) -> Value {
    let payload = payload.trim_matches('\0');
    match payload_kind(code) {
        PayloadKind::Ints => Value::Ints(parse_fields(payload).unwrap_or_default()),
        PayloadKind::Position => Value::Floats(parse_position(payload)),
        PayloadKind::Floats => Value::Floats(parse_fields(payload).unwrap_or_default()),
        PayloadKind::Text => Value::Text(payload.to_string()),
    }
}

fn parse_fields<T: std::str::FromStr>(payload: &str) -> Option<Vec<T>> {
    payload
        .split(',')
        .map(|field| field.trim().parse::<T>().ok())
        .collect()
}

/// Six values as is; seven drop the leading timestamp; anything else is empty
fn parse_position(payload: &str) -> Vec<f64> {
    let fields: Vec<&str> = payload.split(',').collect();
    let values = match fields.len() {
        POSITION_FIELDS => &fields[..],
        n if n == POSITION_FIELDS + 1 => &fields[1..],
        _ => return Vec::new(),
    };

    values
        .iter()
        .map(|field| field.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_joints_reply() {
        let value = decode("[2026][10.0,20.0,30.0,40.0,50.0,60.0]\0", 2026);
        assert_eq!(value, Value::Floats(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]));
    }

    #[test]
    fn test_seven_fields_drop_timestamp() {
        let value = decode_payload(2210, "123456,1.0,2.0,3.0,4.0,5.0,6.0");
        assert_eq!(value, Value::Floats(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_wrong_field_count_is_empty() {
        assert_eq!(decode_payload(2027, "1.0,2.0,3.0,4.0,5.0"), Value::Floats(vec![]));
        assert_eq!(decode_payload(2027, "1,2,3,4,5,6,7,8"), Value::Floats(vec![]));
        assert_eq!(decode_payload(2026, ""), Value::Floats(vec![]));
    }

    #[test]
    fn test_unparsable_position_is_empty() {
        assert_eq!(decode_payload(2026, "1.0,2.0,x,4.0,5.0,6.0"), Value::Floats(vec![]));
    }

    #[test]
    fn test_status_codes_decode_to_ints() {
        assert_eq!(
            decode("[2007][1,0,0,0,0,1,1]", 2007),
            Value::Ints(vec![1, 0, 0, 0, 0, 1, 1])
        );
        assert_eq!(decode_payload(2079, "1,1,0,0,0,0"), Value::Ints(vec![1, 1, 0, 0, 0, 0]));
        assert_eq!(decode_payload(2029, "1,-1,1"), Value::Ints(vec![1, -1, 1]));
        assert_eq!(decode_payload(2007, "1,a"), Value::Ints(vec![]));
    }

    #[test]
    fn test_other_codes_pass_text_through() {
        assert_eq!(
            decode("[2000][Motors activated.]\0", 2000),
            Value::Text("Motors activated.".to_string())
        );
        assert_eq!(
            decode("[1005][The robot is not homed.]", 1005),
            Value::Text("The robot is not homed.".to_string())
        );
    }

    #[test]
    fn test_accelerometer_keeps_all_fields() {
        assert_eq!(
            decode_payload(2220, "5000,5,-12,8,16000"),
            Value::Floats(vec![5000.0, 5.0, -12.0, 8.0, 16000.0])
        );
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let raw = "[2027][190.0,0.0,308.0,0.0,90.0,0.0]\0";
        assert_eq!(decode(raw, 2027), decode(raw, 2027));
    }

    #[test]
    fn test_value_accessors() {
        let value = Value::Ints(vec![1, 2]);
        assert_eq!(value.as_ints(), Some(&[1, 2][..]));
        assert!(value.as_floats().is_none());
        assert!(Value::Floats(vec![]).is_empty());
        assert_eq!(Value::Text("ok".into()).as_text(), Some("ok"));
    }
}
