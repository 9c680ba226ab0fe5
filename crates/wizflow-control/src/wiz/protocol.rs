//! setPilot / getPilot codec
//!
//! Outbound requests always carry `"id": 1`; bulbs echo it, but replies are
//! matched by source IP, not id, so nothing correlates on it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use wizflow_core::PilotState;

/// Reply method name for a pilot read.
pub const GET_PILOT: &str = "getPilot";

/// Request method name for a pilot write.
pub const SET_PILOT: &str = "setPilot";

#[derive(Debug, Serialize)]
struct Request<P: Serialize> {
    id: u32,
    method: &'static str,
    params: P,
}

/// Parameters of a `setPilot` request.
///
/// `c` and `w` are only serialized when the bulb actually uses those
/// channels; some firmwares treat an explicit `"c": 0` as a request to mix
/// in zero white rather than ignoring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetPilotParams {
    /// Red, 0-255.
    pub r: u8,
    /// Green, 0-255.
    pub g: u8,
    /// Blue, 0-255.
    pub b: u8,
    /// Cold white, present only when > 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<u8>,
    /// Warm white, present only when > 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u8>,
    /// Brightness, 0-100.
    pub dimming: u8,
    /// Power state.
    pub state: bool,
}

impl From<PilotState> for SetPilotParams {
    fn from(pilot: PilotState) -> Self {
        Self {
            r: pilot.r,
            g: pilot.g,
            b: pilot.b,
            c: (pilot.c > 0).then_some(pilot.c),
            w: (pilot.w > 0).then_some(pilot.w),
            dimming: pilot.dimming,
            state: pilot.state,
        }
    }
}

/// Encode a `setPilot` request datagram for the given pilot vector.
pub fn set_pilot_request(pilot: PilotState) -> Vec<u8> {
    let request = Request {
        id: 1,
        method: SET_PILOT,
        params: SetPilotParams::from(pilot),
    };
    // Serialization of a plain struct cannot fail.
    serde_json::to_vec(&request).expect("setPilot serialization")
}

/// Encode a `getPilot` request datagram.
pub fn get_pilot_request() -> &'static [u8] {
    br#"{"method":"getPilot","params":{}}"#
}

/// Payload of a `getPilot` reply.
///
/// Only the fields the bridge interprets are typed; everything else the
/// firmware reports (scene id, color temperature, firmware version, ...)
/// is retained in `extra` so discovery can expose the full reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PilotResult {
    /// Bulb MAC, present in discovery replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Power state. Absent is treated as off.
    #[serde(default)]
    pub state: bool,
    /// Brightness, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimming: Option<u8>,
    /// Wi-Fi signal strength in dBm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    /// Remaining reply fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    method: String,
    result: PilotResult,
}

/// Decode a `getPilot` reply datagram.
///
/// Returns `None` for malformed JSON, other methods, and error replies;
/// the datagram path never treats bad input as more than a dropped packet.
pub fn parse_get_pilot_reply(datagram: &[u8]) -> Option<PilotResult> {
    let reply: Reply = serde_json::from_slice(datagram).ok()?;
    if reply.method != GET_PILOT {
        return None;
    }
    Some(reply.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_pilot_omits_zero_whites() {
        let pilot = PilotState {
            r: 255,
            g: 0,
            b: 0,
            c: 0,
            w: 0,
            dimming: 100,
            state: true,
        };
        let value: Value = serde_json::from_slice(&set_pilot_request(pilot)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 1,
                "method": "setPilot",
                "params": {"r": 255, "g": 0, "b": 0, "dimming": 100, "state": true}
            })
        );
    }

    #[test]
    fn test_set_pilot_keeps_nonzero_whites() {
        let pilot = PilotState {
            r: 0,
            g: 0,
            b: 0,
            c: 1,
            w: 128,
            dimming: 50,
            state: true,
        };
        let value: Value = serde_json::from_slice(&set_pilot_request(pilot)).unwrap();
        assert_eq!(value["params"]["c"], 1);
        assert_eq!(value["params"]["w"], 128);
    }

    #[test]
    fn test_get_pilot_request_shape() {
        let value: Value = serde_json::from_slice(get_pilot_request()).unwrap();
        assert_eq!(value["method"], "getPilot");
        assert_eq!(value["params"], json!({}));
    }

    #[test]
    fn test_parse_reply() {
        let datagram = br#"{"method":"getPilot","env":"pro","result":{"mac":"a8bb50d1e201","rssi":-60,"state":true,"sceneId":0,"r":255,"g":0,"b":0,"dimming":84}}"#;
        let result = parse_get_pilot_reply(datagram).unwrap();
        assert_eq!(result.mac.as_deref(), Some("a8bb50d1e201"));
        assert!(result.state);
        assert_eq!(result.dimming, Some(84));
        assert_eq!(result.rssi, Some(-60));
        assert_eq!(result.extra["r"], 255);
    }

    #[test]
    fn test_parse_reply_state_defaults_off() {
        let datagram = br#"{"method":"getPilot","result":{"mac":"a8bb50d1e201"}}"#;
        let result = parse_get_pilot_reply(datagram).unwrap();
        assert!(!result.state);
    }

    #[test]
    fn test_parse_rejects_other_methods() {
        assert!(parse_get_pilot_reply(br#"{"method":"setPilot","result":{"success":true}}"#).is_none());
        assert!(parse_get_pilot_reply(br#"{"method":"getPilot","error":{"code":-32601}}"#).is_none());
        assert!(parse_get_pilot_reply(b"not json").is_none());
        assert!(parse_get_pilot_reply(b"").is_none());
    }
}
