//! Request and response records of the backend REST API.
//!
//! Field names follow the JSON contract exactly; every record derives both
//! `Serialize` and `Deserialize` so the same types back the client, the local
//! dashboard and the in-process test backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a packet relative to the monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketDirection {
    /// Towards the service.
    #[serde(rename = "IN")]
    In,
    /// From the service back to the peer.
    #[serde(rename = "OUT")]
    Out,
}

impl PacketDirection {
    pub const ALL: [PacketDirection; 2] = [PacketDirection::In, PacketDirection::Out];

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketDirection::In => "IN",
            PacketDirection::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<PacketDirection> {
        match s {
            "IN" => Some(PacketDirection::In),
            "OUT" => Some(PacketDirection::Out),
            _ => None,
        }
    }
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    pub packet_direction: PacketDirection,
    pub regexp: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceWithRules {
    pub service: Service,
    /// Missing or `null` on the wire when the service carries no rule.
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
}

impl ServiceWithRules {
    pub fn rules(&self) -> &[Rule] {
        self.rules.as_deref().unwrap_or(&[])
    }
}

/// One payload segment; `color` is the color of the rule match covering the
/// text, empty for unmatched text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextWithColor {
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub payload: Vec<TextWithColor>,
    pub direction: PacketDirection,
    pub at: String,
}

impl Packet {
    /// Payload text with the highlighting dropped.
    pub fn text(&self) -> String {
        self.payload.iter().map(|segment| segment.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: i64,
    pub service_name: String,
    pub service_port: u16,
    #[serde(default)]
    pub rules: Vec<Rule>,
    pub started_at: String,
    /// Absent or `null` while the stream is still open.
    #[serde(default)]
    pub ended_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamWithPackets {
    pub stream: Stream,
    #[serde(default)]
    pub packets: Vec<Packet>,
}

impl StreamWithPackets {
    pub fn id(&self) -> i64 {
        self.stream.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetServicesResponse {
    pub services_with_rules: Vec<ServiceWithRules>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRulesResponse {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertServiceRequestService {
    /// `None` creates a new service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertServiceRequest {
    pub service: UpsertServiceRequestService,
    pub rule_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteServiceRequest {
    pub service_id: i64,
}

/// Body of both `/create-rule` and `/update-rule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRequest {
    pub id: i64,
    pub name: String,
    pub packet_direction: PacketDirection,
    pub regexp: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRuleRequest {
    pub rule_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteServiceToRulesRequest {
    pub service_id: i64,
    pub rule_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetLastStreamsRequest {
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetStreamsByServiceIdsRequest {
    pub service_ids: Vec<i64>,
    pub last_stream_id: i64,
}

/// Response of both stream endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamsResponse {
    pub stream_with_packets: Vec<StreamWithPackets>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_tolerates_missing_and_null_end() {
        let open: Stream = serde_json::from_str(
            r#"{"id":7,"service_name":"web","service_port":8080,"rules":[],"started_at":"13:00:12"}"#,
        )
        .unwrap();
        assert_eq!(open.ended_at, None);

        let null_end: Stream = serde_json::from_str(
            r#"{"id":7,"service_name":"web","service_port":8080,"rules":[],"started_at":"a","ended_at":null}"#,
        )
        .unwrap();
        assert_eq!(null_end.ended_at, None);
    }

    #[test]
    fn service_rules_are_optional_on_the_wire() {
        let resp: GetServicesResponse = serde_json::from_str(
            r##"{"services_with_rules":[
                {"service":{"id":1,"name":"a","port":1}},
                {"service":{"id":2,"name":"b","port":2},"rules":null},
                {"service":{"id":3,"name":"c","port":3},"rules":[
                    {"id":9,"name":"flag","packet_direction":"OUT","regexp":"FLAG","color":"#f00"}
                ]}
            ]}"##,
        )
        .unwrap();
        assert!(resp.services_with_rules[0].rules().is_empty());
        assert!(resp.services_with_rules[1].rules().is_empty());
        assert_eq!(
            resp.services_with_rules[2].rules()[0].packet_direction,
            PacketDirection::Out
        );
    }

    #[test]
    fn new_service_is_sent_without_id() {
        let req = UpsertServiceRequest {
            service: UpsertServiceRequestService {
                id: None,
                name: "web".to_string(),
                port: 8080,
            },
            rule_ids: vec![1, 2],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"service": {"name": "web", "port": 8080}, "rule_ids": [1, 2]})
        );
    }

    #[test]
    fn packet_text_concatenates_segments() {
        let packet = Packet {
            payload: vec![
                TextWithColor {
                    text: "GET /".to_string(),
                    color: String::new(),
                },
                TextWithColor {
                    text: "FLAG==".to_string(),
                    color: "#ff0000".to_string(),
                },
            ],
            direction: PacketDirection::In,
            at: "13:00:12".to_string(),
        };
        assert_eq!(packet.text(), "GET /FLAG==");
    }

    #[test]
    fn unknown_direction_is_rejected() {
        assert_eq!(PacketDirection::parse("IN"), Some(PacketDirection::In));
        assert_eq!(PacketDirection::parse("SIDEWAYS"), None);
        assert!(serde_json::from_str::<PacketDirection>(r#""SIDEWAYS""#).is_err());
    }
}
