//! In-memory [`Api`] used by the unit tests of the feed, scheduler, editors and
//! dashboard.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::client::Api;
use super::types::*;
use crate::error_handling::types::TransportError;

type StreamsResult = Result<StreamsResponse, TransportError>;

enum Scripted {
    Ready(StreamsResult),
    Gated(oneshot::Receiver<StreamsResult>),
}

impl Scripted {
    async fn resolve(next: Option<Scripted>) -> StreamsResult {
        match next {
            None => Ok(StreamsResponse::default()),
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".to_string()))),
        }
    }
}

/// Every request the fake received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetServices,
    GetRules,
    UpsertService(UpsertServiceRequest),
    DeleteService(DeleteServiceRequest),
    CreateRule(RuleRequest),
    UpdateRule(RuleRequest),
    DeleteRule(DeleteRuleRequest),
    DeleteServiceToRules(DeleteServiceToRulesRequest),
    GetLastStreams(GetLastStreamsRequest),
    GetStreamsByServiceIds(GetStreamsByServiceIdsRequest),
}

#[derive(Default)]
pub struct ScriptedApi {
    services: Mutex<Option<Result<GetServicesResponse, TransportError>>>,
    rules: Mutex<Option<Result<GetRulesResponse, TransportError>>>,
    last_streams: Mutex<VecDeque<Scripted>>,
    increments: Mutex<VecDeque<Scripted>>,
    write_failure: Mutex<Option<TransportError>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_services(&self, services: Result<GetServicesResponse, TransportError>) {
        *self.services.lock().unwrap() = Some(services);
    }

    pub fn set_rules(&self, rules: Result<GetRulesResponse, TransportError>) {
        *self.rules.lock().unwrap() = Some(rules);
    }

    pub fn push_last_streams(&self, result: StreamsResult) {
        self.last_streams
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(result));
    }

    pub fn push_increment(&self, result: StreamsResult) {
        self.increments
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(result));
    }

    /// Queues an increment whose response is delivered later through the
    /// returned sender.
    pub fn push_gated_increment(&self) -> oneshot::Sender<StreamsResult> {
        let (tx, rx) = oneshot::channel();
        self.increments.lock().unwrap().push_back(Scripted::Gated(rx));
        tx
    }

    /// Same as [`ScriptedApi::push_gated_increment`] for the initial load.
    pub fn push_gated_last_streams(&self) -> oneshot::Sender<StreamsResult> {
        let (tx, rx) = oneshot::channel();
        self.last_streams
            .lock()
            .unwrap()
            .push_back(Scripted::Gated(rx));
        tx
    }

    pub fn fail_writes(&self, err: TransportError) {
        *self.write_failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn increment_calls(&self) -> Vec<GetStreamsByServiceIdsRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::GetStreamsByServiceIds(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_result(&self) -> Result<(), TransportError> {
        match self.write_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Api for ScriptedApi {
    async fn get_services(&self) -> Result<GetServicesResponse, TransportError> {
        self.record(Call::GetServices);
        self.services
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(GetServicesResponse::default()))
    }

    async fn get_rules(&self) -> Result<GetRulesResponse, TransportError> {
        self.record(Call::GetRules);
        self.rules
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(GetRulesResponse::default()))
    }

    async fn upsert_service(&self, req: &UpsertServiceRequest) -> Result<(), TransportError> {
        self.record(Call::UpsertService(req.clone()));
        self.write_result()
    }

    async fn delete_service(&self, req: &DeleteServiceRequest) -> Result<(), TransportError> {
        self.record(Call::DeleteService(req.clone()));
        self.write_result()
    }

    async fn create_rule(&self, req: &RuleRequest) -> Result<(), TransportError> {
        self.record(Call::CreateRule(req.clone()));
        self.write_result()
    }

    async fn update_rule(&self, req: &RuleRequest) -> Result<(), TransportError> {
        self.record(Call::UpdateRule(req.clone()));
        self.write_result()
    }

    async fn delete_rule(&self, req: &DeleteRuleRequest) -> Result<(), TransportError> {
        self.record(Call::DeleteRule(req.clone()));
        self.write_result()
    }

    async fn delete_service_to_rules(
        &self,
        req: &DeleteServiceToRulesRequest,
    ) -> Result<(), TransportError> {
        self.record(Call::DeleteServiceToRules(req.clone()));
        self.write_result()
    }

    async fn get_last_streams(&self, req: &GetLastStreamsRequest) -> StreamsResult {
        self.record(Call::GetLastStreams(req.clone()));
        let next = self.last_streams.lock().unwrap().pop_front();
        Scripted::resolve(next).await
    }

    async fn get_streams_by_service_ids(
        &self,
        req: &GetStreamsByServiceIdsRequest,
    ) -> StreamsResult {
        self.record(Call::GetStreamsByServiceIds(req.clone()));
        let next = self.increments.lock().unwrap().pop_front();
        Scripted::resolve(next).await
    }
}

pub fn rule(id: i64, name: &str) -> Rule {
    Rule {
        id,
        name: name.to_string(),
        packet_direction: PacketDirection::Out,
        regexp: format!("{}=+", name.to_uppercase()),
        color: "#ff0000".to_string(),
    }
}

pub fn service(id: i64, name: &str, port: u16, rules: Vec<Rule>) -> ServiceWithRules {
    ServiceWithRules {
        service: Service {
            id,
            name: name.to_string(),
            port,
        },
        rules: Some(rules),
    }
}

pub fn stream(id: i64) -> StreamWithPackets {
    StreamWithPackets {
        stream: Stream {
            id,
            service_name: "web".to_string(),
            service_port: 8080,
            rules: vec![rule(1, "flag")],
            started_at: format!("2024-05-19 13:{:02}:00 UTC", id % 60),
            ended_at: None,
        },
        packets: vec![
            Packet {
                payload: vec![TextWithColor {
                    text: format!("GET /stream/{} HTTP/1.1", id),
                    color: String::new(),
                }],
                direction: PacketDirection::In,
                at: "13:00:12".to_string(),
            },
            Packet {
                payload: vec![
                    TextWithColor {
                        text: "HTTP/1.1 200 OK\n\n".to_string(),
                        color: String::new(),
                    },
                    TextWithColor {
                        text: "FLAG==".to_string(),
                        color: "#ff0000".to_string(),
                    },
                ],
                direction: PacketDirection::Out,
                at: "13:00:13".to_string(),
            },
        ],
    }
}

pub fn batch(ids: &[i64]) -> StreamsResponse {
    StreamsResponse {
        stream_with_packets: ids.iter().map(|id| stream(*id)).collect(),
    }
}
