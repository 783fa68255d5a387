use reqwest::Method;

/// The fixed set of backend endpoints the console talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GetServices,
    GetRules,
    UpsertService,
    DeleteService,
    CreateRule,
    UpdateRule,
    DeleteRule,
    DeleteServiceToRules,
    GetLastStreams,
    GetStreamsByServiceIds,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::GetServices | Endpoint::GetRules => Method::GET,
            Endpoint::UpsertService
            | Endpoint::CreateRule
            | Endpoint::GetLastStreams
            | Endpoint::GetStreamsByServiceIds => Method::POST,
            Endpoint::UpdateRule => Method::PUT,
            Endpoint::DeleteService | Endpoint::DeleteRule | Endpoint::DeleteServiceToRules => {
                Method::DELETE
            }
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::GetServices => "/get-services",
            Endpoint::GetRules => "/get-rules",
            Endpoint::UpsertService => "/upsert-service",
            Endpoint::DeleteService => "/delete-service",
            Endpoint::CreateRule => "/create-rule",
            Endpoint::UpdateRule => "/update-rule",
            Endpoint::DeleteRule => "/delete-rule",
            Endpoint::DeleteServiceToRules => "/delete-service-to-rules",
            Endpoint::GetLastStreams => "/get-last-streams",
            Endpoint::GetStreamsByServiceIds => "/get-streams-by-service-ids",
        }
    }

    /// Full URL of this endpoint under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}
