use std::sync::Arc;

use log::{debug, info};

use crate::api::types::{DeleteRuleRequest, PacketDirection, Rule, RuleRequest};
use crate::api::Api;
use crate::error_handling::types::{EditorError, TransportError, ValidationError};
use crate::notification::{Notifier, Toast};

/// Editable state of a rule. `id == 0` means the rule has not been created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleForm {
    pub id: i64,
    pub name: String,
    pub packet_direction: Option<PacketDirection>,
    pub regexp: String,
    pub color: String,
}

impl RuleForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Checks the form and builds the request body.
    ///
    /// The pattern is compiled with `regex::bytes`, the dialect the backend
    /// matches raw payloads with, so a rule accepted here will not be refused
    /// for its syntax.
    pub fn validate(&self) -> Result<RuleRequest, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.color.trim().is_empty() {
            return Err(ValidationError::MissingField("color"));
        }
        let packet_direction = self
            .packet_direction
            .ok_or(ValidationError::MissingField("packet_direction"))?;
        if self.regexp.is_empty() {
            return Err(ValidationError::MissingField("regexp"));
        }
        regex::bytes::Regex::new(&self.regexp)
            .map_err(|e| ValidationError::InvalidPattern(e.to_string()))?;

        Ok(RuleRequest {
            id: self.id,
            name: self.name.trim().to_string(),
            packet_direction,
            regexp: self.regexp.clone(),
            color: self.color.trim().to_string(),
        })
    }
}

impl From<&Rule> for RuleForm {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id,
            name: rule.name.clone(),
            packet_direction: Some(rule.packet_direction),
            regexp: rule.regexp.clone(),
            color: rule.color.clone(),
        }
    }
}

pub struct RuleEditor {
    api: Arc<dyn Api>,
    notifier: Arc<dyn Notifier>,
}

impl RuleEditor {
    pub fn new(api: Arc<dyn Api>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Creates the rule when the form is new, updates it otherwise.
    pub async fn submit(&self, form: &RuleForm) -> Result<(), EditorError> {
        let request = form.validate()?;
        let result = if form.is_new() {
            debug!("Creating rule {}", request.name);
            self.api.create_rule(&request).await
        } else {
            debug!("Updating rule {}", request.id);
            self.api.update_rule(&request).await
        };
        self.report(result)?;
        info!("Rule {} saved", request.name);
        Ok(())
    }

    pub async fn delete(&self, form: &RuleForm) -> Result<(), EditorError> {
        if form.is_new() {
            return Err(ValidationError::NotPersisted.into());
        }
        let result = self
            .api
            .delete_rule(&DeleteRuleRequest { rule_id: form.id })
            .await;
        self.report(result)?;
        info!("Rule {} deleted", form.id);
        Ok(())
    }

    fn report<T>(&self, result: Result<T, TransportError>) -> Result<T, EditorError> {
        match result {
            Ok(value) => {
                self.notifier.notify(Toast::success());
                Ok(value)
            }
            Err(e) => {
                self.notifier.notify(Toast::error(e.user_message()));
                Err(e.into())
            }
        }
    }
}
