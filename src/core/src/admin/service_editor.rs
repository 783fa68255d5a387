use std::sync::Arc;

use log::{debug, info};

use crate::api::types::{
    DeleteServiceRequest, DeleteServiceToRulesRequest, Rule, ServiceWithRules,
    UpsertServiceRequest, UpsertServiceRequestService,
};
use crate::api::Api;
use crate::error_handling::types::{EditorError, TransportError, ValidationError};
use crate::notification::{Notifier, Toast};

/// A known rule and whether the edited service should carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleWithChecked {
    pub rule: Rule,
    pub checked: bool,
}

/// Editable state of a service and of its rule attachments.
///
/// Attachment changes are not applied to the backend as they are toggled;
/// they accumulate in two pending lists that [`ServiceEditor::submit`] sends
/// after the service itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceForm {
    /// `0` for a service that has not been created.
    pub id: i64,
    pub name: String,
    pub port: u16,
    pub rules: Vec<RuleWithChecked>,
    rules_to_attach: Vec<i64>,
    rules_to_detach: Vec<i64>,
    attached: Vec<i64>,
}

impl ServiceForm {
    /// Empty form offering every known rule, none checked.
    pub fn new(all_rules: &[Rule]) -> Self {
        Self {
            rules: all_rules
                .iter()
                .map(|rule| RuleWithChecked {
                    rule: rule.clone(),
                    checked: false,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Form for an existing service. A rule is checked when the service
    /// carries a rule with the same id, name, pattern and color; a rule edited
    /// since it was attached therefore shows unchecked.
    pub fn edit(existing: &ServiceWithRules, all_rules: &[Rule]) -> Self {
        let carried = existing.rules();
        let rules = all_rules
            .iter()
            .map(|rule| RuleWithChecked {
                rule: rule.clone(),
                checked: carried.iter().any(|c| {
                    c.id == rule.id
                        && c.name == rule.name
                        && c.regexp == rule.regexp
                        && c.color == rule.color
                }),
            })
            .collect();

        Self {
            id: existing.service.id,
            name: existing.service.name.clone(),
            port: existing.service.port,
            rules,
            rules_to_attach: Vec::new(),
            rules_to_detach: Vec::new(),
            attached: carried.iter().map(|r| r.id).collect(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Toggles a rule. Returns `false` when the rule is not offered by the form.
    pub fn set_rule_checked(&mut self, rule_id: i64, checked: bool) -> bool {
        let Some(entry) = self.rules.iter_mut().find(|r| r.rule.id == rule_id) else {
            return false;
        };
        entry.checked = checked;

        let (add_to, remove_from) = if checked {
            (&mut self.rules_to_attach, &mut self.rules_to_detach)
        } else {
            (&mut self.rules_to_detach, &mut self.rules_to_attach)
        };
        remove_from.retain(|id| *id != rule_id);
        if !add_to.contains(&rule_id) {
            add_to.push(rule_id);
        }
        true
    }

    pub fn rules_to_attach(&self) -> &[i64] {
        &self.rules_to_attach
    }

    pub fn rules_to_detach(&self) -> &[i64] {
        &self.rules_to_detach
    }

    pub fn validate(&self) -> Result<UpsertServiceRequest, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(UpsertServiceRequest {
            service: UpsertServiceRequestService {
                id: (!self.is_new()).then_some(self.id),
                name: self.name.trim().to_string(),
                port: self.port,
            },
            rule_ids: self.rules_to_attach.clone(),
        })
    }
}

pub struct ServiceEditor {
    api: Arc<dyn Api>,
    notifier: Arc<dyn Notifier>,
}

impl ServiceEditor {
    pub fn new(api: Arc<dyn Api>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Upserts the service with the rules to attach, then removes the
    /// unchecked attachments.
    pub async fn submit(&self, form: &ServiceForm) -> Result<(), EditorError> {
        let request = form.validate()?;
        debug!(
            "Upserting service {} (attach {:?}, detach {:?})",
            request.service.name, form.rules_to_attach, form.rules_to_detach
        );

        let result = self.write(form, &request).await;
        self.report(result)?;
        info!("Service {} saved", request.service.name);
        Ok(())
    }

    async fn write(
        &self,
        form: &ServiceForm,
        request: &UpsertServiceRequest,
    ) -> Result<(), TransportError> {
        self.api.upsert_service(request).await?;
        // A service created just now has no attachment to remove.
        if !form.is_new() && !form.rules_to_detach.is_empty() {
            self.api
                .delete_service_to_rules(&DeleteServiceToRulesRequest {
                    service_id: form.id,
                    rule_ids: form.rules_to_detach.clone(),
                })
                .await?;
        }
        Ok(())
    }

    /// Deletes the service, then its rule attachments.
    pub async fn delete(&self, form: &ServiceForm) -> Result<(), EditorError> {
        if form.is_new() {
            return Err(ValidationError::NotPersisted.into());
        }
        let result = self.remove(form).await;
        self.report(result)?;
        info!("Service {} deleted", form.id);
        Ok(())
    }

    async fn remove(&self, form: &ServiceForm) -> Result<(), TransportError> {
        self.api
            .delete_service(&DeleteServiceRequest {
                service_id: form.id,
            })
            .await?;
        if !form.attached.is_empty() {
            self.api
                .delete_service_to_rules(&DeleteServiceToRulesRequest {
                    service_id: form.id,
                    rule_ids: form.attached.clone(),
                })
                .await?;
        }
        Ok(())
    }

    fn report(&self, result: Result<(), TransportError>) -> Result<(), EditorError> {
        match result {
            Ok(()) => {
                self.notifier.notify(Toast::success());
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Toast::error(e.user_message()));
                Err(e.into())
            }
        }
    }
}
