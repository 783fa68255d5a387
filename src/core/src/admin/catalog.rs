use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;

use super::rule_editor::RuleForm;
use super::service_editor::ServiceForm;
use crate::api::types::{Rule, ServiceWithRules};
use crate::api::Api;
use crate::error_handling::types::TransportError;
use crate::feed::Observable;
use crate::notification::{Notifier, Toast};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub services: Vec<ServiceWithRules>,
    pub rules: Vec<Rule>,
}

/// Last known services and rules, the lists the editors are opened from.
pub struct Catalog {
    api: Arc<dyn Api>,
    notifier: Arc<dyn Notifier>,
    state: Observable<CatalogState>,
}

impl Catalog {
    pub fn new(api: Arc<dyn Api>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            state: Observable::default(),
        }
    }

    /// Re-fetches both lists. Either request failing keeps the previous lists.
    pub async fn refresh(&self) -> Result<(), TransportError> {
        let fetched = async {
            let services = self.api.get_services().await?;
            let rules = self.api.get_rules().await?;
            Ok::<_, TransportError>(CatalogState {
                services: services.services_with_rules,
                rules: rules.rules,
            })
        }
        .await;

        match fetched {
            Ok(next) => {
                debug!(
                    "Catalog refreshed: {} services, {} rules",
                    next.services.len(),
                    next.rules.len()
                );
                self.state.update(|state| {
                    if *state == next {
                        return false;
                    }
                    *state = next;
                    true
                });
                Ok(())
            }
            Err(e) => {
                warn!("Catalog refresh failed: {}", e);
                self.notifier.notify(Toast::error(e.user_message()));
                Err(e)
            }
        }
    }

    pub fn services(&self) -> Vec<ServiceWithRules> {
        self.state.read(|s| s.services.clone())
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.state.read(|s| s.rules.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Form for the rule with `id`, or an empty form when `id` is `None`.
    pub fn rule_form(&self, id: Option<i64>) -> Option<RuleForm> {
        match id {
            None => Some(RuleForm::new()),
            Some(id) => self
                .state
                .read(|s| s.rules.iter().find(|r| r.id == id).map(RuleForm::from)),
        }
    }

    /// Form for the service with `id`, or an empty form when `id` is `None`.
    pub fn service_form(&self, id: Option<i64>) -> Option<ServiceForm> {
        self.state.read(|s| match id {
            None => Some(ServiceForm::new(&s.rules)),
            Some(id) => s
                .services
                .iter()
                .find(|sw| sw.service.id == id)
                .map(|sw| ServiceForm::edit(sw, &s.rules)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{rule, service, ScriptedApi};
    use crate::api::types::{GetRulesResponse, GetServicesResponse};
    use crate::notification::testing::RecordingNotifier;
    use tokio_test::{assert_err, assert_ok};

    fn setup() -> (Arc<ScriptedApi>, Arc<RecordingNotifier>, Catalog) {
        let _ = env_logger::builder().is_test(true).try_init();
        let api = Arc::new(ScriptedApi::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let catalog = Catalog::new(api.clone(), notifier.clone());
        (api, notifier, catalog)
    }

    fn populate(api: &ScriptedApi) {
        api.set_services(Ok(GetServicesResponse {
            services_with_rules: vec![service(5, "web", 80, vec![rule(1, "flag")])],
        }));
        api.set_rules(Ok(GetRulesResponse {
            rules: vec![rule(1, "flag"), rule(2, "shell")],
        }));
    }

    #[tokio::test]
    async fn refresh_loads_services_and_rules() {
        let (api, notifier, catalog) = setup();
        populate(&api);
        let rx = catalog.subscribe();

        assert_ok!(catalog.refresh().await);
        assert!(rx.has_changed().unwrap());
        assert_eq!(catalog.services().len(), 1);
        assert_eq!(catalog.rules().len(), 2);
        assert!(notifier.toasts().is_empty());

        let form = catalog.service_form(Some(5)).unwrap();
        assert_eq!(form.rules.iter().filter(|r| r.checked).count(), 1);
        assert_eq!(catalog.rule_form(Some(2)).unwrap().name, "shell");
        assert!(catalog.rule_form(Some(9)).is_none());
        assert!(catalog.service_form(Some(9)).is_none());
        assert!(catalog.service_form(None).unwrap().is_new());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_lists() {
        let (api, notifier, catalog) = setup();
        populate(&api);
        assert_ok!(catalog.refresh().await);

        api.set_rules(Err(TransportError::Http {
            status: 500,
            body: None,
        }));
        assert_err!(catalog.refresh().await);

        assert_eq!(catalog.services().len(), 1);
        assert_eq!(catalog.rules().len(), 2);
        assert_eq!(notifier.destructive().len(), 1);
    }
}
