use crate::{
    api::models::{AppInstance, Environment, Id, Service, SyncOperation, SyncRequest, SyncStatus},
    common::{
        errors::{self, Error, ValidationError},
        utils::{get_image_version, plural},
    },
    notify::Notification,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};
use tracing::{debug, info};

/// Steps of the service sync wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    SelectTarget,
    MapOrSelectInstances,
    ReviewConfirm,
    Submitting,
    Closed,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WizardStep::SelectTarget => "select target",
            WizardStep::MapOrSelectInstances => "select instances",
            WizardStep::ReviewConfirm => "review",
            WizardStep::Submitting => "submitting",
            WizardStep::Closed => "closed",
        };
        f.write_str(text)
    }
}

/// How selected services are assigned to target app instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    /// Each service goes to the one instance it is mapped to.
    Mapping,
    /// Every service goes to every selected instance.
    FanOut,
}

/// Working set of the wizard. Discarded when the wizard closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSelection {
    pub target_environment_id: Option<Id>,
    pub selected_target_instance_ids: BTreeSet<Id>,
    /// Service id to target app instance id, used in mapping mode.
    pub mappings: BTreeMap<Id, Id>,
}

/// One line of the review step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub service: String,
    pub current_version: String,
    pub destinations: Vec<String>,
}

/// Read-only recap shown before confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReview {
    pub source_environment: String,
    pub target_environment: String,
    pub rows: Vec<ReviewRow>,
    pub operation_count: usize,
    pub operations_label: String,
}

/// Destructive-action confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
}

/// Aggregate result of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Completed,
    Partial,
    Failed,
}

/// What happened to a submitted sync, with the notification to raise.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub status: OutcomeStatus,
    pub operation: Option<SyncOperation>,
    pub notification: Notification,
}

/// The three step service sync wizard.
///
/// `SelectTarget → MapOrSelectInstances → ReviewConfirm → Submitting → Closed`. Back
/// navigation keeps every selection; only closing discards them.
#[derive(Debug, Clone)]
pub struct SyncWizard {
    source: Environment,
    target_options: Vec<Environment>,
    services: Vec<Service>,
    mode: TargetMode,
    step: WizardStep,
    selection: SyncSelection,
    target_instances: Vec<AppInstance>,
}

impl SyncWizard {
    /// Open the wizard for services of `source`. The source never appears among the targets.
    pub fn open(
        source: Environment,
        environments: &[Environment],
        services: Vec<Service>,
        mode: TargetMode,
    ) -> Result<Self, ValidationError> {
        if services.is_empty() {
            return errors::NoServicesSelected.fail();
        }
        let target_options = environments
            .iter()
            .filter(|environment| environment.id != source.id)
            .cloned()
            .collect();
        debug!(source = %source.name, services = services.len(), ?mode, "sync wizard opened");
        Ok(Self {
            source,
            target_options,
            services,
            mode,
            step: WizardStep::SelectTarget,
            selection: SyncSelection::default(),
            target_instances: Vec::new(),
        })
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn mode(&self) -> TargetMode {
        self.mode
    }

    pub fn source(&self) -> &Environment {
        &self.source
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn selection(&self) -> &SyncSelection {
        &self.selection
    }

    /// Environments that may be chosen as target.
    pub fn target_options(&self) -> &[Environment] {
        &self.target_options
    }

    /// App instances of the target environment offered at the instance step.
    pub fn target_instances(&self) -> &[AppInstance] {
        &self.target_instances
    }

    pub fn target_environment(&self) -> Option<&Environment> {
        let id = self.selection.target_environment_id.as_ref()?;
        self.target_options.iter().find(|env| &env.id == id)
    }

    /// True until the wizard is closed.
    pub fn is_open(&self) -> bool {
        self.step != WizardStep::Closed
    }

    /// Key identifying this submission for duplicate detection.
    pub fn action_key(&self) -> String {
        let target = self
            .selection
            .target_environment_id
            .as_ref()
            .map(Id::to_string)
            .unwrap_or_default();
        format!("sync-services:{}->{}", self.source.id, target)
    }

    fn expect_step(&self, expected: WizardStep, action: &str) -> Result<(), ValidationError> {
        if self.step == WizardStep::Submitting && expected != WizardStep::Submitting {
            return errors::SubmissionInFlight.fail();
        }
        if self.step != expected {
            return errors::InvalidStep {
                action,
                step: self.step.to_string(),
            }
            .fail();
        }
        Ok(())
    }

    /// Choose the target environment. Choosing a different one drops the instance choices
    /// made for the previous target.
    pub fn select_target(&mut self, environment_id: Id) -> Result<(), ValidationError> {
        self.expect_step(WizardStep::SelectTarget, "select a target")?;
        if environment_id == self.source.id {
            return errors::TargetIsSource.fail();
        }
        if !self.target_options.iter().any(|env| env.id == environment_id) {
            return errors::UnknownEnvironment { id: environment_id }.fail();
        }
        if self.selection.target_environment_id.as_ref() != Some(&environment_id) {
            self.selection.target_environment_id = Some(environment_id);
            self.selection.selected_target_instance_ids.clear();
            self.selection.mappings.clear();
            self.target_instances.clear();
        }
        Ok(())
    }

    /// Provide the app instances fetched for the target environment. Instances of other
    /// environments are ignored, selections pointing at vanished instances are dropped.
    pub fn set_target_instances(&mut self, instances: Vec<AppInstance>) {
        let Some(target) = &self.selection.target_environment_id else {
            return;
        };
        self.target_instances = instances
            .into_iter()
            .filter(|instance| &instance.environment_id == target)
            .collect();
        let known = self
            .target_instances
            .iter()
            .map(|instance| instance.id.clone())
            .collect::<BTreeSet<_>>();
        self.selection
            .selected_target_instance_ids
            .retain(|id| known.contains(id));
        self.selection
            .mappings
            .retain(|_, instance| known.contains(instance));
    }

    fn check_instance(&self, instance_id: &Id) -> Result<(), ValidationError> {
        if self
            .target_instances
            .iter()
            .any(|instance| &instance.id == instance_id)
        {
            Ok(())
        } else {
            errors::UnknownAppInstance {
                id: instance_id.clone(),
            }
            .fail()
        }
    }

    /// Map one service to a target app instance (mapping mode).
    pub fn map_service(&mut self, service_id: Id, instance_id: Id) -> Result<(), ValidationError> {
        self.expect_step(WizardStep::MapOrSelectInstances, "map a service")?;
        if !self.services.iter().any(|service| service.id == service_id) {
            return errors::UnknownService { id: service_id }.fail();
        }
        self.check_instance(&instance_id)?;
        self.selection.mappings.insert(service_id, instance_id);
        Ok(())
    }

    /// Select or deselect a target app instance (fan-out mode). Returns the new state.
    pub fn toggle_target_instance(&mut self, instance_id: Id) -> Result<bool, ValidationError> {
        self.expect_step(WizardStep::MapOrSelectInstances, "select an instance")?;
        self.check_instance(&instance_id)?;
        let selected = &mut self.selection.selected_target_instance_ids;
        if selected.remove(&instance_id) {
            Ok(false)
        } else {
            selected.insert(instance_id);
            Ok(true)
        }
    }

    /// Select every target app instance (fan-out mode).
    pub fn select_all_target_instances(&mut self) -> Result<(), ValidationError> {
        self.expect_step(WizardStep::MapOrSelectInstances, "select instances")?;
        self.selection.selected_target_instance_ids =
            self.target_instances.iter().map(|i| i.id.clone()).collect();
        Ok(())
    }

    /// Number of service-to-instance operations the submission will run.
    pub fn operation_count(&self) -> usize {
        match self.mode {
            TargetMode::Mapping => self.services.len(),
            TargetMode::FanOut => {
                self.services.len() * self.selection.selected_target_instance_ids.len()
            }
        }
    }

    /// Operation count as shown to the user.
    pub fn operations_label(&self) -> String {
        format!("{} Total Operations", self.operation_count())
    }

    fn unmapped_services(&self) -> Vec<String> {
        self.services
            .iter()
            .filter(|service| !self.selection.mappings.contains_key(&service.id))
            .map(|service| service.name.clone())
            .collect()
    }

    /// Advance one step, if the current step is complete.
    pub fn next(&mut self) -> Result<WizardStep, ValidationError> {
        match self.step {
            WizardStep::SelectTarget => {
                if self.selection.target_environment_id.is_none() {
                    return errors::NoTargetEnvironment.fail();
                }
                self.step = WizardStep::MapOrSelectInstances;
            }
            WizardStep::MapOrSelectInstances => {
                match self.mode {
                    TargetMode::Mapping => {
                        let services = self.unmapped_services();
                        if !services.is_empty() {
                            return errors::UnmappedServices { services }.fail();
                        }
                    }
                    TargetMode::FanOut => {
                        if self.selection.selected_target_instance_ids.is_empty() {
                            return errors::NoTargetInstances.fail();
                        }
                    }
                }
                self.step = WizardStep::ReviewConfirm;
            }
            WizardStep::Submitting => return errors::SubmissionInFlight.fail(),
            step => {
                return errors::InvalidStep {
                    action: "continue",
                    step: step.to_string(),
                }
                .fail();
            }
        }
        Ok(self.step)
    }

    /// Go back one step. Selections are kept.
    pub fn back(&mut self) -> Result<WizardStep, ValidationError> {
        self.step = match self.step {
            WizardStep::MapOrSelectInstances => WizardStep::SelectTarget,
            WizardStep::ReviewConfirm => WizardStep::MapOrSelectInstances,
            WizardStep::Submitting => return errors::SubmissionInFlight.fail(),
            step => {
                return errors::InvalidStep {
                    action: "go back",
                    step: step.to_string(),
                }
                .fail()
            }
        };
        Ok(self.step)
    }

    fn instance_label(&self, id: &Id) -> String {
        self.target_instances
            .iter()
            .find(|instance| &instance.id == id)
            .map(AppInstance::label)
            .unwrap_or_else(|| format!("#{id}"))
    }

    fn target_name(&self) -> String {
        self.target_environment()
            .map(|env| env.name.clone())
            .unwrap_or_default()
    }

    /// Recap of the pending sync.
    pub fn review(&self) -> Result<SyncReview, ValidationError> {
        self.expect_step(WizardStep::ReviewConfirm, "review")?;
        let rows = self
            .services
            .iter()
            .map(|service| {
                let destinations = match self.mode {
                    TargetMode::Mapping => self
                        .selection
                        .mappings
                        .get(&service.id)
                        .map(|id| vec![self.instance_label(id)])
                        .unwrap_or_default(),
                    TargetMode::FanOut => self
                        .selection
                        .selected_target_instance_ids
                        .iter()
                        .map(|id| self.instance_label(id))
                        .collect(),
                };
                ReviewRow {
                    service: service.name.clone(),
                    current_version: get_image_version(&service.image_tag),
                    destinations,
                }
            })
            .collect();
        Ok(SyncReview {
            source_environment: self.source.name.clone(),
            target_environment: self.target_name(),
            rows,
            operation_count: self.operation_count(),
            operations_label: self.operations_label(),
        })
    }

    /// The confirmation that must be accepted before submitting.
    pub fn confirmation(&self) -> Result<ConfirmationPrompt, ValidationError> {
        self.expect_step(WizardStep::ReviewConfirm, "confirm")?;
        Ok(ConfirmationPrompt {
            title: "Confirm Service Sync".to_string(),
            message: format!(
                "You are about to sync {} from \"{}\" to \"{}\" ({}). This will overwrite the \
                 current state of the target services and cannot be undone.",
                plural(self.services.len(), "service"),
                self.source.name,
                self.target_name(),
                self.operations_label(),
            ),
        })
    }

    /// Enter the submitting step and build the request. Requires an accepted confirmation.
    pub fn begin_submit(&mut self, confirmed: bool) -> Result<SyncRequest, ValidationError> {
        self.expect_step(WizardStep::ReviewConfirm, "submit")?;
        if !confirmed {
            return errors::NotConfirmed.fail();
        }
        let target_environment_id = self
            .selection
            .target_environment_id
            .clone()
            .ok_or(ValidationError::NoTargetEnvironment)?;
        let (service_ids, target_app_instance_ids) = match self.mode {
            TargetMode::Mapping => {
                let mut service_ids = Vec::with_capacity(self.services.len());
                let mut instance_ids = Vec::with_capacity(self.services.len());
                for service in &self.services {
                    let instance = self.selection.mappings.get(&service.id).ok_or_else(|| {
                        ValidationError::UnmappedServices {
                            services: vec![service.name.clone()],
                        }
                    })?;
                    service_ids.push(service.id.clone());
                    instance_ids.push(instance.clone());
                }
                (service_ids, instance_ids)
            }
            TargetMode::FanOut => (
                self.services.iter().map(|service| service.id.clone()).collect(),
                self.selection
                    .selected_target_instance_ids
                    .iter()
                    .cloned()
                    .collect(),
            ),
        };
        self.step = WizardStep::Submitting;
        info!(
            source = %self.source.id,
            target = %target_environment_id,
            operations = self.operation_count(),
            "submitting service sync"
        );
        Ok(SyncRequest {
            source_environment_id: self.source.id.clone(),
            target_environment_id,
            service_ids,
            target_app_instance_ids,
        })
    }

    /// Settle a submission. The wizard closes whatever the outcome; a retry is a new run.
    pub fn finish(
        &mut self,
        result: Result<SyncOperation, Error>,
    ) -> Result<SyncOutcome, ValidationError> {
        if self.step != WizardStep::Submitting {
            return errors::InvalidStep {
                action: "finish",
                step: self.step.to_string(),
            }
            .fail();
        }
        let route = format!("from \"{}\" to \"{}\"", self.source.name, self.target_name());
        let services = plural(self.services.len(), "service");
        let outcome = match result {
            Ok(operation) => match operation.status {
                SyncStatus::Completed => SyncOutcome {
                    status: OutcomeStatus::Completed,
                    notification: Notification::success("Sync completed successfully")
                        .with_detail(format!("Synced {services} {route}.")),
                    operation: Some(operation),
                },
                SyncStatus::Partial => SyncOutcome {
                    status: OutcomeStatus::Partial,
                    notification: Notification::warning("Sync partially completed")
                        .with_detail(format!(
                            "Some operations {route} failed, see the sync history for details."
                        )),
                    operation: Some(operation),
                },
                status => SyncOutcome {
                    status: OutcomeStatus::Failed,
                    notification: Notification::error("Sync failed").with_detail(
                        operation
                            .message
                            .clone()
                            .unwrap_or_else(|| format!("The sync {route} ended as {status}.")),
                    ),
                    operation: Some(operation),
                },
            },
            Err(error) => SyncOutcome {
                status: OutcomeStatus::Failed,
                notification: Notification::error("Sync failed").with_detail(error.user_message()),
                operation: None,
            },
        };
        info!(status = ?outcome.status, "service sync settled");
        self.reset();
        Ok(outcome)
    }

    /// Cancel the wizard. Refused while a submission is in flight.
    pub fn cancel(&mut self) -> Result<(), ValidationError> {
        if self.step == WizardStep::Submitting {
            return errors::SubmissionInFlight.fail();
        }
        self.reset();
        Ok(())
    }

    /// Close the wizard. Same rules as [`SyncWizard::cancel`].
    pub fn close(&mut self) -> Result<(), ValidationError> {
        self.cancel()
    }

    fn reset(&mut self) {
        self.step = WizardStep::Closed;
        self.selection = SyncSelection::default();
        self.target_instances.clear();
    }
}
