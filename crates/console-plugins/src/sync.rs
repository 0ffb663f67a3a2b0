//! Reconciles live controller instances with their activation predicates.
//!
//! One pass evaluates every predicate first, so a failing predicate aborts
//! the pass before anything is destroyed or created. It then destroys
//! instances that went inactive, creates instances that became active,
//! launches the new ones, finishes their initialization, and finally asks for
//! a style refresh if anything changed.

use std::fmt;

use console_state::StateRead;

use crate::error::SyncError;
use crate::registry::ControllerRegistry;

/// Hooks the synchronizer drives. Implemented by the application shell.
pub trait ControllerLifecycle<H> {
    type Error: fmt::Display;

    fn instantiate(&mut self, id: &str) -> Result<H, Self::Error>;

    fn launch(&mut self, id: &str, controller: &mut H) -> Result<(), Self::Error>;

    fn finish_init(&mut self, id: &str, controller: &mut H) -> Result<(), Self::Error>;

    /// Tears down an instance that went inactive. The instance is gone from
    /// the registry whether or not this succeeds.
    fn destroy(&mut self, id: &str, controller: H) -> Result<(), Self::Error>;

    /// Called once per pass that created or destroyed something.
    fn refresh_styles(&mut self);

    /// Observes a hook failure after it is logged and recorded.
    fn hook_failed(&mut self, _failure: &HookFailure) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Instantiate,
    Launch,
    FinishInit,
    Destroy,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleStage::Instantiate => "instantiate",
            LifecycleStage::Launch => "launch",
            LifecycleStage::FinishInit => "finish-init",
            LifecycleStage::Destroy => "destroy",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub id: String,
    pub stage: LifecycleStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Newly live controllers, in creation order.
    pub created: Vec<String>,
    pub destroyed: Vec<String>,
    pub failures: Vec<HookFailure>,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.destroyed.is_empty()
    }
}

pub fn sync<H, L>(
    registry: &mut ControllerRegistry<H>,
    state: &dyn StateRead,
    lifecycle: &mut L,
) -> Result<SyncReport, SyncError>
where
    L: ControllerLifecycle<H> + ?Sized,
{
    log::debug!("refreshing controllers");

    let mut wanted = Vec::with_capacity(registry.len());
    for descriptor in registry.iter() {
        let active = descriptor
            .activation()
            .evaluate(state)
            .map_err(|source| SyncError::Predicate {
                id: descriptor.id().to_string(),
                source,
            })?;
        wanted.push(active);
    }

    let mut report = SyncReport::default();

    for (descriptor, active) in registry.iter_mut().zip(&wanted) {
        if *active {
            continue;
        }
        let Some(controller) = descriptor.instance.take() else {
            continue;
        };
        let id = descriptor.id().to_string();
        log::debug!("destroying controller: {id}");
        if let Err(err) = lifecycle.destroy(&id, controller) {
            record::<H, L, _>(&mut report, lifecycle, &id, LifecycleStage::Destroy, err);
        }
        report.destroyed.push(id);
    }

    for (descriptor, active) in registry.iter_mut().zip(&wanted) {
        if !*active || descriptor.instance.is_some() {
            continue;
        }
        let id = descriptor.id().to_string();
        log::debug!("initializing controller: {id}");
        match lifecycle.instantiate(&id) {
            Ok(controller) => {
                descriptor.instance = Some(controller);
                report.created.push(id);
            }
            Err(err) => record::<H, L, _>(&mut report, lifecycle, &id, LifecycleStage::Instantiate, err),
        }
    }

    let created = report.created.clone();
    for id in &created {
        if let Some(controller) = registry.instance_mut(id) {
            if let Err(err) = lifecycle.launch(id, controller) {
                record::<H, L, _>(&mut report, lifecycle, id, LifecycleStage::Launch, err);
            }
        }
    }
    for id in &created {
        if let Some(controller) = registry.instance_mut(id) {
            if let Err(err) = lifecycle.finish_init(id, controller) {
                record::<H, L, _>(&mut report, lifecycle, id, LifecycleStage::FinishInit, err);
            }
        }
    }

    if report.changed() {
        lifecycle.refresh_styles();
    }
    Ok(report)
}

fn record<H, L, E>(report: &mut SyncReport, lifecycle: &mut L, id: &str, stage: LifecycleStage, err: E)
where
    L: ControllerLifecycle<H> + ?Sized,
    E: fmt::Display,
{
    log::warn!("controller '{id}' failed to {stage}: {err}");
    let failure = HookFailure {
        id: id.to_string(),
        stage,
        message: err.to_string(),
    };
    lifecycle.hook_failed(&failure);
    report.failures.push(failure);
}
