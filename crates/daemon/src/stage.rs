// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage state machine.
//!
//! A stage is a named operational mode with an ordered recipe of steps and
//! a minimum connectivity level. The reconciler advances the actual stage
//! toward the desired one: gated on connectivity, duplicate-suppressed in
//! the workqueue, aborting on the first failing step.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nak_core::led::{LedCondition, LedPriority, LedState};
use nak_core::{ConnectivityLevel, Event, StageInfo};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{run_executables, ConfigStore, Shell, VpnControl};
use crate::connectivity::ConnectivityMonitor;
use crate::event_bus::{EventBus, HandlerId};
use crate::led::LedCtl;
use crate::module::{Module, ModuleError};
use crate::rpc::message::{self, ErrorCode};
use crate::rpc::{Access, Command, CommandRegistry};
use crate::timer::{TimerHandle, TimerService};
use crate::workqueue::{Work, Workqueue};

pub const RECONCILE_INTERVAL: Duration = Duration::from_millis(2500);
const RECONCILE_TASK: &str = "stage reconciliation";

/// Hook options scanned across all configuration packages.
const HOOK_ENABLE: &str = "nak_rule_enable";
const HOOK_DISABLE: &str = "nak_rule_disable";

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Unknown stage \"{0}\"")]
    UnknownStage(String),

    #[error("{step}: {message}")]
    Step { step: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    StopVpn,
    ApplyUciHooks,
    RunStageScripts,
    StartVpn,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::StopVpn => "Stopping VPN daemon",
            Step::ApplyUciHooks => "Applying configuration hooks",
            Step::RunStageScripts => "Running stage scripts",
            Step::StartVpn => "Starting VPN daemon",
        }
    }
}

pub struct StageDef {
    pub name: &'static str,
    pub desc: &'static str,
    pub required: ConnectivityLevel,
    pub steps: &'static [Step],
    /// Sink levels shown at Mode priority while this stage is current.
    pub led_states: &'static [(&'static str, bool)],
}

const BASE_RECIPE: &[Step] = &[Step::StopVpn, Step::ApplyUciHooks, Step::RunStageScripts];
const VPN_RECIPE: &[Step] = &[Step::ApplyUciHooks, Step::RunStageScripts, Step::StartVpn];

pub static STAGES: &[StageDef] = &[
    StageDef {
        name: "reset",
        desc: "Factory-reset networking: no uplink, all rules reset.",
        required: ConnectivityLevel::None,
        steps: BASE_RECIPE,
        led_states: &[("LED1_path", false), ("LED2_path", false)],
    },
    StageDef {
        name: "default",
        desc: "Default offline mode.",
        required: ConnectivityLevel::None,
        steps: BASE_RECIPE,
        led_states: &[("LED1_path", true), ("LED2_path", false)],
    },
    StageDef {
        name: "online",
        desc: "Plain uplink, no traffic anonymization.",
        required: ConnectivityLevel::Local,
        steps: BASE_RECIPE,
        led_states: &[("LED1_path", true), ("LED2_path", false)],
    },
    StageDef {
        name: "tor",
        desc: "Route client traffic through Tor.",
        required: ConnectivityLevel::Local,
        steps: BASE_RECIPE,
        led_states: &[("LED2_path", true), ("LED1_path", false)],
    },
    StageDef {
        name: "vpn",
        desc: "Route client traffic through the VPN tunnel.",
        required: ConnectivityLevel::Local,
        steps: VPN_RECIPE,
        led_states: &[("LED2_path", true), ("LED1_path", false)],
    },
];

pub fn stage_by_name(name: &str) -> Option<&'static StageDef> {
    STAGES.iter().find(|s| s.name == name)
}

struct StageStatus {
    current: Option<&'static StageDef>,
    desired: &'static StageDef,
    last_error: Option<String>,
}

pub struct StageCtl {
    config: Arc<dyn ConfigStore>,
    vpn: Arc<dyn VpnControl>,
    shell: Arc<dyn Shell>,
    wq: Arc<Workqueue>,
    connectivity: Arc<ConnectivityMonitor>,
    leds: Arc<LedCtl>,
    script_dir: PathBuf,
    status: Mutex<StageStatus>,
    // one reconciliation in flight at a time
    reconcile_lock: tokio::sync::Mutex<()>,
}

impl StageCtl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<dyn ConfigStore>,
        vpn: Arc<dyn VpnControl>,
        shell: Arc<dyn Shell>,
        wq: Arc<Workqueue>,
        connectivity: Arc<ConnectivityMonitor>,
        leds: Arc<LedCtl>,
        script_dir: PathBuf,
    ) -> Arc<Self> {
        let default_stage = &STAGES[1];
        Arc::new(Self {
            config,
            vpn,
            shell,
            wq,
            connectivity,
            leds,
            script_dir,
            status: Mutex::new(StageStatus {
                current: None,
                desired: default_stage,
                last_error: None,
            }),
            reconcile_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Restore the desired stage persisted in the configuration store.
    pub fn restore_desired(&self) {
        let Some(name) = self.config.option_str("nakd", "stage", "desired") else {
            return;
        };
        match stage_by_name(&name) {
            Some(stage) => self.status.lock().desired = stage,
            None => warn!(stage = %name, "ignoring unknown persisted stage"),
        }
    }

    /// The stage reported to clients: the current one, or the desired one
    /// before the first successful reconciliation.
    pub fn stage_info(&self) -> StageInfo {
        let status = self.status.lock();
        let stage = status.current.unwrap_or(status.desired);
        StageInfo {
            name: stage.name.to_string(),
            desc: stage.desc.to_string(),
            connectivity: stage.required,
            errmsg: status.last_error.clone(),
        }
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.status.lock().current.map(|s| s.name)
    }

    pub fn desired_name(&self) -> &'static str {
        self.status.lock().desired.name
    }

    /// Update the desired stage, persist it, and kick a reconciliation.
    /// Does not wait for the recipe to run.
    pub fn set_desired(self: &Arc<Self>, name: &str) -> Result<(), StageError> {
        let stage =
            stage_by_name(name).ok_or_else(|| StageError::UnknownStage(name.to_string()))?;
        info!(stage = stage.name, "desired stage set");
        self.status.lock().desired = stage;

        if let Err(e) = self
            .config
            .set_option("nakd", "stage", "desired", stage.name.into())
            .and_then(|()| self.config.commit("nakd"))
        {
            warn!("couldn't persist desired stage: {e}");
        }

        self.enqueue_reconcile();
        Ok(())
    }

    /// Enqueue a reconciliation unless one is already queued or running.
    pub fn enqueue_reconcile(self: &Arc<Self>) {
        if self.wq.pending(RECONCILE_TASK) {
            return;
        }
        let ctl = Arc::clone(self);
        self.wq.add(Work::new(RECONCILE_TASK, async move {
            ctl.reconcile().await;
        }));
    }

    /// One reconciliation pass: compare, gate on connectivity, run the
    /// recipe in order. The first failing step records `last_error` and
    /// leaves the current stage unchanged.
    pub async fn reconcile(&self) {
        let _pass = self.reconcile_lock.lock().await;

        let desired = {
            let status = self.status.lock();
            if status.current.map(|c| c.name) == Some(status.desired.name) {
                return;
            }
            status.desired
        };

        let level = self.connectivity.connectivity().await;
        if level < desired.required {
            info!(
                stage = desired.name,
                have = %level,
                need = %desired.required,
                "deferring stage change until connectivity improves"
            );
            return;
        }

        info!(stage = desired.name, "stage");
        self.status.lock().last_error = None;
        for step in desired.steps {
            info!(stage = desired.name, step = step.name(), "running step");
            if let Err(e) = self.run_step(desired, *step).await {
                warn!(stage = desired.name, step = step.name(), "step failed: {e}");
                self.status.lock().last_error = Some(e.to_string());
                return;
            }
        }

        self.status.lock().current = Some(desired);
        self.leds.add(stage_led_condition(desired));
        info!(stage = desired.name, "stage done");
    }

    async fn run_step(&self, stage: &'static StageDef, step: Step) -> Result<(), StageError> {
        let step_error = |message: String| StageError::Step { step: step.name(), message };
        match step {
            Step::StopVpn => self.vpn.stop().await.map_err(|e| step_error(e.to_string())),
            Step::StartVpn => self.vpn.start().await.map_err(|e| step_error(e.to_string())),
            Step::ApplyUciHooks => {
                apply_hooks(&*self.config, stage.name).map_err(|e| step_error(e.to_string()))
            }
            Step::RunStageScripts => {
                let dir = self.script_dir.join("stage").join(format!("{}.d", stage.name));
                run_executables(&*self.shell, &dir)
                    .await
                    .map_err(|e| step_error(e.to_string()))
            }
        }
    }
}

/// Flip the `enabled` flag on every configuration section whose hook
/// option names the target stage (string equality or list membership,
/// case-insensitive).
fn apply_hooks(
    config: &dyn ConfigStore,
    stage_name: &str,
) -> Result<(), crate::adapters::ConfigError> {
    for (hook, enabled) in [(HOOK_ENABLE, "1"), (HOOK_DISABLE, "0")] {
        for package_name in config.packages() {
            let Some(package) = config.package(&package_name) else { continue };
            let mut mutated = false;
            for section_name in package.sections_with_option(hook) {
                let matches = package
                    .section(&section_name)
                    .and_then(|s| s.option(hook))
                    .is_some_and(|v| v.matches_ignore_case(stage_name));
                if !matches {
                    continue;
                }
                let rule = package
                    .section(&section_name)
                    .and_then(|s| s.option_str("name"))
                    .unwrap_or("")
                    .to_string();
                info!(
                    "{} rule \"{rule}\"",
                    if enabled == "1" { "enabling" } else { "disabling" }
                );
                config.set_option(&package_name, &section_name, "enabled", enabled.into())?;
                mutated = true;
            }
            if mutated {
                config.commit(&package_name)?;
            }
        }
    }
    Ok(())
}

fn stage_led_condition(stage: &'static StageDef) -> LedCondition {
    LedCondition::steady(
        "stage mode",
        LedPriority::Mode,
        stage
            .led_states
            .iter()
            .map(|(key, active)| LedState::new(*key, *active))
            .collect(),
    )
}

/// Register the `stage_set` and `stage_info` commands.
pub fn register_commands(registry: &CommandRegistry, stage: &Arc<StageCtl>) {
    let ctl = Arc::clone(stage);
    registry.register(Command {
        name: "stage_set",
        desc: "Select the desired operational stage.",
        usage: r#"{"jsonrpc": "2.0", "method": "stage_set", "params": "vpn", "id": 42}"#,
        access: Access::Root,
        module: "stage",
        handler: Arc::new(move |request| {
            let ctl = Arc::clone(&ctl);
            Box::pin(async move {
                let Some(name) = message::params(&request).and_then(Value::as_str) else {
                    return Some(message::response_error(
                        Some(&request),
                        ErrorCode::InvalidParams,
                        Some("Invalid parameters - params should be a string"),
                    ));
                };
                match ctl.set_desired(name) {
                    Ok(()) => message::response_result(&request, Value::String("OK".into())),
                    Err(e) => Some(message::response_error(
                        Some(&request),
                        ErrorCode::InvalidParams,
                        Some(&e.to_string()),
                    )),
                }
            })
        }),
    });

    let ctl = Arc::clone(stage);
    registry.register(Command {
        name: "stage_info",
        desc: "Current stage, its connectivity requirement and last error.",
        usage: r#"{"jsonrpc": "2.0", "method": "stage_info", "id": 42}"#,
        access: Access::User,
        module: "stage",
        handler: Arc::new(move |request| {
            let ctl = Arc::clone(&ctl);
            Box::pin(async move {
                let info = ctl.stage_info();
                message::response_result(
                    &request,
                    serde_json::json!({
                        "name": info.name,
                        "desc": info.desc,
                        "connectivity": info.connectivity,
                        "errmsg": info.errmsg,
                    }),
                )
            })
        }),
    });
}

/// Module glue: the periodic reconciler and the connectivity retrigger.
pub struct StageModule {
    stage: Arc<StageCtl>,
    events: Arc<EventBus>,
    timers: Arc<TimerService>,
    timer: Mutex<Option<TimerHandle>>,
    handler: Mutex<Option<HandlerId>>,
}

impl StageModule {
    pub fn new(
        stage: Arc<StageCtl>,
        events: Arc<EventBus>,
        timers: Arc<TimerService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            stage,
            events,
            timers,
            timer: Mutex::new(None),
            handler: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Module for StageModule {
    fn name(&self) -> &'static str {
        "stage"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["workqueue", "timer", "event", "connectivity", "led"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        self.stage.restore_desired();

        // deferred changes retry on connectivity recovery
        let ctl = Arc::clone(&self.stage);
        let handler = self.events.add_handler(Event::ConnectivityOk, move |_| {
            ctl.enqueue_reconcile();
        });
        *self.handler.lock() = Some(handler);

        let ctl = Arc::clone(&self.stage);
        let timer = self.timers.add("stage reconcile", RECONCILE_INTERVAL, move || {
            let differs = {
                let status = ctl.status.lock();
                status.current.map(|c| c.name) != Some(status.desired.name)
            };
            if differs {
                ctl.enqueue_reconcile();
            }
        });
        *self.timer.lock() = Some(timer);

        self.stage.enqueue_reconcile();
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        if let Some(timer) = self.timer.lock().take() {
            self.timers.remove(timer);
        }
        if let Some(handler) = self.handler.lock().take() {
            self.events.remove_handler(handler);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
