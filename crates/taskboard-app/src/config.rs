use std::{collections::HashSet, fs, path::Path, str::FromStr};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use taskboard_core::{AccessPolicy, TaskSort, TaskStatus};

use crate::api::DEFAULT_PAGE_LIMIT;
use crate::demo::{DemoOptions, SimulatedLatency};

const CONFIG_FILE: &str = "config.toml";
const MAX_LATENCY_SCALE: f64 = 100.0;

/// Top-level configuration loaded from `<data-dir>/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Status set and status-change rules.
    #[serde(default)]
    pub profile: ProfileConfig,
    /// Demo backend tunables.
    #[serde(default)]
    pub demo: DemoConfig,
    /// List defaults.
    #[serde(default)]
    pub view: ViewConfig,
}

impl ProjectConfig {
    /// Load configuration from a data directory. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config {}", config_path.display()))
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.profile.deployment()?;
        self.demo.ensure_valid_latency()?;
        self.view.ensure_valid()
    }

    /// Resolved deployment profile.
    ///
    /// # Errors
    /// Returns an error if the profile section is inconsistent.
    pub fn deployment(&self) -> Result<DeploymentProfile> {
        self.profile.deployment()
    }

    /// Demo backend options derived from the profile and `[demo]` section.
    ///
    /// # Errors
    /// Returns an error if the profile section is inconsistent.
    pub fn demo_options(&self) -> Result<DemoOptions> {
        Ok(DemoOptions {
            latency: self.demo.latency(),
            default_status: self.deployment()?.default_status(),
            seed: self.demo.seed,
        })
    }
}

/// Built-in status sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfilePreset {
    /// todo, in-progress, done.
    #[default]
    Board,
    /// backlog, todo, in-progress, in-review, done, cancelled.
    Workspace,
}

/// `[profile]` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    #[serde(default)]
    preset: ProfilePreset,
    #[serde(default)]
    statuses: Option<Vec<TaskStatus>>,
    #[serde(default)]
    default_status: Option<TaskStatus>,
    #[serde(default)]
    assignee_status_changes: bool,
}

impl ProfileConfig {
    fn deployment(&self) -> Result<DeploymentProfile> {
        let base = match self.preset {
            ProfilePreset::Board => DeploymentProfile::board(),
            ProfilePreset::Workspace => DeploymentProfile::workspace(),
        };
        let statuses = self.statuses.clone().unwrap_or(base.statuses);

        let mut seen = HashSet::new();
        for status in &statuses {
            if !seen.insert(*status) {
                bail!("duplicate status detected: {status}");
            }
        }
        if !statuses.contains(&TaskStatus::Done) {
            bail!("status set must include {}", TaskStatus::Done);
        }

        let default_status = match self.default_status {
            Some(status) => status,
            None if statuses.contains(&base.default_status) => base.default_status,
            None => statuses[0],
        };
        if !statuses.contains(&default_status) {
            bail!("default status '{default_status}' is not part of the configured statuses");
        }

        Ok(DeploymentProfile {
            statuses,
            default_status,
            assignee_status_changes: self.assignee_status_changes,
        })
    }
}

/// `[demo]` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    /// Multiplier applied to simulated latency; `0` disables it.
    #[serde(default = "DemoConfig::default_latency_scale")]
    pub latency_scale: f64,
    /// Seed empty storage with sample tasks.
    #[serde(default = "DemoConfig::default_seed")]
    pub seed: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            latency_scale: Self::default_latency_scale(),
            seed: Self::default_seed(),
        }
    }
}

impl DemoConfig {
    const fn default_latency_scale() -> f64 {
        1.0
    }

    const fn default_seed() -> bool {
        true
    }

    /// Latency derived from `latency_scale`.
    #[must_use]
    pub const fn latency(&self) -> SimulatedLatency {
        SimulatedLatency::new(self.latency_scale)
    }

    fn ensure_valid_latency(&self) -> Result<()> {
        if !self.latency_scale.is_finite() || !(0.0..=MAX_LATENCY_SCALE).contains(&self.latency_scale) {
            bail!(
                "latency_scale must be between 0 and {MAX_LATENCY_SCALE}, got {}",
                self.latency_scale
            );
        }
        Ok(())
    }
}

/// `[view]` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    #[serde(default)]
    sort: Option<String>,
    /// Tasks per page for list loads.
    #[serde(default = "ViewConfig::default_page_size")]
    pub page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            sort: None,
            page_size: Self::default_page_size(),
        }
    }
}

impl ViewConfig {
    const fn default_page_size() -> usize {
        DEFAULT_PAGE_LIMIT
    }

    /// Configured default sort, or `createdAt desc`.
    #[must_use]
    pub fn sort(&self) -> TaskSort {
        self.sort
            .as_deref()
            .and_then(|raw| TaskSort::from_str(raw).ok())
            .unwrap_or_default()
    }

    fn ensure_valid(&self) -> Result<()> {
        if let Some(raw) = &self.sort {
            TaskSort::from_str(raw).with_context(|| format!("invalid view.sort '{raw}'"))?;
        }
        if self.page_size == 0 {
            bail!("view.page_size must be greater than zero");
        }
        Ok(())
    }
}

/// Status variant set and status-change rules in force.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentProfile {
    statuses: Vec<TaskStatus>,
    default_status: TaskStatus,
    assignee_status_changes: bool,
}

impl Default for DeploymentProfile {
    fn default() -> Self {
        Self::board()
    }
}

impl DeploymentProfile {
    /// todo / in-progress / done.
    #[must_use]
    pub fn board() -> Self {
        Self {
            statuses: vec![TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done],
            default_status: TaskStatus::Todo,
            assignee_status_changes: false,
        }
    }

    /// Every status, with `backlog` as the default.
    #[must_use]
    pub fn workspace() -> Self {
        Self {
            statuses: TaskStatus::ALL.to_vec(),
            default_status: TaskStatus::Backlog,
            assignee_status_changes: false,
        }
    }

    /// Allow assignees to change the status of their tasks.
    #[must_use]
    pub const fn with_assignee_status_changes(mut self, enabled: bool) -> Self {
        self.assignee_status_changes = enabled;
        self
    }

    /// Statuses a task may take.
    #[must_use]
    pub fn statuses(&self) -> &[TaskStatus] {
        &self.statuses
    }

    /// Status given to tasks created without one.
    #[must_use]
    pub const fn default_status(&self) -> TaskStatus {
        self.default_status
    }

    /// Whether `status` is part of the profile.
    #[must_use]
    pub fn allows(&self, status: TaskStatus) -> bool {
        self.statuses.contains(&status)
    }

    /// Comma-separated list of allowed statuses for error messages.
    #[must_use]
    pub fn status_hint(&self) -> String {
        self.statuses
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Authorization policy implied by the profile.
    #[must_use]
    pub const fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.assignee_status_changes)
    }
}
