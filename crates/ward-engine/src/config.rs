use serde::{Deserialize, Serialize};
use time::Duration;
use ward_core::Role;
use ward_core::model::Severity;

/// Tunable rules of the engine, embedded as the `[engine]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How early a dose may be given before its scheduled time.
    #[serde(default = "default_grace_window_minutes")]
    pub grace_window_minutes: u32,
    #[serde(default)]
    pub escalation: EscalationConfig,
    /// How far ahead open-ended medication schedules are generated.
    #[serde(default = "default_materialization_horizon_hours")]
    pub materialization_horizon_hours: u32,
    /// Upper bound on administrations generated in one pass for one schedule.
    #[serde(default = "default_max_administrations_per_schedule")]
    pub max_administrations_per_schedule: usize,
    /// Default window for the medication due list.
    #[serde(default = "default_due_lookahead_minutes")]
    pub due_lookahead_minutes: u32,
}

fn default_grace_window_minutes() -> u32 {
    30
}
fn default_materialization_horizon_hours() -> u32 {
    48
}
fn default_max_administrations_per_schedule() -> usize {
    500
}
fn default_due_lookahead_minutes() -> u32 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_window_minutes: default_grace_window_minutes(),
            escalation: EscalationConfig::default(),
            materialization_horizon_hours: default_materialization_horizon_hours(),
            max_administrations_per_schedule: default_max_administrations_per_schedule(),
            due_lookahead_minutes: default_due_lookahead_minutes(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.materialization_horizon_hours == 0 {
            return Err("engine.materialization_horizon_hours must be > 0".into());
        }
        if self.max_administrations_per_schedule == 0 {
            return Err("engine.max_administrations_per_schedule must be > 0".into());
        }
        self.escalation.validate()
    }

    pub fn grace_window(&self) -> Duration {
        Duration::minutes(i64::from(self.grace_window_minutes))
    }

    pub fn materialization_horizon(&self) -> Duration {
        Duration::hours(i64::from(self.materialization_horizon_hours))
    }

    pub fn due_lookahead(&self) -> Duration {
        Duration::minutes(i64::from(self.due_lookahead_minutes))
    }
}

/// Response budgets and default escalation targets, by severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_critical_minutes")]
    pub critical_minutes: u32,
    #[serde(default = "default_high_minutes")]
    pub high_minutes: u32,
    #[serde(default = "default_medium_minutes")]
    pub medium_minutes: u32,
    #[serde(default = "default_low_minutes")]
    pub low_minutes: u32,
    #[serde(default = "default_senior_target")]
    pub critical_target: Role,
    #[serde(default = "default_senior_target")]
    pub high_target: Role,
    #[serde(default = "default_charge_target")]
    pub medium_target: Role,
    #[serde(default = "default_charge_target")]
    pub low_target: Role,
}

fn default_critical_minutes() -> u32 {
    5
}
fn default_high_minutes() -> u32 {
    15
}
fn default_medium_minutes() -> u32 {
    60
}
fn default_low_minutes() -> u32 {
    24 * 60
}
fn default_senior_target() -> Role {
    Role::Doctor
}
fn default_charge_target() -> Role {
    Role::HeadNurse
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            critical_minutes: default_critical_minutes(),
            high_minutes: default_high_minutes(),
            medium_minutes: default_medium_minutes(),
            low_minutes: default_low_minutes(),
            critical_target: default_senior_target(),
            high_target: default_senior_target(),
            medium_target: default_charge_target(),
            low_target: default_charge_target(),
        }
    }
}

impl EscalationConfig {
    pub fn validate(&self) -> Result<(), String> {
        let budgets = [
            ("critical", self.critical_minutes),
            ("high", self.high_minutes),
            ("medium", self.medium_minutes),
            ("low", self.low_minutes),
        ];
        for (name, minutes) in budgets {
            if minutes == 0 {
                return Err(format!("engine.escalation.{name}_minutes must be > 0"));
            }
        }
        let targets = [
            self.critical_target,
            self.high_target,
            self.medium_target,
            self.low_target,
        ];
        if targets
            .iter()
            .any(|role| matches!(role, Role::System | Role::WardClerk))
        {
            return Err("engine.escalation targets must be clinical roles".into());
        }
        Ok(())
    }

    pub fn budget(&self, severity: Severity) -> Duration {
        let minutes = match severity {
            Severity::Critical => self.critical_minutes,
            Severity::High => self.high_minutes,
            Severity::Medium => self.medium_minutes,
            Severity::Low => self.low_minutes,
        };
        Duration::minutes(i64::from(minutes))
    }

    pub fn target(&self, severity: Severity) -> Role {
        match severity {
            Severity::Critical => self.critical_target,
            Severity::High => self.high_target,
            Severity::Medium => self.medium_target,
            Severity::Low => self.low_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.escalation.budget(Severity::Critical), Duration::minutes(5));
        assert_eq!(config.escalation.budget(Severity::High), Duration::minutes(15));
        assert_eq!(config.escalation.budget(Severity::Medium), Duration::minutes(60));
        assert_eq!(config.escalation.budget(Severity::Low), Duration::hours(24));
        assert_eq!(config.escalation.target(Severity::Critical), Role::Doctor);
        assert_eq!(config.grace_window(), Duration::minutes(30));
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            grace_window_minutes = 15

            [escalation]
            high_minutes = 10
            medium_target = "doctor"
            "#,
        )
        .unwrap();
        assert_eq!(config.grace_window_minutes, 15);
        assert_eq!(config.escalation.high_minutes, 10);
        assert_eq!(config.escalation.critical_minutes, 5);
        assert_eq!(config.escalation.target(Severity::Medium), Role::Doctor);
        assert_eq!(config.materialization_horizon_hours, 48);
    }

    #[test]
    fn test_validation_rejects_non_clinical_target() {
        let mut config = EngineConfig::default();
        config.escalation.low_target = Role::WardClerk;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.escalation.critical_minutes = 0;
        assert!(config.validate().unwrap_err().contains("critical"));
    }
}
