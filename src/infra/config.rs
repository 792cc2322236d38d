//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
    /// Read endpoint serving `{ "GoogleSheetData": [[...]] }`
    #[serde(default = "default_read_url")]
    pub read_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self { read_url: default_read_url(), timeout_ms: default_timeout_ms() }
    }
}

fn default_read_url() -> String {
    "http://127.0.0.1:8787/exec".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Opaque form keys for each RSVP field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormFields {
    #[serde(default = "default_name_field")]
    pub name: String,
    #[serde(default = "default_email_field")]
    pub email: String,
    #[serde(default = "default_guests_field")]
    pub guests: String,
    #[serde(default = "default_message_field")]
    pub message: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            name: default_name_field(),
            email: default_email_field(),
            guests: default_guests_field(),
            message: default_message_field(),
        }
    }
}

fn default_name_field() -> String {
    "entry.405401269".to_string()
}

fn default_email_field() -> String {
    "entry.1755234596".to_string()
}

fn default_guests_field() -> String {
    "entry.1335956832".to_string()
}

fn default_message_field() -> String {
    "entry.893740636".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    #[serde(default = "default_submit_url")]
    pub submit_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub fields: FormFields,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            submit_url: default_submit_url(),
            timeout_ms: default_timeout_ms(),
            fields: FormFields::default(),
        }
    }
}

fn default_submit_url() -> String {
    "http://127.0.0.1:8787/formResponse".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Wait after a submission before re-reading the sheet
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { settle_delay_ms: default_settle_delay_ms() }
    }
}

fn default_settle_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntroConfig {
    /// Offsets of each reveal stage from start
    #[serde(default = "default_stage_offsets_ms")]
    pub stage_offsets_ms: Vec<u64>,
    #[serde(default = "default_exit_ms")]
    pub exit_ms: u64,
    #[serde(default = "default_complete_ms")]
    pub complete_ms: u64,
    /// Step between staggered fade-in blocks
    #[serde(default = "default_fade_step_ms")]
    pub fade_step_ms: u64,
    /// Exit animation length for overlays
    #[serde(default = "default_overlay_exit_ms")]
    pub overlay_exit_ms: u64,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            stage_offsets_ms: default_stage_offsets_ms(),
            exit_ms: default_exit_ms(),
            complete_ms: default_complete_ms(),
            fade_step_ms: default_fade_step_ms(),
            overlay_exit_ms: default_overlay_exit_ms(),
        }
    }
}

fn default_stage_offsets_ms() -> Vec<u64> {
    vec![1000, 3000, 5000]
}

fn default_exit_ms() -> u64 {
    10_000
}

fn default_complete_ms() -> u64 {
    12_000
}

fn default_fade_step_ms() -> u64 {
    200
}

fn default_overlay_exit_ms() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationConfig {
    #[serde(default = "default_groom")]
    pub groom: String,
    #[serde(default = "default_bride")]
    pub bride: String,
    /// Display date, may span lines
    #[serde(default = "default_date")]
    pub date: String,
    /// Ceremony start, RFC 3339
    #[serde(default = "default_date_iso")]
    pub date_iso: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_rsvp_contact")]
    pub rsvp_contact: String,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            groom: default_groom(),
            bride: default_bride(),
            date: default_date(),
            date_iso: default_date_iso(),
            location: default_location(),
            rsvp_contact: default_rsvp_contact(),
        }
    }
}

fn default_groom() -> String {
    "Ltryl".to_string()
}

fn default_bride() -> String {
    "Noenyl".to_string()
}

fn default_date() -> String {
    "May 18, 2026\nMonday".to_string()
}

fn default_date_iso() -> String {
    "2026-05-18T14:30:00+08:00".to_string()
}

fn default_location() -> String {
    "Farm Hills Garden, Silang, Cavite".to_string()
}

fn default_rsvp_contact() -> String {
    "0426572257 | 0491174764".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

fn default_metrics_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub intro: IntroConfig,
    #[serde(default)]
    pub invitation: InvitationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Couple, date and venue shown on the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationDetails {
    pub groom: String,
    pub bride: String,
    pub date: String,
    pub location: String,
    pub rsvp_contact: String,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    sheet_read_url: String,
    sheet_timeout_ms: u64,
    form_submit_url: String,
    form_timeout_ms: u64,
    form_fields: FormFields,
    settle_delay_ms: u64,
    intro_stage_offsets_ms: Vec<u64>,
    intro_exit_ms: u64,
    intro_complete_ms: u64,
    fade_step_ms: u64,
    overlay_exit_ms: u64,
    invitation: InvitationDetails,
    wedding_date_iso: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let TomlConfig { sheet, form, refresh, intro, invitation, metrics } = toml_config;

        Self {
            sheet_read_url: sheet.read_url,
            sheet_timeout_ms: sheet.timeout_ms,
            form_submit_url: form.submit_url,
            form_timeout_ms: form.timeout_ms,
            form_fields: form.fields,
            settle_delay_ms: refresh.settle_delay_ms,
            intro_stage_offsets_ms: intro.stage_offsets_ms,
            intro_exit_ms: intro.exit_ms,
            intro_complete_ms: intro.complete_ms,
            fade_step_ms: intro.fade_step_ms,
            overlay_exit_ms: intro.overlay_exit_ms,
            invitation: InvitationDetails {
                groom: invitation.groom,
                bride: invitation.bride,
                date: invitation.date,
                location: invitation.location,
                rsvp_contact: invitation.rsvp_contact,
            },
            wedding_date_iso: invitation.date_iso,
            metrics_interval_secs: metrics.interval_secs,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let config = Self::from_toml(toml_config, path.display().to_string());
        config.validate().with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from a path, falling back to defaults when it can't be read
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path, error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut previous: Option<u64> = None;
        for offset in self
            .intro_stage_offsets_ms
            .iter()
            .chain([&self.intro_exit_ms, &self.intro_complete_ms])
        {
            if let Some(prev) = previous {
                anyhow::ensure!(
                    *offset > prev,
                    "intro offsets must be strictly increasing ({offset}ms after {prev}ms)"
                );
            }
            previous = Some(*offset);
        }

        OffsetDateTime::parse(&self.wedding_date_iso, &Rfc3339)
            .with_context(|| format!("invitation.date_iso {:?} is not RFC 3339", self.wedding_date_iso))?;
        Ok(())
    }

    pub fn sheet_read_url(&self) -> &str {
        &self.sheet_read_url
    }

    pub fn sheet_timeout(&self) -> Duration {
        Duration::from_millis(self.sheet_timeout_ms)
    }

    pub fn form_submit_url(&self) -> &str {
        &self.form_submit_url
    }

    pub fn form_timeout(&self) -> Duration {
        Duration::from_millis(self.form_timeout_ms)
    }

    pub fn form_fields(&self) -> &FormFields {
        &self.form_fields
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn intro_stage_offsets(&self) -> Vec<Duration> {
        self.intro_stage_offsets_ms.iter().copied().map(Duration::from_millis).collect()
    }

    pub fn intro_exit(&self) -> Duration {
        Duration::from_millis(self.intro_exit_ms)
    }

    pub fn intro_complete(&self) -> Duration {
        Duration::from_millis(self.intro_complete_ms)
    }

    pub fn fade_step(&self) -> Duration {
        Duration::from_millis(self.fade_step_ms)
    }

    pub fn overlay_exit(&self) -> Duration {
        Duration::from_millis(self.overlay_exit_ms)
    }

    pub fn invitation(&self) -> &InvitationDetails {
        &self.invitation
    }

    /// Ceremony start; defaults are validated, so this only fails for
    /// hand-built configs
    pub fn wedding_date(&self) -> anyhow::Result<OffsetDateTime> {
        OffsetDateTime::parse(&self.wedding_date_iso, &Rfc3339)
            .with_context(|| format!("invalid wedding date {:?}", self.wedding_date_iso))
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sheet_read_url(), "http://127.0.0.1:8787/exec");
        assert_eq!(config.sheet_timeout(), Duration::from_secs(10));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.form_fields().guests, "entry.1335956832");
        assert_eq!(config.config_file(), "default");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_intro_timeline() {
        let config = Config::default();
        assert_eq!(
            config.intro_stage_offsets(),
            vec![Duration::from_millis(1000), Duration::from_millis(3000), Duration::from_millis(5000)]
        );
        assert_eq!(config.intro_exit(), Duration::from_millis(10_000));
        assert_eq!(config.intro_complete(), Duration::from_millis(12_000));
        assert_eq!(config.overlay_exit(), Duration::from_millis(300));
    }

    #[test]
    fn test_wedding_date_parses() {
        let date = Config::default().wedding_date().unwrap();
        assert_eq!(date.year(), 2026);
        assert_eq!(date.offset().whole_hours(), 8);
    }

    #[test]
    fn test_resolve_config_path_default() {
        let args: Vec<String> = vec!["invite-rsvp".to_string()];
        if env::var("CONFIG_FILE").is_err() {
            assert_eq!(Config::resolve_config_path(&args), "config/dev.toml");
        }
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> =
            vec!["invite-rsvp".to_string(), "--config".to_string(), "config/prod.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> = vec!["invite-rsvp".to_string(), "--config=config/prod.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_validate_rejects_unordered_intro() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[intro]
stage_offsets_ms = [1000, 900]
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert!(config.validate().is_err());
    }
}
