//! Output formatting for CLI results

use super::commands::OutputFormatArg;
use crate::image::{BuildReport, ImageSpec, LaunchDirective};
use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &BuildReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize report as JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize report as YAML")
            }
            OutputFormat::Human => Ok(Self::human_report(report)),
        }
    }

    pub fn format_spec(&self, spec: &ImageSpec) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(spec).context("Failed to serialize spec as JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(spec).context("Failed to serialize spec as YAML")
            }
            OutputFormat::Human => Ok(Self::human_spec(spec)),
        }
    }

    fn human_report(report: &BuildReport) -> String {
        let mut out = Self::human_spec(&report.spec);
        out.push_str(&format!("Image:       {}\n", report.image_path.display()));
        out.push_str(&format!(
            "Environment: {}\n",
            if report.reused_environment {
                "reused"
            } else {
                "produced"
            }
        ));
        out
    }

    fn human_spec(spec: &ImageSpec) -> String {
        let mut out = String::new();
        out.push_str(&format!("Application: {}\n", spec.metadata.name));
        out.push_str(&format!("Variant:     {}\n", spec.metadata.variant));
        out.push_str(&format!("Port:        {}\n", spec.port));
        out.push_str(&format!("Manifest:    {}\n", spec.metadata.environment));
        match &spec.schema_artifact {
            Some(artifact) => out.push_str(&format!("Schema:      {}\n", artifact)),
            None => out.push_str("Schema:      (not exported)\n"),
        }
        match &spec.launch {
            LaunchDirective::DirectCommand { .. } => {
                out.push_str(&format!("Launch:      {}\n", spec.launch.argv().join(" ")));
            }
            LaunchDirective::DelegatedScript { script } => {
                out.push_str(&format!("Launch:      {} (delegated)\n", script));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageMetadata, BIND_HOST, LISTEN_PORT};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn sample_report() -> BuildReport {
        BuildReport {
            spec: ImageSpec {
                version: "1.0".to_string(),
                metadata: ImageMetadata {
                    name: "svc".to_string(),
                    variant: "production".to_string(),
                    build_id: "b-1".to_string(),
                    built_at: Utc::now(),
                    environment: "sha256:abc".to_string(),
                },
                env: HashMap::new(),
                port: LISTEN_PORT,
                schema_artifact: Some("schema.export".to_string()),
                launch: LaunchDirective::DirectCommand {
                    command: vec!["serve".to_string()],
                    host: BIND_HOST.to_string(),
                    port: LISTEN_PORT,
                    reload: false,
                },
            },
            image_path: PathBuf::from("images/svc"),
            reused_environment: true,
        }
    }

    #[test]
    fn test_json_format_is_valid() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_report(&sample_report())
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["spec"]["metadata"]["name"], "svc");
        assert_eq!(parsed["spec"]["port"], 80);
        assert_eq!(parsed["spec"]["launch"]["strategy"], "direct_command");
        assert_eq!(parsed["reused_environment"], true);
    }

    #[test]
    fn test_yaml_format_is_valid() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_report(&sample_report())
            .unwrap();

        let parsed: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert_eq!(
            parsed["spec"]["metadata"]["variant"].as_str(),
            Some("production")
        );
    }

    #[test]
    fn test_human_format_mentions_the_essentials() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_report(&sample_report())
            .unwrap();

        assert!(output.contains("Application: svc"));
        assert!(output.contains("Port:        80"));
        assert!(output.contains("--host 0.0.0.0"));
        assert!(output.contains("Environment: reused"));
    }

    #[test]
    fn test_human_format_delegated_script() {
        let mut report = sample_report();
        report.spec.launch = LaunchDirective::DelegatedScript {
            script: "app/entrypoint.sh".to_string(),
        };
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_report(&report)
            .unwrap();
        assert!(output.contains("app/entrypoint.sh (delegated)"));
    }
}
