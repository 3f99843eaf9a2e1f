use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tfcp_core::diag::{self, Diagnostic};
use tfcp_core::global;

use crate::error::CliError;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// List registered providers
    List,
    /// Print a provider's schema as JSON
    Schema {
        /// Provider name
        provider: String,
    },
    /// Check a provider's definition and, optionally, a configuration for it
    Validate {
        /// Provider name
        provider: String,

        /// JSON file holding the provider configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct ValidateReport<'a> {
    provider: &'a str,
    valid: bool,
    diagnostics: Vec<Diagnostic>,
}

/// Runs one command, writing its output to `out`.
/// `Ok(false)` means the command ran but found errors.
pub fn run<W: Write>(cmd: &Command, out: &mut W) -> Result<bool, CliError> {
    match cmd {
        Command::List => list(out),
        Command::Schema { provider } => schema(provider, out),
        Command::Validate { provider, config } => validate(provider, config.as_deref(), out),
    }
}

fn list<W: Write>(out: &mut W) -> Result<bool, CliError> {
    for name in global::provider_names() {
        let Some(meta) = global::provider_meta(&name) else {
            continue;
        };
        let p = meta.create();
        writeln!(
            out,
            "{} {} resources={}",
            meta.name,
            meta.version,
            p.resources_map.len()
        )?;
    }
    Ok(true)
}

fn schema<W: Write>(name: &str, out: &mut W) -> Result<bool, CliError> {
    let p = global::create_provider(name)?;
    serde_json::to_writer_pretty(&mut *out, &p.schema_document())?;
    writeln!(out)?;
    Ok(true)
}

fn read_config(path: &Path) -> Result<Value, CliError> {
    let content = fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::ParseConfig {
        path: path.display().to_string(),
        source,
    })
}

fn validate<W: Write>(name: &str, config: Option<&Path>, out: &mut W) -> Result<bool, CliError> {
    let p = global::create_provider(name)?;

    let mut diagnostics = Vec::new();
    if let Err(e) = p.internal_validate() {
        diagnostics.push(Diagnostic::error("Invalid provider definition").with_detail(e.to_string()));
    }
    if let Some(path) = config {
        let config = read_config(path)?;
        tracing::debug!(provider = name, path = %path.display(), "validate config");
        diagnostics.extend(p.validate_config(&config));
    }

    let report = ValidateReport {
        provider: name,
        valid: !diag::has_errors(&diagnostics),
        diagnostics,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(report.valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tfcp_core::ProviderError;

    fn run_to_string(cmd: Command) -> (Result<bool, CliError>, String) {
        tfcp_plugins::init();
        let mut buf = Vec::new();
        let res = run(&cmd, &mut buf);
        (res, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_list() {
        let (res, out) = run_to_string(Command::List);
        assert!(res.unwrap());
        let expected = format!("custom {} resources=0", env!("CARGO_PKG_VERSION"));
        assert!(out.lines().any(|l| l == expected), "{}", out);
    }

    #[test]
    fn test_schema() {
        let (res, out) = run_to_string(Command::Schema {
            provider: "custom".into(),
        });
        assert!(res.unwrap());
        let doc: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            doc,
            json!({"provider": {"version": 0, "block": {}}, "resource_schemas": {}})
        );
    }

    #[test]
    fn test_validate_without_config() {
        let (res, out) = run_to_string(Command::Validate {
            provider: "custom".into(),
            config: None,
        });
        assert!(res.unwrap());
        let report: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            report,
            json!({"provider": "custom", "valid": true, "diagnostics": []})
        );
    }

    #[test]
    fn test_validate_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"region": "eu-west-1"}}"#).unwrap();

        let (res, out) = run_to_string(Command::Validate {
            provider: "custom".into(),
            config: Some(file.path().to_path_buf()),
        });
        assert!(!res.unwrap());
        let report: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["valid"], json!(false));
        assert_eq!(report["diagnostics"][0]["attribute"], json!("region"));
    }

    #[test]
    fn test_validate_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "region = 1").unwrap();

        let (res, _) = run_to_string(Command::Validate {
            provider: "custom".into(),
            config: Some(file.path().to_path_buf()),
        });
        assert!(matches!(res, Err(CliError::ParseConfig { .. })));
    }

    #[test]
    fn test_unknown_provider() {
        let (res, out) = run_to_string(Command::Schema {
            provider: "nope".into(),
        });
        assert!(matches!(
            res,
            Err(CliError::Provider(ProviderError::UnknownProvider(_)))
        ));
        assert!(out.is_empty());
    }
}
