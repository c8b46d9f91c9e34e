use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::MillConfig;
use crate::provision::{ShapeFetcher, ShapeProvisioner};
use crate::run::MillRun;
use crate::store::FsCorpusStore;
use crate::validate::HttpValidator;

#[derive(Debug, Parser)]
#[command(
    name = "shacl-mill",
    disable_help_subcommand = true,
    about = "Validate harvested graph documents against SHACL shape graphs",
    long_about = "Provision configured shape graphs into the corpus store, validate every (document, shape) pair in a bucket through the SHACL service, and persist one aggregated result object per run.",
    after_help = "Config keys follow the gleaner layout (gleaner.runid, shapefiles[].ref, shacl.*). Flags override the config file."
)]
/// CLI for `shacl-mill`.
///
/// Common usage:
/// - Full run: `--config gleaner.yaml --store-root /data/store --bucket summoned`
/// - Shapes only: `--config gleaner.yaml --store-root /data/store --provision-only`
/// - Reuse already provisioned shapes: add `--skip-provision`
struct MillCli {
    #[arg(long, value_name = "FILE", help = "YAML config file")]
    config: PathBuf,
    #[arg(
        long = "store-root",
        value_name = "DIR",
        help = "Directory holding one subdirectory per bucket"
    )]
    store_root: PathBuf,
    #[arg(
        long,
        value_name = "NAME",
        required_unless_present = "provision_only",
        help = "Bucket whose documents are validated"
    )]
    bucket: Option<String>,
    #[arg(long = "run-id", help = "Override gleaner.runid")]
    run_id: Option<String>,
    #[arg(
        long,
        value_parser = parse_positive_usize,
        help = "Override shacl.concurrency (validation calls in flight)"
    )]
    concurrency: Option<usize>,
    #[arg(long, value_name = "URL", help = "Override shacl.endpoint")]
    endpoint: Option<String>,
    #[arg(
        long = "timeout-secs",
        help = "Override shacl.timeout_secs (0 disables the per-call deadline)"
    )]
    timeout_secs: Option<u64>,
    #[arg(
        long = "skip-provision",
        conflicts_with = "provision_only",
        help = "Validate against shapes already in the shape bucket"
    )]
    skip_provision: bool,
    #[arg(long = "provision-only", help = "Publish shapes and exit")]
    provision_only: bool,
}

impl MillCli {
    fn apply_overrides(&self, config: &mut MillConfig) {
        if let Some(run_id) = &self.run_id {
            config.run.run_id = run_id.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.validation.concurrency = concurrency;
        }
        if let Some(endpoint) = &self.endpoint {
            config.validation.endpoint = endpoint.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.validation.timeout_secs = timeout_secs;
        }
    }
}

/// Entry point for the `shacl-mill` binary; prints a JSON report on stdout.
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let Some(cli) =
        parse_cli::<MillCli, _>(std::iter::once("shacl-mill".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let mut config = MillConfig::load(&cli.config)?;
    cli.apply_overrides(&mut config);
    let store = FsCorpusStore::new(&cli.store_root);
    let settings = &config.validation;

    if cli.provision_only {
        let fetcher = ShapeFetcher::new(settings.call_timeout())
            .with_user_agent(settings.user_agent.clone());
        let report = ShapeProvisioner::new(&store, settings.shape_bucket.clone(), fetcher)
            .provision(&config.shape_files);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let bucket = cli
        .bucket
        .as_deref()
        .ok_or("--bucket is required unless --provision-only is set")?;
    let validator = HttpValidator::new(settings.endpoint.clone(), settings.call_timeout())
        .with_user_agent(settings.user_agent.clone());
    let summary = MillRun::new(&store, &validator, &config)
        .skip_provision(cli.skip_provision)
        .execute(bucket)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw.parse::<usize>().map_err(|_| {
        format!(
            "Could not parse --concurrency value '{}' as a positive integer",
            raw
        )
    })?;
    if parsed == 0 {
        return Err("--concurrency must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("shacl-mill")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn bucket_is_required_unless_provision_only() {
        let missing = MillCli::try_parse_from(args(&["--config", "c.yaml", "--store-root", "s"]));
        assert!(missing.is_err());

        let cli = MillCli::try_parse_from(args(&[
            "--config",
            "c.yaml",
            "--store-root",
            "s",
            "--provision-only",
        ]))
        .unwrap();
        assert!(cli.provision_only);
        assert!(cli.bucket.is_none());
    }

    #[test]
    fn zero_concurrency_and_conflicting_modes_are_rejected() {
        let zero = MillCli::try_parse_from(args(&[
            "--config",
            "c.yaml",
            "--store-root",
            "s",
            "--bucket",
            "b",
            "--concurrency",
            "0",
        ]));
        assert!(zero.is_err());

        let both = MillCli::try_parse_from(args(&[
            "--config",
            "c.yaml",
            "--store-root",
            "s",
            "--skip-provision",
            "--provision-only",
        ]));
        assert!(both.is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = MillCli::try_parse_from(args(&[
            "--config",
            "c.yaml",
            "--store-root",
            "s",
            "--bucket",
            "b",
            "--run-id",
            "override",
            "--concurrency",
            "5",
            "--endpoint",
            "http://validator:9000/uploader",
            "--timeout-secs",
            "0",
        ]))
        .unwrap();
        let mut config = MillConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.run.run_id, "override");
        assert_eq!(config.validation.concurrency, 5);
        assert_eq!(config.validation.endpoint, "http://validator:9000/uploader");
        assert_eq!(config.validation.call_timeout(), None);
    }

    #[test]
    fn provision_only_publishes_local_shapes_into_store_root() {
        let temp = tempdir().unwrap();
        let shape = temp.path().join("local.ttl");
        fs::write(&shape, b"<s> a <Shape> .").unwrap();
        let config_path = temp.path().join("gleaner.yaml");
        fs::write(
            &config_path,
            format!(
                "gleaner:\n  runid: r\nshapefiles:\n  - ref: {}\n",
                shape.display()
            ),
        )
        .unwrap();
        let store_root = temp.path().join("store");

        run(vec![
            "--config".to_string(),
            config_path.display().to_string(),
            "--store-root".to_string(),
            store_root.display().to_string(),
            "--provision-only".to_string(),
        ]
        .into_iter())
        .unwrap();

        assert_eq!(
            fs::read(store_root.join("gleaner/local.ttl")).unwrap(),
            b"<s> a <Shape> ."
        );
    }
}
