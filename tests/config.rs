use clap::Parser;
use procwatch::cli::Cli;
use procwatch::config::{Config, FdLimit, MetricLabels};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

/// A helper function to run a test with a temporary config file.
fn with_config_file<F>(toml_content: &str, test_fn: F)
where
    F: FnOnce(PathBuf),
{
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    test_fn(file.path().to_path_buf());
}

#[test]
fn defaults_apply_without_a_file() {
    let cli = Cli::try_parse_from(["procwatch", "--config", "/nonexistent/procwatch.toml"]).unwrap();
    let config = Config::load(&cli).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.monitor.prefix, "process_");
    assert_eq!(config.monitor.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.monitor.fd_limit, FdLimit::Hard);
    assert_eq!(config.monitor.labels, MetricLabels::default());
    assert!(config.monitor.dimensions.is_empty());
    assert!(config.metrics.enabled);
    assert!(!config.metrics.log_metrics);
}

#[test]
fn file_values_override_defaults() {
    let toml_content = r#"
        log_level = "debug"
        [monitor]
        poll_interval_ms = 250
        prefix = "myapp_"
        fd_limit = "soft"
        dimensions = [["service", "api"], ["zone", "b"]]
        [monitor.labels]
        cpu_usage = "cpu"
        [metrics]
        listen_address = "0.0.0.0:9000"
        log_metrics = true
        log_aggregation_seconds = 5
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["procwatch", "--config", path.to_str().unwrap()]).unwrap();
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.monitor.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.monitor.prefix, "myapp_");
        assert_eq!(config.monitor.fd_limit, FdLimit::Soft);
        assert_eq!(
            config.monitor.dimensions,
            vec![
                ("service".to_string(), "api".to_string()),
                ("zone".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(config.monitor.labels.cpu_usage, "cpu");
        // Labels not named in the file keep their defaults.
        assert_eq!(config.monitor.labels.open_fds, "open_fds");
        assert_eq!(config.metrics.listen_address.port(), 9000);
        assert!(config.metrics.log_metrics);
        assert_eq!(config.metrics.log_aggregation_seconds, 5);
    });
}

#[test]
fn cli_flags_override_the_file() {
    let toml_content = r#"
        [monitor]
        poll_interval_ms = 250
        prefix = "file_"
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from([
            "procwatch",
            "--config",
            path.to_str().unwrap(),
            "--poll-interval-ms",
            "75",
            "--listen-address",
            "127.0.0.1:9999",
            "--log-metrics",
        ])
        .unwrap();
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.monitor.poll_interval_ms, 75);
        assert_eq!(config.monitor.prefix, "file_");
        assert_eq!(config.metrics.listen_address.port(), 9999);
        assert!(config.metrics.log_metrics);
    });
}

#[test]
fn zero_interval_is_rejected() {
    with_config_file("[monitor]\npoll_interval_ms = 0\n", |path| {
        let cli = Cli::try_parse_from(["procwatch", "--config", path.to_str().unwrap()]).unwrap();
        let err = Config::load(&cli).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"), "{err}");
    });
}

#[test]
fn unknown_fd_limit_is_rejected() {
    with_config_file("[monitor]\nfd_limit = \"medium\"\n", |path| {
        let cli = Cli::try_parse_from(["procwatch", "--config", path.to_str().unwrap()]).unwrap();
        assert!(Config::load(&cli).is_err());
    });
}
