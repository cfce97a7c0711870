// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layer precedence across defaults, file and environment.

use std::io::Write;

use keel_server_config::{
	load_from_sources, ConfigError, DefaultsSource, EnvSource, LogFormat, RemovalPolicy,
	TomlSource,
};

fn config_file(contents: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(contents.as_bytes()).unwrap();
	file
}

#[test]
fn environment_overrides_file_overrides_defaults() {
	let file = config_file(
		r#"
[http]
host = "127.0.0.1"
port = 9090

[gateway]
endpoint_name = "endpoint-fromfile00"
region = "eu-central-1"

[provisioner]
instance_type = "ml.m5.xlarge"
removal_policy = "retain"
"#,
	);

	let config = load_from_sources(vec![
		Box::new(EnvSource::from_vars([
			("KEEL_SERVER_PORT", "7000"),
			("KEEL_ENDPOINT_NAME", "endpoint-fromenv000"),
		])),
		Box::new(TomlSource::new(file.path())),
		Box::new(DefaultsSource),
	])
	.unwrap();

	assert_eq!(config.socket_addr(), "127.0.0.1:7000");
	assert_eq!(config.gateway.endpoint_name, "endpoint-fromenv000");
	assert_eq!(config.gateway.region, "eu-central-1");
	assert_eq!(
		config.gateway.runtime_url,
		"https://runtime.sagemaker.eu-central-1.amazonaws.com"
	);
	assert_eq!(config.provisioner.instance_type, "ml.m5.xlarge");
	assert_eq!(config.provisioner.removal_policy, RemovalPolicy::Retain);
	assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn missing_endpoint_name_falls_back() {
	let config = load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(EnvSource::from_vars(Vec::<(String, String)>::new())),
	])
	.unwrap();
	assert_eq!(config.gateway.endpoint_name, "flask-endpoint");
	assert_eq!(config.gateway.invoke_timeout_secs, 60);
}

#[test]
fn invalid_merged_values_fail_validation() {
	let file = config_file("[provisioner]\nendpoint_name_length = 60\n");
	let err = load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(file.path())),
	])
	.unwrap_err();
	assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn malformed_file_is_reported_with_path() {
	let file = config_file("[http\nport = 1");
	let err = load_from_sources(vec![Box::new(TomlSource::new(file.path()))]).unwrap_err();
	match err {
		ConfigError::TomlParse { path, .. } => assert_eq!(path, file.path()),
		other => panic!("unexpected error: {other}"),
	}
}
