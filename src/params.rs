
use std::str::FromStr;

use anyhow::{bail, Result};
use serde_json::{json, Map, Value};

use crate::config::Config;


pub const PIXEL_SIZE: &'static str = "pixel_size";
pub const GAIN: &'static str = "gain";
pub const OFFSET: &'static str = "offset";
pub const PROCESSING_METHOD: &'static str = "processing_method";
pub const LOCALIZATION_METHOD: &'static str = "localization_method";
pub const SIGMA: &'static str = "sigma";
pub const FITTING_RADIUS: &'static str = "fitting_radius";
pub const CREATE_RECONSTRUCTED_IMAGE: &'static str = "create_reconstructed_image";


/// The settings for one analysis call: configured defaults plus per-call overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
	values: Map<String,Value>
}

impl AnalysisParams {

	pub fn from_config(config: &Config) -> Self {
		Self {
			values: config.default_parameters()
		}
	}

	pub fn from_values(values: Map<String,Value>) -> Self {
		Self {
			values
		}
	}

	/// Shallow override: matching keys are replaced, unknown keys are simply added.
	pub fn apply(&mut self, overrides: &Map<String,Value>) {
		for (key, value) in overrides {
			self.values.insert(key.clone(), value.clone());
		}
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.values.insert(key.into(), value.into());
	}

	pub fn values(&self) -> &Map<String,Value> {
		&self.values
	}

	/// The value for the key, falling back to the built-in default when the configuration lacks it.
	pub fn get(&self, key: &str) -> Value {
		self.values.get(key)
			.cloned()
			.unwrap_or_else(|| builtin_default(key))
	}

	pub fn create_reconstructed_image(&self) -> bool {
		match self.get(CREATE_RECONSTRUCTED_IMAGE) {
			Value::Bool(b) => b,
			Value::String(s) => !matches!(s.to_lowercase().as_str(), "false" | "no" | "0" | ""),
			Value::Number(n) => n.as_f64() != Some(0.0),
			Value::Null => false,
			_ => true
		}
	}
}


fn builtin_default(key: &str) -> Value {
	match key {
		PIXEL_SIZE | GAIN | OFFSET => json!(100.0),
		PROCESSING_METHOD => json!("Wavelet filter (B-Spline)"),
		LOCALIZATION_METHOD => json!("PSF: Integrated Gaussian"),
		SIGMA => json!(1.6),
		FITTING_RADIUS => json!(3),
		CREATE_RECONSTRUCTED_IMAGE => json!(true),
		_ => Value::Null
	}
}


/// A `key=value` parameter override from the command line.
/// Values that parse as JSON (numbers, booleans, ...) keep their type, anything else is a string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamOverride {
	pub key: String,
	pub value: Value
}

impl FromStr for ParamOverride {

	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self,Self::Err> {

		let Some((key, value)) = s.split_once('=')
			else { bail!("Expected KEY=VALUE, not: {}", s); };
		let key = key.trim();
		if key.is_empty() {
			bail!("Missing parameter name in: {}", s);
		}

		let value = serde_json::from_str::<Value>(value)
			.unwrap_or_else(|_| Value::String(value.to_string()));

		Ok(Self {
			key: key.to_string(),
			value
		})
	}
}


pub fn overrides_map(overrides: impl IntoIterator<Item=ParamOverride>) -> Map<String,Value> {
	overrides.into_iter()
		.map(|o| (o.key, o.value))
		.collect()
}
