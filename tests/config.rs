
mod util;


use std::path::PathBuf;
use std::time::Duration;

use galvanic_assert::{assert_that, matchers::*};
use indoc::indoc;
use serde_json::{json, Value};

use thunderstorm_automator::config::Config;
use thunderstorm_automator::logging;
use thunderstorm_automator::platform::Platform;

use crate::util::work_dir::WorkDir;


#[test]
fn defaults() {
	let _logging = logging::init_test();

	let config = Config::for_platform(Platform::Linux);

	assert_that!(&config.fiji_url(), eq(Some("https://downloads.imagej.net/fiji/latest/fiji-linux64.zip")));
	assert_that!(&config.analysis_timeout(), eq(Duration::from_secs(300)));
	assert_that!(&config.smoke_test_timeout(), eq(Duration::from_secs(30)));
	assert_that!(&config.plugin_asset_extension(), eq(".jar"));
	let sigma = json!(1.6);
	assert_that!(&config.get("thunderstorm.default_parameters.sigma"), eq(Some(&sigma)));
	let fitting_radius = json!(3);
	assert_that!(&config.get("thunderstorm.default_parameters.fitting_radius"), eq(Some(&fitting_radius)));

	let paths = config.fiji_install_paths();
	assert_that!(&paths.is_empty(), eq(false));
	assert_that!(&paths.iter().all(|p| p.ends_with("ImageJ-linux64")), eq(true));
}


#[test]
fn platform_selects_values() {
	let _logging = logging::init_test();

	let windows = Config::for_platform(Platform::Windows);
	assert_that!(&windows.fiji_url(), eq(Some("https://downloads.imagej.net/fiji/latest/fiji-win64.zip")));
	assert_that!(&windows.fiji_install_paths()[0].to_string_lossy().ends_with("ImageJ-win64.exe"), eq(true));

	let darwin = Config::for_platform(Platform::Darwin);
	let install_dir = darwin.default_install_dir();
	let install_dir = install_dir.to_string_lossy();
	assert_that!(&install_dir.as_ref(), eq("/Applications"));
}


#[test]
fn get_missing() {
	let _logging = logging::init_test();

	let config = Config::for_platform(Platform::Linux);
	let fallback = json!("fallback");

	assert_that!(&config.get("nope"), eq(None));
	assert_that!(&config.get("fiji.nope.deeper"), eq(None));
	// walking through a scalar
	assert_that!(&config.get("analysis.timeout.secs"), eq(None));
	assert_that!(&config.get_or("fiji.urls.nope", &fallback), eq(&fallback));
	let timeout = json!(300);
	assert_that!(&config.get_or("analysis.timeout", &fallback), eq(&timeout));
}


#[test]
fn set_creates_intermediates() {
	let _logging = logging::init_test();

	let mut config = Config::for_platform(Platform::Linux);

	config.set("a.b.c", 5);
	let five = json!(5);
	assert_that!(&config.get("a.b.c"), eq(Some(&five)));
	assert_that!(&config.get("a.b").map(Value::is_object), eq(Some(true)));

	// scalars in the way get replaced
	config.set("analysis.timeout.secs", 10);
	let ten = json!(10);
	assert_that!(&config.get("analysis.timeout.secs"), eq(Some(&ten)));

	config.set("thunderstorm.default_parameters.sigma", 2.0);
	let params = config.default_parameters();
	let sigma = json!(2.0);
	assert_that!(&params.get("sigma"), eq(Some(&sigma)));
	let gain = json!(100.0);
	assert_that!(&params.get("gain"), eq(Some(&gain)));
}


#[test]
fn merge_is_deep() {
	let _logging = logging::init_test();

	let mut config = Config::for_platform(Platform::Linux);
	let overrides = json!({
		"thunderstorm": {
			"default_parameters": {
				"pixel_size": 65.0,
				"extra": "yes"
			}
		},
		"analysis": {
			"timeout": 12
		},
		"fiji": {
			"install_paths": {
				"linux": ["/only/ImageJ-linux64"]
			}
		}
	});
	let Value::Object(overrides) = overrides
		else { panic!("not an object"); };
	config.merge(overrides);

	let params = config.default_parameters();
	let pixel_size = json!(65.0);
	assert_that!(&params.get("pixel_size"), eq(Some(&pixel_size)));
	let extra = json!("yes");
	assert_that!(&params.get("extra"), eq(Some(&extra)));
	// siblings survive
	let gain = json!(100.0);
	assert_that!(&params.get("gain"), eq(Some(&gain)));
	let sigma = json!(1.6);
	assert_that!(&params.get("sigma"), eq(Some(&sigma)));
	assert_that!(&config.analysis_timeout(), eq(Duration::from_secs(12)));
	// arrays are replaced, not merged
	assert_that!(&config.fiji_install_paths(), eq(vec![PathBuf::from("/only/ImageJ-linux64")]));
	assert_that!(&config.fiji_url(), eq(Some("https://downloads.imagej.net/fiji/latest/fiji-linux64.zip")));
}


#[test]
fn merge_is_idempotent() {
	let _logging = logging::init_test();

	let Value::Object(overrides) = json!({ "analysis": { "timeout": 12 }, "new": { "key": "value" } })
		else { panic!("not an object"); };

	let mut once = Config::for_platform(Platform::Linux);
	once.merge(overrides.clone());
	let mut twice = once.clone();
	twice.merge(overrides);

	assert_that!(&twice.values(), eq(once.values()));
	let new_key = json!("value");
	assert_that!(&twice.get("new.key"), eq(Some(&new_key)));
}


#[test]
fn merge_never_drops_sections() {
	let _logging = logging::init_test();

	let mut config = Config::for_platform(Platform::Linux);
	let Value::Object(overrides) = json!({ "fiji": "broken", "thunderstorm": { "default_parameters": 7 } })
		else { panic!("not an object"); };
	config.merge(overrides);

	assert_that!(&config.fiji_url().is_some(), eq(true));
	assert_that!(&config.default_parameters().len(), eq(8));
}


#[test]
fn load_file() {
	let _logging = logging::init_test();

	let dir = WorkDir::new();
	let file = dir.file("overrides.json");
	file.write(indoc! { r#"
		{
			"thunderstorm": {
				"default_parameters": {
					"pixel_size": 65.0
				}
			},
			"analysis": {
				"timeout": 600
			}
		}
	"# });

	let config = Config::load(Platform::Linux, Some(file.path()));
	assert_that!(&config.path(), eq(Some(file.path())));
	assert_that!(&config.analysis_timeout(), eq(Duration::from_secs(600)));
	let params = config.default_parameters();
	let pixel_size = json!(65.0);
	assert_that!(&params.get("pixel_size"), eq(Some(&pixel_size)));
	let offset = json!(100.0);
	assert_that!(&params.get("offset"), eq(Some(&offset)));
}


#[test]
fn load_bad_files_keeps_defaults() {
	let _logging = logging::init_test();

	let dir = WorkDir::new();
	let defaults = Config::for_platform(Platform::Linux);

	// missing
	let config = Config::load(Platform::Linux, Some(&dir.path().join("nope.json")));
	assert_that!(&config.values(), eq(defaults.values()));

	// not json
	let file = dir.file("garbage.json");
	file.write("{ this isn't json");
	let config = Config::load(Platform::Linux, Some(file.path()));
	assert_that!(&config.values(), eq(defaults.values()));

	// not an object
	let file = dir.file("array.json");
	file.write("[1, 2, 3]");
	let config = Config::load(Platform::Linux, Some(file.path()));
	assert_that!(&config.values(), eq(defaults.values()));
}


#[test]
fn save_and_reload() {
	let _logging = logging::init_test();

	let dir = WorkDir::new();
	let mut config = Config::for_platform(Platform::Linux);
	config.set("analysis.timeout", 42);

	let file = dir.file("saved.json");
	config.save(file.path())
		.expect("save failed");

	let reloaded = Config::load(Platform::Linux, Some(file.path()));
	assert_that!(&reloaded.values(), eq(config.values()));
	assert_that!(&reloaded.analysis_timeout(), eq(Duration::from_secs(42)));
}


#[test]
fn platform_names() {
	assert_that!(&"windows".parse::<Platform>().ok(), eq(Some(Platform::Windows)));
	assert_that!(&"macOS".parse::<Platform>().ok(), eq(Some(Platform::Darwin)));
	assert_that!(&"Linux".parse::<Platform>().ok(), eq(Some(Platform::Linux)));
	assert_that!(&"amiga".parse::<Platform>().is_err(), eq(true));
	let darwin = Platform::Darwin.to_string();
	assert_that!(&darwin.as_str(), eq("darwin"));
	assert_that!(&Platform::Windows.is_unix(), eq(false));
}


#[test]
fn unusable_timeouts_fall_back() {
	let _logging = logging::init_test();

	let mut config = Config::for_platform(Platform::Linux);

	config.set("analysis.timeout", json!(1e30));
	config.set("setup.smoke_test_timeout", json!(-5));
	assert_that!(&config.analysis_timeout(), eq(Duration::from_secs(300)));
	assert_that!(&config.smoke_test_timeout(), eq(Duration::from_secs(30)));

	config.set("analysis.timeout", "soon");
	assert_that!(&config.analysis_timeout(), eq(Duration::from_secs(300)));

	config.set("analysis.timeout", 1.5);
	assert_that!(&config.analysis_timeout(), eq(Duration::from_millis(1500)));
}


#[test]
fn huge_timeout_in_override_file() {
	let _logging = logging::init_test();

	let dir = WorkDir::new();
	let file = dir.file("overrides.json");
	file.write(r#"{ "analysis": { "timeout": 1e300 } }"#);

	let config = Config::load(Platform::Linux, Some(file.path()));
	assert_that!(&config.analysis_timeout(), eq(Duration::from_secs(300)));
}
