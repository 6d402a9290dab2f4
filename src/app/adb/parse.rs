use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::app::models::{Device, DeviceState, DeviceSummary};

pub const PROP_ANDROID_VERSION: &str = "ro.build.version.release";
pub const PROP_MODEL: &str = "ro.product.model";

/// Parses `adb devices` / `adb devices -l`, keeping the tool's ordering.
pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            let mut model = None;
            let mut product = None;
            let mut transport_id = None;
            for token in tokens.iter().skip(2) {
                if let Some(value) = token.strip_prefix("model:") {
                    model = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("product:") {
                    product = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("transport_id:") {
                    transport_id = Some(value.to_string());
                }
            }
            Some(DeviceSummary {
                serial: tokens[0].to_string(),
                state: DeviceState::from_token(tokens[1]),
                model,
                product,
                transport_id,
            })
        })
        .collect()
}

pub fn parse_getprop_map(output: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('[') {
            continue;
        }
        let Some((key_part, value_part)) = trimmed.split_once("]: [") else {
            continue;
        };
        let key = key_part.trim_start_matches('[').trim();
        let value = value_part.trim_end_matches(']').trim();
        if !key.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

/// Keeps only digits and dots, e.g. `"14\r\n"` -> `"14"`.
pub fn normalize_android_version(raw: &str) -> Option<String> {
    static NON_VERSION: OnceLock<Regex> = OnceLock::new();
    let re = NON_VERSION.get_or_init(|| Regex::new(r"[^\d.]").expect("static regex"));
    let cleaned = re.replace_all(raw, "").to_string();
    Some(cleaned).filter(|value| !value.is_empty())
}

/// Model names from `devices -l` use `_` where getprop reports spaces.
fn model_from_summary(summary: &DeviceSummary) -> Option<String> {
    summary
        .model
        .as_ref()
        .map(|value| value.replace('_', " "))
        .filter(|value| !value.trim().is_empty())
}

/// `getprop_map` is `None` for devices whose properties were not queried
/// (offline, unauthorized); such devices carry no descriptive fields.
pub fn build_device(summary: &DeviceSummary, getprop_map: Option<&HashMap<String, String>>) -> Device {
    let Some(map) = getprop_map else {
        return Device {
            serial: summary.serial.clone(),
            state: summary.state.clone(),
            android_version: None,
            model: None,
        };
    };
    let android_version = map
        .get(PROP_ANDROID_VERSION)
        .and_then(|value| normalize_android_version(value));
    let model = map
        .get(PROP_MODEL)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| model_from_summary(summary));
    Device {
        serial: summary.serial.clone(),
        state: summary.state.clone(),
        android_version,
        model,
    }
}
