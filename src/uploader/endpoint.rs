use regex::Regex;

use crate::errors::{AppError, AppResult};

/// Markers left behind when a template renders a missing value into the form action
/// Matched against the lowercased action
const PLACEHOLDER_MARKERS: [&str; 5] = ["none", "null", "undefined", "{{", "{%"];

/// Study and scenario identifiers taken from a page location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioRef {
    pub study_id: u64,
    pub scenario_id: u64,
}

impl ScenarioRef {
    pub fn new(study_id: u64, scenario_id: u64) -> Self {
        Self {
            study_id,
            scenario_id,
        }
    }

    pub fn page_path(&self) -> String {
        format!("/study/{}/scenario/{}", self.study_id, self.scenario_id)
    }

    pub fn upload_path(&self) -> String {
        format!("{}/upload", self.page_path())
    }

    pub fn process_path(&self) -> String {
        format!("{}/process", self.page_path())
    }
}

/// Extract `/study/{id}/scenario/{id}` from a path or full URL
pub fn parse_scenario_path(location: &str) -> AppResult<Option<ScenarioRef>> {
    let pattern = Regex::new(r"/study/(\d+)/scenario/(\d+)")?;

    let Some(caps) = pattern.captures(location) else {
        return Ok(None);
    };

    let study_id = caps[1].parse::<u64>();
    let scenario_id = caps[2].parse::<u64>();

    match (study_id, scenario_id) {
        (Ok(study_id), Ok(scenario_id)) => Ok(Some(ScenarioRef::new(study_id, scenario_id))),
        _ => {
            log::warn!("Scenario identifiers out of range in {}", location);
            Ok(None)
        }
    }
}

/// Whether a pre-configured action URL can be posted to as-is
pub fn is_usable_action(action: &str) -> bool {
    let trimmed = action.trim();

    if trimmed.is_empty() {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m)) {
        return false;
    }

    trimmed.starts_with('/') || trimmed.starts_with("http://") || trimmed.starts_with("https://")
}

/// Decide where the next file is posted.
///
/// The form's action wins when it is usable. Otherwise the upload path is rebuilt
/// from the scenario page location.
pub fn resolve_endpoint(action: Option<&str>, page_location: &str) -> AppResult<String> {
    if let Some(action) = action {
        if is_usable_action(action) {
            return Ok(action.trim().to_string());
        }
        log::warn!(
            "Ignoring unusable form action '{}', deriving from location",
            action
        );
    }

    match parse_scenario_path(page_location)? {
        Some(scenario) => {
            let endpoint = scenario.upload_path();
            log::debug!("Derived upload endpoint {} from {}", endpoint, page_location);
            Ok(endpoint)
        }
        None => Err(AppError::endpoint_resolution(&format!(
            "no usable form action and '{}' is not a /study/{{id}}/scenario/{{id}} page",
            page_location
        ))),
    }
}
