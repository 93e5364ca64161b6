// THEORY:
// Recordings arrive as two kinds of JSON files. An events file is a flat array of
// named positions; a session usually writes one file per event name, but mixed
// files are accepted and can be filtered. The settings file describes the
// render target of the recording session: texture size, whether the session was
// 2D, and the orthographic camera that looked at the scene.

use anyhow::{Context, Result};
use density_heatmap::WorldPoint;
use serde::Deserialize;
use std::path::Path;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_name: String,
    pub x_pos: f64,
    pub y_pos: f64,
    pub z_pos: f64,
}

impl EventRecord {
    pub fn position(&self) -> WorldPoint {
        [self.x_pos, self.y_pos, self.z_pos]
    }
}

/// Session settings. Unknown fields (camera rotation and the like) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsData {
    #[serde(rename = "is2DMode")]
    pub is_2d_mode: bool,
    pub texture_width: u32,
    pub texture_height: u32,
    #[serde(default)]
    pub cam_pos_x: Option<f64>,
    #[serde(default)]
    pub cam_pos_y: Option<f64>,
    #[serde(default)]
    pub cam_pos_z: Option<f64>,
    #[serde(default)]
    pub cam_orth_size: Option<f64>,
}

pub fn parse_events(json: &str) -> Result<Vec<EventRecord>> {
    serde_json::from_str(json)
        .context("events must be a JSON array of {eventName, xPos, yPos, zPos}")
}

pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events file {}", path.display()))?;
    parse_events(&json).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn load_settings(path: &Path) -> Result<SettingsData> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse settings {}", path.display()))
}

/// World positions of the events, optionally restricted to one event name.
pub fn positions(events: &[EventRecord], event_name: Option<&str>) -> Vec<WorldPoint> {
    events
        .iter()
        .filter(|event| event_name.is_none_or(|name| event.event_name == name))
        .map(EventRecord::position)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"[
        { "eventName": "Death", "xPos": 1.5, "yPos": 0.0, "zPos": -3.25 },
        { "eventName": "Jump",  "xPos": 2.0, "yPos": 1.0, "zPos": 4.0 },
        { "eventName": "Death", "xPos": 7.0, "yPos": 0.5, "zPos": 8.0 }
    ]"#;

    #[test]
    fn parses_recorded_events() {
        let events = parse_events(EVENTS).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_name, "Death");
        assert_eq!(events[0].position(), [1.5, 0.0, -3.25]);
    }

    #[test]
    fn filters_by_event_name() {
        let events = parse_events(EVENTS).unwrap();
        assert_eq!(positions(&events, None).len(), 3);
        assert_eq!(
            positions(&events, Some("Death")),
            vec![[1.5, 0.0, -3.25], [7.0, 0.5, 8.0]]
        );
        assert!(positions(&events, Some("Spawn")).is_empty());
    }

    #[test]
    fn rejects_malformed_events() {
        assert!(parse_events(r#"{ "eventName": "Death" }"#).is_err());
        assert!(parse_events(r#"[{ "eventName": "Death", "xPos": 1.0 }]"#).is_err());
    }

    #[test]
    fn settings_ignore_camera_rotation() {
        let json = r#"{
            "is2DMode": false,
            "textureWidth": 1024,
            "textureHeight": 768,
            "camPosX": 10.0, "camPosY": 50.0, "camPosZ": -4.0,
            "camRotX": 0.7071, "camRotY": 0.0, "camRotZ": 0.0, "camRotW": 0.7071,
            "camOrthSize": 32.0
        }"#;
        let settings: SettingsData = serde_json::from_str(json).unwrap();
        assert!(!settings.is_2d_mode);
        assert_eq!((settings.texture_width, settings.texture_height), (1024, 768));
        assert_eq!(settings.cam_orth_size, Some(32.0));
        assert_eq!(settings.cam_pos_z, Some(-4.0));
    }

    #[test]
    fn settings_without_camera_are_accepted() {
        let json = r#"{ "is2DMode": true, "textureWidth": 64, "textureHeight": 32 }"#;
        let settings: SettingsData = serde_json::from_str(json).unwrap();
        assert!(settings.is_2d_mode);
        assert_eq!(settings.cam_orth_size, None);
    }

    #[test]
    fn missing_file_names_the_path() {
        let path = std::env::temp_dir().join("heatmap_renderer_missing_events.json");
        let error = load_events(&path).unwrap_err();
        assert!(format!("{error:#}").contains("heatmap_renderer_missing_events.json"));
    }
}
