use serde::{Deserialize, Serialize};

pub const DEFAULT_VERTEX_BUFFER_LABEL: &str = "brushwork_scene_vertices";
pub const DEFAULT_INDEX_BUFFER_LABEL: &str = "brushwork_scene_indices";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Consult each base shape's own dirty flag before a build.
    pub track_shape_invalidation: bool,
    /// Recompute smooth normals on the assembled stream before upload.
    pub compute_normals: bool,
    pub vertex_buffer_label: String,
    pub index_buffer_label: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            track_shape_invalidation: false,
            compute_normals: false,
            vertex_buffer_label: DEFAULT_VERTEX_BUFFER_LABEL.to_string(),
            index_buffer_label: DEFAULT_INDEX_BUFFER_LABEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: BuildSettings =
            serde_json::from_str(r#"{ "track_shape_invalidation": true }"#).expect("parse");
        assert!(settings.track_shape_invalidation);
        assert!(!settings.compute_normals);
        assert_eq!(settings.vertex_buffer_label, DEFAULT_VERTEX_BUFFER_LABEL);
    }

    #[test]
    fn settings_survive_json() {
        let settings = BuildSettings {
            compute_normals: true,
            index_buffer_label: "indices".to_string(),
            ..BuildSettings::default()
        };
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: BuildSettings = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, settings);
    }
}
