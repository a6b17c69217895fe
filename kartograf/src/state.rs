//! Observable state of a map forming operation.

use std::path::PathBuf;

use kartograf_types::geo::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::error::KartografError;
use crate::overlay::Layer;

/// Stages of map forming.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStage {
    /// Validating the request.
    Counting,
    /// Acquiring tiles.
    Downloading,
    /// Merging tiles.
    Compositing,
    /// Drawing overlays.
    Drawing,
    /// Writing the map image.
    Saving,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
}

impl FormStage {
    /// Human-readable description of the stage.
    pub fn message(&self) -> &'static str {
        match self {
            FormStage::Counting => "Counting tiles",
            FormStage::Downloading => "Downloading tiles",
            FormStage::Compositing => "Merging tiles",
            FormStage::Drawing => "Drawing overlays",
            FormStage::Saving => "Saving the map",
            FormStage::Done => "Map is ready",
            FormStage::Failed => "Map forming failed",
        }
    }
}

/// A formed map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormedMap {
    /// Path of the map image.
    pub path: PathBuf,
    /// Geographic box covered by the image. It is aligned to tile borders, so it is usually a bit
    /// larger than the requested box.
    pub bounding_box: BoundingBox,
    /// Overlays drawn on the map.
    pub layers: Vec<Layer>,
}

/// State record of one map forming operation.
///
/// The record can be stored as JSON to restore the state of the operation after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFormState {
    /// Current stage.
    pub stage: FormStage,
    /// Progress of the current stage in percent.
    pub progress: u8,
    /// Description of the current stage.
    pub progress_message: String,
    /// The formed map.
    pub result: Option<FormedMap>,
    /// Whether the operation is over.
    pub finished: bool,
    /// Error message of a failed operation.
    pub error: Option<String>,
}

impl MapFormState {
    /// State of an unfinished stage.
    pub fn in_stage(stage: FormStage, progress: u8) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            progress_message: stage.message().to_string(),
            result: None,
            finished: false,
            error: None,
        }
    }

    /// State of a successfully finished operation.
    pub fn done(result: FormedMap) -> Self {
        Self {
            result: Some(result),
            finished: true,
            ..Self::in_stage(FormStage::Done, 100)
        }
    }

    /// State of a failed operation.
    pub fn failed(error: &KartografError) -> Self {
        Self {
            finished: true,
            error: Some(error.to_string()),
            ..Self::in_stage(FormStage::Failed, 0)
        }
    }

    /// Serializes the state to JSON.
    pub fn to_json(&self) -> Result<String, KartografError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores the state from JSON.
    pub fn from_json(json: &str) -> Result<Self, KartografError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for MapFormState {
    fn default() -> Self {
        Self::in_stage(FormStage::Counting, 0)
    }
}

/// Receives every change of the state of a map forming operation.
pub trait StateObserver: Send + Sync {
    /// Called when the state changes.
    fn on_state(&self, state: &MapFormState);
}

impl<F: Fn(&MapFormState) + Send + Sync> StateObserver for F {
    fn on_state(&self, state: &MapFormState) {
        self(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_states() {
        let failed = MapFormState::failed(&KartografError::Cancelled);
        assert!(failed.finished);
        assert_eq!(failed.stage, FormStage::Failed);
        assert_eq!(failed.error.as_deref(), Some("map forming was cancelled"));

        let done = MapFormState::done(FormedMap {
            path: "/tmp/map.png".into(),
            bounding_box: BoundingBox::new(1.0, 0.0, 1.0, 0.0).unwrap(),
            layers: vec![],
        });
        assert!(done.finished);
        assert_eq!(done.progress, 100);
        assert!(done.error.is_none());
    }

    #[test]
    fn state_survives_json() {
        let state = MapFormState::done(FormedMap {
            path: "/tmp/map.png".into(),
            bounding_box: BoundingBox::new(51.5, 46.5, 38.5, 22.5).unwrap(),
            layers: vec![crate::overlay::Layer::new("empty", vec![])],
        });
        let restored = MapFormState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(MapFormState::in_stage(FormStage::Downloading, 150).progress, 100);
    }
}
