//! JSON-file persistence for custom detections.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{CustomDetection, CustomPattern, DetectionError, Detector};

/// CRUD over the custom detection file, keeping the detector in sync.
///
/// Every mutation rewrites the whole file (pretty-printed JSON array) and
/// swaps the detector's active pattern set.
pub struct CustomDetectionStore {
    path: PathBuf,
    detector: Arc<Detector>,
    detections: Mutex<Vec<CustomDetection>>,
}

impl CustomDetectionStore {
    /// Load detections from `path`, creating the file as `[]` if it is
    /// missing, and activate them on `detector`.
    pub async fn open(
        path: impl Into<PathBuf>,
        detector: Arc<Detector>,
    ) -> Result<Self, DetectionError> {
        let path = path.into();
        let detections = load(&path).await?;
        let active = detector.set_custom_patterns(&detections);
        info!(
            path = %path.display(),
            stored = detections.len(),
            active,
            "Loaded custom detections"
        );
        Ok(Self {
            path,
            detector,
            detections: Mutex::new(detections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<CustomDetection> {
        self.detections.lock().await.clone()
    }

    /// Validate, store and activate a detection. An empty id gets a UUID.
    pub async fn add(
        &self,
        mut detection: CustomDetection,
    ) -> Result<CustomDetection, DetectionError> {
        CustomPattern::compile(&detection)?;
        if detection.id.trim().is_empty() {
            detection.id = Uuid::new_v4().to_string();
        }

        let mut detections = self.detections.lock().await;
        detections.push(detection.clone());
        self.detector.set_custom_patterns(&detections);
        save(&self.path, &detections).await?;
        debug!(id = %detection.id, "Custom detection added");
        Ok(detection)
    }

    /// Remove the detection with `id`.
    pub async fn delete(&self, id: &str) -> Result<(), DetectionError> {
        let mut detections = self.detections.lock().await;
        let index = detections
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| DetectionError::NotFound(id.to_string()))?;
        detections.remove(index);
        self.detector.set_custom_patterns(&detections);
        save(&self.path, &detections).await?;
        debug!(id, "Custom detection deleted");
        Ok(())
    }
}

async fn load(path: &Path) -> Result<Vec<CustomDetection>, DetectionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage(path, &e))?;
    }

    match tokio::fs::read_to_string(path).await {
        Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
        Ok(text) => serde_json::from_str(&text).map_err(|e| storage(path, &e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::write(path, "[]")
                .await
                .map_err(|e| storage(path, &e))?;
            Ok(Vec::new())
        }
        Err(e) => Err(storage(path, &e)),
    }
}

async fn save(path: &Path, detections: &[CustomDetection]) -> Result<(), DetectionError> {
    let json = serde_json::to_string_pretty(detections).map_err(|e| storage(path, &e))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| storage(path, &e))
}

fn storage(path: &Path, err: &dyn std::fmt::Display) -> DetectionError {
    DetectionError::Storage(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionType;
    use crate::events::EventKind;
    use tempfile::TempDir;

    fn keyword(id: &str, pattern: &str) -> CustomDetection {
        CustomDetection {
            id: id.to_string(),
            detection_type: DetectionType::Keyword,
            pattern: pattern.to_string(),
            event_type: EventKind::CustomDetection,
            message: format!("{pattern} seen"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_created_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("detections.json");
        let store = CustomDetectionStore::open(&path, Arc::new(Detector::new()))
            .await
            .unwrap();

        assert!(store.list().await.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_add_persists_and_activates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detections.json");
        let detector = Arc::new(Detector::new());
        let store = CustomDetectionStore::open(&path, Arc::clone(&detector))
            .await
            .unwrap();

        let added = store.add(keyword("", "boom")).await.unwrap();
        assert!(!added.id.is_empty());
        assert_eq!(detector.process_log_message("boom").len(), 1);

        let reopened = CustomDetectionStore::open(&path, Arc::new(Detector::new()))
            .await
            .unwrap();
        assert_eq!(reopened.list().await, vec![added]);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_regex() {
        let dir = TempDir::new().unwrap();
        let store = CustomDetectionStore::open(dir.path().join("d.json"), Arc::new(Detector::new()))
            .await
            .unwrap();

        let mut bad = keyword("x", "(");
        bad.detection_type = DetectionType::Regex;
        let err = store.add(bad).await.unwrap_err();
        assert!(matches!(err, DetectionError::InvalidPattern { .. }));
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_deactivates() {
        let dir = TempDir::new().unwrap();
        let detector = Arc::new(Detector::new());
        let store = CustomDetectionStore::open(dir.path().join("d.json"), Arc::clone(&detector))
            .await
            .unwrap();
        store.add(keyword("a", "boom")).await.unwrap();

        store.delete("a").await.unwrap();
        assert!(detector.process_log_message("boom").is_empty());
        assert!(matches!(
            store.delete("a").await.unwrap_err(),
            DetectionError::NotFound(id) if id == "a"
        ));
    }
}
