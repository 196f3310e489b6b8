//! Photo capture use case

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::capture::CaptureArtifact;

use super::location::LocationProvider;
use super::ports::{Camera, Capability, Geolocator, PermissionGate, PermissionStatus};

/// Receives each finished artifact
pub type ArtifactHandoff = Arc<dyn Fn(CaptureArtifact) + Send + Sync>;

/// Errors from the capture use case
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),
}

/// Camera permission state plus the camera device.
///
/// A capture takes the picture first and only then asks for a location
/// fix, so the coordinates describe where the photo was taken.
pub struct CaptureSession<C, G, P>
where
    C: Camera,
    G: Geolocator,
    P: PermissionGate,
{
    camera: C,
    permissions: P,
    locator: LocationProvider<G, P>,
    granted: AtomicBool,
    on_artifact: Option<ArtifactHandoff>,
}

impl<C, G, P> CaptureSession<C, G, P>
where
    C: Camera,
    G: Geolocator,
    P: PermissionGate,
{
    pub fn new(camera: C, permissions: P, locator: LocationProvider<G, P>) -> Self {
        Self {
            camera,
            permissions,
            locator,
            granted: AtomicBool::new(false),
            on_artifact: None,
        }
    }

    /// Hand every successful capture to `handoff`
    pub fn with_handoff(mut self, handoff: ArtifactHandoff) -> Self {
        self.on_artifact = Some(handoff);
        self
    }

    /// Ask for camera access. A grant is remembered; a denial is not.
    pub async fn request_permission(&self) -> PermissionStatus {
        if self.granted.load(Ordering::SeqCst) {
            return PermissionStatus::Granted;
        }
        let status = self.permissions.request(Capability::Camera).await;
        if status.is_granted() {
            self.granted.store(true, Ordering::SeqCst);
        }
        debug!(?status, "camera permission");
        status
    }

    pub fn is_permitted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    /// Take a picture and pair it with the current location.
    ///
    /// Requires a prior grant from `request_permission`. A missing location
    /// never fails the capture.
    pub async fn capture(&self) -> Result<CaptureArtifact, CaptureError> {
        if !self.is_permitted() {
            return Err(CaptureError::PermissionDenied);
        }

        let image = match self.camera.take_picture().await {
            Ok(Some(image)) => image,
            Ok(None) => {
                return Err(CaptureError::CaptureFailed(
                    "camera returned no image".to_string(),
                ))
            }
            Err(e) => return Err(CaptureError::CaptureFailed(e.to_string())),
        };
        let image = image
            .image_ref()
            .ok_or_else(|| {
                CaptureError::CaptureFailed("camera returned an empty image".to_string())
            })?
            .to_string();

        let location = self.locator.current_location().await;
        if location.is_none() {
            warn!("photo captured without location");
        }

        let artifact = CaptureArtifact::new(image, location);
        info!(
            image_len = artifact.image().len(),
            located = artifact.location().is_some(),
            "photo captured"
        );

        if let Some(handoff) = &self.on_artifact {
            handoff(artifact.clone());
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CameraError, GeolocationError};
    use crate::domain::capture::{CapturedImage, Location};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<&'static str>>>;
    type TestSession = CaptureSession<MockCamera, MockGeolocator, Arc<MockGate>>;

    struct MockGate {
        answers: Mutex<Vec<PermissionStatus>>,
        requests: AtomicUsize,
    }

    impl MockGate {
        /// Answers are handed out in order; the last one repeats.
        fn answering(answers: Vec<PermissionStatus>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers),
                requests: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionGate for MockGate {
        async fn request(&self, _capability: Capability) -> PermissionStatus {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.remove(0)
            } else {
                answers[0]
            }
        }
    }

    struct MockCamera {
        result: Result<Option<CapturedImage>, CameraError>,
        calls: CallLog,
    }

    #[async_trait]
    impl Camera for MockCamera {
        async fn take_picture(&self) -> Result<Option<CapturedImage>, CameraError> {
            self.calls.lock().unwrap().push("camera");
            self.result.clone()
        }
    }

    struct MockGeolocator {
        result: Result<Location, GeolocationError>,
        calls: CallLog,
    }

    #[async_trait]
    impl Geolocator for MockGeolocator {
        async fn current_position(&self) -> Result<Location, GeolocationError> {
            self.calls.lock().unwrap().push("location");
            self.result.clone()
        }
    }

    fn session(
        camera: Result<Option<CapturedImage>, CameraError>,
        location: Result<Location, GeolocationError>,
        gate: Arc<MockGate>,
    ) -> (TestSession, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let camera = MockCamera {
            result: camera,
            calls: Arc::clone(&calls),
        };
        let geolocator = MockGeolocator {
            result: location,
            calls: Arc::clone(&calls),
        };
        let locator = LocationProvider::new(geolocator, Arc::clone(&gate));
        (CaptureSession::new(camera, gate, locator), calls)
    }

    fn jpeg() -> Option<CapturedImage> {
        Some(CapturedImage::from_bytes(&[0xFF, 0xD8, 0xFF]))
    }

    #[tokio::test]
    async fn capture_without_grant_is_denied() {
        let (session, calls) = session(
            Ok(jpeg()),
            Ok(Location::new(0.0, 0.0).unwrap()),
            MockGate::answering(vec![PermissionStatus::Granted]),
        );
        assert!(matches!(
            session.capture().await,
            Err(CaptureError::PermissionDenied)
        ));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn grant_is_cached() {
        let gate = MockGate::answering(vec![PermissionStatus::Granted]);
        let (session, _) = session(
            Ok(jpeg()),
            Ok(Location::new(0.0, 0.0).unwrap()),
            Arc::clone(&gate),
        );
        assert_eq!(session.request_permission().await, PermissionStatus::Granted);
        assert_eq!(session.request_permission().await, PermissionStatus::Granted);
        assert_eq!(gate.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denial_is_asked_again() {
        let gate = MockGate::answering(vec![PermissionStatus::Denied, PermissionStatus::Granted]);
        let (session, _) = session(
            Ok(jpeg()),
            Ok(Location::new(0.0, 0.0).unwrap()),
            Arc::clone(&gate),
        );
        assert_eq!(session.request_permission().await, PermissionStatus::Denied);
        assert!(!session.is_permitted());
        assert_eq!(session.request_permission().await, PermissionStatus::Granted);
        assert!(session.is_permitted());
    }

    #[tokio::test]
    async fn location_is_queried_after_picture() {
        let fix = Location::new(35.6586, 139.7454).unwrap();
        let (session, calls) = session(
            Ok(jpeg()),
            Ok(fix),
            MockGate::answering(vec![PermissionStatus::Granted]),
        );
        session.request_permission().await;

        let artifact = session.capture().await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["camera", "location"]);
        assert_eq!(artifact.image(), "/9j/");
        assert_eq!(artifact.location(), Some(&fix));
    }

    #[tokio::test]
    async fn missing_location_does_not_fail_capture() {
        let (session, _) = session(
            Ok(Some(CapturedImage::from_uri("file:///tmp/shot.jpg"))),
            Err(GeolocationError::Unavailable),
            MockGate::answering(vec![PermissionStatus::Granted]),
        );
        session.request_permission().await;

        let artifact = session.capture().await.unwrap();
        assert_eq!(artifact.image(), "file:///tmp/shot.jpg");
        assert!(artifact.location().is_none());
    }

    #[tokio::test]
    async fn location_denied_after_camera_granted() {
        let gate = MockGate::answering(vec![PermissionStatus::Granted, PermissionStatus::Denied]);
        let (session, calls) = session(
            Ok(jpeg()),
            Ok(Location::new(1.0, 1.0).unwrap()),
            gate,
        );
        session.request_permission().await;

        let artifact = session.capture().await.unwrap();
        assert!(artifact.location().is_none());
        assert_eq!(*calls.lock().unwrap(), vec!["camera"]);
    }

    #[tokio::test]
    async fn camera_failure_emits_nothing() {
        let handed: Arc<Mutex<Vec<CaptureArtifact>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&handed);
        let (session, calls) = session(
            Err(CameraError::CaptureFailed("shutter jammed".into())),
            Ok(Location::new(0.0, 0.0).unwrap()),
            MockGate::answering(vec![PermissionStatus::Granted]),
        );
        let session = session.with_handoff(Arc::new(move |a| sink.lock().unwrap().push(a)));
        session.request_permission().await;

        let err = session.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::CaptureFailed(ref m) if m.contains("shutter jammed")));
        assert!(handed.lock().unwrap().is_empty());
        assert_eq!(*calls.lock().unwrap(), vec!["camera"]);
    }

    #[tokio::test]
    async fn empty_picture_is_capture_failure() {
        let (session, _) = session(
            Ok(None),
            Ok(Location::new(0.0, 0.0).unwrap()),
            MockGate::answering(vec![PermissionStatus::Granted]),
        );
        session.request_permission().await;
        assert!(matches!(
            session.capture().await,
            Err(CaptureError::CaptureFailed(_))
        ));

        let (session, _) = session_with_blank_image();
        session.request_permission().await;
        assert!(matches!(
            session.capture().await,
            Err(CaptureError::CaptureFailed(_))
        ));
    }

    fn session_with_blank_image() -> (TestSession, CallLog) {
        session(
            Ok(Some(CapturedImage::default())),
            Ok(Location::new(0.0, 0.0).unwrap()),
            MockGate::answering(vec![PermissionStatus::Granted]),
        )
    }

    #[tokio::test]
    async fn handoff_runs_once_per_capture() {
        let handed: Arc<Mutex<Vec<CaptureArtifact>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&handed);
        let (session, _) = session(
            Ok(jpeg()),
            Ok(Location::new(0.0, 0.0).unwrap()),
            MockGate::answering(vec![PermissionStatus::Granted]),
        );
        let session = session.with_handoff(Arc::new(move |a| sink.lock().unwrap().push(a)));
        session.request_permission().await;

        let artifact = session.capture().await.unwrap();

        let handed = handed.lock().unwrap();
        assert_eq!(handed.len(), 1);
        assert_eq!(handed[0], artifact);
    }
}
