//! Per-screen gate in front of the camera.
//!
//! The gate decides, for every decoded value, whether it should start a
//! resolution. It guarantees at most one resolution in flight per scan
//! session (the camera is paused while one runs) and that a code which
//! failed is never processed again.
//!
//! Camera state and the invalid-code set are owned by the gate alone.
//! Create one gate when the scan screen mounts and drop it when it
//! unmounts.

use std::collections::HashSet;

use walletgate_types::config::SessionConfig;
use walletgate_types::ScanError;

// ---------------------------------------------------------------------------
// CaptureDevice
// ---------------------------------------------------------------------------

/// The physical side of scanning: camera and haptics.
pub trait CaptureDevice: Send {
    /// Resumes (`true`) or pauses (`false`) frame capture.
    fn set_active(&mut self, active: bool);

    /// Gives haptic feedback for an accepted scan.
    fn vibrate(&mut self);
}

// ---------------------------------------------------------------------------
// CameraState / ScanAction
// ---------------------------------------------------------------------------

/// Whether the camera is delivering frames.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CameraState {
    /// Frames are being decoded.
    Active,
    /// Capture is paused.
    Paused,
}

/// Decision returned by [`ScanGate::submit`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanAction {
    /// Drop the value.
    Ignore,
    /// Start resolving the value.
    Process,
    /// Drop the value and turn the camera back on.
    ReactivateAndIgnore,
}

// ---------------------------------------------------------------------------
// ScanGate
// ---------------------------------------------------------------------------

/// Deduplicates scanned codes and drives the capture device.
pub struct ScanGate<D> {
    device: D,
    camera: CameraState,
    invalid_codes: HashSet<String>,
    last_failure: Option<ScanError>,
    enable_camera_on_error: bool,
    min_code_length: usize,
}

impl<D: CaptureDevice> ScanGate<D> {
    /// Creates a gate with the camera active.
    pub fn new(device: D, config: &SessionConfig) -> Self {
        Self {
            device,
            camera: CameraState::Active,
            invalid_codes: HashSet::new(),
            last_failure: None,
            enable_camera_on_error: config.enable_camera_on_error,
            min_code_length: config.min_code_length,
        }
    }

    /// Decides what to do with one decoded value.
    pub fn submit(&mut self, code: &str) -> ScanAction {
        if code.chars().count() < self.min_code_length || self.invalid_codes.contains(code) {
            return ScanAction::Ignore;
        }

        let failed_last = self
            .last_failure
            .as_ref()
            .is_some_and(|f| f.source_data == code);
        if failed_last {
            self.invalid_codes.insert(code.to_string());
            tracing::debug!(code, "code failed previously, blocked for this session");
            if self.enable_camera_on_error {
                self.set_camera(CameraState::Active);
                return ScanAction::ReactivateAndIgnore;
            }
            return ScanAction::Ignore;
        }

        if self.camera == CameraState::Active {
            self.device.vibrate();
            self.set_camera(CameraState::Paused);
            return ScanAction::Process;
        }

        // A resolution is already in flight.
        ScanAction::Ignore
    }

    /// Records a failed resolution.
    ///
    /// A failure this one supersedes is moved into the invalid set, so
    /// every code that ever failed stays blocked.
    pub fn record_failure(&mut self, err: ScanError) {
        if let Some(previous) = self.last_failure.take() {
            self.invalid_codes.insert(previous.source_data);
        }
        if self.enable_camera_on_error {
            self.set_camera(CameraState::Active);
        }
        self.last_failure = Some(err);
    }

    /// Current camera state.
    pub fn camera_state(&self) -> CameraState {
        self.camera
    }

    /// Whether `code` is permanently blocked.
    pub fn is_invalid(&self, code: &str) -> bool {
        self.invalid_codes.contains(code)
    }

    /// The most recent failure, if any.
    pub fn last_failure(&self) -> Option<&ScanError> {
        self.last_failure.as_ref()
    }

    fn set_camera(&mut self, state: CameraState) {
        if self.camera == state {
            return;
        }
        self.camera = state;
        self.device.set_active(state == CameraState::Active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeDevice {
        active_calls: Vec<bool>,
        vibrations: usize,
    }

    impl CaptureDevice for FakeDevice {
        fn set_active(&mut self, active: bool) {
            self.active_calls.push(active);
        }

        fn vibrate(&mut self) {
            self.vibrations += 1;
        }
    }

    fn gate() -> ScanGate<FakeDevice> {
        ScanGate::new(FakeDevice::default(), &SessionConfig::default())
    }

    fn failure(code: &str) -> ScanError {
        ScanError {
            message: "bad".into(),
            source_data: code.into(),
            code: Some(1031),
        }
    }

    #[test]
    fn empty_code_is_ignored() {
        let mut g = gate();
        assert_eq!(g.submit(""), ScanAction::Ignore);
        assert_eq!(g.camera_state(), CameraState::Active);
        assert_eq!(g.device.vibrations, 0);
    }

    #[test]
    fn double_submit_while_pending_processes_once() {
        let mut g = gate();
        assert_eq!(g.submit("abc"), ScanAction::Process);
        assert_eq!(g.submit("abc"), ScanAction::Ignore);
        assert_eq!(g.device.vibrations, 1);
        assert_eq!(g.device.active_calls, vec![false]);
    }

    #[test]
    fn other_code_ignored_while_pending() {
        let mut g = gate();
        assert_eq!(g.submit("a"), ScanAction::Process);
        assert_eq!(g.submit("b"), ScanAction::Ignore);
    }

    #[test]
    fn failed_code_reactivates_then_stays_blocked() {
        let mut g = gate();
        assert_eq!(g.submit("bad"), ScanAction::Process);
        g.record_failure(failure("bad"));
        assert_eq!(g.camera_state(), CameraState::Active);

        assert_eq!(g.submit("bad"), ScanAction::ReactivateAndIgnore);
        assert!(g.is_invalid("bad"));
        assert_eq!(g.submit("bad"), ScanAction::Ignore);
        assert_eq!(g.device.vibrations, 1);
    }

    #[test]
    fn failed_code_without_reactivation_is_ignored() {
        let config = SessionConfig {
            enable_camera_on_error: false,
            ..SessionConfig::default()
        };
        let mut g = ScanGate::new(FakeDevice::default(), &config);
        assert_eq!(g.submit("bad"), ScanAction::Process);
        g.record_failure(failure("bad"));
        assert_eq!(g.camera_state(), CameraState::Paused);
        assert_eq!(g.submit("bad"), ScanAction::Ignore);
        assert!(g.is_invalid("bad"));
    }

    #[test]
    fn superseded_failure_stays_blocked() {
        let mut g = gate();
        assert_eq!(g.submit("first"), ScanAction::Process);
        g.record_failure(failure("first"));
        assert_eq!(g.submit("second"), ScanAction::Process);
        g.record_failure(failure("second"));

        assert_eq!(g.submit("first"), ScanAction::Ignore);
        assert!(g.is_invalid("first"));
        assert_eq!(g.last_failure().map(|f| f.source_data.as_str()), Some("second"));
    }

    #[test]
    fn min_code_length_applies() {
        let config = SessionConfig {
            min_code_length: 4,
            ..SessionConfig::default()
        };
        let mut g = ScanGate::new(FakeDevice::default(), &config);
        assert_eq!(g.submit("abc"), ScanAction::Ignore);
        assert_eq!(g.submit("abcd"), ScanAction::Process);
    }
}
