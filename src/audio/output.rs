//! Playback handle scoped to one displayed result.
//!
//! [`AudioOutput`] opens its device lazily on first use, reuses it for later
//! playbacks, and releases it on [`AudioOutput::close`] or drop. At most one
//! stream plays at a time.
//!
//! State machine:
//!
//! ```text
//! Idle ──begin_loading──▶ Loading ──play──▶ Playing ──stop / finished──▶ Idle
//!                            └──────fail──────▶ Idle
//! ```

use tracing::{debug, info, warn};

use super::{AudioBuffer, AudioError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
}

/// An audio output stream that plays one buffer at a time.
pub trait PlaybackDevice {
    /// Start playing `buffer`, replacing anything already playing.
    fn start(&mut self, buffer: AudioBuffer) -> Result<(), AudioError>;

    /// Stop the current stream, if any.
    fn stop(&mut self);

    /// `true` once the last started buffer has played out (or was stopped).
    fn is_finished(&self) -> bool;
}

/// Opens the underlying device on first playback.
pub type DeviceOpener = Box<dyn FnMut() -> Result<Box<dyn PlaybackDevice>, AudioError>>;

pub struct AudioOutput {
    opener: DeviceOpener,
    device: Option<Box<dyn PlaybackDevice>>,
    state: PlaybackState,
}

impl AudioOutput {
    pub fn new(opener: DeviceOpener) -> Self {
        Self {
            opener,
            device: None,
            state: PlaybackState::Idle,
        }
    }

    /// Output on the system default device.
    #[cfg(feature = "playback")]
    pub fn system_default() -> Self {
        Self::new(Box::new(|| {
            Ok(Box::new(rodio_device::RodioDevice::open()?) as Box<dyn PlaybackDevice>)
        }))
    }

    /// Headless builds have no device; playback reports an error.
    #[cfg(not(feature = "playback"))]
    pub fn system_default() -> Self {
        Self::new(Box::new(|| {
            Err(AudioError::Device(
                "built without the `playback` feature".to_string(),
            ))
        }))
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Idle → Loading. Returns `false` (no transition) from any other state.
    pub fn begin_loading(&mut self) -> bool {
        if self.state != PlaybackState::Idle {
            return false;
        }
        self.state = PlaybackState::Loading;
        true
    }

    /// Loading → Idle after a failed synthesis or decode.
    pub fn fail(&mut self) {
        if self.state == PlaybackState::Loading {
            self.state = PlaybackState::Idle;
        }
    }

    /// Play `buffer`, stopping any current stream first.
    pub fn play(&mut self, buffer: AudioBuffer) -> Result<(), AudioError> {
        if let Some(device) = self.device.as_mut() {
            device.stop();
        }

        if self.device.is_none() {
            match (self.opener)() {
                Ok(device) => {
                    debug!("audio output opened");
                    self.device = Some(device);
                }
                Err(e) => {
                    warn!(error = %e, "failed to open audio output");
                    self.state = PlaybackState::Idle;
                    return Err(e);
                }
            }
        }

        let frames = buffer.frame_count();
        let duration_ms = buffer.duration_ms();
        let Some(device) = self.device.as_mut() else {
            self.state = PlaybackState::Idle;
            return Err(AudioError::Device("audio output unavailable".to_string()));
        };

        match device.start(buffer) {
            Ok(()) => {
                info!(frames, duration_ms, "playback started");
                self.state = PlaybackState::Playing;
                Ok(())
            }
            Err(e) => {
                self.state = PlaybackState::Idle;
                Err(e)
            }
        }
    }

    /// Playing → Idle.
    pub fn stop(&mut self) {
        if let Some(device) = self.device.as_mut() {
            device.stop();
        }
        if self.state == PlaybackState::Playing {
            debug!("playback stopped");
            self.state = PlaybackState::Idle;
        }
    }

    /// Refresh the state; natural completion moves Playing → Idle.
    pub fn poll(&mut self) -> PlaybackState {
        if self.state == PlaybackState::Playing
            && self.device.as_ref().is_none_or(|d| d.is_finished())
        {
            debug!("playback finished");
            self.state = PlaybackState::Idle;
        }
        self.state
    }

    /// Stop playback and release the device.
    pub fn close(&mut self) {
        self.stop();
        if self.device.take().is_some() {
            debug!("audio output closed");
        }
        self.state = PlaybackState::Idle;
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(feature = "playback")]
mod rodio_device {
    use super::{AudioBuffer, AudioError, PlaybackDevice};

    /// Default output device via rodio. The stream must outlive its sinks.
    pub struct RodioDevice {
        stream: rodio::OutputStream,
        sink: Option<rodio::Sink>,
    }

    impl RodioDevice {
        pub fn open() -> Result<Self, AudioError> {
            let mut stream = rodio::OutputStreamBuilder::open_default_stream()
                .map_err(|e| AudioError::Device(e.to_string()))?;
            stream.log_on_drop(false);
            Ok(Self { stream, sink: None })
        }
    }

    impl PlaybackDevice for RodioDevice {
        fn start(&mut self, buffer: AudioBuffer) -> Result<(), AudioError> {
            self.stop();
            let sink = rodio::Sink::connect_new(self.stream.mixer());
            sink.append(rodio::buffer::SamplesBuffer::new(
                buffer.channels,
                buffer.sample_rate,
                buffer.samples,
            ));
            self.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn is_finished(&self) -> bool {
            self.sink.as_ref().is_none_or(|sink| sink.empty())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// What a [`RecordingDevice`] saw.
    #[derive(Debug, Default)]
    pub struct DeviceLog {
        pub opened: usize,
        pub started: Vec<usize>,
        pub stops: usize,
        pub finished: bool,
    }

    pub struct RecordingDevice {
        log: Rc<RefCell<DeviceLog>>,
    }

    impl PlaybackDevice for RecordingDevice {
        fn start(&mut self, buffer: AudioBuffer) -> Result<(), AudioError> {
            let mut log = self.log.borrow_mut();
            log.started.push(buffer.frame_count());
            log.finished = false;
            Ok(())
        }

        fn stop(&mut self) {
            self.log.borrow_mut().stops += 1;
        }

        fn is_finished(&self) -> bool {
            self.log.borrow().finished
        }
    }

    /// An output whose device records into the returned log.
    pub fn recording_output() -> (AudioOutput, Rc<RefCell<DeviceLog>>) {
        let log = Rc::new(RefCell::new(DeviceLog::default()));
        let shared = Rc::clone(&log);
        let output = AudioOutput::new(Box::new(move || {
            shared.borrow_mut().opened += 1;
            Ok(Box::new(RecordingDevice {
                log: Rc::clone(&shared),
            }) as Box<dyn PlaybackDevice>)
        }));
        (output, log)
    }

    /// An output whose device can never be opened.
    pub fn broken_output() -> AudioOutput {
        AudioOutput::new(Box::new(|| Err(AudioError::Device("no device".to_string()))))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{broken_output, recording_output};
    use super::*;
    use crate::audio::decode_pcm;

    fn buffer(frames: usize) -> AudioBuffer {
        decode_pcm(&vec![0u8; frames * 2]).unwrap()
    }

    #[test]
    fn device_opens_lazily_once() {
        let (mut output, log) = recording_output();
        assert!(!output.is_open());
        assert_eq!(log.borrow().opened, 0);

        output.play(buffer(10)).unwrap();
        output.stop();
        output.play(buffer(20)).unwrap();

        assert!(output.is_open());
        assert_eq!(log.borrow().opened, 1);
        assert_eq!(log.borrow().started, vec![10, 20]);
    }

    #[test]
    fn loading_then_playing_then_idle_on_stop() {
        let (mut output, _log) = recording_output();
        assert!(output.begin_loading());
        assert_eq!(output.state(), PlaybackState::Loading);
        output.play(buffer(4)).unwrap();
        assert_eq!(output.state(), PlaybackState::Playing);
        output.stop();
        assert_eq!(output.state(), PlaybackState::Idle);
    }

    #[test]
    fn failed_loading_returns_to_idle() {
        let (mut output, _log) = recording_output();
        output.begin_loading();
        output.fail();
        assert_eq!(output.state(), PlaybackState::Idle);
    }

    #[test]
    fn begin_loading_only_from_idle() {
        let (mut output, _log) = recording_output();
        output.play(buffer(4)).unwrap();
        assert!(!output.begin_loading());
        assert_eq!(output.state(), PlaybackState::Playing);
    }

    #[test]
    fn natural_completion_returns_to_idle() {
        let (mut output, log) = recording_output();
        output.play(buffer(4)).unwrap();
        assert_eq!(output.poll(), PlaybackState::Playing);
        log.borrow_mut().finished = true;
        assert_eq!(output.poll(), PlaybackState::Idle);
    }

    #[test]
    fn new_playback_stops_previous_stream() {
        let (mut output, log) = recording_output();
        output.play(buffer(4)).unwrap();
        let stops_before = log.borrow().stops;
        output.play(buffer(8)).unwrap();
        assert_eq!(log.borrow().stops, stops_before + 1);
    }

    #[test]
    fn open_failure_leaves_idle() {
        let mut output = broken_output();
        output.begin_loading();
        assert!(matches!(output.play(buffer(4)), Err(AudioError::Device(_))));
        assert_eq!(output.state(), PlaybackState::Idle);
        assert!(!output.is_open());
    }

    #[test]
    fn close_releases_device() {
        let (mut output, log) = recording_output();
        output.play(buffer(4)).unwrap();
        output.close();
        assert!(!output.is_open());
        assert_eq!(output.state(), PlaybackState::Idle);
        output.play(buffer(4)).unwrap();
        assert_eq!(log.borrow().opened, 2);
    }
}
