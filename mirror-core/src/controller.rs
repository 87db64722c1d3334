//! The control loop iteration
//!
//! [`Controller`] owns the decoder, the output state and both output
//! drivers. Each call to [`Controller::poll`] performs one iteration in a
//! fixed order:
//!
//! 1. Backlog check; an overrun flushes input and resets framing
//! 2. Drain input through the decoder, bounded by byte and frame budgets
//! 3. One filter tick and drive write, when the tick period has elapsed
//! 4. Staleness check, applying the failsafe for any class that fired
//!
//! All output state is touched only from here, so a frame is always
//! applied whole.

use mirror_hal::{SerialRx, UartTx};
use mirror_protocol::{DecoderState, FrameDecoder, FrameKind};

use crate::actuator::ActuatorArray;
use crate::config::{ConfigError, ControllerConfig, DriveRange, MatrixConfig, MAX_PAYLOAD};
use crate::diagnostics::{Diagnostics, Fault};
use crate::dispatch::{DispatchError, Dispatched, OutputState};
use crate::fmt::{debug, error, info, warn};
use crate::safety::{LivenessMonitor, OutputClass, StaleOutputs};
use crate::topology::{PixelBuffer, TopologyMap};
use crate::traits::{ActuatorDriver, PixelDriver};
use crate::transport::{GuardVerdict, TransportGuard};

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IterationReport {
    /// Bytes dropped by an overrun flush, if one happened
    pub flushed: Option<usize>,
    /// Bytes fed to the decoder
    pub bytes_consumed: usize,
    /// Frames decoded (applied, answered or rejected)
    pub frames: u8,
    /// Frames that changed an output
    pub frames_applied: u8,
    /// Framing errors seen
    pub framing_errors: u16,
    /// Probe replies sent
    pub replies: u8,
    /// Whether the filter ticked
    pub ticked: bool,
    /// Failsafes that fired
    pub failsafe: StaleOutputs,
}

/// One controller rig: decoder, outputs and drivers
///
/// `CAP` is the decoder payload capacity; the default fits the largest rig
/// the configuration limits allow.
pub struct Controller<P, A, const CAP: usize = MAX_PAYLOAD> {
    config: ControllerConfig,
    decoder: FrameDecoder<CAP>,
    guard: TransportGuard,
    outputs: OutputState,
    diagnostics: Diagnostics,
    pixel_driver: P,
    actuator_driver: A,
    last_tick_ms: Option<u32>,
}

impl<P, A, const CAP: usize> Controller<P, A, CAP>
where
    P: PixelDriver,
    A: ActuatorDriver,
{
    /// Validate `config` and build the controller
    ///
    /// Nothing is written to the drivers until [`start`](Self::start).
    pub fn new(config: ControllerConfig, pixel_driver: P, actuator_driver: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.frame_layout();
        let decoder = FrameDecoder::new(layout).map_err(|_| ConfigError::PayloadTooLarge)?;
        let guard = TransportGuard::new(layout.max_frame_len(), &config.transport);
        let outputs = OutputState::new(&config)?;

        Ok(Self {
            config,
            decoder,
            guard,
            outputs,
            diagnostics: Diagnostics::default(),
            pixel_driver,
            actuator_driver,
            last_tick_ms: None,
        })
    }

    /// Put both outputs in their safe state
    ///
    /// Commits a blank pixel buffer and drives every actuator to neutral.
    pub fn start(&mut self) {
        info!(
            "controller up: {}x{} pixels, {} channels, backlog limit {}",
            self.config.matrix.width,
            self.config.matrix.height,
            self.outputs.actuators.len(),
            self.guard.limit()
        );
        if self.config.capabilities.has_pixels() {
            self.commit_pixels();
        }
        if self.config.capabilities.actuators {
            self.write_actuators();
        }
    }

    /// Run one loop iteration at time `now_ms`
    pub fn poll<R, T>(&mut self, rx: &mut R, tx: &mut T, now_ms: u32) -> IterationReport
    where
        R: SerialRx + ?Sized,
        T: UartTx + ?Sized,
    {
        let mut report = IterationReport::default();

        if let GuardVerdict::Flushed { dropped } = self.guard.check(rx, &mut self.decoder) {
            warn!("receive backlog over {} bytes, flushed {}", self.guard.limit(), dropped);
            self.diagnostics.record(Fault::Overrun, 1);
            self.diagnostics.flushed_bytes = self.diagnostics.flushed_bytes.saturating_add(dropped as u32);
            report.flushed = Some(dropped);
        }

        self.drain(rx, tx, now_ms, &mut report);

        if self.config.capabilities.actuators && self.tick_due(now_ms) {
            self.outputs.actuators.tick();
            self.write_actuators();
            report.ticked = true;
        }

        report.failsafe = self.check_liveness(now_ms);
        report
    }

    fn drain<R, T>(&mut self, rx: &mut R, tx: &mut T, now_ms: u32, report: &mut IterationReport)
    where
        R: SerialRx + ?Sized,
        T: UartTx + ?Sized,
    {
        let byte_budget = self.config.transport.max_bytes_per_pass as usize;
        let frame_budget = self.config.transport.max_frames_per_pass;

        while report.bytes_consumed < byte_budget && report.frames < frame_budget {
            let Some(byte) = rx.read_byte() else {
                break;
            };
            report.bytes_consumed += 1;

            let outcome = match self.decoder.feed(byte) {
                Ok(None) => continue,
                Ok(Some(frame)) => (frame.kind, self.outputs.dispatch(frame, now_ms)),
                Err(e) => {
                    warn!("framing error: {:?}", e);
                    self.diagnostics.record(Fault::Framing, 1);
                    report.framing_errors = report.framing_errors.saturating_add(1);
                    continue;
                }
            };
            report.frames += 1;
            self.handle(outcome, tx, report);
        }
    }

    fn handle<T>(
        &mut self,
        (kind, outcome): (FrameKind, Result<Dispatched, DispatchError>),
        tx: &mut T,
        report: &mut IterationReport,
    ) where
        T: UartTx + ?Sized,
    {
        match outcome {
            Ok(Dispatched::Pixels) => {
                self.diagnostics.frames_ok = self.diagnostics.frames_ok.saturating_add(1);
                report.frames_applied += 1;
                self.commit_pixels();
            }
            Ok(Dispatched::Actuators(applied)) => {
                self.diagnostics.frames_ok = self.diagnostics.frames_ok.saturating_add(1);
                report.frames_applied += 1;
                if applied.clamped > 0 {
                    debug!("{} actuator values clamped", applied.clamped);
                    self.diagnostics.record(Fault::Range, applied.clamped as u32);
                }
            }
            Ok(Dispatched::Reply(reply)) => {
                if reply.write_to(tx).is_err() {
                    error!("reply to {:?} probe failed", kind);
                    self.diagnostics.record(Fault::Driver, 1);
                } else {
                    report.replies += 1;
                }
            }
            Err(e) => {
                warn!("frame not applied: {:?}", e);
                self.diagnostics.rejected_frames = self.diagnostics.rejected_frames.saturating_add(1);
            }
        }
    }

    fn tick_due(&mut self, now_ms: u32) -> bool {
        let period = self.config.timing.tick_period_ms;
        match self.last_tick_ms {
            Some(last) if now_ms.wrapping_sub(last) < period => false,
            _ => {
                self.last_tick_ms = Some(now_ms);
                true
            }
        }
    }

    fn check_liveness(&mut self, now_ms: u32) -> StaleOutputs {
        let stale = self.outputs.liveness.check(now_ms);
        if stale.pixels {
            warn!("pixel data stale, blanking");
            self.diagnostics.record(Fault::Staleness(OutputClass::Pixels), 1);
            self.outputs.pixels.clear();
            self.commit_pixels();
        }
        if stale.actuators {
            warn!("actuator data stale, returning to neutral");
            self.diagnostics.record(Fault::Staleness(OutputClass::Actuators), 1);
            self.outputs.actuators.go_neutral();
        }
        stale
    }

    fn commit_pixels(&mut self) {
        if self.outputs.pixels.commit(&mut self.pixel_driver).is_err() {
            error!("pixel commit failed");
            self.diagnostics.record(Fault::Driver, 1);
        }
    }

    fn write_actuators(&mut self) {
        let result = self.outputs.actuators.write_drive(&mut self.actuator_driver);
        if result.failures > 0 {
            error!("{} actuator writes failed", result.failures);
            self.diagnostics.record(Fault::Driver, result.failures as u32);
        }
    }

    /// Change the smoothing coefficient
    pub fn set_alpha(&mut self, alpha: f32) -> Result<(), ConfigError> {
        self.outputs.actuators.set_alpha(alpha)?;
        self.config.actuators.alpha = alpha;
        Ok(())
    }

    /// Change the minimum time between filter ticks
    pub fn set_tick_period_ms(&mut self, period_ms: u32) {
        self.config.timing.tick_period_ms = period_ms;
    }

    /// Change the drive range of one actuator bank
    pub fn set_drive_range(&mut self, bank: u8, min: u16, max: u16) -> Result<(), ConfigError> {
        let range = DriveRange { min, max };
        self.outputs.actuators.set_drive_range(bank, range)?;
        if let Some(slot) = self.config.actuators.banks.get_mut(bank as usize) {
            *slot = range;
        }
        Ok(())
    }

    /// Change mirroring, panel order, bank split or on-level
    ///
    /// Dimensions must stay the same. The pixel buffer is blanked and
    /// committed under the new wiring.
    pub fn set_matrix_orientation(&mut self, matrix: MatrixConfig) -> Result<(), ConfigError> {
        let map = TopologyMap::new(&matrix)?;
        self.outputs.pixels.set_map(map)?;
        self.config.matrix = matrix;
        if self.config.capabilities.has_pixels() {
            self.commit_pixels();
        }
        Ok(())
    }

    /// Running configuration, including runtime changes
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Fault counters
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Pixel buffer
    pub fn pixels(&self) -> &PixelBuffer {
        &self.outputs.pixels
    }

    /// Actuator array
    pub fn actuators(&self) -> &ActuatorArray {
        &self.outputs.actuators
    }

    /// Liveness state
    pub fn liveness(&self) -> &LivenessMonitor {
        &self.outputs.liveness
    }

    /// Decoder state
    pub fn decoder_state(&self) -> DecoderState {
        self.decoder.state()
    }

    /// Backlog guard
    pub fn guard(&self) -> &TransportGuard {
        &self.guard
    }

    /// Delay the caller should wait between iterations
    pub fn loop_delay_ms(&self) -> u32 {
        self.config.timing.loop_delay_ms
    }

    /// Pixel driver
    pub fn pixel_driver(&self) -> &P {
        &self.pixel_driver
    }

    /// Actuator driver
    pub fn actuator_driver(&self) -> &A {
        &self.actuator_driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActuatorConfig, PanelOrder};
    use crate::traits::NoOutput;
    use heapless::Vec;
    use mirror_hal::RingRx;
    use mirror_protocol::{encode_actuator_payload, encode_frame};

    #[derive(Default)]
    struct Shows {
        count: u8,
    }

    impl PixelDriver for Shows {
        type Error = ();

        fn write_bank(&mut self, _bank: u8, _pixels: &[u8]) -> Result<(), ()> {
            Ok(())
        }

        fn show(&mut self) -> Result<(), ()> {
            self.count += 1;
            Ok(())
        }
    }

    fn config() -> ControllerConfig {
        let mut actuators = ActuatorConfig {
            channel_count: 2,
            ..ActuatorConfig::default()
        };
        actuators.banks.truncate(1);
        ControllerConfig {
            matrix: MatrixConfig {
                width: 4,
                height: 4,
                panel_size: 4,
                serpentine: false,
                mirror_x: false,
                mirror_y: false,
                panel_order: PanelOrder::RowMajor,
                split_column: 0,
                swap_banks: false,
                on_level: 255,
                brightness: 255,
            },
            actuators,
            ..ControllerConfig::default()
        }
    }

    type Small = Controller<Shows, NoOutput, 32>;

    fn actuator_frame(values: &[u16]) -> Vec<u8, 16> {
        let mut payload = [0u8; 8];
        let len = encode_actuator_payload(values, &mut payload).unwrap();
        let mut out = [0u8; 16];
        let n = encode_frame(FrameKind::Actuators, &payload[..len], &mut out).unwrap();
        Vec::from_slice(&out[..n]).unwrap()
    }

    #[test]
    fn test_new_rejects_small_decoder() {
        let result = Controller::<NoOutput, NoOutput, 8>::new(config(), NoOutput, NoOutput);
        assert!(matches!(result, Err(ConfigError::PayloadTooLarge)));
    }

    #[test]
    fn test_start_commits_blank() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        controller.start();
        assert_eq!(controller.pixel_driver().count, 1);
    }

    #[test]
    fn test_tick_period_gates_filter() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        let mut rx: RingRx<64> = RingRx::new();
        let mut tx: Vec<u8, 64> = Vec::new();
        assert!(controller.poll(&mut rx, &mut tx, 0).ticked);
        assert!(!controller.poll(&mut rx, &mut tx, 19).ticked);
        assert!(controller.poll(&mut rx, &mut tx, 20).ticked);

        controller.set_tick_period_ms(0);
        assert!(controller.poll(&mut rx, &mut tx, 20).ticked);
    }

    #[test]
    fn test_frame_budget_bounds_iteration() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        let mut rx: RingRx<128> = RingRx::new();
        let mut tx: Vec<u8, 64> = Vec::new();
        let frame = actuator_frame(&[100, 200]);
        for _ in 0..6 {
            rx.extend_from_slice(&frame);
        }

        let report = controller.poll(&mut rx, &mut tx, 0);
        assert_eq!(report.frames, 4);
        assert_eq!(report.bytes_consumed, 4 * frame.len());
        assert_eq!(rx.available(), 2 * frame.len());

        let report = controller.poll(&mut rx, &mut tx, 1);
        assert_eq!(report.frames, 2);
        assert_eq!(controller.diagnostics().frames_ok, 6);
    }

    #[test]
    fn test_ping_reply() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        let mut rx: RingRx<64> = RingRx::new();
        let mut tx: Vec<u8, 64> = Vec::new();
        rx.extend_from_slice(&[0xAA, 0xBB, 0x05]);
        let report = controller.poll(&mut rx, &mut tx, 0);
        assert_eq!(report.replies, 1);
        assert_eq!(report.frames_applied, 0);
        assert_eq!(&tx[..], b"PONG\n");
    }

    #[test]
    fn test_failing_reply_counts_driver_error() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        let mut rx: RingRx<64> = RingRx::new();
        // Too small for the info block
        let mut tx: Vec<u8, 8> = Vec::new();
        rx.extend_from_slice(&[0xAA, 0xBB, 0x06]);
        let report = controller.poll(&mut rx, &mut tx, 0);
        assert_eq!(report.replies, 0);
        assert_eq!(controller.diagnostics().driver_errors, 1);
    }

    #[test]
    fn test_runtime_setters_validate() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        assert_eq!(controller.set_alpha(1.2), Err(ConfigError::AlphaOutOfRange));
        controller.set_alpha(0.5).unwrap();
        assert_eq!(controller.config().actuators.alpha, 0.5);
        assert_eq!(controller.actuators().alpha(), 0.5);

        assert_eq!(
            controller.set_drive_range(0, 500, 100),
            Err(ConfigError::DriveRangeInverted)
        );
        controller.set_drive_range(0, 120, 480).unwrap();
        assert_eq!(controller.config().actuators.banks[0], DriveRange { min: 120, max: 480 });
    }

    #[test]
    fn test_orientation_change_blanks() {
        let mut controller = Small::new(config(), Shows::default(), NoOutput).unwrap();
        let matrix = MatrixConfig {
            mirror_x: true,
            ..config().matrix
        };
        controller.set_matrix_orientation(matrix).unwrap();
        assert!(controller.config().matrix.mirror_x);
        assert_eq!(controller.pixel_driver().count, 1);

        let resized = MatrixConfig {
            width: 8,
            ..config().matrix
        };
        assert_eq!(
            controller.set_matrix_orientation(resized),
            Err(ConfigError::DimensionsChanged)
        );
        assert!(controller.config().matrix.mirror_x);
    }
}
