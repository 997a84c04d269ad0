//! Integration tests for CPU/GPU frame pipelining.
//!
//! The scheduler is driven against an in-memory queue whose "GPU" only
//! completes work when the test says so. Blocking is observed from the
//! main thread through a channel with timeouts.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use raymarch_renderer::{
    CommandAllocator, ConstantRegion, FRAMES_IN_FLIGHT, FrameQueue, FrameResource,
    FrameScheduler, PassConstants,
};
use raymarch_rhi::{RhiError, RhiResult};
use raymarch_scene::{CameraInput, FlyCamera, FractalParams, PHI_MARGIN};

const BLOCKED_TIMEOUT: Duration = Duration::from_millis(150);
const PROGRESS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct GpuState {
    completed: u64,
    signalled: Vec<u64>,
    /// Allocators submitted since the last signal.
    pending: Vec<usize>,
    /// Fence that retires each allocator's latest submission.
    allocator_fences: HashMap<usize, u64>,
    resets: usize,
    fail: Failures,
}

/// Calls that report a device failure while set.
#[derive(Clone, Copy, Default)]
struct Failures {
    completed_value: bool,
    wait: bool,
    reset: bool,
    submit: bool,
    signal: bool,
}

fn device_lost(operation: &'static str) -> RhiError {
    RhiError::Vulkan {
        operation,
        location: std::panic::Location::caller(),
        result: raymarch_rhi::vk::Result::ERROR_DEVICE_LOST,
    }
}

/// Shared handle to the simulated device.
#[derive(Clone, Default)]
struct Gpu(Arc<(Mutex<GpuState>, Condvar)>);

impl Gpu {
    fn state(&self) -> std::sync::MutexGuard<'_, GpuState> {
        self.0.0.lock().unwrap()
    }

    fn set_failures(&self, fail: Failures) {
        self.state().fail = fail;
    }

    /// Completes all work up to `value`.
    fn advance_to(&self, value: u64) {
        let (lock, condvar) = &*self.0;
        let mut state = lock.lock().unwrap();
        state.completed = state.completed.max(value);
        condvar.notify_all();
    }
}

struct MockAllocator {
    id: usize,
    gpu: Gpu,
}

impl CommandAllocator for MockAllocator {
    fn reset(&mut self) -> RhiResult<()> {
        let mut state = self.gpu.state();
        if state.fail.reset {
            return Err(device_lost("vkResetCommandPool"));
        }
        if let Some(&fence) = state.allocator_fences.get(&self.id) {
            assert!(
                fence <= state.completed,
                "allocator {} reset while fence {} pending (completed {})",
                self.id,
                fence,
                state.completed
            );
        }
        state.resets += 1;
        Ok(())
    }
}

struct MockRegion(Vec<u8>);

impl ConstantRegion for MockRegion {
    fn capacity(&self) -> usize {
        self.0.len()
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> RhiResult<()> {
        let end = offset + bytes.len();
        if end > self.0.len() {
            return Err(RhiError::BufferError(format!(
                "write of {} bytes at {} exceeds {}",
                bytes.len(),
                offset,
                self.0.len()
            )));
        }
        self.0[offset..end].copy_from_slice(bytes);
        Ok(())
    }
}

struct MockQueue {
    gpu: Gpu,
}

impl FrameQueue for MockQueue {
    type Allocator = MockAllocator;

    fn completed_value(&self) -> RhiResult<u64> {
        let state = self.gpu.state();
        if state.fail.completed_value {
            return Err(device_lost("vkGetSemaphoreCounterValue"));
        }
        Ok(state.completed)
    }

    fn submit(&mut self, allocator: &MockAllocator) -> RhiResult<()> {
        let mut state = self.gpu.state();
        if state.fail.submit {
            return Err(device_lost("vkQueueSubmit"));
        }
        state.pending.push(allocator.id);
        Ok(())
    }

    fn signal(&mut self, value: u64) -> RhiResult<()> {
        let mut state = self.gpu.state();
        if state.fail.signal {
            return Err(device_lost("vkQueueSubmit"));
        }
        let pending = std::mem::take(&mut state.pending);
        for id in pending {
            state.allocator_fences.insert(id, value);
        }
        state.signalled.push(value);
        Ok(())
    }

    fn wait_for_value(&self, value: u64) -> RhiResult<()> {
        let (lock, condvar) = &*self.gpu.0;
        let mut state = lock.lock().unwrap();
        if state.fail.wait {
            return Err(device_lost("vkWaitSemaphores"));
        }
        while state.completed < value {
            state = condvar.wait(state).unwrap();
        }
        Ok(())
    }
}

type TestScheduler = FrameScheduler<MockQueue, MockRegion>;

fn scheduler(slots: usize) -> (TestScheduler, Gpu) {
    let gpu = Gpu::default();
    let frames = (0..slots)
        .map(|id| {
            FrameResource::new(
                MockAllocator {
                    id,
                    gpu: gpu.clone(),
                },
                MockRegion(vec![0; PassConstants::SIZE]),
            )
        })
        .collect();
    let scheduler = FrameScheduler::new(
        MockQueue { gpu: gpu.clone() },
        frames,
        FlyCamera::default(),
        FractalParams::default(),
    );
    (scheduler, gpu)
}

fn run_frame(scheduler: &mut TestScheduler, dt: f32, input: &CameraInput) -> (PassConstants, u64) {
    scheduler.on_frame_begin().unwrap();
    let constants = scheduler.on_update(dt, input).unwrap();
    let fence = scheduler.on_frame_end(|_| Ok(())).unwrap();
    (constants, fence)
}

#[derive(Debug, PartialEq)]
enum Event {
    Begin(u64),
    Began(u64),
    Submitted(u64),
}

fn expect_event(rx: &Receiver<Event>, expected: Event) {
    let event = rx
        .recv_timeout(PROGRESS_TIMEOUT)
        .unwrap_or_else(|e| panic!("waiting for {expected:?}: {e:?}"));
    assert_eq!(event, expected);
}

#[test]
fn ring_index_after_k_frames_is_k_mod_n() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    assert_eq!(scheduler.current_index(), 0);

    for k in 1..=10usize {
        let (_, fence) = run_frame(&mut scheduler, 0.016, &CameraInput::default());
        gpu.advance_to(fence);
        assert_eq!(scheduler.current_index(), k % FRAMES_IN_FLIGHT);
    }
}

#[test]
fn reused_slot_blocks_until_its_fence_retires() {
    let (scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    let n = FRAMES_IN_FLIGHT as u64;
    let total = n + 3;
    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        let mut scheduler = scheduler;
        for k in 1..=total {
            tx.send(Event::Begin(k)).unwrap();
            scheduler.on_frame_begin().unwrap();
            tx.send(Event::Began(k)).unwrap();
            scheduler.on_update(0.016, &CameraInput::default()).unwrap();
            let fence = scheduler.on_frame_end(|_| Ok(())).unwrap();
            tx.send(Event::Submitted(fence)).unwrap();
        }
        scheduler
    });

    // The first N frames never wait, even though nothing has completed.
    for k in 1..=n {
        expect_event(&rx, Event::Begin(k));
        expect_event(&rx, Event::Began(k));
        expect_event(&rx, Event::Submitted(k));
    }

    // Frame k reuses the slot of frame k - N.
    for k in n + 1..=total {
        expect_event(&rx, Event::Begin(k));
        assert_eq!(
            rx.recv_timeout(BLOCKED_TIMEOUT),
            Err(RecvTimeoutError::Timeout),
            "frame {k} began before fence {} retired",
            k - n
        );

        gpu.advance_to(k - n);
        expect_event(&rx, Event::Began(k));
        expect_event(&rx, Event::Submitted(k));
    }

    let scheduler = worker.join().unwrap();
    assert_eq!(scheduler.fence_value(), total);
    assert_eq!(gpu.state().resets, total as usize);
}

#[test]
fn fence_values_increase_by_one_per_frame() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);

    let mut fences = Vec::new();
    for _ in 0..8 {
        let (_, fence) = run_frame(&mut scheduler, 0.016, &CameraInput::default());
        gpu.advance_to(fence);
        fences.push(fence);
    }

    assert!(fences.windows(2).all(|pair| pair[1] == pair[0] + 1));
    assert_eq!(fences[0], 1);
    assert_eq!(gpu.state().signalled, fences);
}

#[test]
fn uploaded_constants_read_back_identically() {
    let (mut scheduler, _gpu) = scheduler(FRAMES_IN_FLIGHT);
    let input = CameraInput {
        vertical: 1.0,
        look_delta: (12.0, -4.0),
        ..Default::default()
    };

    scheduler.on_frame_begin().unwrap();
    let constants = scheduler.on_update(0.5, &input).unwrap();

    let region = scheduler.current_frame().constants();
    assert_eq!(region.0.as_slice(), bytemuck::bytes_of(&constants));
}

#[test]
fn power_grows_with_growth_rate() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    let grow = CameraInput {
        growth_steps: 3,
        ..Default::default()
    };

    let (first, fence) = run_frame(&mut scheduler, 1.0, &grow);
    gpu.advance_to(fence);
    assert_eq!(first.fractal_power, 8.0);

    let mut powers = Vec::new();
    for _ in 0..2 {
        let (constants, fence) = run_frame(&mut scheduler, 1.0, &CameraInput::default());
        gpu.advance_to(fence);
        powers.push(constants.fractal_power);
    }

    assert!((powers[0] - 8.03).abs() < 1e-4);
    assert!((powers[1] - 8.06).abs() < 1e-4);
}

#[test]
fn power_never_drops_below_one() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    let shrink = CameraInput {
        growth_steps: -1000,
        ..Default::default()
    };

    let (_, fence) = run_frame(&mut scheduler, 1.0, &shrink);
    gpu.advance_to(fence);

    for _ in 0..5 {
        let (constants, fence) = run_frame(&mut scheduler, 1.0, &CameraInput::default());
        gpu.advance_to(fence);
        assert!(constants.fractal_power >= 1.0);
    }
    assert_eq!(scheduler.fractal().power, 1.0);
}

#[test]
fn polar_angle_stays_clamped_under_mouse_input() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    let lower = PHI_MARGIN;
    let upper = std::f32::consts::PI - PHI_MARGIN;

    for dy in [5000.0, -5000.0, 123.0, -77.0, 1.0e6] {
        let input = CameraInput {
            look_delta: (3.0, dy),
            ..Default::default()
        };
        let (_, fence) = run_frame(&mut scheduler, 0.016, &input);
        gpu.advance_to(fence);

        let phi = scheduler.camera().phi();
        assert!((lower..=upper).contains(&phi), "phi {phi} out of range");
    }
}

#[test]
fn flush_retires_every_slot() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    for _ in 0..FRAMES_IN_FLIGHT {
        run_frame(&mut scheduler, 0.016, &CameraInput::default());
    }

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let mut scheduler = scheduler;
        scheduler.flush().unwrap();
        tx.send(()).unwrap();
        scheduler
    });

    assert_eq!(rx.recv_timeout(BLOCKED_TIMEOUT), Err(RecvTimeoutError::Timeout));
    gpu.advance_to(FRAMES_IN_FLIGHT as u64 + 1);
    rx.recv_timeout(PROGRESS_TIMEOUT).unwrap();

    let scheduler = worker.join().unwrap();
    let completed = gpu.state().completed;
    assert!(scheduler.frames().all(|frame| frame.is_retired(completed)));
}

/// Runs one full cycle per slot without completing any of them.
fn fill_ring(scheduler: &mut TestScheduler) {
    for _ in 0..scheduler.frames_in_flight() {
        run_frame(scheduler, 0.016, &CameraInput::default());
    }
}

fn assert_device_lost(result: RhiResult<impl std::fmt::Debug>) {
    let err = result.expect_err("device failure must surface");
    assert_eq!(
        err.vk_result(),
        Some(raymarch_rhi::vk::Result::ERROR_DEVICE_LOST)
    );
}

#[test]
fn completed_value_failure_stops_frame_before_reset() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    fill_ring(&mut scheduler);
    let resets = gpu.state().resets;

    gpu.set_failures(Failures {
        completed_value: true,
        ..Default::default()
    });
    assert_device_lost(scheduler.on_frame_begin());
    assert_eq!(gpu.state().resets, resets);
}

#[test]
fn wait_failure_returns_before_reset() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    fill_ring(&mut scheduler);
    let resets = gpu.state().resets;

    // Nothing has completed, so the reused slot has to wait.
    gpu.set_failures(Failures {
        wait: true,
        ..Default::default()
    });
    assert_device_lost(scheduler.on_frame_begin());
    assert_eq!(gpu.state().resets, resets);
    assert_eq!(scheduler.current_fence(), 1);
}

#[test]
fn reset_failure_surfaces() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    gpu.set_failures(Failures {
        reset: true,
        ..Default::default()
    });
    assert_device_lost(scheduler.on_frame_begin());
    assert_eq!(gpu.state().resets, 0);
}

#[test]
fn submit_failure_leaves_slot_unstamped() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    let (_, fence) = run_frame(&mut scheduler, 0.016, &CameraInput::default());
    gpu.advance_to(fence);

    scheduler.on_frame_begin().unwrap();
    scheduler.on_update(0.016, &CameraInput::default()).unwrap();
    gpu.set_failures(Failures {
        submit: true,
        ..Default::default()
    });
    assert_device_lost(scheduler.on_frame_end(|_| Ok(())));

    assert_eq!(scheduler.fence_value(), 1);
    assert_eq!(scheduler.current_fence(), 0);
    assert_eq!(gpu.state().signalled, vec![1]);
}

#[test]
fn signal_failure_keeps_fence_counter() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    scheduler.on_frame_begin().unwrap();
    scheduler.on_update(0.016, &CameraInput::default()).unwrap();
    gpu.set_failures(Failures {
        signal: true,
        ..Default::default()
    });
    assert_device_lost(scheduler.on_frame_end(|_| Ok(())));

    assert_eq!(scheduler.fence_value(), 0);
    assert_eq!(scheduler.current_fence(), 0);
    assert!(gpu.state().signalled.is_empty());
}

#[test]
fn flush_signal_failure_keeps_fence_counter() {
    let (mut scheduler, gpu) = scheduler(FRAMES_IN_FLIGHT);
    let (_, fence) = run_frame(&mut scheduler, 0.016, &CameraInput::default());
    gpu.advance_to(fence);

    gpu.set_failures(Failures {
        signal: true,
        ..Default::default()
    });
    assert_device_lost(scheduler.flush());
    assert_eq!(scheduler.fence_value(), 1);
}
