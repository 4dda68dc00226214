//! Integration tests for the binding engine
//!
//! Drive a `BindingManager` through a fake device layer the way an
//! application's frame loop would: bind controls, poll, feed button events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rstest::rstest;
use serial_test::serial;

use vrbind::input::{AxisCapture, AxisSamples, DeviceId, MAX_AXES, MAX_BUTTONS};
use vrbind::{
    Action, AxisBinding, AxisDirection, AxisParams, BindError, BindingManager, ButtonBinding,
    DeviceEvent, DeviceSource, EngineConfig, Hand,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Ctl {
    Select,
    Back,
    Fire,
    Jump,
    Boost,
    Brake,
    Steer,
    Throttle,
}
vrbind::impl_control!(Ctl { Select, Back, Fire, Jump, Boost, Brake, Steer, Throttle });

const LEFT_DEVICE: DeviceId = 1;
const RIGHT_DEVICE: DeviceId = 2;

/// Device layer stand-in with settable topology and samples
struct FakeDevices {
    controllers: Mutex<Vec<(DeviceId, Hand)>>,
    samples: Mutex<HashMap<DeviceId, AxisSamples>>,
}

impl FakeDevices {
    fn new() -> Self {
        let mut samples = HashMap::new();
        samples.insert(LEFT_DEVICE, [[0.0; 2]; MAX_AXES]);
        samples.insert(RIGHT_DEVICE, [[0.0; 2]; MAX_AXES]);
        Self {
            controllers: Mutex::new(vec![(LEFT_DEVICE, Hand::Left), (RIGHT_DEVICE, Hand::Right)]),
            samples: Mutex::new(samples),
        }
    }

    fn set(&self, device: DeviceId, axis: usize, x: f32, y: f32) {
        if let Some(samples) = self.samples.lock().get_mut(&device) {
            samples[axis] = [x, y];
        }
    }

    fn disconnect(&self, device: DeviceId) {
        self.controllers.lock().retain(|(id, _)| *id != device);
        self.samples.lock().remove(&device);
    }
}

impl DeviceSource for FakeDevices {
    fn controllers(&self) -> Vec<(DeviceId, Hand)> {
        self.controllers.lock().clone()
    }

    fn role(&self, device: DeviceId) -> Hand {
        self.controllers
            .lock()
            .iter()
            .find(|(id, _)| *id == device)
            .map_or(Hand::Unknown, |(_, hand)| *hand)
    }

    fn axis_samples(&self, device: DeviceId) -> Option<AxisSamples> {
        self.samples.lock().get(&device).copied()
    }

    fn model_name(&self, device: DeviceId) -> String {
        format!("fake controller {}", device)
    }
}

type Journal = Arc<Mutex<Vec<(Ctl, Option<f32>)>>>;

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn setup() -> (BindingManager<Ctl>, FakeDevices, Journal) {
    let manager = BindingManager::new(EngineConfig::checked());
    let devices = FakeDevices::new();
    manager.init(&devices);
    (manager, devices, journal())
}

fn on_press(manager: &BindingManager<Ctl>, log: &Journal, control: Ctl) {
    let log = log.clone();
    manager
        .set_digital(
            control,
            Action::Press,
            Arc::new(move || log.lock().push((control, None))),
        )
        .unwrap();
}

fn on_axis(manager: &BindingManager<Ctl>, log: &Journal, control: Ctl) {
    let log = log.clone();
    manager.set_analogue(
        control,
        Arc::new(move |value| log.lock().push((control, Some(value)))),
    );
}

fn press(manager: &BindingManager<Ctl>, devices: &FakeDevices, device: DeviceId, button: u32) {
    manager.handle_event(
        devices,
        DeviceEvent::Button {
            device,
            button,
            action: Action::Press,
        },
    );
}

fn fired(log: &Journal) -> Vec<Ctl> {
    log.lock().iter().map(|(control, _)| *control).collect()
}

fn values(log: &Journal) -> Vec<f32> {
    log.lock().iter().filter_map(|(_, value)| *value).collect()
}

#[test]
fn test_unbind_keeps_shared_slots_for_other_controls() {
    let (manager, devices, log) = setup();
    on_press(&manager, &log, Ctl::Fire);
    on_press(&manager, &log, Ctl::Jump);

    let trigger = ButtonBinding::specific(Hand::Right, 33);
    manager.bind_button(Ctl::Fire, trigger).unwrap();
    manager.bind_button(Ctl::Jump, trigger).unwrap();
    manager
        .bind_button(Ctl::Fire, ButtonBinding::specific(Hand::Right, 1))
        .unwrap();

    manager.unbind_button(Ctl::Fire);
    press(&manager, &devices, RIGHT_DEVICE, 33);
    press(&manager, &devices, RIGHT_DEVICE, 1);

    assert_eq!(fired(&log), vec![Ctl::Jump]);
    assert!(manager.button_bindings("default", Ctl::Fire).is_empty());
}

#[test]
fn test_unbound_axis_stops_firing() {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);
    manager
        .bind_axis(Ctl::Steer, AxisBinding::new(Hand::Left, 0, AxisDirection::X))
        .unwrap();
    devices.set(LEFT_DEVICE, 0, 0.5, 0.0);

    manager.poll(&devices);
    manager.unbind_axis(Ctl::Steer);
    manager.poll(&devices);

    assert_eq!(values(&log), vec![0.5]);
}

#[rstest]
#[case(-1.0)]
#[case(-0.3)]
#[case(0.0)]
#[case(0.75)]
#[case(1.0)]
fn test_identity_params_round_trip(#[case] raw: f32) {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Throttle);
    manager
        .bind_axis(Ctl::Throttle, AxisBinding::new(Hand::Right, 1, AxisDirection::Y))
        .unwrap();

    devices.set(RIGHT_DEVICE, 1, 0.0, raw);
    manager.poll(&devices);
    assert_eq!(values(&log), vec![raw]);
}

#[test]
fn test_deadzone_reads_boundary_not_zero() {
    let (manager, _devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);
    let params = AxisParams {
        deadzone_min: 0.2,
        ..AxisParams::default()
    };
    manager
        .bind_axis(
            Ctl::Steer,
            AxisBinding::new(Hand::Left, 0, AxisDirection::X).with_params(params),
        )
        .unwrap();

    manager.execute_axis(Hand::Left, 0, AxisDirection::X, 0.1);
    manager.execute_axis(Hand::Left, 0, AxisDirection::X, 0.2);
    let seen = values(&log);
    assert_eq!(seen[0], seen[1]);
    assert_ne!(seen[0], 0.0);
}

#[test]
fn test_saturation_clamps_to_one() {
    let (manager, _devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);
    manager
        .bind_axis(Ctl::Steer, AxisBinding::new(Hand::Left, 0, AxisDirection::X))
        .unwrap();
    manager.execute_axis(Hand::Left, 0, AxisDirection::X, 1.5);
    assert_eq!(values(&log), vec![1.0]);
}

#[test]
fn test_flip_bound_twice_stays_flipped() {
    let (manager, _devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);
    let binding = AxisBinding::new(Hand::Left, 2, AxisDirection::X)
        .with_params(AxisParams::flipped(true));
    manager.bind_axis(Ctl::Steer, binding).unwrap();
    manager.bind_axis(Ctl::Steer, binding).unwrap();

    let premultiply = manager.with_controller(|c| {
        c.axis(Hand::Left, 2, AxisDirection::X)
            .map(|unit| unit.premultiply())
    });
    assert_eq!(premultiply, Some(-1.0));
    manager.execute_axis(Hand::Left, 2, AxisDirection::X, 0.5);
    assert_eq!(values(&log), vec![-0.5]);
}

#[test]
fn test_half_axis_trigger() {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Throttle);
    manager
        .bind_axis(
            Ctl::Throttle,
            AxisBinding::new(Hand::Right, 1, AxisDirection::X).with_params(AxisParams::half(false)),
        )
        .unwrap();

    for raw in [0.0, 0.5, 1.0] {
        devices.set(RIGHT_DEVICE, 1, raw, 0.0);
        manager.poll(&devices);
    }
    assert_eq!(values(&log), vec![-1.0, 0.0, 1.0]);
}

#[test]
fn test_shared_button_fires_in_control_order() {
    let (manager, devices, log) = setup();
    on_press(&manager, &log, Ctl::Fire);
    on_press(&manager, &log, Ctl::Brake);

    let grip = ButtonBinding::specific(Hand::Left, 2);
    // bind the higher ordinal first; call order must not depend on it
    manager.bind_button(Ctl::Brake, grip).unwrap();
    manager.bind_button(Ctl::Fire, grip).unwrap();

    press(&manager, &devices, LEFT_DEVICE, 2);
    assert_eq!(fired(&log), vec![Ctl::Fire, Ctl::Brake]);
    assert_eq!(
        manager.controls_on_button("default", Hand::Left, 2),
        vec![Ctl::Fire, Ctl::Brake]
    );
}

#[test]
fn test_any_all_presses_every_button() {
    let (manager, _devices, log) = setup();
    on_press(&manager, &log, Ctl::Select);
    manager.bind_button(Ctl::Select, ButtonBinding::AnyAll).unwrap();

    for hand in Hand::TRACKED {
        for button in 0..MAX_BUTTONS as u32 {
            manager.execute_button(hand, button, Action::Press);
        }
    }
    assert_eq!(log.lock().len(), 2 * MAX_BUTTONS);

    let result = manager.set_digital(Ctl::Select, Action::Release, Arc::new(|| {}));
    assert_eq!(
        result,
        Err(BindError::UnsupportedWildcardAction {
            binding: ButtonBinding::AnyAll,
            action: Action::Release,
        })
    );
    manager.execute_button(Hand::Left, 0, Action::Release);
    assert_eq!(log.lock().len(), 2 * MAX_BUTTONS);
}

#[test]
fn test_any_all_refused_for_release_control() {
    let (manager, _devices, _log) = setup();
    manager
        .set_digital(Ctl::Back, Action::Release, Arc::new(|| {}))
        .unwrap();
    assert!(matches!(
        manager.bind_button(Ctl::Back, ButtonBinding::AnyAll),
        Err(BindError::UnsupportedWildcardAction { .. })
    ));
    assert!(!manager.with_controller(|c| c.is_button_bound(Hand::Left, 0, Action::Release)));
}

#[test]
fn test_profile_switch_repoints_everything() {
    let (manager, devices, log) = setup();
    on_press(&manager, &log, Ctl::Fire);
    on_axis(&manager, &log, Ctl::Steer);

    manager.select_profile("game");
    manager
        .bind_button(Ctl::Fire, ButtonBinding::specific(Hand::Right, 33))
        .unwrap();
    manager
        .bind_axis(Ctl::Steer, AxisBinding::new(Hand::Left, 0, AxisDirection::X))
        .unwrap();
    devices.set(LEFT_DEVICE, 0, 0.25, 0.0);

    manager.select_profile("menu");
    press(&manager, &devices, RIGHT_DEVICE, 33);
    manager.poll(&devices);
    assert!(log.lock().is_empty());
    assert!(manager.binding_graphs(16, 5).is_empty());

    manager.select_profile("game");
    press(&manager, &devices, RIGHT_DEVICE, 33);
    manager.poll(&devices);
    assert_eq!(
        log.lock().as_slice(),
        &[(Ctl::Fire, None), (Ctl::Steer, Some(0.25))]
    );
    assert_eq!(
        manager.profile_names(),
        vec!["default".to_string(), "game".to_string(), "menu".to_string()]
    );
}

#[test]
fn test_capture_axis_reports_deflection_once() {
    let (manager, devices, _log) = setup();
    devices.set(LEFT_DEVICE, 0, 0.1, 0.0);

    let captured: Arc<Mutex<Vec<AxisCapture>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    manager.calibrate_axes(&devices).unwrap();
    manager
        .capture_axis(&devices, Arc::new(move |c| sink.lock().push(c)))
        .unwrap();

    // r + 0.1
    devices.set(LEFT_DEVICE, 0, 0.2, 0.0);
    manager.poll(&devices);
    assert!(captured.lock().is_empty());

    // r + 0.6, held for several frames
    devices.set(LEFT_DEVICE, 0, 0.7, 0.0);
    for _ in 0..3 {
        manager.poll(&devices);
    }
    let captured = captured.lock();
    assert_eq!(captured.len(), 1);
    assert_eq!(
        captured[0],
        AxisCapture {
            hand: Hand::Left,
            axis: 0,
            direction: AxisDirection::X,
            negative: false,
        }
    );
    assert!(!captured[0].binding().params.flip);
}

#[rstest]
#[case(0.1)]
#[case(0.5)]
#[case(0.7)]
fn test_capture_axis_from_any_resting_value(#[case] resting: f32) {
    let (manager, devices, _log) = setup();
    devices.set(LEFT_DEVICE, 0, resting, 0.0);

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    manager
        .capture_axis_raw(&devices, move |hand, axis, direction, negative| {
            sink.lock().push((hand, axis, direction, negative))
        })
        .unwrap();

    devices.set(LEFT_DEVICE, 0, resting + 0.1, 0.0);
    manager.poll(&devices);
    assert!(captured.lock().is_empty());

    devices.set(LEFT_DEVICE, 0, resting + 0.6, 0.0);
    manager.poll(&devices);
    manager.poll(&devices);
    assert_eq!(
        captured.lock().as_slice(),
        &[(Hand::Left, 0, AxisDirection::X, false)]
    );
}

#[test]
fn test_capture_callback_can_bind_the_capture() {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);

    let binder = manager.clone();
    manager
        .capture_axis(
            &devices,
            Arc::new(move |c| {
                binder.bind_axis(Ctl::Steer, c.binding()).unwrap();
            }),
        )
        .unwrap();

    devices.set(RIGHT_DEVICE, 3, 0.0, -0.9);
    manager.poll(&devices);
    assert!(log.lock().is_empty());
    assert_eq!(manager.axis_bindings("default", Ctl::Steer).len(), 1);

    // negative deflection is bound flipped so it reads positive
    manager.poll(&devices);
    let seen = values(&log);
    assert_eq!(seen.len(), 1);
    assert!((seen[0] - 0.9).abs() < 1e-6);
}

#[test]
fn test_capture_without_calibration_sample_fails() {
    let (manager, devices, _log) = setup();
    devices.samples.lock().remove(&RIGHT_DEVICE);

    let result = manager.capture_axis(&devices, Arc::new(|_| {}));
    assert_eq!(
        result,
        Err(BindError::CalibrationUnavailable { hand: Hand::Right })
    );
    assert!(!manager.with_controller(|c| c.is_calibrated()));
}

#[test]
fn test_capture_button_then_refresh() {
    let (manager, devices, log) = setup();
    on_press(&manager, &log, Ctl::Jump);
    manager
        .bind_button(Ctl::Jump, ButtonBinding::specific(Hand::Left, 7))
        .unwrap();

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    manager.capture_button_raw(move |hand, button| sink.lock().push((hand, button)));
    press(&manager, &devices, LEFT_DEVICE, 7);
    press(&manager, &devices, RIGHT_DEVICE, 4);
    assert!(log.lock().is_empty());
    assert_eq!(
        captured.lock().as_slice(),
        &[(Hand::Left, 7), (Hand::Right, 4)]
    );

    manager.refresh();
    press(&manager, &devices, LEFT_DEVICE, 7);
    assert_eq!(fired(&log), vec![Ctl::Jump]);
}

#[test]
fn test_rebind_from_callback_applies_next_poll() {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Throttle);

    let binder = manager.clone();
    let steer_log = log.clone();
    manager.set_analogue(
        Ctl::Steer,
        Arc::new(move |value| {
            steer_log.lock().push((Ctl::Steer, Some(value)));
            binder
                .bind_axis(Ctl::Throttle, AxisBinding::new(Hand::Left, 0, AxisDirection::X))
                .unwrap();
        }),
    );
    manager
        .bind_axis(Ctl::Steer, AxisBinding::new(Hand::Left, 0, AxisDirection::X))
        .unwrap();
    devices.set(LEFT_DEVICE, 0, 0.5, 0.0);

    manager.poll(&devices);
    manager.poll(&devices);
    assert_eq!(fired(&log), vec![Ctl::Steer, Ctl::Throttle]);
}

#[test]
fn test_disconnected_hand_is_not_polled() {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);
    on_press(&manager, &log, Ctl::Fire);
    manager
        .bind_axis(Ctl::Steer, AxisBinding::new(Hand::Left, 0, AxisDirection::X))
        .unwrap();
    manager
        .bind_button(Ctl::Fire, ButtonBinding::specific(Hand::Left, 33))
        .unwrap();

    devices.disconnect(LEFT_DEVICE);
    manager.handle_event(&devices, DeviceEvent::Deactivated(LEFT_DEVICE));
    manager.poll(&devices);
    manager.execute_button(Hand::Left, 33, Action::Press);

    assert!(log.lock().is_empty());
    assert_eq!(manager.device_name(Hand::Left), "");
    assert_eq!(manager.device_name(Hand::Right), "fake controller 2");
}

#[test]
fn test_poll_device_adopts_device() {
    let (manager, devices, log) = setup();
    on_axis(&manager, &log, Ctl::Steer);
    manager
        .bind_axis(Ctl::Steer, AxisBinding::new(Hand::Right, 0, AxisDirection::X))
        .unwrap();

    devices.controllers.lock().push((9, Hand::Right));
    devices
        .samples
        .lock()
        .insert(9, [[0.4, 0.0], [0.0; 2], [0.0; 2], [0.0; 2], [0.0; 2]]);
    manager.poll_device(&devices, 9);

    assert_eq!(values(&log), vec![0.4]);
    assert_eq!(manager.with_controller(|c| c.device_id(Hand::Right)), 9);
}

#[test]
fn test_swapped_device_is_recalibrated_before_capture() {
    let (manager, devices, _log) = setup();
    manager.calibrate_axes(&devices).unwrap();

    // a replacement left controller resting off centre
    devices.disconnect(LEFT_DEVICE);
    devices.controllers.lock().push((9, Hand::Left));
    devices
        .samples
        .lock()
        .insert(9, [[0.6, 0.0], [0.0; 2], [0.0; 2], [0.0; 2], [0.0; 2]]);
    manager.poll_device(&devices, 9);
    assert!(!manager.with_controller(|c| c.is_calibrated()));
    assert_eq!(manager.device_name(Hand::Left), "fake controller 9");

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    manager
        .capture_axis(&devices, Arc::new(move |c| sink.lock().push(c)))
        .unwrap();
    manager.poll(&devices);
    assert!(captured.lock().is_empty());
    assert!(manager.with_controller(|c| c.is_calibrated()));
}

static GLOBAL_BINDINGS: LazyLock<BindingManager<Ctl>> =
    LazyLock::new(|| BindingManager::new(EngineConfig::checked()));

static GLOBAL_PRESSES: AtomicUsize = AtomicUsize::new(0);

fn count_boost() {
    GLOBAL_BINDINGS
        .set_digital(
            Ctl::Boost,
            Action::Press,
            Arc::new(|| {
                GLOBAL_PRESSES.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
}

#[test]
#[serial]
fn test_global_bindings_profile_a() {
    count_boost();
    GLOBAL_PRESSES.store(0, Ordering::SeqCst);
    GLOBAL_BINDINGS.select_profile("a");
    GLOBAL_BINDINGS
        .bind_button(Ctl::Boost, ButtonBinding::AnyOnHand(Hand::Left))
        .unwrap();

    GLOBAL_BINDINGS.execute_button(Hand::Left, 12, Action::Press);
    GLOBAL_BINDINGS.execute_button(Hand::Right, 12, Action::Press);
    assert_eq!(GLOBAL_PRESSES.load(Ordering::SeqCst), 1);
    GLOBAL_BINDINGS.select_profile("default");
}

#[test]
#[serial]
fn test_global_bindings_profile_b() {
    count_boost();
    GLOBAL_PRESSES.store(0, Ordering::SeqCst);
    GLOBAL_BINDINGS.select_profile("b");
    GLOBAL_BINDINGS
        .bind_button(Ctl::Boost, ButtonBinding::specific(Hand::Right, 0))
        .unwrap();

    GLOBAL_BINDINGS.execute_button(Hand::Left, 12, Action::Press);
    GLOBAL_BINDINGS.execute_button(Hand::Right, 0, Action::Press);
    assert_eq!(GLOBAL_PRESSES.load(Ordering::SeqCst), 1);
    GLOBAL_BINDINGS.select_profile("default");
    GLOBAL_BINDINGS.execute_button(Hand::Right, 0, Action::Press);
    assert_eq!(GLOBAL_PRESSES.load(Ordering::SeqCst), 1);
}
