mod common;

use std::rc::Rc;
use std::time::Duration;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use si7021_rs::helpers::SharedBus;
use si7021_rs::si7021::{
    self, AtInit, CrcConfig, FirmwareVersion, HeaterLevel, HeaterState, MeasureMode, ReadWait,
    Resolution, SerialNumberId, UserRegisterInfo, VddStatus,
};
use si7021_rs::si7021_i2c::{self, BusConfig, BusMode, DriverArgs};
use si7021_rs::{Error, Si7021};

use common::{MockBus, RecordingDelay};

fn quiet_args() -> si7021::CreateArgs {
    si7021::CreateArgs::default().with_at_init(AtInit::none())
}

fn create(args: &si7021::CreateArgs) -> (Si7021<MockBus, RecordingDelay>, MockBus, RecordingDelay) {
    let bus = MockBus::new();
    let delay = RecordingDelay::new();
    let sensor = Si7021::create(args, bus.clone(), delay.clone()).unwrap();
    (sensor, bus, delay)
}

#[test]
fn default_create_measures_and_deletes() {
    let (sensor, bus, _) = create(&si7021::CreateArgs::default());
    {
        let state = bus.state.borrow();
        assert_eq!(state.configures, 1);
        assert_eq!(state.installs, 1);
        assert_eq!(
            state.commands(),
            vec![0xFE, 0xE7, 0x11, 0xFA, 0xFC, 0x84]
        );
    }
    assert_eq!(sensor.name(), "si7021");

    let mut sensor = sensor;
    let measurement = sensor.measure_rh_and_temp().unwrap();
    assert!(measurement.rh_percent > 0.0 && measurement.temp_celsius > 0.0);
    let commands = bus.state.borrow().commands();
    assert!(!commands.contains(&0xE3) && !commands.contains(&0xF3));

    let (_, result) = sensor.delete();
    assert!(result.is_ok());
    assert_eq!(bus.state.borrow().uninstalls, 1);
}

#[test]
fn measures_rh_and_temp_from_one_conversion() {
    let (mut sensor, bus, _) = create(&quiet_args());
    let measurement = sensor.measure_rh_and_temp().unwrap();

    assert!((measurement.rh_percent - 44.892).abs() < 1e-3);
    assert!((measurement.temp_celsius - 23.507).abs() < 1e-3);
    let state = bus.state.borrow();
    assert_eq!(state.commands(), vec![0xF5, 0xE0]);
    // The previous-RH temperature has no checksum byte.
    assert_eq!(state.read_lengths, vec![3, 2]);
}

#[test]
fn measure_mode_selects_the_command_pair() {
    let (mut sensor, bus, _) = create(&quiet_args().with_measure_mode(MeasureMode::Hold));
    sensor.measure_rh().unwrap();
    sensor.measure_temp().unwrap();
    sensor.set_measure_mode(MeasureMode::NoHold);
    sensor.measure_rh().unwrap();
    sensor.measure_temp().unwrap();
    assert_eq!(bus.state.borrow().commands(), vec![0xE5, 0xE3, 0xF5, 0xF3]);
}

#[test]
fn raw_codes_are_exposed() {
    let (mut sensor, bus, _) = create(&quiet_args());
    bus.state.borrow_mut().rh_code = 0x1234;
    bus.state.borrow_mut().temp_code = 0x5678;
    assert_eq!(sensor.measure_rh_code().unwrap(), 0x1234);
    assert_eq!(sensor.measure_temp_code().unwrap(), 0x5678);
}

#[test]
fn external_driver_is_left_alone() {
    let args = quiet_args().with_i2c(si7021_i2c::CreateArgs::default().with_driver(DriverArgs::external()));
    let (sensor, bus, _) = create(&args);
    let (_, result) = sensor.delete();
    assert!(result.is_ok());
    let state = bus.state.borrow();
    assert_eq!((state.configures, state.installs, state.uninstalls), (0, 0, 0));
}

#[test]
fn keeping_the_driver_skips_uninstall() {
    let driver = DriverArgs {
        uninstall_at_delete: false,
        ..DriverArgs::default()
    };
    let args = quiet_args().with_i2c(si7021_i2c::CreateArgs::default().with_driver(driver));
    let (sensor, bus, _) = create(&args);
    let _ = sensor.delete();
    let state = bus.state.borrow();
    assert_eq!((state.installs, state.uninstalls), (1, 0));
}

#[test]
fn slave_mode_is_rejected() {
    let driver = DriverArgs {
        config: BusConfig::default().mode(BusMode::Slave),
        ..DriverArgs::default()
    };
    let args = quiet_args().with_i2c(si7021_i2c::CreateArgs::default().with_driver(driver));
    let bus = MockBus::new();
    let (err, returned) = Si7021::create(&args, bus.clone(), RecordingDelay::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(Rc::ptr_eq(&returned.state, &bus.state));
    assert_eq!(bus.state.borrow().installs, 0);
}

#[test]
fn failed_init_releases_the_driver() {
    let args = si7021::CreateArgs::default().with_i2c(
        si7021_i2c::CreateArgs::default().with_retry_timeout(Duration::ZERO),
    );
    let bus = MockBus::new();
    bus.state.borrow_mut().fail_command = Some(0xFE);

    let (err, returned) = Si7021::create(&args, bus.clone(), RecordingDelay::new()).unwrap_err();
    assert_eq!(err, Error::I2C(ErrorKind::Bus));
    assert!(Rc::ptr_eq(&returned.state, &bus.state));
    let state = bus.state.borrow();
    assert_eq!(state.installs, 1);
    assert_eq!(state.uninstalls, 1);
    // Nothing after the failed reset ran.
    assert_eq!(state.commands(), vec![0xFE]);
}

#[test]
fn at_init_runs_in_order() {
    let at_init = AtInit {
        reset: true,
        heater_level: Some(HeaterLevel::MA_51_69),
        user_register_info: Some(UserRegisterInfo {
            heater_state: HeaterState::Enabled,
            ..Default::default()
        }),
        ..AtInit::none()
    };
    let (_, bus, _) = create(&quiet_args().with_at_init(at_init));
    let state = bus.state.borrow();
    assert_eq!(
        state.writes,
        vec![vec![0xFE], vec![0x51, 0x08], vec![0xE6, 0b0011_1110]]
    );
    assert_eq!(state.heater_reg, 0x08);
}

#[test]
fn user_register_round_trip() {
    let (mut sensor, bus, _) = create(&quiet_args());
    let info = UserRegisterInfo {
        resolution: Resolution::Rh10Temp13,
        heater_state: HeaterState::Enabled,
        vdd_status: VddStatus::Ok,
    };
    sensor.set_user_register_info(&info).unwrap();
    assert_eq!(bus.state.borrow().user_reg, 0b1011_1110);
    assert_eq!(sensor.get_user_register_info().unwrap(), info);
    assert_eq!(sensor.get_user_register().unwrap(), 0b1011_1110);
}

#[test]
fn vdd_status_is_read_back() {
    let (mut sensor, bus, _) = create(&quiet_args());
    bus.state.borrow_mut().user_reg = 0b0111_1010;
    assert_eq!(sensor.get_vdd_status().unwrap(), VddStatus::Low);
}

#[test]
fn derived_setters_read_then_write() {
    let (mut sensor, bus, _) = create(&quiet_args());
    bus.state.borrow_mut().user_reg = 0b0011_1110;

    sensor.set_resolution(Resolution::Rh8Temp12).unwrap();
    {
        let state = bus.state.borrow();
        assert_eq!(state.writes, vec![vec![0xE7], vec![0xE6, 0b0011_1111]]);
    }
    assert_eq!(sensor.get_resolution().unwrap(), Resolution::Rh8Temp12);
    assert_eq!(sensor.get_heater_state().unwrap(), HeaterState::Enabled);

    sensor.set_heater_state(HeaterState::Disabled).unwrap();
    assert_eq!(bus.state.borrow().user_reg, 0b0011_1011);
}

#[test]
fn heater_level_round_trip() {
    let (mut sensor, bus, _) = create(&quiet_args());
    sensor.set_heater_level(HeaterLevel::MA_27_39).unwrap();
    assert_eq!(bus.state.borrow().writes, vec![vec![0x51, 0x04]]);
    assert_eq!(sensor.get_heater_level().unwrap(), HeaterLevel::MA_27_39);

    bus.state.borrow_mut().heater_reg = 0xF3;
    assert_eq!(sensor.get_heater_level().unwrap().bits(), 0x03);
}

#[test]
fn serial_number_and_firmware() {
    let (mut sensor, _, _) = create(&quiet_args());
    let serial = sensor.get_serial_number_info().unwrap();
    assert_eq!(serial.serial_number, 0x0102_0304_1500_0607);
    assert_eq!(serial.id, SerialNumberId::Si7021);
    assert_eq!(
        sensor.get_firmware_revision_info().unwrap(),
        FirmwareVersion::V2_0
    );
}

#[test]
fn corrupted_checksum_is_an_error() {
    let (mut sensor, bus, _) = create(&quiet_args());
    bus.state.borrow_mut().corrupt_crc = true;
    assert!(matches!(sensor.measure_rh(), Err(Error::Crc { .. })));
    assert!(matches!(sensor.measure_temp(), Err(Error::Crc { .. })));
    assert!(matches!(
        sensor.get_serial_number_info(),
        Err(Error::Crc { .. })
    ));
}

#[test]
fn corrupted_serial_number_tail_is_an_error() {
    // Skip the first half so the failure comes from the 3-byte blocks.
    let crc = CrcConfig {
        sna: Some(false),
        ..CrcConfig::default()
    };
    let (mut sensor, bus, _) = create(&quiet_args().with_crc_config(crc));
    bus.state.borrow_mut().corrupt_crc = true;
    assert!(matches!(
        sensor.get_serial_number_info(),
        Err(Error::Crc { .. })
    ));
    assert_eq!(bus.state.borrow().commands(), vec![0xFA, 0xFC]);
}

#[test]
fn disabled_checksum_reads_two_bytes() {
    let (mut sensor, bus, _) = create(&quiet_args().with_crc_config(CrcConfig::all(false)));
    bus.state.borrow_mut().corrupt_crc = true;
    assert_eq!(sensor.measure_rh_code().unwrap(), 0x683A);
    assert_eq!(bus.state.borrow().read_lengths, vec![2]);
}

#[test]
fn crc_override_applies_to_its_command_only() {
    let crc = CrcConfig {
        rh: Some(false),
        ..CrcConfig::default()
    };
    let (mut sensor, bus, _) = create(&quiet_args().with_crc_config(crc));
    bus.state.borrow_mut().corrupt_crc = true;
    assert!(sensor.measure_rh().is_ok());
    assert!(sensor.measure_temp().is_err());

    sensor.set_crc_config(CrcConfig::all(false));
    assert!(sensor.measure_temp().is_ok());
    assert_eq!(sensor.crc_config(), CrcConfig::all(false));
}

#[test]
fn per_command_read_waits_are_used() {
    let (mut sensor, _, delay) = create(&quiet_args());
    sensor.measure_rh_and_temp().unwrap();
    sensor.get_firmware_revision_info().unwrap();
    assert_eq!(delay.recorded(), vec![30_000, 20_000, 10_000]);
}

#[test]
fn zero_wait_skips_the_delay() {
    let (mut sensor, _, delay) = create(&quiet_args().with_read_wait(ReadWait::all(Duration::ZERO)));
    sensor.measure_rh_and_temp().unwrap();
    sensor.get_user_register().unwrap();
    assert!(delay.recorded().is_empty());

    sensor.set_read_wait(ReadWait {
        global: Duration::from_millis(7),
        ..ReadWait::all(Duration::ZERO)
    });
    sensor.get_user_register().unwrap();
    assert_eq!(delay.recorded(), vec![7_000]);
}

#[test]
fn busy_sensor_is_retried() {
    let (mut sensor, bus, _) = create(&quiet_args());
    bus.state.borrow_mut().nack_reads = 3;
    assert_eq!(sensor.measure_rh_code().unwrap(), 0x683A);
    assert_eq!(bus.state.borrow().read_lengths.len(), 4);
}

#[test]
fn zero_retry_timeout_gives_up_at_once() {
    let args = quiet_args()
        .with_i2c(si7021_i2c::CreateArgs::default().with_retry_timeout(Duration::ZERO));
    let (mut sensor, bus, _) = create(&args);
    bus.state.borrow_mut().nack_reads = 1;
    assert_eq!(
        sensor.measure_rh_code(),
        Err(Error::I2C(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)))
    );
    assert_eq!(bus.state.borrow().read_lengths.len(), 1);
}

#[test]
fn sensors_share_one_bus_driver() {
    let mock = MockBus::new();
    let shared = SharedBus::new(mock.clone());
    let args = quiet_args();

    let mut first = Si7021::create(&args, shared.clone_driver(), RecordingDelay::new()).unwrap();
    let second = Si7021::create(&args, shared.clone_driver(), RecordingDelay::new()).unwrap();
    assert_eq!(shared.installed(0), 2);
    {
        let state = mock.state.borrow();
        assert_eq!((state.configures, state.installs), (1, 1));
    }

    first.measure_rh().unwrap();
    let _ = second.delete();
    assert_eq!(mock.state.borrow().uninstalls, 0);
    first.measure_temp().unwrap();
    let _ = first.delete();
    assert_eq!(mock.state.borrow().uninstalls, 1);
}
