#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use si7021_rs::si7021_i2c::crc::crc8_with_init;
use si7021_rs::si7021_i2c::{Bus, BusConfig, BusMode, I2cPort, DEVICE_ADDRESS};

/// What the simulated sensor holds and what the tests observed.
#[derive(Debug)]
pub struct State {
    pub user_reg: u8,
    pub heater_reg: u8,
    pub rh_code: u16,
    pub temp_code: u16,
    pub sna: [u8; 4],
    pub snb: [u8; 4],
    pub firmware: u8,

    pub writes: Vec<Vec<u8>>,
    pub read_lengths: Vec<usize>,
    pub configures: usize,
    pub installs: usize,
    pub uninstalls: usize,

    /// Number of upcoming reads answered with a NACK.
    pub nack_reads: usize,
    /// Flip the checksum byte of every answer.
    pub corrupt_crc: bool,
    /// Writes starting with this command fail with a bus error.
    pub fail_command: Option<u8>,

    last_command: Vec<u8>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            user_reg: 0b0011_1010,
            heater_reg: 0,
            rh_code: 0x683A,
            temp_code: 0x6680,
            sna: [0x01, 0x02, 0x03, 0x04],
            snb: [0x15, 0x00, 0x06, 0x07],
            firmware: 0x20,
            writes: Vec::new(),
            read_lengths: Vec::new(),
            configures: 0,
            installs: 0,
            uninstalls: 0,
            nack_reads: 0,
            corrupt_crc: false,
            fail_command: None,
            last_command: Vec::new(),
        }
    }
}

impl State {
    pub fn commands(&self) -> Vec<u8> {
        self.writes.iter().map(|w| w[0]).collect()
    }

    fn with_crc(&self, data: [u8; 2]) -> Vec<u8> {
        let mut answer = data.to_vec();
        answer.push(crc8_with_init(&data, 0));
        answer
    }

    fn answer(&self) -> Vec<u8> {
        match self.last_command.as_slice() {
            [0xE5, ..] | [0xF5, ..] => self.with_crc(self.rh_code.to_be_bytes()),
            [0xE3, ..] | [0xF3, ..] => self.with_crc(self.temp_code.to_be_bytes()),
            [0xE0, ..] => self.temp_code.to_be_bytes().to_vec(),
            [0xE7, ..] => vec![self.user_reg],
            [0x11, ..] => vec![self.heater_reg],
            [0xFA, 0x0F] => {
                let mut answer = Vec::new();
                let mut crc = 0;
                for byte in self.sna {
                    crc = crc8_with_init(&[byte], crc);
                    answer.extend([byte, crc]);
                }
                answer
            }
            [0xFC, 0xC9] => {
                let first = crc8_with_init(&self.snb[..2], 0);
                let second = crc8_with_init(&self.snb[2..], first);
                vec![self.snb[0], self.snb[1], first, self.snb[2], self.snb[3], second]
            }
            [0x84, 0xB8] => vec![self.firmware],
            _ => Vec::new(),
        }
    }
}

/// Simulated Si7021 behind the [`Bus`] seam.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    pub state: Rc<RefCell<State>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Bus for MockBus {
    type Error = ErrorKind;

    fn configure(&mut self, _port: I2cPort, _config: &BusConfig) -> Result<(), ErrorKind> {
        self.state.borrow_mut().configures += 1;
        Ok(())
    }

    fn install(&mut self, _port: I2cPort, _mode: BusMode) -> Result<(), ErrorKind> {
        self.state.borrow_mut().installs += 1;
        Ok(())
    }

    fn uninstall(&mut self, _port: I2cPort) -> Result<(), ErrorKind> {
        self.state.borrow_mut().uninstalls += 1;
        Ok(())
    }

    fn write(&mut self, _port: I2cPort, address: u8, bytes: &[u8]) -> Result<(), ErrorKind> {
        assert_eq!(address, DEVICE_ADDRESS);
        let mut state = self.state.borrow_mut();
        state.writes.push(bytes.to_vec());
        if state.fail_command.is_some() && state.fail_command == bytes.first().copied() {
            return Err(ErrorKind::Bus);
        }
        match *bytes {
            [0xFE] => {
                state.user_reg = 0b0011_1010;
                state.heater_reg = 0;
            }
            [0xE6, value] => state.user_reg = value,
            [0x51, value] => state.heater_reg = value,
            _ => {}
        }
        state.last_command = bytes.to_vec();
        Ok(())
    }

    fn read(&mut self, _port: I2cPort, address: u8, buffer: &mut [u8]) -> Result<(), ErrorKind> {
        assert_eq!(address, DEVICE_ADDRESS);
        let mut state = self.state.borrow_mut();
        state.read_lengths.push(buffer.len());
        if state.nack_reads > 0 {
            state.nack_reads -= 1;
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        let mut answer = state.answer();
        if state.corrupt_crc {
            if let Some(last) = answer.last_mut() {
                *last ^= 0xFF;
            }
        }
        let len = buffer.len().min(answer.len());
        buffer[..len].copy_from_slice(&answer[..len]);
        Ok(())
    }
}

/// Records every requested delay in microseconds.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    pub delays_us: Rc<RefCell<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<u32> {
        self.delays_us.borrow().clone()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_us.borrow_mut().push(ns / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        self.delays_us.borrow_mut().push(us);
    }
}
