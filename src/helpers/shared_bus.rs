use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::si7021_i2c::{Bus, BusConfig, BusMode, I2cPort};

struct State<B> {
    bus: B,
    installs: HashMap<I2cPort, usize>,
}

/// One physical bus shared by several sensor handles.
///
/// The bus is locked for each primitive and, through [`Bus::exclusive`], for a
/// whole command: a handle's write, settle delay and read never interleave
/// with another handle's transactions. Driver install and uninstall are
/// counted per port: the first install of a port reaches the bus, and so does
/// the last uninstall.
pub struct SharedBus<B> {
    state: Arc<Mutex<State<B>>>,
}

impl<B: Bus> SharedBus<B> {
    pub fn new(bus: B) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                bus,
                installs: HashMap::new(),
            })),
        }
    }

    pub fn clone_driver(&self) -> SharedBusInstance<B> {
        SharedBusInstance {
            state: self.state.clone(),
            installed: HashSet::new(),
        }
    }

    /// Number of live installs on `port`.
    pub fn installed(&self, port: I2cPort) -> usize {
        lock(&self.state).installs.get(&port).copied().unwrap_or(0)
    }
}

fn lock<B>(state: &Mutex<State<B>>) -> MutexGuard<'_, State<B>> {
    // A panic in another handle leaves the bus itself usable.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B> fmt::Debug for SharedBus<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBus").finish_non_exhaustive()
    }
}

/// Handle onto a [`SharedBus`], one per sensor.
pub struct SharedBusInstance<B> {
    state: Arc<Mutex<State<B>>>,
    installed: HashSet<I2cPort>,
}

impl<B> fmt::Debug for SharedBusInstance<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBusInstance")
            .field("installed", &self.installed)
            .finish_non_exhaustive()
    }
}

impl<B: Bus> Bus for SharedBusInstance<B> {
    type Error = B::Error;

    fn configure(&mut self, port: I2cPort, config: &BusConfig) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        if state.installs.get(&port).copied().unwrap_or(0) > 0 {
            debug!("I2C port {port} already installed, keeping its configuration");
            return Ok(());
        }
        state.bus.configure(port, config)
    }

    fn install(&mut self, port: I2cPort, mode: BusMode) -> Result<(), Self::Error> {
        if self.installed.contains(&port) {
            return Ok(());
        }
        let mut state = lock(&self.state);
        let count = state.installs.get(&port).copied().unwrap_or(0);
        if count == 0 {
            state.bus.install(port, mode)?;
        } else {
            debug!("I2C port {port} already installed, {count} user(s)");
        }
        state.installs.insert(port, count + 1);
        self.installed.insert(port);
        Ok(())
    }

    fn uninstall(&mut self, port: I2cPort) -> Result<(), Self::Error> {
        if !self.installed.remove(&port) {
            return Ok(());
        }
        let mut state = lock(&self.state);
        let count = state.installs.remove(&port).unwrap_or(1) - 1;
        if count > 0 {
            debug!("I2C port {port} still used by {count} handle(s)");
            state.installs.insert(port, count);
            return Ok(());
        }
        state.bus.uninstall(port)
    }

    fn write(&mut self, port: I2cPort, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        lock(&self.state).bus.write(port, address, bytes)
    }

    fn read(&mut self, port: I2cPort, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        lock(&self.state).bus.read(port, address, buffer)
    }

    fn exclusive<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut dyn Bus<Error = Self::Error>) -> R,
    {
        let mut state = lock(&self.state);
        f(&mut state.bus)
    }
}
