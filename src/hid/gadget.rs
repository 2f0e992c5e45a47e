//! USB gadget lifecycle
//!
//! [`GadgetHandle`] drives a [`GadgetProvider`] through
//! Uninitialized → Created → Configured → Enabled and back down through
//! Disabled → Removed → Uninitialized. Bring-up stops at the first failing
//! step without rolling back; [`GadgetHandle::teardown`] is the only cleanup
//! path and always attempts every step.

use super::descriptor::CompositeDescriptor;
use super::multiplexer::ReportMultiplexer;
use super::report::REPORT_SIZE;
use crate::config::GadgetConfig;
use crate::error::{Error, GadgetStep, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::PathBuf;

/// Gadget names claimed by live handles in this process
static CLAIMED_NAMES: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

/// USB device identification written into the gadget node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_usb: u16,
    pub bcd_device: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

impl GadgetIdentity {
    /// Miscellaneous device class
    pub const CLASS_MISC: u8 = 0xEF;
    /// Common class subclass
    pub const SUBCLASS_COMMON: u8 = 0x02;
    /// Interface Association Descriptor protocol
    pub const PROTOCOL_IAD: u8 = 0x01;

    pub fn from_config(config: &GadgetConfig) -> Self {
        Self {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            manufacturer: config.manufacturer.clone(),
            product: config.product.clone(),
            serial: config.serial.clone(),
            ..Self::default()
        }
    }
}

impl Default for GadgetIdentity {
    fn default() -> Self {
        // Composite class triple so hosts (Windows in particular) enumerate
        // every joystick behind the one device
        Self {
            vendor_id: 0x1d6b,
            product_id: 0x0104,
            bcd_usb: 0x0200,
            bcd_device: 0x0001,
            device_class: Self::CLASS_MISC,
            device_subclass: Self::SUBCLASS_COMMON,
            device_protocol: Self::PROTOCOL_IAD,
            max_packet_size0: 64,
            manufacturer: "Keystick".to_string(),
            product: "Keyboard Joysticks".to_string(),
            serial: "0123456789".to_string(),
        }
    }
}

/// Attributes of the single HID function
#[derive(Debug, Clone, Copy)]
pub struct HidFunctionSpec<'a> {
    pub descriptor: &'a CompositeDescriptor,
    pub report_length: u16,
    pub protocol: u8,
    pub subclass: u8,
}

/// Gadget-provider capability: one method per lifecycle step.
///
/// Steps report the native diagnostic as an `io::Error`; the handle attaches
/// the step name.
pub trait GadgetProvider: Send {
    /// Write handle of the HID function
    type Endpoint: Write + Send + 'static;

    fn connect(&mut self) -> io::Result<()>;
    fn create_gadget(&mut self, name: &str, identity: &GadgetIdentity) -> io::Result<()>;
    fn create_config(&mut self, label: &str) -> io::Result<()>;
    fn create_hid_function(&mut self, function: &HidFunctionSpec<'_>) -> io::Result<()>;
    fn bind_function(&mut self) -> io::Result<()>;
    /// Attach to a host controller, returning its name
    fn enable(&mut self) -> io::Result<String>;
    fn open_endpoint(&mut self) -> io::Result<(PathBuf, Self::Endpoint)>;
    fn disable(&mut self) -> io::Result<()>;
    /// Remove the gadget with its configuration, functions and strings
    fn remove(&mut self) -> io::Result<()>;
    fn disconnect(&mut self) -> io::Result<()>;
}

/// Lifecycle state of a gadget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GadgetState {
    Uninitialized,
    Created,
    Configured,
    Enabled,
    Disabled,
    Removed,
}

/// Owner of the kernel-resident gadget
pub struct GadgetHandle<P: GadgetProvider> {
    provider: P,
    identity: GadgetIdentity,
    max_devices: usize,
    state: GadgetState,
    connected: bool,
    name: Option<String>,
    descriptor: Option<CompositeDescriptor>,
}

impl<P: GadgetProvider> GadgetHandle<P> {
    pub fn new(provider: P, identity: GadgetIdentity, max_devices: usize) -> Self {
        Self {
            provider,
            identity,
            max_devices,
            state: GadgetState::Uninitialized,
            connected: false,
            name: None,
            descriptor: None,
        }
    }

    pub fn state(&self) -> GadgetState {
        self.state
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The descriptor the HID function was created with
    pub fn descriptor(&self) -> Option<&CompositeDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Bring up a gadget named `name` exposing `devices` joysticks.
    ///
    /// Partially created state is left in place on failure; call
    /// [`teardown`](Self::teardown) afterwards.
    pub fn initialize(&mut self, name: &str, devices: usize) -> Result<()> {
        if self.state != GadgetState::Uninitialized || self.connected {
            return Err(Error::Config(format!(
                "gadget '{}' is already initialized",
                self.name.as_deref().unwrap_or(name)
            )));
        }

        // Fails with a config error before anything exists kernel-side
        let descriptor = CompositeDescriptor::build(devices, self.max_devices)?;
        debug!(
            "built {}-byte report descriptor for {} joystick(s)",
            descriptor.len(),
            devices
        );

        claim_name(name)?;
        self.name = Some(name.to_string());

        self.step(GadgetStep::Connect, |p| p.connect())?;
        self.connected = true;

        let identity = self.identity.clone();
        self.step(GadgetStep::CreateGadget, |p| p.create_gadget(name, &identity))?;
        self.state = GadgetState::Created;

        let label = format!("{}x joystick", devices);
        self.step(GadgetStep::CreateConfig, |p| p.create_config(&label))?;
        self.state = GadgetState::Configured;

        let descriptor = self.descriptor.insert(descriptor);
        let function = HidFunctionSpec {
            descriptor,
            report_length: REPORT_SIZE as u16,
            protocol: 0,
            subclass: 0,
        };
        self.provider
            .create_hid_function(&function)
            .map_err(|e| Error::gadget(GadgetStep::CreateFunction, e))?;
        debug!("gadget step '{}' done", GadgetStep::CreateFunction);

        self.step(GadgetStep::BindFunction, |p| p.bind_function())?;

        let udc = self.step(GadgetStep::Enable, |p| p.enable())?;
        self.state = GadgetState::Enabled;

        info!(
            "gadget '{}' enabled on {} with {} joystick(s)",
            name, udc, devices
        );
        Ok(())
    }

    /// Open the shared report endpoint of an enabled gadget
    pub fn open_endpoint(&mut self) -> Result<ReportMultiplexer<P::Endpoint>> {
        if self.state != GadgetState::Enabled {
            return Err(Error::gadget(
                GadgetStep::OpenEndpoint,
                io::Error::new(
                    io::ErrorKind::NotConnected,
                    format!("gadget is {:?}, not enabled", self.state),
                ),
            ));
        }
        let (path, endpoint) = self.step(GadgetStep::OpenEndpoint, |p| p.open_endpoint())?;
        info!("writing joystick reports to {}", path.display());
        Ok(ReportMultiplexer::new(path, endpoint))
    }

    /// Tear the gadget down: disable, remove, release the provider.
    ///
    /// Every step runs even if an earlier one failed; failures are logged and
    /// returned, never raised. Calling it again afterwards does nothing.
    pub fn teardown(&mut self) -> Vec<Error> {
        if !self.connected && self.state == GadgetState::Uninitialized {
            self.release_name();
            return Vec::new();
        }

        let mut errors = Vec::new();

        if self.state == GadgetState::Enabled {
            match self.provider.disable() {
                Ok(()) => self.state = GadgetState::Disabled,
                Err(e) => errors.push(Error::gadget(GadgetStep::Disable, e)),
            }
        }

        match self.provider.remove() {
            Ok(()) => self.state = GadgetState::Removed,
            Err(e) => errors.push(Error::gadget(GadgetStep::Remove, e)),
        }

        if let Err(e) = self.provider.disconnect() {
            errors.push(Error::gadget(GadgetStep::Disconnect, e));
        }

        for err in &errors {
            warn!("gadget teardown: {}", err);
        }
        info!(
            "gadget '{}' torn down",
            self.name.as_deref().unwrap_or("<unnamed>")
        );

        self.connected = false;
        self.state = GadgetState::Uninitialized;
        self.descriptor = None;
        self.release_name();
        errors
    }

    fn step<T>(
        &mut self,
        step: GadgetStep,
        f: impl FnOnce(&mut P) -> io::Result<T>,
    ) -> Result<T> {
        let value = f(&mut self.provider).map_err(|e| Error::gadget(step, e))?;
        debug!("gadget step '{}' done", step);
        Ok(value)
    }

    fn release_name(&mut self) {
        if let Some(name) = self.name.take() {
            CLAIMED_NAMES.lock().retain(|n| *n != name);
        }
    }
}

impl<P: GadgetProvider> Drop for GadgetHandle<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn claim_name(name: &str) -> Result<()> {
    let mut claimed = CLAIMED_NAMES.lock();
    if claimed.iter().any(|n| n == name) {
        return Err(Error::Config(format!(
            "gadget '{}' is already owned by this process",
            name
        )));
    }
    claimed.push(name.to_string());
    Ok(())
}
