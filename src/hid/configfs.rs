//! Gadget provider backed by the Linux USB gadget configfs tree
//!
//! Layout created under `<configfs>/usb_gadget/<name>`:
//!
//! | Path | Content |
//! |------|---------|
//! | `idVendor`, `idProduct`, `bcdUSB`, ... | device descriptor fields |
//! | `strings/0x409/` | manufacturer, product, serial |
//! | `configs/c.1/` | the only configuration |
//! | `functions/hid.usb0/` | HID function with the composite report descriptor |
//! | `configs/c.1/hid.usb0` | symlink binding the function |
//! | `UDC` | controller the gadget is attached to |

use super::gadget::{GadgetIdentity, GadgetProvider, HidFunctionSpec};
use crate::config::GadgetConfig;
use log::{debug, trace};
use nix::sys::stat::{minor, stat, SFlag};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const LANG_EN_US: &str = "0x409";
const CONFIG_DIR: &str = "configs/c.1";
const FUNCTION_NAME: &str = "hid.usb0";

const ENDPOINT_POLL: Duration = Duration::from_millis(20);

/// configfs-backed [`GadgetProvider`]
pub struct ConfigFsProvider {
    configfs_root: PathBuf,
    udc_class_dir: PathBuf,
    dev_dir: PathBuf,
    udc: Option<String>,
    endpoint_wait: Duration,
    gadget_dir: Option<PathBuf>,
}

impl ConfigFsProvider {
    pub fn new(config: &GadgetConfig) -> Self {
        Self {
            configfs_root: config.configfs_root.clone(),
            udc_class_dir: config.udc_class_dir.clone(),
            dev_dir: config.dev_dir.clone(),
            udc: config.udc.clone(),
            endpoint_wait: config.endpoint_wait(),
            gadget_dir: None,
        }
    }

    /// How long `open_endpoint` waits for the device node
    pub fn endpoint_wait(&self) -> Duration {
        self.endpoint_wait
    }

    /// Gadget directory, once created
    pub fn gadget_dir(&self) -> Option<&Path> {
        self.gadget_dir.as_deref()
    }

    fn gadget_root(&self) -> PathBuf {
        self.configfs_root.join("usb_gadget")
    }

    fn require_gadget(&self) -> io::Result<&Path> {
        self.gadget_dir.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "gadget has not been created")
        })
    }

    /// First available controller, by name
    fn find_udc(&self) -> io::Result<String> {
        let mut names: Vec<String> = fs::read_dir(&self.udc_class_dir)
            .map_err(|e| with_path(&self.udc_class_dir, e))?
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names.into_iter().next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "no USB device controller in {}",
                    self.udc_class_dir.display()
                ),
            )
        })
    }

    /// `/dev/hidgN` of the function, from its `major:minor` attribute
    fn endpoint_path(&self, function_dir: &Path) -> io::Result<(PathBuf, u64)> {
        let dev = read_attr(&function_dir.join("dev"))?;
        let minor = parse_minor(&dev).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed device number '{}'", dev),
            )
        })?;
        Ok((self.dev_dir.join(format!("hidg{}", minor)), minor))
    }
}

impl GadgetProvider for ConfigFsProvider {
    type Endpoint = File;

    fn connect(&mut self) -> io::Result<()> {
        let root = self.gadget_root();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "{} not found; is configfs mounted and the libcomposite module loaded?",
                    root.display()
                ),
            ));
        }
        Ok(())
    }

    fn create_gadget(&mut self, name: &str, identity: &GadgetIdentity) -> io::Result<()> {
        let dir = self.gadget_root().join(name);
        fs::create_dir(&dir).map_err(|e| with_path(&dir, e))?;
        self.gadget_dir = Some(dir.clone());

        write_attr(&dir, "idVendor", hex16(identity.vendor_id))?;
        write_attr(&dir, "idProduct", hex16(identity.product_id))?;
        write_attr(&dir, "bcdUSB", hex16(identity.bcd_usb))?;
        write_attr(&dir, "bcdDevice", hex16(identity.bcd_device))?;
        write_attr(&dir, "bDeviceClass", hex8(identity.device_class))?;
        write_attr(&dir, "bDeviceSubClass", hex8(identity.device_subclass))?;
        write_attr(&dir, "bDeviceProtocol", hex8(identity.device_protocol))?;
        write_attr(&dir, "bMaxPacketSize0", identity.max_packet_size0.to_string())?;

        let strings = dir.join("strings").join(LANG_EN_US);
        make_dir(&strings)?;
        write_attr(&strings, "manufacturer", &identity.manufacturer)?;
        write_attr(&strings, "product", &identity.product)?;
        write_attr(&strings, "serialnumber", &identity.serial)?;
        Ok(())
    }

    fn create_config(&mut self, label: &str) -> io::Result<()> {
        let config = self.require_gadget()?.join(CONFIG_DIR);
        make_dir(&config)?;
        let strings = config.join("strings").join(LANG_EN_US);
        make_dir(&strings)?;
        write_attr(&strings, "configuration", label)
    }

    fn create_hid_function(&mut self, function: &HidFunctionSpec<'_>) -> io::Result<()> {
        let dir = self.require_gadget()?.join("functions").join(FUNCTION_NAME);
        make_dir(&dir)?;
        write_attr(&dir, "protocol", function.protocol.to_string())?;
        write_attr(&dir, "subclass", function.subclass.to_string())?;
        write_attr(&dir, "report_length", function.report_length.to_string())?;
        write_attr(&dir, "report_desc", function.descriptor.as_bytes())
    }

    fn bind_function(&mut self) -> io::Result<()> {
        let gadget = self.require_gadget()?;
        let function = gadget.join("functions").join(FUNCTION_NAME);
        let link = gadget.join(CONFIG_DIR).join(FUNCTION_NAME);
        symlink(&function, &link).map_err(|e| with_path(&link, e))
    }

    fn enable(&mut self) -> io::Result<String> {
        let udc = match &self.udc {
            Some(udc) => udc.clone(),
            None => self.find_udc()?,
        };
        let gadget = self.require_gadget()?;
        write_attr(gadget, "UDC", &udc)?;
        Ok(udc)
    }

    fn open_endpoint(&mut self) -> io::Result<(PathBuf, File)> {
        let function_dir = self.require_gadget()?.join("functions").join(FUNCTION_NAME);
        let (path, expected_minor) = self.endpoint_path(&function_dir)?;

        // udev creates the node asynchronously after the gadget binds
        let deadline = Instant::now() + self.endpoint_wait;
        while !path.exists() && Instant::now() < deadline {
            thread::sleep(ENDPOINT_POLL);
        }

        let st = stat(&path).map_err(|e| with_path(&path, io::Error::from(e)))?;
        let is_char = SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT == SFlag::S_IFCHR;
        if !is_char || minor(st.st_rdev) != expected_minor {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} is not the HID gadget device (expected minor {})",
                    path.display(),
                    expected_minor
                ),
            ));
        }

        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| with_path(&path, e))?;
        Ok((path, file))
    }

    fn disable(&mut self) -> io::Result<()> {
        let gadget = self.require_gadget()?;
        write_attr(gadget, "UDC", "\n")
    }

    fn remove(&mut self) -> io::Result<()> {
        let Some(gadget) = self.gadget_dir.take() else {
            return Ok(());
        };

        // configfs has no recursive delete; children go first
        let config = gadget.join(CONFIG_DIR);
        let entries = [
            config.join(FUNCTION_NAME),
            config.join("strings").join(LANG_EN_US),
            config.clone(),
            gadget.join("functions").join(FUNCTION_NAME),
            gadget.join("strings").join(LANG_EN_US),
            gadget.clone(),
        ];

        let mut first_error = None;
        for entry in &entries {
            if let Err(e) = remove_entry(entry) {
                debug!("failed to remove {}: {}", entry.display(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn disconnect(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// The parent groups (`strings`, `configs`, `functions`) already exist on
// configfs
fn make_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).map_err(|e| with_path(path, e))
}

fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(with_path(path, e)),
    };
    let result = if meta.file_type().is_symlink() {
        fs::remove_file(path)
    } else {
        fs::remove_dir(path)
    };
    result.map_err(|e| with_path(path, e))
}

fn write_attr(dir: &Path, name: &str, value: impl AsRef<[u8]>) -> io::Result<()> {
    let path = dir.join(name);
    trace!("write {}", path.display());
    fs::write(&path, value).map_err(|e| with_path(&path, e))
}

fn read_attr(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| with_path(path, e))
}

// Keeps the error kind, adds the attribute path to the message
fn with_path(path: &Path, e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
}

fn hex16(value: u16) -> String {
    format!("{:#06x}", value)
}

fn hex8(value: u8) -> String {
    format!("{:#04x}", value)
}

fn parse_minor(dev: &str) -> Option<u64> {
    let (major, minor) = dev.trim().split_once(':')?;
    major.parse::<u64>().ok()?;
    minor.parse().ok()
}
