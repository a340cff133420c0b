//! I2C controller discovery and opening via i2c-dev

use linux_embedded_hal::I2cdev;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bus::{BusError, BusHandle, BusSpeed};

pub const SYSFS_I2C_DEV: &str = "/sys/class/i2c-dev";
pub const DEV_ROOT: &str = "/dev";

/// One enumerated bus controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cController {
    /// Bus number N of `i2c-N`
    pub bus: u32,
    /// Node name, e.g. `i2c-1`
    pub node: String,
    /// Adapter description reported by the kernel
    pub adapter: String,
    pub path: PathBuf,
}

impl I2cController {
    /// Exact adapter description, or the node name ignoring case and `-`/`_`
    pub fn matches(&self, selector: &str) -> bool {
        self.adapter == selector || normalize(&self.node) == normalize(selector)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// List controllers under `sysfs_root`, ordered by bus number
pub fn enumerate_controllers(sysfs_root: &Path, dev_root: &Path) -> Vec<I2cController> {
    let entries = match fs::read_dir(sysfs_root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list I2C controllers in {:?}: {}", sysfs_root, e);
            return Vec::new();
        }
    };

    let mut controllers: Vec<I2cController> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let node = entry.file_name().to_string_lossy().into_owned();
            let bus = node.strip_prefix("i2c-")?.parse::<u32>().ok()?;
            let adapter = fs::read_to_string(entry.path().join("name"))
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            Some(I2cController {
                bus,
                path: dev_root.join(&node),
                node,
                adapter,
            })
        })
        .collect();

    controllers.sort_by_key(|c| c.bus);
    controllers
}

/// First controller matching `selector`
pub fn find_controller(
    selector: &str,
    sysfs_root: &Path,
    dev_root: &Path,
) -> Result<I2cController, BusError> {
    enumerate_controllers(sysfs_root, dev_root)
        .into_iter()
        .find(|c| c.matches(selector))
        .ok_or_else(|| BusError::NotFound(selector.to_string()))
}

/// Open the device at `address` on the first controller matching `selector`
pub fn open(
    selector: &str,
    address: u8,
    speed: BusSpeed,
) -> Result<BusHandle<I2cdev>, BusError> {
    if address > 0x7F {
        return Err(BusError::OpenFailed(format!(
            "0x{:02X} is not a 7-bit address",
            address
        )));
    }

    let controller = find_controller(selector, Path::new(SYSFS_I2C_DEV), Path::new(DEV_ROOT))?;
    let device = I2cdev::new(&controller.path)
        .map_err(|e| BusError::OpenFailed(format!("{}: {}", controller.path.display(), e)))?;

    // i2c-dev has no per-device clock control; the bus rate comes from the device tree
    tracing::info!(
        "Opened {} ({}) for device 0x{:02X}, requested speed {}",
        controller.node,
        controller.adapter,
        address,
        speed
    );
    Ok(BusHandle::new(device, address, speed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    /// Fake `/sys/class/i2c-dev` tree
    struct FakeSysfs {
        root: PathBuf,
    }

    impl FakeSysfs {
        fn new(adapters: &[(&str, &str)]) -> Self {
            let root = std::env::temp_dir().join(format!(
                "tmp102-telemetry-sysfs-{}-{}",
                std::process::id(),
                NEXT.fetch_add(1, Ordering::SeqCst)
            ));
            fs::create_dir_all(&root).unwrap();
            for (node, adapter) in adapters {
                let dir = root.join(node);
                fs::create_dir_all(&dir).unwrap();
                fs::write(dir.join("name"), format!("{}\n", adapter)).unwrap();
            }
            Self { root }
        }
    }

    impl Drop for FakeSysfs {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn test_enumerate_sorted_by_bus() {
        let sysfs = FakeSysfs::new(&[
            ("i2c-20", "fef09500.i2c"),
            ("i2c-1", "bcm2835 (i2c@7e804000)"),
            ("i2c-3", "i2c-gpio"),
            ("not-a-bus", "ignored"),
        ]);

        let controllers = enumerate_controllers(&sysfs.root, Path::new("/dev"));

        let nodes: Vec<&str> = controllers.iter().map(|c| c.node.as_str()).collect();
        assert_eq!(nodes, vec!["i2c-1", "i2c-3", "i2c-20"]);
        assert_eq!(controllers[0].adapter, "bcm2835 (i2c@7e804000)");
        assert_eq!(controllers[0].path, PathBuf::from("/dev/i2c-1"));
    }

    #[test]
    fn test_logical_name_selects_node() {
        let sysfs = FakeSysfs::new(&[("i2c-0", "bcm2835 (i2c@7e205000)"), ("i2c-1", "bcm2835 (i2c@7e804000)")]);

        let found = find_controller("I2C1", &sysfs.root, Path::new("/dev")).unwrap();
        assert_eq!(found.bus, 1);

        let found = find_controller("i2c_0", &sysfs.root, Path::new("/dev")).unwrap();
        assert_eq!(found.bus, 0);
    }

    #[test]
    fn test_adapter_name_first_match_wins() {
        let sysfs = FakeSysfs::new(&[("i2c-4", "i2c-gpio"), ("i2c-2", "i2c-gpio")]);

        let found = find_controller("i2c-gpio", &sysfs.root, Path::new("/dev")).unwrap();
        assert_eq!(found.bus, 2);
    }

    #[test]
    fn test_no_match_is_not_found() {
        let sysfs = FakeSysfs::new(&[("i2c-1", "bcm2835 (i2c@7e804000)")]);

        assert_eq!(
            find_controller("I2C5", &sysfs.root, Path::new("/dev")),
            Err(BusError::NotFound("I2C5".into()))
        );
    }

    #[test]
    fn test_missing_sysfs_is_not_found() {
        let missing = std::env::temp_dir().join("tmp102-telemetry-no-such-sysfs");
        assert!(enumerate_controllers(&missing, Path::new("/dev")).is_empty());
        assert!(matches!(
            find_controller("I2C1", &missing, Path::new("/dev")),
            Err(BusError::NotFound(_))
        ));
    }

    #[test]
    fn test_wide_address_rejected() {
        assert!(matches!(
            open("I2C1", 0x90, BusSpeed::Fast),
            Err(BusError::OpenFailed(_))
        ));
    }
}
