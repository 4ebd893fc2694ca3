use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, Result};

use crate::adc::{AdcSource, SampleError};

pub const IIO_DEVICES_PATH: &str = "/sys/bus/iio/devices";

/// ADC exposed through the industrial I/O subsystem.
#[derive(Debug, Clone)]
pub struct IioAdc {
    device: PathBuf,
}

impl IioAdc {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }

    /// Find the IIO device whose `name` attribute matches.
    pub fn find(name: &str) -> Result<Self> {
        Self::find_in(Path::new(IIO_DEVICES_PATH), name)
    }

    pub fn find_in(root: &Path, name: &str) -> Result<Self> {
        let entries = fs::read_dir(root).map_err(|e| eyre!("cannot list {:?}: {}", root, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(device_name) = fs::read_to_string(path.join("name")) {
                if device_name.trim() == name {
                    return Ok(Self::new(path));
                }
            }
        }
        Err(eyre!("no IIO device named {:?} under {:?}", name, root))
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn channel_path(&self, channel: u32) -> PathBuf {
        self.device.join(format!("in_voltage{}_raw", channel))
    }
}

impl AdcSource for IioAdc {
    fn read(&self, channel: u32) -> Result<i32, SampleError> {
        let raw = fs::read_to_string(self.channel_path(channel)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SampleError::NoSuchChannel(channel)
            } else {
                SampleError::Conversion {
                    channel,
                    reason: e.to_string(),
                }
            }
        })?;

        raw.trim().parse::<i32>().map_err(|e| SampleError::Conversion {
            channel,
            reason: format!("unparsable sample {:?}: {}", raw.trim(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("adcbatt-iio-{}-{}", std::process::id(), tag));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_raw_channel() {
        let dir = scratch_dir("read");
        fs::write(dir.join("in_voltage2_raw"), "3712\n").unwrap();

        let adc = IioAdc::new(&dir);
        assert_eq!(adc.read(2), Ok(3712));
        assert_eq!(adc.read(3), Err(SampleError::NoSuchChannel(3)));
    }

    #[test]
    fn test_garbage_sample_is_conversion_error() {
        let dir = scratch_dir("garbage");
        fs::write(dir.join("in_voltage0_raw"), "n/a").unwrap();

        let adc = IioAdc::new(&dir);
        assert!(matches!(adc.read(0), Err(SampleError::Conversion { channel: 0, .. })));
    }

    #[test]
    fn test_find_by_name() {
        let root = scratch_dir("find");
        let device = root.join("iio:device1");
        fs::create_dir_all(&device).unwrap();
        fs::write(device.join("name"), "s3c-adc\n").unwrap();

        let adc = IioAdc::find_in(&root, "s3c-adc").unwrap();
        assert_eq!(adc.device(), device.as_path());
        assert!(IioAdc::find_in(&root, "other").is_err());
    }
}
