//! Input device enumeration via cpal.
//!
//! cpal has no stable device identifiers, so the device name doubles as its ID.

use cpal::traits::{DeviceTrait, HostTrait};

use wav_capture_core::models::audio_models::AudioSource;
use wav_capture_core::models::error::CaptureError;

/// Audio device enumerator over the platform's default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input (microphone) devices.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_input_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::Unknown(format!("failed to list input devices: {}", e)))?;

        let sources = devices
            .filter_map(|device| device.name().ok())
            .map(|name| AudioSource {
                is_default: default_name.as_deref() == Some(name.as_str()),
                id: name.clone(),
                name,
            })
            .collect();
        Ok(sources)
    }

    /// Name of the system default input device, if there is one.
    pub fn default_input_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Resolve `device_id` (a device name) or the default input device.
    pub fn find_input_device(&self, device_id: Option<&str>) -> Option<cpal::Device> {
        match device_id {
            Some(id) => self
                .host
                .input_devices()
                .ok()?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false)),
            None => self.host.default_input_device(),
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
