//! Windows LCD video device provider.
//!
//! Talks to the integrated panel through the `\\.\LCD` device using the
//! video brightness IOCTLs, the same interface that backs the
//! `WmiMonitorBrightness` classes.

use crate::error::ProviderError;
use crate::levels::Level;
use crate::provider::{DeviceHandle, DeviceProvider};

use log::{debug, trace};
use std::ffi::c_void;
use windows_sys::Win32::{
    Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, GetLastError, HANDLE, INVALID_HANDLE_VALUE},
    Storage::FileSystem::{
        CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
    },
    System::{
        IO::DeviceIoControl,
        Power::{GetSystemPowerStatus, SYSTEM_POWER_STATUS},
    },
};

/// Default path of the LCD video device.
pub const LCD_DEVICE_PATH: &str = r"\\.\LCD";

// CTL_CODE(FILE_DEVICE_VIDEO, function, METHOD_BUFFERED, FILE_ANY_ACCESS)
const IOCTL_VIDEO_QUERY_SUPPORTED_BRIGHTNESS: u32 = 0x0023_0494;
const IOCTL_VIDEO_QUERY_DISPLAY_BRIGHTNESS: u32 = 0x0023_0498;
const IOCTL_VIDEO_SET_DISPLAY_BRIGHTNESS: u32 = 0x0023_049C;

const DISPLAYPOLICY_AC: u8 = 0x1;
const DISPLAYPOLICY_DC: u8 = 0x2;
const DISPLAYPOLICY_BOTH: u8 = DISPLAYPOLICY_AC | DISPLAYPOLICY_DC;

/// Largest level table the driver can report.
const MAX_LEVELS: usize = 256;

/// `AC_LINE_OFFLINE` in `SYSTEM_POWER_STATUS::ACLineStatus`.
const AC_LINE_OFFLINE: u8 = 0;

/// `DISPLAY_BRIGHTNESS` as laid out by the video miniport.
#[derive(Debug, Clone, Copy)]
struct DisplayBrightness {
    display_policy: u8,
    ac_brightness: u8,
    dc_brightness: u8,
}

// =============================================================================
// LcdProvider
// =============================================================================

/// Brightness provider for the built-in panel on Windows.
///
/// Each probe opens the device afresh; the handle is closed when dropped.
///
/// # Example
///
/// ```no_run
/// use screen_brightness::{BrightnessController, LcdProvider};
///
/// let controller = BrightnessController::new(LcdProvider::new());
/// let (max, supported) = controller.reload();
/// println!("supported={} max={}", supported, max);
/// ```
#[derive(Debug, Clone)]
pub struct LcdProvider {
    path: Vec<u16>,
}

impl LcdProvider {
    /// Create a provider for the default `\\.\LCD` device.
    pub fn new() -> Self {
        Self::with_device_path(LCD_DEVICE_PATH)
    }

    /// Create a provider for a specific video device path.
    pub fn with_device_path(path: &str) -> Self {
        Self {
            path: path.encode_utf16().chain(std::iter::once(0)).collect(),
        }
    }
}

impl Default for LcdProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProvider for LcdProvider {
    type Handle = LcdHandle;

    fn probe(&self) -> Option<LcdHandle> {
        let handle = unsafe {
            CreateFileW(
                self.path.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                std::ptr::null_mut(),
            )
        };

        if handle == INVALID_HANDLE_VALUE || handle.is_null() {
            let code = unsafe { GetLastError() };
            debug!("failed to open LCD device (error code: {})", code);
            return None;
        }

        trace!("opened LCD device");
        Some(LcdHandle { handle })
    }
}

// =============================================================================
// LcdHandle
// =============================================================================

/// An open handle to the LCD video device.
pub struct LcdHandle {
    handle: HANDLE,
}

impl LcdHandle {
    /// Issue a buffered IOCTL and return the number of bytes written to `output`.
    fn ioctl(
        &self,
        request: &'static str,
        code: u32,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, ProviderError> {
        let mut returned = 0u32;
        let ok = unsafe {
            DeviceIoControl(
                self.handle,
                code,
                if input.is_empty() { std::ptr::null() } else { input.as_ptr() as *const c_void },
                input.len() as u32,
                if output.is_empty() { std::ptr::null_mut() } else { output.as_mut_ptr() as *mut c_void },
                output.len() as u32,
                &mut returned,
                std::ptr::null_mut(),
            )
        };

        if ok == 0 {
            let code = unsafe { GetLastError() };
            return Err(ProviderError::Ioctl { request, code });
        }
        Ok(returned as usize)
    }

    fn query_display_brightness(&self) -> Result<DisplayBrightness, ProviderError> {
        const REQUEST: &str = "IOCTL_VIDEO_QUERY_DISPLAY_BRIGHTNESS";

        let mut buffer = [0u8; 3];
        let returned = self.ioctl(REQUEST, IOCTL_VIDEO_QUERY_DISPLAY_BRIGHTNESS, &[], &mut buffer)?;
        if returned < buffer.len() {
            return Err(ProviderError::ShortRead {
                request: REQUEST,
                expected: buffer.len(),
                actual: returned,
            });
        }

        Ok(DisplayBrightness {
            display_policy: buffer[0],
            ac_brightness: buffer[1],
            dc_brightness: buffer[2],
        })
    }
}

impl DeviceHandle for LcdHandle {
    fn read_current(&self) -> Result<Level, ProviderError> {
        let brightness = self.query_display_brightness()?;
        let level = if on_battery() {
            brightness.dc_brightness
        } else {
            brightness.ac_brightness
        };
        trace!("display brightness: {:?} -> {}", brightness, level);
        Ok(level)
    }

    fn read_levels(&self) -> Result<Vec<Level>, ProviderError> {
        let mut buffer = [0u8; MAX_LEVELS];
        let returned = self.ioctl(
            "IOCTL_VIDEO_QUERY_SUPPORTED_BRIGHTNESS",
            IOCTL_VIDEO_QUERY_SUPPORTED_BRIGHTNESS,
            &[],
            &mut buffer,
        )?;
        Ok(buffer[..returned.min(MAX_LEVELS)].to_vec())
    }

    fn write(&self, level: Level) -> Result<(), ProviderError> {
        let brightness = DisplayBrightness {
            display_policy: DISPLAYPOLICY_BOTH,
            ac_brightness: level,
            dc_brightness: level,
        };
        let input = [
            brightness.display_policy,
            brightness.ac_brightness,
            brightness.dc_brightness,
        ];
        self.ioctl(
            "IOCTL_VIDEO_SET_DISPLAY_BRIGHTNESS",
            IOCTL_VIDEO_SET_DISPLAY_BRIGHTNESS,
            &input,
            &mut [],
        )?;
        Ok(())
    }
}

impl Drop for LcdHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

// =============================================================================
// Windows Power Helpers
// =============================================================================

/// Whether the machine is running on battery, in which case the DC value is live.
fn on_battery() -> bool {
    let mut status: SYSTEM_POWER_STATUS = unsafe { std::mem::zeroed() };
    let ok = unsafe { GetSystemPowerStatus(&mut status) };
    ok != 0 && status.ACLineStatus == AC_LINE_OFFLINE
}
