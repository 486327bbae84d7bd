//! The host API, imported from `Rainmeter.dll`.

use rmnode_core::{to_utf8, to_wide_nul, BridgeError, Host, HostLog, Severity};
use std::ffi::c_void;
use std::ptr;

const RMG_SKIN: i32 = 1;

#[link(name = "Rainmeter", kind = "raw-dylib")]
extern "system" {
    fn RmReadString(
        rm: *mut c_void,
        option: *const u16,
        def_value: *const u16,
        replace_measures: i32,
    ) -> *const u16;
    fn RmPathToAbsolute(rm: *mut c_void, relative_path: *const u16) -> *const u16;
    fn RmReplaceVariables(rm: *mut c_void, text: *const u16) -> *const u16;
    fn RmExecute(skin: *mut c_void, command: *const u16);
    fn RmGet(rm: *mut c_void, kind: i32) -> *mut c_void;
    fn RmLog(rm: *mut c_void, level: i32, message: *const u16);
}

/// Copy a NUL-terminated wide string owned by the host.
///
/// # Safety
/// `text` must be null or point to a NUL-terminated UTF-16 string.
pub unsafe fn wide_ptr_to_string(text: *const u16) -> String {
    if text.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *text.add(len) != 0 {
        len += 1;
    }
    to_utf8(std::slice::from_raw_parts(text, len))
}

/// The host handles a measure was created with.
pub struct RainmeterHost {
    rm: *mut c_void,
    skin: *mut c_void,
}

impl RainmeterHost {
    /// # Safety
    /// `rm` must be the measure handle the host passed to `Initialize`.
    pub unsafe fn new(rm: *mut c_void) -> Self {
        let skin = if rm.is_null() {
            ptr::null_mut()
        } else {
            RmGet(rm, RMG_SKIN)
        };
        Self { rm, skin }
    }

    /// `Reload` hands the handle over again; keep the latest.
    ///
    /// # Safety
    /// As for [`RainmeterHost::new`].
    pub unsafe fn rebind(&mut self, rm: *mut c_void) {
        if !rm.is_null() && rm != self.rm {
            *self = Self::new(rm);
        }
    }
}

impl HostLog for RainmeterHost {
    fn log(&self, severity: Severity, message: &str) {
        let message = to_wide_nul(message);
        // SAFETY: RmLog accepts a null handle and copies the message.
        unsafe { RmLog(self.rm, severity as i32, message.as_ptr()) }
    }
}

impl Host for RainmeterHost {
    fn read_string(&self, option: &str, default: &str) -> String {
        if self.rm.is_null() {
            return default.to_string();
        }
        let option = to_wide_nul(option);
        let default = to_wide_nul(default);
        // SAFETY: the returned buffer stays valid until the next API call and
        // is copied immediately.
        unsafe {
            wide_ptr_to_string(RmReadString(
                self.rm,
                option.as_ptr(),
                default.as_ptr(),
                0,
            ))
        }
    }

    fn read_path(&self, option: &str, default: &str) -> String {
        if self.rm.is_null() {
            return default.to_string();
        }
        let option = to_wide_nul(option);
        let default = to_wide_nul(default);
        // SAFETY: as in `read_string`; the relative path is copied before the
        // second call overwrites the host buffer.
        unsafe {
            let relative = wide_ptr_to_string(RmReadString(
                self.rm,
                option.as_ptr(),
                default.as_ptr(),
                1,
            ));
            if relative.is_empty() {
                return relative;
            }
            let relative = to_wide_nul(&relative);
            wide_ptr_to_string(RmPathToAbsolute(self.rm, relative.as_ptr()))
        }
    }

    fn replace_variables(&self, input: &str) -> String {
        if self.rm.is_null() {
            return input.to_string();
        }
        let input = to_wide_nul(input);
        // SAFETY: see `read_string`.
        unsafe { wide_ptr_to_string(RmReplaceVariables(self.rm, input.as_ptr())) }
    }

    fn execute(&self, command: &str) -> Result<(), BridgeError> {
        if self.skin.is_null() {
            return Err(BridgeError::NoSkin);
        }
        let command = to_wide_nul(command);
        // SAFETY: the skin handle came from RmGet for this measure.
        unsafe { RmExecute(self.skin, command.as_ptr()) };
        Ok(())
    }
}
