//! The exports the host resolves by name when it loads `NodeJS.dll`.
//!
//! Every export catches panics and degrades to its neutral value; strings
//! handed back to the host live in per-measure buffers until the next call.

use crate::measure::Measure;
use crate::rainmeter::{wide_ptr_to_string, RainmeterHost};
use crate::runtime;
use rmnode_core::to_wide_nul;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

struct PluginInstance {
    measure: Measure<RainmeterHost>,
    string_buffer: Vec<u16>,
    execute_buffer: Vec<u16>,
}

static EMPTY: [u16; 1] = [0];

fn guarded<T>(neutral: T, body: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!("panic caught at the plugin boundary");
            neutral
        }
    }
}

/// # Safety
/// `data` must be null or a pointer produced by [`Initialize`] that has not
/// been passed to [`Finalize`].
unsafe fn instance<'a>(data: *mut c_void) -> Option<&'a mut PluginInstance> {
    data.cast::<PluginInstance>().as_mut()
}

/// # Safety
/// Called by the host with a writable `data` slot and its measure handle.
#[no_mangle]
pub unsafe extern "C" fn Initialize(data: *mut *mut c_void, rm: *mut c_void) {
    guarded((), || {
        if data.is_null() {
            return;
        }
        let config = runtime::config();
        let host = RainmeterHost::new(rm);
        let instance = Box::new(PluginInstance {
            measure: Measure::initialize(host, config.runner),
            string_buffer: EMPTY.to_vec(),
            execute_buffer: EMPTY.to_vec(),
        });
        *data = Box::into_raw(instance).cast();
    })
}

/// # Safety
/// `data` comes from [`Initialize`].
#[no_mangle]
pub unsafe extern "C" fn Reload(data: *mut c_void, rm: *mut c_void, _max_value: *mut f64) {
    guarded((), || {
        if let Some(instance) = instance(data) {
            instance.measure.host_mut().rebind(rm);
            instance.measure.reload();
        }
    })
}

/// # Safety
/// `data` comes from [`Initialize`].
#[no_mangle]
pub unsafe extern "C" fn Update(data: *mut c_void) -> f64 {
    guarded(0.0, || match instance(data) {
        Some(instance) => instance.measure.update(),
        None => 0.0,
    })
}

/// # Safety
/// `data` comes from [`Initialize`].
#[no_mangle]
pub unsafe extern "C" fn GetString(data: *mut c_void) -> *const u16 {
    guarded(EMPTY.as_ptr(), || match instance(data) {
        Some(instance) => {
            instance.string_buffer = to_wide_nul(instance.measure.get_string());
            instance.string_buffer.as_ptr()
        }
        None => EMPTY.as_ptr(),
    })
}

/// # Safety
/// `data` comes from [`Initialize`]; `argv` holds `argc` wide strings.
#[no_mangle]
pub unsafe extern "C" fn Execute(
    data: *mut c_void,
    argc: i32,
    argv: *const *const u16,
) -> *const u16 {
    guarded(EMPTY.as_ptr(), || {
        let Some(instance) = instance(data) else {
            return EMPTY.as_ptr();
        };
        let count = usize::try_from(argc).unwrap_or(0);
        let args: Vec<String> = if argv.is_null() {
            Vec::new()
        } else {
            (0..count).map(|i| wide_ptr_to_string(*argv.add(i))).collect()
        };
        let result = instance.measure.execute(&args);
        instance.execute_buffer = to_wide_nul(&result);
        instance.execute_buffer.as_ptr()
    })
}

/// # Safety
/// `data` comes from [`Initialize`]; `args` is null or a wide string.
#[no_mangle]
pub unsafe extern "C" fn ExecuteBang(data: *mut c_void, args: *const u16) {
    guarded((), || {
        if let Some(instance) = instance(data) {
            instance.measure.execute_bang(&wide_ptr_to_string(args));
        }
    })
}

/// # Safety
/// `data` comes from [`Initialize`] and is not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn Finalize(data: *mut c_void) {
    guarded((), || {
        if data.is_null() {
            return;
        }
        let mut instance = Box::from_raw(data.cast::<PluginInstance>());
        instance.measure.finalize();
    })
}
