//! FFI bindings for VEGA Monitor
//!
//! This module exposes a replay-driven monitoring session to C callers. Frames
//! and records cross the boundary as JSON. Returned strings are allocated here
//! and must be freed with `vega_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use crate::calibration::CalibrationStore;
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::pipeline::MonitorPipeline;
use crate::replay::{self, ScriptedEmotion, ScriptedLocator};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Convert a C string; `None` for NULL or invalid UTF-8
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Convert to a caller-owned C string
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Config from optional JSON; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<MonitorConfig, MonitorError> {
    if config_json.is_null() {
        return Ok(MonitorConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| MonitorError::ParseError("config is not valid UTF-8".to_string()))?;
    MonitorConfig::from_json(&json)
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a monitoring session
pub struct VegaSessionHandle {
    pipeline: MonitorPipeline<ScriptedLocator, ScriptedEmotion>,
}

/// Create a session.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `vega_session_free`.
/// - Returns NULL on error; call `vega_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vega_session_new(config_json: *const c_char) -> *mut VegaSessionHandle {
    clear_last_error();

    let result = config_from_ptr(config_json).and_then(|config| {
        MonitorPipeline::new(config, ScriptedLocator, ScriptedEmotion::default())
    });

    match result {
        Ok(pipeline) => Box::into_raw(Box::new(VegaSessionHandle { pipeline })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Create a session with a persisted personal calibration.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - `store_dir` and `user_id` must be valid null-terminated C strings.
/// - Returns a pointer that must be freed with `vega_session_free`.
/// - Returns NULL on error; call `vega_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vega_session_new_with_calibration(
    config_json: *const c_char,
    store_dir: *const c_char,
    user_id: *const c_char,
) -> *mut VegaSessionHandle {
    let session = vega_session_new(config_json);
    if session.is_null() {
        return session;
    }

    let (dir, user) = match (cstr_to_string(store_dir), cstr_to_string(user_id)) {
        (Some(dir), Some(user)) => (dir, user),
        _ => {
            vega_session_free(session);
            set_last_error("Invalid store_dir or user_id string pointer");
            return ptr::null_mut();
        }
    };

    let handle = Box::from_raw(session);
    let pipeline = handle
        .pipeline
        .with_calibration(CalibrationStore::new(PathBuf::from(dir)), &user);
    Box::into_raw(Box::new(VegaSessionHandle { pipeline }))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a pointer returned by `vega_session_new*`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vega_session_free(session: *mut VegaSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Process one frame and return its output record as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `vega_session_new*`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `vega_free_string`.
/// - Returns NULL on error; call `vega_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn vega_session_process_frame(
    session: *mut VegaSessionHandle,
    frame_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *session;

    let json = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return ptr::null_mut();
        }
    };

    let result = replay::parse_line(json.trim(), 1)
        .and_then(|frame| handle.pipeline.process_frame(&frame).to_json());
    match result {
        Ok(record) => string_to_cstr(&record),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Process NDJSON frames (or a JSON array) and return a JSON array of records.
///
/// # Safety
/// - `session` must be a valid pointer returned by `vega_session_new*`.
/// - `frames` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `vega_free_string`.
/// - Returns NULL on error; no frame is processed when parsing fails.
#[no_mangle]
pub unsafe extern "C" fn vega_session_process_batch(
    session: *mut VegaSessionHandle,
    frames: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *session;

    let input = match cstr_to_string(frames) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frames string pointer");
            return ptr::null_mut();
        }
    };

    let result = replay::parse_frames(&input).and_then(|frames| {
        let records: Vec<_> = frames
            .iter()
            .map(|frame| handle.pipeline.process_frame(frame))
            .collect();
        Ok(serde_json::to_string(&records)?)
    });
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Restore the session to its starting state.
///
/// # Safety
/// - `session` must be a valid pointer returned by `vega_session_new*`.
/// - Returns 0 on success, -1 on a NULL session.
#[no_mangle]
pub unsafe extern "C" fn vega_session_reset(session: *mut VegaSessionHandle) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    (*session).pipeline.reset();
    0
}

/// Re-read the personal calibration artifact.
///
/// # Safety
/// - `session` must be a valid pointer returned by `vega_session_new*`.
/// - Returns 1 when a personal model is active, 0 when none, -1 on a NULL session.
#[no_mangle]
pub unsafe extern "C" fn vega_session_reload_calibration(session: *mut VegaSessionHandle) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    i32::from((*session).pipeline.reload_calibration())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by VEGA functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a VEGA function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vega_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next VEGA function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn vega_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn vega_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OutputRecord;
    use crate::types::BehaviorState;
    use std::ffi::CString;

    fn still_frame() -> CString {
        CString::new(
            r#"{"frame_width": 640, "frame_height": 480,
                "bbox": {"x": 270, "y": 190, "width": 100, "height": 100},
                "probabilities": {"stressed": 0.05, "focused": 0.2, "confused": 0.05, "calm": 0.7}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        unsafe {
            let session = vega_session_new(ptr::null());
            assert!(!session.is_null());

            let frame = still_frame();
            let mut last = String::new();
            for _ in 0..5 {
                let result = vega_session_process_frame(session, frame.as_ptr());
                assert!(!result.is_null());
                last = CStr::from_ptr(result).to_str().unwrap().to_string();
                vega_free_string(result);
            }
            let record: OutputRecord = serde_json::from_str(&last).unwrap();
            assert_eq!(record.state, BehaviorState::Calm);
            assert!(record.face_detected);

            assert_eq!(vega_session_reset(session), 0);
            assert_eq!(vega_session_reload_calibration(session), 0);
            vega_session_free(session);
        }
    }

    #[test]
    fn test_ffi_batch() {
        unsafe {
            let session = vega_session_new(ptr::null());
            let frames = CString::new(
                "{\"frame_width\": 640, \"frame_height\": 480}\n{\"frame_width\": 640, \"frame_height\": 480}\n",
            )
            .unwrap();
            let result = vega_session_process_batch(session, frames.as_ptr());
            assert!(!result.is_null());

            let records: Vec<OutputRecord> =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(records.len(), 2);
            assert!(records.iter().all(|r| !r.face_detected));

            vega_free_string(result);
            vega_session_free(session);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        unsafe {
            let config = CString::new(r#"{"emotion_stride": 0}"#).unwrap();
            let session = vega_session_new(config.as_ptr());
            assert!(session.is_null());

            let error = CStr::from_ptr(vega_last_error()).to_str().unwrap();
            assert!(error.contains("emotion_stride"));
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let session = vega_session_new(ptr::null());
            let bad = CString::new("not json").unwrap();
            let result = vega_session_process_frame(session, bad.as_ptr());
            assert!(result.is_null());

            let error = vega_last_error();
            assert!(!error.is_null());
            assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());

            assert!(vega_session_process_frame(ptr::null_mut(), bad.as_ptr()).is_null());
            assert_eq!(vega_session_reset(ptr::null_mut()), -1);
            vega_session_free(session);
        }
    }

    #[test]
    fn test_ffi_with_calibration_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store_dir = CString::new(dir.path().to_str().unwrap()).unwrap();
        let user = CString::new("ffi-user").unwrap();
        unsafe {
            let session =
                vega_session_new_with_calibration(ptr::null(), store_dir.as_ptr(), user.as_ptr());
            assert!(!session.is_null());
            assert_eq!(vega_session_reload_calibration(session), 0);
            vega_session_free(session);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = vega_version();
            assert!(!version.is_null());
            assert!(!CStr::from_ptr(version).to_str().unwrap().is_empty());
        }
    }
}
