//! Foreign Function Interface for the Keyhook engine
//!
//! C-compatible API for the OS hook host. The host owns each engine handle
//! it creates and calls into it from its event-tap thread only. Reloading
//! from any other thread goes through a `KeyhookRuleset` handle.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use parking_lot::Mutex;

use crate::input::{RawKeyEvent, Transition};
use crate::settings::EngineSettings;
use crate::transform::{Decision, Engine, RulesetHandle};
use crate::window::UNKNOWN_CONTEXT;
use crate::ModifierState;

/// Opaque handle to an engine instance
pub struct KeyhookEngine {
    engine: Engine,
}

/// Thread-safe handle to an engine's ruleset slot.
///
/// May outlive the engine it came from and be used from any thread.
pub struct KeyhookRuleset {
    handle: RulesetHandle,
    settings: EngineSettings,
}

/// One synthetic event handed to the host
#[repr(C)]
#[derive(Debug)]
pub struct FFIKeyEvent {
    /// Key name (UTF-8, null-terminated)
    pub key: *mut c_char,
    /// Platform virtual key code
    pub code: u16,
    /// true = down, false = up
    pub state: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    /// Value for the event's user-data slot
    pub tag: i64,
}

/// Message of the last failed `new`/`reload`. Never touched per event.
static LAST_ERROR: Mutex<Option<String>> = parking_lot::const_mutex(None);

fn set_last_error(message: String) {
    log::error!("{}", message);
    *LAST_ERROR.lock() = Some(message);
}

/// Borrow a C string, or `None` when null or not UTF-8
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Creates an engine from the config file at `config_path`.
///
/// Returns null on failure; `keyhook_last_error` describes why.
#[no_mangle]
pub extern "C" fn keyhook_engine_new(config_path: *const c_char) -> *mut KeyhookEngine {
    let Some(path) = (unsafe { c_str(config_path) }) else {
        set_last_error("config path is null or not UTF-8".to_string());
        return ptr::null_mut();
    };

    match Engine::new(path) {
        Ok(engine) => {
            for warning in engine.warnings() {
                log::warn!("{}", warning);
            }
            Box::into_raw(Box::new(KeyhookEngine { engine }))
        }
        Err(e) => {
            set_last_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Frees an engine instance
#[no_mangle]
pub extern "C" fn keyhook_engine_free(engine: *mut KeyhookEngine) {
    if !engine.is_null() {
        unsafe {
            drop(Box::from_raw(engine));
        }
    }
}

fn write_decision(decision: Decision, out_suppress: *mut bool, out_length: *mut usize) -> *mut FFIKeyEvent {
    if !out_suppress.is_null() {
        unsafe { *out_suppress = decision.suppress };
    }

    let events: Vec<FFIKeyEvent> = decision
        .events
        .iter()
        .map(|synthetic| FFIKeyEvent {
            key: CString::new(synthetic.event.key.name())
                .map(CString::into_raw)
                .unwrap_or(ptr::null_mut()),
            code: synthetic.code,
            state: synthetic.event.state.to_bool(),
            shift: synthetic.event.shift,
            ctrl: synthetic.event.ctrl,
            alt: synthetic.event.alt,
            meta: synthetic.event.meta,
            tag: synthetic.tag,
        })
        .collect();

    let length = events.len();
    if !out_length.is_null() {
        unsafe { *out_length = length };
    }
    if length == 0 {
        return ptr::null_mut();
    }
    // Boxed slice so capacity == length when rebuilt in keyhook_free_key_events
    Box::into_raw(events.into_boxed_slice()) as *mut FFIKeyEvent
}

#[allow(clippy::too_many_arguments)]
fn handle(
    engine: *mut KeyhookEngine,
    key_code: u16,
    transition: Transition,
    mods: ModifierState,
    app_name: *const c_char,
    window_name: *const c_char,
    event_tag: i64,
    out_suppress: *mut bool,
    out_length: *mut usize,
) -> *mut FFIKeyEvent {
    if engine.is_null() {
        return write_decision(Decision::pass(), out_suppress, out_length);
    }
    let handle = unsafe { &mut *engine };
    let app = unsafe { c_str(app_name) }.unwrap_or(UNKNOWN_CONTEXT);
    let window = unsafe { c_str(window_name) }.unwrap_or(UNKNOWN_CONTEXT);
    let raw = RawKeyEvent::new(key_code, transition, mods).with_tag(event_tag);
    let decision = handle.engine.handle_key_event(&raw, app, window);
    write_decision(decision, out_suppress, out_length)
}

/// Decides what to do with a key down/up event.
///
/// Writes the suppression decision to `out_suppress` and the event count to
/// `out_length`. The returned array (null when empty) must be released with
/// `keyhook_free_key_events` exactly once. A null engine passes everything
/// through.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn keyhook_engine_handle_key_event(
    engine: *mut KeyhookEngine,
    key_code: u16,
    down: bool,
    shift: bool,
    ctrl: bool,
    alt: bool,
    meta: bool,
    app_name: *const c_char,
    window_name: *const c_char,
    event_tag: i64,
    out_suppress: *mut bool,
    out_length: *mut usize,
) -> *mut FFIKeyEvent {
    let transition = if down { Transition::Down } else { Transition::Up };
    handle(
        engine,
        key_code,
        transition,
        ModifierState::from_flags(shift, ctrl, alt, meta),
        app_name,
        window_name,
        event_tag,
        out_suppress,
        out_length,
    )
}

/// Same as `keyhook_engine_handle_key_event` for a modifier "flags changed"
/// event. The flags are the ones reported after the change.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn keyhook_engine_handle_flags_changed(
    engine: *mut KeyhookEngine,
    key_code: u16,
    shift: bool,
    ctrl: bool,
    alt: bool,
    meta: bool,
    app_name: *const c_char,
    window_name: *const c_char,
    event_tag: i64,
    out_suppress: *mut bool,
    out_length: *mut usize,
) -> *mut FFIKeyEvent {
    handle(
        engine,
        key_code,
        Transition::FlagsChanged,
        ModifierState::from_flags(shift, ctrl, alt, meta),
        app_name,
        window_name,
        event_tag,
        out_suppress,
        out_length,
    )
}

/// Releases an event array returned by a handle call
#[no_mangle]
pub extern "C" fn keyhook_free_key_events(events: *mut FFIKeyEvent, length: usize) {
    if events.is_null() {
        return;
    }
    unsafe {
        let slice = Box::from_raw(ptr::slice_from_raw_parts_mut(events, length));
        for event in slice.iter() {
            if !event.key.is_null() {
                drop(CString::from_raw(event.key));
            }
        }
    }
}

/// Ruleset handle for reloading off the event-tap thread.
///
/// Returns null for a null engine. Free with `keyhook_ruleset_free`.
#[no_mangle]
pub extern "C" fn keyhook_engine_ruleset_handle(engine: *const KeyhookEngine) -> *mut KeyhookRuleset {
    if engine.is_null() {
        return ptr::null_mut();
    }
    let engine = unsafe { &(*engine).engine };
    Box::into_raw(Box::new(KeyhookRuleset {
        handle: engine.ruleset_handle(),
        settings: engine.settings().clone(),
    }))
}

/// Loads `config_path` on the calling thread and publishes its rules to the
/// engine. On failure the old rules stay active and `keyhook_last_error`
/// describes why.
#[no_mangle]
pub extern "C" fn keyhook_ruleset_reload(ruleset: *const KeyhookRuleset, config_path: *const c_char) -> bool {
    if ruleset.is_null() {
        set_last_error("ruleset handle is null".to_string());
        return false;
    }
    let Some(path) = (unsafe { c_str(config_path) }) else {
        set_last_error("config path is null or not UTF-8".to_string());
        return false;
    };
    let ruleset = unsafe { &*ruleset };
    match ruleset.handle.reload(path, &ruleset.settings) {
        Ok(warnings) => {
            for warning in &warnings {
                log::warn!("{}", warning);
            }
            true
        }
        Err(e) => {
            set_last_error(e.to_string());
            false
        }
    }
}

/// Frees a ruleset handle
#[no_mangle]
pub extern "C" fn keyhook_ruleset_free(ruleset: *mut KeyhookRuleset) {
    if !ruleset.is_null() {
        unsafe {
            drop(Box::from_raw(ruleset));
        }
    }
}

/// Reloads rules from `config_path` on the event-tap thread. On failure
/// the old rules stay active. Use `keyhook_ruleset_reload` from other
/// threads.
#[no_mangle]
pub extern "C" fn keyhook_engine_reload(engine: *mut KeyhookEngine, config_path: *const c_char) -> bool {
    if engine.is_null() {
        set_last_error("engine handle is null".to_string());
        return false;
    }
    let Some(path) = (unsafe { c_str(config_path) }) else {
        set_last_error("config path is null or not UTF-8".to_string());
        return false;
    };
    let handle = unsafe { &*engine };
    match handle.engine.reload(path) {
        Ok(warnings) => {
            for warning in &warnings {
                log::warn!("{}", warning);
            }
            true
        }
        Err(e) => {
            set_last_error(e.to_string());
            false
        }
    }
}

/// Resets held modifier state
#[no_mangle]
pub extern "C" fn keyhook_engine_reset(engine: *mut KeyhookEngine) {
    if !engine.is_null() {
        unsafe { (*engine).engine.reset() };
    }
}

/// Sentinel the host must write into injected events' user-data slot
#[no_mangle]
pub extern "C" fn keyhook_engine_sentinel_tag(engine: *const KeyhookEngine) -> i64 {
    if engine.is_null() {
        return 0;
    }
    unsafe { (*engine).engine.sentinel_tag() }
}

/// Copy of the last error message, or null. Free with `keyhook_free_string`.
#[no_mangle]
pub extern "C" fn keyhook_last_error() -> *mut c_char {
    match LAST_ERROR.lock().as_deref() {
        Some(message) => CString::new(message).map(CString::into_raw).unwrap_or(ptr::null_mut()),
        None => ptr::null_mut(),
    }
}

/// Frees a string returned by this library
#[no_mangle]
pub extern "C" fn keyhook_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}
