//! Global hotkeys through the Carbon Event Manager.
//!
//! `RegisterEventHotKey` tags each registration with an [`EventHotKeyID`];
//! the id half carries the [`BindingId`], which is all the handler reports.

#![allow(non_snake_case)]

use std::ffi::c_void;
use std::ptr;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::sys::hotkey::{BindingId, HotkeyCenter, HotkeyError, HotkeySink, NativeHotkey};
use crate::sys::keycode::{KeyCode, ModifierMask};

type OSStatus = i32;
type EventTargetRef = *mut c_void;
type EventHandlerRef = *mut c_void;
type EventHandlerCallRef = *mut c_void;
type EventRef = *mut c_void;
type EventHotKeyRef = *mut c_void;
type EventHandlerUPP = extern "C" fn(EventHandlerCallRef, EventRef, *mut c_void) -> OSStatus;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct EventHotKeyID {
    signature: u32,
    id: u32,
}

#[repr(C)]
struct EventTypeSpec {
    event_class: u32,
    event_kind: u32,
}

const NO_ERR: OSStatus = 0;
/// 'keyb'
const K_EVENT_CLASS_KEYBOARD: u32 = 0x6B65_7962;
const K_EVENT_HOTKEY_PRESSED: u32 = 5;
/// '----'
const K_EVENT_PARAM_DIRECT_OBJECT: u32 = 0x2D2D_2D2D;
/// 'hkid'
const TYPE_EVENT_HOTKEY_ID: u32 = 0x686B_6964;
/// 'STRK'
const SIGNATURE: u32 = 0x5354_524B;

#[link(name = "Carbon", kind = "framework")]
unsafe extern "C" {
    fn GetEventDispatcherTarget() -> EventTargetRef;

    fn InstallEventHandler(
        inTarget: EventTargetRef,
        inHandler: EventHandlerUPP,
        inNumTypes: usize,
        inList: *const EventTypeSpec,
        inUserData: *mut c_void,
        outRef: *mut EventHandlerRef,
    ) -> OSStatus;

    fn RegisterEventHotKey(
        inHotKeyCode: u32,
        inHotKeyModifiers: u32,
        inHotKeyID: EventHotKeyID,
        inTarget: EventTargetRef,
        inOptions: u32,
        outRef: *mut EventHotKeyRef,
    ) -> OSStatus;

    fn UnregisterEventHotKey(inHotKey: EventHotKeyRef) -> OSStatus;

    fn GetEventParameter(
        inEvent: EventRef,
        inName: u32,
        inDesiredType: u32,
        outActualType: *mut u32,
        inBufferSize: usize,
        outActualSize: *mut usize,
        outData: *mut c_void,
    ) -> OSStatus;
}

/// Set once, by the first successful subscription.
static SINK: OnceCell<HotkeySink> = OnceCell::new();

extern "C" fn hotkey_pressed(_: EventHandlerCallRef, event: EventRef, _: *mut c_void) -> OSStatus {
    let mut hotkey = EventHotKeyID::default();
    // SAFETY: the buffer is a live EventHotKeyID of the requested size.
    let status = unsafe {
        GetEventParameter(
            event,
            K_EVENT_PARAM_DIRECT_OBJECT,
            TYPE_EVENT_HOTKEY_ID,
            ptr::null_mut(),
            size_of::<EventHotKeyID>(),
            ptr::null_mut(),
            (&raw mut hotkey).cast(),
        )
    };
    if status != NO_ERR || hotkey.signature != SIGNATURE {
        return status;
    }
    let id = BindingId::new(hotkey.id);
    trace!(%id, "Hotkey pressed");
    if let Some(sink) = SINK.get() {
        sink(id);
    }
    NO_ERR
}

#[derive(Debug, Default)]
pub struct CarbonHotkeys;

impl HotkeyCenter for CarbonHotkeys {
    fn subscribe(&self, sink: HotkeySink) -> Result<(), HotkeyError> {
        SINK.set(sink).map_err(|_| HotkeyError::AlreadySubscribed)?;
        let spec = EventTypeSpec {
            event_class: K_EVENT_CLASS_KEYBOARD,
            event_kind: K_EVENT_HOTKEY_PRESSED,
        };
        let mut handler: EventHandlerRef = ptr::null_mut();
        // SAFETY: `hotkey_pressed` is a plain function valid for the process
        // lifetime and `spec` outlives the call.
        let status = unsafe {
            InstallEventHandler(
                GetEventDispatcherTarget(),
                hotkey_pressed,
                1,
                &spec,
                ptr::null_mut(),
                &mut handler,
            )
        };
        if status != NO_ERR {
            return Err(HotkeyError::Subscribe(status));
        }
        debug!("Carbon hotkey handler installed");
        Ok(())
    }

    fn register(
        &self,
        key: KeyCode,
        modifiers: ModifierMask,
        id: BindingId,
    ) -> Result<NativeHotkey, HotkeyError> {
        let hotkey_id = EventHotKeyID { signature: SIGNATURE, id: id.as_u32() };
        let mut hotkey: EventHotKeyRef = ptr::null_mut();
        // SAFETY: plain value arguments plus a valid out pointer.
        let status = unsafe {
            RegisterEventHotKey(
                key.0,
                modifiers.bits(),
                hotkey_id,
                GetEventDispatcherTarget(),
                0,
                &mut hotkey,
            )
        };
        if status != NO_ERR || hotkey.is_null() {
            return Err(HotkeyError::Register { key, mods: modifiers.bits(), status });
        }
        Ok(NativeHotkey::from_raw(hotkey as usize))
    }

    fn unregister(&self, hotkey: NativeHotkey) -> Result<(), HotkeyError> {
        // SAFETY: the handle came from `register` and is unregistered once.
        let status = unsafe { UnregisterEventHotKey(hotkey.into_raw() as EventHotKeyRef) };
        if status != NO_ERR {
            return Err(HotkeyError::Unregister(status));
        }
        Ok(())
    }
}
