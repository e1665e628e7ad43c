//! Spaces and screens through the private SkyLight (CGS) calls that
//! CoreGraphics re-exports.

#![allow(non_snake_case)]

use std::ffi::c_void;
use std::ptr::NonNull;

use objc2_app_kit::NSScreen;
use objc2_core_foundation::{
    CFArray, CFArrayGetCount, CFArrayGetValueAtIndex, CFDictionary, CFDictionaryGetValue,
    CFNumber, CFRetained, CFString, CFType, CFUUID, ConcreteType,
};
use objc2_core_graphics::{
    CGDirectDisplayID, CGDisplayBounds, CGError, CGGetActiveDisplayList, CGMainDisplayID,
};
use objc2_foundation::MainThreadMarker;
use tracing::{trace, warn};

use crate::sys::window_server::{
    DisplaySpaces, Frame, ScreenInfo, SpaceId, SpaceType, WindowServer, WindowServerId,
};

type CGSConnectionID = i32;
type CGSSpaceID = u64;

/// Current, other and visible spaces.
const ALL_SPACES_MASK: i32 = 7;
const MAX_DISPLAYS: u32 = 32;

const DISPLAY_IDENTIFIER: &str = "Display Identifier";
const SPACES: &str = "Spaces";
const MANAGED_SPACE_ID: &str = "ManagedSpaceID";

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGSMainConnectionID() -> CGSConnectionID;
    fn CGSGetActiveSpace(cid: CGSConnectionID) -> CGSSpaceID;
    fn CGSCopyManagedDisplaySpaces(cid: CGSConnectionID) -> *mut CFArray;
    fn CGSManagedDisplayGetCurrentSpace(cid: CGSConnectionID, display: &CFString) -> CGSSpaceID;
    fn CGSCopySpacesForWindows(
        cid: CGSConnectionID,
        mask: i32,
        windows: &CFArray<CFNumber>,
    ) -> *mut CFArray;
    fn CGSSpaceGetType(cid: CGSConnectionID, space: CGSSpaceID) -> i32;
    fn CGDisplayCreateUUIDFromDisplayID(display: CGDirectDisplayID) -> *mut CFUUID;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFUUIDCreateString(alloc: *const c_void, uuid: &CFUUID) -> *mut CFString;
}

/// Takes ownership of a +1 result from a create or copy call.
fn owned<T>(ptr: *mut T) -> Option<CFRetained<T>> {
    // SAFETY: callers only pass results of create/copy functions.
    NonNull::new(ptr).map(|ptr| unsafe { CFRetained::from_raw(ptr) })
}

fn items<T: ConcreteType>(array: &CFArray) -> Vec<&T> {
    #[allow(unused_unsafe)]
    let count = unsafe { CFArrayGetCount(array) };
    (0..count)
        .filter_map(|index| {
            // SAFETY: `index` is in bounds; the value lives as long as `array`.
            let value = unsafe { CFArrayGetValueAtIndex(array, index).cast::<CFType>().as_ref() };
            value?.downcast_ref::<T>()
        })
        .collect()
}

fn lookup<'a, T: ConcreteType>(dict: &'a CFDictionary, key: &str) -> Option<&'a T> {
    let key = CFString::from_str(key);
    // SAFETY: the key is a live CFString; the value lives as long as `dict`.
    let value = unsafe {
        CFDictionaryGetValue(dict, (&*key as *const CFString).cast()).cast::<CFType>().as_ref()
    };
    value?.downcast_ref::<T>()
}

fn space_id(number: &CFNumber) -> Option<SpaceId> {
    number.as_i64().and_then(|id| u64::try_from(id).ok()).map(SpaceId::new)
}

fn display_uuid(display: CGDirectDisplayID) -> Option<String> {
    // SAFETY: both calls follow the create rule.
    let uuid = owned(unsafe { CGDisplayCreateUUIDFromDisplayID(display) })?;
    let string = owned(unsafe { CFUUIDCreateString(std::ptr::null(), &uuid) })?;
    Some(string.to_string())
}

pub struct SkyLight {
    connection: CGSConnectionID,
    mtm: MainThreadMarker,
}

impl SkyLight {
    pub fn new(mtm: MainThreadMarker) -> Self {
        // SAFETY: no preconditions.
        let connection = unsafe { CGSMainConnectionID() };
        SkyLight { connection, mtm }
    }

    fn displays(&self) -> Vec<CGDirectDisplayID> {
        let mut displays = vec![0; MAX_DISPLAYS as usize];
        let mut count = 0u32;
        #[allow(unused_unsafe)]
        let status =
            unsafe { CGGetActiveDisplayList(MAX_DISPLAYS, displays.as_mut_ptr(), &mut count) };
        if status != CGError::Success {
            warn!(?status, "Could not list displays");
            return Vec::new();
        }
        displays.truncate(count as usize);
        displays
    }
}

impl WindowServer for SkyLight {
    fn active_space(&self) -> SpaceId {
        // SAFETY: plain value call.
        SpaceId::new(unsafe { CGSGetActiveSpace(self.connection) })
    }

    fn managed_display_spaces(&self) -> Vec<DisplaySpaces> {
        // SAFETY: follows the copy rule.
        let Some(displays) = owned(unsafe { CGSCopyManagedDisplaySpaces(self.connection) }) else {
            return Vec::new();
        };
        items::<CFDictionary>(&displays)
            .into_iter()
            .filter_map(|display| {
                let id = lookup::<CFString>(display, DISPLAY_IDENTIFIER)?.to_string();
                let spaces = lookup::<CFArray>(display, SPACES)
                    .map(|spaces| {
                        items::<CFDictionary>(spaces)
                            .into_iter()
                            .filter_map(|space| lookup::<CFNumber>(space, MANAGED_SPACE_ID))
                            .filter_map(space_id)
                            .collect()
                    })
                    .unwrap_or_default();
                Some(DisplaySpaces { display: id, spaces })
            })
            .collect()
    }

    fn current_space(&self, display: &str) -> Option<SpaceId> {
        let display = CFString::from_str(display);
        // SAFETY: `display` is a live CFString.
        let id = unsafe { CGSManagedDisplayGetCurrentSpace(self.connection, &display) };
        (id != 0).then(|| SpaceId::new(id))
    }

    fn spaces_for_window(&self, window: WindowServerId) -> Vec<SpaceId> {
        let ids = CFArray::from_retained_objects(&[CFNumber::new_i64(window.as_u32().into())]);
        // SAFETY: follows the copy rule.
        let spaces =
            owned(unsafe { CGSCopySpacesForWindows(self.connection, ALL_SPACES_MASK, &ids) });
        let Some(spaces) = spaces else {
            trace!(?window, "No spaces for window");
            return Vec::new();
        };
        items::<CFNumber>(&spaces).into_iter().filter_map(space_id).collect()
    }

    fn space_type(&self, space: SpaceId) -> SpaceType {
        // SAFETY: plain value call.
        SpaceType::from_raw(unsafe { CGSSpaceGetType(self.connection, space.get()) })
    }

    fn screens(&self) -> Vec<ScreenInfo> {
        #[allow(unused_unsafe)]
        let main = unsafe { CGMainDisplayID() };
        let mut screens: Vec<ScreenInfo> = self
            .displays()
            .into_iter()
            .filter_map(|display| {
                let id = display_uuid(display)?;
                #[allow(unused_unsafe)]
                let bounds = unsafe { CGDisplayBounds(display) };
                Some(ScreenInfo {
                    id,
                    frame: Frame {
                        x: bounds.origin.x,
                        y: bounds.origin.y,
                        width: bounds.size.width,
                        height: bounds.size.height,
                    },
                    is_main: display == main,
                })
            })
            .collect();
        screens.sort_by_key(|screen| !screen.is_main);
        screens
    }

    fn screens_have_separate_spaces(&self) -> bool { NSScreen::screensHaveSeparateSpaces(self.mtm) }
}
