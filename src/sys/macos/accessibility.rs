use std::any::Any;
use std::fmt;
use std::ptr::{self, NonNull};

use objc2_application_services::{AXError, AXIsProcessTrusted, AXUIElement};
use objc2_core_foundation::{
    CFArray, CFArrayGetCount, CFArrayGetValueAtIndex, CFBoolean, CFEqual, CFHash, CFRetained,
    CFString, CFType,
};
use tracing::warn;

use crate::sys::axuielement::{
    Accessibility, AxError, BoolAttribute, Element, ElementHandle, StringAttribute,
};
use crate::sys::pid_t;
use crate::sys::window_server::WindowServerId;

const WINDOWS: &str = "AXWindows";
const FOCUSED_WINDOW: &str = "AXFocusedWindow";
const RAISE: &str = "AXRaise";

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn _AXUIElementGetWindow(element: NonNull<AXUIElement>, out: *mut u32) -> i32;
}

/// Whether this process may use the accessibility API.
pub fn is_trusted() -> bool {
    #[allow(unused_unsafe)]
    let trusted = unsafe { AXIsProcessTrusted() };
    if !trusted {
        warn!("Accessibility access is not granted; window queries will come back empty");
    }
    trusted
}

pub struct AxElement(CFRetained<AXUIElement>);

impl fmt::Debug for AxElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AxElement({:p})", &*self.0)
    }
}

impl ElementHandle for AxElement {
    fn same_element(&self, other: &dyn ElementHandle) -> bool {
        let Some(other) = other.as_any().downcast_ref::<AxElement>() else {
            return false;
        };
        let (a, b): (&CFType, &CFType) = (&self.0, &other.0);
        #[allow(unused_unsafe)]
        unsafe {
            CFEqual(Some(a), Some(b))
        }
    }

    fn hash_code(&self) -> u64 {
        let cf: &CFType = &self.0;
        #[allow(unused_unsafe)]
        let hash = unsafe { CFHash(Some(cf)) };
        hash as u64
    }

    fn as_any(&self) -> &dyn Any { self }
}

fn check(status: AXError) -> Result<(), AxError> {
    if status == AXError::Success {
        Ok(())
    } else if status == AXError::APIDisabled {
        Err(AxError::NotTrusted)
    } else if status == AXError::InvalidUIElement {
        Err(AxError::InvalidElement)
    } else if status == AXError::NoValue || status == AXError::AttributeUnsupported {
        Err(AxError::NoValue)
    } else {
        Err(AxError::Native(status.0))
    }
}

fn native(element: &Element) -> Result<&AXUIElement, AxError> {
    element.downcast_ref::<AxElement>().map(|e| &*e.0).ok_or(AxError::InvalidElement)
}

fn copy_attribute(element: &AXUIElement, name: &str) -> Result<CFRetained<CFType>, AxError> {
    let attribute = CFString::from_str(name);
    let mut value: *const CFType = ptr::null();
    // SAFETY: `value` is a valid out pointer; ownership of the result follows
    // the copy rule.
    let status = unsafe { element.copy_attribute_value(&attribute, NonNull::from(&mut value)) };
    check(status)?;
    let value = NonNull::new(value.cast_mut()).ok_or(AxError::NoValue)?;
    // SAFETY: returned at +1 by a copy function.
    Ok(unsafe { CFRetained::from_raw(value) })
}

#[derive(Debug, Default)]
pub struct AxAccessibility;

impl Accessibility for AxAccessibility {
    fn application_element(&self, pid: pid_t) -> Element {
        #[allow(unused_unsafe)]
        let element = unsafe { AXUIElement::new_application(pid) };
        Element::new(AxElement(element))
    }

    fn windows(&self, app: &Element, max: usize) -> Result<Vec<Element>, AxError> {
        let app = native(app)?;
        let attribute = CFString::from_str(WINDOWS);
        let mut values: *const CFArray = ptr::null();
        // SAFETY: `values` is a valid out pointer.
        let status = unsafe {
            app.copy_attribute_values(&attribute, 0, max as isize, NonNull::from(&mut values))
        };
        check(status)?;
        let values = NonNull::new(values.cast_mut()).ok_or(AxError::NoValue)?;
        // SAFETY: returned at +1 by a copy function.
        let values = unsafe { CFRetained::from_raw(values) };

        #[allow(unused_unsafe)]
        let count = unsafe { CFArrayGetCount(&values) };
        let mut windows = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            // SAFETY: `index` is in bounds and AXWindows holds only elements.
            let value = unsafe { CFArrayGetValueAtIndex(&values, index) };
            if let Some(value) = NonNull::new(value.cast_mut() as *mut AXUIElement) {
                // SAFETY: the array's value is borrowed; retain it for ourselves.
                let element = unsafe { CFRetained::retain(value) };
                windows.push(Element::new(AxElement(element)));
            }
        }
        Ok(windows)
    }

    fn focused_window(&self, app: &Element) -> Result<Element, AxError> {
        let value = copy_attribute(native(app)?, FOCUSED_WINDOW)?;
        let window = value.downcast::<AXUIElement>().map_err(|_| AxError::NoValue)?;
        Ok(Element::new(AxElement(window)))
    }

    fn bool_attribute(&self, element: &Element, attr: BoolAttribute) -> Result<bool, AxError> {
        let value = copy_attribute(native(element)?, attr.name())?;
        value.downcast_ref::<CFBoolean>().map(|b| b.value()).ok_or(AxError::NoValue)
    }

    fn string_attribute(
        &self,
        element: &Element,
        attr: StringAttribute,
    ) -> Result<String, AxError> {
        let value = copy_attribute(native(element)?, attr.name())?;
        value.downcast_ref::<CFString>().map(|s| s.to_string()).ok_or(AxError::NoValue)
    }

    fn pid(&self, element: &Element) -> Result<pid_t, AxError> {
        let mut pid: pid_t = 0;
        // SAFETY: `pid` is a valid out pointer.
        let status = unsafe { native(element)?.pid(NonNull::from(&mut pid)) };
        check(status)?;
        Ok(pid)
    }

    fn window_server_id(&self, element: &Element) -> Option<WindowServerId> {
        let element = native(element).ok()?;
        let mut id = 0u32;
        // SAFETY: private but stable call; `element` is a live AXUIElement.
        let status = unsafe { _AXUIElementGetWindow(NonNull::from(element), &mut id) };
        (status == 0 && id != 0).then(|| WindowServerId::new(id))
    }

    fn raise(&self, element: &Element) -> bool {
        let Ok(element) = native(element) else { return false };
        let action = CFString::from_str(RAISE);
        #[allow(unused_unsafe)]
        let status = unsafe { element.perform_action(&action) };
        check(status).is_ok()
    }
}
