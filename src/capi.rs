/*!
The C ABI.

Every function here mirrors one declaration in `include/regex.h`. Handles
are heap allocations whose ownership passes to the caller; the matching
`*_deinit` function frees them. Slices returned by `zre_captures_slice_at`
borrow from the input buffer given to `zre_captures_all`, so that buffer
must outlive the captures handle.

Patterns and inputs are NUL-terminated C strings. A pattern that is not
valid UTF-8 or fails to parse yields a null handle.
*/

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use crate::prog::Slot;
use crate::regex::Regex;

/// The opaque captures object handed across the ABI. The input pointer is
/// borrowed from the caller.
pub struct ZreCaptures {
    slots: Vec<Slot>,
    input: *const u8,
}

/// The span of one capture group, as exposed to C.
#[repr(C)]
pub struct ZreCapturesSpan {
    pub lower: usize,
    pub upper: usize,
}

/// Compile `input` into a regex handle, or return null on any failure.
///
/// # Safety
///
/// `input` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn zre_compile(input: *const c_char) -> *mut Regex {
    if input.is_null() {
        return ptr::null_mut();
    }
    let bytes = CStr::from_ptr(input).to_bytes();
    let Ok(pattern) = std::str::from_utf8(bytes) else {
        return ptr::null_mut();
    };
    match Regex::new(pattern) {
        Ok(re) => Box::into_raw(Box::new(re)),
        Err(_) => ptr::null_mut(),
    }
}

/// Returns true if the regex matches a prefix of `input`.
///
/// # Safety
///
/// `re` must be a handle from [`zre_compile`] and `input` a valid
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn zre_match(
    re: *mut Regex,
    input: *const c_char,
) -> bool {
    if re.is_null() || input.is_null() {
        return false;
    }
    let haystack = CStr::from_ptr(input).to_bytes();
    (*re).is_match(haystack)
}

/// Returns true if the regex matches anywhere in `input`.
///
/// # Safety
///
/// `re` must be a handle from [`zre_compile`] and `input` a valid
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn zre_partial_match(
    re: *mut Regex,
    input: *const c_char,
) -> bool {
    if re.is_null() || input.is_null() {
        return false;
    }
    let haystack = CStr::from_ptr(input).to_bytes();
    (*re).partial_match(haystack)
}

/// Free a regex handle. A null handle is ignored.
///
/// # Safety
///
/// `re` must be null or a handle from [`zre_compile`] that has not been
/// freed yet.
#[no_mangle]
pub unsafe extern "C" fn zre_deinit(re: *mut Regex) {
    if !re.is_null() {
        drop(Box::from_raw(re));
    }
}

/// Search `input` and return its captures, or null when there is no match.
/// The handle borrows `input`; keep that buffer alive until the handle is
/// freed.
///
/// # Safety
///
/// `re` must be a handle from [`zre_compile`] and `input` a valid
/// NUL-terminated string that outlives the returned handle.
#[no_mangle]
pub unsafe extern "C" fn zre_captures_all(
    re: *mut Regex,
    input: *const c_char,
) -> *mut ZreCaptures {
    if re.is_null() || input.is_null() {
        return ptr::null_mut();
    }
    let haystack = CStr::from_ptr(input).to_bytes();
    match (*re).captures(haystack) {
        Some(caps) => {
            let (input, slots) = caps.into_raw_parts();
            Box::into_raw(Box::new(ZreCaptures { slots, input }))
        }
        None => ptr::null_mut(),
    }
}

/// The number of capture groups, counting the whole match as group 0.
///
/// # Safety
///
/// `cap` must be a handle from [`zre_captures_all`].
#[no_mangle]
pub unsafe extern "C" fn zre_captures_len(cap: *const ZreCaptures) -> usize {
    if cap.is_null() {
        return 0;
    }
    (*cap).slots.len() / 2
}

/// A pointer to the bytes of group `n`, with the length stored through
/// `len`. Returns null when the group did not participate in the match.
///
/// # Safety
///
/// `cap` must be a handle from [`zre_captures_all`] whose input buffer is
/// still alive, and `len` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn zre_captures_slice_at(
    cap: *const ZreCaptures,
    n: usize,
    len: *mut usize,
) -> *const c_char {
    let mut span = ZreCapturesSpan { lower: 0, upper: 0 };
    if !zre_captures_bounds_at(cap, &mut span, n) {
        return ptr::null();
    }
    *len = span.upper - span.lower;
    (*cap).input.add(span.lower) as *const c_char
}

/// Store the bounds of group `n` through `sp`. Returns false when the
/// group did not participate in the match or `n` is out of range.
///
/// # Safety
///
/// `cap` must be a handle from [`zre_captures_all`] and `sp` a valid
/// pointer.
#[no_mangle]
pub unsafe extern "C" fn zre_captures_bounds_at(
    cap: *const ZreCaptures,
    sp: *mut ZreCapturesSpan,
    n: usize,
) -> bool {
    if cap.is_null() || sp.is_null() {
        return false;
    }
    let slots = &(*cap).slots;
    let (lower, upper) = match (slots.get(n * 2), slots.get(n * 2 + 1)) {
        (Some(&Some(lower)), Some(&Some(upper))) => (lower, upper),
        _ => return false,
    };
    (*sp).lower = lower;
    (*sp).upper = upper;
    true
}

/// Free a captures handle. A null handle is ignored.
///
/// # Safety
///
/// `cap` must be null or a handle from [`zre_captures_all`] that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn zre_captures_deinit(cap: *mut ZreCaptures) {
    if !cap.is_null() {
        drop(Box::from_raw(cap));
    }
}
