use core::{
    alloc::Layout,
    ffi::c_void,
    mem::{align_of, size_of},
    ptr,
};

/// Alignment `malloc` guarantees on the targets we care about.
pub const MALLOC_ALIGN: usize = 2 * size_of::<usize>();

/// The allocator the shim hands its requests to.
///
/// `free` must accept null and do nothing with it.
pub trait Backend {
    fn malloc(&self, size: usize) -> *mut u8;

    /// # Safety
    ///
    /// `ptr` is null or came from `malloc` on this backend and was not
    /// freed since.
    unsafe fn free(&self, ptr: *mut u8);

    /// Largest alignment every block from `malloc` satisfies.
    fn max_align(&self) -> usize {
        MALLOC_ALIGN
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn malloc(&self, size: usize) -> *mut u8 {
        (**self).malloc(size)
    }

    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { (**self).free(ptr) }
    }

    fn max_align(&self) -> usize {
        (**self).max_align()
    }
}

// Rust allocators need the layout back on free while `free(ptr)` only has
// the pointer, so the block size is stored in a header right before it.
mod sized {
    use super::*;

    fn header(align: usize) -> usize {
        align.max(size_of::<usize>())
    }

    /// # Safety
    ///
    /// `raw` must behave like `GlobalAlloc::alloc` for the given layout.
    pub unsafe fn alloc(size: usize, align: usize, raw: impl FnOnce(Layout) -> *mut u8) -> *mut u8 {
        let header = header(align);
        let Some(total) = size.checked_add(header) else {
            return ptr::null_mut();
        };
        let Ok(layout) = Layout::from_size_align(total, align.max(align_of::<usize>())) else {
            return ptr::null_mut();
        };

        let base = raw(layout);
        if base.is_null() {
            return base;
        }

        unsafe {
            let user = base.add(header);
            user.cast::<usize>().sub(1).write(total);
            user
        }
    }

    /// # Safety
    ///
    /// `ptr` must come from [`alloc`] with the same `align`, and `raw` must
    /// release what the matching `raw` handed out.
    pub unsafe fn free(ptr: *mut u8, align: usize, raw: impl FnOnce(*mut u8, Layout)) {
        if ptr.is_null() {
            return;
        }

        unsafe {
            let total = ptr.cast::<usize>().sub(1).read();
            let base = ptr.sub(header(align));
            let layout = Layout::from_size_align_unchecked(total, align.max(align_of::<usize>()));
            raw(base, layout)
        }
    }
}

/// Rust's global allocator, the `malloc`/`free` of this crate.
///
/// Never install a shim over this backend as the `#[global_allocator]`,
/// it would call itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdlibBackend;

impl Backend for StdlibBackend {
    fn malloc(&self, size: usize) -> *mut u8 {
        // SAFETY: the layout is never zero sized, the header is counted in
        unsafe { sized::alloc(size, MALLOC_ALIGN, |layout| alloc::alloc::alloc(layout)) }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { sized::free(ptr, MALLOC_ALIGN, |base, layout| alloc::alloc::dealloc(base, layout)) }
    }
}

/// Capability-aware `esp-alloc` heap.
#[cfg(feature = "alloc-esp")]
#[derive(Clone, Copy)]
pub struct EspCapsBackend {
    align: usize,
    caps: esp_alloc::MemoryCapability,
}

#[cfg(feature = "alloc-esp")]
impl EspCapsBackend {
    pub const fn new(align: usize, caps: esp_alloc::MemoryCapability) -> Self {
        Self { align, caps }
    }
}

#[cfg(feature = "alloc-esp")]
impl Backend for EspCapsBackend {
    fn malloc(&self, size: usize) -> *mut u8 {
        unsafe {
            sized::alloc(size, self.align, |layout| {
                esp_alloc::HEAP.alloc_caps(self.caps.into(), layout)
            })
        }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        use core::alloc::GlobalAlloc;

        unsafe {
            sized::free(ptr, self.align, |base, layout| {
                esp_alloc::HEAP.dealloc(base, layout)
            })
        }
    }

    fn max_align(&self) -> usize {
        self.align.max(align_of::<usize>())
    }
}

pub type MallocFn = unsafe extern "C" fn(usize) -> *mut c_void;
pub type FreeFn = unsafe extern "C" fn(*mut c_void);

/// A user supplied `malloc`/`free` pair.
#[derive(Clone, Copy)]
pub struct CustomBackend {
    malloc: MallocFn,
    free: FreeFn,
}

impl CustomBackend {
    /// `free` has to accept null like C's `free`.
    pub const fn new(malloc: MallocFn, free: FreeFn) -> Self {
        Self { malloc, free }
    }
}

impl Backend for CustomBackend {
    fn malloc(&self, size: usize) -> *mut u8 {
        unsafe { (self.malloc)(size).cast() }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { (self.free)(ptr.cast()) }
    }
}

/// Memory belongs to an embedding runtime; allocation is left to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostManagedBackend;

impl Backend for HostManagedBackend {
    fn malloc(&self, _size: usize) -> *mut u8 {
        ptr::null_mut()
    }

    unsafe fn free(&self, _ptr: *mut u8) {}
}

#[cfg(feature = "alloc-custom")]
mod custom {
    include!(concat!(env!("OUT_DIR"), "/custom_alloc.rs"));

    pub const BACKEND: super::CustomBackend = super::CustomBackend::new(custom_malloc, custom_free);
}

cfg_if::cfg_if! {
    if #[cfg(feature = "alloc-esp")] {
        pub type DefaultBackend = EspCapsBackend;
        pub const DEFAULT_BACKEND: DefaultBackend =
            EspCapsBackend::new(crate::config::ALLOC_ESP_ALIGN, crate::config::ALLOC_ESP_CAPS);
    } else if #[cfg(feature = "alloc-custom")] {
        pub type DefaultBackend = CustomBackend;
        pub const DEFAULT_BACKEND: DefaultBackend = custom::BACKEND;
    } else if #[cfg(feature = "alloc-host")] {
        pub type DefaultBackend = HostManagedBackend;
        pub const DEFAULT_BACKEND: DefaultBackend = HostManagedBackend;
    } else {
        pub type DefaultBackend = StdlibBackend;
        pub const DEFAULT_BACKEND: DefaultBackend = StdlibBackend;
    }
}
