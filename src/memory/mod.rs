//! Allocation shim.
//!
//! [`GeneralAllocator`] forwards every request to one [`Backend`] and logs
//! it at DEBUG. The crate-wide instance, [`GENERAL_ALLOCATOR`], is bound to
//! the backend chosen by the `alloc-*` features; code that wants another
//! backend builds its own shim and passes it around.

use core::{
    alloc::{GlobalAlloc, Layout},
    ptr,
};

mod adapter;
mod backend;

pub use adapter::TypedAllocator;
pub use backend::{
    Backend, CustomBackend, DefaultBackend, FreeFn, HostManagedBackend, MallocFn, StdlibBackend,
    DEFAULT_BACKEND, MALLOC_ALIGN,
};
#[cfg(feature = "alloc-esp")]
pub use backend::EspCapsBackend;

use crate::log_d;

pub struct GeneralAllocator<B> {
    backend: B,
}

impl<B: Backend> GeneralAllocator<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Null on failure, and for `size == 0` without asking the backend.
    pub fn allocate(&self, size: usize) -> *mut u8 {
        if size == 0 {
            return ptr::null_mut();
        }

        let p = self.backend.malloc(size);
        log_d!("Malloc @{:p}: {}", p, size);
        p
    }

    /// `calloc`: `count * size` zeroed bytes, null on overflow.
    pub fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        let Some(total) = count.checked_mul(size) else {
            return ptr::null_mut();
        };

        let p = self.allocate(total);
        if !p.is_null() {
            // SAFETY: `p` points to `total` writable bytes
            unsafe { ptr::write_bytes(p, 0, total) };
        }
        p
    }

    /// # Safety
    ///
    /// `ptr` is null or came from [`allocate`](Self::allocate) on this shim
    /// and was not released since.
    pub unsafe fn release(&self, ptr: *mut u8) {
        log_d!("Free @{:p}", ptr);
        unsafe { self.backend.free(ptr) }
    }

    /// Adapter handing out `T`-sized slots.
    pub fn typed<T>(&self) -> TypedAllocator<'_, T, B> {
        TypedAllocator::new(self)
    }
}

unsafe impl<B: Backend> GlobalAlloc for GeneralAllocator<B> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > self.backend.max_align() {
            return ptr::null_mut();
        }
        self.allocate(layout.size())
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > self.backend.max_align() {
            return ptr::null_mut();
        }
        self.allocate_zeroed(1, layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        unsafe { self.release(ptr) }
    }
}

#[cfg(feature = "nightly")]
unsafe impl<B: Backend> core::alloc::Allocator for GeneralAllocator<B> {
    fn allocate(&self, layout: Layout) -> Result<ptr::NonNull<[u8]>, core::alloc::AllocError> {
        if layout.size() == 0 {
            // SAFETY: alignments are never zero
            let dangling = unsafe { ptr::NonNull::new_unchecked(layout.align() as *mut u8) };
            return Ok(ptr::NonNull::slice_from_raw_parts(dangling, 0));
        }

        let p = unsafe { GlobalAlloc::alloc(self, layout) };
        ptr::NonNull::new(p)
            .map(|p| ptr::NonNull::slice_from_raw_parts(p, layout.size()))
            .ok_or(core::alloc::AllocError)
    }

    unsafe fn deallocate(&self, ptr: ptr::NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            unsafe { self.release(ptr.as_ptr()) }
        }
    }
}

pub static GENERAL_ALLOCATOR: GeneralAllocator<DefaultBackend> = GeneralAllocator::new(DEFAULT_BACKEND);

pub fn malloc(size: usize) -> *mut u8 {
    GENERAL_ALLOCATOR.allocate(size)
}

pub fn calloc(count: usize, size: usize) -> *mut u8 {
    GENERAL_ALLOCATOR.allocate_zeroed(count, size)
}

/// # Safety
///
/// `ptr` is null or came from [`malloc`]/[`calloc`] and was not freed since.
pub unsafe fn free(ptr: *mut u8) {
    unsafe { GENERAL_ALLOCATOR.release(ptr) }
}

/// `Arc` whose storage comes from `shim`.
#[cfg(feature = "nightly")]
pub fn make_shared_in<T, B: Backend>(
    shim: &GeneralAllocator<B>,
    value: T,
) -> Result<alloc::sync::Arc<T, &GeneralAllocator<B>>, core::alloc::AllocError> {
    alloc::sync::Arc::try_new_in(value, shim)
}

/// `Arc` whose storage comes from [`GENERAL_ALLOCATOR`].
#[cfg(feature = "nightly")]
pub fn make_shared<T>(
    value: T,
) -> Result<alloc::sync::Arc<T, &'static GeneralAllocator<DefaultBackend>>, core::alloc::AllocError> {
    make_shared_in(&GENERAL_ALLOCATOR, value)
}
