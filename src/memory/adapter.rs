use core::{alloc::Layout, fmt, marker::PhantomData, ptr};

use super::{Backend, GeneralAllocator};

/// Hands out arrays of `T` from a [`GeneralAllocator`], for containers that
/// manage their own storage.
///
/// With the `oom-handler` feature a failed non-empty request ends in
/// [`alloc::alloc::handle_alloc_error`]; otherwise the null pointer is
/// returned as is.
pub struct TypedAllocator<'a, T, B> {
    shim: &'a GeneralAllocator<B>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T, B: Backend> TypedAllocator<'a, T, B> {
    pub fn new(shim: &'a GeneralAllocator<B>) -> Self {
        Self {
            shim,
            _marker: PhantomData,
        }
    }

    /// Same shim, different element type.
    pub fn rebind<U>(self) -> TypedAllocator<'a, U, B> {
        TypedAllocator::new(self.shim)
    }

    pub fn shim(&self) -> &'a GeneralAllocator<B> {
        self.shim
    }

    /// Room for `n` values of `T`. `n == 0` never reaches the backend.
    pub fn allocate(&self, n: usize) -> *mut T {
        if n == 0 {
            return ptr::null_mut();
        }

        let layout = Layout::array::<T>(n).ok();
        let p = match layout {
            Some(layout) if layout.align() <= self.shim.backend().max_align() => {
                self.shim.allocate(layout.size())
            }
            _ => ptr::null_mut(),
        };

        #[cfg(feature = "oom-handler")]
        if p.is_null() && layout.map_or(true, |l| l.size() != 0) {
            alloc::alloc::handle_alloc_error(layout.unwrap_or(Layout::new::<T>()));
        }

        p.cast()
    }

    /// # Safety
    ///
    /// `p` is null or came from [`allocate`](Self::allocate) on an adapter
    /// over the same shim.
    pub unsafe fn deallocate(&self, p: *mut T, _n: usize) {
        unsafe { self.shim.release(p.cast()) }
    }
}

impl<T, B> Clone for TypedAllocator<'_, T, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, B> Copy for TypedAllocator<'_, T, B> {}

impl<T, B> PartialEq for TypedAllocator<'_, T, B> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.shim, other.shim)
    }
}

impl<T, B> fmt::Debug for TypedAllocator<'_, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAllocator")
            .field("type", &core::any::type_name::<T>())
            .field("shim", &format_args!("{:p}", self.shim))
            .finish()
    }
}
