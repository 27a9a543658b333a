//! Bump allocator over the caller's scratch buffer
//!
//! glibc hands every `get*_r` call a `char *buffer` of `buflen` bytes that
//! must hold all strings (and the member pointer table for groups) the
//! returned struct points to. [`BufferWriter`] carves that region front to
//! back. It never writes past the end: each write checks the remaining
//! capacity first and reports [`BufferTooSmall`] instead.

use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr;

use nix::libc::c_char;

use crate::error::BufferTooSmall;

/// Sequential writer over a caller owned byte region
#[derive(Debug)]
pub struct BufferWriter<'a> {
    base: *mut u8,
    capacity: usize,
    offset: usize,
    _region: PhantomData<&'a mut [u8]>,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            base: buf.as_mut_ptr(),
            capacity: buf.len(),
            offset: 0,
            _region: PhantomData,
        }
    }

    /// Wrap a region handed over by C code.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for writes of `len` bytes for `'a` and not be
    /// accessed through any other pointer meanwhile. A null `buf` is only
    /// allowed with `len == 0`. The bytes may be uninitialized.
    pub unsafe fn from_raw_parts(buf: *mut c_char, len: usize) -> Self {
        Self {
            base: buf.cast(),
            capacity: if buf.is_null() { 0 } else { len },
            offset: 0,
            _region: PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset
    }

    /// Copy `s` plus a NUL terminator, returning where it landed.
    ///
    /// On failure the cursor does not move.
    pub fn write_str(&mut self, s: &str) -> Result<*mut c_char, BufferTooSmall> {
        let bytes = s.as_bytes();
        if bytes.len() >= self.remaining() {
            return Err(BufferTooSmall);
        }

        // SAFETY: offset + len + 1 <= capacity was checked above.
        unsafe {
            let dst = self.base.add(self.offset);
            ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
            dst.add(bytes.len()).write(0);
            self.offset = self.offset.wrapping_add(bytes.len() + 1);
            Ok(dst.cast())
        }
    }

    /// Write a NULL terminated `char *` table followed by its strings.
    ///
    /// The table starts at a pointer-aligned address and has one slot per
    /// item plus the terminating null, so an empty iterator still yields a
    /// valid, empty table.
    pub fn write_str_array<'s, I>(&mut self, items: I) -> Result<*mut *mut c_char, BufferTooSmall>
    where
        I: IntoIterator<Item = &'s str>,
        I::IntoIter: Clone,
    {
        let items = items.into_iter();
        let count = items.clone().count();

        self.align_to(align_of::<*mut c_char>())?;
        let table_len = count
            .checked_add(1)
            .and_then(|slots| slots.checked_mul(size_of::<*mut c_char>()))
            .ok_or(BufferTooSmall)?;
        if table_len > self.remaining() {
            return Err(BufferTooSmall);
        }

        // SAFETY: the table fits and starts at an aligned address.
        let table = unsafe { self.base.add(self.offset) }.cast::<*mut c_char>();
        self.offset = self.offset.wrapping_add(table_len);

        for (slot, item) in items.enumerate() {
            let string = self.write_str(item)?;
            // SAFETY: slot < count, inside the table reserved above.
            unsafe { table.add(slot).write(string) };
        }
        // SAFETY: the last slot of the table.
        unsafe { table.add(count).write(ptr::null_mut()) };

        Ok(table)
    }

    /// Pad the cursor so the next write starts at a multiple of `align`
    fn align_to(&mut self, align: usize) -> Result<(), BufferTooSmall> {
        // SAFETY: offset <= capacity, so this stays within or one past the region.
        let cursor = unsafe { self.base.add(self.offset) };
        let padding = cursor.align_offset(align);
        if padding > self.remaining() {
            return Err(BufferTooSmall);
        }
        self.offset = self.offset.wrapping_add(padding);
        Ok(())
    }
}
