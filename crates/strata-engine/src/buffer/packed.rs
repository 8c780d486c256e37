use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;

use super::records::{ArrayKind, Record, VertexLayout};

/// Identity of a packed buffer's GPU upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Append-only array of fixed-stride geometry records.
///
/// Storage is a zero-filled byte array whose length is the capacity; `pos`
/// is the write cursor. Capacity doubles whenever the next record would not
/// fit, so appends are amortised O(1) and existing bytes are preserved.
#[derive(Debug)]
pub struct PackedBuffer {
    id: BufferId,
    item_size: usize,
    kind: ArrayKind,
    layout: Option<VertexLayout>,
    bytes: Vec<u8>,
    pos: usize,
}

impl PackedBuffer {
    /// Initial capacity in bytes.
    pub const DEFAULT_CAPACITY: usize = 8192;

    /// Creates an empty buffer for records of type `R`.
    pub fn new<R: Record>() -> Self {
        Self::with_capacity::<R>(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty buffer with at least `capacity` bytes reserved.
    pub fn with_capacity<R: Record>(capacity: usize) -> Self {
        let item_size = std::mem::size_of::<R>();
        Self {
            id: BufferId::next(),
            item_size,
            kind: R::KIND,
            layout: R::LAYOUT,
            bytes: vec![0; capacity.max(item_size)],
            pos: 0,
        }
    }

    /// Builds a buffer holding `records`, in order.
    pub fn from_records<R: Record>(records: &[R]) -> Self {
        let mut buffer = Self::with_capacity::<R>(std::mem::size_of_val(records));
        for record in records {
            buffer.append(record);
        }
        buffer
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Record stride in bytes.
    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    #[inline]
    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    #[inline]
    pub fn layout(&self) -> Option<VertexLayout> {
        self.layout
    }

    /// Write position in bytes.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Allocated bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Number of records written, i.e. the index the next record will get.
    #[inline]
    pub fn len(&self) -> usize {
        self.pos / self.item_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Appends one record and returns its byte offset.
    ///
    /// # Panics
    /// If `R` does not have this buffer's stride.
    pub fn append<R: Record>(&mut self, record: &R) -> usize {
        let src = bytemuck::bytes_of(record);
        assert_eq!(
            src.len(),
            self.item_size,
            "PackedBuffer::append: record stride {} does not match buffer stride {}",
            src.len(),
            self.item_size
        );

        self.reserve_record();
        let offset = self.pos;
        self.bytes[offset..offset + self.item_size].copy_from_slice(src);
        self.pos += self.item_size;

        debug_assert_eq!(self.pos % self.item_size, 0);
        offset
    }

    /// Reads back record `index` as `T` (any POD view of the stride).
    pub fn read<T: Pod>(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(self.item_size)?;
        let end = start.checked_add(std::mem::size_of::<T>())?;
        if end > self.pos || std::mem::size_of::<T>() > self.item_size {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&self.bytes[start..end]))
    }

    /// Iterates all written records as `T`.
    pub fn records<T: Pod>(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).filter_map(move |i| self.read::<T>(i))
    }

    /// Signed 16-bit view over the written bytes (native endian).
    pub fn shorts(&self) -> impl Iterator<Item = i16> + '_ {
        self.bind().chunks_exact(2).map(|c| i16::from_ne_bytes([c[0], c[1]]))
    }

    /// Unsigned 16-bit view over the written bytes (native endian).
    pub fn ushorts(&self) -> impl Iterator<Item = u16> + '_ {
        self.bind().chunks_exact(2).map(|c| u16::from_ne_bytes([c[0], c[1]]))
    }

    /// Bytes `0..pos`, ready for upload.
    #[inline]
    pub fn bind(&self) -> &[u8] {
        &self.bytes[..self.pos]
    }

    fn reserve_record(&mut self) {
        let needed = self.pos + self.item_size;
        if needed <= self.bytes.len() {
            return;
        }
        let mut capacity = self.bytes.len().max(self.item_size);
        while capacity < needed {
            capacity *= 2;
        }
        self.bytes.resize(capacity, 0);
    }
}
