//! The SPSC ring buffer primitive.
//!
//! [`SpscRing<T, N, I, FAKE_TSO>`] moves `Copy` values from exactly one
//! producer thread to exactly one consumer thread in constant time, without
//! locks, retries, or allocation. The buffer is embedded in the struct, so a
//! ring can live in a `static` and be shared with an interrupt handler.
//!
//! # Protocol
//!
//! Two counters of index type `I` grow monotonically and wrap only at the
//! full range of `I`:
//!
//! - `head` is written by the producer after it has filled slots, with a
//!   release store. The consumer acquire-loads it to learn what is readable.
//! - `tail` is written by the consumer after it has read slots, with a
//!   release store. The producer acquire-loads it to learn what is writable.
//!
//! The slot for a counter value is `counter & (N - 1)`; the element count is
//! the wrapping difference `head - tail`, exact in `[0, N]` because the
//! capacity is capped at half the index range. Full (`head - tail == N`) and
//! empty (`head == tail`) are distinguished directly - no slot is sacrificed.
//!
//! # Memory layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ head: I::Atomic            ← producer writes, consumer reads       │
//! ├─────────────────────────────────────────────────── 128B boundary ──┤
//! │ tail: I::Atomic            ← consumer writes, producer reads       │
//! ├─────────────────────────────────────────────────── 128B boundary ──┤
//! │ slots: [UnsafeCell<MaybeUninit<T>>; N]   (inline storage)          │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each counter owns a 128-byte region so a producer store to `head` never
//! bounces the cache line the consumer spins on, and vice versa.

use crate::index::RingIndex;
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_consume_bounded, debug_assert_initialized_read,
};
use crate::split::{Consumer, Producer};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{compiler_fence, Ordering};

// =============================================================================
// CACHE LINE ALIGNMENT
// =============================================================================

/// Wrapper type that ensures 128-byte alignment to prevent prefetcher-induced
/// false sharing on Intel/AMD CPUs (which may prefetch adjacent cache lines).
#[repr(C)]
#[repr(align(128))]
pub(crate) struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

// =============================================================================
// SPSC RING BUFFER
// =============================================================================

/// A bounded, lock-free, wait-free single-producer single-consumer ring
/// buffer with compile-time capacity.
///
/// # Type parameters
///
/// - `T`: element type. Must be `Copy` - transfers are raw byte copies and
///   slots are recycled without running any destructor.
/// - `N`: capacity. Must be a power of two, at least 2, and at most half the
///   range of `I`. Violations are compile errors.
/// - `I`: index type for the two counters (`usize` by default). Narrow
///   counters shrink the hot state for small embedded targets; the capacity
///   cap `N <= I::MAX / 2` keeps the wrapping difference exact.
/// - `FAKE_TSO`: when `true`, hardware acquire/release barriers on the
///   counters degrade to relaxed accesses guarded by compiler fences. Only
///   correct where the hardware already observes stores in program order
///   (single-core microcontrollers, uniprocessor systems).
///
/// # Roles
///
/// Operations are split into a producer side (`push*`, `producer_clear`) and
/// a consumer side (`pop*`, `peek`, `get*`, `discard`, `consumer_clear`).
/// At most one thread may hold each role at a time, which is why the raw
/// methods are `unsafe`. [`split`](Self::split) hands out safe [`Producer`]
/// and [`Consumer`] handles that enforce the role contract at compile time.
///
/// Every operation completes in a bounded number of steps: there are no
/// internal retries, waits, or suspension points. Callers that need to wait
/// for space or data loop externally (see [`Backoff`](crate::Backoff)).
///
/// # Example
///
/// ```
/// use ringspsc_rs::SpscRing;
///
/// let mut ring: SpscRing<u32, 8> = SpscRing::new();
/// let (mut producer, mut consumer) = ring.split();
///
/// assert_eq!(producer.push(7), Ok(()));
/// assert_eq!(consumer.pop(), Ok(7));
/// ```
#[repr(C)]
pub struct SpscRing<T: Copy, const N: usize, I: RingIndex = usize, const FAKE_TSO: bool = false> {
    /// Head counter (written by producer, read by consumer).
    head: CacheAligned<I::Atomic>,
    /// Tail counter (written by consumer, read by producer).
    tail: CacheAligned<I::Atomic>,
    /// Slot storage. A slot's contents are undefined until the producer
    /// first writes it; `MaybeUninit` makes that explicit.
    slots: CacheAligned<[UnsafeCell<MaybeUninit<T>>; N]>,
}

// Safety: the counters are atomics and every slot is written by exactly one
// role at a time - the producer owns slots in [head, tail + N), the consumer
// owns [tail, head). The release/acquire pair on each counter transfers slot
// ownership between the threads.
unsafe impl<T: Copy + Send, const N: usize, I: RingIndex, const FAKE_TSO: bool> Send
    for SpscRing<T, N, I, FAKE_TSO>
{
}
unsafe impl<T: Copy + Send, const N: usize, I: RingIndex, const FAKE_TSO: bool> Sync
    for SpscRing<T, N, I, FAKE_TSO>
{
}

impl<T: Copy, const N: usize, I: RingIndex, const FAKE_TSO: bool> SpscRing<T, N, I, FAKE_TSO> {
    /// The mask for deriving slot indices: `N - 1` (valid because N is a
    /// power of two).
    const MASK: usize = N - 1;

    /// Creates an empty ring.
    ///
    /// `const`, so rings can be placed in `static`s:
    ///
    /// ```
    /// use ringspsc_rs::SpscRing;
    ///
    /// static UART_RX: SpscRing<u8, 64, u8, true> = SpscRing::new();
    /// ```
    ///
    /// Capacity constraints are enforced at compile time; an invalid
    /// instantiation fails to build.
    pub const fn new() -> Self {
        const {
            assert!(N >= 2, "capacity must be at least 2");
            assert!(N.is_power_of_two(), "capacity must be a power of two");
            assert!(
                N <= I::MAX >> 1,
                "capacity must not exceed half the index type's range"
            );
        }

        Self {
            head: CacheAligned::new(I::ZERO),
            tail: CacheAligned::new(I::ZERO),
            // SAFETY: MaybeUninit<T> does not require initialization. This is
            // the standard pattern for const-initializing arrays of MaybeUninit.
            slots: CacheAligned::new(unsafe { MaybeUninit::uninit().assume_init() }),
        }
    }

    /// Splits the ring into its two role handles.
    ///
    /// Taking `&mut self` guarantees no other reference to the ring exists,
    /// so the returned [`Producer`] and [`Consumer`] are the only ways to
    /// operate on it for the duration of the borrow - one handle per role,
    /// each `Send` but not `Clone`.
    pub fn split(
        &mut self,
    ) -> (Producer<'_, T, N, I, FAKE_TSO>, Consumer<'_, T, N, I, FAKE_TSO>) {
        let ring = &*self;
        (Producer::new(ring), Consumer::new(ring))
    }

    // =========================================================================
    // ORDERING HELPERS
    // =========================================================================
    //
    // In the default mode the producer's release store on `head` synchronizes
    // with the consumer's acquire load (and symmetrically for `tail`): slot
    // writes become visible before the counter advance does.
    //
    // With FAKE_TSO the hardware already commits stores in program order, so
    // the barriers collapse to relaxed accesses. The compiler fences remain:
    // they stop the compiler from sinking a slot write past the counter store
    // (or hoisting a slot read above the counter load), which the relaxed
    // atomic alone would permit.

    /// Consumer-side load of `head`, synchronizing with the producer's
    /// publications.
    #[inline]
    fn observe_head(&self) -> I {
        if FAKE_TSO {
            let head = I::load(&self.head, Ordering::Relaxed);
            compiler_fence(Ordering::Acquire);
            head
        } else {
            I::load(&self.head, Ordering::Acquire)
        }
    }

    /// Producer-side load of `tail`, synchronizing with the consumer's
    /// releases.
    #[inline]
    fn observe_tail(&self) -> I {
        if FAKE_TSO {
            let tail = I::load(&self.tail, Ordering::Relaxed);
            compiler_fence(Ordering::Acquire);
            tail
        } else {
            I::load(&self.tail, Ordering::Acquire)
        }
    }

    /// Producer-side publication of `head` after slot writes.
    #[inline]
    fn publish_head(&self, value: I) {
        if FAKE_TSO {
            compiler_fence(Ordering::Release);
            I::store(&self.head, value, Ordering::Relaxed);
        } else {
            I::store(&self.head, value, Ordering::Release);
        }
    }

    /// Consumer-side publication of `tail` after slot reads.
    #[inline]
    fn publish_tail(&self, value: I) {
        if FAKE_TSO {
            compiler_fence(Ordering::Release);
            I::store(&self.tail, value, Ordering::Relaxed);
        } else {
            I::store(&self.tail, value, Ordering::Release);
        }
    }

    /// Raw pointer to the slot at a masked index.
    #[inline]
    fn slot_ptr(&self, index: usize) -> *mut T {
        self.slots[index].get().cast::<T>()
    }

    // =========================================================================
    // QUERIES (safe from either role; results are racy snapshots)
    // =========================================================================

    /// Returns the ring capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of elements currently readable.
    ///
    /// From the consumer this is a lower bound: the producer may publish
    /// more at any instant, but never less.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.observe_head();
        let tail = I::load(&self.tail, Ordering::Relaxed);
        head.diff(tail)
    }

    /// Number of free slots currently writable.
    ///
    /// From the producer this is a lower bound: the consumer may free more
    /// at any instant, but never less.
    #[inline]
    pub fn available(&self) -> usize {
        let head = I::load(&self.head, Ordering::Relaxed);
        let tail = self.observe_tail();
        N - head.diff(tail)
    }

    /// True if no element is readable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if no slot is writable.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.available() == 0
    }

    // =========================================================================
    // PRODUCER SIDE
    // =========================================================================

    /// Writes one element. Returns `false` (leaving the ring untouched) if
    /// the ring is full.
    ///
    /// # Safety
    ///
    /// The caller must be the sole producer: no other thread may execute a
    /// producer-side operation concurrently.
    #[inline]
    pub unsafe fn push(&self, value: T) -> bool {
        let head = I::load(&self.head, Ordering::Relaxed);
        let tail = self.observe_tail();

        if head.diff(tail) == N {
            return false;
        }

        // SAFETY: head - tail < N, so the slot at head is outside the live
        // region [tail, head) and no consumer read can touch it until the
        // publish below makes it visible.
        unsafe { self.slot_ptr(head.slot(Self::MASK)).write(value) };
        self.publish_head(head.add(1));
        true
    }

    /// Writes the element returned by `supply`, invoking it only after the
    /// fullness check has succeeded.
    ///
    /// If the ring is full, `supply` is **not** invoked and `false` is
    /// returned. The callback's side effects therefore happen iff the push
    /// happens - the property a caller relies on when `supply` consumes a
    /// limited resource, e.g. pops a descriptor from another queue.
    ///
    /// # Safety
    ///
    /// Same contract as [`push`](Self::push). `supply` must not call back
    /// into this ring's consumer side.
    #[inline]
    pub unsafe fn push_with<F: FnOnce() -> T>(&self, supply: F) -> bool {
        let head = I::load(&self.head, Ordering::Relaxed);
        let tail = self.observe_tail();

        if head.diff(tail) == N {
            return false;
        }

        // SAFETY: as in push - the slot is unreachable by the consumer
        // until published.
        unsafe { self.slot_ptr(head.slot(Self::MASK)).write(supply()) };
        self.publish_head(head.add(1));
        true
    }

    /// Writes as many elements from `src` as fit, in order. Returns the
    /// number written, which is `0..=src.len()`.
    ///
    /// Each loop iteration re-reads `tail`, so a concurrently draining
    /// consumer can let a single call transfer more than one contiguous run.
    /// Within an iteration the copy is split at the wrap boundary into at
    /// most two `memcpy`-class runs.
    ///
    /// # Safety
    ///
    /// Same contract as [`push`](Self::push).
    pub unsafe fn push_slice(&self, src: &[T]) -> usize {
        // SAFETY: forwarded producer contract.
        unsafe { self.push_slice_impl(src, None::<fn()>) }
    }

    /// Like [`push_slice`](Self::push_slice), but invokes `notify` once per
    /// loop iteration, after the release store that published that
    /// iteration's elements.
    ///
    /// `notify` observes each incrementally published run and may wake a
    /// waiting consumer. It cannot abort the loop; the call returns when
    /// `src` is exhausted or the ring stays full.
    ///
    /// # Safety
    ///
    /// Same contract as [`push`](Self::push). `notify` must not call back
    /// into this ring's consumer side.
    pub unsafe fn push_slice_with<F: FnMut()>(&self, src: &[T], notify: F) -> usize {
        // SAFETY: forwarded producer contract.
        unsafe { self.push_slice_impl(src, Some(notify)) }
    }

    unsafe fn push_slice_impl<F: FnMut()>(&self, src: &[T], mut notify: Option<F>) -> usize {
        let mut written = 0;
        let mut head = I::load(&self.head, Ordering::Relaxed);

        while written < src.len() {
            let tail = self.observe_tail();
            let space = N - head.diff(tail);
            if space == 0 {
                break;
            }

            let run = (src.len() - written).min(space);
            let offset = head.slot(Self::MASK);
            let first = run.min(N - offset);

            // SAFETY: the `run` slots starting at `head` lie outside the
            // live region, and the two copies below stay inside the slot
            // array - `first <= N - offset` and `run - first <= offset`.
            unsafe {
                ptr::copy_nonoverlapping(src.as_ptr().add(written), self.slot_ptr(offset), first);
                if run > first {
                    ptr::copy_nonoverlapping(
                        src.as_ptr().add(written + first),
                        self.slot_ptr(0),
                        run - first,
                    );
                }
            }

            written += run;
            head = head.add(run);
            debug_assert_bounded_count!(head.diff(tail), N);
            self.publish_head(head);

            if let Some(f) = notify.as_mut() {
                f();
            }
        }

        written
    }

    /// Logically drains the ring from the producer side by setting
    /// `head ← tail`, discarding all pending elements.
    ///
    /// Only the producer-owned counter is written, so there is no counter
    /// race with the consumer. The consumer may observe the transition at
    /// any instant.
    ///
    /// # Safety
    ///
    /// Same contract as [`push`](Self::push). Additionally the consumer must
    /// be quiescent: rewinding `head` lets subsequent pushes recycle slots a
    /// concurrent consumer read (or an outstanding [`peek`](Self::peek)
    /// reference) could still be touching.
    #[inline]
    pub unsafe fn producer_clear(&self) {
        let tail = I::load(&self.tail, Ordering::Relaxed);
        I::store(&self.head, tail, Ordering::Relaxed);
    }

    // =========================================================================
    // CONSUMER SIDE
    // =========================================================================

    /// Reads and removes the front element, or returns `None` if the ring
    /// is empty.
    ///
    /// # Safety
    ///
    /// The caller must be the sole consumer: no other thread may execute a
    /// consumer-side operation concurrently.
    #[inline]
    pub unsafe fn pop(&self) -> Option<T> {
        let tail = I::load(&self.tail, Ordering::Relaxed);
        let head = self.observe_head();

        if tail == head {
            return None;
        }

        debug_assert_initialized_read!(0, head.diff(tail));
        // SAFETY: tail != head, so the slot at tail was published by the
        // producer's release store that our acquire load synchronized with.
        let value = unsafe { self.slot_ptr(tail.slot(Self::MASK)).read() };
        self.publish_tail(tail.add(1));
        Some(value)
    }

    /// Returns a reference to the front element without removing it, or
    /// `None` if the ring is empty.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop`](Self::pop). The returned reference must be
    /// dropped before any operation advances `tail` or rewinds `head`.
    #[inline]
    pub unsafe fn peek(&self) -> Option<&T> {
        let tail = I::load(&self.tail, Ordering::Relaxed);
        let head = self.observe_head();

        if tail == head {
            return None;
        }

        // SAFETY: slot published, see pop.
        Some(unsafe { &*self.slot_ptr(tail.slot(Self::MASK)) })
    }

    /// Returns a reference to the element `index` positions behind the
    /// front (0 = front), or `None` if fewer than `index + 1` elements are
    /// readable.
    ///
    /// # Safety
    ///
    /// Same contract as [`peek`](Self::peek).
    #[inline]
    pub unsafe fn get(&self, index: usize) -> Option<&T> {
        let tail = I::load(&self.tail, Ordering::Relaxed);
        let head = self.observe_head();

        if head.diff(tail) <= index {
            return None;
        }

        // SAFETY: index < head - tail, so the slot lies in the published
        // region.
        Some(unsafe { &*self.slot_ptr(tail.add(index).slot(Self::MASK)) })
    }

    /// Unchecked variant of [`get`](Self::get).
    ///
    /// # Safety
    ///
    /// Same contract as [`peek`](Self::peek), and the caller must guarantee
    /// `index < len()`; otherwise the returned reference aliases a slot the
    /// producer may be writing, which is undefined behavior.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        let tail = I::load(&self.tail, Ordering::Relaxed);
        // SAFETY: index < head - tail per the caller contract.
        unsafe { &*self.slot_ptr(tail.add(index).slot(Self::MASK)) }
    }

    /// Advances `tail` past up to `count` elements without reading them.
    /// Returns the number actually discarded, `min(count, len)`.
    ///
    /// No slot data is read, so `head` is loaded relaxed - the release
    /// store on `tail` is the only synchronizing access.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop`](Self::pop).
    #[inline]
    pub unsafe fn discard(&self, count: usize) -> usize {
        let tail = I::load(&self.tail, Ordering::Relaxed);
        let head = I::load(&self.head, Ordering::Relaxed);

        let available = head.diff(tail);
        let discarded = count.min(available);
        debug_assert_consume_bounded!(discarded, available);

        if discarded > 0 {
            self.publish_tail(tail.add(discarded));
        }
        discarded
    }

    /// Reads up to `dst.len()` elements into `dst`, in order. Returns the
    /// number read, which is `0..=dst.len()`.
    ///
    /// The dual of [`push_slice`](Self::push_slice): each iteration
    /// re-reads `head`, and copies are split at the wrap boundary into at
    /// most two runs.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop`](Self::pop).
    pub unsafe fn pop_slice(&self, dst: &mut [T]) -> usize {
        // SAFETY: forwarded consumer contract.
        unsafe { self.pop_slice_impl(dst, None::<fn()>) }
    }

    /// Like [`pop_slice`](Self::pop_slice), but invokes `notify` once per
    /// loop iteration, after the release store that freed that iteration's
    /// slots. `notify` may wake a waiting producer; it cannot abort the
    /// loop.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop`](Self::pop). `notify` must not call back
    /// into this ring's producer side.
    pub unsafe fn pop_slice_with<F: FnMut()>(&self, dst: &mut [T], notify: F) -> usize {
        // SAFETY: forwarded consumer contract.
        unsafe { self.pop_slice_impl(dst, Some(notify)) }
    }

    unsafe fn pop_slice_impl<F: FnMut()>(&self, dst: &mut [T], mut notify: Option<F>) -> usize {
        let mut read = 0;
        let mut tail = I::load(&self.tail, Ordering::Relaxed);

        while read < dst.len() {
            let head = self.observe_head();
            let available = head.diff(tail);
            if available == 0 {
                break;
            }

            let run = (dst.len() - read).min(available);
            let offset = tail.slot(Self::MASK);
            let first = run.min(N - offset);
            debug_assert_initialized_read!(run - 1, available);

            // SAFETY: the `run` slots starting at `tail` are published, and
            // both copies stay inside the slot array.
            unsafe {
                ptr::copy_nonoverlapping(self.slot_ptr(offset), dst.as_mut_ptr().add(read), first);
                if run > first {
                    ptr::copy_nonoverlapping(
                        self.slot_ptr(0),
                        dst.as_mut_ptr().add(read + first),
                        run - first,
                    );
                }
            }

            read += run;
            tail = tail.add(run);
            self.publish_tail(tail);

            if let Some(f) = notify.as_mut() {
                f();
            }
        }

        read
    }

    /// Logically drains the ring from the consumer side by setting
    /// `tail ← head`, discarding all pending elements.
    ///
    /// Only the consumer-owned counter is written; `tail` moves forward
    /// over slots the producer cannot be writing, so this is race-free
    /// against a concurrent producer.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop`](Self::pop).
    #[inline]
    pub unsafe fn consumer_clear(&self) {
        let head = I::load(&self.head, Ordering::Relaxed);
        I::store(&self.tail, head, Ordering::Relaxed);
    }
}

impl<T: Copy, const N: usize, I: RingIndex, const FAKE_TSO: bool> Default
    for SpscRing<T, N, I, FAKE_TSO>
{
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
