//! Miri-compatible tests for detecting undefined behavior.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! Small capacities keep the interpreter fast while still exercising every
//! unsafe path: uninitialized slot storage, wrap-around reuse, the split
//! bulk copies, and the references handed out by peek/get.

use ringspsc_rs::{PopError, SpscRing};

#[test]
fn miri_push_pop_basics() {
    let mut ring: SpscRing<u64, 4> = SpscRing::new();
    let (mut producer, mut consumer) = ring.split();

    assert!(producer.push(100).is_ok());
    assert!(producer.push(200).is_ok());
    assert_eq!(consumer.pop(), Ok(100));
    assert_eq!(consumer.pop(), Ok(200));
    assert_eq!(consumer.pop(), Err(PopError::Empty));
}

#[test]
fn miri_wrap_around_reuses_slots() {
    let mut ring: SpscRing<u32, 4> = SpscRing::new();
    let (mut producer, mut consumer) = ring.split();

    // Fill and drain several times so every slot is written and read at
    // multiple counter values.
    for round in 0..3u32 {
        for i in 0..4 {
            assert!(producer.push(round * 10 + i).is_ok());
        }
        for i in 0..4 {
            assert_eq!(consumer.pop(), Ok(round * 10 + i));
        }
    }
}

#[test]
fn miri_batch_copy_straddles_boundary() {
    let mut ring: SpscRing<u64, 4> = SpscRing::new();
    let (mut producer, mut consumer) = ring.split();

    // Offset the indices so the next batch wraps.
    producer.push_slice(&[1, 2, 3]);
    consumer.discard(3);

    let src = [7, 8, 9];
    assert_eq!(producer.push_slice(&src), 3);

    let mut dst = [0u64; 3];
    assert_eq!(consumer.pop_slice(&mut dst), 3);
    assert_eq!(dst, src);
}

#[test]
fn miri_peek_and_get_references() {
    let mut ring: SpscRing<u32, 4> = SpscRing::new();
    let (mut producer, mut consumer) = ring.split();

    producer.push_slice(&[5, 6, 7]);

    assert_eq!(consumer.peek(), Some(&5));
    assert_eq!(consumer.get(2), Some(&7));
    assert_eq!(consumer.get(3), None);

    // SAFETY: two elements remain after the pop below; index 1 is in range.
    assert_eq!(consumer.pop(), Ok(5));
    assert_eq!(unsafe { *consumer.get_unchecked(1) }, 7);
}

#[test]
fn miri_clears_and_reuse() {
    let mut ring: SpscRing<u32, 4> = SpscRing::new();
    let (mut producer, mut consumer) = ring.split();

    producer.push_slice(&[1, 2]);
    consumer.clear();
    assert!(consumer.is_empty());

    producer.push_slice(&[3, 4]);
    // SAFETY: the consumer handle is on this thread and quiescent.
    unsafe { producer.clear() };
    assert!(consumer.is_empty());

    assert!(producer.push(9).is_ok());
    assert_eq!(consumer.pop(), Ok(9));
}

#[test]
fn miri_push_with_only_runs_on_space() {
    let mut ring: SpscRing<u8, 2> = SpscRing::new();
    let (mut producer, _consumer) = ring.split();

    let mut calls = 0;
    assert!(producer.push_with(|| {
        calls += 1;
        1
    }));
    assert!(producer.push_with(|| {
        calls += 1;
        2
    }));
    assert!(!producer.push_with(|| {
        calls += 1;
        3
    }));
    assert_eq!(calls, 2);
}

#[test]
fn miri_raw_surface_single_thread() {
    let ring: SpscRing<u16, 4, u8> = SpscRing::new();

    // SAFETY: one thread plays both roles sequentially.
    unsafe {
        for i in 0..300u16 {
            assert!(ring.push(i));
            assert_eq!(ring.pop(), Some(i));
        }
    }
    assert!(ring.is_empty());
}
