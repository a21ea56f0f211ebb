//! Threaded stress: one producer thread, one consumer thread, a checksum
//! over everything transferred. A broken release/acquire handshake shows
//! up here as torn cells or out-of-order values.

use std::thread;

use bytes::Bytes;
use shm_ring::{FieldKind, PushResult, RingBuffer, StructLayout, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn raw_spsc_transfers_in_order_with_matching_checksum() {
    init_tracing();

    const COUNT: u64 = 100_000;
    let ring = RingBuffer::new(64, 8).unwrap();
    let (mut producer, mut consumer) = ring.split();

    thread::scope(|scope| {
        scope.spawn(move || {
            for i in 0..COUNT {
                let payload = Bytes::copy_from_slice(&i.to_le_bytes());
                while producer.try_push(&payload).unwrap().is_would_block() {
                    std::hint::spin_loop();
                }
            }
        });

        scope.spawn(move || {
            let mut checksum = 0u64;
            for expected in 0..COUNT {
                let cell = loop {
                    if let Some(cell) = consumer.try_pop() {
                        break cell;
                    }
                    std::hint::spin_loop();
                };
                let value = u64::from_le_bytes(cell.as_ref().try_into().unwrap());
                assert_eq!(value, expected, "values must arrive in FIFO order");
                checksum = checksum.wrapping_add(value);
            }
            assert!(consumer.try_pop().is_none());
            assert_eq!(checksum, (0..COUNT).fold(0u64, u64::wrapping_add));
        });
    });
}

#[test]
fn struct_spsc_round_trips_under_contention() {
    init_tracing();

    const COUNT: u32 = 20_000;
    let layout = StructLayout::new(vec![FieldKind::U32, FieldKind::I64]).unwrap();
    let ring = RingBuffer::with_strategy(32, layout).unwrap();
    let (mut producer, mut consumer) = ring.split();

    thread::scope(|scope| {
        scope.spawn(move || {
            for i in 0..COUNT {
                let element = vec![Value::U32(i), Value::I64(-(i as i64))];
                loop {
                    match producer.try_push(&element).unwrap() {
                        PushResult::Ok => break,
                        PushResult::WouldBlock => std::hint::spin_loop(),
                    }
                }
            }
        });

        scope.spawn(move || {
            for i in 0..COUNT {
                let element = loop {
                    if let Some(element) = consumer.try_pop() {
                        break element;
                    }
                    std::hint::spin_loop();
                };
                assert_eq!(element, vec![Value::U32(i), Value::I64(-(i as i64))]);
            }
        });
    });
}
