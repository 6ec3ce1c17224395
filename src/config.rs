//! Tunable constants for the mixer and decoder.
//!
//! Kept as named constants near the modules that use them is the teacher's habit
//! (see `NUM_SUB_BUFFS`/`SUB_BUFF_SIZE` in the AC97 driver); here they live in one
//! place since every ring-buffer-touching module depends on the same `BUFF_SIZE`.

/// Ring buffer capacity in bytes. Must be a power of two so wraparound is a mask.
/// 2048 bytes is comfortably >= 4x a 160-byte/20ms G.711 frame at 8 kHz.
pub const BUFF_SIZE: usize = 2048;

pub const BUFF_MASK: usize = BUFF_SIZE - 1;
pub const BUFF_HALF: usize = BUFF_SIZE / 2;

const _ASSERT_POWER_OF_TWO: () = assert!(BUFF_SIZE.is_power_of_two(), "BUFF_SIZE must be a power of two");

/// Frame length in samples for the Goertzel filter bank (~20ms at 8kHz).
pub const DTMF_NPOINTS: usize = 102;

/// Squared-magnitude floor a Goertzel bin must clear to be considered present.
pub const DTMF_THRESH: i64 = 200_000;

/// Hardware conference units are numbered 1..=MAX_HW_UNITS.
pub const MAX_HW_UNITS: u8 = 8;

/// Bound on a DTMFState's pending-digit output buffer.
pub const DTMF_DIGIT_BUFFER_CAP: usize = 32;
