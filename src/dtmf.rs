//! 8-bin Goertzel DTMF decoder with a 3-frame hysteresis debounce, spec.md §4.9.

use std::sync::OnceLock;

use crate::companding::Encoding;
use crate::config::{DTMF_DIGIT_BUFFER_CAP, DTMF_NPOINTS, DTMF_THRESH};

const SAMPLE_RATE: f64 = 8000.0;
const FREQS: [f64; 8] = [697.0, 770.0, 852.0, 941.0, 1209.0, 1336.0, 1477.0, 1633.0];

const DIGIT_MATRIX: [[u8; 4]; 4] = [
    [b'1', b'2', b'3', b'A'],
    [b'4', b'5', b'6', b'B'],
    [b'7', b'8', b'9', b'C'],
    [b'*', b'0', b'#', b'D'],
];

fn coefficients() -> &'static [i64; 8] {
    static COEFS: OnceLock<[i64; 8]> = OnceLock::new();
    COEFS.get_or_init(|| {
        let mut out = [0i64; 8];
        for (i, f) in FREQS.iter().enumerate() {
            let theta = 2.0 * std::f64::consts::PI * f / SAMPLE_RATE;
            out[i] = (2.0 * theta.cos() * 32768.0).round() as i64;
        }
        out
    })
}

fn goertzel_frame(samples: &[i16]) -> [i64; 8] {
    let coefs = coefficients();
    let mut powers = [0i64; 8];
    for (k, &coef) in coefs.iter().enumerate() {
        let mut s1 = 0i64;
        let mut s2 = 0i64;
        for &x in samples {
            let s0 = ((coef * s1) >> 15) - s2 + x as i64;
            if s0.abs() > 32767 {
                log::trace!("dtmf: bin {k} Goertzel state overflowed Q15 range ({s0})");
            }
            s2 = s1;
            s1 = s0;
        }
        let cross = (coef * s1) >> 15;
        powers[k] = s1 * s1 + s2 * s2 - cross * s2;
    }
    powers
}

/// Picks the digit (as its ASCII byte) implied by one frame's 8 bin powers,
/// or 0 if no digit is present this frame.
fn select_tone(powers: &[i64; 8]) -> u8 {
    let peak = match powers.iter().copied().filter(|&p| p >= DTMF_THRESH).max() {
        Some(p) => p,
        None => return 0,
    };
    let tr = peak / 4;
    let trl = peak / 8;

    let mut low = None;
    let mut high = None;
    for (i, &p) in powers.iter().enumerate() {
        if p < trl {
            continue;
        }
        if p < tr {
            return 0;
        }
        if i < 4 {
            if low.is_some() {
                return 0;
            }
            low = Some(i);
        } else {
            if high.is_some() {
                return 0;
            }
            high = Some(i - 4);
        }
    }

    match (low, high) {
        (Some(l), Some(h)) => DIGIT_MATRIX[l][h],
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtmfEncoding {
    ALaw,
    ULaw,
    /// Each 32-byte chunk carries eight pre-computed little-endian u32
    /// Q-format magnitudes, bypassing the Goertzel recurrence entirely.
    HfcCoefficients,
}

impl From<Encoding> for DtmfEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::ALaw => DtmfEncoding::ALaw,
            Encoding::ULaw => DtmfEncoding::ULaw,
        }
    }
}

pub struct DtmfState {
    buffer: [i16; DTMF_NPOINTS],
    size: usize,
    last_what: u8,
    last_digit: u8,
    count: u32,
    digits: String,
}

impl Default for DtmfState {
    fn default() -> Self {
        Self::new()
    }
}

impl DtmfState {
    pub fn new() -> Self {
        DtmfState {
            buffer: [0i16; DTMF_NPOINTS],
            size: 0,
            last_what: 0,
            last_digit: 0,
            count: 0,
            digits: String::new(),
        }
    }

    /// Drains the bounded pending-digit buffer.
    pub fn take_digits(&mut self) -> String {
        std::mem::take(&mut self.digits)
    }

    fn process_frame(&mut self, powers: &[i64; 8], out: &mut String) {
        let what = select_tone(powers);

        if what != self.last_what {
            self.count = 0;
        }
        if self.count == 2 && what != self.last_digit {
            if what != 0 {
                out.push(what as char);
                if self.digits.len() < DTMF_DIGIT_BUFFER_CAP {
                    self.digits.push(what as char);
                } else {
                    log::warn!("dtmf: pending digit buffer full, dropping '{}'", what as char);
                }
            }
            self.last_digit = what;
        } else {
            self.count += 1;
        }
        self.last_what = what;
    }
}

/// Feeds `bytes` through the decoder, returning digits newly emitted by this
/// call (the decoder's own pending buffer accumulates them too, drainable
/// via [`DtmfState::take_digits`]).
pub fn dtmf_decode(state: &mut DtmfState, bytes: &[u8], encoding: DtmfEncoding) -> String {
    let mut emitted = String::new();

    match encoding {
        DtmfEncoding::ALaw | DtmfEncoding::ULaw => {
            let law = if encoding == DtmfEncoding::ALaw { Encoding::ALaw } else { Encoding::ULaw };
            for &b in bytes {
                state.buffer[state.size] = law.law_to_linear(b);
                state.size += 1;
                if state.size == DTMF_NPOINTS {
                    let powers = goertzel_frame(&state.buffer);
                    state.process_frame(&powers, &mut emitted);
                    state.size = 0;
                }
            }
        }
        DtmfEncoding::HfcCoefficients => {
            for chunk in bytes.chunks(32) {
                if chunk.len() < 32 {
                    log::warn!("dtmf: truncated hardware-coefficient chunk ({} bytes), dropped", chunk.len());
                    break;
                }
                let mut powers = [0i64; 8];
                for (i, p) in powers.iter_mut().enumerate() {
                    let b = [chunk[i * 4], chunk[i * 4 + 1], chunk[i * 4 + 2], chunk[i * 4 + 3]];
                    *p = u32::from_le_bytes(b) as i64;
                }
                state.process_frame(&powers, &mut emitted);
            }
        }
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_frame(low: f64, high: f64) -> [u8; DTMF_NPOINTS] {
        let mut frame = [0u8; DTMF_NPOINTS];
        for (i, b) in frame.iter_mut().enumerate() {
            let t = i as f64 / SAMPLE_RATE;
            let sample = (8000.0 * ((2.0 * std::f64::consts::PI * low * t).sin()
                + (2.0 * std::f64::consts::PI * high * t).sin())) as i16;
            *b = Encoding::ULaw.linear_to_law(sample);
        }
        frame
    }

    #[test]
    fn two_frame_burst_emits_nothing() {
        let mut state = DtmfState::new();
        let frame = tone_frame(852.0, 1477.0); // '9'
        let mut out = String::new();
        out += &dtmf_decode(&mut state, &frame, DtmfEncoding::ULaw);
        out += &dtmf_decode(&mut state, &frame, DtmfEncoding::ULaw);
        assert_eq!(out, "");
    }

    #[test]
    fn sustained_tone_emits_digit_once() {
        let mut state = DtmfState::new();
        let frame = tone_frame(852.0, 1477.0); // '9'
        let mut out = String::new();
        for _ in 0..6 {
            out += &dtmf_decode(&mut state, &frame, DtmfEncoding::ULaw);
        }
        assert_eq!(out, "9");
    }

    #[test]
    fn silence_emits_nothing() {
        let mut state = DtmfState::new();
        let silence = [Encoding::ULaw.silence_byte(); DTMF_NPOINTS];
        let mut out = String::new();
        for _ in 0..6 {
            out += &dtmf_decode(&mut state, &silence, DtmfEncoding::ULaw);
        }
        assert_eq!(out, "");
    }

    #[test]
    fn hfc_coefficients_bypass_goertzel() {
        let mut state = DtmfState::new();
        let mut chunk = [0u8; 32];
        // Bin 2 (852Hz, low) and bin 6 (1477Hz, high) both above threshold -> '9'.
        let high_power = (DTMF_THRESH as u32) * 2;
        chunk[2 * 4..2 * 4 + 4].copy_from_slice(&high_power.to_le_bytes());
        chunk[6 * 4..6 * 4 + 4].copy_from_slice(&high_power.to_le_bytes());

        let mut out = String::new();
        for _ in 0..4 {
            out += &dtmf_decode(&mut state, &chunk, DtmfEncoding::HfcCoefficients);
        }
        assert_eq!(out, "9");
    }
}
