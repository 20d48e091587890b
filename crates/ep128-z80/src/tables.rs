//! Flag lookup tables.
//!
//! Built once on first use and shared read-only by every CPU instance.

use lazy_static::lazy_static;

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

/// Precomputed flag values indexed by result byte, plus the DAA table.
pub struct Tables {
    /// S and Z for each byte value.
    pub zero_sign: [u8; 256],
    /// S and Z, with bits 3 and 5 copied from the value.
    pub zero_sign_xy: [u8; 256],
    /// P set for even population count.
    pub parity: [u8; 256],
    /// S, Z, P and bits 3/5.
    pub zero_sign_parity: [u8; 256],
    /// Corrected `A << 8 | F`, indexed by [`daa_index`].
    pub daa: [u16; 2048],
}

lazy_static! {
    static ref TABLES: Tables = Tables::build();
}

/// The process-wide tables.
#[must_use]
pub fn tables() -> &'static Tables {
    &TABLES
}

/// Index into [`Tables::daa`] for the given accumulator and input flags.
#[must_use]
pub fn daa_index(a: u8, f: u8) -> usize {
    let mut index = usize::from(a);
    if f & CF != 0 {
        index |= 0x100;
    }
    if f & HF != 0 {
        index |= 0x200;
    }
    if f & NF != 0 {
        index |= 0x400;
    }
    index
}

impl Tables {
    fn build() -> Self {
        let mut t = Self {
            zero_sign: [0; 256],
            zero_sign_xy: [0; 256],
            parity: [0; 256],
            zero_sign_parity: [0; 256],
            daa: [0; 2048],
        };

        for value in 0..=255u8 {
            let i = usize::from(value);
            let mut zs = 0;
            if value == 0 {
                zs |= ZF;
            }
            if value & 0x80 != 0 {
                zs |= SF;
            }
            t.zero_sign[i] = zs;
            t.zero_sign_xy[i] = zs | (value & (YF | XF));
            t.parity[i] = if value.count_ones().is_multiple_of(2) { PF } else { 0 };
            t.zero_sign_parity[i] = t.parity[i] | t.zero_sign_xy[i];
        }

        for (i, entry) in t.daa.iter_mut().enumerate() {
            *entry = daa_entry(i, &t.zero_sign_parity);
        }

        t
    }
}

/// BCD correction of one accumulator/flag combination.
fn daa_entry(index: usize, zero_sign_parity: &[u8; 256]) -> u16 {
    let mut carry = index & 0x100 != 0;
    let mut half = index & 0x200 != 0;
    let subtract = index & 0x400 != 0;
    let mut l = (index & 0x0F) as u8;
    let mut h = ((index >> 4) & 0x0F) as u8;

    if l > 9 || half {
        if subtract {
            if l > 9 && h >= 9 {
                carry = true;
            }
            l = l.wrapping_sub(6);
            half = l & 0x10 != 0;
        } else {
            l += 6;
            if l >= 0x10 {
                l &= 0x0F;
                h += 1;
                half = true;
            } else {
                half = false;
            }
        }
    } else {
        half = false;
    }

    if h > 9 || carry {
        if subtract {
            if h > 9 {
                carry = true;
            }
            h = h.wrapping_sub(6);
        } else {
            h += 6;
            if h >= 0x10 {
                carry = true;
            }
        }
    }

    // The low nibble may have borrowed; the sum lets that ripple into h.
    let a = ((u32::from(h) << 4) + u32::from(l)) as u8;
    let mut f = zero_sign_parity[usize::from(a)];
    if carry {
        f |= CF;
    }
    if subtract {
        f |= NF;
    }
    if half {
        f |= HF;
    }
    (u16::from(a) << 8) | u16::from(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_follows_population_count() {
        let t = tables();
        assert_eq!(t.parity[0x00], PF);
        assert_eq!(t.parity[0x01], 0);
        assert_eq!(t.parity[0xFF], PF);
        for v in 0..=255u8 {
            let even = v.count_ones().is_multiple_of(2);
            assert_eq!(t.parity[usize::from(v)] == PF, even, "parity of {v:#04X}");
        }
    }

    #[test]
    fn zero_sign_table() {
        let t = tables();
        for v in 0..=255u8 {
            let f = t.zero_sign[usize::from(v)];
            assert_eq!(f & ZF != 0, v == 0);
            assert_eq!(f & SF != 0, v & 0x80 != 0);
            assert_eq!(f & !(ZF | SF), 0);
        }
    }

    #[test]
    fn xy_variant_copies_bits_3_and_5() {
        let t = tables();
        assert_eq!(t.zero_sign_xy[0x28], YF | XF);
        assert_eq!(t.zero_sign_xy[0xA8], SF | YF | XF);
        assert_eq!(t.zero_sign_parity[0x00], ZF | PF);
    }

    #[test]
    fn daa_without_correction() {
        let af = tables().daa[daa_index(0x45, 0)];
        assert_eq!(af >> 8, 0x45);
        assert_eq!(af as u8 & CF, 0);
    }

    #[test]
    fn daa_after_addition() {
        // 0x19 + 0x28 = 0x41 with half carry; BCD answer is 47.
        let af = tables().daa[daa_index(0x41, HF)];
        assert_eq!(af >> 8, 0x47);
        assert_eq!(af as u8 & (CF | NF), 0);

        // 0x99 + 0x01 = 0x9A; BCD answer is 00 with carry.
        let af = tables().daa[daa_index(0x9A, 0)];
        assert_eq!(af >> 8, 0x00);
        assert_eq!(af as u8 & (CF | ZF | HF), CF | ZF | HF);
    }

    #[test]
    fn daa_after_subtraction() {
        // 0x10 - 0x01 = 0x0F with half borrow; BCD answer is 09.
        let af = tables().daa[daa_index(0x0F, HF | NF)];
        assert_eq!(af >> 8, 0x09);
        assert_ne!(af as u8 & NF, 0);
        assert_eq!(af as u8 & CF, 0);
    }
}
