//! The S-box tables.
//!
//! Each of the 4 tables maps a 10-bit input to a permuted 32-bit output. The
//! tables only depend on constants and are built once per process.

use std::sync::LazyLock;

pub type SBoxes = [[u32; 1024]; 4];

/// Moduli for the Galois field exponentiation, per S-box and row.
const SMOD: [[u32; 4]; 4] = [
    [333, 313, 505, 369],
    [379, 375, 319, 391],
    [361, 445, 451, 397],
    [397, 425, 395, 505],
];

/// XOR applied to the column before exponentiation, per S-box and row.
const SXOR: [[u32; 4]; 4] = [
    [0x83, 0x85, 0x9b, 0xcd],
    [0xcc, 0xa7, 0xad, 0x41],
    [0x4b, 0x2e, 0xd4, 0x33],
    [0xea, 0xcb, 0x2e, 0x04],
];

/// Target bit for each input bit of the P-box.
#[rustfmt::skip]
const PBOX: [u32; 32] = [
    0x00000001, 0x00000080, 0x00000400, 0x00002000,
    0x00080000, 0x00200000, 0x01000000, 0x40000000,
    0x00000008, 0x00000020, 0x00000100, 0x00004000,
    0x00010000, 0x00800000, 0x04000000, 0x20000000,
    0x00000004, 0x00000010, 0x00000200, 0x00008000,
    0x00020000, 0x00400000, 0x08000000, 0x10000000,
    0x00000002, 0x00000040, 0x00000800, 0x00001000,
    0x00040000, 0x00100000, 0x02000000, 0x80000000,
];

static SBOXES: LazyLock<SBoxes> = LazyLock::new(build);

/// Gets the process-wide S-boxes, building them on first access.
pub fn sboxes() -> &'static SBoxes {
    &SBOXES
}

/// Multiplication in GF(2^8) with the given modulus.
fn gf_mult(mut a: u32, mut b: u32, m: u32) -> u32 {
    let mut res = 0;
    while b != 0 {
        if b & 1 != 0 {
            res ^= a;
        }

        a <<= 1;
        b >>= 1;

        if a >= 256 {
            a ^= m;
        }
    }

    res
}

/// Computes `b^7` in GF(2^8) with the given modulus.
fn gf_exp7(b: u32, m: u32) -> u32 {
    if b == 0 {
        return 0;
    }

    let x = gf_mult(b, b, m);
    let x = gf_mult(b, x, m);
    let x = gf_mult(x, x, m);
    gf_mult(b, x, m)
}

/// Applies the P-box permutation.
fn perm32(mut x: u32) -> u32 {
    let mut res = 0;
    for bit in PBOX {
        if x == 0 {
            break;
        }

        if x & 1 != 0 {
            res |= bit;
        }

        x >>= 1;
    }

    res
}

fn build() -> SBoxes {
    log::trace!("building ice s-boxes");

    let mut sbox = [[0u32; 1024]; 4];
    for i in 0..1024u32 {
        let col = (i >> 1) & 0xff;
        let row = ((i & 0x1) | ((i & 0x200) >> 8)) as usize;

        for (index, shift) in [24, 16, 8, 0].into_iter().enumerate() {
            let x = gf_exp7(col ^ SXOR[index][row], SMOD[index][row]) << shift;
            sbox[index][i as usize] = perm32(x);
        }
    }

    sbox
}
