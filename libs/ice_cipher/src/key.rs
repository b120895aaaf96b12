use std::fmt;

use crate::BLOCK_SIZE;
use crate::error::Error;
use crate::sbox::{SBoxes, sboxes};

/// Key rotation schedule for the key bit interleaving.
const KEYROT: [usize; 16] = [0, 1, 2, 3, 2, 1, 3, 0, 1, 3, 2, 0, 3, 1, 0, 2];

/// A single round key, made of the salt permutation (`[2]`) and the two XOR
/// halves (`[0]` and `[1]`).
type Subkey = [u32; 3];

/// An ICE key with its round-key schedule.
///
/// Until [`set`](Self::set) is called, the schedule is all zeroes.
#[derive(Clone)]
pub struct IceKey {
    size: usize,
    schedule: Box<[Subkey]>,
}

impl IceKey {
    /// Creates a key of the given level.
    ///
    /// Level 0 is Thin-ICE with 8 rounds. Any other level `n` uses `16 * n`
    /// rounds. Either way, the key is [`8 * size`](Self::key_len) bytes long.
    #[must_use]
    pub fn new(level: usize) -> Self {
        let (size, rounds) = match level {
            0 => (1, 8),
            n => (n, n * 16),
        };

        Self {
            size,
            schedule: vec![[0; 3]; rounds].into_boxed_slice(),
        }
    }

    /// Creates a key with a level matching the length of `key` and sets it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the key is empty or not a multiple of 8 bytes long.
    pub fn with_key(key: &[u8]) -> Result<Self, Error> {
        if key.is_empty() || key.len() % BLOCK_SIZE != 0 {
            return Err(Error::KeyLength(key.len()));
        }

        let mut this = Self::new(key.len() / BLOCK_SIZE);
        this.set(key)?;
        Ok(this)
    }

    /// The key size in 64-bit words.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The count of encryption rounds.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.schedule.len()
    }

    /// The length in bytes the key passed to [`set`](Self::set) must have.
    #[must_use]
    pub fn key_len(&self) -> usize {
        self.size * BLOCK_SIZE
    }

    /// Builds the round-key schedule from the key bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `key` is not exactly [`key_len`](Self::key_len)
    /// bytes long.
    pub fn set(&mut self, key: &[u8]) -> Result<(), Error> {
        if key.is_empty() || key.len() % BLOCK_SIZE != 0 {
            return Err(Error::KeyLength(key.len()));
        }

        if key.len() != self.key_len() {
            return Err(Error::KeySize {
                expected: self.key_len(),
                actual: key.len(),
            });
        }

        let rounds = self.rounds();
        for (i, chunk) in key.chunks_exact(BLOCK_SIZE).enumerate() {
            let mut kb = [0u16; 4];
            for (j, pair) in chunk.chunks_exact(2).enumerate() {
                kb[3 - j] = u16::from_be_bytes([pair[0], pair[1]]);
            }

            if rounds == 8 {
                self.build_schedule(&mut kb, 0, &KEYROT[..8]);
            } else {
                self.build_schedule(&mut kb, i * 8, &KEYROT[..8]);
                self.build_schedule(&mut kb, rounds - 8 - i * 8, &KEYROT[8..]);
            }
        }

        Ok(())
    }

    /// Fills 8 subkeys starting at `offset` by rotating bits out of `kb`.
    fn build_schedule(&mut self, kb: &mut [u16; 4], offset: usize, keyrot: &[usize]) {
        for (subkey, &kr) in self.schedule[offset..offset + 8].iter_mut().zip(keyrot) {
            *subkey = [0; 3];

            for j in 0..15 {
                let curr = &mut subkey[j % 3];
                for k in 0..4 {
                    let curr_kb = &mut kb[(kr + k) & 3];
                    let bit = *curr_kb & 1;

                    *curr = (*curr << 1) | u32::from(bit);
                    *curr_kb = (*curr_kb >> 1) | ((bit ^ 1) << 15);
                }
            }
        }
    }

    /// Encrypts a single block.
    #[must_use]
    pub fn encrypt_block(&self, plaintext: &[u8; 8]) -> [u8; 8] {
        let sbox = sboxes();
        let (mut l, mut r) = split(plaintext);

        for pair in self.schedule.chunks_exact(2) {
            l ^= round(sbox, r, &pair[0]);
            r ^= round(sbox, l, &pair[1]);
        }

        join(r, l)
    }

    /// Decrypts a single block.
    #[must_use]
    pub fn decrypt_block(&self, ciphertext: &[u8; 8]) -> [u8; 8] {
        let sbox = sboxes();
        let (mut l, mut r) = split(ciphertext);

        for pair in self.schedule.rchunks_exact(2) {
            l ^= round(sbox, r, &pair[1]);
            r ^= round(sbox, l, &pair[0]);
        }

        join(r, l)
    }
}

impl fmt::Debug for IceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the schedule is key material
        f.debug_struct("IceKey")
            .field("size", &self.size)
            .field("rounds", &self.rounds())
            .finish_non_exhaustive()
    }
}

fn split(block: &[u8; 8]) -> (u32, u32) {
    let [a, b, c, d, e, f, g, h] = *block;
    (
        u32::from_be_bytes([a, b, c, d]),
        u32::from_be_bytes([e, f, g, h]),
    )
}

fn join(first: u32, second: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&first.to_be_bytes());
    out[4..].copy_from_slice(&second.to_be_bytes());
    out
}

/// The round function.
///
/// Expands the half to 40 bits, applies the salt permutation and key XOR,
/// then substitutes through the 4 S-boxes which include the P-box.
fn round(sbox: &SBoxes, p: u32, sk: &Subkey) -> u32 {
    let tl = ((p >> 16) & 0x3ff) | (((p >> 14) | (p << 18)) & 0xffc00);
    let tr = (p & 0x3ff) | ((p << 2) & 0xffc00);

    let mut al = sk[2] & (tl ^ tr);
    let mut ar = al ^ tr;
    al ^= tl;

    al ^= sk[0];
    ar ^= sk[1];

    sbox[0][(al >> 10) as usize]
        | sbox[1][(al & 0x3ff) as usize]
        | sbox[2][(ar >> 10) as usize]
        | sbox[3][(ar & 0x3ff) as usize]
}
