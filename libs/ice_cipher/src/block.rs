use crate::BLOCK_SIZE;
use crate::error::Error;
use crate::key::IceKey;
use crate::scramble::scramble_data;

/// Length of the scramble key prefix of [`encrypt_s`] output.
const SCRAMBLE_KEY_LEN: usize = 4;

/// Encrypts `buffer` block by block into `output` using an [`IceKey`] sized
/// to `key`.
///
/// # Errors
///
/// Returns `Err` if the key or buffer length is not a multiple of 8 or the
/// output length differs from the buffer length.
pub fn encrypt(buffer: &[u8], key: &[u8], output: &mut [u8]) -> Result<(), Error> {
    let key = prepare(buffer, key, output)?;
    apply_blocks(buffer, output, |block| key.encrypt_block(block));
    Ok(())
}

/// Decrypts `buffer` block by block into `output`. This reverses [`encrypt`].
///
/// # Errors
///
/// Returns `Err` under the same conditions as [`encrypt`].
pub fn decrypt(buffer: &[u8], key: &[u8], output: &mut [u8]) -> Result<(), Error> {
    let key = prepare(buffer, key, output)?;
    apply_blocks(buffer, output, |block| key.decrypt_block(block));
    Ok(())
}

fn prepare(buffer: &[u8], key: &[u8], output: &[u8]) -> Result<IceKey, Error> {
    if buffer.len() % BLOCK_SIZE != 0 {
        return Err(Error::BlockLength(buffer.len()));
    }

    if output.len() != buffer.len() {
        return Err(Error::OutputLength {
            expected: buffer.len(),
            actual: output.len(),
        });
    }

    IceKey::with_key(key)
}

fn apply_blocks(buffer: &[u8], output: &mut [u8], mut f: impl FnMut(&[u8; 8]) -> [u8; 8]) {
    let input = buffer.as_chunks::<BLOCK_SIZE>().0;
    let output = output.as_chunks_mut::<BLOCK_SIZE>().0;
    for (src, dst) in input.iter().zip(output) {
        *dst = f(src);
    }
}

/// Scrambles and encrypts `input` under `key`, returning hex text.
///
/// A random scramble key is generated for every call, so encrypting the same
/// input twice produces different text. Use [`decrypt_s`] to reverse this.
///
/// # Errors
///
/// Returns `Err` if the key is empty or not a multiple of 8 bytes long.
pub fn encrypt_s(input: &[u8], key: &[u8]) -> Result<String, Error> {
    encrypt_s_with(input, key, rand::random())
}

/// Like [`encrypt_s`], but with a caller-provided scramble key.
///
/// The output is the hex text of the little-endian scramble key followed by
/// the ciphertext. The ciphertext has the same length as `input`: whole blocks
/// are encrypted directly, a trailing partial block is masked with an
/// encrypted block derived from the scramble key.
///
/// # Errors
///
/// Returns `Err` if the key is empty or not a multiple of 8 bytes long.
pub fn encrypt_s_with(input: &[u8], key: &[u8], scramble_key: u32) -> Result<String, Error> {
    let key = IceKey::with_key(key)?;

    let mut data = input.to_vec();
    scramble_data(&mut data, scramble_key, true);
    transform(&key, &mut data, scramble_key, IceKey::encrypt_block);

    let mut out = Vec::with_capacity(SCRAMBLE_KEY_LEN + data.len());
    out.extend_from_slice(&scramble_key.to_le_bytes());
    out.extend_from_slice(&data);
    Ok(hex::encode_upper(&out))
}

/// Decrypts hex text produced by [`encrypt_s`] with the same key.
///
/// # Errors
///
/// Returns `Err` if the text isn't hex, is too short to hold the scramble
/// key, or the key is empty or not a multiple of 8 bytes long.
pub fn decrypt_s(text: &str, key: &[u8]) -> Result<Vec<u8>, Error> {
    let key = IceKey::with_key(key)?;

    let raw = hex::decode(text)?;
    let Some((scramble_key, data)) = raw.split_first_chunk::<SCRAMBLE_KEY_LEN>() else {
        return Err(Error::Truncated(raw.len()));
    };

    let scramble_key = u32::from_le_bytes(*scramble_key);
    let mut data = data.to_vec();
    transform(&key, &mut data, scramble_key, IceKey::decrypt_block);
    scramble_data(&mut data, scramble_key, false);
    Ok(data)
}

/// Applies `block_fn` to every whole block of `data` in place and masks the
/// trailing partial block, if any.
fn transform(
    key: &IceKey,
    data: &mut [u8],
    scramble_key: u32,
    block_fn: fn(&IceKey, &[u8; 8]) -> [u8; 8],
) {
    let (blocks, tail) = data.as_chunks_mut::<BLOCK_SIZE>();
    for block in blocks {
        *block = block_fn(key, block);
    }

    if !tail.is_empty() {
        // the mask is always produced by encryption, so it matches both ways
        let mask = key.encrypt_block(&tail_seed(scramble_key));
        for (b, m) in tail.iter_mut().zip(mask) {
            *b ^= m;
        }
    }
}

fn tail_seed(scramble_key: u32) -> [u8; 8] {
    let [a, b, c, d] = scramble_key.to_le_bytes();
    [a, b, c, d, !a, !b, !c, !d]
}
