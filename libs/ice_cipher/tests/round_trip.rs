use ice_cipher::{IceKey, decrypt, decrypt_s, encrypt, encrypt_s, scramble_data};

fn pseudo_bytes(len: usize, seed: u32) -> Vec<u8> {
    // small xorshift so the data isn't trivially patterned
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect()
}

#[test]
fn block_round_trip_all_levels() {
    for words in 1..=4usize {
        let key = pseudo_bytes(words * 8, 7 + words as u32);
        for blocks in [1usize, 2, 5, 32] {
            let plain = pseudo_bytes(blocks * 8, 100 + blocks as u32);
            let mut cipher = vec![0u8; plain.len()];
            let mut back = vec![0u8; plain.len()];

            encrypt(&plain, &key, &mut cipher).expect("valid lengths");
            assert_ne!(cipher, plain, "ciphertext must differ from plaintext");

            decrypt(&cipher, &key, &mut back).expect("valid lengths");
            assert_eq!(back, plain, "key {words} words, {blocks} blocks");
        }
    }
}

#[test]
fn thin_ice_round_trip() {
    let mut key = IceKey::new(0);
    key.set(&pseudo_bytes(8, 3)).expect("8 byte key");

    for seed in 0..16 {
        let plain: [u8; 8] = pseudo_bytes(8, seed)
            .try_into()
            .expect("exactly 8 bytes");
        assert_eq!(key.decrypt_block(&key.encrypt_block(&plain)), plain);
    }
}

#[test]
fn wrong_key_does_not_decrypt() {
    let plain = pseudo_bytes(16, 5);
    let mut cipher = vec![0u8; 16];
    let mut back = vec![0u8; 16];

    encrypt(&plain, &[1; 8], &mut cipher).expect("valid lengths");
    decrypt(&cipher, &[2; 8], &mut back).expect("valid lengths");
    assert_ne!(back, plain, "wrong key must not restore the plaintext");
}

#[test]
fn encrypt_s_round_trip() {
    let key = pseudo_bytes(16, 11);
    for len in [1usize, 2, 7, 8, 9, 15, 16, 17, 100] {
        let input = pseudo_bytes(len, len as u32);
        let text = encrypt_s(&input, &key).expect("valid key");

        assert_eq!(text.len(), 2 * (4 + len), "hex of scramble key and data");
        assert_eq!(
            decrypt_s(&text, &key).expect("same key"),
            input,
            "length {len} not restored"
        );
    }
}

#[test]
fn encrypt_s_accepts_lowercase() {
    let key = [9u8; 8];
    let text = encrypt_s(b"lowercase", &key).expect("valid key");
    let back = decrypt_s(&text.to_lowercase(), &key).expect("hex is case-insensitive");
    assert_eq!(back, b"lowercase");
}

#[test]
fn scramble_involution() {
    for key in [0u32, 0x8000_0001, 0xFFFF_FFFF, 0x0BAD_F00D] {
        for len in [2usize, 10, 33, 128] {
            let original = pseudo_bytes(len, key ^ len as u32);
            let mut data = original.clone();
            scramble_data(&mut data, key, true);
            scramble_data(&mut data, key, false);
            assert_eq!(data, original, "len {len} key {key:#x}");
        }
    }
}

#[test]
fn concurrent_first_use() {
    // all threads race to build the s-boxes and must agree on the result
    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(|| {
                IceKey::with_key(&[0; 8])
                    .expect("8 byte key")
                    .encrypt_block(&[0; 8])
            })
        })
        .collect();

    let results: Vec<[u8; 8]> = handles
        .into_iter()
        .map(|h| h.join().expect("thread must not panic"))
        .collect();

    assert!(
        results.windows(2).all(|w| w[0] == w[1]),
        "all threads must see the same tables"
    );
}
