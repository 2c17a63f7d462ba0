//! Block cipher gate for encrypted containers.
//!
//! Encrypted containers carry their own key and a block size in the header.
//! The payload is processed in independent chunks of `block_size` bytes so
//! that a reader can decrypt any chunk without touching its neighbours.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// AES block length in bytes.
pub const AES_BLOCK: usize = 16;

/// A keyed block transform applied to container payloads.
///
/// Implementations work in place; the payload length never changes.
pub trait BlockCipher: Send + Sync {
    /// Decrypt `data` in place.
    fn decrypt(&self, key: &[u8], data: &mut [u8], block_size: u16) -> Result<()>;

    /// Encrypt `data` in place. Inverse of [`decrypt`](Self::decrypt).
    fn encrypt(&self, key: &[u8], data: &mut [u8], block_size: u16) -> Result<()>;
}

/// AES-128-CBC applied per chunk with a zero IV.
///
/// Each chunk of `block_size` bytes (the whole payload when `block_size` is
/// zero) has its 16-byte-aligned prefix transformed; a tail shorter than one
/// AES block is left as-is. The key is the first 16 bytes of the container
/// key, zero-padded when shorter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128Gate;

/// A gate that leaves data untouched, for unobfuscated dumps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

const ZERO_IV: [u8; AES_BLOCK] = [0u8; AES_BLOCK];

fn derive_key(key: &[u8]) -> [u8; AES_BLOCK] {
    let mut out = [0u8; AES_BLOCK];
    let len = key.len().min(AES_BLOCK);
    out[..len].copy_from_slice(&key[..len]);
    out
}

fn chunks(data: &mut [u8], block_size: u16) -> std::slice::ChunksMut<'_, u8> {
    let size = match block_size {
        0 => data.len().max(1),
        n => n as usize,
    };
    data.chunks_mut(size)
}

#[inline]
fn aligned(chunk: &mut [u8]) -> &mut [u8] {
    let len = chunk.len() - chunk.len() % AES_BLOCK;
    &mut chunk[..len]
}

impl BlockCipher for Aes128Gate {
    fn decrypt(&self, key: &[u8], data: &mut [u8], block_size: u16) -> Result<()> {
        let key = derive_key(key);
        for chunk in chunks(data, block_size) {
            let body = aligned(chunk);
            if body.is_empty() {
                continue;
            }
            Aes128CbcDec::new(
                GenericArray::from_slice(&key),
                GenericArray::from_slice(&ZERO_IV),
            )
            .decrypt_padded_mut::<NoPadding>(body)
            .map_err(|e| Error::Decryption(e.to_string()))?;
        }
        Ok(())
    }

    fn encrypt(&self, key: &[u8], data: &mut [u8], block_size: u16) -> Result<()> {
        let key = derive_key(key);
        for chunk in chunks(data, block_size) {
            let body = aligned(chunk);
            if body.is_empty() {
                continue;
            }
            let len = body.len();
            Aes128CbcEnc::new(
                GenericArray::from_slice(&key),
                GenericArray::from_slice(&ZERO_IV),
            )
            .encrypt_padded_mut::<NoPadding>(body, len)
            .map_err(|e| Error::Decryption(e.to_string()))?;
        }
        Ok(())
    }
}

impl BlockCipher for Passthrough {
    fn decrypt(&self, _key: &[u8], _data: &mut [u8], _block_size: u16) -> Result<()> {
        Ok(())
    }

    fn encrypt(&self, _key: &[u8], _data: &mut [u8], _block_size: u16) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_encrypt_then_decrypt_chunked() {
        let original: Vec<u8> = (0..100u8).collect();
        let mut data = original.clone();

        Aes128Gate.encrypt(KEY, &mut data, 48).unwrap();
        assert_ne!(data, original);
        // 100 = 48 + 48 + 4; the 4-byte tail is below one AES block.
        assert_eq!(&data[96..], &original[96..]);

        Aes128Gate.decrypt(KEY, &mut data, 48).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_chunks_are_independent() {
        let mut whole = vec![7u8; 64];
        Aes128Gate.encrypt(KEY, &mut whole, 32).unwrap();
        assert_eq!(whole[..32], whole[32..]);
    }

    #[test]
    fn test_zero_block_size_spans_payload() {
        let mut data = vec![1u8; 40];
        Aes128Gate.encrypt(KEY, &mut data, 0).unwrap();
        assert_eq!(&data[32..], &[1u8; 8]);
        Aes128Gate.decrypt(KEY, &mut data, 0).unwrap();
        assert_eq!(data, vec![1u8; 40]);
    }

    #[test]
    fn test_short_key_is_padded() {
        assert_eq!(derive_key(b"ab")[..3], [b'a', b'b', 0]);
        assert_eq!(derive_key(&[9u8; 32]), [9u8; 16]);
    }

    #[test]
    fn test_empty_payload() {
        let mut data: Vec<u8> = Vec::new();
        Aes128Gate.decrypt(KEY, &mut data, 16).unwrap();
        assert!(data.is_empty());
    }
}
