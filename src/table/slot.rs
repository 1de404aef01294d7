//! Page file slots

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, VaultError};

use super::{TableLayout, NO_SLOT};

pub(crate) const SLOT_FREE: u8 = 0;
pub(crate) const SLOT_LIVE: u8 = 1;

/// State (1) + Next (8) + CRC32 (4)
pub(crate) const SLOT_OVERHEAD: usize = 13;

/// One decoded page file slot
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub state: u8,
    pub next: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Slot {
    pub fn live(next: u64, key: &[u8], value: &[u8]) -> Self {
        Self {
            state: SLOT_LIVE,
            next,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    pub fn free(layout: TableLayout) -> Self {
        Self {
            state: SLOT_FREE,
            next: NO_SLOT,
            key: vec![0; layout.key_size],
            value: vec![0; layout.value_size],
        }
    }

    pub fn is_live(&self) -> bool {
        self.state == SLOT_LIVE
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf =
            BytesMut::with_capacity(SLOT_OVERHEAD + self.key.len() + self.value.len());
        buf.put_u8(self.state);
        buf.put_u64_le(self.next);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);
        buf.to_vec()
    }

    /// Decode slot `index` and verify its checksum
    pub fn decode(bytes: &[u8], layout: TableLayout, index: u64) -> Result<Self> {
        if bytes.len() != layout.slot_size() {
            return Err(VaultError::Corruption(format!(
                "Slot {} is {} bytes, expected {}",
                index,
                bytes.len(),
                layout.slot_size()
            )));
        }

        let (body, mut crc_bytes) = bytes.split_at(bytes.len() - 4);
        let stored_crc = crc_bytes.get_u32_le();
        let computed_crc = crc32fast::hash(body);
        if stored_crc != computed_crc {
            return Err(VaultError::Corruption(format!(
                "Slot {} checksum mismatch: stored {:#010x}, computed {:#010x}",
                index, stored_crc, computed_crc
            )));
        }

        let mut buf = body;
        let state = buf.get_u8();
        if state != SLOT_FREE && state != SLOT_LIVE {
            return Err(VaultError::Corruption(format!(
                "Slot {} has unknown state {}",
                index, state
            )));
        }
        let next = buf.get_u64_le();
        let key = buf[..layout.key_size].to_vec();
        let value = buf[layout.key_size..layout.key_size + layout.value_size].to_vec();

        Ok(Self {
            state,
            next,
            key,
            value,
        })
    }
}
