use crate::errors::ErrorCode;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hashv;

/// Outstanding randomness request, keyed by its handle. Closed once the
/// request is fulfilled, so a handle can be consumed only once.
#[account]
#[derive(Default)]
pub struct RandomnessRequest {
    pub bump: u8,
    pub raffle_id: u64,
    pub handle: [u8; 32],
    pub nonce: u64,
    pub requester: Pubkey,
    pub requested_at: i64,
}

impl RandomnessRequest {
    pub const MAX_SIZE: usize = 1 + 8 + 32 + 8 + 32 + 8;

    /// `sha256(key_hash ‖ nonce ‖ entropy ‖ requester)`. The nonce keeps two
    /// requests from the same requester apart even with equal entropy.
    pub fn derive_handle(
        key_hash: &[u8; 32],
        nonce: u64,
        entropy: &[u8; 32],
        requester: &Pubkey,
    ) -> [u8; 32] {
        hashv(&[key_hash, &nonce.to_le_bytes(), entropy, requester.as_ref()]).to_bytes()
    }

    /// Loads the request stored at `info`. A handle that was never issued,
    /// or was already fulfilled and closed, is an unknown request.
    pub fn load_outstanding(
        info: &AccountInfo,
        raffle_id: u64,
        requester: &Pubkey,
    ) -> std::result::Result<RandomnessRequest, ErrorCode> {
        if info.data_is_empty() || *info.owner != crate::ID {
            return Err(ErrorCode::UnknownRequest);
        }
        let data = info
            .try_borrow_data()
            .map_err(|_| ErrorCode::UnknownRequest)?;
        let request = RandomnessRequest::try_deserialize(&mut &data[..])
            .map_err(|_| ErrorCode::UnknownRequest)?;
        if request.raffle_id != raffle_id || request.requester != *requester {
            return Err(ErrorCode::UnknownRequest);
        }
        Ok(request)
    }
}

#[event]
pub struct RandomnessRequested {
    pub raffle_id: u64,
    pub handle: [u8; 32],
    pub nonce: u64,
    pub requester: Pubkey,
    pub vrf: bool,
    pub timestamp: i64,
}

#[event]
pub struct RandomnessFulfilled {
    pub raffle_id: u64,
    pub handle: [u8; 32],
    pub random_value: u128,
    pub timestamp: i64,
}
