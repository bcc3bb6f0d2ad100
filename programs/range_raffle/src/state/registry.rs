use crate::errors::ErrorCode;
use crate::state::RandomnessRequest;
use crate::MAX_CAPABILITIES;
use anchor_lang::prelude::*;

/// Program-wide raffle registry. Holds the owner capability, the trusted
/// randomness sources, and the raffle id counter.
#[account]
#[derive(Default)]
pub struct RaffleRegistry {
    pub bump: u8,
    pub vault_signer_bump: u8,
    pub owner: Pubkey,
    pub oracle: Pubkey,
    pub vrf: Pubkey,
    pub key_hash: [u8; 32],
    pub request_nonce: u64,
    pub raffle_count: u64,
    pub vrf_pending: Option<[u8; 32]>,
    pub last_vrf_result: [u8; 32],
    pub capabilities: Vec<[u8; 4]>,
}

impl RaffleRegistry {
    pub const MAX_SIZE: usize = 1 + 1
    + 32 //owner
    + 32 //oracle
    + 32 //vrf
    + 32
    + 8
    + 8
    + (1 + 32)
    + 32
    + 4 + (4 * MAX_CAPABILITIES);

    pub fn init(
        &mut self,
        bump: u8,
        vault_signer_bump: u8,
        owner: Pubkey,
        oracle: Pubkey,
        key_hash: [u8; 32],
        capabilities: Vec<[u8; 4]>,
    ) -> std::result::Result<(), ErrorCode> {
        if capabilities.len() > MAX_CAPABILITIES {
            return Err(ErrorCode::TooManyCapabilities);
        }
        self.bump = bump;
        self.vault_signer_bump = vault_signer_bump;
        self.owner = owner;
        self.oracle = oracle;
        self.vrf = Pubkey::default();
        self.key_hash = key_hash;
        self.request_nonce = 0;
        self.raffle_count = 0;
        self.vrf_pending = None;
        self.last_vrf_result = [0u8; 32];
        self.capabilities = capabilities;
        Ok(())
    }

    pub fn is_owner(&self, key: &Pubkey) -> bool {
        self.owner == *key
    }

    pub fn is_oracle(&self, key: &Pubkey) -> bool {
        self.oracle == *key
    }

    pub fn supports_capability(&self, id: &[u8; 4]) -> bool {
        self.capabilities.iter().any(|capability| capability == id)
    }

    /// Claims the next raffle id. Ids are sequential from 1.
    pub fn register_raffle(&mut self, raffle_id: u64) -> std::result::Result<u64, ErrorCode> {
        let next = self
            .raffle_count
            .checked_add(1)
            .ok_or(ErrorCode::ArithmeticOverflow)?;
        if raffle_id != next {
            return Err(ErrorCode::InvalidRaffleId);
        }
        self.raffle_count = next;
        Ok(next)
    }

    /// Derives the handle for a new randomness request and consumes the
    /// current nonce. Returns the handle and the nonce it was built from.
    pub fn issue_request(
        &mut self,
        entropy: &[u8; 32],
        requester: &Pubkey,
    ) -> std::result::Result<([u8; 32], u64), ErrorCode> {
        let nonce = self.request_nonce;
        let handle = RandomnessRequest::derive_handle(&self.key_hash, nonce, entropy, requester);
        self.request_nonce = nonce
            .checked_add(1)
            .ok_or(ErrorCode::ArithmeticOverflow)?;
        Ok((handle, nonce))
    }

    pub fn begin_vrf_round(&mut self, handle: [u8; 32]) -> std::result::Result<(), ErrorCode> {
        if self.vrf == Pubkey::default() {
            return Err(ErrorCode::InvalidSwitchboardAccount);
        }
        if self.vrf_pending.is_some() {
            return Err(ErrorCode::VrfBusy);
        }
        self.vrf_pending = Some(handle);
        Ok(())
    }

    /// Accepts a VRF result for the in-flight round. An empty buffer, or the
    /// buffer of the previous round, means the oracle has not answered yet.
    pub fn finish_vrf_round(
        &mut self,
        handle: [u8; 32],
        result_buffer: [u8; 32],
    ) -> std::result::Result<u128, ErrorCode> {
        if self.vrf_pending != Some(handle) {
            return Err(ErrorCode::UnknownRequest);
        }
        if result_buffer == [0u8; 32] || result_buffer == self.last_vrf_result {
            return Err(ErrorCode::RandomnessNotReady);
        }
        let value: u128 = bytemuck::pod_read_unaligned(&result_buffer[..16]);
        self.vrf_pending = None;
        self.last_vrf_result = result_buffer;
        Ok(value)
    }
}
