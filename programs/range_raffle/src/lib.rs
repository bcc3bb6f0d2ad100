pub mod errors;
pub mod instructions;
pub mod state;
pub mod winner;

pub use instructions::*;
pub use state::*;

use anchor_lang::prelude::*;

declare_id!("AWgU4rH7qUQhS89j9EZwbMkrfRediKzjW6XBcYM6q88g");

const REGISTRY_SEED: &[u8] = b"registry";
const RAFFLE_SEED: &[u8] = b"raffle";
const ENTRY_SEED: &[u8] = b"entry";
const REQUEST_SEED: &[u8] = b"request";
const VAULT_SIGNER_SEED: &[u8] = b"vault_signer";

// account capacity
pub const MAX_ITEMS: usize = 4;
pub const MAX_PRIZES_PER_ITEM: usize = 4;
pub const MAX_SLOTS_PER_ITEM: usize = 16;
pub const MAX_ENTRANTS: usize = 128;
pub const MAX_SPANS: usize = 16;
pub const MAX_CAPABILITIES: usize = 8;

/// Base units of the prize mint paid out per winning slot.
pub const PRIZE_UNITS_PER_SLOT: u64 = 1;
/// `[entry_range, prize_vault, recipient]` per batched claim target.
pub const CLAIM_ACCOUNTS_PER_TARGET: usize = 3;
pub const ENTRANTS_PAGE_SIZE: usize = 30;

#[program]
pub mod range_raffle {

    use super::*;

    pub fn initialize_registry(
        ctx: Context<InitializeRegistry>,
        params: InitializeRegistryParams,
    ) -> Result<()> {
        instructions::admin::initialize_registry(ctx, params)
    }

    pub fn set_vrf_account(ctx: Context<SetVrfAccount>) -> Result<()> {
        instructions::admin::set_vrf_account(ctx)
    }

    pub fn create_raffle(
        ctx: Context<CreateRaffle>,
        raffle_id: u64,
        params: CreateRaffleParams,
    ) -> Result<()> {
        instructions::admin::create_raffle(ctx, raffle_id, params)
    }

    pub fn fund_prize(
        ctx: Context<FundPrize>,
        raffle_id: u64,
        item_index: u8,
        prize_index: u8,
    ) -> Result<()> {
        instructions::admin::fund_prize(ctx, raffle_id, item_index, prize_index)
    }

    pub fn deposit_tickets(
        ctx: Context<DepositTickets>,
        raffle_id: u64,
        item_index: u8,
        quantity: u64,
    ) -> Result<()> {
        instructions::entry::deposit_tickets(ctx, raffle_id, item_index, quantity)
    }

    pub fn draw(ctx: Context<Draw>, params: DrawParams) -> Result<()> {
        instructions::randomness::draw(ctx, params)
    }

    pub fn draw_with_vrf(ctx: Context<DrawWithVrf>, params: VrfDrawParams) -> Result<()> {
        instructions::randomness::draw_with_vrf(ctx, params)
    }

    pub fn fulfill_randomness(
        ctx: Context<FulfillRandomness>,
        raffle_id: u64,
        handle: [u8; 32],
        random_value: u128,
    ) -> Result<()> {
        instructions::randomness::fulfill_randomness(ctx, raffle_id, handle, random_value)
    }

    pub fn consume_vrf_randomness(
        ctx: Context<ConsumeVrfRandomness>,
        raffle_id: u64,
        handle: [u8; 32],
    ) -> Result<()> {
        instructions::randomness::consume_vrf_randomness(ctx, raffle_id, handle)
    }

    pub fn claim_prize(
        ctx: Context<ClaimPrize>,
        raffle_id: u64,
        item_index: u8,
        slot: u16,
        entrant: Pubkey,
    ) -> Result<()> {
        instructions::claim::claim_prize(ctx, raffle_id, item_index, slot, entrant)
    }

    pub fn claim_prizes<'a, 'b, 'c, 'info>(
        ctx: Context<'a, 'b, 'c, 'info, ClaimPrizes<'info>>,
        raffle_id: u64,
        entrant: Pubkey,
        targets: Vec<ClaimTarget>,
    ) -> Result<()> {
        instructions::claim::claim_prizes(ctx, raffle_id, entrant, targets)
    }

    pub fn raffle_summary(ctx: Context<ViewRaffle>, raffle_id: u64) -> Result<()> {
        instructions::views::raffle_summary(ctx, raffle_id)
    }

    pub fn raffle_count(ctx: Context<ViewRegistry>) -> Result<()> {
        instructions::views::raffle_count(ctx)
    }

    pub fn raffle_entrants(ctx: Context<ViewRaffle>, raffle_id: u64, page: u16) -> Result<()> {
        instructions::views::raffle_entrants(ctx, raffle_id, page)
    }

    pub fn entry_range(
        ctx: Context<ViewEntryRange>,
        raffle_id: u64,
        item_index: u8,
        entrant: Pubkey,
    ) -> Result<()> {
        instructions::views::entry_range(ctx, raffle_id, item_index, entrant)
    }

    pub fn owns_ticket(
        ctx: Context<ViewEntryRange>,
        raffle_id: u64,
        item_index: u8,
        entrant: Pubkey,
        ticket: u64,
    ) -> Result<()> {
        instructions::views::owns_ticket(ctx, raffle_id, item_index, entrant, ticket)
    }

    pub fn winning_ticket(
        ctx: Context<ViewRaffle>,
        raffle_id: u64,
        item_index: u8,
        slot: u16,
    ) -> Result<()> {
        instructions::views::winning_ticket(ctx, raffle_id, item_index, slot)
    }

    pub fn supports_capability(ctx: Context<ViewRegistry>, id: [u8; 4]) -> Result<()> {
        instructions::views::supports_capability(ctx, id)
    }
}
