use crate::errors::ErrorCode;
use crate::{
    EntryRange, Raffle, RaffleRegistry, ENTRANTS_PAGE_SIZE, ENTRY_SEED, RAFFLE_SEED,
    REGISTRY_SEED,
};
use anchor_lang::prelude::*;
use anchor_lang::solana_program::program::set_return_data;

// Results go out as borsh-encoded return data, which is capped at 1024
// bytes. The entrant list is paged for that reason.
fn publish<T: AnchorSerialize>(value: &T) -> Result<()> {
    set_return_data(&value.try_to_vec()?);
    Ok(())
}

pub fn raffle_summary(ctx: Context<ViewRaffle>, _raffle_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    publish(&ctx.accounts.raffle.summary(now))
}

pub fn raffle_count(ctx: Context<ViewRegistry>) -> Result<()> {
    publish(&ctx.accounts.registry.raffle_count)
}

pub fn raffle_entrants(ctx: Context<ViewRaffle>, _raffle_id: u64, page: u16) -> Result<()> {
    let entrants = &ctx.accounts.raffle.entrants;
    let start = (page as usize)
        .checked_mul(ENTRANTS_PAGE_SIZE)
        .ok_or(ErrorCode::ArithmeticOverflow)?
        .min(entrants.len());
    let end = (start + ENTRANTS_PAGE_SIZE).min(entrants.len());
    publish(&entrants[start..end].to_vec())
}

pub fn entry_range(
    ctx: Context<ViewEntryRange>,
    raffle_id: u64,
    item_index: u8,
    entrant: Pubkey,
) -> Result<()> {
    let range =
        EntryRange::load_or_empty(&ctx.accounts.entry_range, raffle_id, item_index, entrant)?;
    publish(&range.spans)
}

pub fn owns_ticket(
    ctx: Context<ViewEntryRange>,
    raffle_id: u64,
    item_index: u8,
    entrant: Pubkey,
    ticket: u64,
) -> Result<()> {
    let range =
        EntryRange::load_or_empty(&ctx.accounts.entry_range, raffle_id, item_index, entrant)?;
    publish(&range.owns_ticket(ticket))
}

pub fn winning_ticket(
    ctx: Context<ViewRaffle>,
    _raffle_id: u64,
    item_index: u8,
    slot: u16,
) -> Result<()> {
    let ticket = ctx.accounts.raffle.winning_ticket(item_index, slot)?;
    publish(&ticket)
}

pub fn supports_capability(ctx: Context<ViewRegistry>, id: [u8; 4]) -> Result<()> {
    publish(&ctx.accounts.registry.supports_capability(&id))
}

#[derive(Accounts)]
#[instruction(raffle_id: u64)]
pub struct ViewRaffle<'info> {
    #[account(
        seeds = [RAFFLE_SEED, &raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
}

#[derive(Accounts)]
pub struct ViewRegistry<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
}

#[derive(Accounts)]
#[instruction(raffle_id: u64, item_index: u8, entrant: Pubkey)]
pub struct ViewEntryRange<'info> {
    /// CHECK: may not exist yet; loaded by hand
    #[account(
        seeds = [
            ENTRY_SEED,
            &raffle_id.to_le_bytes(),
            &[item_index],
            entrant.as_ref(),
        ],
        bump,
    )]
    pub entry_range: UncheckedAccount<'info>,
}
