use crate::errors::ErrorCode;
use crate::{
    EntryRange, Raffle, RaffleRegistry, TicketsDeposited, ENTRY_SEED, RAFFLE_SEED,
    REGISTRY_SEED, VAULT_SIGNER_SEED,
};
use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token::{Mint, Token, TokenAccount, Transfer},
};

pub fn deposit_tickets(
    mut ctx: Context<DepositTickets>,
    raffle_id: u64,
    item_index: u8,
    quantity: u64,
) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let entrant = ctx.accounts.entrant.key();
    let ticket_mint = ctx.accounts.ticket_mint.key();

    let first_entry = !ctx.accounts.entry_range.is_recorded();
    let span = {
        let accounts = &mut ctx.accounts;
        accounts.raffle.enter(
            item_index,
            ticket_mint,
            entrant,
            quantity,
            &mut accounts.entry_range,
            now,
        )?
    };
    if first_entry {
        ctx.accounts.entry_range.bump =
            *ctx.bumps.get("entry_range").ok_or(ErrorCode::MissingBump)?;
    }

    // a failed transfer aborts the transaction, so the ledger update above
    // is rolled back with it
    anchor_spl::token::transfer(ctx.accounts.transfer_tickets_to_vault(), quantity)?;

    let total_entered = ctx.accounts.raffle.item(item_index)?.total_entered;
    msg!(
        "Entrant {} deposited {} tickets into raffle {} item {}",
        entrant,
        quantity,
        raffle_id,
        item_index
    );
    msg!("tickets [{}, {})", span.end - quantity, span.end);

    emit!(TicketsDeposited {
        raffle_id,
        item_index,
        entrant,
        quantity,
        range_start: span.end - quantity,
        range_end: span.end,
        total_entered,
        timestamp: now,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(raffle_id: u64, item_index: u8)]
pub struct DepositTickets<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    #[account(
        mut,
        seeds = [RAFFLE_SEED, &raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    #[account(
        init_if_needed,
        space = 8 + EntryRange::MAX_SIZE,
        payer = entrant,
        seeds = [
            ENTRY_SEED,
            &raffle_id.to_le_bytes(),
            &[item_index],
            entrant.key().as_ref(),
        ],
        bump,
    )]
    pub entry_range: Box<Account<'info, EntryRange>>,
    pub ticket_mint: Account<'info, Mint>,
    #[account(
        mut,
        token::mint = ticket_mint,
        token::authority = entrant,
    )]
    pub entrant_token_account: Box<Account<'info, TokenAccount>>,
    #[account(
        init_if_needed,
        payer = entrant,
        associated_token::mint = ticket_mint,
        associated_token::authority = vault_signer,
    )]
    pub ticket_vault: Box<Account<'info, TokenAccount>>,
    /// CHECK: This is the vault signer Acct
    #[account(
        seeds = [VAULT_SIGNER_SEED],
        bump = registry.vault_signer_bump,
    )]
    pub vault_signer: AccountInfo<'info>,
    #[account(mut)]
    pub entrant: Signer<'info>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub rent: Sysvar<'info, Rent>,
    pub system_program: Program<'info, System>,
}

impl<'info> DepositTickets<'info> {
    pub fn transfer_tickets_to_vault(&self) -> CpiContext<'_, '_, '_, 'info, Transfer<'info>> {
        let transfer_acct = Transfer {
            from: self.entrant_token_account.to_account_info(),
            to: self.ticket_vault.to_account_info(),
            authority: self.entrant.to_account_info(),
        };
        CpiContext::new(self.token_program.to_account_info(), transfer_acct)
    }
}
