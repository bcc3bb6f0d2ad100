use crate::errors::ErrorCode;
use crate::{
    ClaimRejected, ClaimTarget, EntryRange, PrizeClaimed, Raffle, RaffleRegistry, VerifiedClaim,
    CLAIM_ACCOUNTS_PER_TARGET, ENTRY_SEED, PRIZE_UNITS_PER_SLOT, RAFFLE_SEED, REGISTRY_SEED,
    VAULT_SIGNER_SEED,
};
use anchor_lang::error::ERROR_CODE_OFFSET;
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount, Transfer};
use std::collections::BTreeMap;

pub fn claim_prize(
    ctx: Context<ClaimPrize>,
    raffle_id: u64,
    item_index: u8,
    slot: u16,
    entrant: Pubkey,
) -> Result<()> {
    let caller = ctx.accounts.caller.key();
    let caller_authorized = caller == entrant || ctx.accounts.registry.is_owner(&caller);
    let range =
        EntryRange::load_or_empty(&ctx.accounts.entry_range, raffle_id, item_index, entrant)?;

    let claim = ctx.accounts.raffle.verify_claim(
        item_index,
        slot,
        entrant,
        caller_authorized,
        &range,
    )?;
    require_keys_eq!(
        ctx.accounts.prize_mint.key(),
        claim.prize_mint,
        ErrorCode::InvalidPrizeMint
    );
    ctx.accounts.raffle.record_claim(&claim)?;

    pay_prize(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.prize_vault.to_account_info(),
        ctx.accounts.recipient.to_account_info(),
        ctx.accounts.vault_signer.to_account_info(),
        ctx.accounts.registry.vault_signer_bump,
    )?;

    msg!(
        "Raffle {} item {} slot {} won by {} with ticket {}",
        raffle_id,
        item_index,
        slot,
        entrant,
        claim.ticket
    );
    emit_claimed(raffle_id, &claim)
}

/// Settles several `(item, slot)` pairs for one entrant. Each target brings
/// its own `[entry_range, prize_vault, recipient]` triple in the remaining
/// accounts, in target order. A target that fails verification is reported
/// through `ClaimRejected` and skipped.
pub fn claim_prizes<'a, 'b, 'c, 'info>(
    ctx: Context<'a, 'b, 'c, 'info, ClaimPrizes<'info>>,
    raffle_id: u64,
    entrant: Pubkey,
    targets: Vec<ClaimTarget>,
) -> Result<()> {
    require!(
        ctx.remaining_accounts.len() == targets.len() * CLAIM_ACCOUNTS_PER_TARGET,
        ErrorCode::InvalidClaimAccounts
    );
    let remaining = ctx.remaining_accounts;
    let caller = ctx.accounts.caller.key();
    let caller_authorized = caller == entrant || ctx.accounts.registry.is_owner(&caller);
    let vault_signer = ctx.accounts.vault_signer.key();
    let vault_signer_bump = ctx.accounts.registry.vault_signer_bump;
    let now = Clock::get()?.unix_timestamp;

    // units already promised out of each vault earlier in this batch
    let mut reserved: BTreeMap<Pubkey, u64> = BTreeMap::new();
    let results = ctx.accounts.raffle.settle_claims(
        &targets,
        entrant,
        caller_authorized,
        |i, target| {
            EntryRange::load_or_empty(
                &remaining[i * CLAIM_ACCOUNTS_PER_TARGET],
                raffle_id,
                target.item_index,
                entrant,
            )
        },
        |i, claim| {
            let vault_info = &remaining[i * CLAIM_ACCOUNTS_PER_TARGET + 1];
            let vault = PayoutAccount::load(vault_info)?;
            let recipient = PayoutAccount::load(&remaining[i * CLAIM_ACCOUNTS_PER_TARGET + 2])?;
            let pending = reserved.get(vault_info.key).copied().unwrap_or(0);
            check_payout(claim, &vault, &recipient, &vault_signer, pending)?;
            *reserved.entry(*vault_info.key).or_insert(0) += PRIZE_UNITS_PER_SLOT;
            Ok(())
        },
    );

    let mut settled = 0;
    for (i, (target, result)) in targets.iter().zip(results.iter()).enumerate() {
        let claim = match result {
            Ok(claim) => claim,
            Err(err) => {
                msg!(
                    "Rejected item {} slot {}: {:?}",
                    target.item_index,
                    target.slot,
                    err
                );
                emit!(ClaimRejected {
                    raffle_id,
                    item_index: target.item_index,
                    slot: target.slot,
                    entrant,
                    error_code: ERROR_CODE_OFFSET + *err as u32,
                    timestamp: now,
                });
                continue;
            }
        };

        pay_prize(
            ctx.accounts.token_program.to_account_info(),
            remaining[i * CLAIM_ACCOUNTS_PER_TARGET + 1].clone(),
            remaining[i * CLAIM_ACCOUNTS_PER_TARGET + 2].clone(),
            ctx.accounts.vault_signer.to_account_info(),
            vault_signer_bump,
        )?;
        emit_claimed(raffle_id, claim)?;
        settled += 1;
    }

    msg!("Settled {} of {} claims", settled, targets.len());
    Ok(())
}

/// The token account fields a batched payout depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoutAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub frozen: bool,
    pub writable: bool,
}

impl PayoutAccount {
    pub fn load(info: &AccountInfo) -> std::result::Result<PayoutAccount, ErrorCode> {
        let account = Account::<TokenAccount>::try_from(info)
            .map_err(|_| ErrorCode::InvalidClaimAccounts)?;
        Ok(PayoutAccount {
            mint: account.mint,
            owner: account.owner,
            amount: account.amount,
            frozen: account.is_frozen(),
            writable: info.is_writable,
        })
    }
}

/// Everything a batched target's accounts have to satisfy before its
/// transfer, so a target that passes cannot fail halfway through the batch.
/// `reserved` is what earlier targets of the batch already draw from the
/// same vault.
pub fn check_payout(
    claim: &VerifiedClaim,
    vault: &PayoutAccount,
    recipient: &PayoutAccount,
    vault_signer: &Pubkey,
    reserved: u64,
) -> std::result::Result<(), ErrorCode> {
    let needed = reserved
        .checked_add(PRIZE_UNITS_PER_SLOT)
        .ok_or(ErrorCode::ArithmeticOverflow)?;
    if !vault.writable
        || vault.mint != claim.prize_mint
        || vault.owner != *vault_signer
        || vault.amount < needed
        || vault.frozen
    {
        return Err(ErrorCode::InvalidClaimAccounts);
    }
    if !recipient.writable
        || recipient.mint != claim.prize_mint
        || recipient.owner != claim.entrant
        || recipient.frozen
    {
        return Err(ErrorCode::InvalidClaimAccounts);
    }
    Ok(())
}

fn pay_prize<'info>(
    token_program: AccountInfo<'info>,
    from: AccountInfo<'info>,
    to: AccountInfo<'info>,
    vault_signer: AccountInfo<'info>,
    vault_signer_bump: u8,
) -> Result<()> {
    let pda_seeds: &[&[&[u8]]] = &[&[VAULT_SIGNER_SEED, &[vault_signer_bump]]];
    let transfer_acct = Transfer {
        from,
        to,
        authority: vault_signer,
    };
    anchor_spl::token::transfer(
        CpiContext::new(token_program, transfer_acct).with_signer(pda_seeds),
        PRIZE_UNITS_PER_SLOT,
    )
}

fn emit_claimed(raffle_id: u64, claim: &VerifiedClaim) -> Result<()> {
    emit!(PrizeClaimed {
        raffle_id,
        item_index: claim.item_index,
        slot: claim.slot,
        ticket: claim.ticket,
        entrant: claim.entrant,
        prize_mint: claim.prize_mint,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}

#[derive(Accounts)]
#[instruction(raffle_id: u64, item_index: u8, slot: u16, entrant: Pubkey)]
pub struct ClaimPrize<'info> {
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
    /// CHECK: absent for an entrant who never deposited; loaded by hand
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
    pub prize_mint: Account<'info, Mint>,
    #[account(
        mut,
        associated_token::mint = prize_mint,
        associated_token::authority = vault_signer,
    )]
    pub prize_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = prize_mint,
        constraint = recipient.owner == entrant @ ErrorCode::InvalidClaimAccounts,
    )]
    pub recipient: Box<Account<'info, TokenAccount>>,
    /// CHECK: This is the vault signer Acct
    #[account(
        seeds = [VAULT_SIGNER_SEED],
        bump = registry.vault_signer_bump,
    )]
    pub vault_signer: AccountInfo<'info>,
    pub caller: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
#[instruction(raffle_id: u64)]
pub struct ClaimPrizes<'info> {
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
    /// CHECK: This is the vault signer Acct
    #[account(
        seeds = [VAULT_SIGNER_SEED],
        bump = registry.vault_signer_bump,
    )]
    pub vault_signer: AccountInfo<'info>,
    pub caller: Signer<'info>,
    pub token_program: Program<'info, Token>,
}
