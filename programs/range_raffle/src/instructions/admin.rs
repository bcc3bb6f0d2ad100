use crate::errors::ErrorCode;
use crate::{
    PrizeFunded, Raffle, RaffleCreated, RaffleItemParams, RaffleRegistry, RAFFLE_SEED,
    REGISTRY_SEED, VAULT_SIGNER_SEED,
};
use anchor_lang::{prelude::*, solana_program};
use anchor_spl::{
    associated_token::AssociatedToken,
    token::{Mint, Token, TokenAccount, Transfer},
};
use switchboard_v2::{VrfAccountData, SWITCHBOARD_PROGRAM_ID};

pub fn initialize_registry(
    ctx: Context<InitializeRegistry>,
    params: InitializeRegistryParams,
) -> Result<()> {
    msg!("Initializing raffle registry");
    let bump = *ctx.bumps.get("registry").ok_or(ErrorCode::MissingBump)?;
    let vault_signer_bump = *ctx
        .bumps
        .get("vault_signer")
        .ok_or(ErrorCode::MissingBump)?;

    let owner = ctx.accounts.owner.key();
    ctx.accounts.registry.init(
        bump,
        vault_signer_bump,
        owner,
        params.oracle,
        params.key_hash,
        params.capabilities,
    )?;

    msg!("owner: {}", owner);
    msg!("oracle: {}", params.oracle);
    Ok(())
}

pub fn set_vrf_account(ctx: Context<SetVrfAccount>) -> Result<()> {
    msg!("Checking VRF Account");
    let vrf = ctx.accounts.vrf.load()?;
    // the registry PDA signs randomness requests, so it must own the VRF
    if vrf.authority != ctx.accounts.registry.key() {
        return Err(error!(ErrorCode::InvalidAuthorityError));
    }
    drop(vrf);

    ctx.accounts.registry.vrf = ctx.accounts.vrf.key();
    msg!("vrf: {}", ctx.accounts.registry.vrf);
    Ok(())
}

pub fn create_raffle(
    ctx: Context<CreateRaffle>,
    raffle_id: u64,
    params: CreateRaffleParams,
) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let bump = *ctx.bumps.get("raffle").ok_or(ErrorCode::MissingBump)?;

    ctx.accounts.registry.register_raffle(raffle_id)?;
    ctx.accounts
        .raffle
        .init(raffle_id, bump, params.close_time, &params.items, now)?;

    msg!("Raffle {} created, closes at {}", raffle_id, params.close_time);
    emit!(RaffleCreated {
        raffle_id,
        close_time: params.close_time,
        items: params.items,
        timestamp: now,
    });
    Ok(())
}

pub fn fund_prize(
    ctx: Context<FundPrize>,
    raffle_id: u64,
    item_index: u8,
    prize_index: u8,
) -> Result<()> {
    let prize = ctx.accounts.raffle.fund_prize(
        item_index,
        prize_index,
        ctx.accounts.prize_mint.key(),
    )?;

    anchor_spl::token::transfer(
        ctx.accounts.transfer_prize_to_vault(),
        prize.quantity as u64,
    )?;

    msg!(
        "Funded raffle {} item {} prize {} with {}",
        raffle_id,
        item_index,
        prize_index,
        prize.quantity
    );
    emit!(PrizeFunded {
        raffle_id,
        item_index,
        prize_index,
        mint: prize.mint,
        quantity: prize.quantity,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}

#[derive(Clone, AnchorSerialize, AnchorDeserialize)]
pub struct InitializeRegistryParams {
    pub oracle: Pubkey,
    pub key_hash: [u8; 32],
    pub capabilities: Vec<[u8; 4]>,
}

#[derive(Accounts)]
pub struct InitializeRegistry<'info> {
    #[account(
        init,
        space = 8 + RaffleRegistry::MAX_SIZE,
        payer = owner,
        seeds = [REGISTRY_SEED],
        bump,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    /// CHECK: custody authority of every ticket and prize vault
    #[account(
        seeds = [VAULT_SIGNER_SEED],
        bump,
    )]
    pub vault_signer: AccountInfo<'info>,
    #[account(mut)]
    pub owner: Signer<'info>,
    #[account(address = solana_program::system_program::ID)]
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SetVrfAccount<'info> {
    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        constraint = registry.is_owner(&owner.key()) @ ErrorCode::Unauthorized,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    pub owner: Signer<'info>,
    #[account(
        constraint =
            *vrf.to_account_info().owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub vrf: AccountLoader<'info, VrfAccountData>,
}

#[derive(Clone, AnchorSerialize, AnchorDeserialize)]
pub struct CreateRaffleParams {
    pub close_time: i64,
    pub items: Vec<RaffleItemParams>,
}

#[derive(Accounts)]
#[instruction(raffle_id: u64)]
pub struct CreateRaffle<'info> {
    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        constraint = registry.is_owner(&owner.key()) @ ErrorCode::Unauthorized,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    #[account(
        init,
        space = 8 + Raffle::MAX_SIZE,
        payer = owner,
        seeds = [RAFFLE_SEED, &raffle_id.to_le_bytes()],
        bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    #[account(mut)]
    pub owner: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(raffle_id: u64)]
pub struct FundPrize<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        constraint = registry.is_owner(&owner.key()) @ ErrorCode::Unauthorized,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    #[account(
        mut,
        seeds = [RAFFLE_SEED, &raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    pub prize_mint: Account<'info, Mint>,
    #[account(
        mut,
        token::mint = prize_mint,
        token::authority = owner,
    )]
    pub owner_token_account: Box<Account<'info, TokenAccount>>,
    #[account(
        init_if_needed,
        payer = owner,
        associated_token::mint = prize_mint,
        associated_token::authority = vault_signer,
    )]
    pub prize_vault: Box<Account<'info, TokenAccount>>,
    /// CHECK: This is the vault signer Acct
    #[account(
        seeds = [VAULT_SIGNER_SEED],
        bump = registry.vault_signer_bump,
    )]
    pub vault_signer: AccountInfo<'info>,
    #[account(mut)]
    pub owner: Signer<'info>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub rent: Sysvar<'info, Rent>,
    pub system_program: Program<'info, System>,
}

impl<'info> FundPrize<'info> {
    pub fn transfer_prize_to_vault(&self) -> CpiContext<'_, '_, '_, 'info, Transfer<'info>> {
        let transfer_acct = Transfer {
            from: self.owner_token_account.to_account_info(),
            to: self.prize_vault.to_account_info(),
            authority: self.owner.to_account_info(),
        };
        CpiContext::new(self.token_program.to_account_info(), transfer_acct)
    }
}
