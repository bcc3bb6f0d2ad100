use crate::{
    errors::ErrorCode, Raffle, RaffleRegistry, RandomnessFulfilled, RandomnessRequest,
    RandomnessRequested, RAFFLE_SEED, REGISTRY_SEED, REQUEST_SEED,
};

use anchor_lang::{prelude::*, solana_program, AccountsClose};
use anchor_spl::token::{Token, TokenAccount};
use switchboard_v2::SWITCHBOARD_PROGRAM_ID;
pub use switchboard_v2::{
    OracleQueueAccountData, PermissionAccountData, SbState, VrfAccountData, VrfRequestRandomness,
};

#[access_control(ctx.accounts.validate(&ctx, &params))]
pub fn draw(ctx: Context<Draw>, params: DrawParams) -> Result<()> {
    Draw::actuate(ctx, &params)
}

#[access_control(ctx.accounts.validate(&ctx, &params))]
pub fn draw_with_vrf(ctx: Context<DrawWithVrf>, params: VrfDrawParams) -> Result<()> {
    DrawWithVrf::actuate(ctx, &params)
}

#[access_control(ctx.accounts.validate(&ctx, raffle_id, &handle))]
pub fn fulfill_randomness(
    ctx: Context<FulfillRandomness>,
    raffle_id: u64,
    handle: [u8; 32],
    random_value: u128,
) -> Result<()> {
    FulfillRandomness::actuate(ctx, handle, random_value)
}

#[access_control(ctx.accounts.validate(&ctx, raffle_id))]
pub fn consume_vrf_randomness(
    ctx: Context<ConsumeVrfRandomness>,
    raffle_id: u64,
    handle: [u8; 32],
) -> Result<()> {
    ConsumeVrfRandomness::actuate(ctx, handle)
}

/// Client-side inputs of a draw. `handle` is the request handle the client
/// derived from the registry's current nonce; it addresses the request
/// account and is checked against the handle the program derives.
#[derive(Clone, AnchorSerialize, AnchorDeserialize)]
pub struct DrawParams {
    pub raffle_id: u64,
    pub entropy: [u8; 32],
    pub handle: [u8; 32],
}

fn expected_handle(registry: &RaffleRegistry, params: &DrawParams, requester: &Pubkey) -> [u8; 32] {
    RandomnessRequest::derive_handle(
        &registry.key_hash,
        registry.request_nonce,
        &params.entropy,
        requester,
    )
}

/// Moves the raffle to `Requested` and fills in the request account.
/// Shared by both draw paths.
fn open_request(
    registry: &mut RaffleRegistry,
    raffle: &mut Raffle,
    request: &mut RandomnessRequest,
    request_bump: u8,
    requester: Pubkey,
    params: &DrawParams,
    now: i64,
) -> Result<u64> {
    raffle.begin_draw(params.handle, now)?;
    let (handle, nonce) = registry.issue_request(&params.entropy, &requester)?;
    require!(handle == params.handle, ErrorCode::InvalidRequestHandle);

    request.bump = request_bump;
    request.raffle_id = raffle.id;
    request.handle = handle;
    request.nonce = nonce;
    request.requester = requester;
    request.requested_at = now;
    Ok(nonce)
}

#[derive(Accounts)]
#[instruction(params: DrawParams)]
pub struct Draw<'info> {
    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        constraint = registry.is_owner(&owner.key()) @ ErrorCode::Unauthorized,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    #[account(
        mut,
        seeds = [RAFFLE_SEED, &params.raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    #[account(
        init,
        space = 8 + RandomnessRequest::MAX_SIZE,
        payer = owner,
        seeds = [REQUEST_SEED, params.handle.as_ref()],
        bump,
    )]
    pub request: Box<Account<'info, RandomnessRequest>>,
    #[account(mut)]
    pub owner: Signer<'info>,
    #[account(address = solana_program::system_program::ID)]
    pub system_program: Program<'info, System>,
}

impl Draw<'_> {
    pub fn validate(&self, _ctx: &Context<Self>, params: &DrawParams) -> Result<()> {
        msg!("Validate draw");
        require!(
            expected_handle(&self.registry, params, &self.owner.key()) == params.handle,
            ErrorCode::InvalidRequestHandle
        );
        Ok(())
    }

    pub fn actuate(ctx: Context<Self>, params: &DrawParams) -> Result<()> {
        msg!("Actuate draw");
        let now = Clock::get()?.unix_timestamp;
        let bump = *ctx.bumps.get("request").ok_or(ErrorCode::MissingBump)?;
        let requester = ctx.accounts.owner.key();

        let accounts = ctx.accounts;
        let nonce = open_request(
            &mut accounts.registry,
            &mut accounts.raffle,
            &mut accounts.request,
            bump,
            requester,
            params,
            now,
        )?;

        msg!("raffle {} requested randomness, nonce {}", params.raffle_id, nonce);
        emit!(RandomnessRequested {
            raffle_id: params.raffle_id,
            handle: params.handle,
            nonce,
            requester,
            vrf: false,
            timestamp: now,
        });
        Ok(())
    }
}

#[derive(Clone, AnchorSerialize, AnchorDeserialize)]
pub struct VrfDrawParams {
    pub draw: DrawParams,
    pub permission_bump: u8,
    pub switchboard_state_bump: u8,
}

#[derive(Accounts)]
#[instruction(params: VrfDrawParams)] // rpc parameters hint
pub struct DrawWithVrf<'info> {
    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = vrf @ ErrorCode::InvalidVrfAccount,
        constraint = registry.is_owner(&owner.key()) @ ErrorCode::Unauthorized,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    #[account(
        mut,
        seeds = [RAFFLE_SEED, &params.draw.raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    #[account(
        init,
        space = 8 + RandomnessRequest::MAX_SIZE,
        payer = owner,
        seeds = [REQUEST_SEED, params.draw.handle.as_ref()],
        bump,
    )]
    pub request: Box<Account<'info, RandomnessRequest>>,
    #[account(mut)]
    pub owner: Signer<'info>,

    // SWITCHBOARD ACCOUNTS
    #[account(mut,
        has_one = escrow,
        constraint =
            *vrf.to_account_info().owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub vrf: AccountLoader<'info, VrfAccountData>,
    #[account(mut,
        has_one = data_buffer,
        constraint =
            oracle_queue.load()?.authority == queue_authority.key()
            && *oracle_queue.to_account_info().owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub oracle_queue: AccountLoader<'info, OracleQueueAccountData>,
    /// CHECK: Will be checked in the CPI instruction
    pub queue_authority: UncheckedAccount<'info>,
    /// CHECK
    #[account(mut,
        constraint =
            *data_buffer.owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub data_buffer: AccountInfo<'info>,
    #[account(mut,
        constraint =
            *permission.to_account_info().owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub permission: AccountLoader<'info, PermissionAccountData>,
    #[account(mut,
        constraint =
            escrow.owner == program_state.key()
            && escrow.mint == program_state.load()?.token_mint
    )]
    pub escrow: Account<'info, TokenAccount>,
    #[account(mut,
        constraint =
            *program_state.to_account_info().owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub program_state: AccountLoader<'info, SbState>,
    /// CHECK: address and executable flag checked below
    #[account(
        constraint =
            switchboard_program.executable
            && *switchboard_program.key == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub switchboard_program: AccountInfo<'info>,

    // PAYER ACCOUNTS
    #[account(mut,
        constraint =
            payer_wallet.owner == owner.key()
            && payer_wallet.mint == program_state.load()?.token_mint
    )]
    pub payer_wallet: Account<'info, TokenAccount>,

    // SYSTEM ACCOUNTS
    /// CHECK:
    #[account(address = solana_program::sysvar::recent_blockhashes::ID)]
    pub recent_blockhashes: AccountInfo<'info>,
    #[account(address = anchor_spl::token::ID)]
    pub token_program: Program<'info, Token>,
    #[account(address = solana_program::system_program::ID)]
    pub system_program: Program<'info, System>,
}

impl DrawWithVrf<'_> {
    pub fn validate(&self, _ctx: &Context<Self>, params: &VrfDrawParams) -> Result<()> {
        msg!("Validate VRF draw");
        require!(
            expected_handle(&self.registry, &params.draw, &self.owner.key()) == params.draw.handle,
            ErrorCode::InvalidRequestHandle
        );
        require!(self.registry.vrf_pending.is_none(), ErrorCode::VrfBusy);
        Ok(())
    }

    pub fn actuate(ctx: Context<Self>, params: &VrfDrawParams) -> Result<()> {
        msg!("Actuate VRF draw");
        let now = Clock::get()?.unix_timestamp;
        let bump = *ctx.bumps.get("request").ok_or(ErrorCode::MissingBump)?;
        let requester = ctx.accounts.owner.key();

        let accounts = ctx.accounts;
        let nonce = open_request(
            &mut accounts.registry,
            &mut accounts.raffle,
            &mut accounts.request,
            bump,
            requester,
            &params.draw,
            now,
        )?;
        accounts.registry.begin_vrf_round(params.draw.handle)?;

        let vrf_request_randomness = VrfRequestRandomness {
            authority: accounts.registry.to_account_info(),
            vrf: accounts.vrf.to_account_info(),
            oracle_queue: accounts.oracle_queue.to_account_info(),
            queue_authority: accounts.queue_authority.to_account_info(),
            data_buffer: accounts.data_buffer.to_account_info(),
            permission: accounts.permission.to_account_info(),
            escrow: accounts.escrow.clone(),
            payer_wallet: accounts.payer_wallet.clone(),
            payer_authority: accounts.owner.to_account_info(),
            recent_blockhashes: accounts.recent_blockhashes.to_account_info(),
            program_state: accounts.program_state.to_account_info(),
            token_program: accounts.token_program.to_account_info(),
        };

        let registry_bump = accounts.registry.bump;
        msg!("bump: {}", registry_bump);
        msg!("vrf: {}", accounts.vrf.key());

        // the registry PDA is the VRF authority
        let registry_seeds: &[&[&[u8]]] = &[&[REGISTRY_SEED, &[registry_bump]]];
        msg!("requesting randomness");
        vrf_request_randomness.invoke_signed(
            accounts.switchboard_program.to_account_info(),
            params.switchboard_state_bump,
            params.permission_bump,
            registry_seeds,
        )?;

        emit!(RandomnessRequested {
            raffle_id: params.draw.raffle_id,
            handle: params.draw.handle,
            nonce,
            requester,
            vrf: true,
            timestamp: now,
        });

        msg!("randomness requested successfully");
        Ok(())
    }
}

/// Refunds the request rent to the requester. The handle cannot be
/// fulfilled again afterwards.
fn close_request<'info>(
    request: &UncheckedAccount<'info>,
    requester: &AccountInfo<'info>,
) -> Result<()> {
    let request = Account::<RandomnessRequest>::try_from(&request.to_account_info())?;
    request.close(requester.clone())
}

#[derive(Accounts)]
#[instruction(raffle_id: u64, handle: [u8; 32])]
pub struct FulfillRandomness<'info> {
    #[account(
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        constraint = registry.is_oracle(&oracle.key()) @ ErrorCode::UnauthorizedCaller,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    /// CHECK: absent once fulfilled; loaded by hand in validate
    #[account(
        mut,
        seeds = [REQUEST_SEED, handle.as_ref()],
        bump,
    )]
    pub request: UncheckedAccount<'info>,
    #[account(
        mut,
        seeds = [RAFFLE_SEED, &raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    /// CHECK: receives the request rent back, matched against the request
    #[account(mut)]
    pub requester: AccountInfo<'info>,
    pub oracle: Signer<'info>,
}

impl FulfillRandomness<'_> {
    pub fn validate(&self, _ctx: &Context<Self>, raffle_id: u64, handle: &[u8; 32]) -> Result<()> {
        msg!("Validate fulfill");
        RandomnessRequest::load_outstanding(&self.request, raffle_id, &self.requester.key())?;
        // VRF rounds are answered by the VRF account, not the oracle key
        require!(
            self.registry.vrf_pending != Some(*handle),
            ErrorCode::UnknownRequest
        );
        Ok(())
    }

    pub fn actuate(ctx: Context<Self>, handle: [u8; 32], random_value: u128) -> Result<()> {
        msg!("Actuate fulfill");
        let raffle = &mut ctx.accounts.raffle;
        raffle.fulfill(handle, random_value)?;
        close_request(&ctx.accounts.request, &ctx.accounts.requester)?;

        msg!("raffle {} random value {}", raffle.id, random_value);
        emit!(RandomnessFulfilled {
            raffle_id: raffle.id,
            handle,
            random_value,
            timestamp: Clock::get()?.unix_timestamp,
        });
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(raffle_id: u64, handle: [u8; 32])]
pub struct ConsumeVrfRandomness<'info> {
    #[account(
        mut,
        seeds = [REGISTRY_SEED],
        bump = registry.bump,
        has_one = vrf @ ErrorCode::UnauthorizedCaller,
    )]
    pub registry: Box<Account<'info, RaffleRegistry>>,
    #[account(
        constraint =
            *vrf.to_account_info().owner == SWITCHBOARD_PROGRAM_ID @ ErrorCode::InvalidSwitchboardAccount
    )]
    pub vrf: AccountLoader<'info, VrfAccountData>,
    /// CHECK: absent once fulfilled; loaded by hand in validate
    #[account(
        mut,
        seeds = [REQUEST_SEED, handle.as_ref()],
        bump,
    )]
    pub request: UncheckedAccount<'info>,
    #[account(
        mut,
        seeds = [RAFFLE_SEED, &raffle_id.to_le_bytes()],
        bump = raffle.bump,
    )]
    pub raffle: Box<Account<'info, Raffle>>,
    /// CHECK: receives the request rent back, matched against the request
    #[account(mut)]
    pub requester: AccountInfo<'info>,
}

impl ConsumeVrfRandomness<'_> {
    pub fn validate(&self, _ctx: &Context<Self>, raffle_id: u64) -> Result<()> {
        msg!("Validate VRF consume");
        RandomnessRequest::load_outstanding(&self.request, raffle_id, &self.requester.key())?;
        Ok(())
    }

    pub fn actuate(ctx: Context<Self>, handle: [u8; 32]) -> Result<()> {
        let vrf = ctx.accounts.vrf.load()?;
        let result_buffer = vrf.get_result()?;
        drop(vrf);
        if result_buffer == [0u8; 32] {
            msg!("vrf buffer empty");
            return Err(error!(ErrorCode::RandomnessNotReady));
        }

        let random_value = ctx
            .accounts
            .registry
            .finish_vrf_round(handle, result_buffer)?;
        msg!("Result buffer is {:?}", result_buffer);

        let raffle = &mut ctx.accounts.raffle;
        raffle.fulfill(handle, random_value)?;
        close_request(&ctx.accounts.request, &ctx.accounts.requester)?;

        msg!("raffle {} random value {}", raffle.id, random_value);
        emit!(RandomnessFulfilled {
            raffle_id: raffle.id,
            handle,
            random_value,
            timestamp: Clock::get()?.unix_timestamp,
        });
        Ok(())
    }
}
