use anchor_lang::prelude::*;

#[error_code]
#[derive(PartialEq, Eq)]
pub enum ErrorCode {
    // temporal
    #[msg("Raffle is closed for entries")]
    RaffleNotOpen,
    #[msg("Raffle is still open")]
    RaffleStillOpen,
    #[msg("Raffle has no random value yet")]
    RaffleNotDrawable,
    #[msg("Close time must be in the future")]
    InvalidCloseTime,

    // authorization
    #[msg("Signer is not the registry owner")]
    Unauthorized,
    #[msg("Caller is not the trusted randomness source")]
    UnauthorizedCaller,
    #[msg("Caller is neither the entrant nor the owner")]
    NotEntrant,
    #[msg("Invalid authority account provided.")]
    InvalidAuthorityError,
    #[msg("Invalid VRF account provided.")]
    InvalidVrfAccount,

    // state conflict
    #[msg("Random value has already been drawn")]
    AlreadyDrawn,
    #[msg("Randomness has already been requested for this raffle")]
    RandomnessAlreadyRequested,
    #[msg("Prize slot has already been claimed")]
    AlreadyClaimed,
    #[msg("A VRF round is already in flight")]
    VrfBusy,
    #[msg("VRF result is not available yet")]
    RandomnessNotReady,
    #[msg("Prize allocation is already funded")]
    PrizeAlreadyFunded,
    #[msg("Prize allocation has not been funded")]
    PrizeNotFunded,
    #[msg("Invalid randomness status")]
    InvalidStatus,

    // validation
    #[msg("Quantity must be greater than zero")]
    InvalidQuantity,
    #[msg("Raffle needs at least one item")]
    EmptyItems,
    #[msg("Too many items in raffle")]
    TooManyItems,
    #[msg("Raffle item needs at least one prize")]
    EmptyPrizes,
    #[msg("Too many prizes in raffle item")]
    TooManyPrizes,
    #[msg("Too many prize slots in raffle item")]
    TooManyPrizeSlots,
    #[msg("Raffle is full: entrant can't be added")]
    TooManyEntrants,
    #[msg("Entry range is too fragmented to record another deposit")]
    TooManySegments,
    #[msg("Too many capability identifiers")]
    TooManyCapabilities,
    #[msg("Raffle id must follow the current raffle count")]
    InvalidRaffleId,
    #[msg("Unknown raffle item")]
    InvalidItem,
    #[msg("Unknown prize slot")]
    InvalidSlot,
    #[msg("Unknown prize allocation")]
    InvalidPrize,
    #[msg("Ticket mint does not match the raffle item")]
    InvalidTicketMint,
    #[msg("Prize mint does not match the prize allocation")]
    InvalidPrizeMint,
    #[msg("Entry range does not belong to this raffle item and entrant")]
    InvalidEntryRange,
    #[msg("Claim accounts are missing or do not match")]
    InvalidClaimAccounts,
    #[msg("Not a valid Switchboard account")]
    InvalidSwitchboardAccount,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
    #[msg("PDA bump not found")]
    MissingBump,

    // integrity
    #[msg("Ticket does not win this prize slot")]
    NotWinner,
    #[msg("Randomness request is not outstanding")]
    UnknownRequest,
    #[msg("Request handle does not match the derived seed")]
    InvalidRequestHandle,
}
