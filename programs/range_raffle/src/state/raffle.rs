use crate::errors::ErrorCode;
use crate::state::{EntryRange, TicketSpan};
use crate::winner;
use crate::{MAX_ENTRANTS, MAX_ITEMS, MAX_PRIZES_PER_ITEM, MAX_SLOTS_PER_ITEM};
use anchor_lang::prelude::*;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PrizeParams {
    pub mint: Pubkey,
    pub quantity: u16,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleItemParams {
    pub ticket_mint: Pubkey,
    pub prizes: Vec<PrizeParams>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prize {
    pub mint: Pubkey,
    pub quantity: u16,
    pub funded: bool,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClaimRecord {
    pub settled: bool,
    pub entrant: Pubkey,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RaffleItem {
    pub ticket_mint: Pubkey,
    pub prizes: Vec<Prize>,
    pub total_entered: u64,
    pub entrant_count: u32,
    pub claims: Vec<ClaimRecord>,
}

impl RaffleItem {
    pub const MAX_SIZE: usize = 32
        + 4 + ((32 + 2 + 1) * MAX_PRIZES_PER_ITEM)
        + 8
        + 4
        + 4 + ((1 + 32) * MAX_SLOTS_PER_ITEM);

    pub fn slot_count(&self) -> u16 {
        self.claims.len() as u16
    }

    /// Prize allocation that pays out `slot`. Slots are numbered across
    /// the prizes in order, one per unit of quantity.
    pub fn prize_for_slot(&self, slot: u16) -> Option<usize> {
        let mut upper: u32 = 0;
        for (index, prize) in self.prizes.iter().enumerate() {
            upper += prize.quantity as u32;
            if (slot as u32) < upper {
                return Some(index);
            }
        }
        None
    }

    pub fn claimed_slots(&self) -> u16 {
        self.claims.iter().filter(|claim| claim.settled).count() as u16
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RafflePhase {
    // entries accepted
    Open,
    // close time passed, waiting for randomness
    Closed,
    // random value known, prizes claimable
    Drawable,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum RandomnessStatus {
    NoRequest,
    Requested,
    Fulfilled,
}

impl RandomnessStatus {
    pub fn to_code(&self) -> u8 {
        match self {
            RandomnessStatus::NoRequest => 0,
            RandomnessStatus::Requested => 1,
            RandomnessStatus::Fulfilled => 2,
        }
    }

    pub fn from(val: u8) -> std::result::Result<RandomnessStatus, ErrorCode> {
        match val {
            0 => Ok(RandomnessStatus::NoRequest),
            1 => Ok(RandomnessStatus::Requested),
            2 => Ok(RandomnessStatus::Fulfilled),
            _ => Err(ErrorCode::InvalidStatus),
        }
    }
}

/// One `(item, slot)` pair of a batched claim.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimTarget {
    pub item_index: u8,
    pub slot: u16,
}

/// A claim that passed verification and can be paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedClaim {
    pub item_index: u8,
    pub slot: u16,
    pub prize_index: usize,
    pub prize_mint: Pubkey,
    pub ticket: u64,
    pub entrant: Pubkey,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemStats {
    pub ticket_mint: Pubkey,
    pub total_entered: u64,
    pub entrant_count: u32,
    pub prize_slots: u16,
    pub claimed_slots: u16,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleSummary {
    pub id: u64,
    pub close_time: i64,
    pub phase: RafflePhase,
    pub randomness_status: u8,
    pub random_value: Option<u128>,
    pub entrant_count: u32,
    pub items: Vec<ItemStats>,
}

#[account]
#[derive(Default)]
pub struct Raffle {
    pub id: u64,
    pub bump: u8,
    pub close_time: i64,
    pub randomness_status: u8,
    pub pending_request: Option<[u8; 32]>,
    pub random_value: Option<u128>,
    pub items: Vec<RaffleItem>,
    pub entrants: Vec<Pubkey>,
}

impl Raffle {
    pub const MAX_SIZE: usize = 8
        + 1
        + 8
        + 1
        + (1 + 32)
        + (1 + 16)
        + 4 + (RaffleItem::MAX_SIZE * MAX_ITEMS)
        + 4 + (32 * MAX_ENTRANTS);

    pub fn init(
        &mut self,
        id: u64,
        bump: u8,
        close_time: i64,
        items: &[RaffleItemParams],
        now: i64,
    ) -> std::result::Result<(), ErrorCode> {
        if id == 0 {
            return Err(ErrorCode::InvalidRaffleId);
        }
        if close_time <= now {
            return Err(ErrorCode::InvalidCloseTime);
        }
        if items.is_empty() {
            return Err(ErrorCode::EmptyItems);
        }
        if items.len() > MAX_ITEMS {
            return Err(ErrorCode::TooManyItems);
        }

        let mut raffle_items = Vec::with_capacity(items.len());
        for params in items {
            if params.prizes.is_empty() {
                return Err(ErrorCode::EmptyPrizes);
            }
            if params.prizes.len() > MAX_PRIZES_PER_ITEM {
                return Err(ErrorCode::TooManyPrizes);
            }
            let mut slots: usize = 0;
            for prize in params.prizes.iter() {
                if prize.quantity == 0 {
                    return Err(ErrorCode::InvalidQuantity);
                }
                slots += prize.quantity as usize;
            }
            if slots > MAX_SLOTS_PER_ITEM {
                return Err(ErrorCode::TooManyPrizeSlots);
            }
            raffle_items.push(RaffleItem {
                ticket_mint: params.ticket_mint,
                prizes: params
                    .prizes
                    .iter()
                    .map(|prize| Prize {
                        mint: prize.mint,
                        quantity: prize.quantity,
                        funded: false,
                    })
                    .collect(),
                total_entered: 0,
                entrant_count: 0,
                claims: vec![ClaimRecord::default(); slots],
            });
        }

        self.id = id;
        self.bump = bump;
        self.close_time = close_time;
        self.randomness_status = RandomnessStatus::NoRequest.to_code();
        self.pending_request = None;
        self.random_value = None;
        self.items = raffle_items;
        self.entrants = Vec::new();
        Ok(())
    }

    pub fn phase(&self, now: i64) -> RafflePhase {
        if self.random_value.is_some() {
            RafflePhase::Drawable
        } else if now < self.close_time {
            RafflePhase::Open
        } else {
            RafflePhase::Closed
        }
    }

    pub fn is_open(&self, now: i64) -> bool {
        now < self.close_time
    }

    pub fn status(&self) -> std::result::Result<RandomnessStatus, ErrorCode> {
        RandomnessStatus::from(self.randomness_status)
    }

    pub fn item(&self, item_index: u8) -> std::result::Result<&RaffleItem, ErrorCode> {
        self.items
            .get(item_index as usize)
            .ok_or(ErrorCode::InvalidItem)
    }

    /// Records `quantity` tickets for `entrant` at the end of the item's
    /// ticket space. Nothing is written unless every check passes.
    pub fn enter(
        &mut self,
        item_index: u8,
        ticket_mint: Pubkey,
        entrant: Pubkey,
        quantity: u64,
        range: &mut EntryRange,
        now: i64,
    ) -> std::result::Result<TicketSpan, ErrorCode> {
        if !self.is_open(now) {
            return Err(ErrorCode::RaffleNotOpen);
        }
        if quantity == 0 {
            return Err(ErrorCode::InvalidQuantity);
        }
        let raffle_id = self.id;
        let new_entrant = !self.entrants.contains(&entrant);
        if new_entrant && self.entrants.len() >= MAX_ENTRANTS {
            return Err(ErrorCode::TooManyEntrants);
        }

        let item = self
            .items
            .get_mut(item_index as usize)
            .ok_or(ErrorCode::InvalidItem)?;
        if item.ticket_mint != ticket_mint {
            return Err(ErrorCode::InvalidTicketMint);
        }
        let start = item.total_entered;
        let total = start
            .checked_add(quantity)
            .ok_or(ErrorCode::ArithmeticOverflow)?;
        range.check_record(raffle_id, item_index, entrant, start, quantity)?;

        let new_in_item = !range.is_recorded();
        let span = range.record(raffle_id, item_index, entrant, start, quantity)?;
        item.total_entered = total;
        if new_in_item {
            item.entrant_count += 1;
        }
        if new_entrant {
            self.entrants.push(entrant);
        }
        Ok(span)
    }

    /// Moves the raffle into `Requested` under `handle`.
    pub fn begin_draw(
        &mut self,
        handle: [u8; 32],
        now: i64,
    ) -> std::result::Result<(), ErrorCode> {
        if self.is_open(now) {
            return Err(ErrorCode::RaffleStillOpen);
        }
        if self.random_value.is_some() {
            return Err(ErrorCode::AlreadyDrawn);
        }
        match self.status()? {
            RandomnessStatus::NoRequest => {}
            RandomnessStatus::Requested => return Err(ErrorCode::RandomnessAlreadyRequested),
            RandomnessStatus::Fulfilled => return Err(ErrorCode::AlreadyDrawn),
        }
        self.randomness_status = RandomnessStatus::Requested.to_code();
        self.pending_request = Some(handle);
        Ok(())
    }

    pub fn fulfill(
        &mut self,
        handle: [u8; 32],
        random_value: u128,
    ) -> std::result::Result<(), ErrorCode> {
        if self.status()? != RandomnessStatus::Requested || self.pending_request != Some(handle) {
            return Err(ErrorCode::UnknownRequest);
        }
        self.random_value = Some(random_value);
        self.pending_request = None;
        self.randomness_status = RandomnessStatus::Fulfilled.to_code();
        Ok(())
    }

    pub fn winning_ticket(&self, item_index: u8, slot: u16) -> std::result::Result<Option<u64>, ErrorCode> {
        let random_value = self.random_value.ok_or(ErrorCode::RaffleNotDrawable)?;
        let item = self.item(item_index)?;
        if slot >= item.slot_count() {
            return Err(ErrorCode::InvalidSlot);
        }
        Ok(winner::winning_ticket(
            random_value,
            self.id,
            item_index,
            slot,
            item.total_entered,
        ))
    }

    /// Checks a claimant's assertion that `entrant` wins `slot` of an item,
    /// recomputing the winner from the random value rather than trusting
    /// the caller. `caller_authorized` is true when the signer is the
    /// entrant or the registry owner.
    pub fn verify_claim(
        &self,
        item_index: u8,
        slot: u16,
        entrant: Pubkey,
        caller_authorized: bool,
        range: &EntryRange,
    ) -> std::result::Result<VerifiedClaim, ErrorCode> {
        if self.random_value.is_none() {
            return Err(ErrorCode::RaffleNotDrawable);
        }
        let item = self.item(item_index)?;
        let claim = item
            .claims
            .get(slot as usize)
            .ok_or(ErrorCode::InvalidSlot)?;
        if !caller_authorized {
            return Err(ErrorCode::NotEntrant);
        }
        if claim.settled {
            return Err(ErrorCode::AlreadyClaimed);
        }
        let prize_index = item.prize_for_slot(slot).ok_or(ErrorCode::InvalidSlot)?;
        let prize = item.prizes[prize_index];
        if !prize.funded {
            return Err(ErrorCode::PrizeNotFunded);
        }
        if !range.belongs_to(self.id, item_index, entrant) {
            return Err(ErrorCode::InvalidEntryRange);
        }
        let ticket = self
            .winning_ticket(item_index, slot)?
            .ok_or(ErrorCode::NotWinner)?;
        if !range.owns_ticket(ticket) {
            return Err(ErrorCode::NotWinner);
        }

        Ok(VerifiedClaim {
            item_index,
            slot,
            prize_index,
            prize_mint: prize.mint,
            ticket,
            entrant,
        })
    }

    pub fn record_claim(&mut self, claim: &VerifiedClaim) -> std::result::Result<(), ErrorCode> {
        let record = self
            .items
            .get_mut(claim.item_index as usize)
            .ok_or(ErrorCode::InvalidItem)?
            .claims
            .get_mut(claim.slot as usize)
            .ok_or(ErrorCode::InvalidSlot)?;
        if record.settled {
            return Err(ErrorCode::AlreadyClaimed);
        }
        record.settled = true;
        record.entrant = claim.entrant;
        Ok(())
    }

    /// Verifies and settles each target on its own. `load_range` supplies
    /// the entrant's range for target `i`, `check_payout` vets the payout
    /// accounts of a verified claim before it is recorded. A rejected target
    /// leaves its claim record untouched and does not affect the others.
    pub fn settle_claims<L, P>(
        &mut self,
        targets: &[ClaimTarget],
        entrant: Pubkey,
        caller_authorized: bool,
        mut load_range: L,
        mut check_payout: P,
    ) -> Vec<std::result::Result<VerifiedClaim, ErrorCode>>
    where
        L: FnMut(usize, &ClaimTarget) -> std::result::Result<EntryRange, ErrorCode>,
        P: FnMut(usize, &VerifiedClaim) -> std::result::Result<(), ErrorCode>,
    {
        targets
            .iter()
            .enumerate()
            .map(|(i, target)| -> std::result::Result<VerifiedClaim, ErrorCode> {
                let range = load_range(i, target)?;
                let claim = self.verify_claim(
                    target.item_index,
                    target.slot,
                    entrant,
                    caller_authorized,
                    &range,
                )?;
                check_payout(i, &claim)?;
                self.record_claim(&claim)?;
                Ok(claim)
            })
            .collect()
    }

    pub fn fund_prize(
        &mut self,
        item_index: u8,
        prize_index: u8,
        mint: Pubkey,
    ) -> std::result::Result<Prize, ErrorCode> {
        let prize = self
            .items
            .get_mut(item_index as usize)
            .ok_or(ErrorCode::InvalidItem)?
            .prizes
            .get_mut(prize_index as usize)
            .ok_or(ErrorCode::InvalidPrize)?;
        if prize.mint != mint {
            return Err(ErrorCode::InvalidPrizeMint);
        }
        if prize.funded {
            return Err(ErrorCode::PrizeAlreadyFunded);
        }
        prize.funded = true;
        Ok(*prize)
    }

    pub fn summary(&self, now: i64) -> RaffleSummary {
        RaffleSummary {
            id: self.id,
            close_time: self.close_time,
            phase: self.phase(now),
            randomness_status: self.randomness_status,
            random_value: self.random_value,
            entrant_count: self.entrants.len() as u32,
            items: self
                .items
                .iter()
                .map(|item| ItemStats {
                    ticket_mint: item.ticket_mint,
                    total_entered: item.total_entered,
                    entrant_count: item.entrant_count,
                    prize_slots: item.slot_count(),
                    claimed_slots: item.claimed_slots(),
                })
                .collect(),
        }
    }
}

#[event]
pub struct RaffleCreated {
    pub raffle_id: u64,
    pub close_time: i64,
    pub items: Vec<RaffleItemParams>,
    pub timestamp: i64,
}

#[event]
pub struct PrizeFunded {
    pub raffle_id: u64,
    pub item_index: u8,
    pub prize_index: u8,
    pub mint: Pubkey,
    pub quantity: u16,
    pub timestamp: i64,
}

#[event]
pub struct TicketsDeposited {
    pub raffle_id: u64,
    pub item_index: u8,
    pub entrant: Pubkey,
    pub quantity: u64,
    pub range_start: u64,
    pub range_end: u64,
    pub total_entered: u64,
    pub timestamp: i64,
}

#[event]
pub struct PrizeClaimed {
    pub raffle_id: u64,
    pub item_index: u8,
    pub slot: u16,
    pub ticket: u64,
    pub entrant: Pubkey,
    pub prize_mint: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct ClaimRejected {
    pub raffle_id: u64,
    pub item_index: u8,
    pub slot: u16,
    pub entrant: Pubkey,
    pub error_code: u32,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CLOSE: i64 = 1_000;

    fn item(ticket_mint: Pubkey, quantities: &[u16]) -> RaffleItemParams {
        RaffleItemParams {
            ticket_mint,
            prizes: quantities
                .iter()
                .map(|quantity| PrizeParams {
                    mint: Pubkey::new_unique(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    fn raffle_with(items: &[RaffleItemParams]) -> Raffle {
        let mut raffle = Raffle::default();
        raffle.init(1, 255, CLOSE, items, 0).unwrap();
        raffle
    }

    fn fund_all(raffle: &mut Raffle) {
        for item in raffle.items.iter_mut() {
            for prize in item.prizes.iter_mut() {
                prize.funded = true;
            }
        }
    }

    fn drawn(raffle: &mut Raffle, random_value: u128) {
        raffle.begin_draw([7u8; 32], CLOSE).unwrap();
        raffle.fulfill([7u8; 32], random_value).unwrap();
    }

    #[test]
    fn test_init_validation() {
        let mint = Pubkey::new_unique();
        let mut raffle = Raffle::default();
        assert_eq!(raffle.init(0, 1, CLOSE, &[item(mint, &[1])], 0), Err(ErrorCode::InvalidRaffleId));
        assert_eq!(raffle.init(1, 1, 0, &[item(mint, &[1])], 0), Err(ErrorCode::InvalidCloseTime));
        assert_eq!(raffle.init(1, 1, CLOSE, &[], 0), Err(ErrorCode::EmptyItems));
        assert_eq!(raffle.init(1, 1, CLOSE, &[item(mint, &[])], 0), Err(ErrorCode::EmptyPrizes));
        assert_eq!(raffle.init(1, 1, CLOSE, &[item(mint, &[2, 0])], 0), Err(ErrorCode::InvalidQuantity));
        assert_eq!(
            raffle.init(1, 1, CLOSE, &[item(mint, &[1, 1, 1, 1, 1])], 0),
            Err(ErrorCode::TooManyPrizes)
        );
        assert_eq!(
            raffle.init(1, 1, CLOSE, &[item(mint, &[10, 7])], 0),
            Err(ErrorCode::TooManyPrizeSlots)
        );
        let too_many: Vec<RaffleItemParams> = (0..=MAX_ITEMS).map(|_| item(mint, &[1])).collect();
        assert_eq!(raffle.init(1, 1, CLOSE, &too_many, 0), Err(ErrorCode::TooManyItems));
        assert_eq!(raffle.id, 0);
    }

    #[test]
    fn test_init_builds_claim_slots() {
        let raffle = raffle_with(&[item(Pubkey::new_unique(), &[2, 3])]);
        assert_eq!(raffle.items[0].slot_count(), 5);
        assert_eq!(raffle.items[0].prize_for_slot(0), Some(0));
        assert_eq!(raffle.items[0].prize_for_slot(1), Some(0));
        assert_eq!(raffle.items[0].prize_for_slot(2), Some(1));
        assert_eq!(raffle.items[0].prize_for_slot(4), Some(1));
        assert_eq!(raffle.items[0].prize_for_slot(5), None);
        assert_eq!(raffle.phase(0), RafflePhase::Open);
        assert_eq!(raffle.status(), Ok(RandomnessStatus::NoRequest));
    }

    #[test]
    fn test_deposits_partition_ticket_space() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (mut range_a, mut range_b) = (EntryRange::default(), EntryRange::default());

        let span = raffle.enter(0, mint, a, 4, &mut range_a, 10).unwrap();
        assert_eq!(span, TicketSpan { start: 0, end: 4 });
        let span = raffle.enter(0, mint, b, 6, &mut range_b, 11).unwrap();
        assert_eq!(span, TicketSpan { start: 4, end: 10 });
        let span = raffle.enter(0, mint, a, 2, &mut range_a, 12).unwrap();
        assert_eq!(span, TicketSpan { start: 10, end: 12 });

        assert_eq!(raffle.items[0].total_entered, 12);
        assert_eq!(raffle.items[0].entrant_count, 2);
        assert_eq!(raffle.entrants, vec![a, b]);
        assert_eq!(range_a.tickets, 6);
        assert!(range_a.owns_ticket(11) && !range_b.owns_ticket(11));
    }

    #[test]
    fn test_deposit_after_close_rejected() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        let entrant = Pubkey::new_unique();
        let mut range = EntryRange::default();
        raffle.enter(0, mint, entrant, 3, &mut range, 10).unwrap();

        assert_eq!(
            raffle.enter(0, mint, entrant, 3, &mut range, CLOSE),
            Err(ErrorCode::RaffleNotOpen)
        );
        assert_eq!(raffle.items[0].total_entered, 3);
        assert_eq!(range.tickets, 3);
    }

    #[test]
    fn test_deposit_validation_leaves_state() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        let entrant = Pubkey::new_unique();
        let mut range = EntryRange::default();

        assert_eq!(raffle.enter(0, mint, entrant, 0, &mut range, 1), Err(ErrorCode::InvalidQuantity));
        assert_eq!(raffle.enter(1, mint, entrant, 1, &mut range, 1), Err(ErrorCode::InvalidItem));
        assert_eq!(
            raffle.enter(0, Pubkey::new_unique(), entrant, 1, &mut range, 1),
            Err(ErrorCode::InvalidTicketMint)
        );
        assert!(raffle.entrants.is_empty());
        assert!(!range.is_recorded());
        assert_eq!(raffle.items[0].total_entered, 0);
    }

    #[test]
    fn test_entrant_capacity_is_shared_across_items() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1]), item(mint, &[1])]);
        let first = Pubkey::new_unique();
        let mut first_range = EntryRange::default();
        raffle.enter(0, mint, first, 1, &mut first_range, 1).unwrap();
        for _ in 1..MAX_ENTRANTS {
            let mut range = EntryRange::default();
            raffle.enter(0, mint, Pubkey::new_unique(), 1, &mut range, 1).unwrap();
        }

        // item 1 is still empty, but the raffle has no room for a new wallet
        let mut range = EntryRange::default();
        assert_eq!(
            raffle.enter(1, mint, Pubkey::new_unique(), 1, &mut range, 1),
            Err(ErrorCode::TooManyEntrants)
        );
        assert_eq!(raffle.item(1).unwrap().total_entered, 0);

        // known wallets keep depositing into any item
        raffle.enter(0, mint, first, 2, &mut first_range, 2).unwrap();
        let mut second_item = EntryRange::default();
        raffle.enter(1, mint, first, 1, &mut second_item, 2).unwrap();
        assert_eq!(raffle.entrants.len(), MAX_ENTRANTS);
    }

    #[test]
    fn test_draw_lifecycle() {
        let mut raffle = raffle_with(&[item(Pubkey::new_unique(), &[1])]);
        let handle = [3u8; 32];

        assert_eq!(raffle.begin_draw(handle, CLOSE - 1), Err(ErrorCode::RaffleStillOpen));
        raffle.begin_draw(handle, CLOSE).unwrap();
        assert_eq!(raffle.status(), Ok(RandomnessStatus::Requested));
        assert_eq!(raffle.phase(CLOSE), RafflePhase::Closed);
        assert_eq!(raffle.begin_draw([4u8; 32], CLOSE), Err(ErrorCode::RandomnessAlreadyRequested));

        raffle.fulfill(handle, 99).unwrap();
        assert_eq!(raffle.random_value, Some(99));
        assert_eq!(raffle.pending_request, None);
        assert_eq!(raffle.phase(CLOSE), RafflePhase::Drawable);
        assert_eq!(raffle.begin_draw(handle, CLOSE), Err(ErrorCode::AlreadyDrawn));
    }

    #[test]
    fn test_fulfill_unknown_handle() {
        let mut raffle = raffle_with(&[item(Pubkey::new_unique(), &[1])]);
        assert_eq!(raffle.fulfill([1u8; 32], 5), Err(ErrorCode::UnknownRequest));

        raffle.begin_draw([1u8; 32], CLOSE).unwrap();
        assert_eq!(raffle.fulfill([2u8; 32], 5), Err(ErrorCode::UnknownRequest));
        assert_eq!(raffle.random_value, None);

        raffle.fulfill([1u8; 32], 5).unwrap();
        // replayed fulfillment
        assert_eq!(raffle.fulfill([1u8; 32], 6), Err(ErrorCode::UnknownRequest));
        assert_eq!(raffle.random_value, Some(5));
    }

    #[test]
    fn test_claim_pays_winner_once() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        let entrant = Pubkey::new_unique();
        let mut range = EntryRange::default();
        raffle.enter(0, mint, entrant, 10, &mut range, 1).unwrap();
        fund_all(&mut raffle);
        drawn(&mut raffle, 424242);

        let claim = raffle.verify_claim(0, 0, entrant, true, &range).unwrap();
        assert_eq!(claim.prize_mint, raffle.items[0].prizes[0].mint);
        raffle.record_claim(&claim).unwrap();
        assert_eq!(raffle.items[0].claims[0].entrant, entrant);

        assert_eq!(raffle.verify_claim(0, 0, entrant, true, &range), Err(ErrorCode::AlreadyClaimed));
        assert_eq!(raffle.record_claim(&claim), Err(ErrorCode::AlreadyClaimed));
    }

    #[test]
    fn test_claim_rejections() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (mut range_a, mut range_b) = (EntryRange::default(), EntryRange::default());
        raffle.enter(0, mint, a, 5, &mut range_a, 1).unwrap();
        raffle.enter(0, mint, b, 5, &mut range_b, 1).unwrap();

        assert_eq!(raffle.verify_claim(0, 0, a, true, &range_a), Err(ErrorCode::RaffleNotDrawable));
        drawn(&mut raffle, 31337);
        assert_eq!(raffle.verify_claim(0, 0, a, true, &range_a), Err(ErrorCode::PrizeNotFunded));
        fund_all(&mut raffle);

        assert_eq!(raffle.verify_claim(1, 0, a, true, &range_a), Err(ErrorCode::InvalidItem));
        assert_eq!(raffle.verify_claim(0, 1, a, true, &range_a), Err(ErrorCode::InvalidSlot));
        assert_eq!(raffle.verify_claim(0, 0, a, false, &range_a), Err(ErrorCode::NotEntrant));
        assert_eq!(raffle.verify_claim(0, 0, a, true, &range_b), Err(ErrorCode::InvalidEntryRange));

        let ticket = raffle.winning_ticket(0, 0).unwrap().unwrap();
        let (winner, loser, winner_range, loser_range) = if ticket < 5 {
            (a, b, &range_a, &range_b)
        } else {
            (b, a, &range_b, &range_a)
        };
        assert_eq!(raffle.verify_claim(0, 0, loser, true, loser_range), Err(ErrorCode::NotWinner));
        assert!(raffle.verify_claim(0, 0, winner, true, winner_range).is_ok());
        assert!(raffle.items[0].claims.iter().all(|claim| !claim.settled));
    }

    #[test]
    fn test_claim_without_entries() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        fund_all(&mut raffle);
        drawn(&mut raffle, 1);
        let entrant = Pubkey::new_unique();
        let range = EntryRange {
            raffle_id: 1,
            item_index: 0,
            entrant,
            ..EntryRange::default()
        };
        assert_eq!(raffle.winning_ticket(0, 0), Ok(None));
        assert_eq!(raffle.verify_claim(0, 0, entrant, true, &range), Err(ErrorCode::NotWinner));
    }

    #[test]
    fn test_every_slot_has_exactly_one_winner() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[3, 2])]);
        let entrants: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let mut ranges = vec![EntryRange::default(); 4];
        for round in 0..3u64 {
            for (entrant, range) in entrants.iter().zip(ranges.iter_mut()) {
                raffle.enter(0, mint, *entrant, round + 1, range, 1).unwrap();
            }
        }
        fund_all(&mut raffle);
        drawn(&mut raffle, 0x5eed);

        for slot in 0..5u16 {
            let winners: Vec<usize> = (0..4)
                .filter(|i| raffle.verify_claim(0, slot, entrants[*i], true, &ranges[*i]).is_ok())
                .collect();
            assert_eq!(winners.len(), 1);
            let claim = raffle.verify_claim(0, slot, entrants[winners[0]], true, &ranges[winners[0]]).unwrap();
            raffle.record_claim(&claim).unwrap();
        }
        assert_eq!(raffle.summary(CLOSE).items[0].claimed_slots, 5);
    }

    #[test]
    fn test_batch_settles_each_target_independently() {
        let mint = Pubkey::new_unique();
        let mut base = raffle_with(&[item(mint, &[4])]);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (mut range_a, mut range_b) = (EntryRange::default(), EntryRange::default());
        base.enter(0, mint, a, 9, &mut range_a, 1).unwrap();
        base.enter(0, mint, b, 1, &mut range_b, 1).unwrap();
        fund_all(&mut base);

        // pick a draw where `a` wins three of the four slots
        let mut raffle = (0u128..10_000)
            .map(|random_value| {
                let mut raffle = base.clone();
                drawn(&mut raffle, random_value);
                raffle
            })
            .find(|raffle| {
                (0..4u16)
                    .filter(|slot| raffle.verify_claim(0, *slot, a, true, &range_a).is_ok())
                    .count()
                    == 3
            })
            .unwrap();
        let (won, lost): (Vec<u16>, Vec<u16>) = (0..4u16)
            .partition(|slot| raffle.verify_claim(0, *slot, a, true, &range_a).is_ok());
        let lost = lost[0];

        let first = raffle.verify_claim(0, won[0], a, true, &range_a).unwrap();
        raffle.record_claim(&first).unwrap();

        let targets = [
            ClaimTarget { item_index: 0, slot: won[1] },
            ClaimTarget { item_index: 0, slot: lost },
            ClaimTarget { item_index: 0, slot: won[0] },
            ClaimTarget { item_index: 0, slot: won[2] },
        ];
        let results =
            raffle.settle_claims(&targets, a, true, |_, _| Ok(range_a.clone()), |_, _| Ok(()));

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].map(|claim| claim.slot), Ok(won[1]));
        assert_eq!(results[1], Err(ErrorCode::NotWinner));
        assert_eq!(results[2], Err(ErrorCode::AlreadyClaimed));
        assert_eq!(results[3].map(|claim| claim.slot), Ok(won[2]));

        let claims = &raffle.items[0].claims;
        for slot in won.iter() {
            assert!(claims[*slot as usize].settled);
            assert_eq!(claims[*slot as usize].entrant, a);
        }
        assert!(!claims[lost as usize].settled);
        assert_eq!(claims[lost as usize].entrant, Pubkey::default());
    }

    #[test]
    fn test_batch_rejected_payout_leaves_slot_open() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[2])]);
        let entrant = Pubkey::new_unique();
        let mut range = EntryRange::default();
        raffle.enter(0, mint, entrant, 5, &mut range, 1).unwrap();
        fund_all(&mut raffle);
        drawn(&mut raffle, 77);

        let targets = [
            ClaimTarget { item_index: 0, slot: 0 },
            ClaimTarget { item_index: 0, slot: 1 },
            ClaimTarget { item_index: 3, slot: 0 },
        ];
        let results = raffle.settle_claims(
            &targets,
            entrant,
            true,
            |_, _| Ok(range.clone()),
            |i, _| {
                if i == 0 {
                    Err(ErrorCode::InvalidClaimAccounts)
                } else {
                    Ok(())
                }
            },
        );

        assert_eq!(results[0], Err(ErrorCode::InvalidClaimAccounts));
        assert!(results[1].is_ok());
        assert_eq!(results[2], Err(ErrorCode::InvalidItem));
        assert!(!raffle.items[0].claims[0].settled);
        assert!(raffle.items[0].claims[1].settled);

        // the slot is still claimable once the accounts are right
        let retry = raffle.settle_claims(&targets[..1], entrant, true, |_, _| Ok(range.clone()), |_, _| Ok(()));
        assert!(retry[0].is_ok());
        assert!(raffle.items[0].claims[0].settled);
    }

    #[test]
    fn test_batch_unauthorized_caller() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[1])]);
        let entrant = Pubkey::new_unique();
        let mut range = EntryRange::default();
        raffle.enter(0, mint, entrant, 5, &mut range, 1).unwrap();
        fund_all(&mut raffle);
        drawn(&mut raffle, 3);

        let targets = [ClaimTarget { item_index: 0, slot: 0 }];
        let results = raffle.settle_claims(&targets, entrant, false, |_, _| Ok(range.clone()), |_, _| Ok(()));
        assert_eq!(results[0], Err(ErrorCode::NotEntrant));
        assert!(!raffle.items[0].claims[0].settled);
    }

    #[test]
    fn test_fund_prize() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[2])]);
        let prize_mint = raffle.items[0].prizes[0].mint;

        assert_eq!(raffle.fund_prize(0, 0, mint), Err(ErrorCode::InvalidPrizeMint));
        assert_eq!(raffle.fund_prize(0, 1, prize_mint), Err(ErrorCode::InvalidPrize));
        assert_eq!(raffle.fund_prize(2, 0, prize_mint), Err(ErrorCode::InvalidItem));
        let prize = raffle.fund_prize(0, 0, prize_mint).unwrap();
        assert!(prize.funded);
        assert_eq!(prize.quantity, 2);
        assert_eq!(raffle.fund_prize(0, 0, prize_mint), Err(ErrorCode::PrizeAlreadyFunded));
    }

    #[test]
    fn test_summary() {
        let mint = Pubkey::new_unique();
        let mut raffle = raffle_with(&[item(mint, &[2]), item(Pubkey::new_unique(), &[1])]);
        let mut range = EntryRange::default();
        raffle.enter(0, mint, Pubkey::new_unique(), 7, &mut range, 1).unwrap();

        let summary = raffle.summary(1);
        assert_eq!(summary.id, 1);
        assert_eq!(summary.phase, RafflePhase::Open);
        assert_eq!(summary.entrant_count, 1);
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.items[0].total_entered, 7);
        assert_eq!(summary.items[0].prize_slots, 2);
        assert_eq!(summary.items[1].total_entered, 0);
    }

    proptest! {
        #[test]
        fn deposits_partition_and_ownership(
            deposits in proptest::collection::vec((0usize..5, 1u64..20), 1..60),
        ) {
            let mint = Pubkey::new_unique();
            let mut raffle = raffle_with(&[item(mint, &[1])]);
            let entrants: Vec<Pubkey> = (0..5).map(|_| Pubkey::new_unique()).collect();
            let mut ranges = vec![EntryRange::default(); 5];

            let mut last_total = 0;
            for (who, quantity) in deposits {
                match raffle.enter(0, mint, entrants[who], quantity, &mut ranges[who], 1) {
                    Ok(_) => {}
                    Err(ErrorCode::TooManySegments) => continue,
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
                prop_assert!(raffle.items[0].total_entered > last_total);
                last_total = raffle.items[0].total_entered;
            }

            let total = raffle.items[0].total_entered;
            let held: u64 = ranges.iter().map(|range| range.tickets).sum();
            prop_assert_eq!(held, total);
            for ticket in 0..total {
                let owners = ranges.iter().filter(|range| range.owns_ticket(ticket)).count();
                prop_assert_eq!(owners, 1);
            }
            for range in ranges.iter() {
                prop_assert!(!range.owns_ticket(total));
                let spans: u64 = range.spans.iter().map(|span| span.len()).sum();
                prop_assert_eq!(spans, range.tickets);
            }
        }
    }
}
