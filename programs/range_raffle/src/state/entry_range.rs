use crate::errors::ErrorCode;
use crate::{ENTRY_SEED, MAX_SPANS};
use anchor_lang::prelude::*;

/// Half-open run of ticket numbers `[start, end)`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TicketSpan {
    pub start: u64,
    pub end: u64,
}

impl TicketSpan {
    pub fn contains(&self, ticket: u64) -> bool {
        self.start <= ticket && ticket < self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Tickets one entrant holds in one raffle item.
///
/// Deposits append to the item's ticket space, so a repeat deposit normally
/// just moves the end of the last span. A new span is only opened when
/// someone else entered in between.
#[account]
#[derive(Default)]
pub struct EntryRange {
    pub bump: u8,
    pub raffle_id: u64,
    pub item_index: u8,
    pub entrant: Pubkey,
    pub tickets: u64,
    pub spans: Vec<TicketSpan>,
}

impl EntryRange {
    pub const MAX_SIZE: usize = 1 + 8 + 1 + 32 + 8 + 4 + (16 * MAX_SPANS);

    pub fn address(raffle_id: u64, item_index: u8, entrant: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[
                ENTRY_SEED,
                &raffle_id.to_le_bytes(),
                &[item_index],
                entrant.as_ref(),
            ],
            &crate::ID,
        )
    }

    /// Reads the entrant's range from `info`. An entrant who never deposited
    /// has no account; that case yields an empty range keyed to the entrant,
    /// provided `info` sits at the entrant's range address.
    pub fn load_or_empty(
        info: &AccountInfo,
        raffle_id: u64,
        item_index: u8,
        entrant: Pubkey,
    ) -> std::result::Result<EntryRange, ErrorCode> {
        if info.data_is_empty() {
            if *info.key != Self::address(raffle_id, item_index, &entrant).0 {
                return Err(ErrorCode::InvalidEntryRange);
            }
            return Ok(EntryRange {
                raffle_id,
                item_index,
                entrant,
                ..EntryRange::default()
            });
        }
        if *info.owner != crate::ID {
            return Err(ErrorCode::InvalidEntryRange);
        }
        let data = info
            .try_borrow_data()
            .map_err(|_| ErrorCode::InvalidEntryRange)?;
        EntryRange::try_deserialize(&mut &data[..]).map_err(|_| ErrorCode::InvalidEntryRange)
    }

    pub fn is_recorded(&self) -> bool {
        self.entrant != Pubkey::default()
    }

    pub fn belongs_to(&self, raffle_id: u64, item_index: u8, entrant: Pubkey) -> bool {
        self.raffle_id == raffle_id && self.item_index == item_index && self.entrant == entrant
    }

    /// Spans are sorted and disjoint, so the first span not ending at or
    /// before `ticket` is the only candidate.
    pub fn owns_ticket(&self, ticket: u64) -> bool {
        let idx = self.spans.partition_point(|span| span.end <= ticket);
        self.spans
            .get(idx)
            .map_or(false, |span| span.contains(ticket))
    }

    /// Whether recording a deposit starting at `start` can extend the last
    /// span instead of opening a new one.
    pub fn extends_at(&self, start: u64) -> bool {
        self.spans.last().map_or(false, |span| span.end == start)
    }

    /// Checks that a deposit of `quantity` tickets starting at `start` can
    /// be recorded, without touching the range.
    pub fn check_record(
        &self,
        raffle_id: u64,
        item_index: u8,
        entrant: Pubkey,
        start: u64,
        quantity: u64,
    ) -> std::result::Result<(), ErrorCode> {
        if self.is_recorded() && !self.belongs_to(raffle_id, item_index, entrant) {
            return Err(ErrorCode::InvalidEntryRange);
        }
        if !self.extends_at(start) && self.spans.len() >= MAX_SPANS {
            return Err(ErrorCode::TooManySegments);
        }
        self.tickets
            .checked_add(quantity)
            .ok_or(ErrorCode::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn record(
        &mut self,
        raffle_id: u64,
        item_index: u8,
        entrant: Pubkey,
        start: u64,
        quantity: u64,
    ) -> std::result::Result<TicketSpan, ErrorCode> {
        self.check_record(raffle_id, item_index, entrant, start, quantity)?;
        let end = start
            .checked_add(quantity)
            .ok_or(ErrorCode::ArithmeticOverflow)?;

        if !self.is_recorded() {
            self.raffle_id = raffle_id;
            self.item_index = item_index;
            self.entrant = entrant;
        }
        match self.spans.last_mut() {
            Some(last) if last.end == start => last.end = end,
            _ => self.spans.push(TicketSpan { start, end }),
        }
        self.tickets += quantity;

        Ok(*self.spans.last().ok_or(ErrorCode::InvalidEntryRange)?)
    }
}
