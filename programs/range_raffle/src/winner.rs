use anchor_lang::solana_program::hash::hashv;

/// Raw winning ticket for one prize slot, before collision resolution.
///
/// `sha256(random_value ‖ raffle_id ‖ item_index ‖ slot)`, first 8 bytes as a
/// little-endian `u64`, reduced modulo `total_entered`. Returns `None` when
/// the item has no tickets.
pub fn raw_ticket(
    random_value: u128,
    raffle_id: u64,
    item_index: u8,
    slot: u16,
    total_entered: u64,
) -> Option<u64> {
    if total_entered == 0 {
        return None;
    }
    let digest = hashv(&[
        &random_value.to_le_bytes(),
        &raffle_id.to_le_bytes(),
        &[item_index],
        &slot.to_le_bytes(),
    ])
    .to_bytes();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Some(u64::from_le_bytes(head) % total_entered)
}

/// Moves `raw` forward (wrapping at `total_entered`) past every ticket
/// already taken by an earlier slot of the same item.
///
/// Once every ticket is taken there is no free ticket to step to and `raw` is
/// returned as-is; duplicates are only possible when the item has fewer
/// tickets than prize slots.
pub fn resolve_collision(raw: u64, taken: &[u64], total_entered: u64) -> u64 {
    if taken.len() as u64 >= total_entered {
        return raw;
    }
    let mut candidate = raw;
    while taken.contains(&candidate) {
        candidate = (candidate + 1) % total_entered;
    }
    candidate
}

/// Winning tickets for slots `0..slot_count` of one item, in slot order.
pub fn winning_tickets(
    random_value: u128,
    raffle_id: u64,
    item_index: u8,
    slot_count: u16,
    total_entered: u64,
) -> Vec<u64> {
    let mut taken: Vec<u64> = Vec::with_capacity(slot_count as usize);
    for slot in 0..slot_count {
        let raw = match raw_ticket(random_value, raffle_id, item_index, slot, total_entered) {
            Some(raw) => raw,
            None => return taken,
        };
        let ticket = resolve_collision(raw, &taken, total_entered);
        taken.push(ticket);
    }
    taken
}

/// Winning ticket of a single slot. Derives every earlier slot of the item
/// too, since collisions depend on them.
pub fn winning_ticket(
    random_value: u128,
    raffle_id: u64,
    item_index: u8,
    slot: u16,
    total_entered: u64,
) -> Option<u64> {
    let slot_count = slot.checked_add(1)?;
    winning_tickets(random_value, raffle_id, item_index, slot_count, total_entered)
        .get(slot as usize)
        .copied()
}
