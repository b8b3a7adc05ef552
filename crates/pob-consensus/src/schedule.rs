//! Pure scheduling functions

use crate::dynamic::ChainDynamicProperty;
use crate::error::{SchedulingError, SchedulingResult};
use crate::registry::WitnessRegistry;
use crate::timestamp::Timestamp;
use pob_primitives::AccountId;
use pob_types::BlockHeader;
use std::time::Duration;

/// Committee position owning `slot`
fn schedule_index(dynamic: &ChainDynamicProperty, slot: u64, committee: usize) -> usize {
    let offset = i128::from(dynamic.total_slots) + i128::from(slot) - i128::from(dynamic.last_block_time.slot);
    offset.rem_euclid(committee as i128) as usize
}

/// Witness scheduled for `timestamp`; `None` for an empty committee
pub fn assigned_witness<'a>(
    registry: &'a WitnessRegistry,
    dynamic: &ChainDynamicProperty,
    timestamp: Timestamp,
) -> Option<&'a AccountId> {
    let n = registry.number_of_witnesses();
    if n == 0 {
        return None;
    }
    registry.witnesses().get(schedule_index(dynamic, timestamp.slot, n))
}

/// Witness scheduled at unix time `secs`
pub fn witness_of_sec<'a>(
    registry: &'a WitnessRegistry,
    dynamic: &ChainDynamicProperty,
    secs: u64,
) -> Option<&'a AccountId> {
    assigned_witness(registry, dynamic, Timestamp::from_unix_secs(secs))
}

/// How long this node waits before its next slot.
///
/// `None` when this node is not a witness. Zero when the current slot is
/// ours and still free. A slot in which the last block was already produced
/// is skipped, so a witness that just produced waits a full rotation.
pub fn time_until_next_self_turn(
    registry: &WitnessRegistry,
    dynamic: &ChainDynamicProperty,
    now_secs: u64,
) -> Option<Duration> {
    let n = registry.number_of_witnesses() as u64;
    let self_index = registry.self_index()? as u64;
    let current = Timestamp::from_unix_secs(now_secs);

    let position = schedule_index(dynamic, current.slot, n as usize) as u64;
    let mut turn = current.slot + (self_index + n - position) % n;
    if dynamic.has_blocks() && turn == dynamic.last_block_time.slot {
        turn += n;
    }
    if turn == current.slot {
        return Some(Duration::ZERO);
    }
    let start = Timestamp::new(turn).to_unix_secs();
    Some(Duration::from_secs(start.saturating_sub(now_secs)))
}

/// Check a received header against the schedule before applying its body.
///
/// The header must extend the last accepted block by one, sit in a later
/// slot, and name the witness scheduled for that slot.
pub fn check_block_header(
    registry: &WitnessRegistry,
    dynamic: &ChainDynamicProperty,
    header: &BlockHeader,
) -> SchedulingResult<()> {
    let expected = dynamic.last_block_number + 1;
    if header.number != expected {
        return Err(SchedulingError::UnexpectedNumber {
            expected,
            got: header.number,
        });
    }
    if dynamic.has_blocks() && header.slot <= dynamic.last_block_time.slot {
        return Err(SchedulingError::NonIncreasingSlot {
            last: dynamic.last_block_time.slot,
            got: header.slot,
        });
    }
    let scheduled = assigned_witness(registry, dynamic, Timestamp::new(header.slot));
    if scheduled != Some(&header.witness) {
        return Err(SchedulingError::WrongWitness {
            slot: header.slot,
            expected: scheduled.cloned(),
            got: header.witness.clone(),
        });
    }
    Ok(())
}
