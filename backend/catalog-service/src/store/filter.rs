//! Search predicate
//!
//! A record qualifies when every bound set on the filter holds. Zero bounds
//! (the protobuf default) place no constraint; for price this means a
//! filter with `max_price_usd == 0` accepts any price.

use crate::grpc::{Filter, Memory, MemoryUnit, Record};

/// Memory size in bits, saturating at `u64::MAX`
///
/// `Unknown` units normalize to zero.
pub fn to_bit(memory: &Memory) -> u64 {
    let value = memory.value;
    match memory.unit() {
        MemoryUnit::Bit => value,
        MemoryUnit::Byte => value.saturating_mul(1 << 3),
        MemoryUnit::Kilobyte => value.saturating_mul(1 << 13),
        MemoryUnit::Megabyte => value.saturating_mul(1 << 23),
        MemoryUnit::Gigabyte => value.saturating_mul(1 << 33),
        MemoryUnit::Terabyte => value.saturating_mul(1 << 43),
        MemoryUnit::Unknown => 0,
    }
}

pub fn is_qualified(filter: &Filter, record: &Record) -> bool {
    if filter.max_price_usd > 0.0 && record.price_usd > filter.max_price_usd {
        return false;
    }

    let (cores, min_ghz) = record
        .cpu
        .as_ref()
        .map(|cpu| (cpu.number_cores, cpu.min_ghz))
        .unwrap_or((0, 0.0));

    if cores < filter.min_cpu_cores {
        return false;
    }

    if min_ghz < filter.min_cpu_ghz {
        return false;
    }

    let required = filter.min_ram.as_ref().map(to_bit).unwrap_or(0);
    let installed = record.memory.as_ref().map(to_bit).unwrap_or(0);

    installed >= required
}
