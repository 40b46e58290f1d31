//! Grace-period resolution, following kubectl's delete conventions.

/// Resolve the effective grace period from the requested value and `--force`.
///
/// `0` without force is promoted to `1` so a stray `--grace-period=0`
/// cannot cause an immediate deletion; force with an unset (negative)
/// period becomes `0`. Every other combination is returned unchanged, and
/// a negative result still means "unset".
pub fn resolve_grace_period(requested: i64, force: bool) -> i64 {
    if requested == 0 && !force {
        return 1;
    }
    if force && requested < 0 {
        return 0;
    }
    requested
}

/// Grace period to send with a delete call; `None` when unset.
///
/// Periods beyond `u32::MAX` never get here; `PruneConfig::validate`
/// rejects them.
pub fn grace_period_seconds(resolved: i64) -> Option<u32> {
    u32::try_from(resolved).ok()
}
