/// The fixed 16-entry interlock permit table, transcribed row
/// by row in `b3 b2 b1 b0` order (MSB first) as a 16-bit mask: bit `n` is the
/// permit decision for the 4-bit pattern `n`. Authoritative; `permit_formula`
/// is checked against it exhaustively in `formula_matches_truth_table`.
const PERMIT_TABLE: u16 = 0b1100_1111_0100_0101;

fn index(allowed_when_locked: bool, needs_firmware: bool, owns_or_unowned: bool, locked: bool) -> u32 {
    ((allowed_when_locked as u32) << 3)
        | ((needs_firmware as u32) << 2)
        | ((owns_or_unowned as u32) << 1)
        | (locked as u32)
}

/// Pure admission predicate: may the selected process step this tick?
///
/// - `allowed_when_locked`: the current instruction kind is in
///   `ALLOWED_WHEN_LOCKED` (b3).
/// - `needs_firmware`: the current instruction kind is in `NEEDS_FW` (b2).
/// - `owns_or_unowned`: this process already owns the firmware, or no process
///   does (b1).
/// - `locked`: the system is in emergency-lock (b0).
pub fn permit(
    allowed_when_locked: bool,
    needs_firmware: bool,
    owns_or_unowned: bool,
    locked: bool,
) -> bool {
    let bit = index(allowed_when_locked, needs_firmware, owns_or_unowned, locked);
    (PERMIT_TABLE >> bit) & 1 == 1
}

/// Equivalent boolean expression, offered as an alternative to
/// the table. Used only to cross-check `permit`, never called directly by
/// the tick loop.
#[allow(dead_code)] // exists to be checked against PERMIT_TABLE, not called from the tick loop
fn permit_formula(b3: bool, b2: bool, b1: bool, b0: bool) -> bool {
    (!b0 || b3) && (!b2 || b1)
}
