//! Field-by-field reconciliation of product facts when offers (or relations)
//! that describe the same product are combined.

use offerdb_core::{ContestedField, ProductFacts};

/// Which side of a reconciliation supplies a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Current,
    Incoming,
}

/// Picks the side whose value `field` should carry.
///
/// Precedence, first decisive rule wins:
/// 1. a manual override (current side checked first),
/// 2. an automatic override,
/// 3. the only informative side,
/// 4. the higher schema version,
/// 5. for categories, the strictly longer list.
///
/// Anything still tied keeps the current value.
#[must_use]
pub fn choose(field: ContestedField, current: &ProductFacts, incoming: &ProductFacts) -> Side {
    if current.overrides.is_manual(field) {
        return Side::Current;
    }
    if incoming.overrides.is_manual(field) {
        return Side::Incoming;
    }
    if current.overrides.is_automatic(field) {
        return Side::Current;
    }
    if incoming.overrides.is_automatic(field) {
        return Side::Incoming;
    }

    match (current.is_informative(field), incoming.is_informative(field)) {
        (_, false) => return Side::Current,
        (false, true) => return Side::Incoming,
        (true, true) => {}
    }

    let current_version = current.versions.get(field);
    let incoming_version = incoming.versions.get(field);
    if incoming_version != current_version {
        return if incoming_version > current_version {
            Side::Incoming
        } else {
            Side::Current
        };
    }

    if field == ContestedField::Categories && incoming.categories.len() > current.categories.len()
    {
        return Side::Incoming;
    }
    Side::Current
}

/// Reconciles every contested field of `incoming` into `current`. Returns the
/// fields that were taken from `incoming`.
pub fn reconcile(current: &mut ProductFacts, incoming: &ProductFacts) -> Vec<ContestedField> {
    let mut taken = Vec::new();
    for field in ContestedField::ALL {
        if choose(field, current, incoming) == Side::Incoming {
            current.take_field(incoming, field);
            taken.push(field);
        }
    }
    if !taken.is_empty() {
        tracing::trace!(fields = ?taken, "reconciled facts from incoming offer");
    }
    taken
}
