//! Order status transition rules and the side effects attached to them.

use crate::entities::{OrderStatus, Role};
use crate::errors::ServiceError;

const MANAGEMENT: &[Role] = &[Role::Manager, Role::Director];
const DESIGN_TO_PRODUCTION: &[Role] = &[Role::Designer, Role::Manager, Role::Director];
const PRODUCTION_TO_READY: &[Role] = &[Role::Master, Role::Manager, Role::Director];
const DESIGN_DONE_TO_PRODUCTION: &[Role] = &[Role::Manager, Role::Director, Role::Master];
const POSTPROCESS_TO_READY: &[Role] = &[Role::Assistant, Role::Manager, Role::Director];

/// Roles allowed to move an order from `from` to `to`, or `None` when the
/// edge does not exist.
pub fn allowed_roles(from: OrderStatus, to: OrderStatus) -> Option<&'static [Role]> {
    use OrderStatus::*;

    let roles = match (from, to) {
        (Created, Design | Production | Cancelled | Defect) => MANAGEMENT,
        (Design, Production) => DESIGN_TO_PRODUCTION,
        (Design, Cancelled | Defect) => MANAGEMENT,
        (Production, Ready) => PRODUCTION_TO_READY,
        (Production, Cancelled | Defect) => MANAGEMENT,
        (Ready, Closed | Cancelled | Defect) => MANAGEMENT,
        (DesignDone, Production) => DESIGN_DONE_TO_PRODUCTION,
        (DesignDone, Ready | Cancelled | Defect) => MANAGEMENT,
        (Printed, Ready | Cancelled | Defect) => MANAGEMENT,
        (Postprocess, Ready) => POSTPROCESS_TO_READY,
        (Postprocess, Cancelled | Defect) => MANAGEMENT,
        (Defect, Cancelled) => MANAGEMENT,
        _ => return None,
    };
    Some(roles)
}

/// Checks that `role` may move an order from `from` to `to`. Directors may
/// force any edge, but no one can re-enter the current status.
pub fn authorize_transition(
    from: OrderStatus,
    to: OrderStatus,
    role: Role,
) -> Result<(), ServiceError> {
    let permitted = from != to
        && (role.is_director()
            || allowed_roles(from, to).is_some_and(|roles| roles.contains(&role)));

    if permitted {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition(format!(
            "Transition '{}' -> '{}' not allowed for role '{}'",
            from, to, role
        )))
    }
}

/// Work performed in the transition's transaction after the rules pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Turn held reservations into consumed stock.
    ConsumeReservations,
    /// Give held reservations back to available stock.
    ReleaseReservations,
    /// Queue a "ready for pickup" client notification.
    QueueReadyNotification,
}

impl SideEffect {
    /// Releasing is limited to cancellations before production. Consuming
    /// always runs and takes whatever the ledger says the order still holds,
    /// so forced detours (`created -> defect -> production`) still debit stock.
    pub fn applies_from(&self, from: OrderStatus) -> bool {
        match self {
            SideEffect::ReleaseReservations => from.releases_on_cancel(),
            SideEffect::ConsumeReservations | SideEffect::QueueReadyNotification => true,
        }
    }
}

/// Effects keyed by destination status, in execution order.
pub fn side_effects(to: OrderStatus) -> &'static [SideEffect] {
    match to {
        OrderStatus::Production => &[SideEffect::ConsumeReservations],
        OrderStatus::Cancelled => &[SideEffect::ReleaseReservations],
        OrderStatus::Ready => &[SideEffect::QueueReadyNotification],
        _ => &[],
    }
}

/// Effects to run for a concrete `from -> to` move.
pub fn effects_for(from: OrderStatus, to: OrderStatus) -> impl Iterator<Item = SideEffect> {
    side_effects(to)
        .iter()
        .copied()
        .filter(move |effect| effect.applies_from(from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use sea_orm::Iterable;
    use OrderStatus::*;

    #[rstest]
    #[case(Created, Design, Role::Manager, true)]
    #[case(Created, Design, Role::Designer, false)]
    #[case(Design, Production, Role::Designer, true)]
    #[case(Design, Production, Role::Master, false)]
    #[case(Production, Ready, Role::Master, true)]
    #[case(Production, Ready, Role::Assistant, false)]
    #[case(DesignDone, Production, Role::Master, true)]
    #[case(DesignDone, Ready, Role::Master, false)]
    #[case(Postprocess, Ready, Role::Assistant, true)]
    #[case(Postprocess, Cancelled, Role::Assistant, false)]
    #[case(Ready, Closed, Role::Manager, true)]
    #[case(Defect, Cancelled, Role::Manager, true)]
    #[case(Closed, Design, Role::Manager, false)]
    #[case(Cancelled, Created, Role::Manager, false)]
    #[case(Closed, Design, Role::Director, true)]
    #[case(Created, Ready, Role::Director, true)]
    fn transition_table(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] role: Role,
        #[case] allowed: bool,
    ) {
        assert_eq!(authorize_transition(from, to, role).is_ok(), allowed);
    }

    #[test]
    fn legality_matches_table_for_every_pair() {
        for from in OrderStatus::iter() {
            for to in OrderStatus::iter() {
                for role in Role::iter() {
                    let expected = from != to
                        && (role == Role::Director
                            || allowed_roles(from, to).is_some_and(|r| r.contains(&role)));
                    assert_eq!(
                        authorize_transition(from, to, role).is_ok(),
                        expected,
                        "{from} -> {to} as {role}"
                    );
                }
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for to in OrderStatus::iter() {
            assert!(allowed_roles(Closed, to).is_none());
            assert!(allowed_roles(Cancelled, to).is_none());
        }
    }

    #[test]
    fn same_status_is_rejected_even_for_director() {
        assert_matches!(
            authorize_transition(Production, Production, Role::Director),
            Err(ServiceError::InvalidTransition(_))
        );
    }

    #[test]
    fn rejection_message_names_edge_and_role() {
        let err = authorize_transition(Closed, Design, Role::Manager).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transition 'closed' -> 'design' not allowed for role 'manager'"
        );
    }

    #[test]
    fn effects_are_keyed_by_destination() {
        assert_eq!(side_effects(Production), &[SideEffect::ConsumeReservations]);
        assert_eq!(side_effects(Cancelled), &[SideEffect::ReleaseReservations]);
        assert_eq!(side_effects(Ready), &[SideEffect::QueueReadyNotification]);
        assert!(side_effects(Closed).is_empty());
    }

    #[rstest]
    #[case(Created, true)]
    #[case(Design, true)]
    #[case(DesignDone, true)]
    #[case(Production, false)]
    #[case(Ready, false)]
    #[case(Defect, false)]
    fn release_only_before_production(#[case] from: OrderStatus, #[case] releases: bool) {
        let effects: Vec<_> = effects_for(from, Cancelled).collect();
        assert_eq!(effects.contains(&SideEffect::ReleaseReservations), releases);
    }

    #[rstest]
    #[case(Created)]
    #[case(Design)]
    #[case(DesignDone)]
    #[case(Defect)]
    #[case(Ready)]
    #[case(Printed)]
    #[case(Postprocess)]
    fn entering_production_always_consumes(#[case] from: OrderStatus) {
        assert_eq!(
            effects_for(from, Production).collect::<Vec<_>>(),
            vec![SideEffect::ConsumeReservations]
        );
    }
}
