use crate::model::*;

/// Admins see everything. Others only their own active reservations.
pub fn can_access(customer: &Customer, reservation: &Reservation) -> bool {
    if customer.is_admin() {
        return true;
    }
    reservation.customer_id == customer.id && reservation.is_active
}

/// Like [`can_access`], and a non-admin may not edit a reservation that has
/// already started.
pub fn can_modify(customer: &Customer, reservation: &Reservation, now: Ms) -> bool {
    if customer.is_admin() {
        return true;
    }
    can_access(customer, reservation) && reservation.span.start > now
}
