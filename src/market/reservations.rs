//! The reservation consistency protocol.
//!
//! The store offers no multi-document transaction, so correctness hangs on
//! two things: the reservation insert and the quantity decrement commit as
//! one batch, and the sold-out re-check plus that commit run under the
//! offering's lock. Notifications stay outside the batch and are
//! best-effort; a failed notification never rolls back a reservation.

use chrono::Utc;

use crate::store::{to_document, Database, Direction, DocRef, FieldValue, Query};

use super::models::{NotificationKind, Offering, Reservation, ReservationStatus};
use super::{collect, not_found, MarketError, Marketplace};

/// The protocol reserves exactly one unit per call.
const UNITS_PER_RESERVATION: i64 = 1;

impl Marketplace {
    /// Customer reserves one unit of an offering.
    ///
    /// Fails with `SoldOut` when the guarded re-check observes no remaining
    /// quantity; in that case no reservation document is created.
    pub fn create_reservation(
        &self,
        customer_uid: &str,
        customer_name: &str,
        offering_id: &str,
    ) -> Result<Reservation, MarketError> {
        let offering_doc = DocRef::new(Offering::COLLECTION, offering_id)?;
        let reservation = {
            let _guard = self.offering_locks.acquire(offering_id)?;
            let snap = self
                .db
                .get_doc(&offering_doc)?
                .ok_or_else(|| not_found(Offering::COLLECTION, offering_id))?;
            let offering: Offering = snap.deserialize()?;
            if offering.quantity_remaining <= 0 {
                return Err(MarketError::SoldOut {
                    offering_id: offering_id.to_string(),
                });
            }
            if !offering.is_active {
                return Err(MarketError::Inactive {
                    what: "offering",
                    id: offering_id.to_string(),
                });
            }

            let reservation = Reservation {
                id: Database::generate_id(),
                offering_id: offering.id.clone(),
                customer_id: customer_uid.to_string(),
                provider_id: offering.provider_id.clone(),
                offering_name: offering.item_name.clone(),
                customer_name: customer_name.to_string(),
                quantity: UNITS_PER_RESERVATION,
                total_price: offering.price * UNITS_PER_RESERVATION as f64,
                payment_reference: None,
                status: ReservationStatus::Pending,
                created_at: Utc::now(),
            };
            let reservation_doc = DocRef::new(Reservation::COLLECTION, &reservation.id)?;
            self.db
                .batch()
                .set(&reservation_doc, to_document(&reservation)?)
                .update(
                    &offering_doc,
                    &[("quantityRemaining", FieldValue::increment(-1))],
                )
                .commit()?;
            reservation
        };

        self.notify_best_effort(
            &reservation.provider_id,
            "New reservation",
            &format!(
                "{} reserved {}",
                reservation.customer_name, reservation.offering_name
            ),
            NotificationKind::Success,
            None,
        );
        Ok(reservation)
    }

    /// Provider-driven status change. Notifies the customer.
    pub fn update_reservation_status(
        &self,
        reservation_id: &str,
        to: ReservationStatus,
    ) -> Result<Reservation, MarketError> {
        let reservation = self.transition(reservation_id, to)?;
        let (title, kind) = status_notice(to);
        self.notify_best_effort(
            &reservation.customer_id,
            title,
            &format!("{}: {}", reservation.offering_name, to),
            kind,
            None,
        );
        Ok(reservation)
    }

    /// Apply one status to a set of reservations as a single batch commit.
    ///
    /// Every transition is validated up front; one invalid transition
    /// rejects the whole call before any write. One notification goes out
    /// per affected reservation.
    pub fn update_reservation_statuses(
        &self,
        reservation_ids: &[&str],
        to: ReservationStatus,
    ) -> Result<Vec<Reservation>, MarketError> {
        let mut pending = Vec::with_capacity(reservation_ids.len());
        for id in reservation_ids {
            let doc = DocRef::new(Reservation::COLLECTION, *id)?;
            let snap = self
                .db
                .get_doc(&doc)?
                .ok_or_else(|| not_found(Reservation::COLLECTION, id))?;
            let reservation: Reservation = snap.deserialize()?;
            if !reservation.status.can_transition(to) {
                return Err(MarketError::InvalidTransition {
                    from: reservation.status,
                    to,
                });
            }
            pending.push((doc, reservation));
        }

        let mut batch = self.db.batch();
        for (doc, reservation) in &pending {
            batch = batch.update(doc, &[("status", FieldValue::set(to.as_str()))]);
            if to == ReservationStatus::Cancelled {
                let offering_doc = DocRef::new(Offering::COLLECTION, &reservation.offering_id)?;
                batch = batch.update(
                    &offering_doc,
                    &[("quantityRemaining", FieldValue::increment(1))],
                );
            }
        }
        batch.commit()?;

        let (title, kind) = status_notice(to);
        let mut updated = Vec::with_capacity(pending.len());
        for (_, mut reservation) in pending {
            reservation.status = to;
            self.notify_best_effort(
                &reservation.customer_id,
                title,
                &format!("{}: {}", reservation.offering_name, to),
                kind,
                None,
            );
            updated.push(reservation);
        }
        Ok(updated)
    }

    /// Customer-initiated cancellation; only a pending reservation can be
    /// cancelled. Notifies the provider.
    pub fn cancel_reservation(&self, reservation_id: &str) -> Result<Reservation, MarketError> {
        let reservation = self.transition(reservation_id, ReservationStatus::Cancelled)?;
        self.notify_best_effort(
            &reservation.provider_id,
            "Reservation cancelled",
            &format!(
                "{} cancelled {}",
                reservation.customer_name, reservation.offering_name
            ),
            NotificationKind::Warning,
            None,
        );
        Ok(reservation)
    }

    /// Attach a free-text payment reference to a pending reservation.
    /// Allowed exactly once; the reference cannot be altered afterwards.
    pub fn attach_payment_reference(
        &self,
        reservation_id: &str,
        reference: &str,
    ) -> Result<(), MarketError> {
        let doc = DocRef::new(Reservation::COLLECTION, reservation_id)?;
        let snap = self
            .db
            .get_doc(&doc)?
            .ok_or_else(|| not_found(Reservation::COLLECTION, reservation_id))?;
        let reservation: Reservation = snap.deserialize()?;
        if reservation.status != ReservationStatus::Pending {
            return Err(MarketError::NotPending {
                reservation_id: reservation_id.to_string(),
                status: reservation.status,
            });
        }
        if reservation.payment_reference.is_some() {
            return Err(MarketError::PaymentReferenceSet {
                reservation_id: reservation_id.to_string(),
            });
        }
        self.db
            .update_doc(&doc, &[("paymentReference", FieldValue::set(reference))])?;
        Ok(())
    }

    pub fn get_reservation(&self, reservation_id: &str) -> Result<Option<Reservation>, MarketError> {
        let doc = DocRef::new(Reservation::COLLECTION, reservation_id)?;
        match self.db.get_doc(&doc)? {
            Some(snap) => Ok(Some(snap.deserialize()?)),
            None => Ok(None),
        }
    }

    /// A customer's reservations, newest first.
    pub fn reservations_for_customer(
        &self,
        customer_uid: &str,
    ) -> Result<Vec<Reservation>, MarketError> {
        let query = Query::collection(Reservation::COLLECTION)?
            .where_eq("customerId", customer_uid)
            .order_by("createdAt", Direction::Desc);
        collect(self.db.get_docs(&query)?)
    }

    /// A provider's incoming reservations, newest first.
    pub fn reservations_for_provider(
        &self,
        provider_uid: &str,
    ) -> Result<Vec<Reservation>, MarketError> {
        let query = Query::collection(Reservation::COLLECTION)?
            .where_eq("providerId", provider_uid)
            .order_by("createdAt", Direction::Desc);
        collect(self.db.get_docs(&query)?)
    }

    /// Realized revenue: the sum over the provider's completed reservations.
    pub fn completed_revenue(&self, provider_id: &str) -> Result<f64, MarketError> {
        let query = Query::collection(Reservation::COLLECTION)?
            .where_eq("providerId", provider_id)
            .where_eq("status", ReservationStatus::Completed.as_str());
        let completed: Vec<Reservation> = collect(self.db.get_docs(&query)?)?;
        Ok(completed.iter().map(|r| r.total_price).sum())
    }

    /// Validate and commit a single status transition. A cancellation
    /// restocks the offering's remaining quantity in the same batch.
    fn transition(
        &self,
        reservation_id: &str,
        to: ReservationStatus,
    ) -> Result<Reservation, MarketError> {
        let doc = DocRef::new(Reservation::COLLECTION, reservation_id)?;
        let snap = self
            .db
            .get_doc(&doc)?
            .ok_or_else(|| not_found(Reservation::COLLECTION, reservation_id))?;
        let mut reservation: Reservation = snap.deserialize()?;
        if !reservation.status.can_transition(to) {
            return Err(MarketError::InvalidTransition {
                from: reservation.status,
                to,
            });
        }

        let mut batch = self
            .db
            .batch()
            .update(&doc, &[("status", FieldValue::set(to.as_str()))]);
        if to == ReservationStatus::Cancelled {
            let offering_doc = DocRef::new(Offering::COLLECTION, &reservation.offering_id)?;
            batch = batch.update(
                &offering_doc,
                &[("quantityRemaining", FieldValue::increment(1))],
            );
        }
        batch.commit()?;

        reservation.status = to;
        Ok(reservation)
    }
}

fn status_notice(to: ReservationStatus) -> (&'static str, NotificationKind) {
    match to {
        ReservationStatus::Confirmed => ("Reservation confirmed", NotificationKind::Success),
        ReservationStatus::Completed => ("Reservation completed", NotificationKind::Info),
        ReservationStatus::Cancelled => ("Reservation cancelled", NotificationKind::Warning),
        ReservationStatus::Pending => ("Reservation updated", NotificationKind::Info),
    }
}
