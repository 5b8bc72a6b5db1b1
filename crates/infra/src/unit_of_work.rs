//! Read-then-stage transaction scope for one engine operation.

use std::collections::HashMap;

use rust_decimal::Decimal;

use autoshop_accounting::Posting;
use autoshop_core::{AggregateId, DomainError, ExpectedVersion, GrnId, Resource, SupplierId};
use autoshop_inventory::{CostedItem, InventoryEvent, InventoryItemId, SellingPriceChange, StockMovement};
use autoshop_purchasing::{Grn, ItemReturn, ItemReturnId, Payment, PurchasingEvent, Supplier};

use crate::engine::EngineResult;
use crate::store::{ChangeSet, LedgerStore, Staged, UncommittedEvent};

/// Collects the reads and writes of one operation.
///
/// Every record loaded through the unit of work remembers the version it
/// was read at; staging it back turns that version into the commit's
/// expectation. Records staged without a prior load must not exist yet.
/// Reloading a record that is already staged returns the staged copy.
pub struct UnitOfWork<'s, S: ?Sized> {
    store: &'s S,
    versions: HashMap<AggregateId, u64>,
    changes: ChangeSet,
}

impl<'s, S> UnitOfWork<'s, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            versions: HashMap::new(),
            changes: ChangeSet::default(),
        }
    }

    /// Direct read access for lookups that are not staged back.
    pub fn store(&self) -> &'s S {
        self.store
    }

    fn expected(&self, id: AggregateId) -> ExpectedVersion {
        self.versions
            .get(&id)
            .map_or(ExpectedVersion::Absent, |v| ExpectedVersion::Exact(*v))
    }

    pub fn load_item(&mut self, id: InventoryItemId) -> EngineResult<CostedItem> {
        if let Some(staged) = self.changes.items.iter().find(|s| s.value.item().id() == id) {
            return Ok(staged.value.clone());
        }
        let found = self
            .store
            .item(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Item, id))?;
        self.versions.insert(id.0, found.version);
        Ok(found.value)
    }

    pub fn stage_item(&mut self, item: CostedItem) {
        let id = item.item().id();
        let staged = Staged::new(item, self.expected(id.0));
        match self.changes.items.iter_mut().find(|s| s.value.item().id() == id) {
            Some(slot) => *slot = staged,
            None => self.changes.items.push(staged),
        }
    }

    pub fn load_grn(&mut self, id: GrnId) -> EngineResult<Grn> {
        if let Some(staged) = self.changes.grns.iter().find(|s| s.value.id() == id) {
            return Ok(staged.value.clone());
        }
        let found = self
            .store
            .grn(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Grn, id))?;
        self.versions.insert(id.0, found.version);
        Ok(found.value)
    }

    pub fn stage_grn(&mut self, grn: Grn) {
        let id = grn.id();
        let staged = Staged::new(grn, self.expected(id.0));
        match self.changes.grns.iter_mut().find(|s| s.value.id() == id) {
            Some(slot) => *slot = staged,
            None => self.changes.grns.push(staged),
        }
    }

    pub fn load_return(&mut self, id: ItemReturnId) -> EngineResult<ItemReturn> {
        if let Some(staged) = self.changes.returns.iter().find(|s| s.value.id() == id) {
            return Ok(staged.value.clone());
        }
        let found = self
            .store
            .item_return(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Return, id))?;
        self.versions.insert(id.0, found.version);
        Ok(found.value)
    }

    pub fn stage_return(&mut self, item_return: ItemReturn) {
        let id = item_return.id();
        let staged = Staged::new(item_return, self.expected(id.0));
        match self.changes.returns.iter_mut().find(|s| s.value.id() == id) {
            Some(slot) => *slot = staged,
            None => self.changes.returns.push(staged),
        }
    }

    /// Suppliers are never staged back; due amounts move through
    /// [`UnitOfWork::adjust_supplier_due`].
    pub fn load_supplier(&self, id: SupplierId) -> EngineResult<Supplier> {
        let found = self
            .store
            .supplier(id)?
            .ok_or_else(|| DomainError::not_found(Resource::Supplier, id))?;
        Ok(found.value)
    }

    pub fn stage_new_supplier(&mut self, supplier: Supplier) {
        self.changes
            .suppliers
            .push(Staged::new(supplier, ExpectedVersion::Absent));
    }

    pub fn adjust_supplier_due(&mut self, id: SupplierId, delta: Decimal) {
        self.changes.supplier_due.push((id, delta));
    }

    pub fn append_movement(&mut self, movement: StockMovement) {
        self.changes.movements.push(movement);
    }

    pub fn post(&mut self, posting: Posting) {
        self.changes.postings.push(posting);
    }

    pub fn record_payment(&mut self, payment: Payment) {
        self.changes.payments.push(payment);
    }

    pub fn journal_selling_price(&mut self, change: SellingPriceChange) {
        self.changes.selling_price_changes.push(change);
    }

    pub fn emit_inventory(&mut self, event: InventoryEvent) -> EngineResult<()> {
        let aggregate_id = event.item_id().0;
        let event = UncommittedEvent::from_typed(
            aggregate_id,
            autoshop_inventory::events::AGGREGATE_TYPE,
            &event,
        )?;
        self.changes.events.push(event);
        Ok(())
    }

    pub fn emit_purchasing(&mut self, event: PurchasingEvent) -> EngineResult<()> {
        let (aggregate_id, aggregate_type) = event.aggregate();
        let event = UncommittedEvent::from_typed(aggregate_id, aggregate_type, &event)?;
        self.changes.events.push(event);
        Ok(())
    }

    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoshop_inventory::{CategoryId, NewItem, StockMovementId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::store::InMemoryLedgerStore;

    fn seed(store: &InMemoryLedgerStore) -> InventoryItemId {
        let (costed, _) = CostedItem::register(
            InventoryItemId::generate(),
            NewItem {
                code: "WP-3".to_string(),
                name: "Wiper blade".to_string(),
                category_id: CategoryId::generate(),
                quantity: 0,
                unit: "pcs".to_string(),
                buying_price: dec!(4),
                selling_price: dec!(7),
                wholesale_price: dec!(6),
                wholesale_threshold: 0,
                reorder_threshold: 1,
            },
            StockMovementId::generate(),
            Utc::now(),
        )
        .unwrap();
        let id = costed.item().id();
        let mut uow = UnitOfWork::new(store);
        uow.stage_item(costed);
        store.commit(uow.into_changes()).unwrap();
        id
    }

    #[test]
    fn staged_writes_expect_the_version_read() {
        let store = InMemoryLedgerStore::new("USD");
        let id = seed(&store);

        let mut uow = UnitOfWork::new(&store);
        let item = uow.load_item(id).unwrap();
        uow.stage_item(item);
        let changes = uow.into_changes();
        assert_eq!(changes.items[0].expected, ExpectedVersion::Exact(1));
    }

    #[test]
    fn reload_sees_staged_copy() {
        let store = InMemoryLedgerStore::new("USD");
        let id = seed(&store);

        let mut uow = UnitOfWork::new(&store);
        let mut item = uow.load_item(id).unwrap();
        item.extend_active_layer(3);
        uow.stage_item(item);

        let again = uow.load_item(id).unwrap();
        assert_eq!(again.item().cost_layer_remaining(), 3);
        assert_eq!(uow.into_changes().items.len(), 1);
    }

    #[test]
    fn missing_item_is_not_found() {
        let store = InMemoryLedgerStore::new("USD");
        let mut uow = UnitOfWork::new(&store);
        let err = uow.load_item(InventoryItemId::generate()).unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(DomainError::NotFound {
                resource: Resource::Item,
                ..
            })
        ));
    }
}
